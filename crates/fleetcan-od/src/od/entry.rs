// crates/fleetcan-od/src/od/entry.rs

use super::value::{DataType, Value};
use crate::error::OdError;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// Defines the access rights for an Object Dictionary entry over the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    /// read and write access
    ReadWrite,
    /// read only access
    ReadOnly,
    /// write only access
    WriteOnly,
    /// read only access, value is constant
    Const,
}

/// The kind of an entry, for consumers that only need the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Variable,
    Array,
    Record,
}

/// A scalar entry: one named, typed slot of data at (index, subindex).
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub index: u16,
    pub subindex: u8,
    pub data_type: DataType,
    pub access: AccessType,
    /// The configured default; `value` is frozen to this at assembly end.
    pub default: Value,
    /// The current value.
    pub value: Value,
    pub description: String,
    pub unit: String,
    pub scale_factor: f64,
    /// Lower raw limit, widened to `i128` so every integer type fits.
    pub low_limit: Option<i128>,
    /// Upper raw limit.
    pub high_limit: Option<i128>,
    /// Enum labels (label -> raw value). Mutually exclusive with `bitfield`.
    pub value_descriptions: BTreeMap<String, i128>,
    /// Bitfield labels (label -> bit positions). Unsigned types only.
    pub bit_definitions: BTreeMap<String, Vec<u8>>,
    pub pdo_mappable: bool,
}

impl Variable {
    /// Creates a variable with the type's zero default and no limits,
    /// enums or bitfield. Callers fill in the rest through the public
    /// fields.
    pub fn new(
        name: impl Into<String>,
        index: u16,
        subindex: u8,
        data_type: DataType,
        access: AccessType,
    ) -> Self {
        let zero = data_type.zero();
        Variable {
            name: name.into(),
            index,
            subindex,
            data_type,
            access,
            default: zero.clone(),
            value: zero,
            description: String::new(),
            unit: String::new(),
            scale_factor: 1.0,
            low_limit: None,
            high_limit: None,
            value_descriptions: BTreeMap::new(),
            bit_definitions: BTreeMap::new(),
            pdo_mappable: !data_type.is_variable_length(),
        }
    }

    /// Const unsigned-8 scalar, for protocol record fields.
    pub fn const_u8(name: impl Into<String>, index: u16, subindex: u8, value: u8) -> Self {
        let mut var = Variable::new(name, index, subindex, DataType::Uint8, AccessType::Const);
        var.default = Value::Unsigned8(value);
        var
    }

    /// Const unsigned-16 scalar, for protocol record fields.
    pub fn const_u16(name: impl Into<String>, index: u16, subindex: u8, value: u16) -> Self {
        let mut var = Variable::new(name, index, subindex, DataType::Uint16, AccessType::Const);
        var.default = Value::Unsigned16(value);
        var
    }

    /// Const unsigned-32 scalar, for COB-IDs and mapping entries.
    pub fn const_u32(name: impl Into<String>, index: u16, subindex: u8, value: u32) -> Self {
        let mut var = Variable::new(name, index, subindex, DataType::Uint32, AccessType::Const);
        var.default = Value::Unsigned32(value);
        var
    }

    /// Size of this variable in a PDO frame, in bits.
    pub fn bit_size(&self) -> u8 {
        self.data_type.bit_size()
    }
}

/// An array or record body: ordered scalar sub-entries at subindex 1..=255.
///
/// Sub-index 0 is implicit: it always reads as a const unsigned-8 equal to
/// the highest subindex present, so the highest-subindex invariant holds by
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub name: String,
    pub index: u16,
    pub description: String,
    members: Vec<Variable>,
}

impl Container {
    pub fn new(name: impl Into<String>, index: u16) -> Self {
        Container {
            name: name.into(),
            index,
            description: String::new(),
            members: Vec::new(),
        }
    }

    /// Adds a sub-entry, keeping members sorted by subindex.
    /// Rejects subindex 0 (implicit), duplicates, and overflow past 255.
    pub fn add_member(&mut self, var: Variable) -> Result<(), OdError> {
        if var.subindex == 0 {
            return Err(OdError::ReservedSubindex(self.index));
        }
        if self.members.len() >= u8::MAX as usize {
            return Err(OdError::SubindexOverflow(self.index));
        }
        match self
            .members
            .binary_search_by_key(&var.subindex, |m| m.subindex)
        {
            Ok(_) => Err(OdError::DuplicateIndex(self.index)),
            Err(pos) => {
                self.members.insert(pos, var);
                Ok(())
            }
        }
    }

    /// The implicit sub-index 0 value: highest subindex present, 0 if empty.
    pub fn highest_subindex(&self) -> u8 {
        self.members.last().map_or(0, |m| m.subindex)
    }

    /// The next free subindex after all current members.
    pub fn next_subindex(&self) -> u8 {
        self.highest_subindex().saturating_add(1)
    }

    pub fn subentry(&self, subindex: u8) -> Option<&Variable> {
        self.members
            .binary_search_by_key(&subindex, |m| m.subindex)
            .ok()
            .map(|pos| &self.members[pos])
    }

    pub fn subentry_mut(&mut self, subindex: u8) -> Option<&mut Variable> {
        match self
            .members
            .binary_search_by_key(&subindex, |m| m.subindex)
        {
            Ok(pos) => Some(&mut self.members[pos]),
            Err(_) => None,
        }
    }

    pub fn subentry_by_name(&self, name: &str) -> Option<&Variable> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Sub-entries in ascending subindex order.
    pub fn members(&self) -> &[Variable] {
        &self.members
    }

    pub fn members_mut(&mut self) -> impl Iterator<Item = &mut Variable> {
        self.members.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A single entry in the Object Dictionary.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Variable(Variable),
    Array(Container),
    Record(Container),
}

impl Entry {
    pub fn index(&self) -> u16 {
        match self {
            Entry::Variable(v) => v.index,
            Entry::Array(c) | Entry::Record(c) => c.index,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::Variable(v) => &v.name,
            Entry::Array(c) | Entry::Record(c) => &c.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Entry::Variable(v) => &v.description,
            Entry::Array(c) | Entry::Record(c) => &c.description,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Variable(_) => EntryKind::Variable,
            Entry::Array(_) => EntryKind::Array,
            Entry::Record(_) => EntryKind::Record,
        }
    }

    pub fn container(&self) -> Option<&Container> {
        match self {
            Entry::Variable(_) => None,
            Entry::Array(c) | Entry::Record(c) => Some(c),
        }
    }

    pub fn container_mut(&mut self) -> Option<&mut Container> {
        match self {
            Entry::Variable(_) => None,
            Entry::Array(c) | Entry::Record(c) => Some(c),
        }
    }

    /// Resolves a scalar at a subindex: subindex 0 addresses a variable
    /// entry itself, any other subindex addresses a container member.
    pub fn variable(&self, subindex: u8) -> Option<&Variable> {
        match self {
            Entry::Variable(v) => (subindex == 0).then_some(v),
            Entry::Array(c) | Entry::Record(c) => c.subentry(subindex),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(subindex: u8) -> Variable {
        Variable::const_u8("m", 0x4000, subindex, 0)
    }

    #[test]
    fn test_members_stay_sorted() {
        let mut c = Container::new("c", 0x4000);
        c.add_member(member(3)).unwrap();
        c.add_member(member(1)).unwrap();
        c.add_member(member(2)).unwrap();
        let subs: Vec<u8> = c.members().iter().map(|m| m.subindex).collect();
        assert_eq!(subs, [1, 2, 3]);
        assert_eq!(c.highest_subindex(), 3);
        assert_eq!(c.next_subindex(), 4);
    }

    #[test]
    fn test_duplicate_subindex_rejected() {
        let mut c = Container::new("c", 0x4000);
        c.add_member(member(1)).unwrap();
        assert_eq!(c.add_member(member(1)), Err(OdError::DuplicateIndex(0x4000)));
    }

    #[test]
    fn test_subindex_zero_is_implicit() {
        let mut c = Container::new("c", 0x4000);
        assert!(c.add_member(member(0)).is_err());
        assert_eq!(c.highest_subindex(), 0);
    }

    #[test]
    fn test_highest_subindex_tracks_gaps() {
        // A communication record has subindexes 1,2,3,5,6; the implicit
        // sub 0 must report 6, not the member count.
        let mut c = Container::new("comm", 0x1800);
        for s in [1u8, 2, 3, 5, 6] {
            c.add_member(member(s)).unwrap();
        }
        assert_eq!(c.len(), 5);
        assert_eq!(c.highest_subindex(), 6);
    }

    #[test]
    fn test_entry_variable_lookup() {
        let var = Variable::const_u32("cob", 0x1800, 0, 0x181);
        let entry = Entry::Variable(var);
        assert!(entry.variable(0).is_some());
        assert!(entry.variable(1).is_none());
        assert_eq!(entry.kind(), EntryKind::Variable);
    }
}
