// crates/fleetcan-od/src/od/mod.rs

mod entry;
mod value;

pub use entry::{AccessType, Container, Entry, EntryKind, Variable};
pub use value::{DataType, Value};

use crate::error::OdError;
use crate::types::{DEFAULT_BITRATE, NodeId};
use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::string::String;
use log::trace;

/// Protocol-level metadata for one node's dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceInfo {
    pub vendor_name: String,
    pub vendor_number: u32,
    pub product_name: String,
    pub product_number: u32,
    pub revision_number: u32,
    /// Number of outbound broadcast slots wired into this OD.
    pub nr_of_tpdos: u8,
    /// Number of inbound subscription slots wired into this OD. The
    /// collector node aggregates the whole fleet, so this can exceed 255.
    pub nr_of_rpdos: u16,
}

/// The fully-resolved Object Dictionary of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDictionary {
    node_id: NodeId,
    pub bitrate: u32,
    pub device_info: DeviceInfo,
    entries: BTreeMap<u16, Entry>,
}

impl ObjectDictionary {
    /// Creates a new, empty OD for one node at the default bit rate.
    pub fn new(node_id: NodeId) -> Self {
        ObjectDictionary {
            node_id,
            bitrate: DEFAULT_BITRATE,
            device_info: DeviceInfo::default(),
            entries: BTreeMap::new(),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Inserts a new entry. Indices are unique within one OD.
    pub fn insert(&mut self, entry: Entry) -> Result<(), OdError> {
        let index = entry.index();
        if self.entries.contains_key(&index) {
            return Err(OdError::DuplicateIndex(index));
        }
        trace!("OD {}: add {:#06X} '{}'", self.node_id, index, entry.name());
        self.entries.insert(index, entry);
        Ok(())
    }

    pub fn contains_index(&self, index: u16) -> bool {
        self.entries.contains_key(&index)
    }

    pub fn entry(&self, index: u16) -> Option<&Entry> {
        self.entries.get(&index)
    }

    pub fn entry_mut(&mut self, index: u16) -> Option<&mut Entry> {
        self.entries.get_mut(&index)
    }

    /// Entries in ascending index order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// All indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.keys().copied()
    }

    /// Linear name lookup; configs address entries by name, not index.
    pub fn entry_by_name(&self, name: &str) -> Option<&Entry> {
        self.entries.values().find(|e| e.name() == name)
    }

    pub fn entry_by_name_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.entries.values_mut().find(|e| e.name() == name)
    }

    /// Resolves a scalar at (index, subindex).
    pub fn variable(&self, index: u16, subindex: u8) -> Result<&Variable, OdError> {
        let entry = self
            .entries
            .get(&index)
            .ok_or(OdError::ObjectNotFound(index))?;
        entry
            .variable(subindex)
            .ok_or(OdError::SubObjectNotFound { index, subindex })
    }

    /// Resolves a `[object_name]` or `[object_name, sub_name]` field
    /// reference to its scalar.
    pub fn variable_by_ref(
        &self,
        name: &str,
        sub_name: Option<&str>,
    ) -> Result<&Variable, OdError> {
        let entry = self
            .entry_by_name(name)
            .ok_or_else(|| OdError::NameNotFound(String::from(name)))?;
        match (entry, sub_name) {
            (Entry::Variable(v), None) => Ok(v),
            (Entry::Variable(v), Some(_)) => Err(OdError::NotAContainer(v.index)),
            (Entry::Array(c) | Entry::Record(c), Some(sub)) => c
                .subentry_by_name(sub)
                .ok_or_else(|| OdError::NameNotFound(String::from(sub))),
            (Entry::Array(c) | Entry::Record(c), None) => Err(OdError::SubObjectNotFound {
                index: c.index,
                subindex: 0,
            }),
        }
    }

    /// Reads a current value by index and sub-index. Sub-index 0 of a
    /// container yields the implicit highest-subindex marker as an owned
    /// unsigned-8.
    pub fn read<'s>(&'s self, index: u16, subindex: u8) -> Option<Cow<'s, Value>> {
        self.entries.get(&index).and_then(|entry| match entry {
            Entry::Variable(v) => (subindex == 0).then_some(Cow::Borrowed(&v.value)),
            Entry::Array(c) | Entry::Record(c) => {
                if subindex == 0 {
                    Some(Cow::Owned(Value::Unsigned8(c.highest_subindex())))
                } else {
                    c.subentry(subindex).map(|v| Cow::Borrowed(&v.value))
                }
            }
        })
    }

    pub fn read_u32(&self, index: u16, subindex: u8) -> Option<u32> {
        self.read(index, subindex).and_then(|cow| cow.as_u32())
    }

    /// Copies every scalar's default into its current value. Called once
    /// at the end of assembly; the OD is immutable afterwards.
    pub fn freeze_defaults(&mut self) {
        for entry in self.entries.values_mut() {
            match entry {
                Entry::Variable(v) => v.value = v.default.clone(),
                Entry::Array(c) | Entry::Record(c) => {
                    for member in c.members_mut() {
                        member.value = member.default.clone();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::od::value::Value;

    fn od() -> ObjectDictionary {
        ObjectDictionary::new(NodeId(0x20))
    }

    #[test]
    fn test_insert_rejects_duplicate_index() {
        let mut od = od();
        od.insert(Entry::Variable(Variable::const_u32("a", 0x4000, 0, 1)))
            .unwrap();
        let result = od.insert(Entry::Variable(Variable::const_u32("b", 0x4000, 0, 2)));
        assert_eq!(result, Err(OdError::DuplicateIndex(0x4000)));
    }

    #[test]
    fn test_read_subindex_zero_of_container_is_highest_subindex() {
        let mut od = od();
        let mut c = Container::new("rec", 0x4001);
        c.add_member(Variable::const_u8("x", 0x4001, 2, 0)).unwrap();
        c.add_member(Variable::const_u8("y", 0x4001, 5, 0)).unwrap();
        od.insert(Entry::Record(c)).unwrap();

        assert_eq!(*od.read(0x4001, 0).unwrap(), Value::Unsigned8(5));
        assert!(matches!(od.read(0x4001, 0).unwrap(), Cow::Owned(_)));
    }

    #[test]
    fn test_variable_by_ref() {
        let mut od = od();
        let mut c = Container::new("system", 0x3000);
        c.add_member(Variable::const_u8("ram_percent", 0x3000, 1, 0))
            .unwrap();
        od.insert(Entry::Record(c)).unwrap();
        od.insert(Entry::Variable(Variable::const_u32("uptime", 0x3001, 0, 0)))
            .unwrap();

        assert_eq!(
            od.variable_by_ref("system", Some("ram_percent")).unwrap().subindex,
            1
        );
        assert_eq!(od.variable_by_ref("uptime", None).unwrap().index, 0x3001);
        assert!(matches!(
            od.variable_by_ref("uptime", Some("x")),
            Err(OdError::NotAContainer(0x3001))
        ));
        assert!(matches!(
            od.variable_by_ref("missing", None),
            Err(OdError::NameNotFound(_))
        ));
    }

    #[test]
    fn test_freeze_defaults() {
        let mut od = od();
        let mut var = Variable::new("v", 0x4000, 0, DataType::Uint16, AccessType::ReadWrite);
        var.default = Value::Unsigned16(5);
        od.insert(Entry::Variable(var)).unwrap();

        assert_eq!(*od.read(0x4000, 0).unwrap(), Value::Unsigned16(0));
        od.freeze_defaults();
        assert_eq!(*od.read(0x4000, 0).unwrap(), Value::Unsigned16(5));
    }
}
