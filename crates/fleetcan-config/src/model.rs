// crates/fleetcan-config/src/model.rs

//! `serde` data structures that map directly to the YAML node-spec
//! schema. These are the raw deserialization targets; the builder turns
//! them into validated OD entries.

use fleetcan_od::{AccessType, DataType};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Data type names as they appear in the YAML specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataTypeName {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Str,
    #[serde(rename = "octet_str")]
    OctetStr,
    #[default]
    Domain,
}

impl DataTypeName {
    pub fn to_data_type(self) -> DataType {
        match self {
            DataTypeName::Bool => DataType::Bool,
            DataTypeName::Int8 => DataType::Int8,
            DataTypeName::Int16 => DataType::Int16,
            DataTypeName::Int32 => DataType::Int32,
            DataTypeName::Int64 => DataType::Int64,
            DataTypeName::Uint8 => DataType::Uint8,
            DataTypeName::Uint16 => DataType::Uint16,
            DataTypeName::Uint32 => DataType::Uint32,
            DataTypeName::Uint64 => DataType::Uint64,
            DataTypeName::Float32 => DataType::Float32,
            DataTypeName::Float64 => DataType::Float64,
            DataTypeName::Str => DataType::VisibleString,
            DataTypeName::OctetStr => DataType::OctetString,
            DataTypeName::Domain => DataType::Domain,
        }
    }
}

/// Access type names as they appear in the YAML specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessName {
    #[default]
    Rw,
    Ro,
    Wo,
    Const,
}

impl AccessName {
    pub fn to_access_type(self) -> AccessType {
        match self {
            AccessName::Rw => AccessType::ReadWrite,
            AccessName::Ro => AccessType::ReadOnly,
            AccessName::Wo => AccessType::WriteOnly,
            AccessName::Const => AccessType::Const,
        }
    }
}

/// A literal default value from YAML. The builder type-checks it against
/// the declared data type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX` (uint64 defaults).
    BigUint(u64),
    Float(f64),
    Str(String),
}

/// One bitfield definition: a single bit, an inclusive `"low-high"`
/// range string, or an explicit list of bit positions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BitsSpec {
    Bit(u8),
    Range(String),
    List(Vec<u8>),
}

impl BitsSpec {
    /// Expands into the explicit list of bit positions.
    pub fn resolve(&self) -> Result<Vec<u8>, String> {
        match self {
            BitsSpec::Bit(bit) => Ok(vec![*bit]),
            BitsSpec::List(bits) => Ok(bits.clone()),
            BitsSpec::Range(range) => {
                let (a, b) = range
                    .split_once('-')
                    .ok_or_else(|| format!("invalid bit range '{}'", range))?;
                let a: u8 = a
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid bit range '{}'", range))?;
                let b: u8 = b
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid bit range '{}'", range))?;
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                Ok((low..=high).collect())
            }
        }
    }
}

/// A `[object_name]` or `[object_name, sub_name]` field reference.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FieldRef(pub Vec<String>);

impl FieldRef {
    pub fn name(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }

    pub fn sub_name(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }
}

/// Object shapes a spec may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    #[default]
    Scalar,
    Array,
    Record,
}

/// Procedural subindex generation modes for arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerateMode {
    /// `count` subentries named `{name}_{n}`, subindexes 1..=count.
    FixedLength,
    /// One subentry per configured non-zero node id, subindex = node id.
    NodeIds,
}

/// Sub-entry of an array or record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubindexSpec {
    pub subindex: u8,
    pub name: String,
    #[serde(default)]
    pub data_type: DataTypeName,
    #[serde(default = "default_length")]
    pub length: usize,
    #[serde(default)]
    pub access_type: AccessName,
    #[serde(default)]
    pub default: Option<ConfigValue>,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "enum", default)]
    pub value_descriptions: BTreeMap<String, i64>,
    #[serde(rename = "bitfield", default)]
    pub bit_definitions: BTreeMap<String, BitsSpec>,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "default_scale")]
    pub scale_factor: f64,
    #[serde(default)]
    pub low_limit: Option<i64>,
    #[serde(default)]
    pub high_limit: Option<i64>,
}

/// Procedural array generation: a template plus a mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateSubindexes {
    pub mode: GenerateMode,
    #[serde(default)]
    pub count: u8,
    pub name: String,
    #[serde(default)]
    pub data_type: DataTypeName,
    #[serde(default = "default_length")]
    pub length: usize,
    #[serde(default)]
    pub access_type: AccessName,
    #[serde(default)]
    pub default: Option<ConfigValue>,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "enum", default)]
    pub value_descriptions: BTreeMap<String, i64>,
    #[serde(rename = "bitfield", default)]
    pub bit_definitions: BTreeMap<String, BitsSpec>,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "default_scale")]
    pub scale_factor: f64,
    #[serde(default)]
    pub low_limit: Option<i64>,
    #[serde(default)]
    pub high_limit: Option<i64>,
}

/// Top-level object spec at an index.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectSpec {
    pub index: u16,
    pub name: String,
    #[serde(default)]
    pub object_type: ObjectType,
    #[serde(default)]
    pub data_type: DataTypeName,
    #[serde(default = "default_length")]
    pub length: usize,
    #[serde(default)]
    pub access_type: AccessName,
    #[serde(default)]
    pub default: Option<ConfigValue>,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "enum", default)]
    pub value_descriptions: BTreeMap<String, i64>,
    #[serde(rename = "bitfield", default)]
    pub bit_definitions: BTreeMap<String, BitsSpec>,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "default_scale")]
    pub scale_factor: f64,
    #[serde(default)]
    pub low_limit: Option<i64>,
    #[serde(default)]
    pub high_limit: Option<i64>,
    #[serde(default)]
    pub subindexes: Vec<SubindexSpec>,
    #[serde(default)]
    pub generate_subindexes: Option<GenerateSubindexes>,
}

/// Transmission modes an outbound slot may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TpdoMode {
    /// Periodic, driven by the event timer.
    #[default]
    Timer,
    /// Driven by the bus SYNC counter.
    Sync,
}

/// One declared outbound broadcast slot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TpdoSpec {
    /// Slot number, 1-16.
    pub num: u8,
    #[serde(default)]
    pub rtr: bool,
    #[serde(default)]
    pub mode: TpdoMode,
    /// Send every n SYNCs; 0 for acyclic. Sync mode only.
    #[serde(default)]
    pub sync_divisor: u8,
    #[serde(default)]
    pub sync_start: u8,
    #[serde(default)]
    pub event_timer_ms: u16,
    #[serde(default)]
    pub inhibit_time_ms: u16,
    #[serde(default)]
    pub fields: Vec<FieldRef>,
}

/// One declared inbound subscription slot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpdoSpec {
    /// Slot number, 1-16.
    pub num: u8,
    /// Node whose broadcast this slot subscribes to.
    pub producer_node: String,
    /// The producer's outbound slot number.
    pub producer_tpdo_num: u8,
    /// Optional subset of the producer's mapped fields to re-expose;
    /// empty means every field of that slot.
    #[serde(default)]
    pub fields: Vec<FieldRef>,
}

/// The declarative spec for one node, as parsed (and after merging).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardConfig {
    /// Standard-catalog objects to include, by name.
    #[serde(rename = "standard_objects", default)]
    pub std_objects: Vec<String>,
    /// Node-specific objects.
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    /// Outbound broadcast slots.
    #[serde(default)]
    pub tpdos: Vec<TpdoSpec>,
    /// Inbound subscription slots.
    #[serde(default)]
    pub rpdos: Vec<RpdoSpec>,
    /// Collector node only: fields persisted to non-volatile storage.
    #[serde(default)]
    pub persist_fields: Vec<FieldRef>,
}

/// One node of the fleet, from the cards table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Card {
    /// Unique lower-case name; configs reference nodes by it.
    pub name: String,
    /// Human-readable name, used as the OD product name.
    pub nice_name: String,
    pub node_id: u8,
    /// Base card type ("battery", "solar", ...) selecting the overlay.
    #[serde(default)]
    pub base: String,
    /// Common baseline class ("software" or "firmware").
    #[serde(default)]
    pub common: String,
    /// The node that aggregates telemetry and assembles the beacon.
    #[serde(default)]
    pub collector: bool,
}

/// Downlink beacon framing defaults (collector node only).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ax25Config {
    pub dest_callsign: String,
    pub dest_ssid: u8,
    pub src_callsign: String,
    pub src_ssid: u8,
    pub control: u8,
    pub command: bool,
    pub response: bool,
    pub pid: u8,
}

/// Beacon definition: framing plus the ordered field list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconConfig {
    pub revision: u8,
    pub ax25: Ax25Config,
    #[serde(default)]
    pub fields: Vec<FieldRef>,
}

/// A mission the fleet can be assembled for.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Mission {
    pub id: u8,
    pub name: String,
}

fn default_length() -> usize {
    1
}

fn default_scale() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_object_spec() {
        let spec: ObjectSpec = serde_yaml::from_str("{index: 0x4000, name: temperature}").unwrap();
        assert_eq!(spec.index, 0x4000);
        assert_eq!(spec.object_type, ObjectType::Scalar);
        assert_eq!(spec.data_type, DataTypeName::Domain);
        assert_eq!(spec.scale_factor, 1.0);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result: Result<ObjectSpec, _> =
            serde_yaml::from_str("{index: 0x4000, name: t, not_a_field: 1}");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_value_variants() {
        let v: ConfigValue = serde_yaml::from_str("true").unwrap();
        assert_eq!(v, ConfigValue::Bool(true));
        let v: ConfigValue = serde_yaml::from_str("-5").unwrap();
        assert_eq!(v, ConfigValue::Int(-5));
        let v: ConfigValue = serde_yaml::from_str("18446744073709551615").unwrap();
        assert_eq!(v, ConfigValue::BigUint(u64::MAX));
        let v: ConfigValue = serde_yaml::from_str("1.5").unwrap();
        assert_eq!(v, ConfigValue::Float(1.5));
        let v: ConfigValue = serde_yaml::from_str("idle").unwrap();
        assert_eq!(v, ConfigValue::Str("idle".into()));
    }

    #[test]
    fn test_bits_spec_forms() {
        let bits: BitsSpec = serde_yaml::from_str("3").unwrap();
        assert_eq!(bits.resolve().unwrap(), vec![3]);
        let bits: BitsSpec = serde_yaml::from_str("\"2-5\"").unwrap();
        assert_eq!(bits.resolve().unwrap(), vec![2, 3, 4, 5]);
        let bits: BitsSpec = serde_yaml::from_str("[0, 7]").unwrap();
        assert_eq!(bits.resolve().unwrap(), vec![0, 7]);
        let bits = BitsSpec::Range("junk".into());
        assert!(bits.resolve().is_err());
    }

    #[test]
    fn test_tpdo_spec_defaults() {
        let tpdo: TpdoSpec =
            serde_yaml::from_str("{num: 1, fields: [[system, storage_percent]]}").unwrap();
        assert_eq!(tpdo.mode, TpdoMode::Timer);
        assert!(!tpdo.rtr);
        assert_eq!(tpdo.fields[0].name(), "system");
        assert_eq!(tpdo.fields[0].sub_name(), Some("storage_percent"));
    }

    #[test]
    fn test_card_config_sections_default_empty() {
        let config: CardConfig =
            serde_yaml::from_str("standard_objects: [device_type]").unwrap();
        assert_eq!(config.std_objects, vec!["device_type"]);
        assert!(config.objects.is_empty());
        assert!(config.tpdos.is_empty());
    }
}
