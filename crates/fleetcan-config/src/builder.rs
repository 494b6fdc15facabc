// crates/fleetcan-config/src/builder.rs

//! Turns declarative object specs into validated typed entries.
//!
//! Every invariant of the data model is enforced here, fail-fast: type
//! and default agreement, limit resolution, enum/bitfield rules and
//! procedural array generation. Later stages can assume entries are
//! well-formed.

use crate::error::ConfigError;
use crate::model::{
    AccessName, BitsSpec, Card, ConfigValue, DataTypeName, GenerateMode, GenerateSubindexes,
    ObjectSpec, ObjectType, SubindexSpec,
};
use fleetcan_od::{Container, DataType, Entry, Value, Variable};
use std::collections::{BTreeMap, BTreeSet};

/// The scalar-shaped fields shared by top-level objects, explicit
/// subentries and generation templates.
struct ScalarSpec<'a> {
    name: &'a str,
    data_type: DataTypeName,
    length: usize,
    access: AccessName,
    default: Option<&'a ConfigValue>,
    description: &'a str,
    value_descriptions: &'a BTreeMap<String, i64>,
    bit_definitions: &'a BTreeMap<String, BitsSpec>,
    unit: &'a str,
    scale_factor: f64,
    low_limit: Option<i64>,
    high_limit: Option<i64>,
}

impl<'a> ScalarSpec<'a> {
    fn of_object(spec: &'a ObjectSpec) -> Self {
        ScalarSpec {
            name: &spec.name,
            data_type: spec.data_type,
            length: spec.length,
            access: spec.access_type,
            default: spec.default.as_ref(),
            description: &spec.description,
            value_descriptions: &spec.value_descriptions,
            bit_definitions: &spec.bit_definitions,
            unit: &spec.unit,
            scale_factor: spec.scale_factor,
            low_limit: spec.low_limit,
            high_limit: spec.high_limit,
        }
    }

    fn of_subindex(spec: &'a SubindexSpec) -> Self {
        ScalarSpec {
            name: &spec.name,
            data_type: spec.data_type,
            length: spec.length,
            access: spec.access_type,
            default: spec.default.as_ref(),
            description: &spec.description,
            value_descriptions: &spec.value_descriptions,
            bit_definitions: &spec.bit_definitions,
            unit: &spec.unit,
            scale_factor: spec.scale_factor,
            low_limit: spec.low_limit,
            high_limit: spec.high_limit,
        }
    }

    fn of_template(template: &'a GenerateSubindexes, name: &'a str) -> Self {
        ScalarSpec {
            name,
            data_type: template.data_type,
            length: template.length,
            access: template.access_type,
            default: template.default.as_ref(),
            description: &template.description,
            value_descriptions: &template.value_descriptions,
            bit_definitions: &template.bit_definitions,
            unit: &template.unit,
            scale_factor: template.scale_factor,
            low_limit: template.low_limit,
            high_limit: template.high_limit,
        }
    }
}

fn fail(entry: &str, index: u16, subindex: u8, rule: impl Into<String>) -> ConfigError {
    let rule = rule.into();
    log::error!("invalid entry '{}' ({:#06X}/{}): {}", entry, index, subindex, rule);
    ConfigError::validation(entry, index, subindex, rule)
}

/// Constructs an integer `Value` of the given type. `None` when the type
/// is not an integer type or the value does not fit.
fn int_value(data_type: DataType, raw: i128) -> Option<Value> {
    match data_type {
        DataType::Int8 => i8::try_from(raw).ok().map(Value::Integer8),
        DataType::Int16 => i16::try_from(raw).ok().map(Value::Integer16),
        DataType::Int32 => i32::try_from(raw).ok().map(Value::Integer32),
        DataType::Int64 => i64::try_from(raw).ok().map(Value::Integer64),
        DataType::Uint8 => u8::try_from(raw).ok().map(Value::Unsigned8),
        DataType::Uint16 => u16::try_from(raw).ok().map(Value::Unsigned16),
        DataType::Uint32 => u32::try_from(raw).ok().map(Value::Unsigned32),
        DataType::Uint64 => u64::try_from(raw).ok().map(Value::Unsigned64),
        _ => None,
    }
}

/// Builds one validated scalar at (index, subindex).
fn build_variable(spec: &ScalarSpec<'_>, index: u16, subindex: u8) -> Result<Variable, ConfigError> {
    let data_type = spec.data_type.to_data_type();
    let natural = data_type.natural_range();

    if !spec.value_descriptions.is_empty() && !spec.bit_definitions.is_empty() {
        return Err(fail(
            spec.name,
            index,
            subindex,
            "enum and bitfield are mutually exclusive",
        ));
    }

    // Enum labels: integer types only, every value in the type's range.
    let mut value_descriptions: BTreeMap<String, i128> = BTreeMap::new();
    for (label, &raw) in spec.value_descriptions {
        let Some((low, high)) = natural else {
            return Err(fail(
                spec.name,
                index,
                subindex,
                format!("enum labels require an integer type, not {}", data_type),
            ));
        };
        let raw = raw as i128;
        if raw < low || raw > high {
            return Err(fail(
                spec.name,
                index,
                subindex,
                format!("enum value {} for '{}' is out of range for {}", raw, label, data_type),
            ));
        }
        value_descriptions.insert(label.clone(), raw);
    }

    // Bitfield labels: unsigned types only, bits in range, no overlap.
    let mut bit_definitions: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    let mut claimed_bits: BTreeSet<u8> = BTreeSet::new();
    for (label, bits_spec) in spec.bit_definitions {
        if !data_type.is_unsigned() {
            return Err(fail(
                spec.name,
                index,
                subindex,
                format!("bitfield labels require an unsigned integer type, not {}", data_type),
            ));
        }
        let bits = bits_spec
            .resolve()
            .map_err(|rule| fail(spec.name, index, subindex, rule))?;
        for &bit in &bits {
            if bit >= data_type.bit_size() {
                return Err(fail(
                    spec.name,
                    index,
                    subindex,
                    format!("bit {} of '{}' exceeds the width of {}", bit, label, data_type),
                ));
            }
            if !claimed_bits.insert(bit) {
                return Err(fail(
                    spec.name,
                    index,
                    subindex,
                    format!("bit {} of '{}' is already claimed by another label", bit, label),
                ));
            }
        }
        bit_definitions.insert(label.clone(), bits);
    }

    // Limit resolution: explicit limits win, then the enum value range,
    // then the type's natural range. Strings and opaque blobs have no
    // meaningful limits at all.
    if data_type.is_variable_length()
        && (spec.low_limit.is_some() || spec.high_limit.is_some())
    {
        return Err(fail(
            spec.name,
            index,
            subindex,
            format!("limits require a fixed-size type, not {}", data_type),
        ));
    }
    let (low_limit, high_limit) = match natural {
        Some((nat_low, nat_high)) => {
            let low = match spec.low_limit {
                Some(low) => {
                    let low = low as i128;
                    if low < nat_low {
                        return Err(fail(
                            spec.name,
                            index,
                            subindex,
                            format!("low_limit {} is below the range of {}", low, data_type),
                        ));
                    }
                    low
                }
                None => value_descriptions.values().min().copied().unwrap_or(nat_low),
            };
            let high = match spec.high_limit {
                Some(high) => {
                    let high = high as i128;
                    if high > nat_high {
                        return Err(fail(
                            spec.name,
                            index,
                            subindex,
                            format!("high_limit {} is above the range of {}", high, data_type),
                        ));
                    }
                    high
                }
                None => value_descriptions.values().max().copied().unwrap_or(nat_high),
            };
            if low > high {
                return Err(fail(
                    spec.name,
                    index,
                    subindex,
                    format!("low_limit {} is above high_limit {}", low, high),
                ));
            }
            (Some(low), Some(high))
        }
        // No natural integer range (bool, floats): declared limits are
        // carried through without range validation.
        None => {
            let low = spec.low_limit.map(i128::from);
            let high = spec.high_limit.map(i128::from);
            if let (Some(low), Some(high)) = (low, high) {
                if low > high {
                    return Err(fail(
                        spec.name,
                        index,
                        subindex,
                        format!("low_limit {} is above high_limit {}", low, high),
                    ));
                }
            }
            (low, high)
        }
    };

    let default = resolve_default(spec, data_type, index, subindex)?;
    if let Some(raw) = default.as_int() {
        if data_type != DataType::Bool {
            if let (Some(low), Some(high)) = (low_limit, high_limit) {
                if raw < low || raw > high {
                    return Err(fail(
                        spec.name,
                        index,
                        subindex,
                        format!("default {} is outside limits {}..={}", raw, low, high),
                    ));
                }
            }
            if !value_descriptions.is_empty() && !value_descriptions.values().any(|&v| v == raw) {
                return Err(fail(
                    spec.name,
                    index,
                    subindex,
                    format!("default {} is not a declared enum value", raw),
                ));
            }
        }
    }

    let mut var = Variable::new(spec.name, index, subindex, data_type, spec.access.to_access_type());
    var.default = default.clone();
    var.value = default;
    var.description = spec.description.to_string();
    var.unit = spec.unit.to_string();
    var.scale_factor = spec.scale_factor;
    var.low_limit = low_limit;
    var.high_limit = high_limit;
    var.value_descriptions = value_descriptions;
    var.bit_definitions = bit_definitions;
    Ok(var)
}

/// Resolves the default value, type-checked against the declared type.
/// Missing defaults fall back to the type's zero; octet strings are
/// always zero-filled to their declared length.
fn resolve_default(
    spec: &ScalarSpec<'_>,
    data_type: DataType,
    index: u16,
    subindex: u8,
) -> Result<Value, ConfigError> {
    if data_type == DataType::OctetString {
        return Ok(Value::OctetString(vec![0; spec.length]));
    }
    let Some(config_value) = spec.default else {
        return Ok(data_type.zero());
    };
    let mismatch = |got: &str| {
        fail(
            spec.name,
            index,
            subindex,
            format!("default of type {} does not match declared type {}", got, data_type),
        )
    };
    match config_value {
        ConfigValue::Bool(b) => match data_type {
            DataType::Bool => Ok(Value::Boolean(*b)),
            _ => Err(mismatch("bool")),
        },
        ConfigValue::Int(raw) => int_or_float_default(data_type, *raw as i128)
            .ok_or_else(|| mismatch("int")),
        ConfigValue::BigUint(raw) => int_or_float_default(data_type, *raw as i128)
            .ok_or_else(|| mismatch("int")),
        ConfigValue::Float(raw) => match data_type {
            DataType::Float32 => Ok(Value::Real32(*raw as f32)),
            DataType::Float64 => Ok(Value::Real64(*raw)),
            _ => Err(mismatch("float")),
        },
        ConfigValue::Str(s) => match data_type {
            DataType::VisibleString => Ok(Value::VisibleString(s.clone())),
            _ => Err(mismatch("str")),
        },
    }
}

/// Integer literals are accepted for any integer type (range permitting)
/// and, as a convenience, for floats.
fn int_or_float_default(data_type: DataType, raw: i128) -> Option<Value> {
    match data_type {
        DataType::Float32 => Some(Value::Real32(raw as f32)),
        DataType::Float64 => Some(Value::Real64(raw as f64)),
        _ => int_value(data_type, raw),
    }
}

/// Builds a validated entry from one object spec. `cards` supplies the
/// node table for `node_ids` procedural generation.
pub fn build_entry(spec: &ObjectSpec, cards: &[Card]) -> Result<Entry, ConfigError> {
    match spec.object_type {
        ObjectType::Scalar => {
            if !spec.subindexes.is_empty() || spec.generate_subindexes.is_some() {
                return Err(fail(
                    &spec.name,
                    spec.index,
                    0,
                    "a scalar object cannot declare subindexes",
                ));
            }
            let var = build_variable(&ScalarSpec::of_object(spec), spec.index, 0)?;
            Ok(Entry::Variable(var))
        }
        ObjectType::Array => {
            let container = build_array(spec, cards)?;
            Ok(Entry::Array(container))
        }
        ObjectType::Record => {
            if spec.generate_subindexes.is_some() {
                return Err(fail(
                    &spec.name,
                    spec.index,
                    0,
                    "a record cannot generate subindexes",
                ));
            }
            let mut container = Container::new(&spec.name, spec.index);
            container.description = spec.description.clone();
            for sub in &spec.subindexes {
                let var =
                    build_variable(&ScalarSpec::of_subindex(sub), spec.index, sub.subindex)?;
                add_member(&mut container, &spec.name, var)?;
            }
            Ok(Entry::Record(container))
        }
    }
}

fn build_array(spec: &ObjectSpec, cards: &[Card]) -> Result<Container, ConfigError> {
    let mut container = Container::new(&spec.name, spec.index);
    container.description = spec.description.clone();

    match (&spec.generate_subindexes, spec.subindexes.is_empty()) {
        (Some(_), false) => Err(fail(
            &spec.name,
            spec.index,
            0,
            "subindexes and generate_subindexes are mutually exclusive",
        )),
        (None, _) => {
            // Explicit subentries of an array must share one data type.
            let mut member_type: Option<DataTypeName> = None;
            for sub in &spec.subindexes {
                match member_type {
                    None => member_type = Some(sub.data_type),
                    Some(dt) if dt == sub.data_type => {}
                    Some(_) => {
                        return Err(fail(
                            &spec.name,
                            spec.index,
                            sub.subindex,
                            "array subentries must share one data type",
                        ));
                    }
                }
                let var =
                    build_variable(&ScalarSpec::of_subindex(sub), spec.index, sub.subindex)?;
                add_member(&mut container, &spec.name, var)?;
            }
            Ok(container)
        }
        (Some(template), true) => {
            match template.mode {
                GenerateMode::FixedLength => {
                    for n in 1..=template.count {
                        let name = format!("{}_{}", template.name, n);
                        let var = build_variable(
                            &ScalarSpec::of_template(template, &name),
                            spec.index,
                            n,
                        )?;
                        add_member(&mut container, &spec.name, var)?;
                    }
                }
                GenerateMode::NodeIds => {
                    // One subentry per configured node, addressed by its
                    // node id; nodes without a bus id are skipped.
                    for card in cards.iter().filter(|c| c.node_id != 0) {
                        let var = build_variable(
                            &ScalarSpec::of_template(template, &card.name),
                            spec.index,
                            card.node_id,
                        )?;
                        add_member(&mut container, &spec.name, var)?;
                    }
                }
            }
            Ok(container)
        }
    }
}

fn add_member(container: &mut Container, entry: &str, var: Variable) -> Result<(), ConfigError> {
    let subindex = var.subindex;
    container
        .add_member(var)
        .map_err(|e| fail(entry, container.index, subindex, e.to_string()))
}
