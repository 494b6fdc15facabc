// crates/fleetcan-config/src/wiring.rs

//! PDO wiring: expands declared outbound broadcast slots into addressed
//! communication/mapping records, and derives the matching inbound
//! subscription records on a consuming node (normally the collector).

use crate::error::ConfigError;
use crate::model::{FieldRef, TpdoMode, TpdoSpec};
use fleetcan_od::pdo::{
    COB_NO_RTR, MAX_PDOS, MappedObject, PDO_MAX_BITS, PdoKind, TRANSMISSION_EVENT_DRIVEN,
    pdo_cob_id,
};
use fleetcan_od::{AccessType, Container, DataType, Entry, ObjectDictionary, Value, Variable};
use std::collections::BTreeSet;

/// Base index of the per-producer mirror containers on a consuming
/// node; the producer's node id is added to it.
pub const MIRROR_BASE_INDEX: u16 = 0x5000;

/// The legacy time-reference broadcast is declared on the time-source
/// node as its last outbound slot, but goes out on the first slot of
/// node id 1 so every node can hard-code its arbitration id. This is a
/// narrow exception tied to one card, not a general renumbering rule.
pub const TIME_SYNC_PRODUCT_NAME: &str = "GPS";
pub const TIME_SYNC_SLOT: u8 = 16;
/// `pdo_cob_id(NodeId(1), 1)`.
const TIME_SYNC_COB_ID: u32 = 0x181;
/// The shared time object every node carries; the time-reference
/// subscription maps straight onto it instead of a mirror container.
const TIME_SYNC_MIRROR_INDEX: u16 = 0x2010;

/// Inbound slots are bounded by the communication-parameter index space,
/// not by the per-node slot numbering; the collector subscribes to the
/// whole fleet.
const MAX_INBOUND_SLOTS: u16 = 0x200;

fn comm_index(kind: PdoKind, slot: u16) -> u16 {
    kind.comm_base() + slot - 1
}

fn mapping_index(kind: PdoKind, slot: u16) -> u16 {
    kind.mapping_base() + slot - 1
}

/// Expands one declared outbound slot into its communication and
/// mapping records on the node's own OD.
pub fn add_tpdo(od: &mut ObjectDictionary, node: &str, tpdo: &TpdoSpec) -> Result<(), ConfigError> {
    if tpdo.num == 0 || tpdo.num > MAX_PDOS {
        return Err(ConfigError::Capacity {
            node: node.to_string(),
            detail: format!("tpdo slot {} is outside 1..={}", tpdo.num, MAX_PDOS),
        });
    }

    // Resolve every field against the node's own OD before touching it.
    let mut mapped: Vec<MappedObject> = Vec::with_capacity(tpdo.fields.len());
    let mut total_bits: u16 = 0;
    for field in &tpdo.fields {
        let var = od
            .variable_by_ref(field.name(), field.sub_name())
            .map_err(|e| ConfigError::from_od(node, e))?;
        if !var.pdo_mappable {
            return Err(ConfigError::Reference {
                node: node.to_string(),
                reference: format!("field '{}' is not pdo-mappable", var.name),
            });
        }
        total_bits += u16::from(var.bit_size());
        mapped.push(MappedObject {
            index: var.index,
            subindex: var.subindex,
            bit_length: var.bit_size(),
        });
    }
    if total_bits > PDO_MAX_BITS {
        return Err(ConfigError::Capacity {
            node: node.to_string(),
            detail: format!(
                "tpdo {} carries {} bits, more than the {}-bit frame",
                tpdo.num, total_bits, PDO_MAX_BITS
            ),
        });
    }

    let map_index = mapping_index(PdoKind::Tpdo, u16::from(tpdo.num));
    let mut map_rec = Container::new(format!("tpdo_{}_mapping_parameters", tpdo.num), map_index);
    for (i, obj) in mapped.iter().enumerate() {
        let subindex = i as u8 + 1;
        map_rec
            .add_member(Variable::const_u32(
                format!("mapping_object_{}", subindex),
                map_index,
                subindex,
                obj.to_u32(),
            ))
            .map_err(|e| ConfigError::from_od(node, e))?;
    }

    // The time-reference slot keeps its own record indices but goes out
    // on the fixed low arbitration id.
    let mut cob_id = if od.device_info.product_name == TIME_SYNC_PRODUCT_NAME
        && tpdo.num == TIME_SYNC_SLOT
    {
        TIME_SYNC_COB_ID
    } else {
        pdo_cob_id(od.node_id(), tpdo.num)
    };
    if tpdo.rtr {
        cob_id |= COB_NO_RTR;
    }

    let transmission = match tpdo.mode {
        TpdoMode::Sync => tpdo.sync_divisor,
        TpdoMode::Timer => TRANSMISSION_EVENT_DRIVEN,
    };

    let idx = comm_index(PdoKind::Tpdo, u16::from(tpdo.num));
    let mut comm_rec = Container::new(format!("tpdo_{}_communication_parameters", tpdo.num), idx);
    let mut event_timer = Variable::new("event_timer", idx, 0x5, DataType::Uint16, AccessType::ReadWrite);
    event_timer.default = Value::Unsigned16(tpdo.event_timer_ms);
    for member in [
        Variable::const_u32("cob_id", idx, 0x1, cob_id),
        Variable::const_u8("transmission_type", idx, 0x2, transmission),
        Variable::const_u16("inhibit_time", idx, 0x3, tpdo.inhibit_time_ms),
        event_timer,
        Variable::const_u8("sync_start_value", idx, 0x6, tpdo.sync_start),
    ] {
        comm_rec
            .add_member(member)
            .map_err(|e| ConfigError::from_od(node, e))?;
    }

    od.insert(Entry::Record(map_rec))
        .map_err(|e| ConfigError::from_od(node, e))?;
    od.insert(Entry::Record(comm_rec))
        .map_err(|e| ConfigError::from_od(node, e))?;
    od.device_info.nr_of_tpdos += 1;
    log::trace!("{}: wired tpdo {} ({:#X})", node, tpdo.num, cob_id);
    Ok(())
}

/// Inbound wiring context for one consuming node. Subscription slots
/// are numbered by a monotonic counter across the whole OD so that
/// derivation order alone fixes every index.
pub struct RpdoWiring {
    slots_used: u16,
}

impl RpdoWiring {
    pub fn new() -> Self {
        RpdoWiring { slots_used: 0 }
    }

    /// Derives subscriptions for every outbound slot the producer has
    /// wired, in ascending slot order.
    pub fn derive_all(
        &mut self,
        consumer: &mut ObjectDictionary,
        consumer_name: &str,
        producer: &ObjectDictionary,
        producer_name: &str,
    ) -> Result<(), ConfigError> {
        if producer.device_info.nr_of_tpdos == 0 {
            return Ok(());
        }
        for slot in 1..=MAX_PDOS {
            if producer.contains_index(comm_index(PdoKind::Tpdo, u16::from(slot))) {
                self.derive(consumer, consumer_name, producer, producer_name, slot, None)?;
            }
        }
        Ok(())
    }

    /// Derives one subscription from the producer's outbound slot,
    /// mirroring its fields (or the given subset) into the consumer's OD.
    pub fn derive(
        &mut self,
        consumer: &mut ObjectDictionary,
        consumer_name: &str,
        producer: &ObjectDictionary,
        producer_name: &str,
        slot: u8,
        fields: Option<&[FieldRef]>,
    ) -> Result<(), ConfigError> {
        // Derivation runs before the ODs are frozen, so the producer's
        // records carry defaults only.
        let tpdo_comm = comm_index(PdoKind::Tpdo, u16::from(slot));
        let cob_id = producer
            .variable(tpdo_comm, 0x1)
            .ok()
            .and_then(|v| v.default.as_u32())
            .ok_or_else(|| ConfigError::Reference {
                node: consumer_name.to_string(),
                reference: format!("node '{}' has no outbound slot {}", producer_name, slot),
            })?;
        let tpdo_map = producer
            .entry(mapping_index(PdoKind::Tpdo, u16::from(slot)))
            .and_then(Entry::container)
            .ok_or_else(|| ConfigError::Reference {
                node: consumer_name.to_string(),
                reference: format!("node '{}' has no outbound slot {}", producer_name, slot),
            })?;
        let time_sync = cob_id == TIME_SYNC_COB_ID;

        // An explicit field subset is resolved against the producer and
        // must name fields actually carried by the slot.
        let filter = match fields {
            None => None,
            Some(refs) => Some(self.resolve_filter(
                consumer_name,
                producer,
                producer_name,
                tpdo_map,
                refs,
            )?),
        };

        if self.slots_used >= MAX_INBOUND_SLOTS {
            return Err(ConfigError::Capacity {
                node: consumer_name.to_string(),
                detail: format!("more than {} inbound slots", MAX_INBOUND_SLOTS),
            });
        }
        self.slots_used += 1;
        let rpdo_num = self.slots_used;

        let mirror_index = if time_sync {
            TIME_SYNC_MIRROR_INDEX
        } else {
            MIRROR_BASE_INDEX + u16::from(producer.node_id().0)
        };
        if time_sync {
            // The shared time object must already exist on the consumer.
            consumer
                .variable(TIME_SYNC_MIRROR_INDEX, 0)
                .map_err(|e| ConfigError::from_od(consumer_name, e))?;
        } else if !consumer.contains_index(mirror_index) {
            let mut rec = Container::new(producer_name, mirror_index);
            rec.description = format!("fields mirrored from {} broadcasts", producer_name);
            consumer
                .insert(Entry::Record(rec))
                .map_err(|e| ConfigError::from_od(consumer_name, e))?;
        }

        let mut inbound_map: Vec<MappedObject> = Vec::new();
        for member in tpdo_map.members() {
            let Some(raw) = member.default.as_int() else {
                continue;
            };
            let source = MappedObject::from_u32(raw as u32);
            if let Some(filter) = &filter {
                if !filter.contains(&(source.index, source.subindex)) {
                    continue;
                }
            }
            if time_sync {
                let time_var = consumer
                    .variable(TIME_SYNC_MIRROR_INDEX, 0)
                    .map_err(|e| ConfigError::from_od(consumer_name, e))?;
                inbound_map.push(MappedObject {
                    index: TIME_SYNC_MIRROR_INDEX,
                    subindex: 0,
                    bit_length: time_var.bit_size(),
                });
                continue;
            }

            let mut mirror = mirror_variable(producer, &source, mirror_index).map_err(
                |reference| ConfigError::Reference {
                    node: consumer_name.to_string(),
                    reference,
                },
            )?;
            let container = consumer
                .entry_mut(mirror_index)
                .and_then(Entry::container_mut)
                .ok_or_else(|| ConfigError::Reference {
                    node: consumer_name.to_string(),
                    reference: format!("mirror container {:#06X} is not a record", mirror_index),
                })?;
            mirror.subindex = container.next_subindex();
            let mirror_subindex = mirror.subindex;
            let bit_length = mirror.bit_size();
            container
                .add_member(mirror)
                .map_err(|e| ConfigError::from_od(consumer_name, e))?;
            inbound_map.push(MappedObject {
                index: mirror_index,
                subindex: mirror_subindex,
                bit_length,
            });
        }

        let idx = comm_index(PdoKind::Rpdo, rpdo_num);
        let mut comm_rec = Container::new(format!("rpdo_{}_communication_parameters", rpdo_num), idx);
        for member in [
            Variable::const_u32("cob_id", idx, 0x1, cob_id),
            Variable::const_u8("transmission_type", idx, 0x2, TRANSMISSION_EVENT_DRIVEN),
            Variable::const_u16("event_timer", idx, 0x5, 0),
        ] {
            comm_rec
                .add_member(member)
                .map_err(|e| ConfigError::from_od(consumer_name, e))?;
        }

        let map_index = mapping_index(PdoKind::Rpdo, rpdo_num);
        let mut map_rec = Container::new(format!("rpdo_{}_mapping_parameters", rpdo_num), map_index);
        for (i, obj) in inbound_map.iter().enumerate() {
            let subindex = i as u8 + 1;
            map_rec
                .add_member(Variable::const_u32(
                    format!("mapping_object_{}", subindex),
                    map_index,
                    subindex,
                    obj.to_u32(),
                ))
                .map_err(|e| ConfigError::from_od(consumer_name, e))?;
        }

        consumer
            .insert(Entry::Record(comm_rec))
            .map_err(|e| ConfigError::from_od(consumer_name, e))?;
        consumer
            .insert(Entry::Record(map_rec))
            .map_err(|e| ConfigError::from_od(consumer_name, e))?;
        consumer.device_info.nr_of_rpdos += 1;
        log::trace!(
            "{}: wired rpdo {} from {} slot {} ({:#X})",
            consumer_name,
            rpdo_num,
            producer_name,
            slot,
            cob_id
        );
        Ok(())
    }

    fn resolve_filter(
        &self,
        consumer_name: &str,
        producer: &ObjectDictionary,
        producer_name: &str,
        tpdo_map: &Container,
        refs: &[FieldRef],
    ) -> Result<BTreeSet<(u16, u8)>, ConfigError> {
        let carried: BTreeSet<(u16, u8)> = tpdo_map
            .members()
            .iter()
            .filter_map(|m| m.default.as_int())
            .map(|raw| {
                let obj = MappedObject::from_u32(raw as u32);
                (obj.index, obj.subindex)
            })
            .collect();
        let mut filter = BTreeSet::new();
        for field in refs {
            let var = producer
                .variable_by_ref(field.name(), field.sub_name())
                .map_err(|e| ConfigError::from_od(consumer_name, e))?;
            if !carried.contains(&(var.index, var.subindex)) {
                return Err(ConfigError::Reference {
                    node: consumer_name.to_string(),
                    reference: format!(
                        "field '{}' is not carried by {} slot",
                        var.name, producer_name
                    ),
                });
            }
            filter.insert((var.index, var.subindex));
        }
        Ok(filter)
    }
}

impl Default for RpdoWiring {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the local read-write mirror of one producer field, named
/// after the producer entry (and subentry, when nested).
fn mirror_variable(
    producer: &ObjectDictionary,
    source: &MappedObject,
    mirror_index: u16,
) -> Result<Variable, String> {
    let entry = producer.entry(source.index).ok_or_else(|| {
        format!("mapped object {:#06X} missing from producer", source.index)
    })?;
    let (name, var) = match entry {
        Entry::Variable(v) => (v.name.clone(), v),
        Entry::Array(c) | Entry::Record(c) => {
            let sub = c.subentry(source.subindex).ok_or_else(|| {
                format!(
                    "mapped object {:#06X}/{} missing from producer",
                    source.index, source.subindex
                )
            })?;
            (format!("{}_{}", c.name, sub.name), sub)
        }
    };

    // The caller assigns the subindex from the consumer's container.
    let mut mirror = Variable::new(name, mirror_index, 0, var.data_type, AccessType::ReadWrite);
    mirror.default = var.default.clone();
    mirror.description = var.description.clone();
    mirror.unit = var.unit.clone();
    mirror.scale_factor = var.scale_factor;
    mirror.low_limit = var.low_limit;
    mirror.high_limit = var.high_limit;
    mirror.value_descriptions = var.value_descriptions.clone();
    mirror.bit_definitions = var.bit_definitions.clone();
    mirror.pdo_mappable = true;
    Ok(mirror)
}
