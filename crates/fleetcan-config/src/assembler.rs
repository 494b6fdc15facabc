// crates/fleetcan-config/src/assembler.rs

//! Top-level orchestration: builds one Object Dictionary per node for a
//! mission, wires every PDO, applies the mission fixups and freezes the
//! result.

use crate::catalog::StandardObjectCatalog;
use crate::error::ConfigError;
use crate::model::{BeaconConfig, Card, CardConfig, FieldRef, Mission};
use crate::{builder, wiring};
use fleetcan_od::types::EMCY_COB_BASE;
use fleetcan_od::{
    AccessType, Entry, NodeId, ObjectDictionary, Value, Variable,
};
use std::collections::BTreeMap;

/// Vendor string stamped into every OD.
pub const VENDOR_NAME: &str = "FleetCAN";

/// Node id of the firmware-base OD; outside the fleet's assigned range.
const FW_BASE_NODE_ID: u8 = 0x7C;
const FW_BASE_PRODUCT_NAME: &str = "Firmware Base";

/// The assembled dictionaries of one mission, plus the resolved beacon
/// and persistence field lists of the collector node.
#[derive(Debug, Clone)]
pub struct OdDb {
    ods: BTreeMap<String, ObjectDictionary>,
    collector: Option<String>,
    beacon_fields: Vec<(u16, u8)>,
    persist_fields: Vec<(u16, u8)>,
}

impl OdDb {
    pub fn od(&self, node: &str) -> Option<&ObjectDictionary> {
        self.ods.get(node)
    }

    /// ODs in node-name order.
    pub fn ods(&self) -> impl Iterator<Item = (&str, &ObjectDictionary)> {
        self.ods.iter().map(|(name, od)| (name.as_str(), od))
    }

    pub fn collector_od(&self) -> Option<&ObjectDictionary> {
        self.collector.as_deref().and_then(|name| self.ods.get(name))
    }

    /// The beacon payload, as the ordered scalars it serializes.
    pub fn beacon_fields(&self) -> Vec<&Variable> {
        self.resolve_fields(&self.beacon_fields)
    }

    /// The scalars the collector persists to non-volatile storage.
    pub fn persist_fields(&self) -> Vec<&Variable> {
        self.resolve_fields(&self.persist_fields)
    }

    fn resolve_fields(&self, fields: &[(u16, u8)]) -> Vec<&Variable> {
        let Some(od) = self.collector_od() else {
            return Vec::new();
        };
        fields
            .iter()
            .filter_map(|&(index, subindex)| od.variable(index, subindex).ok())
            .collect()
    }
}

/// Builds every node's OD for one mission. `cards` fixes the node
/// processing order; the collector is wired last since it mirrors every
/// other node's finished broadcasts.
pub fn assemble(
    mission: &Mission,
    missions: &[Mission],
    cards: &[Card],
    configs: &BTreeMap<String, CardConfig>,
    beacon: Option<&BeaconConfig>,
    catalog: &StandardObjectCatalog,
) -> Result<OdDb, ConfigError> {
    let mut ods: BTreeMap<String, ObjectDictionary> = BTreeMap::new();

    for card in active_cards(cards, configs) {
        let config = &configs[&card.name];
        let od = build_node_od(card, config, cards, catalog, mission, missions, beacon)?;
        ods.insert(card.name.clone(), od);
    }

    let collector = cards
        .iter()
        .find(|c| c.collector && ods.contains_key(&c.name));

    // Inbound derivation on the collector: every other node's every
    // outbound slot, in node order then slot order.
    if let Some(collector) = collector {
        let mut collector_od = take_od(&mut ods, &collector.name)?;
        let mut inbound = wiring::RpdoWiring::new();
        for card in active_cards(cards, configs) {
            if card.name == collector.name {
                continue;
            }
            let producer = &ods[&card.name];
            inbound.derive_all(&mut collector_od, &collector.name, producer, &card.name)?;
        }
        ods.insert(collector.name.clone(), collector_od);
    }

    // Config-declared subscriptions on ordinary nodes.
    for card in active_cards(cards, configs) {
        if card.collector {
            continue;
        }
        let config = &configs[&card.name];
        if config.rpdos.is_empty() {
            continue;
        }
        let mut od = take_od(&mut ods, &card.name)?;
        let mut inbound = wiring::RpdoWiring::new();
        for rpdo in &config.rpdos {
            if rpdo.producer_node == card.name {
                return Err(ConfigError::Reference {
                    node: card.name.clone(),
                    reference: "a node cannot subscribe to its own broadcasts".to_string(),
                });
            }
            let producer =
                ods.get(&rpdo.producer_node)
                    .ok_or_else(|| ConfigError::Reference {
                        node: card.name.clone(),
                        reference: format!("unknown producer node '{}'", rpdo.producer_node),
                    })?;
            let fields = (!rpdo.fields.is_empty()).then_some(rpdo.fields.as_slice());
            inbound.derive(
                &mut od,
                &card.name,
                producer,
                &rpdo.producer_node,
                rpdo.producer_tpdo_num,
                fields,
            )?;
        }
        ods.insert(card.name.clone(), od);
    }

    // Resolve the collector's beacon and persistence field lists while
    // the entries are addressable.
    let mut beacon_fields = Vec::new();
    let mut persist_fields = Vec::new();
    if let Some(collector) = collector {
        let od = &ods[&collector.name];
        if let Some(beacon) = beacon {
            beacon_fields = resolve_field_refs(od, &collector.name, &beacon.fields)?;
        }
        persist_fields =
            resolve_field_refs(od, &collector.name, &configs[&collector.name].persist_fields)?;
    }

    for od in ods.values_mut() {
        od.freeze_defaults();
    }

    Ok(OdDb {
        ods,
        collector: collector.map(|c| c.name.clone()),
        beacon_fields,
        persist_fields,
    })
}

/// Builds the standalone OD of the shared firmware image: the common
/// firmware config alone, under a fixed placeholder node id.
pub fn assemble_base_od(
    mission: &Mission,
    config: &CardConfig,
    catalog: &StandardObjectCatalog,
) -> Result<ObjectDictionary, ConfigError> {
    let mut od = ObjectDictionary::new(NodeId(FW_BASE_NODE_ID));
    od.device_info.vendor_name = VENDOR_NAME.to_string();
    od.device_info.product_name = FW_BASE_PRODUCT_NAME.to_string();

    add_config_objects(&mut od, "base", config, &[], catalog)?;
    for tpdo in &config.tpdos {
        wiring::add_tpdo(&mut od, "base", tpdo)?;
    }
    set_configs_version(&mut od);
    if let Some(Entry::Variable(var)) = od.entry_by_name_mut("satellite_id") {
        var.default = Value::Unsigned8(mission.id);
    }
    od.freeze_defaults();
    Ok(od)
}

/// Cards that take part in the bus: they have a config and a node id.
fn active_cards<'a>(
    cards: &'a [Card],
    configs: &'a BTreeMap<String, CardConfig>,
) -> impl Iterator<Item = &'a Card> {
    cards
        .iter()
        .filter(|c| c.node_id != 0 && configs.contains_key(&c.name))
}

fn take_od(
    ods: &mut BTreeMap<String, ObjectDictionary>,
    name: &str,
) -> Result<ObjectDictionary, ConfigError> {
    ods.remove(name).ok_or_else(|| ConfigError::Reference {
        node: name.to_string(),
        reference: "node has no assembled OD".to_string(),
    })
}

fn build_node_od(
    card: &Card,
    config: &CardConfig,
    cards: &[Card],
    catalog: &StandardObjectCatalog,
    mission: &Mission,
    missions: &[Mission],
    beacon: Option<&BeaconConfig>,
) -> Result<ObjectDictionary, ConfigError> {
    let node_id = NodeId::try_from(card.node_id)
        .map_err(|e| ConfigError::validation(&card.name, 0, 0, e.to_string()))?;
    let mut od = ObjectDictionary::new(node_id);
    od.device_info.vendor_name = VENDOR_NAME.to_string();
    od.device_info.product_name = card.nice_name.clone();

    add_config_objects(&mut od, &card.name, config, cards, catalog)?;

    for tpdo in &config.tpdos {
        wiring::add_tpdo(&mut od, &card.name, tpdo)?;
    }

    apply_mission_fixups(&mut od, card, mission, missions, beacon);
    Ok(od)
}

/// Adds the node's own objects, then the requested standard-catalog
/// entries not already present. The emergency COB-ID is node-relative
/// and is computed here, never in the catalog.
fn add_config_objects(
    od: &mut ObjectDictionary,
    node: &str,
    config: &CardConfig,
    cards: &[Card],
    catalog: &StandardObjectCatalog,
) -> Result<(), ConfigError> {
    for spec in &config.objects {
        let entry = builder::build_entry(spec, cards)?;
        od.insert(entry).map_err(|e| ConfigError::from_od(node, e))?;
    }

    for name in &config.std_objects {
        let spec = catalog.get(name).ok_or_else(|| ConfigError::Reference {
            node: node.to_string(),
            reference: format!("unknown standard object '{}'", name),
        })?;
        if od.contains_index(spec.index) {
            continue;
        }
        let mut entry = builder::build_entry(spec, cards)?;
        if spec.name == "cob_id_emergency_message" {
            if let Entry::Variable(var) = &mut entry {
                var.default = Value::Unsigned32(EMCY_COB_BASE + u32::from(od.node_id().0));
            }
        }
        od.insert(entry).map_err(|e| ConfigError::from_od(node, e))?;
    }
    Ok(())
}

/// Mission-specific defaults, each applied only when the target entry
/// exists so partial fleets still assemble.
fn apply_mission_fixups(
    od: &mut ObjectDictionary,
    card: &Card,
    mission: &Mission,
    missions: &[Mission],
    beacon: Option<&BeaconConfig>,
) {
    set_configs_version(od);

    if let Some(Entry::Variable(var)) = od.entry_by_name_mut("satellite_id") {
        var.default = Value::Unsigned8(mission.id);
        for m in missions {
            var.value_descriptions
                .insert(m.name.to_lowercase(), i128::from(m.id));
        }
    }

    if card.collector {
        if let Some(beacon) = beacon {
            apply_beacon_defaults(od, beacon);
        }
        if let Some(Entry::Variable(var)) = od.entry_by_name_mut("flight_mode") {
            var.access = AccessType::ReadOnly;
        }
    }
}

fn set_configs_version(od: &mut ObjectDictionary) {
    if let Some(container) = od
        .entry_by_name_mut("versions")
        .and_then(Entry::container_mut)
    {
        if let Some(var) = container.members_mut().find(|m| m.name == "configs_version") {
            var.default = Value::VisibleString(env!("CARGO_PKG_VERSION").to_string());
        }
    }
}

/// Writes the downlink framing defaults into the collector's beacon
/// record.
fn apply_beacon_defaults(od: &mut ObjectDictionary, beacon: &BeaconConfig) {
    let Some(container) = od
        .entry_by_name_mut("beacon")
        .and_then(Entry::container_mut)
    else {
        return;
    };
    let ax25 = &beacon.ax25;
    for member in container.members_mut() {
        match member.name.as_str() {
            "revision" => member.default = Value::Unsigned8(beacon.revision),
            "dest_callsign" => {
                member.default = Value::VisibleString(ax25.dest_callsign.clone())
            }
            "dest_ssid" => member.default = Value::Unsigned8(ax25.dest_ssid),
            "src_callsign" => member.default = Value::VisibleString(ax25.src_callsign.clone()),
            "src_ssid" => member.default = Value::Unsigned8(ax25.src_ssid),
            "control" => member.default = Value::Unsigned8(ax25.control),
            "command" => member.default = Value::Boolean(ax25.command),
            "response" => member.default = Value::Boolean(ax25.response),
            "pid" => member.default = Value::Unsigned8(ax25.pid),
            _ => {}
        }
    }
}

fn resolve_field_refs(
    od: &ObjectDictionary,
    node: &str,
    fields: &[FieldRef],
) -> Result<Vec<(u16, u8)>, ConfigError> {
    fields
        .iter()
        .map(|field| {
            od.variable_by_ref(field.name(), field.sub_name())
                .map(|var| (var.index, var.subindex))
                .map_err(|e| ConfigError::from_od(node, e))
        })
        .collect()
}
