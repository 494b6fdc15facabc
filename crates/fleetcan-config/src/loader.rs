// crates/fleetcan-config/src/loader.rs

//! Loads and combines the YAML specs for one node: its own spec, its
//! common baseline (firmware-class or software-class) and an optional
//! mission overlay.

use crate::error::ConfigError;
use crate::model::{Card, CardConfig};
use crate::overlay;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Parses any spec document from YAML text. `label` identifies the
/// source in error messages.
pub fn parse_spec<T: DeserializeOwned>(label: &str, yaml: &str) -> Result<T, ConfigError> {
    serde_yaml::from_str(yaml).map_err(|source| ConfigError::Schema {
        file: label.to_string(),
        source,
    })
}

/// Reads and parses a spec document from a file.
pub fn read_spec<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let label = path.display().to_string();
    let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        file: label.clone(),
        source,
    })?;
    parse_spec(&label, &yaml)
}

/// Combines a node's own spec with its common baseline and applies the
/// mission overlay, yielding the config the assembler consumes.
///
/// The collector node keeps only its own outbound slots (the common
/// baseline's broadcasts would collide with the telemetry it gathers)
/// and is the only node whose persisted-field list is honored.
pub fn load_card_config(
    card: &Card,
    own: &CardConfig,
    common: &CardConfig,
    mission_overlay: Option<&CardConfig>,
) -> CardConfig {
    let mut config = CardConfig::default();

    let mut std_objects: Vec<String> = common
        .std_objects
        .iter()
        .chain(own.std_objects.iter())
        .cloned()
        .collect();
    std_objects.sort();
    std_objects.dedup();
    config.std_objects = std_objects;

    config.objects = common.objects.iter().chain(own.objects.iter()).cloned().collect();
    config.rpdos = common.rpdos.iter().chain(own.rpdos.iter()).cloned().collect();

    if card.collector {
        config.tpdos = own.tpdos.clone();
        config.persist_fields = own.persist_fields.clone();
    } else {
        config.tpdos = common.tpdos.iter().chain(own.tpdos.iter()).cloned().collect();
    }

    match mission_overlay {
        Some(over) => {
            log::trace!("applying mission overlay to '{}'", card.name);
            overlay::merge(&config, over)
        }
        None => config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str, collector: bool) -> Card {
        Card {
            name: name.to_string(),
            nice_name: name.to_string(),
            node_id: 0x04,
            base: String::new(),
            common: "software".to_string(),
            collector,
        }
    }

    fn config(yaml: &str) -> CardConfig {
        parse_spec("test.yaml", yaml).unwrap()
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let err = parse_spec::<CardConfig>("battery.yaml", "objects: {not: a list}").unwrap_err();
        assert!(err.to_string().contains("battery.yaml"));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let err = read_spec::<CardConfig>(Path::new("/no/such/file.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_standard_objects_are_deduplicated_and_sorted() {
        let own = config("standard_objects: [versions, device_type]");
        let common = config("standard_objects: [device_type, error_register]");
        let merged = load_card_config(&card("battery", false), &own, &common, None);
        assert_eq!(
            merged.std_objects,
            vec!["device_type", "error_register", "versions"]
        );
    }

    #[test]
    fn test_common_tpdos_kept_for_ordinary_nodes() {
        let own = config("tpdos: [{num: 2, fields: [[b]]}]");
        let common = config("tpdos: [{num: 1, fields: [[a]]}]");
        let merged = load_card_config(&card("battery", false), &own, &common, None);
        assert_eq!(merged.tpdos.len(), 2);
        assert_eq!(merged.tpdos[0].num, 1);
    }

    #[test]
    fn test_collector_drops_common_tpdos_and_keeps_persist_fields() {
        let own = config("{tpdos: [{num: 1, fields: [[b]]}], persist_fields: [[system, uptime]]}");
        let common = config("{tpdos: [{num: 1, fields: [[a]]}], persist_fields: [[x]]}");
        let merged = load_card_config(&card("hub", true), &own, &common, None);
        assert_eq!(merged.tpdos.len(), 1);
        assert_eq!(merged.tpdos[0].fields[0].name(), "b");
        assert_eq!(merged.persist_fields.len(), 1);
        assert_eq!(merged.persist_fields[0].name(), "system");
    }

    #[test]
    fn test_overlay_applied_last() {
        let own = config("objects: [{index: 0x4000, name: reading, data_type: uint8}]");
        let common = CardConfig::default();
        let over = config("objects: [{index: 0x4000, name: reading_mv, data_type: uint16}]");
        let merged = load_card_config(&card("battery", false), &own, &common, Some(&over));
        assert_eq!(merged.objects[0].name, "reading_mv");
    }
}
