// crates/fleetcan-config/src/overlay.rs

//! Mission overlay resolution.
//!
//! A mission overlay customizes a shared base config. Merging is pure:
//! both inputs are borrowed and the merged config is a fresh value, so
//! the base stays untouched for other missions.

use crate::model::{CardConfig, ObjectSpec, ObjectType};

/// Merges `overlay` on top of `base`. Overlay wins on conflict:
/// objects match by index, PDOs by slot number; anything unmatched in
/// the overlay is appended.
pub fn merge(base: &CardConfig, overlay: &CardConfig) -> CardConfig {
    let mut merged = base.clone();

    for obj in &overlay.objects {
        match merged.objects.iter_mut().find(|o| o.index == obj.index) {
            Some(target) => overlay_object(target, obj),
            None => merged.objects.push(obj.clone()),
        }
    }

    for tpdo in &overlay.tpdos {
        match merged.tpdos.iter_mut().find(|t| t.num == tpdo.num) {
            Some(target) => {
                target.fields = tpdo.fields.clone();
                target.event_timer_ms = tpdo.event_timer_ms;
                target.inhibit_time_ms = tpdo.inhibit_time_ms;
                target.sync_divisor = tpdo.sync_divisor;
            }
            None => merged.tpdos.push(tpdo.clone()),
        }
    }

    for rpdo in &overlay.rpdos {
        match merged.rpdos.iter_mut().find(|r| r.num == rpdo.num) {
            Some(target) => {
                target.producer_node = rpdo.producer_node.clone();
                target.producer_tpdo_num = rpdo.producer_tpdo_num;
            }
            None => merged.rpdos.push(rpdo.clone()),
        }
    }

    merged
}

fn overlay_object(target: &mut ObjectSpec, overlay: &ObjectSpec) {
    target.name = overlay.name.clone();
    if overlay.object_type == ObjectType::Scalar {
        target.data_type = overlay.data_type;
        target.access_type = overlay.access_type;
        target.low_limit = overlay.low_limit;
        target.high_limit = overlay.high_limit;
    } else {
        for sub in &overlay.subindexes {
            match target
                .subindexes
                .iter_mut()
                .find(|s| s.subindex == sub.subindex)
            {
                Some(target_sub) => {
                    target_sub.name = sub.name.clone();
                    target_sub.data_type = sub.data_type;
                    target_sub.access_type = sub.access_type;
                    target_sub.low_limit = sub.low_limit;
                    target_sub.high_limit = sub.high_limit;
                }
                None => target.subindexes.push(sub.clone()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccessName, DataTypeName};

    fn config(yaml: &str) -> CardConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_scalar_overlay_replaces_shape() {
        let base = config(
            "objects: [{index: 0x4000, name: reading, data_type: uint8, default: 3}]",
        );
        let overlay = config(
            "objects: [{index: 0x4000, name: reading_mv, data_type: uint16, access_type: ro, low_limit: 0, high_limit: 5000}]",
        );
        let merged = merge(&base, &overlay);
        assert_eq!(merged.objects.len(), 1);
        let obj = &merged.objects[0];
        assert_eq!(obj.name, "reading_mv");
        assert_eq!(obj.data_type, DataTypeName::Uint16);
        assert_eq!(obj.access_type, AccessName::Ro);
        assert_eq!(obj.high_limit, Some(5000));
        // the base's default survives; overlays only reshape
        assert!(obj.default.is_some());
    }

    #[test]
    fn test_unmatched_object_appended() {
        let base = config("objects: [{index: 0x4000, name: a}]");
        let overlay = config("objects: [{index: 0x4001, name: b}]");
        let merged = merge(&base, &overlay);
        assert_eq!(merged.objects.len(), 2);
        assert_eq!(merged.objects[1].name, "b");
    }

    #[test]
    fn test_container_subentries_merge_by_subindex() {
        let base = config(
            "objects: [{index: 0x4000, name: system, object_type: record, subindexes: [\
             {subindex: 1, name: temp, data_type: int16}]}]",
        );
        let overlay = config(
            "objects: [{index: 0x4000, name: system, object_type: record, subindexes: [\
             {subindex: 1, name: temp_c, data_type: int8}, \
             {subindex: 2, name: uptime, data_type: uint32}]}]",
        );
        let merged = merge(&base, &overlay);
        let subs = &merged.objects[0].subindexes;
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].name, "temp_c");
        assert_eq!(subs[0].data_type, DataTypeName::Int8);
        assert_eq!(subs[1].name, "uptime");
    }

    #[test]
    fn test_tpdo_overlay_matches_by_slot_number() {
        // Each overlay slot must only touch the base slot with the same
        // number, never whichever slot happens to come first.
        let base = config(
            "tpdos: [{num: 1, fields: [[a]], event_timer_ms: 1000}, \
                     {num: 2, fields: [[b]], event_timer_ms: 2000}]",
        );
        let overlay = config("tpdos: [{num: 2, fields: [[c]], event_timer_ms: 500}]");
        let merged = merge(&base, &overlay);
        assert_eq!(merged.tpdos.len(), 2);
        assert_eq!(merged.tpdos[0].fields[0].name(), "a");
        assert_eq!(merged.tpdos[0].event_timer_ms, 1000);
        assert_eq!(merged.tpdos[1].fields[0].name(), "c");
        assert_eq!(merged.tpdos[1].event_timer_ms, 500);
    }

    #[test]
    fn test_rpdo_overlay_replaces_producer() {
        let base = config("rpdos: [{num: 1, producer_node: battery, producer_tpdo_num: 1}]");
        let overlay = config("rpdos: [{num: 1, producer_node: solar, producer_tpdo_num: 3}, \
                               {num: 2, producer_node: gps, producer_tpdo_num: 1}]");
        let merged = merge(&base, &overlay);
        assert_eq!(merged.rpdos.len(), 2);
        assert_eq!(merged.rpdos[0].producer_node, "solar");
        assert_eq!(merged.rpdos[0].producer_tpdo_num, 3);
        assert_eq!(merged.rpdos[1].producer_node, "gps");
    }

    #[test]
    fn test_base_is_not_mutated() {
        let base = config("objects: [{index: 0x4000, name: a}]");
        let overlay = config("objects: [{index: 0x4000, name: renamed}]");
        let _ = merge(&base, &overlay);
        assert_eq!(base.objects[0].name, "a");
    }
}
