// crates/fleetcan-config/src/catalog.rs

//! Catalog of well-known, reusable object definitions (identity, error
//! register, heartbeat objects, ...). Node specs reference catalog
//! entries by name through their `std_objects` list.

use crate::error::ConfigError;
use crate::model::ObjectSpec;

/// The catalog file bundled with the crate.
const BUNDLED_CATALOG: &str = include_str!("../data/standard_objects.yaml");
const BUNDLED_CATALOG_LABEL: &str = "standard_objects.yaml";

#[derive(Debug, Clone)]
pub struct StandardObjectCatalog {
    objects: Vec<ObjectSpec>,
}

impl StandardObjectCatalog {
    /// Parses the catalog bundled into the crate.
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_str(BUNDLED_CATALOG_LABEL, BUNDLED_CATALOG)
    }

    /// Parses a catalog from YAML text. `label` identifies the source in
    /// error messages.
    pub fn from_str(label: &str, yaml: &str) -> Result<Self, ConfigError> {
        let objects: Vec<ObjectSpec> =
            serde_yaml::from_str(yaml).map_err(|source| ConfigError::Schema {
                file: label.to_string(),
                source,
            })?;
        log::trace!("loaded {} catalog objects from {}", objects.len(), label);
        Ok(StandardObjectCatalog { objects })
    }

    /// Looks up a catalog object by name.
    pub fn get(&self, name: &str) -> Option<&ObjectSpec> {
        self.objects.iter().find(|obj| obj.name == name)
    }

    pub fn objects(&self) -> &[ObjectSpec] {
        &self.objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectType;

    #[test]
    fn test_bundled_catalog_parses() {
        let catalog = StandardObjectCatalog::bundled().unwrap();
        assert!(!catalog.objects().is_empty());
    }

    #[test]
    fn test_lookup_by_name() {
        let catalog = StandardObjectCatalog::bundled().unwrap();
        let identity = catalog.get("identity").unwrap();
        assert_eq!(identity.index, 0x1018);
        assert_eq!(identity.object_type, ObjectType::Record);
        assert!(catalog.get("no_such_object").is_none());
    }

    #[test]
    fn test_bad_catalog_reports_label() {
        let err = StandardObjectCatalog::from_str("custom.yaml", "not: [valid").unwrap_err();
        assert!(err.to_string().contains("custom.yaml"));
    }
}
