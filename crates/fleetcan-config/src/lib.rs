// src/lib.rs

#![doc = "Compiles declarative YAML node specs into per-node Object Dictionaries."]
#![doc = ""]
#![doc = "The pipeline: `loader` parses and combines each node's own spec with its"]
#![doc = "common baseline and mission overlay, `builder` turns object specs into"]
#![doc = "validated entries, `wiring` expands broadcast/subscription slots, and"]
#![doc = "`assembler` produces one frozen OD per node plus the collector's beacon"]
#![doc = "and persistence field lists."]

// --- Crate Modules ---

mod assembler;
mod builder;
mod catalog;
mod error;
mod loader;
mod model;
mod overlay;
mod wiring;

// --- Public API Re-exports ---

pub use assembler::{OdDb, VENDOR_NAME, assemble, assemble_base_od};
pub use builder::build_entry;
pub use catalog::StandardObjectCatalog;
pub use error::ConfigError;
pub use loader::{load_card_config, parse_spec, read_spec};
pub use model::{
    AccessName, Ax25Config, BeaconConfig, BitsSpec, Card, CardConfig, ConfigValue, DataTypeName,
    FieldRef, GenerateMode, GenerateSubindexes, Mission, ObjectSpec, ObjectType, RpdoSpec,
    SubindexSpec, TpdoMode, TpdoSpec,
};
pub use overlay::merge;
pub use wiring::{RpdoWiring, add_tpdo};
