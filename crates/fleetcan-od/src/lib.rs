#![cfg_attr(not(feature = "std"), no_std)]

// 'alloc' is used for dynamic allocation (entry names, containers).
extern crate alloc;

// --- Foundation Modules ---
pub mod error;
pub mod types;

// --- Object Dictionary ---
pub mod od;
pub mod pdo;

// --- Top-level Exports ---
pub use error::OdError;
pub use od::{
    AccessType, Container, DataType, DeviceInfo, Entry, EntryKind, ObjectDictionary, Value,
    Variable,
};
pub use pdo::{MappedObject, PdoKind, pdo_cob_id};
pub use types::NodeId;
