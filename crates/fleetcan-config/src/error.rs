// crates/fleetcan-config/src/error.rs

use fleetcan_od::OdError;
use std::fmt;

/// Errors that can occur while compiling node configs into ODs.
///
/// Every failure is a fail-fast build error surfaced to the config
/// author; nothing here is recoverable inside the engine.
#[derive(Debug)]
pub enum ConfigError {
    /// A spec file could not be read.
    Io {
        file: String,
        source: std::io::Error,
    },

    /// A spec file violates its structural schema (unknown, missing or
    /// mistyped field). Carries the file label and the serde path.
    Schema {
        file: String,
        source: serde_yaml::Error,
    },

    /// An entry-level invariant was violated.
    Validation {
        entry: String,
        index: u16,
        subindex: u8,
        rule: String,
    },

    /// A PDO field, overlay target, or producer/slot reference did not
    /// resolve.
    Reference { node: String, reference: String },

    /// Index collision, PDO bit overflow, subindex overflow, or slot
    /// exhaustion.
    Capacity { node: String, detail: String },
}

impl ConfigError {
    /// Wraps an OD access failure with the node it happened on,
    /// classifying it into the reference/capacity taxonomy.
    pub(crate) fn from_od(node: &str, err: OdError) -> Self {
        match err {
            OdError::DuplicateIndex(_)
            | OdError::SubindexOverflow(_)
            | OdError::ReservedSubindex(_) => ConfigError::Capacity {
                node: node.into(),
                detail: err.to_string(),
            },
            OdError::ObjectNotFound(_)
            | OdError::SubObjectNotFound { .. }
            | OdError::NameNotFound(_)
            | OdError::NotAContainer(_) => ConfigError::Reference {
                node: node.into(),
                reference: err.to_string(),
            },
        }
    }

    pub(crate) fn validation(
        entry: &str,
        index: u16,
        subindex: u8,
        rule: impl Into<String>,
    ) -> Self {
        ConfigError::Validation {
            entry: entry.into(),
            index,
            subindex,
            rule: rule.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { file, source } => write!(f, "failed to read '{}': {}", file, source),
            Self::Schema { file, source } => {
                write!(f, "schema error in '{}': {}", file, source)
            }
            Self::Validation {
                entry,
                index,
                subindex,
                rule,
            } => write!(
                f,
                "validation error for '{}' ({:#06X}/{}): {}",
                entry, index, subindex, rule
            ),
            Self::Reference { node, reference } => {
                write!(f, "unresolved reference on node '{}': {}", node, reference)
            }
            Self::Capacity { node, detail } => {
                write!(f, "capacity exceeded on node '{}': {}", node, detail)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Schema { source, .. } => Some(source),
            _ => None,
        }
    }
}
