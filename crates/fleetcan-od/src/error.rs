use alloc::string::String;
use core::fmt;

/// Defines a portable, descriptive error type for Object Dictionary access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OdError {
    /// An entry already exists at the given index.
    DuplicateIndex(u16),
    /// The requested Object Dictionary index does not exist.
    ObjectNotFound(u16),
    /// The requested sub-index does not exist for the given object.
    SubObjectNotFound { index: u16, subindex: u8 },
    /// No entry with the given name exists in the dictionary.
    NameNotFound(String),
    /// The addressed object is a variable and carries no sub-entries.
    NotAContainer(u16),
    /// A container would exceed the 255 sub-index address space.
    SubindexOverflow(u16),
    /// Sub-index 0 is the implicit highest-subindex marker and cannot be
    /// added as a member.
    ReservedSubindex(u16),
}

impl fmt::Display for OdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateIndex(index) => {
                write!(f, "index {:#06X} already present in the OD", index)
            }
            Self::ObjectNotFound(index) => {
                write!(f, "index {:#06X} was not found in the OD", index)
            }
            Self::SubObjectNotFound { index, subindex } => {
                write!(
                    f,
                    "sub-index {:#04X} was not found at index {:#06X}",
                    subindex, index
                )
            }
            Self::NameNotFound(name) => write!(f, "no entry named '{}' in the OD", name),
            Self::NotAContainer(index) => {
                write!(f, "index {:#06X} is a variable and has no sub-entries", index)
            }
            Self::SubindexOverflow(index) => {
                write!(f, "index {:#06X} exceeds the 255 sub-index limit", index)
            }
            Self::ReservedSubindex(index) => {
                write!(
                    f,
                    "sub-index 0 at index {:#06X} is implicit and cannot be added",
                    index
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for OdError {}
