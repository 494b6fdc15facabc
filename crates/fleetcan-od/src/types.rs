use core::convert::TryFrom;
use core::fmt;

/// Represents a CAN node id, wrapping a `u8` to ensure type safety.
///
/// Valid node ids are in the range 1-127 (11-bit CAN identifiers leave
/// 7 bits of node addressing below the function code). The newtype
/// prevents accidental use of arbitrary `u8` values where a node id is
/// required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u8);

/// Maximum assignable node id.
pub const MAX_NODE_ID: u8 = 0x7F;

/// Default bus bit rate for every node, in bits per second.
pub const DEFAULT_BITRATE: u32 = 1_000_000;

/// Base COB-ID for emergency messages; each node adds its node id.
pub const EMCY_COB_BASE: u32 = 0x80;

/// Error type for invalid node id creation.
#[derive(Debug, PartialEq, Eq)]
pub enum NodeIdError {
    /// Node id is outside the valid range (1-127).
    InvalidRange(u8),
}

impl fmt::Display for NodeIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeIdError::InvalidRange(value) => {
                write!(f, "Invalid node id {}. Valid range is 1-127", value)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for NodeIdError {}

impl TryFrom<u8> for NodeId {
    type Error = NodeIdError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1..=MAX_NODE_ID => Ok(NodeId(value)),
            _ => Err(NodeIdError::InvalidRange(value)),
        }
    }
}

impl From<NodeId> for u8 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_range() {
        assert_eq!(NodeId::try_from(0x01), Ok(NodeId(0x01)));
        assert_eq!(NodeId::try_from(0x7F), Ok(NodeId(0x7F)));
        assert_eq!(NodeId::try_from(0x00), Err(NodeIdError::InvalidRange(0)));
        assert_eq!(
            NodeId::try_from(0x80),
            Err(NodeIdError::InvalidRange(0x80))
        );
    }
}
