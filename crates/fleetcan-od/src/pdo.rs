// crates/fleetcan-od/src/pdo.rs

//! PDO addressing: communication/mapping base indices, the COB-ID
//! formula, and the packed 32-bit mapping-entry wire format.

use crate::types::NodeId;
use core::fmt;

/// Outbound broadcast (TPDO) or inbound subscription (RPDO).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdoKind {
    Tpdo,
    Rpdo,
}

impl PdoKind {
    /// Base index of the communication-parameter records for this kind.
    pub fn comm_base(&self) -> u16 {
        match self {
            PdoKind::Tpdo => 0x1800,
            PdoKind::Rpdo => 0x1400,
        }
    }

    /// Base index of the mapping-parameter records for this kind.
    pub fn mapping_base(&self) -> u16 {
        match self {
            PdoKind::Tpdo => 0x1A00,
            PdoKind::Rpdo => 0x1600,
        }
    }
}

impl fmt::Display for PdoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdoKind::Tpdo => f.write_str("tpdo"),
            PdoKind::Rpdo => f.write_str("rpdo"),
        }
    }
}

/// Maximum PDO slots per node and direction.
pub const MAX_PDOS: u8 = 16;

/// A PDO frame carries at most 64 bits of mapped data.
pub const PDO_MAX_BITS: u16 = 64;

/// Transmission type value for event-driven (non-periodic) PDOs.
pub const TRANSMISSION_EVENT_DRIVEN: u8 = 0xFE;

/// COB-ID flag bit: set when the PDO does not allow remote-transmission
/// requests.
pub const COB_NO_RTR: u32 = 1 << 30;

/// Computes the bus channel identifier of a PDO slot.
///
/// Each node owns four consecutive CAN ids per function code, so slots
/// 1-4 spread over the function codes and slots 5-16 step the node id,
/// giving 16 slots per node instead of the generic 4.
pub fn pdo_cob_id(node_id: NodeId, slot: u8) -> u32 {
    let slot = u32::from(slot);
    u32::from(node_id.0) + ((slot - 1) % 4) * 0x100 + (slot - 1) / 4 + 0x180
}

/// One mapped field of a PDO: which scalar the slot carries and how wide
/// it is on the wire. Packed as `(index:16 | subindex:8 | bit_length:8)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedObject {
    /// Object Dictionary index of the mapped scalar.
    pub index: u16,
    /// Object Dictionary sub-index of the mapped scalar.
    pub subindex: u8,
    /// Width of the scalar in the frame, in bits.
    pub bit_length: u8,
}

impl MappedObject {
    /// Serializes the mapping entry into the 32-bit OD representation.
    pub fn to_u32(&self) -> u32 {
        (u32::from(self.index) << 16) | (u32::from(self.subindex) << 8) | u32::from(self.bit_length)
    }

    /// Deserializes a 32-bit OD value into a mapping entry.
    pub fn from_u32(value: u32) -> Self {
        MappedObject {
            index: (value >> 16) as u16,
            subindex: (value >> 8) as u8,
            bit_length: value as u8,
        }
    }
}
