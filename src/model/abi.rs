//! Trace ABI: byte order and native integer layout of the traced system.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    /// TSDL spelling of the byte order.
    pub fn as_tsdl(self) -> &'static str {
        match self {
            ByteOrder::Big => "be",
            ByteOrder::Little => "le",
        }
    }
}

/// Layout the tracer reported for the traced process. Provided at trace
/// class construction and never changed afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abi {
    pub bits_per_long: u32,
    pub long_alignment: u32,
    pub uint8_t_alignment: u32,
    pub uint16_t_alignment: u32,
    pub uint32_t_alignment: u32,
    pub uint64_t_alignment: u32,
    pub byte_order: ByteOrder,
}

impl Abi {
    /// The layout of a typical 64-bit little-endian producer.
    pub fn linux_x86_64() -> Self {
        Self {
            bits_per_long: 64,
            long_alignment: 64,
            uint8_t_alignment: 8,
            uint16_t_alignment: 16,
            uint32_t_alignment: 32,
            uint64_t_alignment: 64,
            byte_order: ByteOrder::Little,
        }
    }
}
