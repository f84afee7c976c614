//! AV1 RTP aggregation header.
//!
//! ```text
//!  0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+
//! |Z|Y| W |N|-|-|-|
//! +-+-+-+-+-+-+-+-+
//! ```
//!
//! - **Z**: the first OBU element continues an OBU fragment from the
//!   previous packet.
//! - **Y**: the last OBU element continues in the next packet.
//! - **W**: number of OBU elements in the packet, or 0 when every element
//!   carries a length field.
//! - **N**: first packet of a coded video sequence.

use super::splitter::Fragmentation;

pub const AGGREGATION_HEADER_SIZE: usize = 1;

const Z_BIT: u8 = 0b1000_0000;
const Y_BIT: u8 = 0b0100_0000;
const W_SHIFT: u8 = 4;
const W_MASK: u8 = 0b0011_0000;
const N_BIT: u8 = 0b0000_1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregationHeader {
    pub z: bool,
    pub y: bool,
    pub w: u8,
    pub n: bool,
}

impl AggregationHeader {
    /// Header for a packet carrying exactly one OBU element.
    pub fn for_fragment(fragmentation: Fragmentation, first_packet: bool) -> Self {
        Self {
            z: fragmentation.continues_previous(),
            y: fragmentation.continues_in_next(),
            w: 1,
            n: first_packet,
        }
    }

    pub fn to_byte(self) -> u8 {
        let mut byte = (self.w << W_SHIFT) & W_MASK;
        if self.z {
            byte |= Z_BIT;
        }
        if self.y {
            byte |= Y_BIT;
        }
        if self.n {
            byte |= N_BIT;
        }
        byte
    }

    /// Reserved bits are ignored.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            z: byte & Z_BIT != 0,
            y: byte & Y_BIT != 0,
            w: (byte & W_MASK) >> W_SHIFT,
            n: byte & N_BIT != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfragmented_first_packet() {
        let h = AggregationHeader::for_fragment(Fragmentation::None, true);
        assert_eq!(h.to_byte(), 0b0001_1000);
    }

    #[test]
    fn fragment_roles_set_z_and_y() {
        let byte = |f| AggregationHeader::for_fragment(f, false).to_byte();
        assert_eq!(byte(Fragmentation::None), 0b0001_0000);
        assert_eq!(byte(Fragmentation::Start), 0b0101_0000);
        assert_eq!(byte(Fragmentation::Middle), 0b1101_0000);
        assert_eq!(byte(Fragmentation::End), 0b1001_0000);
    }

    #[test]
    fn decode_matches_encode() {
        let h = AggregationHeader {
            z: true,
            y: false,
            w: 3,
            n: true,
        };
        assert_eq!(AggregationHeader::from_byte(h.to_byte()), h);
    }

    #[test]
    fn decode_ignores_reserved_bits() {
        let h = AggregationHeader::from_byte(0b0101_0111);
        assert!(!h.z);
        assert!(h.y);
        assert_eq!(h.w, 1);
        assert!(!h.n);
    }

    #[test]
    fn w_is_two_bits() {
        let h = AggregationHeader {
            w: 7,
            ..Default::default()
        };
        assert_eq!(h.to_byte(), 0b0011_0000);
    }
}
