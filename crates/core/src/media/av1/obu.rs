//! OBU (Open Bitstream Unit) header location and classification.
//!
//! ```text
//!  0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+
//! |F|  type |X|S|R|      obu_header
//! +-+-+-+-+-+-+-+-+
//! | T | S |  res  |      obu_extension_header (when X = 1)
//! +-+-+-+-+-+-+-+-+
//! | obu_size ...  |      leb128 (when S = 1)
//! +-+-+-+-+-+-+-+-+
//! ```
//!
//! Without a size field the OBU extends to the end of the buffer.

use crate::error::{BitstreamErrorKind, PacketizerError, Result};

use super::bits::read_leb128;
pub use super::bits::{encode_leb128, leb128_size};

const FORBIDDEN_BIT_MASK: u8 = 0b1000_0000;
const TYPE_MASK: u8 = 0b0111_1000;
const EXTENSION_FLAG_MASK: u8 = 0b0000_0100;
const HAS_SIZE_FIELD_MASK: u8 = 0b0000_0010;

/// OBU type from the 4-bit `obu_type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObuType {
    SequenceHeader,
    TemporalDelimiter,
    FrameHeader,
    TileGroup,
    Metadata,
    Frame,
    RedundantFrameHeader,
    TileList,
    Padding,
    Reserved(u8),
}

impl ObuType {
    pub fn from_bits(value: u8) -> Self {
        match value & 0x0f {
            1 => Self::SequenceHeader,
            2 => Self::TemporalDelimiter,
            3 => Self::FrameHeader,
            4 => Self::TileGroup,
            5 => Self::Metadata,
            6 => Self::Frame,
            7 => Self::RedundantFrameHeader,
            8 => Self::TileList,
            15 => Self::Padding,
            other => Self::Reserved(other),
        }
    }

    pub fn to_bits(self) -> u8 {
        match self {
            Self::SequenceHeader => 1,
            Self::TemporalDelimiter => 2,
            Self::FrameHeader => 3,
            Self::TileGroup => 4,
            Self::Metadata => 5,
            Self::Frame => 6,
            Self::RedundantFrameHeader => 7,
            Self::TileList => 8,
            Self::Padding => 15,
            Self::Reserved(v) => v & 0x0f,
        }
    }

    /// Whether OBUs of this type are carried in RTP payloads.
    ///
    /// Only sequence headers and frame-level OBUs are carried. Temporal
    /// delimiters and tile lists must not be transmitted; tile groups,
    /// metadata, padding and reserved types are dropped unless the caller
    /// opts in to [`is_tile_data`](Self::is_tile_data) types.
    pub fn is_forwarded(self) -> bool {
        match self {
            Self::SequenceHeader | Self::FrameHeader | Self::Frame | Self::RedundantFrameHeader => {
                true
            }
            Self::TemporalDelimiter
            | Self::TileGroup
            | Self::Metadata
            | Self::TileList
            | Self::Padding
            | Self::Reserved(_) => false,
        }
    }

    /// Tile group and metadata OBUs, forwarded only on request.
    pub fn is_tile_data(self) -> bool {
        matches!(self, Self::TileGroup | Self::Metadata)
    }
}

/// A located OBU within an access unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObuHeader {
    pub obu_type: ObuType,
    pub has_extension: bool,
    pub has_size_field: bool,
    /// `None` when no extension header is present.
    pub temporal_id: Option<u8>,
    pub spatial_id: Option<u8>,
    /// Bytes before the payload: header, extension and size field.
    pub header_len: usize,
    pub payload_len: usize,
}

impl ObuHeader {
    /// Header plus payload.
    pub fn total_len(&self) -> usize {
        self.header_len + self.payload_len
    }
}

/// Locate the OBU starting at `offset` in `data`.
pub fn read_obu_header(data: &[u8], offset: usize) -> Result<ObuHeader> {
    let malformed = |kind: BitstreamErrorKind| PacketizerError::MalformedUnitHeader { offset, kind };

    let buf = data
        .get(offset..)
        .filter(|b| !b.is_empty())
        .ok_or(malformed(BitstreamErrorKind::UnexpectedEnd))?;

    let header = buf[0];
    if header & FORBIDDEN_BIT_MASK != 0 {
        return Err(malformed(BitstreamErrorKind::ForbiddenBit));
    }

    let obu_type = ObuType::from_bits((header & TYPE_MASK) >> 3);
    let has_extension = header & EXTENSION_FLAG_MASK != 0;
    let has_size_field = header & HAS_SIZE_FIELD_MASK != 0;
    let mut header_len = 1;

    let (temporal_id, spatial_id) = if has_extension {
        let ext = *buf
            .get(1)
            .ok_or(malformed(BitstreamErrorKind::UnexpectedEnd))?;
        header_len += 1;
        (Some(ext >> 5), Some((ext >> 3) & 0x03))
    } else {
        (None, None)
    };

    let payload_len = if has_size_field {
        let (size, leb_len) = read_leb128(&buf[header_len..]).map_err(malformed)?;
        header_len += leb_len;
        if size > buf.len() - header_len {
            return Err(malformed(BitstreamErrorKind::Truncated));
        }
        size
    } else {
        buf.len() - header_len
    };

    Ok(ObuHeader {
        obu_type,
        has_extension,
        has_size_field,
        temporal_id,
        spatial_id,
        header_len,
        payload_len,
    })
}

/// Marshal one OBU with `obu_has_size_field` set.
///
/// `extension` is `(temporal_id, spatial_id)`.
pub fn write_obu(obu_type: ObuType, extension: Option<(u8, u8)>, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + leb128_size(payload.len()) + payload.len());
    let mut header = (obu_type.to_bits() << 3) | HAS_SIZE_FIELD_MASK;
    if extension.is_some() {
        header |= EXTENSION_FLAG_MASK;
    }
    out.push(header);
    if let Some((temporal_id, spatial_id)) = extension {
        out.push(((temporal_id & 0x07) << 5) | ((spatial_id & 0x03) << 3));
    }
    encode_leb128(payload.len(), &mut out);
    out.extend_from_slice(payload);
    out
}

/// Split a low-overhead bitstream (`.obu` file) into temporal units.
///
/// A new unit starts at every temporal delimiter. Bytes preceding the first
/// delimiter form their own unit.
pub fn temporal_units(data: &[u8]) -> Result<Vec<&[u8]>> {
    let mut units = Vec::new();
    let mut unit_start = 0usize;
    let mut offset = 0usize;

    while offset < data.len() {
        let obu = read_obu_header(data, offset)?;
        if obu.obu_type == ObuType::TemporalDelimiter && offset > unit_start {
            units.push(&data[unit_start..offset]);
            unit_start = offset;
        }
        offset += obu.total_len();
    }

    if unit_start < data.len() {
        units.push(&data[unit_start..]);
    }

    tracing::trace!(units = units.len(), bytes = data.len(), "split bitstream");
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_bits_round_trip() {
        for bits in 0u8..16 {
            assert_eq!(ObuType::from_bits(bits).to_bits(), bits);
        }
    }

    #[test]
    fn forward_table() {
        assert!(ObuType::SequenceHeader.is_forwarded());
        assert!(ObuType::Frame.is_forwarded());
        assert!(ObuType::RedundantFrameHeader.is_forwarded());
        assert!(!ObuType::TileGroup.is_forwarded());
        assert!(!ObuType::Metadata.is_forwarded());
        assert!(ObuType::TileGroup.is_tile_data());
        assert!(ObuType::Metadata.is_tile_data());
        assert!(!ObuType::TileList.is_tile_data());
        assert!(!ObuType::TemporalDelimiter.is_forwarded());
        assert!(!ObuType::TileList.is_forwarded());
        assert!(!ObuType::Padding.is_forwarded());
        assert!(!ObuType::Reserved(9).is_forwarded());
    }

    #[test]
    fn header_with_size_field() {
        let obu = write_obu(ObuType::Frame, None, &[0xAA; 247]);
        assert_eq!(obu.len(), 250);
        let h = read_obu_header(&obu, 0).unwrap();
        assert_eq!(h.obu_type, ObuType::Frame);
        assert!(h.has_size_field);
        assert!(!h.has_extension);
        assert_eq!(h.temporal_id, None);
        assert_eq!(h.header_len, 3);
        assert_eq!(h.payload_len, 247);
    }

    #[test]
    fn header_with_extension() {
        let obu = write_obu(ObuType::FrameHeader, Some((3, 1)), &[0x10]);
        let h = read_obu_header(&obu, 0).unwrap();
        assert_eq!(h.obu_type, ObuType::FrameHeader);
        assert_eq!(h.temporal_id, Some(3));
        assert_eq!(h.spatial_id, Some(1));
        assert_eq!(h.header_len, 3);
        assert_eq!(h.payload_len, 1);
    }

    #[test]
    fn header_without_size_runs_to_end() {
        // type 6, no size field
        let data = [0x30, 1, 2, 3, 4];
        let h = read_obu_header(&data, 0).unwrap();
        assert_eq!(h.header_len, 1);
        assert_eq!(h.payload_len, 4);
    }

    #[test]
    fn header_at_offset() {
        let mut data = write_obu(ObuType::TemporalDelimiter, None, &[]);
        data.extend(write_obu(ObuType::Metadata, None, &[1, 2]));
        let h = read_obu_header(&data, 2).unwrap();
        assert_eq!(h.obu_type, ObuType::Metadata);
        assert_eq!(h.payload_len, 2);
    }

    #[test]
    fn forbidden_bit_rejected() {
        let err = read_obu_header(&[0x80 | 0x32, 0x00], 0).unwrap_err();
        assert!(matches!(
            err,
            PacketizerError::MalformedUnitHeader {
                offset: 0,
                kind: BitstreamErrorKind::ForbiddenBit
            }
        ));
    }

    #[test]
    fn declared_size_past_end_rejected() {
        let err = read_obu_header(&[0x32, 0x10, 0xAA], 0).unwrap_err();
        assert!(matches!(
            err,
            PacketizerError::MalformedUnitHeader {
                kind: BitstreamErrorKind::Truncated,
                ..
            }
        ));
    }

    #[test]
    fn missing_extension_byte_rejected() {
        let err = read_obu_header(&[0x36], 0).unwrap_err();
        assert!(matches!(
            err,
            PacketizerError::MalformedUnitHeader {
                kind: BitstreamErrorKind::UnexpectedEnd,
                ..
            }
        ));
    }

    #[test]
    fn temporal_units_split_at_delimiters() {
        let td = write_obu(ObuType::TemporalDelimiter, None, &[]);
        let frame_a = write_obu(ObuType::Frame, None, &[0x10, 1]);
        let frame_b = write_obu(ObuType::Frame, None, &[0x30, 2, 3]);
        let stream = [td.clone(), frame_a.clone(), td.clone(), frame_b.clone()].concat();

        let units = temporal_units(&stream).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0], [td.clone(), frame_a].concat().as_slice());
        assert_eq!(units[1], [td, frame_b].concat().as_slice());
    }

    #[test]
    fn temporal_units_without_delimiter() {
        let frame = write_obu(ObuType::Frame, None, &[0x10]);
        let units = temporal_units(&frame).unwrap();
        assert_eq!(units, vec![frame.as_slice()]);
        assert!(temporal_units(&[]).unwrap().is_empty());
    }
}
