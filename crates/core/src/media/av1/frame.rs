//! Frame header and frame OBU parsing (AV1 §5.9, §5.10).
//!
//! Decodes the start of `uncompressed_header()` and tracks `SeenFrameHeader`
//! so redundant frame headers can be recognised as copies.

use crate::error::BitstreamErrorKind;

use super::bits::{BitReader, BitResult};
use super::sequence::SequenceHeader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Key,
    Inter,
    IntraOnly,
    Switch,
}

impl FrameType {
    fn from_bits(value: u32) -> Self {
        match value & 0x03 {
            0 => Self::Key,
            1 => Self::Inter,
            2 => Self::IntraOnly,
            _ => Self::Switch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub show_existing_frame: bool,
    pub frame_to_show_map_idx: Option<u8>,
    /// `None` for `show_existing_frame` headers, whose type lives in the
    /// referenced frame.
    pub frame_type: Option<FrameType>,
    pub show_frame: bool,
    pub showable_frame: bool,
    pub error_resilient_mode: bool,
}

impl FrameHeader {
    pub fn is_keyframe(&self) -> bool {
        self.frame_type == Some(FrameType::Key)
    }
}

/// Parser state threaded across the frame headers of one temporal unit.
#[derive(Debug, Clone, Default)]
pub struct ParserState {
    pub frame_headers_parsed: u32,
    pub last_header: Option<FrameHeader>,
    pub last_temporal_id: Option<u8>,
    pub last_spatial_id: Option<u8>,
}

impl ParserState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Parse a frame header or redundant frame header OBU payload.
///
/// When `seen_frame_header` is already set the OBU is a copy of the header
/// parsed earlier in this frame and the stored header is returned.
pub fn parse_frame_header(
    payload: &[u8],
    seq: &SequenceHeader,
    state: &mut ParserState,
    temporal_id: Option<u8>,
    spatial_id: Option<u8>,
    seen_frame_header: &mut bool,
) -> BitResult<FrameHeader> {
    if *seen_frame_header {
        return state
            .last_header
            .clone()
            .ok_or(BitstreamErrorKind::InvalidValue("frame_header_copy"));
    }

    let header = uncompressed_header(payload, seq)?;
    *seen_frame_header = !header.show_existing_frame;

    state.frame_headers_parsed += 1;
    state.last_header = Some(header.clone());
    state.last_temporal_id = temporal_id;
    state.last_spatial_id = spatial_id;
    Ok(header)
}

/// Parse a frame OBU payload: a frame header followed by its tile group.
///
/// The tile group inside a frame OBU always completes the frame.
pub fn parse_frame(
    payload: &[u8],
    seq: &SequenceHeader,
    state: &mut ParserState,
    temporal_id: Option<u8>,
    spatial_id: Option<u8>,
    seen_frame_header: &mut bool,
) -> BitResult<FrameHeader> {
    let header = parse_frame_header(
        payload,
        seq,
        state,
        temporal_id,
        spatial_id,
        seen_frame_header,
    )?;
    if header.show_existing_frame {
        return Err(BitstreamErrorKind::InvalidValue("show_existing_frame"));
    }
    *seen_frame_header = false;
    Ok(header)
}

fn uncompressed_header(payload: &[u8], seq: &SequenceHeader) -> BitResult<FrameHeader> {
    if seq.reduced_still_picture_header {
        return Ok(FrameHeader {
            show_existing_frame: false,
            frame_to_show_map_idx: None,
            frame_type: Some(FrameType::Key),
            show_frame: true,
            showable_frame: false,
            error_resilient_mode: true,
        });
    }

    let mut br = BitReader::new(payload);
    let temporal_point_info = seq.decoder_model_info_present && !seq.equal_picture_interval;

    if br.read_flag()? {
        let frame_to_show_map_idx = br.read_bits(3)? as u8;
        if temporal_point_info {
            br.skip_bits(seq.frame_presentation_time_length as usize)?;
        }
        return Ok(FrameHeader {
            show_existing_frame: true,
            frame_to_show_map_idx: Some(frame_to_show_map_idx),
            frame_type: None,
            show_frame: true,
            showable_frame: false,
            error_resilient_mode: false,
        });
    }

    let frame_type = FrameType::from_bits(br.read_bits(2)?);
    let show_frame = br.read_flag()?;
    if show_frame && temporal_point_info {
        br.skip_bits(seq.frame_presentation_time_length as usize)?;
    }
    let showable_frame = if show_frame {
        frame_type != FrameType::Key
    } else {
        br.read_flag()?
    };
    let error_resilient_mode =
        if frame_type == FrameType::Switch || (frame_type == FrameType::Key && show_frame) {
            true
        } else {
            br.read_flag()?
        };

    Ok(FrameHeader {
        show_existing_frame: false,
        frame_to_show_map_idx: None,
        frame_type: Some(frame_type),
        show_frame,
        showable_frame,
        error_resilient_mode,
    })
}

#[cfg(test)]
mod tests {
    use super::super::sequence::fixtures::sequence_header_payload;
    use super::*;

    fn seq() -> SequenceHeader {
        SequenceHeader::parse(&sequence_header_payload(8)).unwrap()
    }

    #[test]
    fn shown_keyframe() {
        let mut state = ParserState::default();
        let mut seen = false;
        let fh = parse_frame_header(&[0x10], &seq(), &mut state, None, None, &mut seen).unwrap();
        assert!(fh.is_keyframe());
        assert!(fh.show_frame);
        assert!(fh.error_resilient_mode);
        assert!(!fh.showable_frame);
        assert!(seen);
        assert_eq!(state.frame_headers_parsed, 1);
    }

    #[test]
    fn hidden_inter_frame() {
        let mut state = ParserState::default();
        let mut seen = false;
        let fh = parse_frame_header(&[0x28], &seq(), &mut state, Some(1), Some(0), &mut seen)
            .unwrap();
        assert_eq!(fh.frame_type, Some(FrameType::Inter));
        assert!(!fh.show_frame);
        assert!(fh.showable_frame);
        assert!(!fh.error_resilient_mode);
        assert_eq!(state.last_temporal_id, Some(1));
    }

    #[test]
    fn show_existing_frame_clears_seen() {
        let mut state = ParserState::default();
        let mut seen = false;
        let fh = parse_frame_header(&[0xD0], &seq(), &mut state, None, None, &mut seen).unwrap();
        assert!(fh.show_existing_frame);
        assert_eq!(fh.frame_to_show_map_idx, Some(5));
        assert!(!seen);
    }

    #[test]
    fn redundant_header_returns_copy() {
        let mut state = ParserState::default();
        let mut seen = false;
        let first = parse_frame_header(&[0x30], &seq(), &mut state, None, None, &mut seen).unwrap();
        // Payload is not re-read for copies.
        let copy = parse_frame_header(&[], &seq(), &mut state, None, None, &mut seen).unwrap();
        assert_eq!(first, copy);
        assert_eq!(state.frame_headers_parsed, 1);
    }

    #[test]
    fn copy_without_original_fails() {
        let mut state = ParserState::default();
        let mut seen = true;
        assert_eq!(
            parse_frame_header(&[0x30], &seq(), &mut state, None, None, &mut seen),
            Err(BitstreamErrorKind::InvalidValue("frame_header_copy"))
        );
    }

    #[test]
    fn frame_completes_frame_header() {
        let mut state = ParserState::default();
        let mut seen = false;
        let fh = parse_frame(&[0x30, 0xAA, 0xBB], &seq(), &mut state, None, None, &mut seen)
            .unwrap();
        assert_eq!(fh.frame_type, Some(FrameType::Inter));
        assert!(!seen);
    }

    #[test]
    fn empty_frame_fails() {
        let mut state = ParserState::default();
        let mut seen = false;
        assert_eq!(
            parse_frame(&[], &seq(), &mut state, None, None, &mut seen),
            Err(BitstreamErrorKind::UnexpectedEnd)
        );
        assert!(!seen);
        assert_eq!(state.frame_headers_parsed, 0);
    }

    #[test]
    fn frame_cannot_show_existing() {
        let mut state = ParserState::default();
        let mut seen = false;
        assert_eq!(
            parse_frame(&[0xD0], &seq(), &mut state, None, None, &mut seen),
            Err(BitstreamErrorKind::InvalidValue("show_existing_frame"))
        );
    }

    #[test]
    fn reset_clears_state() {
        let mut state = ParserState::default();
        let mut seen = false;
        parse_frame_header(&[0x10], &seq(), &mut state, None, None, &mut seen).unwrap();
        state.reset();
        assert_eq!(state.frame_headers_parsed, 0);
        assert!(state.last_header.is_none());
    }
}
