//! Splits an AV1 temporal unit into OBU fragments sized for RTP.
//!
//! The splitter walks every OBU of an access unit, updates the decoder state
//! it needs to validate frame ordering, and cuts each forwarded OBU into
//! fragments of at most `fragment_limit` bytes. OBU headers stay attached to
//! the first fragment; nothing is stripped.

use crate::error::{PacketizerError, Result};

use super::frame::{self, ParserState};
use super::obu::{self, ObuHeader, ObuType};
use super::sequence::SequenceHeader;

/// Position of a fragment within its OBU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragmentation {
    /// The whole OBU fits in one fragment.
    None,
    Start,
    Middle,
    End,
}

impl Fragmentation {
    /// The previous packet holds the earlier part of this OBU.
    pub fn continues_previous(self) -> bool {
        matches!(self, Self::Middle | Self::End)
    }

    /// The next packet holds the rest of this OBU.
    pub fn continues_in_next(self) -> bool {
        matches!(self, Self::Start | Self::Middle)
    }

    /// Last piece of an OBU.
    pub fn is_final(self) -> bool {
        matches!(self, Self::None | Self::End)
    }
}

/// A contiguous slice of one OBU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObuFragment {
    pub data: Vec<u8>,
    pub temporal_id: Option<u8>,
    pub spatial_id: Option<u8>,
    pub fragmentation: Fragmentation,
}

/// Decoder state carried across access units of one stream.
#[derive(Debug, Clone, Default)]
pub struct DecoderState {
    pub sequence_header: Option<SequenceHeader>,
    pub frame_header_seen: bool,
    pub parser: ParserState,
    pub last_temporal_id: Option<u8>,
    pub temporal_id_changed: bool,
}

/// Knobs for [`split_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOptions {
    pub fragment_limit: usize,
    /// Also forward tile group and metadata OBUs.
    pub forward_tile_data: bool,
}

/// Split one access unit into fragments of at most `fragment_limit` bytes.
///
/// A malformed OBU header ends the walk early; fragments produced before it
/// are returned. Sequence header and frame errors reject the whole access
/// unit, and `state` is only updated when the access unit is accepted.
pub fn split(
    access_unit: &[u8],
    state: &mut DecoderState,
    fragment_limit: usize,
) -> Result<Vec<ObuFragment>> {
    split_with(
        access_unit,
        state,
        SplitOptions {
            fragment_limit,
            forward_tile_data: false,
        },
    )
}

/// [`split`] with explicit options.
pub fn split_with(
    access_unit: &[u8],
    state: &mut DecoderState,
    options: SplitOptions,
) -> Result<Vec<ObuFragment>> {
    let fragment_limit = options.fragment_limit.max(1);
    let mut next = state.clone();
    let mut fragments = Vec::new();
    let mut offset = 0usize;

    while offset < access_unit.len() {
        let obu = match obu::read_obu_header(access_unit, offset) {
            Ok(obu) => obu,
            Err(e) => {
                tracing::warn!(error = %e, offset, "stopping at malformed OBU");
                break;
            }
        };

        let payload = &access_unit[offset + obu.header_len..offset + obu.total_len()];
        update_state(&mut next, &obu, payload)?;

        let forwarded = obu.obu_type.is_forwarded()
            || (options.forward_tile_data && obu.obu_type.is_tile_data());
        if forwarded && obu.payload_len > 0 {
            // No extension header means temporal layer 0.
            let temporal_id = obu.temporal_id.unwrap_or(0);
            if next.last_temporal_id.is_some_and(|last| last != temporal_id) {
                next.temporal_id_changed = true;
            }
            next.last_temporal_id = Some(temporal_id);

            let unit = &access_unit[offset..offset + obu.total_len()];
            fragment_obu(unit, &obu, fragment_limit, &mut fragments);
        }

        offset += obu.total_len();
    }

    *state = next;
    Ok(fragments)
}

fn update_state(state: &mut DecoderState, obu: &ObuHeader, payload: &[u8]) -> Result<()> {
    match obu.obu_type {
        ObuType::TemporalDelimiter => {
            state.frame_header_seen = false;
            state.parser.reset();
        }
        ObuType::SequenceHeader => {
            let header = SequenceHeader::parse(payload)
                .map_err(|kind| PacketizerError::SequenceHeaderParse { kind })?;
            if state.sequence_header.as_ref() != Some(&header) {
                tracing::debug!(
                    profile = header.seq_profile,
                    level = header.seq_level_idx(),
                    width = header.max_frame_width,
                    height = header.max_frame_height,
                    "AV1 sequence header updated"
                );
            }
            state.sequence_header = Some(header);
        }
        ObuType::Frame => {
            let seq = state.sequence_header.as_ref().ok_or(
                PacketizerError::ProtocolOrderingViolation {
                    obu_type: obu.obu_type,
                },
            )?;
            frame::parse_frame(
                payload,
                seq,
                &mut state.parser,
                obu.temporal_id,
                obu.spatial_id,
                &mut state.frame_header_seen,
            )
            .map_err(|kind| PacketizerError::FrameParse { kind })?;
        }
        ObuType::FrameHeader | ObuType::RedundantFrameHeader => {
            let seq = state.sequence_header.as_ref().ok_or(
                PacketizerError::ProtocolOrderingViolation {
                    obu_type: obu.obu_type,
                },
            )?;
            frame::parse_frame_header(
                payload,
                seq,
                &mut state.parser,
                obu.temporal_id,
                obu.spatial_id,
                &mut state.frame_header_seen,
            )
            .map_err(|kind| PacketizerError::FrameHeaderParse { kind })?;
        }
        ObuType::TileGroup
        | ObuType::Metadata
        | ObuType::TileList
        | ObuType::Padding
        | ObuType::Reserved(_) => {}
    }
    Ok(())
}

fn fragment_obu(
    unit: &[u8],
    obu: &ObuHeader,
    fragment_limit: usize,
    fragments: &mut Vec<ObuFragment>,
) {
    let count = unit.len().div_ceil(fragment_limit);

    for (i, chunk) in unit.chunks(fragment_limit).enumerate() {
        let fragmentation = match (count, i) {
            (1, _) => Fragmentation::None,
            (_, 0) => Fragmentation::Start,
            (n, i) if i + 1 == n => Fragmentation::End,
            _ => Fragmentation::Middle,
        };
        fragments.push(ObuFragment {
            data: chunk.to_vec(),
            temporal_id: obu.temporal_id,
            spatial_id: obu.spatial_id,
            fragmentation,
        });
    }

    if count > 1 {
        tracing::trace!(
            obu_type = ?obu.obu_type,
            obu_size = unit.len(),
            fragments = count,
            "fragmented OBU"
        );
    }
}
