//! Sequence header OBU parsing (AV1 §5.5).
//!
//! Only the leading part of `sequence_header_obu()` is decoded: profile,
//! operating points, timing/decoder model info, maximum frame size and frame
//! id numbering. That covers what the frame header parser and the SDP `fmtp`
//! line consume; the remaining coding tool flags are ignored.

use crate::error::BitstreamErrorKind;

use super::bits::{BitReader, BitResult};

/// One entry of the operating point table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingPoint {
    pub idc: u16,
    pub seq_level_idx: u8,
    pub seq_tier: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceHeader {
    pub seq_profile: u8,
    pub still_picture: bool,
    pub reduced_still_picture_header: bool,
    pub timing_info_present: bool,
    pub equal_picture_interval: bool,
    pub decoder_model_info_present: bool,
    /// `frame_presentation_time_length_minus_1 + 1`, zero without a decoder model.
    pub frame_presentation_time_length: u32,
    pub operating_points: Vec<OperatingPoint>,
    pub max_frame_width: u32,
    pub max_frame_height: u32,
    pub frame_id_numbers_present: bool,
}

impl SequenceHeader {
    /// Parse the payload of a sequence header OBU (header bytes excluded).
    pub fn parse(payload: &[u8]) -> BitResult<Self> {
        let mut br = BitReader::new(payload);

        let seq_profile = br.read_bits(3)? as u8;
        if seq_profile > 2 {
            return Err(BitstreamErrorKind::InvalidValue("seq_profile"));
        }
        let still_picture = br.read_flag()?;
        let reduced_still_picture_header = br.read_flag()?;
        if reduced_still_picture_header && !still_picture {
            return Err(BitstreamErrorKind::InvalidValue(
                "reduced_still_picture_header",
            ));
        }

        let mut timing_info_present = false;
        let mut equal_picture_interval = false;
        let mut decoder_model_info_present = false;
        let mut frame_presentation_time_length = 0;
        let mut operating_points = Vec::new();

        if reduced_still_picture_header {
            operating_points.push(OperatingPoint {
                idc: 0,
                seq_level_idx: br.read_bits(5)? as u8,
                seq_tier: 0,
            });
        } else {
            let mut buffer_delay_length = 0;

            timing_info_present = br.read_flag()?;
            if timing_info_present {
                // num_units_in_display_tick, time_scale
                br.skip_bits(64)?;
                equal_picture_interval = br.read_flag()?;
                if equal_picture_interval {
                    br.read_uvlc()?;
                }

                decoder_model_info_present = br.read_flag()?;
                if decoder_model_info_present {
                    buffer_delay_length = br.read_bits(5)? + 1;
                    // num_units_in_decoding_tick
                    br.skip_bits(32)?;
                    // buffer_removal_time_length_minus_1
                    br.skip_bits(5)?;
                    frame_presentation_time_length = br.read_bits(5)? + 1;
                }
            }

            let initial_display_delay_present = br.read_flag()?;
            let operating_points_cnt = br.read_bits(5)? + 1;
            for _ in 0..operating_points_cnt {
                let idc = br.read_bits(12)? as u16;
                let seq_level_idx = br.read_bits(5)? as u8;
                let seq_tier = if seq_level_idx > 7 {
                    br.read_bits(1)? as u8
                } else {
                    0
                };

                if decoder_model_info_present && br.read_flag()? {
                    // decoder_buffer_delay, encoder_buffer_delay, low_delay_mode_flag
                    br.skip_bits(2 * buffer_delay_length as usize + 1)?;
                }
                if initial_display_delay_present && br.read_flag()? {
                    br.skip_bits(4)?;
                }

                operating_points.push(OperatingPoint {
                    idc,
                    seq_level_idx,
                    seq_tier,
                });
            }
        }

        let frame_width_bits = br.read_bits(4)? + 1;
        let frame_height_bits = br.read_bits(4)? + 1;
        let max_frame_width = br.read_bits(frame_width_bits)? + 1;
        let max_frame_height = br.read_bits(frame_height_bits)? + 1;

        let frame_id_numbers_present = if reduced_still_picture_header {
            false
        } else {
            br.read_flag()?
        };
        if frame_id_numbers_present {
            // delta_frame_id_length_minus_2, additional_frame_id_length_minus_1
            br.skip_bits(7)?;
        }

        Ok(Self {
            seq_profile,
            still_picture,
            reduced_still_picture_header,
            timing_info_present,
            equal_picture_interval,
            decoder_model_info_present,
            frame_presentation_time_length,
            operating_points,
            max_frame_width,
            max_frame_height,
            frame_id_numbers_present,
        })
    }

    /// Level of operating point 0, the one advertised in SDP.
    pub fn seq_level_idx(&self) -> u8 {
        self.operating_points
            .first()
            .map(|op| op.seq_level_idx)
            .unwrap_or(0)
    }

    pub fn seq_tier(&self) -> u8 {
        self.operating_points
            .first()
            .map(|op| op.seq_tier)
            .unwrap_or(0)
    }
}

/// Test fixtures shared by the AV1 modules.
#[cfg(test)]
pub(crate) mod fixtures {
    /// Main profile, level 4.0, 640x480, one operating point, no timing info.
    ///
    /// The payload is padded with trailing zero bytes up to `len` (minimum 8).
    pub fn sequence_header_payload(len: usize) -> Vec<u8> {
        // seq_profile=0 still=0 reduced=0 timing=0 idd=0 op_cnt_minus_1=0
        // idc=0 level=8 tier=0 w_bits-1=10 h_bits-1=10 w-1=639 h-1=479
        // frame_id_numbers_present=0
        let mut payload = vec![0x00, 0x00, 0x00, 0x42, 0xA9, 0x3F, 0x9D, 0xF0];
        payload.resize(len.max(8), 0);
        payload
    }
}
