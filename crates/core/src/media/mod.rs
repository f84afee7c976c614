//! Codec packetization onto RTP.
//!
//! ## RTP overview (RFC 3550)
//!
//! Each encoded temporal unit becomes one or more RTP packets. Every packet
//! starts with the 12-byte fixed header written by [`rtp::RtpSequencer`]:
//!
//! - **Sequence number** (16-bit, wrapping): reordering and loss detection.
//! - **Timestamp** (32-bit): 90 kHz media clock for video.
//! - **SSRC** (32-bit): chosen randomly to identify the sender.
//! - **Marker bit**: boundary signal, meaning defined by the payload format.
//!
//! ## Supported codecs
//!
//! | Codec | Module | Payload format |
//! |-------|--------|----------------|
//! | AV1   | [`av1`] | [AV1 RTP Payload Format](https://aomediacodec.github.io/av1-rtp-spec/) |

pub mod av1;
pub mod rtp;

/// Codec-specific RTP packetizer.
///
/// Implementations compose an [`rtp::RtpSequencer`] for the fixed header
/// rather than serializing it themselves.
pub trait Packetizer: Send {
    /// Packetize one encoded temporal unit into RTP packets.
    ///
    /// Each returned `Vec<u8>` is a complete RTP packet. Packetizers that
    /// defer data may also return packets belonging to earlier calls.
    ///
    /// `timestamp_increment` advances the RTP timestamp after this unit,
    /// typically `clock_rate / fps` (3000 for 30 fps at 90 kHz).
    fn packetize(&mut self, encoded_data: &[u8], timestamp_increment: u32) -> Vec<Vec<u8>>;

    /// Emit everything still held back by earlier calls.
    ///
    /// Used at end of stream. Packetizers that never defer return nothing.
    fn flush(&mut self) -> Vec<Vec<u8>> {
        Vec::new()
    }

    /// Codec name for the SDP `a=rtpmap` attribute.
    fn codec_name(&self) -> &'static str;

    /// RTP clock rate in Hz.
    fn clock_rate(&self) -> u32;

    /// RTP payload type number. Dynamic types use 96-127.
    fn payload_type(&self) -> u8;

    /// SDP media-level attribute lines, including the `a=` prefix.
    fn sdp_attributes(&self) -> Vec<String>;

    /// Sequence number of the next packet.
    fn next_sequence(&self) -> u16;

    /// RTP timestamp of the next packet.
    fn next_rtp_timestamp(&self) -> u32;
}
