/// Size of the RTP fixed header without CSRCs.
pub const RTP_HEADER_SIZE: usize = 12;

/// Outgoing RTP packet sequencer (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Prepends the fixed header to a codec payload and owns the per-stream
/// counters:
/// - **Sequence number**: 16-bit, wrapping, incremented on every packet.
/// - **Timestamp**: kept as u64; the lower 32 bits go on the wire.
/// - **Sender counters**: packets and payload octets sent, as reported in
///   RTCP sender reports (RFC 3550 §6.4.1).
///
/// Version is always 2. Padding, extension and CSRC count are always 0.
#[derive(Debug)]
pub struct RtpSequencer {
    /// RTP payload type (7-bit, RFC 3551).
    pub pt: u8,
    /// Synchronization source identifier (RFC 3550 §8.1).
    pub ssrc: u32,
    sequence: u16,
    timestamp: u64,
    packets_sent: u64,
    octets_sent: u64,
}

impl RtpSequencer {
    pub fn new(pt: u8, ssrc: u32) -> Self {
        tracing::debug!(
            pt,
            ssrc = format_args!("{:#010X}", ssrc),
            "RTP sequencer created"
        );
        Self {
            pt: pt & 0x7f,
            ssrc,
            sequence: 0,
            timestamp: 0,
            packets_sent: 0,
            octets_sent: 0,
        }
    }

    /// Create with a random SSRC (RFC 3550 §8.1).
    pub fn with_random_ssrc(pt: u8) -> Self {
        Self::new(pt, rand::random::<u32>())
    }

    /// Sequence number the next packet will carry.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    /// Payload octets sent, RTP headers excluded.
    pub fn octets_sent(&self) -> u64 {
        self.octets_sent
    }

    /// Build a complete RTP packet around `payload` and advance the sequence
    /// number.
    pub fn sequence_packet(&mut self, payload: &[u8], marker: bool) -> Vec<u8> {
        let mut packet = Vec::with_capacity(RTP_HEADER_SIZE + payload.len());
        packet.push(2 << 6);
        packet.push(((marker as u8) << 7) | self.pt);
        packet.extend_from_slice(&self.sequence.to_be_bytes());
        packet.extend_from_slice(&(self.timestamp as u32).to_be_bytes());
        packet.extend_from_slice(&self.ssrc.to_be_bytes());
        packet.extend_from_slice(payload);

        self.sequence = self.sequence.wrapping_add(1);
        self.packets_sent += 1;
        self.octets_sent += payload.len() as u64;
        packet
    }

    /// Advance the RTP timestamp, typically by `clock_rate / fps`.
    pub fn advance_timestamp(&mut self, increment: u32) {
        self.timestamp = self.timestamp.wrapping_add(increment as u64);
    }
}
