//! AV1 RTP packetization.
//!
//! [`splitter`] turns a temporal unit into OBU fragments; [`Av1Packetizer`]
//! wraps those fragments into RTP packets under a per-call size budget and
//! carries whatever does not fit over to the next call.

pub mod aggregation;
pub(crate) mod bits;
pub mod frame;
pub mod obu;
pub mod sequence;
pub mod splitter;

use std::collections::VecDeque;

use crate::error::{PacketizerError, Result};

use super::Packetizer;
use super::rtp::RtpSequencer;
use aggregation::{AGGREGATION_HEADER_SIZE, AggregationHeader};
use sequence::SequenceHeader;
use splitter::{DecoderState, ObuFragment, SplitOptions};

/// Default MTU minus SRTP auth tag, aggregation header, UDP and IPv6 headers.
pub const DEFAULT_MAX_FRAGMENT_SIZE: usize = 1280 - 12 - 1 - 8 - 40;

/// How fragments are framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketizationPolicy {
    /// One aggregation header byte per packet, strict per-call budget with
    /// carry-over of fragments that do not fit.
    #[default]
    Aggregated,
    /// Bare fragments, one per packet, RTP marker on the last fragment of
    /// every OBU. No budget and no carry-over.
    MarkerOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Av1PacketizerConfig {
    /// Largest OBU fragment, and the per-call byte budget under
    /// [`PacketizationPolicy::Aggregated`].
    pub fragment_size_limit: usize,
    pub policy: PacketizationPolicy,
    /// Also carry tile group and metadata OBUs. Off by default, when only
    /// sequence headers and frame-level OBUs are sent.
    pub forward_tile_data: bool,
}

impl Default for Av1PacketizerConfig {
    fn default() -> Self {
        Self {
            fragment_size_limit: DEFAULT_MAX_FRAGMENT_SIZE,
            policy: PacketizationPolicy::default(),
            forward_tile_data: false,
        }
    }
}

impl Av1PacketizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fragment_size_limit == 0 {
            return Err(PacketizerError::InvalidFragmentSize(0));
        }
        if self.policy == PacketizationPolicy::Aggregated
            && self.fragment_size_limit <= AGGREGATION_HEADER_SIZE
        {
            tracing::warn!(
                limit = self.fragment_size_limit,
                "fragment size limit leaves no room for payload, every packet will be forced"
            );
        }
        Ok(())
    }
}

/// AV1 RTP packetizer.
///
/// Accepts batches of AV1 temporal units in the low-overhead bitstream format
/// and emits RTP packets carrying OBU fragments.
///
/// ## Aggregated policy
///
/// Each packet carries exactly one OBU element behind a one-byte aggregation
/// header (see [`aggregation`]). Every call to [`process`](Self::process)
/// starts with a budget of `fragment_size_limit` bytes:
///
/// 1. Fragments queued by earlier calls are sent first, oldest first, until
///    the next one does not fit the remaining budget.
/// 2. New temporal units are split and their fragments are sent while they
///    fit. Once anything has been deferred, every later fragment of the call
///    is queued behind it.
/// 3. A call that would otherwise produce nothing force-sends the oldest
///    queued fragment, so a fragment larger than the budget still leaves.
///
/// The RTP marker bit of every packet in a call is set when the temporal
/// layer changed while splitting that call's units.
///
/// ## Marker-only policy
///
/// Fragments are sent bare, one per packet, with the RTP marker set on the
/// final fragment of each OBU. Nothing is queued.
///
/// ## SDP attributes
///
/// - `a=rtpmap:<pt> AV1/90000`
/// - `a=fmtp:<pt> profile=..;level-idx=..;tier=..` once a sequence header
///   has been parsed
/// - `a=control:track1`
#[derive(Debug)]
pub struct Av1Packetizer {
    sequencer: RtpSequencer,
    config: Av1PacketizerConfig,
    state: DecoderState,
    pending: VecDeque<ObuFragment>,
    first_packet: bool,
}

impl Av1Packetizer {
    /// Create with explicit payload type and SSRC and the default config.
    pub fn new(pt: u8, ssrc: u32) -> Self {
        Self::from_parts(RtpSequencer::new(pt, ssrc), Av1PacketizerConfig::default())
    }

    /// Create with a random SSRC (RFC 3550 §8.1).
    pub fn with_random_ssrc(pt: u8) -> Self {
        Self::from_parts(
            RtpSequencer::with_random_ssrc(pt),
            Av1PacketizerConfig::default(),
        )
    }

    pub fn with_config(sequencer: RtpSequencer, config: Av1PacketizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(sequencer, config))
    }

    fn from_parts(sequencer: RtpSequencer, config: Av1PacketizerConfig) -> Self {
        Self {
            sequencer,
            config,
            state: DecoderState::default(),
            pending: VecDeque::new(),
            first_packet: true,
        }
    }

    pub fn config(&self) -> &Av1PacketizerConfig {
        &self.config
    }

    pub fn sequencer(&self) -> &RtpSequencer {
        &self.sequencer
    }

    /// Most recently parsed sequence header.
    pub fn sequence_header(&self) -> Option<&SequenceHeader> {
        self.state.sequence_header.as_ref()
    }

    /// Fragments waiting for a later call.
    pub fn pending_fragments(&self) -> usize {
        self.pending.len()
    }

    /// Packetize a batch of temporal units into complete RTP packets.
    ///
    /// Units that fail to parse are logged and skipped; the rest of the batch
    /// is still processed.
    pub fn process(&mut self, access_units: &[&[u8]]) -> Vec<Vec<u8>> {
        let packets: Vec<Vec<u8>> = match self.config.policy {
            PacketizationPolicy::Aggregated => {
                let payloads = self.process_aggregated(access_units);
                let marker = self.state.temporal_id_changed;
                payloads
                    .iter()
                    .map(|payload| self.sequencer.sequence_packet(payload, marker))
                    .collect()
            }
            PacketizationPolicy::MarkerOnly => self.process_marker_only(access_units),
        };
        self.state.temporal_id_changed = false;
        packets
    }

    fn process_aggregated(&mut self, access_units: &[&[u8]]) -> Vec<Vec<u8>> {
        let mut remaining = self.config.fragment_size_limit;
        let mut over_limit = false;
        let mut payloads = Vec::new();

        while let Some(size) = self.pending.front().map(wire_size) {
            if size > remaining {
                over_limit = true;
                break;
            }
            if let Some(fragment) = self.pending.pop_front() {
                remaining -= size;
                payloads.push(self.wrap(&fragment));
            }
        }
        let drained = payloads.len();

        for access_unit in access_units {
            for fragment in self.split_unit(access_unit) {
                let size = wire_size(&fragment);
                if over_limit || size > remaining {
                    over_limit = true;
                    self.pending.push_back(fragment);
                    continue;
                }
                remaining -= size;
                payloads.push(self.wrap(&fragment));
            }
        }

        if payloads.is_empty() {
            if let Some(fragment) = self.pending.pop_front() {
                tracing::debug!(
                    size = fragment.data.len(),
                    limit = self.config.fragment_size_limit,
                    "forcing queued fragment past the budget"
                );
                payloads.push(self.wrap(&fragment));
            }
        }

        if !self.pending.is_empty() {
            tracing::debug!(
                queued = self.pending.len(),
                sent = payloads.len(),
                drained,
                "fragments carried over to the next call"
            );
        }
        payloads
    }

    fn process_marker_only(&mut self, access_units: &[&[u8]]) -> Vec<Vec<u8>> {
        let mut packets = Vec::new();
        for access_unit in access_units {
            for fragment in self.split_unit(access_unit) {
                let marker = fragment.fragmentation.is_final();
                packets.push(self.sequencer.sequence_packet(&fragment.data, marker));
            }
        }
        packets
    }

    fn split_unit(&mut self, access_unit: &[u8]) -> Vec<ObuFragment> {
        let options = SplitOptions {
            fragment_limit: self.config.fragment_size_limit,
            forward_tile_data: self.config.forward_tile_data,
        };
        match splitter::split_with(access_unit, &mut self.state, options) {
            Ok(fragments) => fragments,
            Err(e) => {
                tracing::warn!(error = %e, bytes = access_unit.len(), "dropping access unit");
                Vec::new()
            }
        }
    }

    /// Prefix a fragment with its aggregation header.
    fn wrap(&mut self, fragment: &ObuFragment) -> Vec<u8> {
        let header = AggregationHeader::for_fragment(fragment.fragmentation, self.first_packet);
        self.first_packet = false;

        let mut payload = Vec::with_capacity(wire_size(fragment));
        payload.push(header.to_byte());
        payload.extend_from_slice(&fragment.data);
        payload
    }
}

fn wire_size(fragment: &ObuFragment) -> usize {
    AGGREGATION_HEADER_SIZE + fragment.data.len()
}

impl Packetizer for Av1Packetizer {
    fn packetize(&mut self, encoded_data: &[u8], timestamp_increment: u32) -> Vec<Vec<u8>> {
        let packets = self.process(&[encoded_data]);
        self.sequencer.advance_timestamp(timestamp_increment);

        tracing::trace!(
            rtp_packets = packets.len(),
            frame_bytes = encoded_data.len(),
            queued = self.pending.len(),
            seq = self.sequencer.sequence(),
            ts = self.sequencer.timestamp(),
            "temporal unit packetized"
        );

        packets
    }

    fn flush(&mut self) -> Vec<Vec<u8>> {
        let mut packets = Vec::new();
        while !self.pending.is_empty() {
            packets.extend(self.process(&[]));
        }
        packets
    }

    fn codec_name(&self) -> &'static str {
        "AV1"
    }

    fn clock_rate(&self) -> u32 {
        90000
    }

    fn payload_type(&self) -> u8 {
        self.sequencer.pt
    }

    fn sdp_attributes(&self) -> Vec<String> {
        let mut attrs = vec![format!(
            "a=rtpmap:{} {}/{}",
            self.payload_type(),
            self.codec_name(),
            self.clock_rate()
        )];
        if let Some(seq) = self.sequence_header() {
            attrs.push(format!(
                "a=fmtp:{} profile={};level-idx={};tier={}",
                self.payload_type(),
                seq.seq_profile,
                seq.seq_level_idx(),
                seq.seq_tier()
            ));
        }
        attrs.push("a=control:track1".to_string());
        attrs
    }

    fn next_sequence(&self) -> u16 {
        self.sequencer.sequence()
    }

    fn next_rtp_timestamp(&self) -> u32 {
        self.sequencer.timestamp() as u32
    }
}
