use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::media::Packetizer;

pub const DEFAULT_STREAM_NAME: &str = "stream";

/// Running totals for one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub access_units: u64,
    pub packets: u64,
    /// Bytes of complete RTP packets, headers included.
    pub bytes: u64,
}

/// A named outgoing stream.
///
/// Owns the packetizer for its codec. Calls are serialized by the inner
/// mutex, so a stream can be fed from any thread.
pub struct Stream {
    name: String,
    packetizer: Mutex<Box<dyn Packetizer>>,
    stats: Mutex<StreamStats>,
}

impl Stream {
    pub fn new(name: &str, packetizer: Box<dyn Packetizer>) -> Self {
        Self {
            name: name.to_string(),
            packetizer: Mutex::new(packetizer),
            stats: Mutex::new(StreamStats::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Packetize one temporal unit with this stream's codec.
    pub fn packetize(&self, data: &[u8], timestamp_increment: u32) -> Vec<Vec<u8>> {
        let packets = self.packetizer.lock().packetize(data, timestamp_increment);

        let mut stats = self.stats.lock();
        stats.access_units += 1;
        stats.packets += packets.len() as u64;
        stats.bytes += packets.iter().map(|p| p.len() as u64).sum::<u64>();
        packets
    }

    /// Send whatever the packetizer still holds back.
    pub fn flush(&self) -> Vec<Vec<u8>> {
        let packets = self.packetizer.lock().flush();

        let mut stats = self.stats.lock();
        stats.packets += packets.len() as u64;
        stats.bytes += packets.iter().map(|p| p.len() as u64).sum::<u64>();
        packets
    }

    pub fn stats(&self) -> StreamStats {
        *self.stats.lock()
    }

    pub fn payload_type(&self) -> u8 {
        self.packetizer.lock().payload_type()
    }

    pub fn codec_name(&self) -> &'static str {
        self.packetizer.lock().codec_name()
    }

    pub fn sdp_attributes(&self) -> Vec<String> {
        self.packetizer.lock().sdp_attributes()
    }

    pub fn clock_rate(&self) -> u32 {
        self.packetizer.lock().clock_rate()
    }

    pub fn next_sequence(&self) -> u16 {
        self.packetizer.lock().next_sequence()
    }

    pub fn next_rtp_timestamp(&self) -> u32 {
        self.packetizer.lock().next_rtp_timestamp()
    }
}

/// Registry of named streams.
///
/// An optional default stream answers lookups for names that are not
/// registered.
#[derive(Clone)]
pub struct StreamRegistry {
    streams: Arc<RwLock<HashMap<String, Arc<Stream>>>>,
    default_name: Arc<RwLock<Option<String>>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self {
            streams: Arc::new(RwLock::new(HashMap::new())),
            default_name: Arc::new(RwLock::new(None)),
        }
    }

    /// Register a stream, replacing any existing stream of the same name.
    pub fn add(&self, name: &str, packetizer: Box<dyn Packetizer>) -> Arc<Stream> {
        let stream = Arc::new(Stream::new(name, packetizer));
        self.streams.write().insert(name.to_string(), stream.clone());
        tracing::info!(name, "stream registered");
        stream
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Stream>> {
        let removed = self.streams.write().remove(name);
        if removed.is_some() {
            tracing::info!(name, "stream removed");
        }
        removed
    }

    pub fn set_default(&self, name: &str) {
        *self.default_name.write() = Some(name.to_string());
    }

    /// Look up a stream by exact name.
    pub fn get(&self, name: &str) -> Option<Arc<Stream>> {
        self.streams.read().get(name).cloned()
    }

    /// Exact lookup, falling back to the default stream.
    pub fn resolve(&self, name: &str) -> Option<Arc<Stream>> {
        self.get(name).or_else(|| {
            let default = self.default_name.read();
            default.as_ref().and_then(|n| self.get(n))
        })
    }

    /// Registered stream names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.streams.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.streams.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.read().is_empty()
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}
