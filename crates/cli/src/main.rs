use std::path::{Path, PathBuf};
use std::process::ExitCode;

use av1rtp::media::av1::obu;
use av1rtp::{
    Av1Packetizer, Av1PacketizerConfig, DEFAULT_MAX_FRAGMENT_SIZE, PacketizationPolicy,
    RtpSequencer, SdpConfig, StreamRegistry, generate_sdp,
};
use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    /// Aggregation header per packet, strict per-call budget
    Aggregated,
    /// Bare fragments, marker on each OBU's last fragment
    MarkerOnly,
}

impl From<Policy> for PacketizationPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Aggregated => Self::Aggregated,
            Policy::MarkerOnly => Self::MarkerOnly,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "av1-rtp-packetize",
    about = "Packetize AV1 low-overhead bitstreams (.obu) into RTP"
)]
struct Args {
    /// Input .obu files, one stream each
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Fragment size limit in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FRAGMENT_SIZE)]
    mtu: usize,

    #[arg(long, value_enum, default_value_t = Policy::Aggregated)]
    policy: Policy,

    /// RTP payload type
    #[arg(long, default_value_t = 96)]
    payload_type: u8,

    /// Frame rate used to advance the 90 kHz RTP clock
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Print the SDP session description of each stream
    #[arg(long)]
    sdp: bool,

    /// Address advertised in the SDP
    #[arg(long, default_value = "127.0.0.1")]
    ip: String,

    /// Also send tile group and metadata OBUs
    #[arg(long)]
    forward_tile_data: bool,

    /// Directory for the packets, one `<input stem>.rtp` file per input,
    /// each packet prefixed with its 16-bit length (RFC 4571 framing)
    #[arg(long, short)]
    output: Option<PathBuf>,
}

/// Frame packets the way RTP is carried over a byte stream (RFC 4571).
fn frame_packets(packets: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(packets.iter().map(|p| p.len() + 2).sum());
    for packet in packets {
        // main rejects fragment limits that would overflow the length.
        out.extend_from_slice(&(packet.len() as u16).to_be_bytes());
        out.extend_from_slice(packet);
    }
    out
}

fn output_path(dir: &Path, input: &Path, index: usize) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("stream{index}"));
    dir.join(format!("{stem}.rtp"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Av1PacketizerConfig {
        fragment_size_limit: args.mtu,
        policy: args.policy.into(),
        forward_tile_data: args.forward_tile_data,
    };
    // Largest packet is the RTP header, aggregation header and a full fragment.
    if args.output.is_some() && args.mtu + 13 > u16::MAX as usize {
        eprintln!("--mtu {} is too large for 16-bit length framing", args.mtu);
        return ExitCode::FAILURE;
    }
    let timestamp_increment = 90000 / args.fps.max(1);

    let registry = StreamRegistry::new();
    let mut inputs = Vec::new();
    for (index, path) in args.files.iter().enumerate() {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Failed to read {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        };
        let sequencer = RtpSequencer::with_random_ssrc(args.payload_type);
        let packetizer = match Av1Packetizer::with_config(sequencer, config) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Invalid configuration: {}", e);
                return ExitCode::FAILURE;
            }
        };
        let name = path.display().to_string();
        registry.add(&name, Box::new(packetizer));
        let destination = args
            .output
            .as_deref()
            .map(|dir| output_path(dir, path, index));
        inputs.push((name, data, destination));
    }

    let failures: usize = std::thread::scope(|s| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|(name, data, destination)| {
                let registry = &registry;
                s.spawn(move || -> bool {
                    let Some(stream) = registry.get(name) else {
                        return false;
                    };
                    let units = match obu::temporal_units(data) {
                        Ok(units) => units,
                        Err(e) => {
                            tracing::error!(stream = %name, error = %e, "unreadable bitstream");
                            return false;
                        }
                    };
                    let mut packets = Vec::new();
                    for unit in units {
                        packets.extend(stream.packetize(unit, timestamp_increment));
                    }
                    packets.extend(stream.flush());

                    let Some(destination) = destination else {
                        return true;
                    };
                    match std::fs::write(destination, frame_packets(&packets)) {
                        Ok(()) => {
                            tracing::info!(
                                stream = %name,
                                path = %destination.display(),
                                packets = packets.len(),
                                "packets written"
                            );
                            true
                        }
                        Err(e) => {
                            tracing::error!(
                                stream = %name,
                                path = %destination.display(),
                                error = %e,
                                "failed to write packets"
                            );
                            false
                        }
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or(false))
            .filter(|ok| !ok)
            .count()
    });

    for name in registry.names() {
        let Some(stream) = registry.get(&name) else {
            continue;
        };
        let stats = stream.stats();
        println!(
            "{}: {} temporal units, {} packets, {} bytes, next seq {}",
            name,
            stats.access_units,
            stats.packets,
            stats.bytes,
            stream.next_sequence()
        );
        if args.sdp {
            print!("{}", generate_sdp(&stream, &SdpConfig::default(), &args.ip));
        }
    }

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packets_are_length_prefixed() {
        let framed = frame_packets(&[vec![0x80, 0x60, 1], vec![], vec![7; 300]]);
        assert_eq!(&framed[..5], &[0x00, 0x03, 0x80, 0x60, 1]);
        assert_eq!(&framed[5..7], &[0x00, 0x00]);
        assert_eq!(&framed[7..9], &[0x01, 0x2C]);
        assert_eq!(framed.len(), 9 + 300);
    }

    #[test]
    fn output_named_after_input() {
        let path = output_path(Path::new("out"), Path::new("clips/intro.obu"), 0);
        assert_eq!(path, Path::new("out/intro.rtp"));
        let path = output_path(Path::new("out"), Path::new(".."), 3);
        assert_eq!(path, Path::new("out/stream3.rtp"));
    }
}
