pub mod error;
pub mod media;
pub mod sdp;
pub mod stream;

pub use error::{BitstreamErrorKind, PacketizerError, Result};
pub use media::Packetizer;
pub use media::av1::{
    Av1Packetizer, Av1PacketizerConfig, DEFAULT_MAX_FRAGMENT_SIZE, PacketizationPolicy,
};
pub use media::rtp::RtpSequencer;
pub use sdp::{SdpConfig, generate_sdp};
pub use stream::{Stream, StreamRegistry, StreamStats};
