//! Error types for the AV1 RTP packetizer.

use std::fmt;

use crate::media::av1::obu::ObuType;

/// Errors that can occur while splitting or packetizing AV1 access units.
///
/// Variants map to how the packetizer reacts:
///
/// - **Truncating**: [`MalformedUnitHeader`](Self::MalformedUnitHeader) stops
///   the current access unit but keeps fragments already produced from it.
/// - **Fatal for the access unit**:
///   [`SequenceHeaderParse`](Self::SequenceHeaderParse),
///   [`FrameParse`](Self::FrameParse),
///   [`FrameHeaderParse`](Self::FrameHeaderParse),
///   [`ProtocolOrderingViolation`](Self::ProtocolOrderingViolation). The
///   access unit is dropped and decoder state is left untouched.
/// - **Configuration**: [`InvalidFragmentSize`](Self::InvalidFragmentSize).
#[derive(Debug, thiserror::Error)]
pub enum PacketizerError {
    /// The OBU header at `offset` could not be located or decoded.
    #[error("malformed OBU header at byte {offset}: {kind}")]
    MalformedUnitHeader {
        offset: usize,
        kind: BitstreamErrorKind,
    },

    /// A sequence header OBU failed to parse.
    #[error("failed to parse sequence header: {kind}")]
    SequenceHeaderParse { kind: BitstreamErrorKind },

    /// A frame OBU failed to parse.
    #[error("failed to parse frame: {kind}")]
    FrameParse { kind: BitstreamErrorKind },

    /// A frame header or redundant frame header OBU failed to parse.
    #[error("failed to parse frame header: {kind}")]
    FrameHeaderParse { kind: BitstreamErrorKind },

    /// Frame data arrived before any sequence header was seen.
    #[error("{obu_type:?} OBU encountered before sequence header")]
    ProtocolOrderingViolation { obu_type: ObuType },

    /// The configured fragment size cannot carry any payload.
    #[error("invalid fragment size limit: {0}")]
    InvalidFragmentSize(usize),
}

/// Low-level reason a bitstream read failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitstreamErrorKind {
    /// Ran out of bits before the syntax element was complete.
    UnexpectedEnd,
    /// A LEB128 value used more than 8 bytes or overflowed 32 bits.
    Leb128Overflow,
    /// The OBU forbidden bit was set.
    ForbiddenBit,
    /// The declared OBU size runs past the end of the buffer.
    Truncated,
    /// A syntax element held a value the decoder does not accept.
    InvalidValue(&'static str),
}

impl fmt::Display for BitstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "unexpected end of data"),
            Self::Leb128Overflow => write!(f, "LEB128 value overflow"),
            Self::ForbiddenBit => write!(f, "forbidden bit set"),
            Self::Truncated => write!(f, "OBU size exceeds remaining data"),
            Self::InvalidValue(what) => write!(f, "invalid {}", what),
        }
    }
}

/// Convenience alias for `Result<T, PacketizerError>`.
pub type Result<T> = std::result::Result<T, PacketizerError>;
