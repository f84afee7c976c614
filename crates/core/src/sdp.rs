//! SDP (Session Description Protocol) generation (RFC 8866).
//!
//! ```text
//! v=0                                          ← protocol version
//! o=<user> <sess-id> <sess-ver> IN IP4 <addr>  ← origin
//! s=<session-name>                             ← session name
//! c=IN IP4 <addr>                              ← connection address
//! t=0 0                                        ← timing (live stream)
//! a=tool:av1-rtp                               ← sender software
//! a=sendonly                                   ← direction
//! m=video <port> RTP/AVP 96                    ← media description
//! a=rtpmap:96 AV1/90000                        ← codec/clock rate
//! a=fmtp:96 profile=0;level-idx=8;tier=0       ← once a sequence header is known
//! a=control:track1                             ← track control URL
//! ```

use crate::stream::Stream;

/// Session-level SDP fields.
#[derive(Debug, Clone)]
pub struct SdpConfig {
    /// Origin username (`o=<username> ...`).
    pub username: String,
    /// Origin session id (`o=... <session-id> ...`).
    pub session_id: String,
    /// Origin session version (`o=... ... <session-version> ...`).
    pub session_version: String,
    /// Session name (`s=`).
    pub session_name: String,
    /// Port in the `m=` line. 0 when the transport is negotiated elsewhere.
    pub media_port: u16,
}

impl Default for SdpConfig {
    fn default() -> Self {
        Self {
            username: "-".to_string(),
            session_id: "0".to_string(),
            session_version: "0".to_string(),
            session_name: "Stream".to_string(),
            media_port: 0,
        }
    }
}

/// Generate an SDP session description for one stream.
pub fn generate_sdp(stream: &Stream, config: &SdpConfig, ip: &str) -> String {
    let mut sdp: Vec<String> = Vec::new();

    sdp.push("v=0".to_string());
    sdp.push(format!(
        "o={} {} {} IN IP4 {}",
        config.username, config.session_id, config.session_version, ip
    ));
    sdp.push(format!("s={}", config.session_name));
    sdp.push(format!("c=IN IP4 {}", ip));
    sdp.push("t=0 0".to_string());
    sdp.push("a=tool:av1-rtp".to_string());
    sdp.push("a=sendonly".to_string());
    sdp.push(format!(
        "m=video {} RTP/AVP {}",
        config.media_port,
        stream.payload_type()
    ));
    sdp.extend(stream.sdp_attributes());

    tracing::debug!(stream = stream.name(), "SDP: {}", sdp.join("\r\n"));

    format!("{}\r\n", sdp.join("\r\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::av1::Av1Packetizer;
    use crate::media::av1::obu::{ObuType, write_obu};
    use crate::media::av1::sequence::fixtures::sequence_header_payload;

    fn config() -> SdpConfig {
        SdpConfig {
            username: "sender".to_string(),
            session_id: "1234567890".to_string(),
            session_version: "1".to_string(),
            session_name: "Test Session".to_string(),
            media_port: 5004,
        }
    }

    #[test]
    fn generates_av1_sdp() {
        let stream = Stream::new("cam1", Box::new(Av1Packetizer::new(96, 0x12345678)));
        stream.packetize(
            &write_obu(ObuType::SequenceHeader, None, &sequence_header_payload(8)),
            3000,
        );
        let sdp = generate_sdp(&stream, &config(), "192.168.1.100");

        assert!(sdp.starts_with("v=0\r\n"));
        assert!(sdp.contains("o=sender 1234567890 1 IN IP4 192.168.1.100\r\n"));
        assert!(sdp.contains("s=Test Session\r\n"));
        assert!(sdp.contains("c=IN IP4 192.168.1.100\r\n"));
        assert!(sdp.contains("a=tool:av1-rtp\r\n"));
        assert!(sdp.contains("m=video 5004 RTP/AVP 96\r\n"));
        assert!(sdp.contains("a=rtpmap:96 AV1/90000\r\n"));
        assert!(sdp.contains("a=fmtp:96 profile=0;level-idx=8;tier=0\r\n"));
        assert!(sdp.contains("a=control:track1\r\n"));

        // rtpmap defines the payload type fmtp refers to
        let rtpmap_idx = sdp.find("a=rtpmap").unwrap();
        let fmtp_idx = sdp.find("a=fmtp").unwrap();
        assert!(rtpmap_idx < fmtp_idx);

        let sendonly_idx = sdp.find("a=sendonly").unwrap();
        let m_idx = sdp.find("m=video").unwrap();
        assert!(sendonly_idx < m_idx, "session attributes precede m=");
        assert!(sdp.ends_with("\r\n"));
    }

    #[test]
    fn omits_fmtp_before_sequence_header() {
        let stream = Stream::new("cam1", Box::new(Av1Packetizer::new(97, 1)));
        let sdp = generate_sdp(&stream, &SdpConfig::default(), "10.0.0.1");
        assert!(sdp.contains("o=- 0 0 IN IP4 10.0.0.1\r\n"));
        assert!(sdp.contains("m=video 0 RTP/AVP 97\r\n"));
        assert!(!sdp.contains("a=fmtp"));
    }
}
