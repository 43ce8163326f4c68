//! The closed set of codecs this engine negotiates and packetizes.
//!
//! Codecs are a closed, tagged enum rather than an open trait object: only PCMU,
//! PCMA, Opus, and telephone-event ever cross the wire.

use std::time::Duration;

/// One of the four payload kinds this engine understands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Payload type 0, μ-law, 8kHz mono.
    Pcmu,
    /// Payload type 8, A-law, 8kHz mono.
    Pcma,
    /// Payload type 96 by convention, Opus, 48kHz, configurable channel count.
    Opus { channels: u8 },
    /// Payload type 101 by convention, RFC 4733 telephone-event, 8kHz.
    TelephoneEvent,
    /// Any codec this engine doesn't natively encode/decode but still negotiates and
    /// forwards opaquely (used for bridge passthrough of unknown `a=rtpmap` entries).
    Other { rtpmap_name: String, clock_rate: u32, channels: u8 },
}

impl Codec {
    /// Default/well-known RTP payload type for this codec, used when the remote SDP
    /// doesn't carry an explicit `a=rtpmap` mapping of its own for a static type.
    pub fn default_payload_type(&self) -> Option<u8> {
        match self {
            Codec::Pcmu => Some(0),
            Codec::Pcma => Some(8),
            Codec::Opus { .. } => Some(96),
            Codec::TelephoneEvent => Some(101),
            Codec::Other { .. } => None,
        }
    }

    /// The `a=rtpmap` encoding name.
    pub fn rtpmap_name(&self) -> &str {
        match self {
            Codec::Pcmu => "PCMU",
            Codec::Pcma => "PCMA",
            Codec::Opus { .. } => "opus",
            Codec::TelephoneEvent => "telephone-event",
            Codec::Other { rtpmap_name, .. } => rtpmap_name,
        }
    }

    /// RTP clock rate in Hz.
    pub fn clock_rate(&self) -> u32 {
        match self {
            Codec::Pcmu | Codec::Pcma | Codec::TelephoneEvent => 8000,
            Codec::Opus { .. } => 48000,
            Codec::Other { clock_rate, .. } => *clock_rate,
        }
    }

    /// Channel count for the `a=rtpmap` line (omitted when 1).
    pub fn channels(&self) -> u8 {
        match self {
            Codec::Pcmu | Codec::Pcma | Codec::TelephoneEvent => 1,
            Codec::Opus { channels } => *channels,
            Codec::Other { channels, .. } => *channels,
        }
    }

    /// Packetization interval. All codecs in this engine run at 20ms.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(20)
    }

    /// Number of media-clock ticks per packetization interval, used to advance the
    /// RTP timestamp between packets.
    pub fn samples_per_frame(&self) -> u32 {
        (self.clock_rate() as u64 * self.frame_duration().as_millis() as u64 / 1000) as u32
    }

    /// `a=fmtp` body, if this codec needs one.
    pub fn fmtp(&self) -> Option<&'static str> {
        match self {
            Codec::Opus { .. } => Some("useinbandfec=0"),
            Codec::TelephoneEvent => Some("0-16"),
            _ => None,
        }
    }

    /// Resolve an `a=rtpmap` encoding name into one of the four codecs this engine
    /// knows, falling back to [`Codec::Other`] for anything it only forwards opaquely.
    pub fn from_rtpmap_name(name: &str, clock_rate: u32, channels: u8) -> Codec {
        match name.to_ascii_lowercase().as_str() {
            "pcmu" if clock_rate == 8000 => Codec::Pcmu,
            "pcma" if clock_rate == 8000 => Codec::Pcma,
            "opus" => Codec::Opus { channels: if channels == 0 { 2 } else { channels } },
            "telephone-event" => Codec::TelephoneEvent,
            _ => Codec::Other { rtpmap_name: name.to_string(), clock_rate, channels: channels.max(1) },
        }
    }
}

/// One negotiated (payload type, codec) pairing, as carried in an SDP `m=` line plus
/// its `a=rtpmap`/`a=fmtp` attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecEntry {
    /// The payload type this entry is bound to for this session (may differ from
    /// `codec.default_payload_type()` for dynamic payloads negotiated by the peer).
    pub payload_type: u8,
    /// The codec itself.
    pub codec: Codec,
}

impl CodecEntry {
    /// Construct from a codec using its conventional payload type.
    pub fn well_known(codec: Codec) -> Option<Self> {
        codec.default_payload_type().map(|pt| Self { payload_type: pt, codec })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_per_frame_matches_20ms_at_8khz() {
        assert_eq!(Codec::Pcmu.samples_per_frame(), 160);
        assert_eq!(Codec::Pcma.samples_per_frame(), 160);
    }

    #[test]
    fn samples_per_frame_matches_20ms_at_48khz() {
        assert_eq!(Codec::Opus { channels: 2 }.samples_per_frame(), 960);
    }
}
