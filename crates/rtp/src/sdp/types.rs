//! Typed SDP values: the subset of RFC 4566/3264 this engine needs.

use std::net::IpAddr;

/// `IN IP4` or `IN IP6` address-type tag used by both `o=` and `c=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrType {
    Ip4,
    Ip6,
}

impl AddrType {
    /// Infer the tag from a concrete address.
    pub fn of(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddrType::Ip4,
            IpAddr::V6(_) => AddrType::Ip6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AddrType::Ip4 => "IP4",
            AddrType::Ip6 => "IP6",
        }
    }
}

/// The `o=` origin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub username: String,
    pub session_id: u64,
    pub session_version: u64,
    pub addr_type: AddrType,
    pub address: IpAddr,
}

/// The `c=` connection line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub addr_type: AddrType,
    pub address: IpAddr,
}

/// The transport profile on an `m=` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportProfile {
    /// `RTP/AVP` - plain RTP.
    RtpAvp,
    /// `RTP/SAVP` - SRTP keyed by SDES.
    RtpSavp,
    /// `UDP/TLS/RTP/SAVP` - SRTP keyed by DTLS.
    UdpTlsRtpSavp,
}

impl TransportProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportProfile::RtpAvp => "RTP/AVP",
            TransportProfile::RtpSavp => "RTP/SAVP",
            TransportProfile::UdpTlsRtpSavp => "UDP/TLS/RTP/SAVP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RTP/AVP" => Some(TransportProfile::RtpAvp),
            "RTP/SAVP" => Some(TransportProfile::RtpSavp),
            "UDP/TLS/RTP/SAVP" => Some(TransportProfile::UdpTlsRtpSavp),
            _ => None,
        }
    }

    /// True when this profile requires an SRTP context before media can flow.
    pub fn requires_secure_rtp(self) -> bool {
        !matches!(self, TransportProfile::RtpAvp)
    }
}

/// `a=sendrecv|sendonly|recvonly` (and the unsupported `inactive`, parsed but treated
/// as `sendrecv` per spec silence — see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::SendRecv => "sendrecv",
            Mode::SendOnly => "sendonly",
            Mode::RecvOnly => "recvonly",
            Mode::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sendrecv" => Some(Mode::SendRecv),
            "sendonly" => Some(Mode::SendOnly),
            "recvonly" => Some(Mode::RecvOnly),
            "inactive" => Some(Mode::Inactive),
            _ => None,
        }
    }
}

/// One `a=rtpmap:PT name/rate[/channels]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpMap {
    pub payload_type: u8,
    pub name: String,
    pub clock_rate: u32,
    pub channels: Option<u8>,
}

/// One `a=fmtp:PT params` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fmtp {
    pub payload_type: u8,
    pub params: String,
}

/// `a=setup:` value, DTLS-SRTP role negotiation (RFC 4145 / 5763).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setup {
    Active,
    Passive,
    ActPass,
}

impl Setup {
    pub fn as_str(self) -> &'static str {
        match self {
            Setup::Active => "active",
            Setup::Passive => "passive",
            Setup::ActPass => "actpass",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Setup::Active),
            "passive" => Some(Setup::Passive),
            "actpass" => Some(Setup::ActPass),
            // "holdconn" (RFC 4145) is not supported; treat as unparseable here.
            _ => None,
        }
    }
}

/// `a=fingerprint:alg HEX:PAIRS` - a DTLS certificate fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub algorithm: String,
    /// Upper-case, colon-separated hex, exactly as it appears on the wire.
    pub hex: String,
}

/// `a=crypto:tag profile inline:key||salt` - an SDES key offer/answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crypto {
    pub tag: u32,
    pub profile: String,
    /// Raw base64 payload after `inline:`, key params stripped.
    pub inline_base64: String,
}

/// The one `m=audio` section this engine cares about, plus the session-level lines
/// that travel with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdpSession {
    pub origin: Origin,
    pub connection: Connection,
    pub port: u16,
    pub profile: TransportProfile,
    pub payload_types: Vec<u8>,
    pub rtpmaps: Vec<RtpMap>,
    pub fmtps: Vec<Fmtp>,
    pub ptime: Option<u32>,
    pub maxptime: Option<u32>,
    pub mode: Mode,
    pub crypto: Vec<Crypto>,
    pub setup: Option<Setup>,
    pub fingerprints: Vec<Fingerprint>,
}

impl SdpSession {
    /// Look up the `a=rtpmap` entry for a payload type, if any was sent.
    pub fn rtpmap_for(&self, pt: u8) -> Option<&RtpMap> {
        self.rtpmaps.iter().find(|m| m.payload_type == pt)
    }

    /// Look up the `a=fmtp` entry for a payload type, if any was sent.
    pub fn fmtp_for(&self, pt: u8) -> Option<&Fmtp> {
        self.fmtps.iter().find(|f| f.payload_type == pt)
    }
}
