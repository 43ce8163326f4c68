//! Explicit, cloneable session configuration: no process-wide statics, everything
//! threaded through [`crate::session::MediaSession::new`].

use std::net::IpAddr;
use std::time::Duration;

use crate::srtp::SrtpProfile;

/// How the session protects RTP/RTCP on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureMode {
    /// Plain RTP/AVP.
    None,
    /// SDES inline keying, `RTP/SAVP`.
    Sdes,
    /// DTLS-SRTP keying, `UDP/TLS/RTP/SAVP`.
    Dtls,
}

/// Symmetric-NAT handling policy for the read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatPolicy {
    /// Always send to the address negotiated in SDP.
    Fixed,
    /// Latch the peer address to wherever the first valid inbound packet came from.
    Symmetric,
}

/// Even-inclusive `[start, end]` RTP port range, with a rotating allocation offset
/// carried alongside rather than as global mutable state.
#[derive(Debug, Clone, Copy)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }
}

/// Process-wide-in-spirit configuration, carried explicitly rather than as global
/// state, constructed once by the signaling layer and cloned into every session it
/// creates.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub local_ip: IpAddr,
    pub external_ip: Option<IpAddr>,
    pub port_range: Option<PortRange>,
    pub secure_mode: SecureMode,
    pub srtp_profile: SrtpProfile,
    pub nat_policy: NatPolicy,
    pub rtcp_interval: Duration,
    pub debug_rtp: bool,
    pub debug_rtcp: bool,
    pub debug_dtls: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            local_ip: IpAddr::from([127, 0, 0, 1]),
            external_ip: None,
            port_range: None,
            secure_mode: SecureMode::None,
            srtp_profile: SrtpProfile::AesCm128HmacSha1_80,
            nat_policy: NatPolicy::Fixed,
            rtcp_interval: Duration::from_secs(5),
            debug_rtp: false,
            debug_rtcp: false,
            debug_dtls: false,
        }
    }
}

impl MediaConfig {
    /// The address a peer should see in SDP `c=`/`o=` lines: the external override
    /// if configured, else the local bind address.
    pub fn advertised_ip(&self) -> IpAddr {
        self.external_ip.unwrap_or(self.local_ip)
    }
}
