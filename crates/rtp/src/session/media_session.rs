//! The media session: two bound UDP sockets, SDP offer/answer, and the SRTP/DTLS
//! context that protects whatever flows over them.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rand::Rng;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::codec::{Codec, CodecEntry};
use crate::config::{MediaConfig, NatPolicy, SecureMode};
use crate::dtls::{self, DtlsIdentity, Role};
use crate::error::{Error, Result};
use crate::rtp::{PacketHeader, RtpPacket, RtpReader, RtpWriter};
use crate::sdp::{self, Crypto, GenerateParams, Mode, SdpSession, Setup, TransportProfile};
use crate::srtp::{SdesKey, SrtpContext, SrtpProfile};

use super::port_allocator::{bind_pair_at, PortAllocator};

const MAX_DATAGRAM: usize = 2048;

/// Tracks a rollover counter from a stream of sequence numbers seen in one
/// direction, for SRTP's `roc` parameter. This engine's sessions are short-lived
/// point-to-point calls, so a boundary heuristic (rather than RFC 3711 appendix A's
/// full estimator) is sufficient: a jump from near 0xffff down to near 0x0000 is
/// treated as a wrap, anything else leaves the counter alone.
#[derive(Debug, Default, Clone, Copy)]
struct RocTracker {
    initialized: bool,
    roc: u32,
    last_seq: u16,
}

impl RocTracker {
    fn advance(&mut self, seq: u16) -> u32 {
        if !self.initialized {
            self.initialized = true;
            self.last_seq = seq;
            return self.roc;
        }
        if self.last_seq > 0xff00 && seq < 0x0100 {
            self.roc = self.roc.wrapping_add(1);
        }
        self.last_seq = seq;
        self.roc
    }
}

/// Carries the inbound-datagram channel a deferred DTLS handshake will consume once
/// `finalize` actually runs it.
struct PendingDtls {
    role: Role,
    inbound: mpsc::Receiver<Vec<u8>>,
}

struct State {
    session_id: u64,
    session_version: u64,
    local_sdp_cache: Option<String>,
    negotiated_codecs: Vec<CodecEntry>,
    peer_rtp_addr: Option<SocketAddr>,
    peer_rtcp_addr: Option<SocketAddr>,
    nat_rtp_latched: bool,
    mode: Mode,
    local_srtp: Option<SrtpContext>,
    remote_srtp: Option<SrtpContext>,
    sdes_key: Option<SdesKey>,
    identity: Option<DtlsIdentity>,
    pending_dtls: Option<PendingDtls>,
    dtls_tx: Option<mpsc::Sender<Vec<u8>>>,
    write_roc: RocTracker,
    read_roc: RocTracker,
}

impl State {
    fn new(session_id: u64) -> Self {
        Self {
            session_id,
            session_version: 1,
            local_sdp_cache: None,
            negotiated_codecs: Vec::new(),
            peer_rtp_addr: None,
            peer_rtcp_addr: None,
            nat_rtp_latched: false,
            mode: Mode::SendRecv,
            local_srtp: None,
            remote_srtp: None,
            sdes_key: None,
            identity: None,
            pending_dtls: None,
            dtls_tx: None,
            write_roc: RocTracker::default(),
            read_roc: RocTracker::default(),
        }
    }
}

/// Owns one RTP/RTCP socket pair and the negotiation/crypto state layered over it.
pub struct MediaSession {
    config: MediaConfig,
    local_codecs: Vec<CodecEntry>,
    rtp_socket: Arc<UdpSocket>,
    rtcp_socket: Arc<UdpSocket>,
    rtp_rx: tokio::sync::Mutex<mpsc::Receiver<(SocketAddr, Vec<u8>)>>,
    closed: Arc<AtomicBool>,
    state: Arc<Mutex<State>>,
}

impl MediaSession {
    /// Bind a socket pair and construct a session. `preferred_port` of `0` draws
    /// from `config.port_range` if one is configured; otherwise it is used as the
    /// exact RTP port to bind.
    pub async fn new(config: MediaConfig, local_codecs: Vec<CodecEntry>, preferred_port: u16) -> Result<Self> {
        if local_codecs.is_empty() {
            return Err(Error::Config("media session needs at least one local codec".into()));
        }

        let (rtp_socket, rtcp_socket) = if preferred_port == 0 {
            let range = config
                .port_range
                .ok_or_else(|| Error::Config("port 0 requested but no port range is configured".into()))?;
            PortAllocator::new(range).bind_pair(config.local_ip).await?
        } else {
            bind_pair_at(config.local_ip, preferred_port).await?
        };

        let mut state = State::new(rand::thread_rng().gen());
        state.identity = match config.secure_mode {
            SecureMode::Dtls => Some(DtlsIdentity::generate()?),
            _ => None,
        };
        state.sdes_key = match config.secure_mode {
            SecureMode::Sdes => Some(SdesKey::generate(config.srtp_profile)?),
            _ => None,
        };

        Self::from_parts(config, local_codecs, rtp_socket, rtcp_socket, state)
    }

    fn from_parts(
        config: MediaConfig,
        local_codecs: Vec<CodecEntry>,
        rtp_socket: UdpSocket,
        rtcp_socket: UdpSocket,
        state: State,
    ) -> Result<Self> {
        let rtp_socket = Arc::new(rtp_socket);
        let rtcp_socket = Arc::new(rtcp_socket);
        let (tx, rx) = mpsc::channel(256);
        let closed = Arc::new(AtomicBool::new(false));
        let state = Arc::new(Mutex::new(state));

        tokio::spawn(rtp_pump(Arc::clone(&rtp_socket), Arc::clone(&state), tx, Arc::clone(&closed)));

        Ok(Self {
            config,
            local_codecs,
            rtp_socket,
            rtcp_socket,
            rtp_rx: tokio::sync::Mutex::new(rx),
            closed,
            state,
        })
    }

    pub fn local_rtp_addr(&self) -> Result<SocketAddr> {
        Ok(self.rtp_socket.local_addr()?)
    }

    pub fn local_rtcp_addr(&self) -> Result<SocketAddr> {
        Ok(self.rtcp_socket.local_addr()?)
    }

    pub fn negotiated_codecs(&self) -> Vec<CodecEntry> {
        let state = self.state.lock();
        if state.negotiated_codecs.is_empty() {
            self.local_codecs.clone()
        } else {
            state.negotiated_codecs.clone()
        }
    }

    pub fn peer_rtp_addr(&self) -> Option<SocketAddr> {
        self.state.lock().peer_rtp_addr
    }

    /// Negotiated send/receive direction, used to decide whether the RTCP cadence
    /// emits sender or receiver reports.
    pub fn mode(&self) -> Mode {
        self.state.lock().mode
    }

    /// Configured RTCP emission cadence.
    pub fn rtcp_interval(&self) -> std::time::Duration {
        self.config.rtcp_interval
    }

    fn transport_profile(&self) -> TransportProfile {
        match self.config.secure_mode {
            SecureMode::None => TransportProfile::RtpAvp,
            SecureMode::Sdes => TransportProfile::RtpSavp,
            SecureMode::Dtls => TransportProfile::UdpTlsRtpSavp,
        }
    }

    /// Cached static SDP if present, else a freshly generated offer/answer body.
    pub async fn local_sdp(&self) -> Result<String> {
        if let Some(cached) = self.state.lock().local_sdp_cache.clone() {
            return Ok(cached);
        }

        let codecs = self.negotiated_codecs();
        let rtp_addr = self.local_rtp_addr()?;
        let profile = self.transport_profile();

        let crypto: Option<Crypto> = self.state.lock().sdes_key.as_ref().map(|k| k.to_crypto_line(1));

        let (setup, fingerprints) = if matches!(self.config.secure_mode, SecureMode::Dtls) {
            let state = self.state.lock();
            let setup = if state.peer_rtp_addr.is_some() { Setup::Passive } else { Setup::Active };
            let fingerprint = state.identity.as_ref().map(|id| id.fingerprint()).transpose()?;
            (Some(setup), fingerprint.into_iter().collect::<Vec<_>>())
        } else {
            (None, Vec::new())
        };

        let (session_id, session_version, mode) = {
            let state = self.state.lock();
            (state.session_id, state.session_version, state.mode)
        };

        let params = GenerateParams {
            session_id,
            session_version,
            origin_address: self.config.advertised_ip(),
            connection_address: self.config.advertised_ip(),
            port: rtp_addr.port(),
            profile,
            codecs: &codecs,
            mode,
            crypto: crypto.as_ref(),
            setup,
            fingerprints: &fingerprints,
        };
        let body = sdp::generate(&params);

        self.state.lock().local_sdp_cache = Some(body.clone());
        Ok(body)
    }

    fn invalidate_local_sdp(&self) {
        let mut state = self.state.lock();
        state.session_version += 1;
        state.local_sdp_cache = None;
    }

    /// Parse, validate, and adopt a peer's SDP offer/answer.
    pub async fn remote_sdp(&self, body: &str) -> Result<()> {
        let remote: SdpSession = sdp::parse(body)?;
        let remote_requires_sdes = remote.profile == TransportProfile::RtpSavp;

        let peer_codecs: Vec<CodecEntry> = remote
            .payload_types
            .iter()
            .map(|&pt| {
                let codec = match remote.rtpmap_for(pt) {
                    Some(map) => Codec::from_rtpmap_name(&map.name, map.clock_rate, map.channels.unwrap_or(1)),
                    None => well_known_static_codec(pt),
                };
                CodecEntry { payload_type: pt, codec }
            })
            .collect();

        // Intersect preserving remote order (RFC 3264 §6.1).
        let negotiated: Vec<CodecEntry> = peer_codecs
            .into_iter()
            .filter(|remote_entry| self.local_codecs.iter().any(|local| local.codec == remote_entry.codec))
            .collect();
        if negotiated.is_empty() {
            return Err(Error::NoCommonCodec);
        }

        let peer_rtp_addr = SocketAddr::new(remote.connection.address, remote.port);
        let peer_rtcp_addr = SocketAddr::new(remote.connection.address, remote.port + 1);

        let remote_srtp = match remote
            .crypto
            .iter()
            .find(|c| SrtpProfile::from_sdes_name(&c.profile) == Some(self.config.srtp_profile))
        {
            Some(crypto) => {
                let key = SdesKey::from_crypto_line(crypto)?;
                Some(SrtpContext::new(key.profile, &key.key, &key.salt)?)
            }
            None => None,
        };

        let pending_dtls = if matches!(self.config.secure_mode, SecureMode::Dtls) {
            // An already-cached local SDP means we are the offerer and declared
            // `active` with no peer yet known; otherwise we are answering for the
            // first time and our own (not yet generated) answer is about to declare
            // `passive`, now that this call is about to learn the peer's address.
            let local_offered = if self.state.lock().local_sdp_cache.is_some() { Setup::Active } else { Setup::Passive };
            let remote_setup = remote.setup.unwrap_or(Setup::ActPass);
            let role = dtls::role::resolve(local_offered, remote_setup)?;
            let (tx, rx) = dtls::channel();
            self.state.lock().dtls_tx = Some(tx);
            Some(PendingDtls { role, inbound: rx })
        } else {
            None
        };

        let mut state = self.state.lock();
        state.session_id = state.session_id.max(remote.origin.session_id);
        state.negotiated_codecs = negotiated;
        state.peer_rtp_addr = Some(peer_rtp_addr);
        state.peer_rtcp_addr = Some(peer_rtcp_addr);
        state.mode = remote.mode;
        if remote_srtp.is_some() {
            state.remote_srtp = remote_srtp;
        }
        if pending_dtls.is_some() {
            state.pending_dtls = pending_dtls;
        }

        if remote_requires_sdes && state.remote_srtp.is_none() {
            return Err(Error::SecureRequiredNoContext);
        }
        drop(state);

        self.invalidate_local_sdp();
        Ok(())
    }

    /// Run the deferred DTLS handshake exactly once, deriving the SRTP contexts
    /// from the exported keying material.
    pub async fn finalize(&self) -> Result<()> {
        let local_addr = self.rtp_socket.local_addr()?;
        let (pending, peer, identity) = {
            let mut state = self.state.lock();
            let pending = state.pending_dtls.take().ok_or(Error::NoPendingHandshake)?;
            let peer = state.peer_rtp_addr.ok_or(Error::PeerUnknown(local_addr))?;
            let identity = state
                .identity
                .clone()
                .ok_or_else(|| Error::Config("dtls finalize called without a local identity".into()))?;
            (pending, peer, identity)
        };

        let keys = dtls::handshake::run(
            Arc::clone(&self.rtp_socket),
            peer,
            &identity,
            pending.role,
            self.config.srtp_profile,
            pending.inbound,
        )
        .await?;

        let local_srtp = SrtpContext::new(self.config.srtp_profile, &keys.local_key, &keys.local_salt)?;
        let remote_srtp = SrtpContext::new(self.config.srtp_profile, &keys.remote_key, &keys.remote_salt)?;

        let mut state = self.state.lock();
        state.local_srtp = Some(local_srtp);
        state.remote_srtp = Some(remote_srtp);
        state.dtls_tx = None;
        Ok(())
    }

    /// `Fork`: a fresh session over the same sockets with negotiation state reset,
    /// ready to run a brand new offer/answer.
    pub fn fork(&self) -> Result<Self> {
        let mut state = State::new(rand::thread_rng().gen());
        state.identity = match self.config.secure_mode {
            SecureMode::Dtls => Some(DtlsIdentity::generate()?),
            _ => None,
        };
        state.sdes_key = match self.config.secure_mode {
            SecureMode::Sdes => Some(SdesKey::generate(self.config.srtp_profile)?),
            _ => None,
        };

        let (tx, rx) = mpsc::channel(256);
        let closed = Arc::new(AtomicBool::new(false));
        let state = Arc::new(Mutex::new(state));
        tokio::spawn(rtp_pump(Arc::clone(&self.rtp_socket), Arc::clone(&state), tx, Arc::clone(&closed)));

        Ok(Self {
            config: self.config.clone(),
            local_codecs: self.local_codecs.clone(),
            rtp_socket: Arc::clone(&self.rtp_socket),
            rtcp_socket: Arc::clone(&self.rtcp_socket),
            rtp_rx: tokio::sync::Mutex::new(rx),
            closed,
            state,
        })
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Send one raw (already-marshalled) RTCP compound packet to the current peer,
    /// encrypting it into SRTCP when a local context exists. `ssrc` is the sender
    /// SSRC embedded in the packet, supplied by the caller since `MediaSession`
    /// itself has no notion of which SSRC the RTP stream above it is using.
    pub async fn write_rtcp_raw(&self, ssrc: u32, body: &[u8]) -> Result<()> {
        let (peer, wire) = {
            let mut state = self.state.lock();
            let peer = match state.peer_rtcp_addr {
                Some(peer) => peer,
                None => return Err(Error::PeerUnknown(self.rtcp_socket.local_addr()?)),
            };
            let mut buf = body.to_vec();
            if let Some(ctx) = state.local_srtp.as_mut() {
                ctx.encrypt_rtcp(ssrc, &mut buf)?;
            }
            (peer, buf)
        };
        let wrote = self.rtcp_socket.send_to(&wire, peer).await?;
        if wrote != wire.len() {
            return Err(Error::ShortWrite { wrote, expected: wire.len() });
        }
        Ok(())
    }

    /// Receive and decrypt one raw RTCP datagram from the peer.
    pub async fn read_rtcp_raw(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (n, from) = self.rtcp_socket.recv_from(&mut buf).await?;
            let mut datagram = buf[..n].to_vec();

            let mut state = self.state.lock();
            if self.config.nat_policy == NatPolicy::Symmetric && state.nat_rtp_latched && state.peer_rtcp_addr != Some(from) {
                debug!(%from, "latching rtcp peer address under symmetric nat");
                state.peer_rtcp_addr = Some(from);
            }

            if let Some(ctx) = state.remote_srtp.as_ref() {
                if datagram.len() < 8 {
                    warn!("dropping undersized srtcp datagram");
                    continue;
                }
                let ssrc = u32::from_be_bytes(datagram[4..8].try_into().unwrap());
                if ctx.decrypt_rtcp(ssrc, &mut datagram).is_err() {
                    warn!("dropping srtcp datagram that failed authentication");
                    continue;
                }
            }
            return Ok(datagram);
        }
    }
}

/// Payload types with a static RFC 3551 meaning even when the peer sends no
/// `a=rtpmap` for them.
fn well_known_static_codec(pt: u8) -> Codec {
    match pt {
        0 => Codec::Pcmu,
        8 => Codec::Pcma,
        101 => Codec::TelephoneEvent,
        _ => Codec::Other { rtpmap_name: format!("pt{pt}"), clock_rate: 8000, channels: 1 },
    }
}

#[async_trait]
impl RtpWriter for MediaSession {
    async fn write_rtp(&self, packet: &RtpPacket) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let mut wire = packet.marshal().to_vec();
        let peer = {
            let mut state = self.state.lock();
            let roc = state.write_roc.advance(packet.header.sequence_number);
            if let Some(ctx) = state.local_srtp.as_ref() {
                ctx.encrypt_rtp(packet.header.ssrc, packet.header.sequence_number, roc, &mut wire)?;
            }
            state.peer_rtp_addr.ok_or(Error::PeerUnknown(self.rtp_socket.local_addr()?))?
        };

        let wrote = self.rtp_socket.send_to(&wire, peer).await?;
        if wrote != wire.len() {
            return Err(Error::ShortWrite { wrote, expected: wire.len() });
        }
        Ok(())
    }
}

#[async_trait]
impl RtpReader for MediaSession {
    async fn read_rtp(&self) -> Result<RtpPacket> {
        loop {
            if self.is_closed() {
                return Err(Error::Closed);
            }
            let (from, mut datagram) = {
                let mut rx = self.rtp_rx.lock().await;
                rx.recv().await.ok_or(Error::Closed)?
            };

            if self.config.nat_policy == NatPolicy::Symmetric {
                let mut state = self.state.lock();
                if state.peer_rtp_addr.is_some() && state.peer_rtp_addr != Some(from) {
                    debug!(%from, "latching rtp peer address under symmetric nat");
                    state.peer_rtp_addr = Some(from);
                    state.nat_rtp_latched = true;
                }
            }

            let header = match PacketHeader::unmarshal(&mut &datagram[..]) {
                Ok(h) => h,
                Err(_) => {
                    warn!("dropping malformed rtp datagram");
                    continue;
                }
            };

            let mut state = self.state.lock();
            if state.remote_srtp.is_some() {
                let roc = state.read_roc.advance(header.sequence_number);
                let ctx = state.remote_srtp.as_ref().unwrap();
                if let Err(err) = ctx.decrypt_rtp(header.ssrc, header.sequence_number, roc, &mut datagram) {
                    warn!(%err, "dropping rtp datagram that failed srtp authentication");
                    continue;
                }
            }
            drop(state);

            match RtpPacket::unmarshal(Bytes::from(datagram)) {
                Ok(packet) => return Ok(packet),
                Err(_) => {
                    warn!("dropping malformed rtp packet after decrypt");
                    continue;
                }
            }
        }
    }
}

/// Continuously drains `socket`, routing DTLS-looking datagrams to whatever
/// handshake is currently pending and everything else into `tx` for
/// [`MediaSession::read_rtp`].
async fn rtp_pump(
    socket: Arc<UdpSocket>,
    state: Arc<Mutex<State>>,
    tx: mpsc::Sender<(SocketAddr, Vec<u8>)>,
    closed: Arc<AtomicBool>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        if closed.load(Ordering::Acquire) {
            return;
        }
        let (n, from) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(err) => {
                if err.kind() == std::io::ErrorKind::TimedOut {
                    continue;
                }
                debug!(%err, "rtp receive pump exiting");
                return;
            }
        };
        if n == 0 {
            continue;
        }
        let datagram = buf[..n].to_vec();

        if dtls::looks_like_dtls(datagram[0]) {
            let dtls_tx = state.lock().dtls_tx.clone();
            if let Some(dtls_tx) = dtls_tx {
                let _ = dtls_tx.send(datagram).await;
                continue;
            }
        }

        if tx.send((from, datagram)).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MediaConfig, PortRange};
    use std::net::IpAddr;

    fn pcmu_entry() -> CodecEntry {
        CodecEntry::well_known(Codec::Pcmu).unwrap()
    }

    fn config_with_range(start: u16, end: u16) -> MediaConfig {
        let mut config = MediaConfig::default();
        config.local_ip = IpAddr::from([127, 0, 0, 1]);
        config.port_range = Some(PortRange::new(start, end));
        config
    }

    #[tokio::test]
    async fn port_zero_without_a_range_is_a_config_error() {
        let config = MediaConfig::default();
        let err = MediaSession::new(config, vec![pcmu_entry()], 0).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn offer_answer_then_plain_rtp_round_trip() {
        let a = MediaSession::new(config_with_range(41400, 41420), vec![pcmu_entry()], 0).await.unwrap();
        let b = MediaSession::new(config_with_range(41400, 41420), vec![pcmu_entry()], 0).await.unwrap();

        let offer = a.local_sdp().await.unwrap();
        b.remote_sdp(&offer).await.unwrap();
        let answer = b.local_sdp().await.unwrap();
        a.remote_sdp(&answer).await.unwrap();

        let header = PacketHeader::new(0, 1, 160, 0xAAAA);
        let packet = RtpPacket::new(header, Bytes::from_static(b"hello"));
        a.write_rtp(&packet).await.unwrap();

        let received = b.read_rtp().await.unwrap();
        assert_eq!(received.payload, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn remote_sdp_with_no_common_codec_fails() {
        let a = MediaSession::new(config_with_range(41450, 41470), vec![pcmu_entry()], 0).await.unwrap();
        let b = MediaSession::new(
            config_with_range(41450, 41470),
            vec![CodecEntry::well_known(Codec::Opus { channels: 2 }).unwrap()],
            0,
        )
        .await
        .unwrap();

        let offer = a.local_sdp().await.unwrap();
        let err = b.remote_sdp(&offer).await.unwrap_err();
        assert!(matches!(err, Error::NoCommonCodec));
    }
}
