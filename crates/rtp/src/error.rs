//! Error types for RTP/RTCP transport, SDP negotiation, and SRTP/DTLS keying.

use std::net::SocketAddr;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while negotiating, opening, or operating a media session.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // -- configuration --
    /// The session was constructed with an invalid or incomplete configuration.
    #[error("invalid media configuration: {0}")]
    Config(String),

    // -- SDP / negotiation --
    /// The SDP body could not be parsed.
    #[error("sdp parse error at line {line}: {reason}")]
    SdpParse {
        /// 1-based line number within the body.
        line: usize,
        /// Human-readable reason.
        reason: String,
    },

    /// The SDP body had no `m=audio` line.
    #[error("sdp has no audio media line")]
    NoAudioMedia,

    /// The `c=` connection address could not be parsed.
    #[error("invalid connection address: {0}")]
    InvalidConnectionAddress(String),

    /// The transport profile string on the `m=` line is not one we support.
    #[error("unsupported transport profile: {0}")]
    UnsupportedProfile(String),

    /// Offer and answer codec lists had no payload type in common.
    #[error("no common codec between local and remote offer")]
    NoCommonCodec,

    /// The peer's `m=audio` line asserted `RTP/SAVP` but no SRTP context could be built
    /// from the attributes it carried.
    #[error("remote requested secure RTP, but no context is created")]
    SecureRequiredNoContext,

    // -- cryptographic --
    /// A `a=crypto:` inline key was not valid base64, or decoded to the wrong length.
    #[error("invalid srtp key material for profile {profile}: expected {expected} bytes, got {actual}")]
    InvalidKeyMaterial {
        /// Profile name the key was being decoded for.
        profile: String,
        /// Expected key+salt length in bytes.
        expected: usize,
        /// Actual decoded length.
        actual: usize,
    },

    /// SRTP/SRTCP authentication or decryption failed.
    #[error("srtp decrypt failed: {0}")]
    SrtpDecrypt(String),

    /// The DTLS handshake did not complete successfully.
    #[error("dtls handshake failed: {0}")]
    DtlsHandshake(String),

    /// `Finalize` was called on a session with no deferred DTLS peer.
    #[error("finalize called but no dtls handshake is pending")]
    NoPendingHandshake,

    // -- I/O --
    /// Underlying socket I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A write to the underlying socket wrote fewer bytes than the packet required.
    #[error("short write: wrote {wrote} of {expected} bytes")]
    ShortWrite {
        /// Bytes actually written.
        wrote: usize,
        /// Bytes that should have been written.
        expected: usize,
    },

    /// The caller's buffer was too small to hold a parsed or decoded value.
    #[error("buffer too small: need {required} bytes, have {available}")]
    ShortBuffer {
        /// Bytes required.
        required: usize,
        /// Bytes available in the caller's buffer.
        available: usize,
    },

    // -- RTP/RTCP wire format --
    /// An RTP or RTCP packet was malformed.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    // -- sequence tracking --
    /// A very large, unexplained jump in sequence number.
    #[error("bad sequence number")]
    BadSequence,

    /// A packet was judged to be a duplicate or too-old retransmission.
    #[error("duplicate sequence number")]
    DuplicateSequence,

    // -- ports / resources --
    /// No free port pair could be found in the configured range.
    #[error("rtp port range exhausted ({start}-{end})")]
    PortRangeExhausted {
        /// Lower bound of the configured range.
        start: u16,
        /// Upper bound of the configured range.
        end: u16,
    },

    /// The bridge already holds its configured number of participants.
    #[error("bridge is full")]
    BridgeFull,

    /// Codec mismatch when adding a session to a bridge that disallows transcoding.
    #[error("bridge session codec mismatch: {0}")]
    BridgeCodecMismatch(String),

    /// The session or resource has already been closed.
    #[error("session is closed")]
    Closed,

    /// Peer address is not yet known (no SDP exchanged, or NAT address not learned).
    #[error("peer address unknown for {0:?}")]
    PeerUnknown(SocketAddr),
}

impl Error {
    /// True for errors that are expected during an orderly shutdown and should not be
    /// logged as failures.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut
            || e.kind() == std::io::ErrorKind::WouldBlock)
    }

    /// True when a closed socket should be treated as a graceful end-of-stream by readers.
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
            || matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotConnected
                || e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}
