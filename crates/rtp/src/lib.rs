//! RTP/RTCP transport, SDP offer/answer negotiation, and SRTP/DTLS keying for a
//! SIP media engine.
//!
//! This crate owns everything below the audio pipeline: binding and pairing UDP
//! sockets, negotiating codecs and transport security over SDP, packetizing and
//! depacketizing RTP, tracking sequence/jitter statistics, emitting and ingesting
//! RTCP, and deriving SRTP keys either via SDES or a DTLS-SRTP handshake
//! multiplexed on the RTP socket itself.

pub mod codec;
pub mod config;
pub mod dtls;
pub mod error;
pub mod rtcp;
pub mod rtp;
pub mod sdp;
pub mod session;
pub mod srtp;
pub mod time;

pub use codec::{Codec, CodecEntry};
pub use config::{MediaConfig, NatPolicy, PortRange, SecureMode};
pub use error::{Error, Result};
pub use session::{MediaSession, ReadStats, RtpSession, WriteStats};
