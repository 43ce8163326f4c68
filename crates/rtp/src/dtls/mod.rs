//! DTLS-SRTP keying (RFC 5764): certificate/fingerprint generation, `a=setup:`
//! role resolution, and the handshake itself, multiplexed on the RTP socket.

pub mod fingerprint;
pub mod handshake;
pub mod mux;
pub mod role;

pub use handshake::{run, DtlsIdentity, DtlsSrtpKeys};
pub use mux::{channel, looks_like_dtls, DemuxedConn};
pub use role::Role;
