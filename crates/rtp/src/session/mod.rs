//! Session-layer wiring: port allocation, the media session itself, the RTP
//! session that layers statistics and RTCP on top of it.

pub mod media_session;
pub mod port_allocator;
pub mod rtp_session;
pub mod stats;

pub use media_session::MediaSession;
pub use port_allocator::{bind_pair_at, PortAllocator};
pub use rtp_session::RtpSession;
pub use stats::{ReadStats, WriteStats};
