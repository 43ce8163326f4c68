//! RTP packet model, wire codec, sequence tracking, and the packetizer/depacketizer
//! pair that chains audio pipeline stages onto a session.

pub mod depacketizer;
pub mod header;
pub mod packet;
pub mod packetizer;
pub mod sequence;
pub mod sink;

pub use depacketizer::Depacketizer;
pub use header::PacketHeader;
pub use packet::RtpPacket;
pub use packetizer::Packetizer;
pub use sequence::SequenceTracker;
pub use sink::{RtpReader, RtpWriter};
