//! A complete RTP packet: header plus payload bytes.

use bytes::{Bytes, BytesMut};

use super::header::PacketHeader;
use crate::error::Result;

/// One RTP packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    /// Fixed header plus the one recognized extension.
    pub header: PacketHeader,
    /// Payload bytes (already excluding header and any padding).
    pub payload: Bytes,
}

impl RtpPacket {
    /// Build a packet from a header and payload.
    pub fn new(header: PacketHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Marshal header + payload into one contiguous buffer.
    pub fn marshal(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.header.size() + self.payload.len());
        self.header.marshal(&mut buf);
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parse a full datagram into header + payload.
    pub fn unmarshal(mut data: Bytes) -> Result<Self> {
        let header = PacketHeader::unmarshal(&mut data)?;
        Ok(Self { header, payload: data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_bytes() {
        let header = PacketHeader::new(0, 42, 8000, 0x1122_3344);
        let pkt = RtpPacket::new(header, Bytes::from_static(b"hello rtp"));
        let wire = pkt.marshal().freeze();
        let parsed = RtpPacket::unmarshal(wire).unwrap();
        assert_eq!(parsed, pkt);
    }
}
