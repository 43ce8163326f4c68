//! RTCP: SR/RR/SDES/BYE per RFC 3550.

pub mod bye;
pub mod receiver_report;
pub mod report_block;
pub mod sdes;
pub mod sender_report;

pub use bye::Bye;
pub use receiver_report::ReceiverReport;
pub use report_block::ReportBlock;
pub use sdes::Sdes;
pub use sender_report::SenderReport;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// RTCP version, same constant as RTP.
pub const RTCP_VERSION: u8 = 2;

const PT_SENDER_REPORT: u8 = 200;
const PT_RECEIVER_REPORT: u8 = 201;
const PT_SOURCE_DESCRIPTION: u8 = 202;
const PT_GOODBYE: u8 = 203;

/// One parsed RTCP packet out of the (possibly compound) datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtcpPacket {
    SenderReport(SenderReport),
    ReceiverReport(ReceiverReport),
    SourceDescription(Sdes),
    Goodbye(Bye),
}

impl RtcpPacket {
    /// Serialize a single packet (with its own header) into `buf`.
    pub fn write(&self, buf: &mut BytesMut) {
        match self {
            RtcpPacket::SenderReport(sr) => {
                write_header(buf, PT_SENDER_REPORT, sr.reports.len() as u8, sr.size());
                sr.write(buf);
            }
            RtcpPacket::ReceiverReport(rr) => {
                write_header(buf, PT_RECEIVER_REPORT, rr.reports.len() as u8, rr.size());
                rr.write(buf);
            }
            RtcpPacket::SourceDescription(sdes) => {
                write_header(buf, PT_SOURCE_DESCRIPTION, sdes.chunks.len() as u8, sdes.size());
                sdes.write(buf);
            }
            RtcpPacket::Goodbye(bye) => {
                write_header(buf, PT_GOODBYE, bye.sources.len() as u8, bye.size());
                bye.write(buf);
            }
        }
    }

    /// Parse every packet in a (possibly compound) RTCP datagram.
    pub fn parse_compound(mut data: Bytes) -> Result<Vec<RtcpPacket>> {
        let mut packets = Vec::new();
        while data.remaining() >= 4 {
            let b0 = data[0];
            let version = b0 >> 6;
            if version != RTCP_VERSION {
                return Err(Error::MalformedPacket(format!("unsupported rtcp version {version}")));
            }
            let count = b0 & 0x1f;
            let packet_type = data[1];
            let length_words = u16::from_be_bytes([data[2], data[3]]) as usize;
            let body_len = length_words * 4;
            data.advance(4);
            if data.remaining() < body_len {
                return Err(Error::MalformedPacket("truncated rtcp packet".into()));
            }
            let mut body = data.split_to(body_len);
            let packet = match packet_type {
                PT_SENDER_REPORT => RtcpPacket::SenderReport(SenderReport::parse(&mut body, count)?),
                PT_RECEIVER_REPORT => RtcpPacket::ReceiverReport(ReceiverReport::parse(&mut body, count)?),
                PT_SOURCE_DESCRIPTION => RtcpPacket::SourceDescription(Sdes::parse(&mut body, count)?),
                PT_GOODBYE => RtcpPacket::Goodbye(Bye::parse(&mut body, count, body_len)?),
                other => return Err(Error::MalformedPacket(format!("unknown rtcp packet type {other}"))),
            };
            packets.push(packet);
        }
        Ok(packets)
    }
}

fn write_header(buf: &mut BytesMut, packet_type: u8, count: u8, body_len: usize) {
    debug_assert_eq!(body_len % 4, 0, "rtcp packet body must be word-aligned");
    let length_words = body_len / 4;
    buf.put_u8((RTCP_VERSION << 6) | (count & 0x1f));
    buf.put_u8(packet_type);
    buf.put_u16(length_words as u16);
}
