//! RTCP Sender Report (SR), RFC 3550 §6.4.1.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::time::NtpTimestamp;

use super::report_block::{self, ReportBlock};

/// Size of the sender-info block: NTP (8) + RTP timestamp (4) + packet count (4) +
/// octet count (4).
pub const SENDER_INFO_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderReport {
    pub ssrc: u32,
    pub ntp_timestamp: NtpTimestamp,
    pub rtp_timestamp: u32,
    pub packet_count: u32,
    pub octet_count: u32,
    /// Carries at most one reception report, for the session's read SSRC.
    pub reports: Vec<ReportBlock>,
}

impl SenderReport {
    pub fn size(&self) -> usize {
        4 + SENDER_INFO_SIZE + self.reports.len() * report_block::SIZE
    }

    pub fn write(&self, buf: &mut BytesMut) {
        buf.put_u32(self.ssrc);
        buf.put_u32(self.ntp_timestamp.seconds);
        buf.put_u32(self.ntp_timestamp.fraction);
        buf.put_u32(self.rtp_timestamp);
        buf.put_u32(self.packet_count);
        buf.put_u32(self.octet_count);
        for report in &self.reports {
            report.write(buf);
        }
    }

    pub fn parse(buf: &mut impl Buf, report_count: u8) -> Result<Self> {
        if buf.remaining() < 4 + SENDER_INFO_SIZE {
            return Err(Error::ShortBuffer { required: 4 + SENDER_INFO_SIZE, available: buf.remaining() });
        }
        let ssrc = buf.get_u32();
        let seconds = buf.get_u32();
        let fraction = buf.get_u32();
        let rtp_timestamp = buf.get_u32();
        let packet_count = buf.get_u32();
        let octet_count = buf.get_u32();
        let mut reports = Vec::with_capacity(report_count as usize);
        for _ in 0..report_count {
            reports.push(ReportBlock::parse(buf)?);
        }
        Ok(Self {
            ssrc,
            ntp_timestamp: NtpTimestamp { seconds, fraction },
            rtp_timestamp,
            packet_count,
            octet_count,
            reports,
        })
    }
}
