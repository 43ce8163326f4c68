//! RTCP Receiver Report (RR), RFC 3550 §6.4.2.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};

use super::report_block::{self, ReportBlock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverReport {
    /// SSRC of the report's originator (our own write SSRC, or a random one if we
    /// have never sent).
    pub ssrc: u32,
    pub reports: Vec<ReportBlock>,
}

impl ReceiverReport {
    pub fn size(&self) -> usize {
        4 + self.reports.len() * report_block::SIZE
    }

    pub fn write(&self, buf: &mut BytesMut) {
        buf.put_u32(self.ssrc);
        for report in &self.reports {
            report.write(buf);
        }
    }

    pub fn parse(buf: &mut impl Buf, report_count: u8) -> Result<Self> {
        if buf.remaining() < 4 {
            return Err(Error::ShortBuffer { required: 4, available: buf.remaining() });
        }
        let ssrc = buf.get_u32();
        let mut reports = Vec::with_capacity(report_count as usize);
        for _ in 0..report_count {
            reports.push(ReportBlock::parse(buf)?);
        }
        Ok(Self { ssrc, reports })
    }
}
