//! The reception report block shared by RTCP SR and RR (RFC 3550 §6.4.1/.2).

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};

/// Wire size of one report block, in bytes.
pub const SIZE: usize = 24;

/// One reception report block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportBlock {
    /// SSRC of the source being reported on.
    pub ssrc: u32,
    /// Fraction of packets lost since the previous report, scaled to 0..255.
    pub fraction_lost: u8,
    /// Cumulative packets lost since the start of reception, saturated to 2^32-1.
    pub cumulative_lost: u32,
    /// Extended highest sequence number received (cycles << 16 | seq).
    pub extended_highest_seq: u32,
    /// Interarrival jitter estimate, in RTP clock units.
    pub jitter: u32,
    /// Middle 32 bits of the last SR NTP timestamp received from this source (0 if none).
    pub last_sr: u32,
    /// Delay since the last SR, in 1/65536s units (0 if no SR received yet).
    pub delay_since_last_sr: u32,
}

impl ReportBlock {
    pub fn write(&self, buf: &mut impl BufMut) {
        buf.put_u32(self.ssrc);
        buf.put_u8(self.fraction_lost);
        buf.put_uint(self.cumulative_lost as u64, 3);
        buf.put_u32(self.extended_highest_seq);
        buf.put_u32(self.jitter);
        buf.put_u32(self.last_sr);
        buf.put_u32(self.delay_since_last_sr);
    }

    pub fn parse(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < SIZE {
            return Err(Error::ShortBuffer { required: SIZE, available: buf.remaining() });
        }
        let ssrc = buf.get_u32();
        let fraction_lost = buf.get_u8();
        let cumulative_lost = buf.get_uint(3) as u32;
        let extended_highest_seq = buf.get_u32();
        let jitter = buf.get_u32();
        let last_sr = buf.get_u32();
        let delay_since_last_sr = buf.get_u32();
        Ok(Self {
            ssrc,
            fraction_lost,
            cumulative_lost,
            extended_highest_seq,
            jitter,
            last_sr,
            delay_since_last_sr,
        })
    }
}
