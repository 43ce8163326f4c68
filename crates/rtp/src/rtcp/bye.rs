//! RTCP Goodbye (BYE), RFC 3550 §6.6.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bye {
    pub sources: Vec<u32>,
    pub reason: Option<String>,
}

impl Bye {
    pub fn size(&self) -> usize {
        let raw = 4 * self.sources.len() + self.reason.as_ref().map_or(0, |r| 1 + r.len());
        raw + (4 - raw % 4) % 4
    }

    pub fn write(&self, buf: &mut BytesMut) {
        let mut written = 0;
        for ssrc in &self.sources {
            buf.put_u32(*ssrc);
            written += 4;
        }
        if let Some(reason) = &self.reason {
            buf.put_u8(reason.len() as u8);
            buf.put_slice(reason.as_bytes());
            written += 1 + reason.len();
        }
        let pad = (4 - written % 4) % 4;
        for _ in 0..pad {
            buf.put_u8(0);
        }
    }

    pub fn parse(buf: &mut impl Buf, source_count: u8, body_len: usize) -> Result<Self> {
        let need = 4 * source_count as usize;
        if buf.remaining() < need {
            return Err(Error::ShortBuffer { required: need, available: buf.remaining() });
        }
        let mut sources = Vec::with_capacity(source_count as usize);
        for _ in 0..source_count {
            sources.push(buf.get_u32());
        }
        let reason = if body_len > need && buf.remaining() > 0 {
            let len = buf.get_u8() as usize;
            if buf.remaining() < len {
                return Err(Error::MalformedPacket("truncated bye reason".into()));
            }
            let mut bytes = vec![0u8; len];
            buf.copy_to_slice(&mut bytes);
            Some(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            None
        };
        Ok(Self { sources, reason })
    }
}
