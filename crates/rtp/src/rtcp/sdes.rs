//! RTCP Source Description (SDES), RFC 3550 §6.5. Only the CNAME item is emitted;
//! other item types are parsed but ignored.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};

const SDES_CNAME: u8 = 1;
const SDES_END: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdesChunk {
    pub ssrc: u32,
    pub cname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sdes {
    pub chunks: Vec<SdesChunk>,
}

impl Sdes {
    pub fn size(&self) -> usize {
        self.chunks.iter().map(chunk_size).sum()
    }

    pub fn write(&self, buf: &mut BytesMut) {
        for chunk in &self.chunks {
            buf.put_u32(chunk.ssrc);
            buf.put_u8(SDES_CNAME);
            buf.put_u8(chunk.cname.len() as u8);
            buf.put_slice(chunk.cname.as_bytes());
            buf.put_u8(SDES_END);
            pad_to_word(buf, 4 + 2 + chunk.cname.len() + 1);
        }
    }

    pub fn parse(buf: &mut impl Buf, chunk_count: u8) -> Result<Self> {
        let mut chunks = Vec::with_capacity(chunk_count as usize);
        for _ in 0..chunk_count {
            if buf.remaining() < 4 {
                return Err(Error::ShortBuffer { required: 4, available: buf.remaining() });
            }
            let ssrc = buf.get_u32();
            let mut cname = String::new();
            let mut consumed = 4usize;
            loop {
                if buf.remaining() < 1 {
                    return Err(Error::MalformedPacket("truncated sdes chunk".into()));
                }
                let item_type = buf.get_u8();
                consumed += 1;
                if item_type == SDES_END {
                    break;
                }
                if buf.remaining() < 1 {
                    return Err(Error::MalformedPacket("truncated sdes item".into()));
                }
                let len = buf.get_u8() as usize;
                consumed += 1;
                if buf.remaining() < len {
                    return Err(Error::MalformedPacket("truncated sdes item body".into()));
                }
                let mut bytes = vec![0u8; len];
                buf.copy_to_slice(&mut bytes);
                consumed += len;
                if item_type == SDES_CNAME {
                    cname = String::from_utf8_lossy(&bytes).into_owned();
                }
            }
            let pad = (4 - consumed % 4) % 4;
            if buf.remaining() < pad {
                return Err(Error::MalformedPacket("truncated sdes padding".into()));
            }
            buf.advance(pad);
            chunks.push(SdesChunk { ssrc, cname });
        }
        Ok(Self { chunks })
    }
}

fn chunk_size(chunk: &SdesChunk) -> usize {
    let raw = 4 + 2 + chunk.cname.len() + 1;
    raw + (4 - raw % 4) % 4
}

fn pad_to_word(buf: &mut BytesMut, written: usize) {
    let pad = (4 - written % 4) % 4;
    for _ in 0..pad {
        buf.put_u8(0);
    }
}
