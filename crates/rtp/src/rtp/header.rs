//! The RTP v2 fixed header plus the single header-extension profile this engine
//! understands: 0x0067 (ED-137 PTT), carried at extension index 0.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};

/// Size of the fixed RTP header with no CSRCs, in bytes.
pub const FIXED_HEADER_SIZE: usize = 12;

/// Profile identifier this engine recognizes for the one-byte/two-byte RTP header
/// extension (RFC 8285 generic extension, ED-137 PTT payload).
pub const ED137_EXTENSION_PROFILE: u16 = 0x0067;

/// Length, in 32-bit words, of the ED-137 extension payload (one word).
const ED137_EXTENSION_LEN_WORDS: u16 = 1;

/// The RTP v2 packet header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    /// Always 2 for this engine; packets with any other version are keep-alives we skip.
    pub version: u8,
    /// RTP padding bit. This engine never sends padding.
    pub padding: bool,
    /// Marker bit: first packet of a talkspurt, or DTMF/ED-137 signalling per stage.
    pub marker: bool,
    /// Payload type (0..127).
    pub payload_type: u8,
    /// 16-bit wire sequence number.
    pub sequence_number: u16,
    /// RTP media clock timestamp.
    pub timestamp: u32,
    /// Synchronization source identifier.
    pub ssrc: u32,
    /// ED-137 PTT extension word, if present at extension index 0.
    pub ed137: Option<u32>,
}

impl PacketHeader {
    /// A header with version 2 and everything else zeroed, suitable as a builder base.
    pub fn new(payload_type: u8, sequence_number: u16, timestamp: u32, ssrc: u32) -> Self {
        Self {
            version: 2,
            padding: false,
            marker: false,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            ed137: None,
        }
    }

    /// Marshalled size of this header in bytes, including the extension if present.
    pub fn size(&self) -> usize {
        FIXED_HEADER_SIZE + self.ed137.map_or(0, |_| 4)
    }

    /// Serialize the header into `buf`.
    pub fn marshal(&self, buf: &mut BytesMut) {
        let has_ext = self.ed137.is_some();
        let mut b0 = (self.version & 0x3) << 6;
        if self.padding {
            b0 |= 0x20;
        }
        if has_ext {
            b0 |= 0x10;
        }
        buf.put_u8(b0);

        let mut b1 = self.payload_type & 0x7f;
        if self.marker {
            b1 |= 0x80;
        }
        buf.put_u8(b1);

        buf.put_u16(self.sequence_number);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);

        if let Some(word) = self.ed137 {
            buf.put_u16(ED137_EXTENSION_PROFILE);
            buf.put_u16(ED137_EXTENSION_LEN_WORDS);
            buf.put_u32(word);
        }
    }

    /// Parse a header from the front of `buf`, advancing it past the header (and any
    /// extension) so the remainder is the payload.
    pub fn unmarshal(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < FIXED_HEADER_SIZE {
            return Err(Error::ShortBuffer {
                required: FIXED_HEADER_SIZE,
                available: buf.remaining(),
            });
        }

        let b0 = buf.get_u8();
        let version = (b0 >> 6) & 0x3;
        let padding = b0 & 0x20 != 0;
        let has_extension = b0 & 0x10 != 0;
        let csrc_count = (b0 & 0x0f) as usize;

        let b1 = buf.get_u8();
        let marker = b1 & 0x80 != 0;
        let payload_type = b1 & 0x7f;

        let sequence_number = buf.get_u16();
        let timestamp = buf.get_u32();
        let ssrc = buf.get_u32();

        let csrc_bytes = csrc_count * 4;
        if buf.remaining() < csrc_bytes {
            return Err(Error::MalformedPacket("truncated csrc list".into()));
        }
        buf.advance(csrc_bytes);

        let mut ed137 = None;
        if has_extension {
            if buf.remaining() < 4 {
                return Err(Error::MalformedPacket("truncated header extension".into()));
            }
            let profile = buf.get_u16();
            let len_words = buf.get_u16() as usize;
            let ext_bytes = len_words * 4;
            if buf.remaining() < ext_bytes {
                return Err(Error::MalformedPacket("truncated header extension body".into()));
            }
            if profile == ED137_EXTENSION_PROFILE && len_words == 1 {
                ed137 = Some(buf.get_u32());
            } else {
                buf.advance(ext_bytes);
            }
        }

        Ok(Self {
            version,
            padding,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            ed137,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plain_header() {
        let h = PacketHeader::new(8, 1234, 56789, 0xDEAD_BEEF);
        let mut buf = BytesMut::new();
        h.marshal(&mut buf);
        assert_eq!(buf.len(), FIXED_HEADER_SIZE);
        let mut cursor = &buf[..];
        let parsed = PacketHeader::unmarshal(&mut cursor).unwrap();
        assert_eq!(parsed, h);
    }

    #[test]
    fn round_trips_with_ed137_extension() {
        let mut h = PacketHeader::new(0, 1, 160, 1);
        h.ed137 = Some(0xABCD_1234);
        let mut buf = BytesMut::new();
        h.marshal(&mut buf);
        assert_eq!(buf.len(), FIXED_HEADER_SIZE + 4);
        let mut cursor = &buf[..];
        let parsed = PacketHeader::unmarshal(&mut cursor).unwrap();
        assert_eq!(parsed.ed137, Some(0xABCD_1234));
    }
}
