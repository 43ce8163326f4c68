//! PCM codec stages: decode a frame's worth of payload into samples, or encode
//! samples into a payload and hand it to the packetizer.

pub mod g711;
pub mod opus;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use sipmedia_rtp::rtp::{Depacketizer, Packetizer, RtpReader, RtpWriter};

use crate::error::{Error, Result};

/// Something that hands back one frame's worth of payload bytes at a time.
/// Implemented directly by the depacketizer, and by stages that filter what it
/// returns (the DTMF reader swallows telephone-event packets before they get here).
/// `max_len` is the caller's buffer size: a payload larger than it is split, with
/// the remainder handed back on the next call.
#[async_trait]
pub trait FramedRead: Send + Sync {
    async fn read_frame(&self, max_len: usize) -> Result<Bytes>;
}

#[async_trait]
impl<R: RtpReader> FramedRead for Depacketizer<R> {
    async fn read_frame(&self, max_len: usize) -> Result<Bytes> {
        Ok(self.read(max_len).await?)
    }
}

/// Something that accepts one frame's worth of decoded PCM samples at a time.
#[async_trait]
pub trait PcmWriter: Send + Sync {
    async fn write_pcm(&self, samples: &[i16]) -> Result<()>;
}

/// Stateless (or internally synchronized) encode/decode of one codec frame.
/// `decode` follows a short-buffer policy: callers must pass a
/// buffer sized to [`Self::max_frame_samples`] or get [`Error::ShortBuffer`].
pub trait FrameCodec: Send + Sync {
    /// Decoded samples per frame, interleaved for multi-channel codecs.
    fn max_frame_samples(&self) -> usize;
    /// Largest encoded payload one frame can produce on the wire; the buffer size
    /// a [`FramedRead::read_frame`] call needs to receive a whole frame unsplit.
    fn max_encoded_bytes(&self) -> usize;
    fn encode(&self, pcm: &[i16], out: &mut BytesMut) -> Result<()>;
    fn decode(&self, payload: &[u8], pcm: &mut [i16]) -> Result<usize>;
}

/// Decodes payloads read off a lower [`FramedRead`] stage into PCM.
pub struct CodecReader<F: FramedRead, C: FrameCodec> {
    source: F,
    codec: C,
}

impl<F: FramedRead, C: FrameCodec> CodecReader<F, C> {
    pub fn new(source: F, codec: C) -> Self {
        Self { source, codec }
    }

    /// Read and decode one frame. `pcm` must be at least [`FrameCodec::max_frame_samples`] long.
    pub async fn read(&self, pcm: &mut [i16]) -> Result<usize> {
        let needed = self.codec.max_frame_samples();
        if pcm.len() < needed {
            return Err(Error::ShortBuffer { required: needed, available: pcm.len() });
        }
        let payload = self.source.read_frame(self.codec.max_encoded_bytes()).await?;
        self.codec.decode(&payload, pcm)
    }
}

/// Encodes PCM and writes it out through a lower packetizer, at the codec's
/// own pacing. Holds the packetizer behind an `Arc` so a [`crate::dtmf::DtmfWriter`]
/// can share the same SSRC/timestamp state to inject events on the same stream.
pub struct CodecWriter<W: RtpWriter, C: FrameCodec> {
    packetizer: std::sync::Arc<Packetizer<W>>,
    codec: C,
}

impl<W: RtpWriter, C: FrameCodec> CodecWriter<W, C> {
    pub fn new(packetizer: std::sync::Arc<Packetizer<W>>, codec: C) -> Self {
        Self { packetizer, codec }
    }

    pub fn packetizer(&self) -> &std::sync::Arc<Packetizer<W>> {
        &self.packetizer
    }
}

#[async_trait]
impl<W: RtpWriter, C: FrameCodec> PcmWriter for CodecWriter<W, C> {
    async fn write_pcm(&self, samples: &[i16]) -> Result<()> {
        let mut buf = BytesMut::with_capacity(samples.len() * 2);
        self.codec.encode(samples, &mut buf)?;
        self.packetizer.write(buf.freeze()).await?;
        Ok(())
    }
}
