//! Opus, wrapping the `opus` crate's real libopus bindings: this engine needs
//! genuine interop with SIP peers, not a simulated codec.

use bytes::{BufMut, BytesMut};
use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::FrameCodec;

/// Largest Opus packet this engine will ever hand to the encoder's scratch buffer.
const MAX_ENCODED_BYTES: usize = 4000;

/// Opus at a fixed 20ms frame, matching every other codec this engine packetizes.
pub struct OpusCodec {
    channels: u8,
    frame_samples_per_channel: usize,
    encoder: Mutex<opus::Encoder>,
    decoder: Mutex<opus::Decoder>,
}

impl OpusCodec {
    pub fn new(sample_rate: u32, channels: u8) -> Result<Self> {
        let opus_channels = if channels >= 2 { opus::Channels::Stereo } else { opus::Channels::Mono };
        let encoder = opus::Encoder::new(sample_rate, opus_channels, opus::Application::Voip)?;
        let decoder = opus::Decoder::new(sample_rate, opus_channels)?;
        let frame_samples_per_channel = (sample_rate as usize * 20) / 1000;
        Ok(Self {
            channels: if channels >= 2 { 2 } else { 1 },
            frame_samples_per_channel,
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(decoder),
        })
    }
}

impl FrameCodec for OpusCodec {
    fn max_frame_samples(&self) -> usize {
        self.frame_samples_per_channel * self.channels as usize
    }

    fn max_encoded_bytes(&self) -> usize {
        MAX_ENCODED_BYTES
    }

    fn encode(&self, pcm: &[i16], out: &mut BytesMut) -> Result<()> {
        let expected = self.max_frame_samples();
        if pcm.len() != expected {
            return Err(Error::ShortBuffer { required: expected, available: pcm.len() });
        }

        let mut scratch = [0u8; MAX_ENCODED_BYTES];
        let n = self.encoder.lock().encode(pcm, &mut scratch)?;
        out.put_slice(&scratch[..n]);
        Ok(())
    }

    fn decode(&self, payload: &[u8], pcm: &mut [i16]) -> Result<usize> {
        let needed = self.max_frame_samples();
        if pcm.len() < needed {
            return Err(Error::ShortBuffer { required: needed, available: pcm.len() });
        }
        let samples_per_channel = self.decoder.lock().decode(payload, pcm, false)?;
        Ok(samples_per_channel * self.channels as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_frame_samples_matches_20ms_stereo_at_48khz() {
        let codec = OpusCodec::new(48000, 2).unwrap();
        assert_eq!(codec.max_frame_samples(), 960 * 2);
    }

    #[test]
    fn encode_rejects_wrong_length_input() {
        let codec = OpusCodec::new(48000, 1).unwrap();
        let mut out = BytesMut::new();
        let short = vec![0i16; 10];
        assert!(matches!(codec.encode(&short, &mut out), Err(Error::ShortBuffer { .. })));
    }
}
