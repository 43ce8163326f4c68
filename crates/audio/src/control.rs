//! Playback control: mute and stop, applied to a reader, a writer, or both
//!.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::{FramedRead, PcmWriter};
use crate::error::{Error, Result};

/// Shared mute/stop flags a reader and/or writer stage can be wrapped with.
#[derive(Default)]
pub struct PlaybackControl {
    muted: AtomicBool,
    stopped: AtomicBool,
}

impl PlaybackControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn mute(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// Wraps a [`FramedRead`] stage: stopped surfaces [`Error::Eof`], muted zeros
/// the returned bytes without disturbing the underlying stream.
pub struct ControlledReader<F: FramedRead> {
    inner: F,
    control: Arc<PlaybackControl>,
}

impl<F: FramedRead> ControlledReader<F> {
    pub fn new(inner: F, control: Arc<PlaybackControl>) -> Self {
        Self { inner, control }
    }
}

#[async_trait]
impl<F: FramedRead> FramedRead for ControlledReader<F> {
    async fn read_frame(&self, max_len: usize) -> Result<Bytes> {
        if self.control.is_stopped() {
            return Err(Error::Eof);
        }
        let payload = self.inner.read_frame(max_len).await?;
        if self.control.is_muted() {
            Ok(Bytes::from(vec![0u8; payload.len()]))
        } else {
            Ok(payload)
        }
    }
}

/// Wraps a [`PcmWriter`] stage with the same mute/stop semantics.
pub struct ControlledWriter<P: PcmWriter> {
    inner: P,
    control: Arc<PlaybackControl>,
}

impl<P: PcmWriter> ControlledWriter<P> {
    pub fn new(inner: P, control: Arc<PlaybackControl>) -> Self {
        Self { inner, control }
    }
}

#[async_trait]
impl<P: PcmWriter> PcmWriter for ControlledWriter<P> {
    async fn write_pcm(&self, samples: &[i16]) -> Result<()> {
        if self.control.is_stopped() {
            return Err(Error::Eof);
        }
        if self.control.is_muted() {
            let silence = vec![0i16; samples.len()];
            self.inner.write_pcm(&silence).await
        } else {
            self.inner.write_pcm(samples).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CollectingWriter(parking_lot::Mutex<Vec<Vec<i16>>>);

    #[async_trait]
    impl PcmWriter for CollectingWriter {
        async fn write_pcm(&self, samples: &[i16]) -> Result<()> {
            self.0.lock().push(samples.to_vec());
            Ok(())
        }
    }

    #[tokio::test]
    async fn mute_writes_silence_not_original_samples() {
        let inner = CollectingWriter(parking_lot::Mutex::new(Vec::new()));
        let control = PlaybackControl::new();
        control.mute(true);
        let writer = ControlledWriter::new(inner, control);
        writer.write_pcm(&[1, 2, 3]).await.unwrap();
        assert_eq!(writer.inner.0.lock()[0], vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn stop_surfaces_eof() {
        let inner = CollectingWriter(parking_lot::Mutex::new(Vec::new()));
        let control = PlaybackControl::new();
        control.stop();
        let writer = ControlledWriter::new(inner, control);
        assert!(matches!(writer.write_pcm(&[1]).await, Err(Error::Eof)));
    }
}
