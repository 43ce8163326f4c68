//! Stereo call recording: spools each side's mono PCM to a temp file, filling
//! silence for gaps, then interleaves into a canonical 44-byte-header WAV file
//! on close.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::Result;

const WAV_HEADER_LEN: usize = 44;

fn build_wav_header(sample_rate: u32, channels: u16, bits_per_sample: u16, data_len: u32) -> [u8; WAV_HEADER_LEN] {
    let byte_rate = sample_rate * channels as u32 * bits_per_sample as u32 / 8;
    let block_align = channels * (bits_per_sample / 8);
    let riff_len = 36 + data_len;

    let mut h = [0u8; WAV_HEADER_LEN];
    h[0..4].copy_from_slice(b"RIFF");
    h[4..8].copy_from_slice(&riff_len.to_le_bytes());
    h[8..12].copy_from_slice(b"WAVE");
    h[12..16].copy_from_slice(b"fmt ");
    h[16..20].copy_from_slice(&16u32.to_le_bytes());
    h[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    h[22..24].copy_from_slice(&channels.to_le_bytes());
    h[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    h[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    h[32..34].copy_from_slice(&block_align.to_le_bytes());
    h[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());
    h[36..40].copy_from_slice(b"data");
    h[40..44].copy_from_slice(&data_len.to_le_bytes());
    h
}

/// Streams 16-bit PCM into a file that starts life with a placeholder 44-byte
/// header and gets that header rewritten with final sizes on [`Self::finalize`].
pub struct WavWriter {
    file: File,
    sample_rate: u32,
    channels: u16,
    data_len: u32,
}

impl WavWriter {
    pub async fn create(path: &Path, sample_rate: u32, channels: u16) -> Result<Self> {
        let mut file = File::create(path).await?;
        file.write_all(&build_wav_header(sample_rate, channels, 16, 0)).await?;
        Ok(Self { file, sample_rate, channels, data_len: 0 })
    }

    pub async fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        let mut buf = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            buf.extend_from_slice(&sample.to_le_bytes());
        }
        self.file.write_all(&buf).await?;
        self.data_len += buf.len() as u32;
        Ok(())
    }

    pub async fn finalize(mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0)).await?;
        self.file.write_all(&build_wav_header(self.sample_rate, self.channels, 16, self.data_len)).await?;
        self.file.flush().await?;
        Ok(())
    }
}

fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]])).collect()
}

/// Spools the reader side's and writer side's mono PCM to two temp files,
/// padding gaps with silence, and interleaves them into a stereo WAV on close.
pub struct StereoMonitor {
    reader_file: File,
    writer_file: File,
    reader_path: PathBuf,
    writer_path: PathBuf,
    frame_duration: Duration,
    last_reader_activity: Instant,
    last_writer_activity: Instant,
}

impl StereoMonitor {
    pub async fn new(frame_duration: Duration) -> Result<Self> {
        let id: u64 = rand::thread_rng().gen();
        let reader_path = std::env::temp_dir().join(format!("{id:016x}_monitor_reader.raw"));
        let writer_path = std::env::temp_dir().join(format!("{id:016x}_monitor_writer.raw"));

        let reader_file = File::create(&reader_path).await?;
        let writer_file = File::create(&writer_path).await?;
        let now = Instant::now();
        Ok(Self {
            reader_file,
            writer_file,
            reader_path,
            writer_path,
            frame_duration,
            last_reader_activity: now,
            last_writer_activity: now,
        })
    }

    /// Append one frame of PCM received from the remote party.
    pub async fn record_reader(&mut self, pcm: &[i16]) -> Result<()> {
        let gap_frames = Self::missed_frames(self.last_reader_activity, self.frame_duration);
        self.last_reader_activity = Instant::now();
        Self::append(&mut self.reader_file, pcm, gap_frames).await
    }

    /// Append one frame of PCM sent to the remote party.
    pub async fn record_writer(&mut self, pcm: &[i16]) -> Result<()> {
        let gap_frames = Self::missed_frames(self.last_writer_activity, self.frame_duration);
        self.last_writer_activity = Instant::now();
        Self::append(&mut self.writer_file, pcm, gap_frames).await
    }

    fn missed_frames(last_activity: Instant, frame_duration: Duration) -> usize {
        let elapsed = last_activity.elapsed();
        (elapsed.as_nanos() / frame_duration.as_nanos().max(1)).saturating_sub(1) as usize
    }

    async fn append(file: &mut File, pcm: &[i16], gap_frames: usize) -> Result<()> {
        for _ in 0..gap_frames {
            let silence = vec![0i16; pcm.len()];
            let bytes: Vec<u8> = silence.iter().flat_map(|s| s.to_le_bytes()).collect();
            file.write_all(&bytes).await?;
        }
        let bytes: Vec<u8> = pcm.iter().flat_map(|s| s.to_le_bytes()).collect();
        file.write_all(&bytes).await?;
        Ok(())
    }

    /// Rewind both temp files, interleave left (reader) / right (writer) 16-bit
    /// samples into `out_path` as stereo WAV, and delete the temp files either way.
    pub async fn close(mut self, out_path: &Path, sample_rate: u32) -> Result<()> {
        let result = self.interleave_to_wav(out_path, sample_rate).await;
        let _ = tokio::fs::remove_file(&self.reader_path).await;
        let _ = tokio::fs::remove_file(&self.writer_path).await;
        result
    }

    async fn interleave_to_wav(&mut self, out_path: &Path, sample_rate: u32) -> Result<()> {
        self.reader_file.seek(SeekFrom::Start(0)).await?;
        self.writer_file.seek(SeekFrom::Start(0)).await?;

        let mut reader_bytes = Vec::new();
        let mut writer_bytes = Vec::new();
        self.reader_file.read_to_end(&mut reader_bytes).await?;
        self.writer_file.read_to_end(&mut writer_bytes).await?;

        let left = bytes_to_samples(&reader_bytes);
        let right = bytes_to_samples(&writer_bytes);
        let len = left.len().max(right.len());

        let mut writer = WavWriter::create(out_path, sample_rate, 2).await?;
        let mut interleaved = Vec::with_capacity(len * 2);
        for i in 0..len {
            interleaved.push(left.get(i).copied().unwrap_or(0));
            interleaved.push(right.get(i).copied().unwrap_or(0));
        }
        writer.write_samples(&interleaved).await?;
        writer.finalize().await
    }
}
