//! Builds RTP packets from raw payloads at a codec's pacing.

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use bytes::Bytes;
use rand::Rng;
use tokio::time::{interval, Interval};

use crate::codec::Codec;
use crate::error::Result;

use super::header::PacketHeader;
use super::packet::RtpPacket;
use super::sink::RtpWriter;

/// Wraps a codec and a lower [`RtpWriter`], owning the SSRC/sequence/timestamp
/// state for one outbound stream.
pub struct Packetizer<W: RtpWriter> {
    writer: W,
    codec: Codec,
    payload_type: u8,
    ssrc: u32,
    sequence: AtomicU16,
    timestamp: AtomicU32,
    wrote_first: AtomicBool,
    ticker: tokio::sync::Mutex<Interval>,
}

impl<W: RtpWriter> Packetizer<W> {
    /// `initial_timestamp` seeds the RTP clock; callers normally pick a random value.
    pub fn new(writer: W, codec: Codec, payload_type: u8, initial_timestamp: u32) -> Self {
        let ssrc = rand::thread_rng().gen();
        let sequence = rand::thread_rng().gen();
        let ticker = tokio::sync::Mutex::new(interval(codec.frame_duration()));
        Self {
            writer,
            codec,
            payload_type,
            ssrc,
            sequence: AtomicU16::new(sequence),
            timestamp: AtomicU32::new(initial_timestamp),
            wrote_first: AtomicBool::new(false),
            ticker,
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Build and send one packet carrying `payload`, then wait out the rest of the
    /// codec's frame duration before returning, pacing the caller to real time.
    pub async fn write(&self, payload: Bytes) -> Result<()> {
        let marker = !self.wrote_first.swap(true, Ordering::AcqRel);
        let seq = self.sequence.fetch_add(1, Ordering::AcqRel);
        let ts = self.timestamp.fetch_add(self.codec.samples_per_frame(), Ordering::AcqRel);

        let mut header = PacketHeader::new(self.payload_type, seq, ts, self.ssrc);
        header.marker = marker;
        self.writer.write_rtp(&RtpPacket::new(header, payload)).await?;

        self.ticker.lock().await.tick().await;
        Ok(())
    }

    /// Inject a packet on a different payload type (e.g. a DTMF event) sharing this
    /// stream's SSRC, unpaced and without advancing the shared timestamp — callers
    /// like the DTMF writer hold the timestamp fixed across a whole digit's packets
    /// and advance it explicitly via [`Self::advance_timestamp`] once done.
    pub async fn write_samples(&self, payload: Bytes, marker: bool, payload_type: u8) -> Result<()> {
        let seq = self.sequence.fetch_add(1, Ordering::AcqRel);
        let ts = self.timestamp.load(Ordering::Acquire);
        let mut header = PacketHeader::new(payload_type, seq, ts, self.ssrc);
        header.marker = marker;
        self.writer.write_rtp(&RtpPacket::new(header, payload)).await
    }

    /// Move the shared timestamp forward, e.g. after a DTMF event completes.
    pub fn advance_timestamp(&self, step: u32) {
        self.timestamp.fetch_add(step, Ordering::AcqRel);
    }

    pub fn current_timestamp(&self) -> u32 {
        self.timestamp.load(Ordering::Acquire)
    }

    pub fn codec(&self) -> Codec {
        self.codec.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct CollectingWriter(Arc<Mutex<Vec<RtpPacket>>>);

    #[async_trait::async_trait]
    impl RtpWriter for CollectingWriter {
        async fn write_rtp(&self, packet: &RtpPacket) -> Result<()> {
            self.0.lock().push(packet.clone());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_packet_carries_marker_and_timestamp_advances() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let p = Packetizer::new(CollectingWriter(sent.clone()), Codec::Pcmu, 0, 0);
        p.write(Bytes::from_static(&[0u8; 160])).await.unwrap();
        p.write(Bytes::from_static(&[0u8; 160])).await.unwrap();

        let packets = sent.lock();
        assert!(packets[0].header.marker);
        assert!(!packets[1].header.marker);
        assert_eq!(packets[1].header.timestamp - packets[0].header.timestamp, 160);
        assert_eq!(packets[0].header.ssrc, packets[1].header.ssrc);
    }
}
