//! The RTP session: a media session plus statistics and an RTCP cadence
//!. This is the object audio pipelines read from and write to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tracing::{debug, warn};

use crate::error::Result;
use crate::rtcp::{ReceiverReport, ReportBlock, RtcpPacket, SenderReport};
use crate::rtp::{RtpPacket, RtpReader, RtpWriter};
use crate::sdp::Mode;
use crate::time::NtpTimestamp;

use super::media_session::MediaSession;
use super::stats::{ReadStats, WriteStats};

/// Wraps a [`MediaSession`] with read/write statistics and the RTCP cadence that
/// reports on them. `ReadRTP`/`WriteRTP` delegate to the underlying session while
/// folding each packet into the relevant stats; `MonitorBackground` spawns the
/// RTCP reader and writer loops layered over it.
pub struct RtpSession {
    media: Arc<MediaSession>,
    read_stats: Mutex<ReadStats>,
    write_stats: Mutex<WriteStats>,
    closed: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl RtpSession {
    pub fn new(media: Arc<MediaSession>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            media,
            read_stats: Mutex::new(ReadStats::new()),
            write_stats: Mutex::new(WriteStats::new()),
            closed: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn read_stats(&self) -> ReadStats {
        self.read_stats.lock().clone()
    }

    pub fn write_stats(&self) -> WriteStats {
        self.write_stats.lock().clone()
    }

    pub fn media(&self) -> &Arc<MediaSession> {
        &self.media
    }

    /// Read one RTP packet, folding it into read stats. Keep-alive datagrams
    /// (version zero or an empty payload) are consumed silently and never returned
    /// to the caller.
    pub async fn read_rtp(&self) -> Result<RtpPacket> {
        loop {
            let packet = self.media.read_rtp().await?;
            if packet.header.version == 0 || packet.payload.is_empty() {
                continue;
            }

            let now = Instant::now();
            let mut stats = self.read_stats.lock();
            if stats.ssrc != Some(packet.header.ssrc) {
                let sample_rate = match self
                    .media
                    .negotiated_codecs()
                    .iter()
                    .find(|entry| entry.payload_type == packet.header.payload_type)
                {
                    Some(entry) => entry.codec.clock_rate(),
                    None => {
                        warn!(
                            payload_type = packet.header.payload_type,
                            "dropping rtp packet with unnegotiated payload type"
                        );
                        continue;
                    }
                };
                stats.on_ssrc_change(
                    packet.header.ssrc,
                    packet.header.sequence_number,
                    packet.header.timestamp,
                    sample_rate,
                    now,
                );
            } else if packet.header.marker {
                stats.reanchor(packet.header.timestamp, now);
            } else {
                stats.update_jitter(packet.header.timestamp, now);
            }
            stats.record(packet.header.sequence_number, packet.payload.len());
            drop(stats);

            return Ok(packet);
        }
    }

    /// Write one RTP packet, folding it into write stats before handing it to the
    /// underlying session.
    pub async fn write_rtp(&self, packet: &RtpPacket) -> Result<()> {
        self.media.write_rtp(packet).await?;

        let sample_rate = self
            .media
            .negotiated_codecs()
            .iter()
            .find(|entry| entry.payload_type == packet.header.payload_type)
            .map(|entry| entry.codec.clock_rate())
            .unwrap_or(8000);

        self.write_stats.lock().record(
            packet.header.ssrc,
            sample_rate,
            packet.header.timestamp,
            packet.payload.len(),
            Instant::now(),
        );
        Ok(())
    }

    /// Run the RTCP writer loop (emit on cadence) and reader loop (ingest) inline,
    /// until `close` is called. Exposed separately from [`Self::monitor_background`]
    /// for callers that want to drive the loops on their own task.
    pub async fn monitor(self: &Arc<Self>) {
        let writer = self.clone().rtcp_writer_loop();
        let reader = self.clone().rtcp_reader_loop();
        tokio::join!(writer, reader);
    }

    /// Spawn the RTCP writer and reader loops as background tasks: two
    /// `tokio::spawn`ed tasks per session while monitoring.
    pub fn monitor_background(self: &Arc<Self>) -> (JoinHandle<()>, JoinHandle<()>) {
        let writer = tokio::spawn(self.clone().rtcp_writer_loop());
        let reader = tokio::spawn(self.clone().rtcp_reader_loop());
        (writer, reader)
    }

    async fn rtcp_writer_loop(self: Arc<Self>) {
        let mut ticker = interval(self.media.rtcp_interval());
        ticker.tick().await; // first tick fires immediately; skip it, cadence starts after one interval
        let mut shutdown = self.shutdown_rx.clone();
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.emit_rtcp().await {
                        if err.is_closed() || err.is_timeout() {
                            debug!(%err, "rtcp writer loop exiting");
                        } else {
                            warn!(%err, "failed to emit rtcp report");
                        }
                    }
                }
                _ = shutdown.changed() => return,
            }
        }
    }

    async fn rtcp_reader_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown_rx.clone();
        loop {
            tokio::select! {
                result = self.media.read_rtcp_raw() => {
                    match result {
                        Ok(datagram) => self.ingest_rtcp(datagram).await,
                        Err(err) if err.is_closed() || err.is_timeout() => {
                            debug!(%err, "rtcp reader loop exiting");
                            return;
                        }
                        Err(err) => warn!(%err, "rtcp read failed"),
                    }
                }
                _ = shutdown.changed() => return,
            }
        }
    }

    async fn emit_rtcp(&self) -> Result<()> {
        let now = Instant::now();
        let report = self.build_report_block(now);

        let (ssrc, rtcp_packet) = {
            let write_stats = self.write_stats.lock();
            let ssrc = write_stats.ssrc.unwrap_or(0);
            let recv_only = self.media.mode() == Mode::RecvOnly;
            if recv_only && report.is_some() {
                (ssrc, RtcpPacket::ReceiverReport(ReceiverReport { ssrc, reports: report.into_iter().collect() }))
            } else {
                let sr = SenderReport {
                    ssrc,
                    ntp_timestamp: NtpTimestamp::now(),
                    rtp_timestamp: write_stats.projected_rtp_time(now),
                    packet_count: write_stats.total_packets.min(u32::MAX as u64) as u32,
                    octet_count: write_stats.total_bytes.min(u32::MAX as u64) as u32,
                    reports: report.into_iter().collect(),
                };
                (ssrc, RtcpPacket::SenderReport(sr))
            }
        };

        let mut buf = bytes::BytesMut::new();
        rtcp_packet.write(&mut buf);
        self.media.write_rtcp_raw(ssrc, &buf).await?;

        self.read_stats.lock().reset_interval();
        Ok(())
    }

    /// Build the single reception report block this session reports on, if a read
    /// SSRC has been observed.
    fn build_report_block(&self, now: Instant) -> Option<ReportBlock> {
        let mut stats = self.read_stats.lock();
        let ssrc = stats.ssrc?;

        let interval_expected = match (stats.interval_first_extended_seq, stats.interval_last_extended_seq) {
            (Some(first), Some(last)) => last.saturating_sub(first) + 1,
            _ => 0,
        };
        let fraction_lost = if interval_expected == 0 {
            0
        } else {
            let lost = interval_expected.saturating_sub(stats.interval_packets);
            ((lost as f64 / interval_expected as f64) * 256.0).round().clamp(0.0, 255.0) as u8
        };

        let cumulative_expected = stats.tracker.extended_seq().saturating_sub(stats.cumulative_expected_base) + 1;
        let cumulative_lost = cumulative_expected.saturating_sub(stats.cumulative_received).min(u32::MAX as u64) as u32;

        let last_sr = stats.last_sr_ntp.map(|ntp| ntp.middle_bits()).unwrap_or(0);
        let delay_since_last_sr = stats
            .last_sr_received_at
            .map(|t| NtpTimestamp::duration_to_dlsr(now.saturating_duration_since(t)))
            .unwrap_or(0);

        Some(ReportBlock {
            ssrc,
            fraction_lost,
            cumulative_lost,
            extended_highest_seq: stats.tracker.extended_seq() as u32,
            jitter: stats.jitter_u32(),
            last_sr,
            delay_since_last_sr,
        })
    }

    async fn ingest_rtcp(&self, datagram: Vec<u8>) {
        let packets = match RtcpPacket::parse_compound(Bytes::from(datagram)) {
            Ok(packets) => packets,
            Err(err) => {
                warn!(%err, "dropping unparseable rtcp datagram");
                return;
            }
        };

        let now = Instant::now();
        let our_write_ssrc = self.write_stats.lock().ssrc;

        for packet in packets {
            match packet {
                RtcpPacket::SenderReport(sr) => {
                    let mut stats = self.read_stats.lock();
                    if stats.ssrc.is_none() {
                        stats.ssrc = Some(sr.ssrc);
                    }
                    stats.last_sr_ntp = Some(sr.ntp_timestamp);
                    stats.last_sr_received_at = Some(now);
                }
                RtcpPacket::ReceiverReport(rr) => {
                    for block in rr.reports {
                        if Some(block.ssrc) != our_write_ssrc || block.last_sr == 0 {
                            continue;
                        }
                        let now_mid = NtpTimestamp::now().middle_bits();
                        let rtt_mid = now_mid.wrapping_sub(block.last_sr).wrapping_sub(block.delay_since_last_sr);
                        let rtt_secs = NtpTimestamp::delay_to_seconds(rtt_mid).max(0.0);
                        let skewed = now_mid.wrapping_sub(block.delay_since_last_sr) < block.last_sr;

                        let mut stats = self.read_stats.lock();
                        stats.rtt = Some(std::time::Duration::from_secs_f64(rtt_secs));
                        stats.skewed = skewed;
                    }
                }
                RtcpPacket::SourceDescription(_) | RtcpPacket::Goodbye(_) => {}
            }
        }
    }

    /// Idempotent shutdown: latch closed, signal both RTCP loops, and close the
    /// underlying media session.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.shutdown_tx.send(true);
        self.media.close();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, CodecEntry};
    use crate::config::{MediaConfig, PortRange};
    use crate::rtp::PacketHeader;
    use std::net::IpAddr;

    fn pcmu_entry() -> CodecEntry {
        CodecEntry::well_known(Codec::Pcmu).unwrap()
    }

    fn config_with_range(start: u16, end: u16) -> MediaConfig {
        let mut config = MediaConfig::default();
        config.local_ip = IpAddr::from([127, 0, 0, 1]);
        config.port_range = Some(PortRange::new(start, end));
        config
    }

    async fn connected_pair(start: u16, end: u16) -> (Arc<MediaSession>, Arc<MediaSession>) {
        let a = MediaSession::new(config_with_range(start, end), vec![pcmu_entry()], 0).await.unwrap();
        let b = MediaSession::new(config_with_range(start, end), vec![pcmu_entry()], 0).await.unwrap();
        let offer = a.local_sdp().await.unwrap();
        b.remote_sdp(&offer).await.unwrap();
        let answer = b.local_sdp().await.unwrap();
        a.remote_sdp(&answer).await.unwrap();
        (Arc::new(a), Arc::new(b))
    }

    #[tokio::test]
    async fn write_rtp_updates_write_stats() {
        let (a, _b) = connected_pair(41500, 41520).await;
        let session = RtpSession::new(a);

        let header = PacketHeader::new(0, 1, 160, 0xAAAA);
        let packet = RtpPacket::new(header, Bytes::from_static(b"hello"));
        session.write_rtp(&packet).await.unwrap();

        let stats = session.write_stats();
        assert_eq!(stats.ssrc, Some(0xAAAA));
        assert_eq!(stats.total_packets, 1);
        assert_eq!(stats.total_bytes, 5);
    }

    #[tokio::test]
    async fn read_rtp_resets_stats_on_ssrc_change_and_tracks_sequence() {
        let (a, b) = connected_pair(41530, 41550).await;
        let reader = RtpSession::new(b);

        for seq in 1..=3u16 {
            let header = PacketHeader::new(0, seq, 160u32.wrapping_mul(seq as u32), 0xBEEF);
            let packet = RtpPacket::new(header, Bytes::from_static(b"xx"));
            a.write_rtp(&packet).await.unwrap();
            reader.read_rtp().await.unwrap();
        }

        let stats = reader.read_stats();
        assert_eq!(stats.ssrc, Some(0xBEEF));
        assert_eq!(stats.tracker.current(), 3);
        assert_eq!(stats.total_packets, 3);
    }

    #[tokio::test]
    async fn read_rtp_skips_keepalive_datagrams() {
        let (a, b) = connected_pair(41560, 41580).await;
        let reader = RtpSession::new(b);

        // A zero-version header never carries a meaningful payload; exercise the
        // empty-payload branch of the keep-alive skip directly.
        let header = PacketHeader::new(0, 1, 160, 0xCCCC);
        let keepalive = RtpPacket::new(header, Bytes::new());
        a.write_rtp(&keepalive).await.unwrap();

        let real = RtpPacket::new(PacketHeader::new(0, 2, 320, 0xCCCC), Bytes::from_static(b"hi"));
        a.write_rtp(&real).await.unwrap();

        let received = reader.read_rtp().await.unwrap();
        assert_eq!(received.payload, Bytes::from_static(b"hi"));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (a, _b) = connected_pair(41590, 41610).await;
        let session = Arc::new(RtpSession::new(a));
        session.close();
        session.close();
        assert!(session.is_closed());
    }
}
