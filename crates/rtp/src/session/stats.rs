//! Read/write statistics maintained per RTP session, including the RFC 3550
//! appendix A.8 jitter estimator.

use tokio::time::Instant;

use crate::rtp::SequenceTracker;
use crate::time::NtpTimestamp;

/// Accumulated state for the inbound direction of one session.
#[derive(Debug, Clone, Default)]
pub struct ReadStats {
    pub ssrc: Option<u32>,
    pub sample_rate: u32,
    pub tracker: SequenceTracker,
    pub first_sequence: u16,

    pub interval_packets: u64,
    pub interval_bytes: u64,
    pub total_packets: u64,
    pub total_bytes: u64,
    /// Expected-vs-received bookkeeping for the current RTCP interval's "fraction
    /// lost": the extended sequence seen at the start of the interval.
    pub interval_first_extended_seq: Option<u64>,
    pub interval_last_extended_seq: Option<u64>,
    pub cumulative_expected_base: u64,
    pub cumulative_received: u64,

    /// Jitter estimate, RFC 3550 appendix A.8, kept as a float and truncated to an
    /// integer only when read out into a reception report.
    pub jitter: f64,
    last_transit: i64,
    first_ts: u32,
    reference_time: Option<Instant>,

    pub last_sr_ntp: Option<NtpTimestamp>,
    pub last_sr_received_at: Option<Instant>,
    pub rtt: Option<std::time::Duration>,
    pub skewed: bool,
}

impl ReadStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)initialize for a newly observed SSRC.
    pub fn on_ssrc_change(&mut self, ssrc: u32, first_seq: u16, timestamp: u32, sample_rate: u32, now: Instant) {
        self.ssrc = Some(ssrc);
        self.sample_rate = sample_rate;
        self.first_sequence = first_seq;
        self.tracker = SequenceTracker::new();
        self.tracker.init(first_seq);

        self.interval_packets = 0;
        self.interval_bytes = 0;
        self.total_packets = 0;
        self.total_bytes = 0;
        self.interval_first_extended_seq = Some(self.tracker.extended_seq());
        self.interval_last_extended_seq = Some(self.tracker.extended_seq());
        self.cumulative_expected_base = self.tracker.extended_seq();
        self.cumulative_received = 0;

        self.reanchor(timestamp, now);
    }

    /// Marker-bit re-anchor: a new talkspurt starts, so jitter references reset
    /// without folding a delta in.
    pub fn reanchor(&mut self, timestamp: u32, now: Instant) {
        self.first_ts = timestamp;
        self.reference_time = Some(now);
        self.last_transit = 0;
        self.jitter = 0.0;
    }

    /// Fold one non-marker packet's arrival into the jitter estimate.
    pub fn update_jitter(&mut self, timestamp: u32, now: Instant) {
        let Some(reference_time) = self.reference_time else {
            self.reanchor(timestamp, now);
            return;
        };
        let elapsed = now.saturating_duration_since(reference_time).as_secs_f64();
        let arrival_ts = self.first_ts as i64 + (elapsed * self.sample_rate as f64) as i64;
        let transit = arrival_ts - timestamp as i64;
        let d = (transit - self.last_transit).unsigned_abs() as f64;
        self.jitter += (d - self.jitter) / 16.0;
        self.last_transit = transit;
    }

    /// Record a non-anomalous sequence update and accept accounting for one packet.
    pub fn record(&mut self, seq: u16, payload_len: usize) {
        let _ = self.tracker.update(seq);
        self.interval_last_extended_seq = Some(self.tracker.extended_seq());
        self.interval_packets += 1;
        self.interval_bytes += payload_len as u64;
        self.total_packets += 1;
        self.total_bytes += payload_len as u64;
        self.cumulative_received += 1;
    }

    /// The integer jitter value a reception report should carry.
    pub fn jitter_u32(&self) -> u32 {
        self.jitter as u32
    }

    /// Reset the per-interval counters an RTCP emission consumes.
    pub fn reset_interval(&mut self) {
        self.interval_packets = 0;
        self.interval_bytes = 0;
        self.interval_first_extended_seq = self.interval_last_extended_seq;
    }
}

/// Accumulated state for the outbound direction of one session.
#[derive(Debug, Clone)]
pub struct WriteStats {
    pub ssrc: Option<u32>,
    pub sample_rate: u32,
    pub total_packets: u64,
    pub total_bytes: u64,
    pub last_packet_time: Option<Instant>,
    pub last_timestamp: u32,
}

impl Default for WriteStats {
    fn default() -> Self {
        Self { ssrc: None, sample_rate: 0, total_packets: 0, total_bytes: 0, last_packet_time: None, last_timestamp: 0 }
    }
}

impl WriteStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, ssrc: u32, sample_rate: u32, timestamp: u32, payload_len: usize, now: Instant) {
        if self.ssrc != Some(ssrc) {
            self.ssrc = Some(ssrc);
            self.sample_rate = sample_rate;
            self.total_packets = 0;
            self.total_bytes = 0;
        }
        self.total_packets += 1;
        self.total_bytes += payload_len as u64;
        self.last_packet_time = Some(now);
        self.last_timestamp = timestamp;
    }

    /// `RTPTime` for a sender report: last written timestamp advanced by how much
    /// media-clock time has elapsed since that packet was written.
    pub fn projected_rtp_time(&self, now: Instant) -> u32 {
        match self.last_packet_time {
            Some(last) if self.sample_rate > 0 => {
                let elapsed = now.saturating_duration_since(last).as_secs_f64();
                let step = (elapsed * self.sample_rate as f64).round() as i64;
                self.last_timestamp.wrapping_add(step as u32)
            }
            _ => self.last_timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, Duration};

    #[tokio::test(start_paused = true)]
    async fn jitter_matches_the_pinned_worked_example() {
        let mut stats = ReadStats::new();
        let start = Instant::now();

        // k=0: ts=0 arrives at t=20ms (establishes the reference).
        advance(Duration::from_millis(20)).await;
        stats.on_ssrc_change(1, 0, 0, 8000, Instant::now());
        assert_eq!(stats.jitter_u32(), 0);

        // k=1: ts=160 arrives at t=40ms.
        advance(Duration::from_millis(20)).await;
        stats.update_jitter(160, Instant::now());
        assert_eq!(stats.jitter_u32(), 0);

        // k=2: ts=320 arrives at t=75ms.
        advance(Duration::from_millis(35)).await;
        stats.update_jitter(320, Instant::now());
        assert_eq!(stats.jitter_u32(), 7);

        // k=3: ts=480 arrives at t=80ms.
        advance(Duration::from_millis(5)).await;
        stats.update_jitter(480, Instant::now());
        assert_eq!(stats.jitter_u32(), 14);

        // k=4: ts=640 arrives at t=100ms.
        advance(Duration::from_millis(20)).await;
        stats.update_jitter(640, Instant::now());
        assert_eq!(stats.jitter_u32(), 13);

        let _ = start;
    }
}
