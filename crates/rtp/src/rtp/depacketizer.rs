//! Reads RTP payloads off a lower reader, tracking sequence continuity and
//! exposing the most recent header for higher stages (DTMF, ED-137).

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Result;

use super::header::PacketHeader;
use super::sequence::SequenceTracker;
use super::sink::RtpReader;

struct State {
    tracker: SequenceTracker,
    ssrc: Option<u32>,
    last_header: Option<PacketHeader>,
    unread: Bytes,
}

/// Wraps a lower [`RtpReader`], exposing raw payload bytes one read at a time.
pub struct Depacketizer<R: RtpReader> {
    reader: R,
    state: Mutex<State>,
}

impl<R: RtpReader> Depacketizer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            state: Mutex::new(State {
                tracker: SequenceTracker::new(),
                ssrc: None,
                last_header: None,
                unread: Bytes::new(),
            }),
        }
    }

    /// The header belonging to the payload bytes most recently returned by [`Self::read`].
    pub fn last_header(&self) -> Option<PacketHeader> {
        self.state.lock().last_header.clone()
    }

    /// Read up to `max_len` bytes of payload, spilling into an internal "unread"
    /// tail when the caller's buffer is smaller than the frame; the tail is
    /// drained (up to `max_len` bytes at a time) before the next packet is read.
    pub async fn read(&self, max_len: usize) -> Result<Bytes> {
        {
            let mut state = self.state.lock();
            if !state.unread.is_empty() {
                let take = max_len.min(state.unread.len());
                return Ok(state.unread.split_to(take));
            }
        }

        let packet = self.reader.read_rtp().await?;
        let mut state = self.state.lock();

        match state.ssrc {
            Some(ssrc) if ssrc == packet.header.ssrc => {
                match state.tracker.update(packet.header.sequence_number) {
                    Ok(()) => {}
                    Err(err) => warn!(?err, seq = packet.header.sequence_number, "rtp sequence anomaly"),
                }
            }
            _ => {
                debug!(ssrc = packet.header.ssrc, "depacketizer seeding tracker for new ssrc");
                state.tracker.init(packet.header.sequence_number);
                state.ssrc = Some(packet.header.ssrc);
            }
        }

        state.last_header = Some(packet.header);

        let mut payload = packet.payload;
        let take = max_len.min(payload.len());
        let head = payload.split_to(take);
        state.unread = payload;
        Ok(head)
    }
}
