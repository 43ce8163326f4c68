//! RFC 4733 telephone-event DTMF reader and writer.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use sipmedia_rtp::rtp::{Depacketizer, Packetizer, RtpReader, RtpWriter};
use tracing::warn;

use crate::codec::FramedRead;
use crate::error::{Error, Result};

/// Samples per 20ms frame at the telephone-event codec's fixed 8kHz clock rate.
const FRAME_SAMPLES: u16 = 160;

/// RFC 4733 recommends a default of -10dBm0 when the sender doesn't measure one.
const DEFAULT_VOLUME: u8 = 10;

/// Map a dialed digit to its RFC 4733 event code.
pub fn digit_to_event(digit: char) -> Result<u8> {
    match digit {
        '0'..='9' => Ok(digit as u8 - b'0'),
        '*' => Ok(10),
        '#' => Ok(11),
        'A'..='D' => Ok(digit as u8 - b'A' + 12),
        'a'..='d' => Ok(digit as u8 - b'a' + 12),
        _ => Err(Error::UnsupportedDigit(digit)),
    }
}

/// Map an RFC 4733 event code back to its digit, if it is one this engine knows.
pub fn event_to_digit(event: u8) -> Option<char> {
    match event {
        0..=9 => Some((b'0' + event) as char),
        10 => Some('*'),
        11 => Some('#'),
        12..=15 => Some((b'A' + (event - 12)) as char),
        _ => None,
    }
}

fn encode_event(event: u8, end: bool, duration: u16) -> Bytes {
    let mut buf = BytesMut::with_capacity(4);
    buf.put_u8(event);
    let mut b1 = DEFAULT_VOLUME;
    if end {
        b1 |= 0x80;
    }
    buf.put_u8(b1);
    buf.put_u16(duration);
    buf.freeze()
}

/// Sends one digit as 7 RFC 4733 packets: 4 starts with increasing duration, then
/// 3 end-of-event duplicates at the final duration, all sharing the packetizer's
/// timestamp for the whole event.
pub struct DtmfWriter<W: RtpWriter> {
    packetizer: Arc<Packetizer<W>>,
    payload_type: u8,
}

impl<W: RtpWriter> DtmfWriter<W> {
    pub fn new(packetizer: Arc<Packetizer<W>>, payload_type: u8) -> Self {
        Self { packetizer, payload_type }
    }

    pub async fn write_digit(&self, digit: char) -> Result<()> {
        let event = digit_to_event(digit)?;
        let mut ticker = tokio::time::interval(Duration::from_millis(20));
        ticker.tick().await; // consume the immediate first tick

        let mut duration = 0u16;
        for i in 0..4u16 {
            duration = FRAME_SAMPLES.saturating_mul(i + 1);
            let payload = encode_event(event, false, duration);
            self.packetizer.write_samples(payload, i == 0, self.payload_type).await?;
            ticker.tick().await;
        }
        for _ in 0..3u16 {
            let payload = encode_event(event, true, duration);
            self.packetizer.write_samples(payload, false, self.payload_type).await?;
            ticker.tick().await;
        }

        self.packetizer.advance_timestamp(duration as u32);
        Ok(())
    }
}

struct State {
    pending_event: Option<u8>,
    latched: VecDeque<char>,
}

/// Sits after the depacketizer, swallowing telephone-event packets and latching
/// completed digits for [`Self::read_dtmf`] while passing every other payload
/// straight through to the next stage.
pub struct DtmfReader<R: RtpReader> {
    depacketizer: Depacketizer<R>,
    telephone_event_pt: u8,
    state: Mutex<State>,
}

impl<R: RtpReader> DtmfReader<R> {
    pub fn new(depacketizer: Depacketizer<R>, telephone_event_pt: u8) -> Self {
        Self {
            depacketizer,
            telephone_event_pt,
            state: Mutex::new(State { pending_event: None, latched: VecDeque::new() }),
        }
    }

    /// Read the next non-DTMF payload, having processed and discarded any
    /// telephone-event packets encountered along the way.
    pub async fn read(&self, max_len: usize) -> Result<Bytes> {
        loop {
            let payload = self.depacketizer.read(max_len).await?;
            let header = self.depacketizer.last_header();
            let is_event = header.map(|h| h.payload_type == self.telephone_event_pt).unwrap_or(false);
            if is_event {
                self.ingest_event(&payload);
                continue;
            }
            return Ok(payload);
        }
    }

    /// Pop the oldest latched digit, if any have completed since the last call.
    pub fn read_dtmf(&self) -> Option<char> {
        self.state.lock().latched.pop_front()
    }

    fn ingest_event(&self, payload: &[u8]) {
        if payload.len() < 4 {
            warn!(len = payload.len(), "short telephone-event payload");
            return;
        }
        let mut cursor = payload;
        let event = cursor.get_u8();
        let flags = cursor.get_u8();
        let end = flags & 0x80 != 0;
        let duration = cursor.get_u16();

        let mut state = self.state.lock();
        if end {
            if state.pending_event == Some(event) && duration >= FRAME_SAMPLES.saturating_mul(3) {
                if let Some(c) = event_to_digit(event) {
                    state.latched.push_back(c);
                }
            }
            state.pending_event = None;
        } else {
            state.pending_event = Some(event);
        }
    }
}

#[async_trait]
impl<R: RtpReader> FramedRead for DtmfReader<R> {
    async fn read_frame(&self, max_len: usize) -> Result<Bytes> {
        self.read(max_len).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_round_trips_through_event_code() {
        for c in "0123456789*#ABCD".chars() {
            let event = digit_to_event(c).unwrap();
            assert_eq!(event_to_digit(event), Some(c));
        }
    }

    #[test]
    fn lowercase_letters_map_like_uppercase() {
        assert_eq!(digit_to_event('a').unwrap(), digit_to_event('A').unwrap());
    }

    #[test]
    fn unsupported_digit_is_rejected() {
        assert!(matches!(digit_to_event('x'), Err(Error::UnsupportedDigit('x'))));
    }

    #[test]
    fn encode_event_sets_end_bit_and_duration() {
        let payload = encode_event(5, true, 640);
        assert_eq!(payload[0], 5);
        assert_eq!(payload[1] & 0x80, 0x80);
        assert_eq!(u16::from_be_bytes([payload[2], payload[3]]), 640);
    }
}
