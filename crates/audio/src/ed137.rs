//! ED-137 PTT header extension (profile 0x0067), carried as a 32-bit word at
//! extension index 0.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use sipmedia_rtp::error::Result as RtpResult;
use sipmedia_rtp::rtp::{RtpPacket, RtpReader, RtpWriter};

const SQU_BIT: u32 = 1 << 3;
const SCT_BIT: u32 = 1 << 8;
const X_BIT: u32 = 1 << 9;
const VF_BIT: u32 = 1 << 31;

/// The fields packed into one ED-137 extension word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PttState {
    /// Bits 0..2.
    pub ptt_type: u8,
    /// Bit 3: squelch.
    pub squ: bool,
    /// Bits 4..7.
    pub ptt_id: u8,
    /// Bit 8: simultaneous call transmission.
    pub sct: bool,
    /// Bit 9: "X" reserved/extension flag.
    pub x: bool,
    /// Bit 31: voice flag, i.e. PTT is actively keyed.
    pub vf: bool,
}

impl PttState {
    pub fn to_word(self) -> u32 {
        let mut w = (self.ptt_type as u32) & 0x7;
        if self.squ {
            w |= SQU_BIT;
        }
        w |= ((self.ptt_id as u32) & 0xF) << 4;
        if self.sct {
            w |= SCT_BIT;
        }
        if self.x {
            w |= X_BIT;
        }
        if self.vf {
            w |= VF_BIT;
        }
        w
    }

    pub fn from_word(w: u32) -> Self {
        Self {
            ptt_type: (w & 0x7) as u8,
            squ: w & SQU_BIT != 0,
            ptt_id: ((w >> 4) & 0xF) as u8,
            sct: w & SCT_BIT != 0,
            x: w & X_BIT != 0,
            vf: w & VF_BIT != 0,
        }
    }
}

/// Wraps a packet writer, stamping every outbound packet with the current PTT
/// word and blanking the payload to an empty keep-alive while PTT is off.
pub struct Ed137Writer<W: RtpWriter> {
    inner: W,
    word: AtomicU32,
}

impl<W: RtpWriter> Ed137Writer<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, word: AtomicU32::new(0) }
    }

    /// Atomically update the advertised PTT state.
    pub fn set_ptt(&self, state: PttState) {
        self.word.store(state.to_word(), Ordering::Release);
    }

    pub fn ptt(&self) -> PttState {
        PttState::from_word(self.word.load(Ordering::Acquire))
    }
}

#[async_trait]
impl<W: RtpWriter> RtpWriter for Ed137Writer<W> {
    async fn write_rtp(&self, packet: &RtpPacket) -> RtpResult<()> {
        let state = self.ptt();
        let mut header = packet.header.clone();
        header.ed137 = Some(state.to_word());
        let payload = if state.vf { packet.payload.clone() } else { Bytes::new() };
        self.inner.write_rtp(&RtpPacket::new(header, payload)).await
    }
}

/// Wraps a packet reader, forwarding every read while firing `on_change` whenever
/// the parsed ED-137 word differs from the previous packet's.
pub struct Ed137Reader<R: RtpReader> {
    inner: R,
    last_word: AtomicU32,
    on_change: Option<Arc<dyn Fn(PttState) + Send + Sync>>,
}

impl<R: RtpReader> Ed137Reader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, last_word: AtomicU32::new(0), on_change: None }
    }

    pub fn with_callback(inner: R, on_change: Arc<dyn Fn(PttState) + Send + Sync>) -> Self {
        Self { inner, last_word: AtomicU32::new(0), on_change: Some(on_change) }
    }
}

#[async_trait]
impl<R: RtpReader> RtpReader for Ed137Reader<R> {
    async fn read_rtp(&self) -> RtpResult<RtpPacket> {
        let packet = self.inner.read_rtp().await?;
        if let Some(word) = packet.header.ed137 {
            let previous = self.last_word.swap(word, Ordering::AcqRel);
            if previous != word {
                if let Some(cb) = &self.on_change {
                    cb(PttState::from_word(word));
                }
            }
        }
        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_round_trips_every_field() {
        let state = PttState { ptt_type: 5, squ: true, ptt_id: 9, sct: true, x: false, vf: true };
        assert_eq!(PttState::from_word(state.to_word()), state);
    }

    #[test]
    fn vf_off_means_keep_alive() {
        let off = PttState { vf: false, ..Default::default() };
        assert_eq!(off.to_word() & VF_BIT, 0);
    }
}
