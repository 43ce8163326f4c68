//! Audio pipeline stages for a SIP media engine: PCM codecs, DTMF and ED-137
//! header-extension signalling, playback control, stereo recording, ringtone/beep
//! synthesis, and a two-party bridge, all chained on top of `sipmedia_rtp`'s
//! packetizer/depacketizer.

pub mod bridge;
pub mod codec;
pub mod control;
pub mod dtmf;
pub mod ed137;
pub mod error;
pub mod recorder;
pub mod tone;

pub use error::{Error, Result};
