//! Error types for the audio pipeline stages.

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by codec, DTMF/ED-137, recording, and bridging stages.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The stage sits directly on RTP I/O (DTMF, ED-137) and the failure came from there.
    #[error(transparent)]
    Rtp(#[from] sipmedia_rtp::Error),

    /// Underlying socket I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller's buffer was too small to hold a decoded frame.
    #[error("short buffer: need {required} bytes, have {available}")]
    ShortBuffer {
        /// Bytes required.
        required: usize,
        /// Bytes available in the caller's buffer.
        available: usize,
    },

    /// A codec encode/decode call failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// A digit could not be mapped to an RFC 4733 telephone-event code.
    #[error("unsupported dtmf digit: {0:?}")]
    UnsupportedDigit(char),

    /// End of stream, e.g. the playback control stage was stopped, or the
    /// underlying session closed.
    #[error("end of stream")]
    Eof,

    /// The bridge already holds its configured number of participants.
    #[error("bridge is full")]
    BridgeFull,

    /// Codec mismatch when adding a session to a bridge that disallows transcoding.
    #[error("bridge session codec mismatch: {0}")]
    BridgeCodecMismatch(String),
}

impl Error {
    /// True when a reader should treat this as a graceful end-of-stream.
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::Eof) || matches!(self, Error::Rtp(e) if e.is_closed())
    }
}

impl From<opus::Error> for Error {
    fn from(e: opus::Error) -> Self {
        Error::Codec(e.to_string())
    }
}
