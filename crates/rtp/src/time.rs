//! NTP timestamp conversion.
//!
//! RTCP sender reports and the DLSR/LSR fields of reception reports are expressed in
//! NTP time (seconds since 1900-01-01), not Unix time. This module is the single place
//! that performs the epoch shift so the rest of the crate never has to reason about it.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch (1970-01-01).
const NTP_UNIX_EPOCH_OFFSET: u64 = 2_208_988_800;

/// A 64-bit NTP timestamp split into whole seconds and a 32-bit fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NtpTimestamp {
    /// Seconds since 1900-01-01.
    pub seconds: u32,
    /// Fractional second, as a 32-bit binary fraction.
    pub fraction: u32,
}

impl NtpTimestamp {
    /// The current wall-clock time as an NTP timestamp.
    pub fn now() -> Self {
        let since_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self::from_unix(since_unix)
    }

    /// Convert a duration since the Unix epoch into an NTP timestamp.
    pub fn from_unix(since_unix: Duration) -> Self {
        let seconds = since_unix.as_secs() + NTP_UNIX_EPOCH_OFFSET;
        let fraction = ((since_unix.subsec_nanos() as u64) << 32) / 1_000_000_000;
        Self {
            seconds: seconds as u32,
            fraction: fraction as u32,
        }
    }

    /// Pack into the 64-bit wire representation (seconds in the high word).
    pub fn to_u64(self) -> u64 {
        ((self.seconds as u64) << 32) | self.fraction as u64
    }

    /// Unpack from the 64-bit wire representation.
    pub fn from_u64(value: u64) -> Self {
        Self {
            seconds: (value >> 32) as u32,
            fraction: value as u32,
        }
    }

    /// The middle 32 bits of the 64-bit timestamp: the low 16 bits of `seconds`
    /// followed by the high 16 bits of `fraction`. This is what RTCP calls the
    /// "compact NTP" representation used in SR's own timestamp-as-LSR and in DLSR math.
    pub fn middle_bits(self) -> u32 {
        ((self.seconds as u32) << 16) | (self.fraction >> 16)
    }

    /// Interpret a raw `middle_bits`-shaped `u32` as seconds + fraction/65536, the unit
    /// RTCP's DLSR field uses.
    pub fn delay_to_seconds(delay: u32) -> f64 {
        (delay >> 16) as f64 + (delay & 0xFFFF) as f64 / 65536.0
    }

    /// Encode a `Duration` as a DLSR-style 1/65536s fixed point `u32`.
    pub fn duration_to_dlsr(d: Duration) -> u32 {
        let secs = d.as_secs().min(u32::MAX as u64 >> 16) as u32;
        let frac = ((d.subsec_nanos() as u64) * 65536 / 1_000_000_000) as u32;
        (secs << 16) | (frac & 0xFFFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u64() {
        let ts = NtpTimestamp { seconds: 0x1234_5678, fraction: 0x9abc_def0 };
        assert_eq!(NtpTimestamp::from_u64(ts.to_u64()), ts);
    }

    #[test]
    fn epoch_offset_is_seventy_years() {
        let ts = NtpTimestamp::from_unix(Duration::ZERO);
        assert_eq!(ts.seconds, NTP_UNIX_EPOCH_OFFSET as u32);
        assert_eq!(ts.fraction, 0);
    }

    #[test]
    fn middle_bits_matches_manual_shift() {
        let ts = NtpTimestamp { seconds: 0x0001_0203, fraction: 0x0405_0000 };
        assert_eq!(ts.middle_bits(), 0x0203_0405);
    }
}
