//! Ringtone and beep synthesis by the classical sum-of-sines formula, memoized
//! per (codec name, sample rate) pair.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

type ToneCache = Lazy<Mutex<HashMap<(String, u32), Arc<Vec<i16>>>>>;

static RINGTONE_CACHE: ToneCache = Lazy::new(|| Mutex::new(HashMap::new()));
static BEEP_CACHE: ToneCache = Lazy::new(|| Mutex::new(HashMap::new()));

fn generate(sample_rate: u32, duration_secs: f64, freqs_hz: &[f64], amplitude: f64) -> Vec<i16> {
    let n = (sample_rate as f64 * duration_secs) as usize;
    (0..n)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let sum: f64 = freqs_hz.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f64>() / freqs_hz.len() as f64;
            (sum * amplitude * i16::MAX as f64) as i16
        })
        .collect()
}

fn memoized(
    cache: &ToneCache,
    codec_name: &str,
    sample_rate: u32,
    build: impl FnOnce() -> Vec<i16>,
) -> Arc<Vec<i16>> {
    let key = (codec_name.to_string(), sample_rate);
    if let Some(existing) = cache.lock().get(&key) {
        return existing.clone();
    }
    let samples = Arc::new(build());
    cache.lock().insert(key, samples.clone());
    samples
}

/// (sin 350Hz + sin 440Hz)/2 at 0.3 amplitude, 2 seconds.
pub fn ringtone(codec_name: &str, sample_rate: u32) -> Arc<Vec<i16>> {
    memoized(&RINGTONE_CACHE, codec_name, sample_rate, || generate(sample_rate, 2.0, &[350.0, 440.0], 0.3))
}

/// sin 700Hz at 0.2 amplitude, 0.5 seconds.
pub fn beep(codec_name: &str, sample_rate: u32) -> Arc<Vec<i16>> {
    memoized(&BEEP_CACHE, codec_name, sample_rate, || generate(sample_rate, 0.5, &[700.0], 0.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ringtone_is_two_seconds_at_given_rate() {
        let samples = ringtone("pcmu", 8000);
        assert_eq!(samples.len(), 16000);
    }

    #[test]
    fn beep_is_half_a_second_at_given_rate() {
        let samples = beep("pcmu", 8000);
        assert_eq!(samples.len(), 4000);
    }

    #[test]
    fn repeated_calls_return_the_same_cached_buffer() {
        let a = ringtone("opus", 48000);
        let b = ringtone("opus", 48000);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
