//! fq-core: Shared types, traits, and utilities for Frequalizer
//!
//! This crate provides the foundational types used across all Frequalizer crates.

mod error;
mod params;
mod sample;

pub use error::*;
pub use params::*;
pub use sample::*;

/// Processing setup handed down by the host before audio starts
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProcessSpec {
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Largest block the host will ever pass to `process`
    pub max_block_size: usize,
    /// Number of audio channels
    pub num_channels: usize,
}

impl ProcessSpec {
    pub fn new(sample_rate: f64, max_block_size: usize, num_channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            num_channels,
        }
    }

    /// Stereo spec (the only bus layout the equalizer is built for)
    pub fn stereo(sample_rate: f64, max_block_size: usize) -> Self {
        Self::new(sample_rate, max_block_size, 2)
    }

    /// Sample rate is usable for coefficient design
    #[inline]
    pub fn has_sample_rate(&self) -> bool {
        is_valid_sample_rate(self.sample_rate)
    }

    /// Nyquist frequency in Hz
    #[inline]
    pub fn nyquist(&self) -> f64 {
        self.sample_rate * 0.5
    }
}

/// `true` once a host sample rate has been established
#[inline]
pub fn is_valid_sample_rate(sample_rate: f64) -> bool {
    sample_rate > 0.0 && sample_rate.is_finite()
}

/// Decibel value wrapper
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Decibels(pub f64);

impl Decibels {
    pub const ZERO: Self = Self(0.0);
    pub const NEG_INF: Self = Self(f64::NEG_INFINITY);

    #[inline]
    pub fn from_gain(gain: f64) -> Self {
        if gain <= 0.0 {
            Self::NEG_INF
        } else {
            Self(20.0 * gain.log10())
        }
    }

    #[inline]
    pub fn to_gain(self) -> f64 {
        if self.0 <= -144.0 {
            0.0
        } else {
            10.0_f64.powf(self.0 / 20.0)
        }
    }
}

impl Default for Decibels {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decibels_round_trip() {
        let gain = Decibels(24.0).to_gain();
        assert!((gain - 15.848_931_924_611_13).abs() < 1e-9);
        assert!((Decibels::from_gain(gain).0 - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_decibels_silence() {
        assert_eq!(Decibels::from_gain(0.0), Decibels::NEG_INF);
        assert_eq!(Decibels(-200.0).to_gain(), 0.0);
    }

    #[test]
    fn test_process_spec_sample_rate() {
        assert!(ProcessSpec::stereo(44100.0, 512).has_sample_rate());
        assert!(!ProcessSpec::stereo(0.0, 512).has_sample_rate());
        assert!(!ProcessSpec::stereo(f64::NAN, 512).has_sample_rate());
        assert_eq!(ProcessSpec::stereo(48000.0, 64).nyquist(), 24000.0);
    }
}
