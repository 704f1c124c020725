//! Biquad filter design and Transposed Direct Form II processing
//!
//! Coefficient design is a pure function of (filter type, sample rate,
//! frequency, quality, gain). Second-order types follow the RBJ cookbook,
//! first-order types use the prewarped bilinear transform. Gain is linear:
//! the peak filter reaches `gain` at its centre and the shelves settle at
//! `gain` on their boosted side.

use fq_core::{Sample, is_valid_sample_rate};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::{MonoProcessor, Processor};

/// Lowest frequency a band can be tuned to
pub const MIN_FREQUENCY: f64 = 20.0;

/// Highest frequency a band can be tuned to
pub const MAX_FREQUENCY: f64 = 20000.0;

/// Design frequencies are kept strictly below Nyquist
const NYQUIST_LIMIT: f64 = 0.499;

/// Smallest quality/gain accepted by the designers
const MIN_POSITIVE: f64 = 1e-6;

/// Filter state below this is flushed to zero after every block
const DENORMAL_THRESHOLD: f64 = 1e-15;

/// Equalizer filter types
///
/// The discriminants are the persisted parameter encoding and must not be
/// reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum FilterType {
    NoFilter = 0,
    HighPass,
    HighPass1st,
    LowShelf,
    #[default]
    BandPass,
    AllPass,
    AllPass1st,
    Notch,
    Peak,
    HighShelf,
    LowPass1st,
    LowPass,
}

impl FilterType {
    /// Number of filter types
    pub const COUNT: usize = 12;

    /// All filter types in encoding order
    pub const ALL: [FilterType; Self::COUNT] = [
        FilterType::NoFilter,
        FilterType::HighPass,
        FilterType::HighPass1st,
        FilterType::LowShelf,
        FilterType::BandPass,
        FilterType::AllPass,
        FilterType::AllPass1st,
        FilterType::Notch,
        FilterType::Peak,
        FilterType::HighShelf,
        FilterType::LowPass1st,
        FilterType::LowPass,
    ];

    /// Decode from the integer encoding; anything unknown is `NoFilter`
    pub fn from_index(index: i64) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or(FilterType::NoFilter)
    }

    /// Decode from a (possibly fractional) parameter value
    pub fn from_value(value: f64) -> Self {
        if !value.is_finite() {
            return FilterType::NoFilter;
        }
        Self::from_index(value.round() as i64)
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            FilterType::NoFilter => "No Filter",
            FilterType::HighPass => "High Pass",
            FilterType::HighPass1st => "1st High Pass",
            FilterType::LowShelf => "Low Shelf",
            FilterType::BandPass => "Band Pass",
            FilterType::AllPass => "All Pass",
            FilterType::AllPass1st => "1st All Pass",
            FilterType::Notch => "Notch",
            FilterType::Peak => "Peak",
            FilterType::HighShelf => "High Shelf",
            FilterType::LowPass1st => "1st Low Pass",
            FilterType::LowPass => "Low Pass",
        }
    }

    /// Parse a display name; unknown names are `NoFilter`
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .unwrap_or(FilterType::NoFilter)
    }
}

impl From<i64> for FilterType {
    fn from(index: i64) -> Self {
        Self::from_index(index)
    }
}

impl From<FilterType> for i64 {
    fn from(filter_type: FilterType) -> Self {
        filter_type.index() as i64
    }
}

impl std::fmt::Display for FilterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Biquad coefficients, normalized so that a0 = 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::identity()
    }
}

impl BiquadCoeffs {
    /// Unity gain, no filtering
    pub const fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// Normalize raw (b, a) coefficients by a0
    pub fn from_raw(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        let inv_a0 = 1.0 / a0;
        Self {
            b0: b0 * inv_a0,
            b1: b1 * inv_a0,
            b2: b2 * inv_a0,
            a1: a1 * inv_a0,
            a2: a2 * inv_a0,
        }
    }

    /// Design coefficients for `filter_type`.
    ///
    /// Returns `None` while the sample rate is not established. Frequency is
    /// clamped to [20 Hz, Nyquist), quality and gain are forced positive.
    pub fn design(
        filter_type: FilterType,
        sample_rate: f64,
        frequency: f64,
        quality: f64,
        gain: f64,
    ) -> Option<Self> {
        if !is_valid_sample_rate(sample_rate) {
            return None;
        }

        let freq = frequency
            .max(MIN_FREQUENCY)
            .min(sample_rate * NYQUIST_LIMIT);
        let q = quality.max(MIN_POSITIVE);
        let gain = gain.max(MIN_POSITIVE);

        let coeffs = match filter_type {
            FilterType::NoFilter => Self::identity(),
            FilterType::LowPass => Self::lowpass(freq, q, sample_rate),
            FilterType::LowPass1st => Self::first_order_lowpass(freq, sample_rate),
            FilterType::LowShelf => Self::low_shelf(freq, q, gain, sample_rate),
            FilterType::BandPass => Self::bandpass(freq, q, sample_rate),
            FilterType::AllPass => Self::allpass(freq, q, sample_rate),
            FilterType::AllPass1st => Self::first_order_allpass(freq, sample_rate),
            FilterType::Notch => Self::notch(freq, q, sample_rate),
            FilterType::Peak => Self::peak(freq, q, gain, sample_rate),
            FilterType::HighShelf => Self::high_shelf(freq, q, gain, sample_rate),
            FilterType::HighPass1st => Self::first_order_highpass(freq, sample_rate),
            FilterType::HighPass => Self::highpass(freq, q, sample_rate),
        };
        Some(coeffs)
    }

    /// Calculate lowpass filter coefficients
    pub fn lowpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let (cos_omega, alpha) = Self::omega_alpha(freq, q, sample_rate);

        Self::from_raw(
            (1.0 - cos_omega) / 2.0,
            1.0 - cos_omega,
            (1.0 - cos_omega) / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        )
    }

    /// Calculate highpass filter coefficients
    pub fn highpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let (cos_omega, alpha) = Self::omega_alpha(freq, q, sample_rate);

        Self::from_raw(
            (1.0 + cos_omega) / 2.0,
            -(1.0 + cos_omega),
            (1.0 + cos_omega) / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        )
    }

    /// Calculate bandpass filter coefficients (constant 0 dB peak gain)
    pub fn bandpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let (cos_omega, alpha) = Self::omega_alpha(freq, q, sample_rate);

        Self::from_raw(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
    }

    /// Calculate notch filter coefficients
    pub fn notch(freq: f64, q: f64, sample_rate: f64) -> Self {
        let (cos_omega, alpha) = Self::omega_alpha(freq, q, sample_rate);

        Self::from_raw(
            1.0,
            -2.0 * cos_omega,
            1.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        )
    }

    /// Calculate allpass filter coefficients
    pub fn allpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let (cos_omega, alpha) = Self::omega_alpha(freq, q, sample_rate);

        Self::from_raw(
            1.0 - alpha,
            -2.0 * cos_omega,
            1.0 + alpha,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        )
    }

    /// Calculate peak filter coefficients; `gain` is the linear gain at `freq`
    pub fn peak(freq: f64, q: f64, gain: f64, sample_rate: f64) -> Self {
        let a = gain.sqrt();
        let (cos_omega, alpha) = Self::omega_alpha(freq, q, sample_rate);

        Self::from_raw(
            1.0 + alpha * a,
            -2.0 * cos_omega,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_omega,
            1.0 - alpha / a,
        )
    }

    /// Calculate low shelf filter coefficients; `gain` is the linear shelf gain
    pub fn low_shelf(freq: f64, q: f64, gain: f64, sample_rate: f64) -> Self {
        let a = gain.sqrt();
        let (cos_omega, alpha) = Self::omega_alpha(freq, q, sample_rate);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        Self::from_raw(
            a * ((a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
            a * ((a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha),
            (a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha,
            -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
            (a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha,
        )
    }

    /// Calculate high shelf filter coefficients; `gain` is the linear shelf gain
    pub fn high_shelf(freq: f64, q: f64, gain: f64, sample_rate: f64) -> Self {
        let a = gain.sqrt();
        let (cos_omega, alpha) = Self::omega_alpha(freq, q, sample_rate);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        Self::from_raw(
            a * ((a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
            a * ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha),
            (a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha,
            2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
            (a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha,
        )
    }

    /// First-order lowpass (6 dB/oct), -3 dB at `freq`
    pub fn first_order_lowpass(freq: f64, sample_rate: f64) -> Self {
        let n = (PI * freq / sample_rate).tan();
        Self::from_raw(n, n, 0.0, n + 1.0, n - 1.0, 0.0)
    }

    /// First-order highpass (6 dB/oct), -3 dB at `freq`
    pub fn first_order_highpass(freq: f64, sample_rate: f64) -> Self {
        let n = (PI * freq / sample_rate).tan();
        Self::from_raw(1.0, -1.0, 0.0, n + 1.0, n - 1.0, 0.0)
    }

    /// First-order allpass, 90° phase shift at `freq`
    pub fn first_order_allpass(freq: f64, sample_rate: f64) -> Self {
        let n = (PI * freq / sample_rate).tan();
        Self::from_raw(n - 1.0, n + 1.0, 0.0, n + 1.0, n - 1.0, 0.0)
    }

    #[inline]
    fn omega_alpha(freq: f64, q: f64, sample_rate: f64) -> (f64, f64) {
        let omega = 2.0 * PI * freq / sample_rate;
        (omega.cos(), omega.sin() / (2.0 * q))
    }

    /// Linear magnitude of the transfer function at `freq`
    ///
    /// Evaluates |H(z)| = |b0 + b1*z^-1 + b2*z^-2| / |1 + a1*z^-1 + a2*z^-2|
    /// at z = e^(jω), ω = 2πf/fs
    pub fn magnitude(&self, freq: f64, sample_rate: f64) -> f64 {
        let omega = 2.0 * PI * freq / sample_rate;
        let cos_w = omega.cos();
        let sin_w = omega.sin();
        let cos_2w = (2.0 * omega).cos();
        let sin_2w = (2.0 * omega).sin();

        let num_real = self.b0 + self.b1 * cos_w + self.b2 * cos_2w;
        let num_imag = -self.b1 * sin_w - self.b2 * sin_2w;

        let den_real = 1.0 + self.a1 * cos_w + self.a2 * cos_2w;
        let den_imag = -self.a1 * sin_w - self.a2 * sin_2w;

        let num_mag_sq = num_real * num_real + num_imag * num_imag;
        let den_mag_sq = den_real * den_real + den_imag * den_imag;

        (num_mag_sq / den_mag_sq).sqrt()
    }

    /// Evaluate [`magnitude`](Self::magnitude) for every frequency in `freqs`
    pub fn magnitudes_into(&self, freqs: &[f64], out: &mut [f64], sample_rate: f64) {
        debug_assert_eq!(freqs.len(), out.len());
        for (mag, &freq) in out.iter_mut().zip(freqs) {
            *mag = self.magnitude(freq, sample_rate);
        }
    }

    /// Both poles strictly inside the unit circle
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }
}

/// Transposed Direct Form II biquad filter (one channel)
#[derive(Debug, Clone, Default)]
pub struct BiquadTDF2 {
    coeffs: BiquadCoeffs,
    z1: f64,
    z2: f64,
}

impl BiquadTDF2 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coeffs(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Swap coefficients; delay registers are kept
    #[inline]
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    #[inline]
    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    /// Current delay registers (z1, z2)
    #[inline]
    pub fn state(&self) -> (f64, f64) {
        (self.z1, self.z2)
    }

    /// Flush tiny state values to zero
    #[inline]
    pub fn snap_to_zero(&mut self) {
        if self.z1.abs() < DENORMAL_THRESHOLD {
            self.z1 = 0.0;
        }
        if self.z2.abs() < DENORMAL_THRESHOLD {
            self.z2 = 0.0;
        }
    }
}

impl Processor for BiquadTDF2 {
    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

impl MonoProcessor for BiquadTDF2 {
    #[inline(always)]
    fn process_sample(&mut self, input: Sample) -> Sample {
        let output = self.coeffs.b0 * input + self.z1;
        self.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.z2;
        self.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }

    fn process_block(&mut self, buffer: &mut [Sample]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
        self.snap_to_zero();
    }
}
