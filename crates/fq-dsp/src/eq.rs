//! Six-band equalizer: band model, update protocol, solo/bypass
//!
//! [`Equalizer`] is the control-side half. It owns the band parameters, each
//! band's cached magnitude curve and the aggregate response. Coefficients are
//! designed here and installed into the [`SharedCascade`] read by the audio
//! thread's [`EqProcessor`].
//!
//! Solo/bypass: with no band soloed every stage is bypassed exactly when its
//! band is inactive, and only active bands contribute to the aggregate
//! response. With band `i` soloed, only stage `i` runs and only its curve
//! contributes.

use fq_core::{Decibels, ParamRange, ProcessSpec, is_valid_sample_rate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::biquad::{BiquadCoeffs, FilterType, MAX_FREQUENCY, MIN_FREQUENCY};
use crate::cascade::{EqProcessor, NUM_BANDS, SharedCascade};
use crate::change::{BandChange, ParamChange};
use crate::plot::{self, FrequencyGrid, PlotBounds, PlotPath, ResponseNotifier};
use crossbeam_channel::Receiver;

/// Maximum band boost/cut in dB
pub const MAX_GAIN_DB: f64 = 24.0;

/// Name reported for an out-of-range band index
pub const UNKNOWN_BAND_NAME: &str = "unknown";

/// Maximum band gain as a linear factor (~15.85)
pub fn max_gain() -> f64 {
    Decibels(MAX_GAIN_DB).to_gain()
}

/// Band frequency range in Hz
pub fn frequency_range() -> ParamRange {
    ParamRange::new(MIN_FREQUENCY, MAX_FREQUENCY, 1.0, 1000.0)
}

/// Band quality range
pub fn quality_range() -> ParamRange {
    ParamRange::new(0.1, 10.0, 0.1, 1.0)
}

/// Band gain range (linear)
pub fn gain_range() -> ParamRange {
    let max = max_gain();
    ParamRange::new(1.0 / max, max, 0.001, 1.0)
}

/// Output gain range (linear)
pub fn output_gain_range() -> ParamRange {
    ParamRange::new(0.0, 2.0, 0.01, 1.0)
}

// ============ Band ============

/// RGB display tint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub const BLUE: Self = Self::rgb(0x00, 0x00, 0xff);
    pub const BROWN: Self = Self::rgb(0xa5, 0x2a, 0x2a);
    pub const GREEN: Self = Self::rgb(0x00, 0x80, 0x00);
    pub const CORAL: Self = Self::rgb(0xff, 0x7f, 0x50);
    pub const ORANGE: Self = Self::rgb(0xff, 0xa5, 0x00);
    pub const RED: Self = Self::rgb(0xff, 0x00, 0x00);
    /// Reported for an out-of-range band index
    pub const SILVER: Self = Self::rgb(0xc0, 0xc0, 0xc0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB`
    pub fn to_hex(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

/// Mutable parameters of one band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandParams {
    pub filter_type: FilterType,
    /// Hz
    pub frequency: f64,
    pub quality: f64,
    /// Linear
    pub gain: f64,
    pub active: bool,
}

impl Default for BandParams {
    fn default() -> Self {
        Self {
            filter_type: FilterType::BandPass,
            frequency: 1000.0,
            quality: 1.0,
            gain: 1.0,
            active: true,
        }
    }
}

impl BandParams {
    /// Clamp every field into its valid range
    pub fn clamped(self) -> Self {
        Self {
            filter_type: self.filter_type,
            frequency: frequency_range().clamp(self.frequency),
            quality: quality_range().clamp(self.quality),
            gain: gain_range().clamp(self.gain),
            active: self.active,
        }
    }
}

/// Factory layout: (name, colour, type, frequency, quality)
const FACTORY_BANDS: [(&str, Colour, FilterType, f64, f64); NUM_BANDS] = [
    ("Lowest", Colour::BLUE, FilterType::HighPass, 20.0, 0.707),
    ("Low", Colour::BROWN, FilterType::LowShelf, 250.0, 1.0),
    ("Low Mids", Colour::GREEN, FilterType::Peak, 500.0, 1.0),
    ("High Mids", Colour::CORAL, FilterType::Peak, 1000.0, 1.0),
    ("High", Colour::ORANGE, FilterType::HighShelf, 5000.0, 1.0),
    ("Highest", Colour::RED, FilterType::LowPass, 12000.0, 0.707),
];

/// One equalizer band
#[derive(Debug, Clone)]
pub struct Band {
    name: &'static str,
    colour: Colour,
    params: BandParams,
    magnitudes: Vec<f64>,
}

impl Band {
    fn new(name: &'static str, colour: Colour, params: BandParams) -> Self {
        Self {
            name,
            colour,
            params,
            magnitudes: vec![1.0; plot::NUM_POINTS],
        }
    }

    /// Band `index` with its factory settings
    pub fn factory(index: usize) -> Option<Self> {
        let (name, colour, filter_type, frequency, quality) = *FACTORY_BANDS.get(index)?;
        Some(Self::new(
            name,
            colour,
            BandParams {
                filter_type,
                frequency,
                quality,
                ..BandParams::default()
            },
        ))
    }

    /// Factory parameters for band `index`
    pub fn factory_params(index: usize) -> Option<BandParams> {
        Self::factory(index).map(|band| band.params)
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn colour(&self) -> Colour {
        self.colour
    }

    #[inline]
    pub fn params(&self) -> BandParams {
        self.params
    }

    #[inline]
    pub fn filter_type(&self) -> FilterType {
        self.params.filter_type
    }

    #[inline]
    pub fn frequency(&self) -> f64 {
        self.params.frequency
    }

    #[inline]
    pub fn quality(&self) -> f64 {
        self.params.quality
    }

    #[inline]
    pub fn gain(&self) -> f64 {
        self.params.gain
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.params.active
    }

    /// Linear magnitude on the frequency grid
    #[inline]
    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }
}

// ============ Equalizer ============

/// Control-side equalizer state
#[derive(Debug)]
pub struct Equalizer {
    bands: [Band; NUM_BANDS],
    soloed: Option<usize>,
    output_gain: f64,
    sample_rate: f64,
    grid: &'static FrequencyGrid,
    magnitudes: Vec<f64>,
    shared: Arc<SharedCascade>,
    notifier: ResponseNotifier,
}

impl Default for Equalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Equalizer {
    /// Equalizer with factory bands. No coefficients are designed until a
    /// sample rate is known.
    pub fn new() -> Self {
        let bands = std::array::from_fn(|i| {
            Band::factory(i).unwrap_or_else(|| {
                Band::new(UNKNOWN_BAND_NAME, Colour::SILVER, BandParams::default())
            })
        });
        let mut eq = Self {
            bands,
            soloed: None,
            output_gain: 1.0,
            sample_rate: 0.0,
            grid: FrequencyGrid::shared(),
            magnitudes: vec![1.0; plot::NUM_POINTS],
            shared: Arc::new(SharedCascade::new()),
            notifier: ResponseNotifier::new(),
        };
        eq.update_bypassed_states();
        eq
    }

    /// Audio-thread processor bound to this equalizer
    pub fn processor(&self) -> EqProcessor {
        EqProcessor::new(Arc::clone(&self.shared))
    }

    /// Establish the sample rate and design every band
    pub fn prepare(&mut self, spec: &ProcessSpec) {
        self.set_sample_rate(spec.sample_rate);
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        if !is_valid_sample_rate(sample_rate) {
            log::warn!("[EQ] Ignoring invalid sample rate {sample_rate}");
            return;
        }
        self.sample_rate = sample_rate;
        log::info!("[EQ] Sample rate set to {sample_rate} Hz");
        for index in 0..NUM_BANDS {
            self.install_band(index);
        }
        self.update_bypassed_states();
    }

    /// 0.0 until a sample rate has been established
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    // ---- band accessors ----

    pub fn band(&self, index: usize) -> Option<&Band> {
        self.bands.get(index)
    }

    pub fn bands(&self) -> &[Band; NUM_BANDS] {
        &self.bands
    }

    pub fn band_name(&self, index: usize) -> &'static str {
        self.band(index).map_or(UNKNOWN_BAND_NAME, Band::name)
    }

    pub fn band_colour(&self, index: usize) -> Colour {
        self.band(index).map_or(Colour::SILVER, Band::colour)
    }

    // ---- band mutators ----

    pub fn set_band_type(&mut self, index: usize, filter_type: FilterType) {
        self.modify_band(index, |params| params.filter_type = filter_type);
    }

    pub fn set_band_frequency(&mut self, index: usize, frequency: f64) {
        self.modify_band(index, |params| params.frequency = frequency_range().clamp(frequency));
    }

    pub fn set_band_quality(&mut self, index: usize, quality: f64) {
        self.modify_band(index, |params| params.quality = quality_range().clamp(quality));
    }

    pub fn set_band_gain(&mut self, index: usize, gain: f64) {
        self.modify_band(index, |params| params.gain = gain_range().clamp(gain));
    }

    pub fn set_band_active(&mut self, index: usize, active: bool) {
        let Some(band) = self.bands.get_mut(index) else {
            return;
        };
        band.params.active = active;
        self.update_bypassed_states();
    }

    /// Replace all of a band's parameters, designing once
    pub fn set_band_params(&mut self, index: usize, params: BandParams) {
        self.modify_band(index, |current| *current = params.clamped());
    }

    fn modify_band(&mut self, index: usize, modify: impl FnOnce(&mut BandParams)) {
        let Some(band) = self.bands.get_mut(index) else {
            log::trace!("[EQ] Ignoring change for band index {index}");
            return;
        };
        let was_active = band.params.active;
        modify(&mut band.params);
        let active_changed = band.params.active != was_active;
        if self.install_band(index) || active_changed {
            self.update_bypassed_states();
        }
    }

    /// Apply a decoded parameter change
    pub fn apply(&mut self, change: ParamChange) {
        match change {
            ParamChange::OutputGain(gain) => self.set_output_gain(gain),
            ParamChange::Band { band, change } => match change {
                BandChange::Type(filter_type) => self.set_band_type(band, filter_type),
                BandChange::Frequency(frequency) => self.set_band_frequency(band, frequency),
                BandChange::Quality(quality) => self.set_band_quality(band, quality),
                BandChange::Gain(gain) => self.set_band_gain(band, gain),
                BandChange::Active(active) => self.set_band_active(band, active),
            },
        }
    }

    // ---- update protocol ----

    /// Redesign band `index` from its stored parameters, install the result
    /// and refresh its curve, the bypass flags and the aggregate. Deferred
    /// while no sample rate is known.
    pub fn update_band(&mut self, index: usize) {
        if self.install_band(index) {
            self.update_bypassed_states();
        }
    }

    /// Design and install band `index` and refresh its curve. `false` when
    /// nothing was installed.
    fn install_band(&mut self, index: usize) -> bool {
        if !is_valid_sample_rate(self.sample_rate) {
            return false;
        }
        let Some(band) = self.bands.get_mut(index) else {
            return false;
        };

        let params = band.params;
        // Design outside the lock; only the install is locked
        let Some(coeffs) = BiquadCoeffs::design(
            params.filter_type,
            self.sample_rate,
            params.frequency,
            params.quality,
            params.gain,
        ) else {
            return false;
        };

        self.shared.install_coeffs(index, coeffs);
        coeffs.magnitudes_into(self.grid.frequencies(), &mut band.magnitudes, self.sample_rate);

        log::debug!(
            "[EQ] Band {} ({}): {} {:.1} Hz Q {:.2} gain {:.3}",
            index,
            band.name,
            params.filter_type,
            params.frequency,
            params.quality,
            params.gain
        );
        true
    }

    /// Recompute and publish all stage bypass flags, then re-aggregate
    pub fn update_bypassed_states(&mut self) {
        let soloed = self.soloed;
        let bypassed: [bool; NUM_BANDS] = std::array::from_fn(|i| match soloed {
            Some(solo) => i != solo,
            None => !self.bands[i].params.active,
        });
        self.shared.publish_bypassed(bypassed);
        self.update_plots();
    }

    // ---- solo ----

    /// Solo band `index`; `None` or an out-of-range index returns to normal
    pub fn set_band_solo(&mut self, index: Option<usize>) {
        self.soloed = index.filter(|&i| i < NUM_BANDS);
        self.update_bypassed_states();
    }

    pub fn band_solo(&self, index: usize) -> bool {
        self.soloed == Some(index)
    }

    #[inline]
    pub fn soloed(&self) -> Option<usize> {
        self.soloed
    }

    // ---- output gain ----

    pub fn set_output_gain(&mut self, gain: f64) {
        self.output_gain = output_gain_range().clamp(gain);
        self.shared.set_output_gain(self.output_gain);
        self.update_plots();
    }

    #[inline]
    pub fn output_gain(&self) -> f64 {
        self.output_gain
    }

    // ---- response ----

    /// Rebuild the aggregate response and notify subscribers
    pub fn update_plots(&mut self) {
        let soloed = self.soloed;
        let curves = self
            .bands
            .iter()
            .enumerate()
            .filter(|(i, band)| match soloed {
                Some(solo) => *i == solo,
                None => band.params.active,
            })
            .map(|(_, band)| band.magnitudes.as_slice());
        plot::aggregate(self.output_gain, curves, &mut self.magnitudes);
        self.notifier.notify();
    }

    /// Aggregate linear response on the frequency grid
    #[inline]
    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    #[inline]
    pub fn frequencies(&self) -> &[f64] {
        self.grid.frequencies()
    }

    /// Plot an arbitrary curve on this equalizer's grid
    pub fn create_frequency_plot(
        &self,
        magnitudes: &[f64],
        bounds: PlotBounds,
        pixels_per_octave: f64,
    ) -> PlotPath {
        plot::create_frequency_plot(magnitudes, bounds, pixels_per_octave)
    }

    /// Plot the aggregate response
    pub fn response_plot(&self, bounds: PlotBounds, pixels_per_octave: f64) -> PlotPath {
        plot::create_frequency_plot(&self.magnitudes, bounds, pixels_per_octave)
    }

    // ---- committed state ----

    /// Coefficients currently committed for stage `index`
    pub fn coefficients(&self, index: usize) -> Option<BiquadCoeffs> {
        (index < NUM_BANDS).then(|| self.shared.settings().coeffs[index])
    }

    /// Whether stage `index` is currently bypassed in the cascade
    pub fn is_bypassed(&self, index: usize) -> Option<bool> {
        (index < NUM_BANDS).then(|| self.shared.settings().bypassed[index])
    }

    // ---- notification ----

    /// Receive the response generation every time the aggregate changes
    pub fn subscribe(&mut self) -> Receiver<u64> {
        self.notifier.subscribe()
    }

    /// Number of aggregate recomputations so far
    #[inline]
    pub fn generation(&self) -> u64 {
        self.notifier.generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(sample_rate: f64) -> Equalizer {
        let mut eq = Equalizer::new();
        eq.prepare(&ProcessSpec::stereo(sample_rate, 512));
        eq
    }

    #[test]
    fn test_factory_bands() {
        let eq = Equalizer::new();
        let names: Vec<_> = (0..NUM_BANDS).map(|i| eq.band_name(i)).collect();
        assert_eq!(names, ["Lowest", "Low", "Low Mids", "High Mids", "High", "Highest"]);
        assert_eq!(eq.band(0).map(Band::filter_type), Some(FilterType::HighPass));
        assert_eq!(eq.band(0).map(Band::quality), Some(0.707));
        assert_eq!(eq.band(4).map(Band::frequency), Some(5000.0));
        assert_eq!(eq.band(5).map(Band::colour), Some(Colour::RED));
        assert!(eq.bands().iter().all(|b| b.gain() == 1.0 && b.is_active()));
    }

    #[test]
    fn test_invalid_index_sentinels() {
        let mut eq = prepared(48000.0);
        assert!(eq.band(6).is_none());
        assert_eq!(eq.band_name(42), "unknown");
        assert_eq!(eq.band_colour(6), Colour::SILVER);
        assert!(eq.coefficients(6).is_none());

        let before = eq.magnitudes().to_vec();
        eq.set_band_gain(6, 4.0);
        eq.set_band_active(99, false);
        assert_eq!(eq.magnitudes(), &before[..]);
    }

    #[test]
    fn test_updates_deferred_without_sample_rate() {
        let mut eq = Equalizer::new();
        eq.set_band_gain(2, 2.0);
        assert_eq!(eq.band(2).map(Band::gain), Some(2.0));
        assert_eq!(eq.coefficients(2), Some(BiquadCoeffs::identity()));
        assert!(eq.band(2).is_some_and(|b| b.magnitudes().iter().all(|&m| m == 1.0)));

        eq.set_sample_rate(48000.0);
        assert_eq!(
            eq.coefficients(2),
            BiquadCoeffs::design(FilterType::Peak, 48000.0, 500.0, 1.0, 2.0)
        );
    }

    #[test]
    fn test_band_params_bypass_without_sample_rate() {
        let mut eq = Equalizer::new();
        let rx = eq.subscribe();
        let mut params = eq.band(0).map(Band::params).unwrap();
        params.active = false;
        eq.set_band_params(0, params);
        assert_eq!(eq.is_bypassed(0), Some(true));
        assert_eq!(rx.try_recv(), Ok(eq.generation()));

        params.active = true;
        eq.set_band_params(0, params);
        assert_eq!(eq.is_bypassed(0), Some(false));
    }

    #[test]
    fn test_prepare_publishes_once() {
        let mut eq = Equalizer::new();
        let generation = eq.generation();
        eq.prepare(&ProcessSpec::stereo(48000.0, 512));
        assert_eq!(eq.generation(), generation + 1);
        for i in 0..NUM_BANDS {
            assert_ne!(eq.coefficients(i), Some(BiquadCoeffs::identity()));
        }
    }

    #[test]
    fn test_invalid_sample_rate_ignored() {
        let mut eq = prepared(44100.0);
        eq.set_sample_rate(0.0);
        assert_eq!(eq.sample_rate(), 44100.0);
    }

    #[test]
    fn test_parameters_clamped() {
        let mut eq = prepared(48000.0);
        eq.set_band_frequency(1, 5.0);
        eq.set_band_quality(1, 50.0);
        eq.set_band_gain(1, 100.0);
        let band = eq.band(1).unwrap();
        assert_eq!(band.frequency(), 20.0);
        assert_eq!(band.quality(), 10.0);
        assert!((band.gain() - max_gain()).abs() < 1e-12);

        eq.set_output_gain(-1.0);
        assert_eq!(eq.output_gain(), 0.0);
    }

    #[test]
    fn test_solo_bypass_flags() {
        let mut eq = prepared(48000.0);
        eq.set_band_active(1, false);
        assert_eq!(eq.is_bypassed(1), Some(true));
        assert_eq!(eq.is_bypassed(0), Some(false));

        eq.set_band_solo(Some(3));
        assert!(eq.band_solo(3));
        for i in 0..NUM_BANDS {
            assert_eq!(eq.is_bypassed(i), Some(i != 3));
        }

        eq.set_band_solo(Some(9));
        assert_eq!(eq.soloed(), None);
        assert_eq!(eq.is_bypassed(1), Some(true));
        assert_eq!(eq.is_bypassed(3), Some(false));
    }

    #[test]
    fn test_output_gain_scales_response() {
        let mut eq = prepared(48000.0);
        let before = eq.magnitudes().to_vec();
        eq.set_output_gain(0.5);
        for (after, before) in eq.magnitudes().iter().zip(&before) {
            assert!((after - before * 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_apply_changes() {
        let mut eq = prepared(48000.0);
        eq.apply(ParamChange::band(3, BandChange::Type(FilterType::Notch)));
        eq.apply(ParamChange::band(3, BandChange::Quality(4.0)));
        eq.apply(ParamChange::band(3, BandChange::Active(false)));
        eq.apply(ParamChange::OutputGain(1.5));

        let band = eq.band(3).unwrap();
        assert_eq!(band.filter_type(), FilterType::Notch);
        assert_eq!(band.quality(), 4.0);
        assert!(!band.is_active());
        assert_eq!(eq.output_gain(), 1.5);
    }

    #[test]
    fn test_change_notification() {
        let mut eq = prepared(48000.0);
        let rx = eq.subscribe();
        let generation = eq.generation();
        eq.set_band_gain(2, 3.0);
        assert!(eq.generation() > generation);
        assert_eq!(eq.generation(), generation + 1);
        assert_eq!(rx.try_recv(), Ok(generation + 1));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_colour_hex() {
        assert_eq!(Colour::CORAL.to_hex(), 0xff7f50);
        assert_eq!(Colour::SILVER.to_hex(), 0xc0c0c0);
    }
}
