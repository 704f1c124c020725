//! Filter cascade and the audio-thread processor
//!
//! Six uniform biquad stages followed by a linear output gain, applied in
//! band order. The control side installs coefficients into a
//! [`SharedCascade`]; the audio side ([`EqProcessor`]) picks them up at block
//! boundaries without ever blocking.

use fq_core::{AtomicParam, ProcessSpec, Sample, StereoBuffer};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::biquad::{BiquadCoeffs, BiquadTDF2};
use crate::{MonoProcessor, Processor};

/// Number of equalizer bands / cascade stages
pub const NUM_BANDS: usize = 6;

// ============ Filter Band ============

/// One cascade stage: shared coefficients, per-channel delay state
#[derive(Debug, Clone, Default)]
pub struct FilterBand {
    coeffs: BiquadCoeffs,
    channels: Vec<BiquadTDF2>,
    bypassed: bool,
}

impl FilterBand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate state for `num_channels`; existing state is cleared
    pub fn prepare(&mut self, num_channels: usize) {
        self.channels = vec![BiquadTDF2::with_coeffs(self.coeffs); num_channels];
    }

    /// Replace coefficients wholesale; delay state is preserved
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
        for filter in &mut self.channels {
            filter.set_coeffs(coeffs);
        }
    }

    #[inline]
    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    #[inline]
    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Delay registers of `channel`
    pub fn state(&self, channel: usize) -> Option<(f64, f64)> {
        self.channels.get(channel).map(BiquadTDF2::state)
    }

    /// Filter one channel in place. Bypassed stages and channels without
    /// prepared state pass through untouched.
    #[inline]
    pub fn process(&mut self, channel: usize, buffer: &mut [Sample]) {
        if self.bypassed {
            return;
        }
        if let Some(filter) = self.channels.get_mut(channel) {
            filter.process_block(buffer);
        }
    }
}

impl Processor for FilterBand {
    fn reset(&mut self) {
        for filter in &mut self.channels {
            filter.reset();
        }
    }
}

// ============ Filter Cascade ============

/// Committed per-stage configuration, published as one value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CascadeSettings {
    pub coeffs: [BiquadCoeffs; NUM_BANDS],
    pub bypassed: [bool; NUM_BANDS],
}

/// Six filter stages plus output gain
#[derive(Debug, Clone)]
pub struct FilterCascade {
    bands: [FilterBand; NUM_BANDS],
    output_gain: f64,
}

impl Default for FilterCascade {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCascade {
    pub fn new() -> Self {
        Self {
            bands: std::array::from_fn(|_| FilterBand::new()),
            output_gain: 1.0,
        }
    }

    pub fn prepare(&mut self, num_channels: usize) {
        for band in &mut self.bands {
            band.prepare(num_channels);
        }
    }

    /// Stage accessor; `None` outside [0, NUM_BANDS)
    pub fn band(&self, index: usize) -> Option<&FilterBand> {
        self.bands.get(index)
    }

    pub fn band_mut(&mut self, index: usize) -> Option<&mut FilterBand> {
        self.bands.get_mut(index)
    }

    pub fn bands(&self) -> &[FilterBand; NUM_BANDS] {
        &self.bands
    }

    /// Install a full committed configuration
    pub fn apply(&mut self, settings: &CascadeSettings) {
        for ((band, coeffs), bypassed) in self
            .bands
            .iter_mut()
            .zip(&settings.coeffs)
            .zip(&settings.bypassed)
        {
            band.set_coeffs(*coeffs);
            band.set_bypassed(*bypassed);
        }
    }

    #[inline]
    pub fn set_output_gain(&mut self, gain: f64) {
        self.output_gain = gain;
    }

    #[inline]
    pub fn output_gain(&self) -> f64 {
        self.output_gain
    }

    /// Run every channel through the six stages, then the gain stage
    pub fn process(&mut self, channels: &mut [&mut [Sample]]) {
        for (ch, buffer) in channels.iter_mut().enumerate() {
            for band in &mut self.bands {
                band.process(ch, buffer);
            }
            if self.output_gain != 1.0 {
                for sample in buffer.iter_mut() {
                    *sample *= self.output_gain;
                }
            }
        }
    }
}

impl Processor for FilterCascade {
    fn reset(&mut self) {
        for band in &mut self.bands {
            band.reset();
        }
    }
}

// ============ Shared State ============

/// Committed cascade state shared between control and audio threads
#[derive(Debug)]
pub struct SharedCascade {
    settings: Mutex<CascadeSettings>,
    generation: AtomicU64,
    output_gain: AtomicParam,
}

impl Default for SharedCascade {
    fn default() -> Self {
        Self {
            settings: Mutex::new(CascadeSettings::default()),
            generation: AtomicU64::new(0),
            output_gain: AtomicParam::new(1.0),
        }
    }
}

impl SharedCascade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install one stage's coefficients. The lock covers only the copy.
    pub fn install_coeffs(&self, index: usize, coeffs: BiquadCoeffs) {
        if index >= NUM_BANDS {
            return;
        }
        self.settings.lock().coeffs[index] = coeffs;
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Publish all six bypass flags together
    pub fn publish_bypassed(&self, bypassed: [bool; NUM_BANDS]) {
        self.settings.lock().bypassed = bypassed;
        self.generation.fetch_add(1, Ordering::Release);
    }

    #[inline]
    pub fn set_output_gain(&self, gain: f64) {
        self.output_gain.set(gain);
    }

    #[inline]
    pub fn output_gain(&self) -> f64 {
        self.output_gain.get()
    }

    /// Copy of the committed configuration
    pub fn settings(&self) -> CascadeSettings {
        *self.settings.lock()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

// ============ Audio Processor ============

/// Audio-thread side of the equalizer
///
/// Owns all filter state. `process` never allocates; committed settings are
/// refreshed with `try_lock` so a busy control thread only delays an update
/// by one block.
#[derive(Debug)]
pub struct EqProcessor {
    shared: Arc<SharedCascade>,
    cascade: FilterCascade,
    seen_generation: u64,
    bypassed: bool,
    needs_reset: bool,
}

impl EqProcessor {
    pub fn new(shared: Arc<SharedCascade>) -> Self {
        let seen_generation = shared.generation();
        let mut cascade = FilterCascade::new();
        cascade.apply(&shared.settings());
        Self {
            shared,
            cascade,
            seen_generation,
            bypassed: false,
            needs_reset: true,
        }
    }

    /// Allocate per-channel state. Not real-time safe.
    pub fn prepare(&mut self, spec: &ProcessSpec) {
        self.cascade.prepare(spec.num_channels);
        self.seen_generation = self.shared.generation();
        self.cascade.apply(&self.shared.settings());
        self.needs_reset = true;
        log::debug!(
            "[EQ] Processor prepared: {} Hz, {} channels, block {}",
            spec.sample_rate,
            spec.num_channels,
            spec.max_block_size
        );
    }

    /// Whole-processor bypass. Leaving bypass clears filter state before the
    /// next processed block.
    pub fn set_bypassed(&mut self, bypassed: bool) {
        if self.bypassed && !bypassed {
            self.needs_reset = true;
        }
        self.bypassed = bypassed;
    }

    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    pub fn cascade(&self) -> &FilterCascade {
        &self.cascade
    }

    /// Process one block in place
    pub fn process(&mut self, channels: &mut [&mut [Sample]]) {
        if self.bypassed {
            return;
        }

        self.refresh();
        if self.needs_reset {
            self.cascade.reset();
            self.needs_reset = false;
        }
        self.cascade.set_output_gain(self.shared.output_gain());
        self.cascade.process(channels);
    }

    /// Process a stereo buffer in place
    pub fn process_stereo(&mut self, buffer: &mut StereoBuffer) {
        let (left, right) = buffer.channels_mut();
        self.process(&mut [left, right]);
    }

    fn refresh(&mut self) {
        let generation = self.shared.generation();
        if generation == self.seen_generation {
            return;
        }
        // Contended: keep the previous set for this block
        let settings = match self.shared.settings.try_lock() {
            Some(guard) => *guard,
            None => return,
        };
        self.cascade.apply(&settings);
        self.seen_generation = generation;
    }
}

impl Processor for EqProcessor {
    fn reset(&mut self) {
        self.cascade.reset();
    }
}
