//! fq-dsp: Equalizer engine for Frequalizer
//!
//! Six cascaded biquad stages on a stereo stream, with a control-side band
//! model that keeps a magnitude-response plot in sync with the audio path.
//!
//! ## Modules
//! - `biquad` - Filter types, per-type coefficient design, TDF-II biquad
//! - `cascade` - Filter bands, the six-stage cascade and the audio-thread processor
//! - `eq` - Band model, update protocol, solo/bypass state
//! - `change` - Typed parameter change events
//! - `plot` - Frequency grid, response aggregation, plot paths, change notification

pub mod biquad;
pub mod cascade;
pub mod change;
pub mod eq;
pub mod plot;

pub use biquad::{BiquadCoeffs, BiquadTDF2, FilterType};
pub use cascade::{CascadeSettings, EqProcessor, FilterBand, FilterCascade, NUM_BANDS, SharedCascade};
pub use change::{BandChange, ParamChange};
pub use eq::{Band, BandParams, Colour, Equalizer};
pub use plot::{FrequencyGrid, PlotBounds, PlotPath};

use fq_core::Sample;

/// Trait for all DSP processors
pub trait Processor: Send {
    /// Reset processor state
    fn reset(&mut self);

    /// Get latency in samples
    fn latency(&self) -> usize {
        0
    }
}

/// Mono processor trait
pub trait MonoProcessor: Processor {
    /// Process a single sample
    fn process_sample(&mut self, input: Sample) -> Sample;

    /// Process a block of samples
    fn process_block(&mut self, buffer: &mut [Sample]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}
