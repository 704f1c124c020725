//! fq-state: Parameter contract and persisted state
//!
//! The host-facing side of the equalizer. String parameter ids, ranges and
//! text converters live here and are decoded into typed
//! [`fq_dsp::ParamChange`] events before reaching the engine.

mod params;
mod snapshot;

pub use params::*;
pub use snapshot::*;
