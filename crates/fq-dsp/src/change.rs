//! Typed parameter change events
//!
//! String parameter ids exist only at the host/persistence edge (see
//! `fq-state`); inside the engine every update is one of these values.

use serde::{Deserialize, Serialize};

use crate::biquad::FilterType;

/// Change to a single band field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BandChange {
    Type(FilterType),
    Frequency(f64),
    Quality(f64),
    /// Linear gain
    Gain(f64),
    Active(bool),
}

/// Equalizer parameter change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamChange {
    Band { band: usize, change: BandChange },
    /// Linear output gain
    OutputGain(f64),
}

impl ParamChange {
    pub fn band(band: usize, change: BandChange) -> Self {
        ParamChange::Band { band, change }
    }
}
