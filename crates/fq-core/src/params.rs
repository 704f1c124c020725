//! Parameter types for audio processors

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic parameter for lock-free access
#[derive(Debug)]
pub struct AtomicParam {
    bits: AtomicU64,
}

impl AtomicParam {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for AtomicParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Linear parameter range, optionally stepped
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
    /// Snapping interval, 0.0 = continuous
    pub step: f64,
    pub default: f64,
}

impl ParamRange {
    pub fn new(min: f64, max: f64, step: f64, default: f64) -> Self {
        Self {
            min,
            max,
            step,
            default,
        }
    }

    /// Clamp into range; non-finite input falls back to the default
    pub fn clamp(&self, value: f64) -> f64 {
        if !value.is_finite() {
            log::warn!("Non-finite parameter value {value}, using default {}", self.default);
            return self.default;
        }
        value.clamp(self.min, self.max)
    }
}
