//! Configuration for offline rendering

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Offline render configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Samples per processing block
    pub block_size: usize,

    /// Equalizer state to apply (factory defaults when unset)
    pub snapshot: Option<PathBuf>,

    /// Sample rate used for response and plot output
    pub response_sample_rate: f64,

    /// Output bit depth (None = same as input)
    pub bit_depth: Option<u16>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            block_size: 512,
            snapshot: None,
            response_sample_rate: 48000.0,
            bit_depth: None,
        }
    }
}

impl RenderConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Set block size
    pub fn with_block_size(mut self, size: usize) -> Self {
        self.block_size = size.max(1);
        self
    }

    /// Set snapshot path
    pub fn with_snapshot(mut self, path: PathBuf) -> Self {
        self.snapshot = Some(path);
        self
    }

    /// Set response sample rate
    pub fn with_response_sample_rate(mut self, sample_rate: f64) -> Self {
        self.response_sample_rate = sample_rate;
        self
    }
}
