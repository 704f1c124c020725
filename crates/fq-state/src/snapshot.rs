//! Persisted equalizer state

use fq_core::{FqError, FqResult};
use fq_dsp::eq::Band;
use fq_dsp::{BandParams, Equalizer, NUM_BANDS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::params::{ParamField, ParamLayout};

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to reproduce an equalizer's coefficients and response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqSnapshot {
    pub version: u32,
    pub output_gain: f64,
    pub bands: [BandParams; NUM_BANDS],
    #[serde(default)]
    pub solo: Option<usize>,
}

impl Default for EqSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            output_gain: 1.0,
            bands: std::array::from_fn(|i| Band::factory_params(i).unwrap_or_default()),
            solo: None,
        }
    }
}

impl EqSnapshot {
    /// Capture the current state of `eq`
    pub fn capture(eq: &Equalizer) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            output_gain: eq.output_gain(),
            bands: std::array::from_fn(|i| eq.bands()[i].params()),
            solo: eq.soloed(),
        }
    }

    /// Re-apply every field through the regular update path
    pub fn restore(&self, eq: &mut Equalizer) {
        for (index, params) in self.bands.iter().enumerate() {
            eq.set_band_params(index, *params);
        }
        eq.set_band_solo(self.solo);
        eq.set_output_gain(self.output_gain);
        log::debug!("[STATE] Restored snapshot (solo {:?})", self.solo);
    }

    pub fn to_json(&self) -> FqResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> FqResult<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(FqError::SnapshotVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> FqResult<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        log::info!("[STATE] Saved snapshot to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> FqResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Flat host parameter map (`id -> value`). Solo is not a host parameter.
    pub fn to_param_map(&self, layout: &ParamLayout) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        map.insert(crate::params::OUTPUT_ID.to_string(), self.output_gain);
        for (band, params) in self.bands.iter().enumerate() {
            for field in ParamField::ALL {
                let value = match field {
                    ParamField::Type => params.filter_type.index() as f64,
                    ParamField::Frequency => params.frequency,
                    ParamField::Quality => params.quality,
                    ParamField::Gain => params.gain,
                    ParamField::Active => {
                        if params.active {
                            1.0
                        } else {
                            0.0
                        }
                    }
                };
                if let Some(id) = layout.band_id(band, field) {
                    map.insert(id, value);
                }
            }
        }
        map
    }

    /// Build a snapshot from a host parameter map. Missing ids keep their
    /// factory defaults, unknown ids are ignored.
    pub fn from_param_map(map: &BTreeMap<String, f64>, layout: &ParamLayout) -> Self {
        let mut eq = Equalizer::new();
        for (id, value) in map {
            if let Some(change) = layout.decode(id, *value) {
                eq.apply(change);
            }
        }
        Self::capture(&eq)
    }
}
