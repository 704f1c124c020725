//! Parameter layout
//!
//! Ids are `"output"` and `"<band name>-<field>"`, e.g. `"Low Mids-gain"`.

use fq_core::{Decibels, FqError, FqResult, ParamRange};
use fq_dsp::eq::{self, Band};
use fq_dsp::{BandChange, FilterType, NUM_BANDS, ParamChange};
use serde::{Deserialize, Serialize};

/// Output gain parameter id
pub const OUTPUT_ID: &str = "output";

/// Per-band parameter field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamField {
    Type,
    Frequency,
    Quality,
    Gain,
    Active,
}

impl ParamField {
    pub const ALL: [ParamField; 5] = [
        ParamField::Type,
        ParamField::Frequency,
        ParamField::Quality,
        ParamField::Gain,
        ParamField::Active,
    ];

    /// Id suffix after `"<band name>-"`
    pub fn suffix(self) -> &'static str {
        match self {
            ParamField::Type => "type",
            ParamField::Frequency => "frequency",
            ParamField::Quality => "quality",
            ParamField::Gain => "gain",
            ParamField::Active => "active",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.suffix() == suffix)
    }

    fn display_suffix(self) -> &'static str {
        match self {
            ParamField::Type => "Type",
            ParamField::Frequency => "freq",
            ParamField::Quality => "Q",
            ParamField::Gain => "gain",
            ParamField::Active => "active",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ParamField::Type => "Filter Type",
            ParamField::Frequency => "Frequency",
            ParamField::Quality => "Quality",
            ParamField::Gain => "Gain",
            ParamField::Active => "Active",
        }
    }
}

/// Decoded parameter id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    Output,
    Band { band: usize, field: ParamField },
}

/// Registration data for one host parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub id: String,
    pub name: String,
    pub label: String,
    pub range: ParamRange,
}

/// Every parameter the equalizer registers with a host
#[derive(Debug, Clone)]
pub struct ParamLayout {
    band_names: [&'static str; NUM_BANDS],
    specs: Vec<ParamSpec>,
}

impl Default for ParamLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamLayout {
    pub fn new() -> Self {
        let band_names: [&'static str; NUM_BANDS] = std::array::from_fn(|i| {
            Band::factory(i).map_or(eq::UNKNOWN_BAND_NAME, |band| band.name())
        });

        let mut specs = Vec::with_capacity(1 + NUM_BANDS * ParamField::ALL.len());
        specs.push(ParamSpec {
            id: OUTPUT_ID.to_string(),
            name: "Output".to_string(),
            label: "Output level".to_string(),
            range: eq::output_gain_range(),
        });

        for (band, name) in band_names.iter().enumerate() {
            let defaults = Band::factory_params(band).unwrap_or_default();
            for field in ParamField::ALL {
                let range = match field {
                    ParamField::Type => ParamRange::new(
                        0.0,
                        FilterType::COUNT as f64,
                        1.0,
                        defaults.filter_type.index() as f64,
                    ),
                    ParamField::Frequency => ParamRange {
                        default: defaults.frequency,
                        ..eq::frequency_range()
                    },
                    ParamField::Quality => ParamRange {
                        default: defaults.quality,
                        ..eq::quality_range()
                    },
                    ParamField::Gain => ParamRange {
                        default: defaults.gain,
                        ..eq::gain_range()
                    },
                    ParamField::Active => {
                        ParamRange::new(0.0, 1.0, 1.0, if defaults.active { 1.0 } else { 0.0 })
                    }
                };
                specs.push(ParamSpec {
                    id: band_param_id(name, field),
                    name: format!("{name} {}", field.display_suffix()),
                    label: field.label().to_string(),
                    range,
                });
            }
        }

        Self { band_names, specs }
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    pub fn spec(&self, id: &str) -> Option<&ParamSpec> {
        self.specs.iter().find(|spec| spec.id == id)
    }

    /// Id of `field` on band `band`
    pub fn band_id(&self, band: usize, field: ParamField) -> Option<String> {
        self.band_names
            .get(band)
            .map(|name| band_param_id(name, field))
    }

    pub fn parse_id(&self, id: &str) -> Option<ParamId> {
        if id == OUTPUT_ID {
            return Some(ParamId::Output);
        }
        self.band_names.iter().enumerate().find_map(|(band, name)| {
            let suffix = id.strip_prefix(name)?.strip_prefix('-')?;
            ParamField::from_suffix(suffix).map(|field| ParamId::Band { band, field })
        })
    }

    /// Decode a host `(id, value)` pair. Unknown ids are ignored.
    pub fn decode(&self, id: &str, value: f64) -> Option<ParamChange> {
        let Some(param) = self.parse_id(id) else {
            log::trace!("[PARAMS] Ignoring unknown parameter {id:?}");
            return None;
        };
        let change = match param {
            ParamId::Output => ParamChange::OutputGain(value),
            ParamId::Band { band, field } => ParamChange::band(
                band,
                match field {
                    ParamField::Type => BandChange::Type(FilterType::from_value(value)),
                    ParamField::Frequency => BandChange::Frequency(value),
                    ParamField::Quality => BandChange::Quality(value),
                    ParamField::Gain => BandChange::Gain(value),
                    ParamField::Active => BandChange::Active(value >= 0.5),
                },
            ),
        };
        Some(change)
    }

    /// Inverse of [`decode`](Self::decode)
    pub fn encode(&self, change: &ParamChange) -> Option<(String, f64)> {
        match *change {
            ParamChange::OutputGain(gain) => Some((OUTPUT_ID.to_string(), gain)),
            ParamChange::Band { band, change } => {
                let (field, value) = match change {
                    BandChange::Type(filter_type) => (ParamField::Type, filter_type.index() as f64),
                    BandChange::Frequency(frequency) => (ParamField::Frequency, frequency),
                    BandChange::Quality(quality) => (ParamField::Quality, quality),
                    BandChange::Gain(gain) => (ParamField::Gain, gain),
                    BandChange::Active(active) => {
                        (ParamField::Active, if active { 1.0 } else { 0.0 })
                    }
                };
                self.band_id(band, field).map(|id| (id, value))
            }
        }
    }

    /// Host display text for a parameter value
    pub fn value_to_text(&self, id: &str, value: f64) -> FqResult<String> {
        let field = self.field_of(id)?;

        let text = match field {
            None | Some(ParamField::Gain) => format!("{:.1} dB", Decibels::from_gain(value).0),
            Some(ParamField::Type) => FilterType::from_value(value).name().to_string(),
            Some(ParamField::Frequency) if value < 1000.0 => format!("{value:.0} Hz"),
            Some(ParamField::Frequency) => format!("{:.2} kHz", value / 1000.0),
            Some(ParamField::Quality) => format!("{value:.1}"),
            Some(ParamField::Active) if value >= 0.5 => "active".to_string(),
            Some(ParamField::Active) => "bypassed".to_string(),
        };
        Ok(text)
    }

    /// Parse host display text back into a parameter value
    pub fn text_to_value(&self, id: &str, text: &str) -> FqResult<f64> {
        let field = self.field_of(id)?;
        let text = text.trim();
        let number = |s: &str| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| FqError::InvalidParamText {
                    id: id.to_string(),
                    text: text.to_string(),
                })
        };

        match field {
            None | Some(ParamField::Gain) => {
                let db = number(text.strip_suffix("dB").unwrap_or(text))?;
                Ok(Decibels(db).to_gain())
            }
            Some(ParamField::Type) => Ok(FilterType::from_name(text).index() as f64),
            Some(ParamField::Frequency) => match text.strip_suffix("kHz") {
                Some(khz) => Ok(number(khz)? * 1000.0),
                None => number(text.strip_suffix("Hz").unwrap_or(text)),
            },
            Some(ParamField::Quality) => number(text),
            Some(ParamField::Active) => Ok(if text == "active" { 1.0 } else { 0.0 }),
        }
    }

    /// Band field addressed by `id`; `None` for the output gain
    fn field_of(&self, id: &str) -> FqResult<Option<ParamField>> {
        match self.parse_id(id) {
            Some(ParamId::Output) => Ok(None),
            Some(ParamId::Band { field, .. }) => Ok(Some(field)),
            None => Err(FqError::UnknownParam(id.to_string())),
        }
    }
}

fn band_param_id(band_name: &str, field: ParamField) -> String {
    format!("{band_name}-{}", field.suffix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_layout_ids() {
        let layout = ParamLayout::new();
        assert_eq!(layout.specs().len(), 31);
        assert_eq!(layout.specs()[0].id, "output");
        assert!(layout.spec("Lowest-type").is_some());
        assert!(layout.spec("Highest-active").is_some());
        assert_eq!(layout.spec("Low Mids-gain").map(|s| s.name.as_str()), Some("Low Mids gain"));
        assert_eq!(layout.spec("High-frequency").map(|s| s.range.default), Some(5000.0));
        assert_eq!(layout.spec("Lowest-quality").map(|s| s.range.default), Some(0.707));
        assert_eq!(layout.spec("Highest-type").map(|s| s.range.default), Some(11.0));
    }

    #[test]
    fn test_parse_id_prefers_exact_band() {
        let layout = ParamLayout::new();
        assert_eq!(
            layout.parse_id("Low-gain"),
            Some(ParamId::Band { band: 1, field: ParamField::Gain })
        );
        assert_eq!(
            layout.parse_id("Low Mids-gain"),
            Some(ParamId::Band { band: 2, field: ParamField::Gain })
        );
        assert_eq!(
            layout.parse_id("High-type"),
            Some(ParamId::Band { band: 4, field: ParamField::Type })
        );
        assert_eq!(layout.parse_id("Low-tilt"), None);
        assert_eq!(layout.parse_id("Lowish-gain"), None);
    }

    #[test]
    fn test_decode() {
        let layout = ParamLayout::new();
        assert_eq!(layout.decode("output", 0.5), Some(ParamChange::OutputGain(0.5)));
        assert_eq!(
            layout.decode("Low Mids-type", 7.6),
            Some(ParamChange::band(2, BandChange::Type(FilterType::Peak)))
        );
        assert_eq!(
            layout.decode("Highest-type", 12.0),
            Some(ParamChange::band(5, BandChange::Type(FilterType::NoFilter)))
        );
        assert_eq!(
            layout.decode("High-active", 0.5),
            Some(ParamChange::band(4, BandChange::Active(true)))
        );
        assert_eq!(
            layout.decode("High-active", 0.49),
            Some(ParamChange::band(4, BandChange::Active(false)))
        );
        assert_eq!(layout.decode("mystery", 1.0), None);
    }

    #[test]
    fn test_encode_inverts_decode() {
        let layout = ParamLayout::new();
        for (id, value) in [
            ("output", 1.25),
            ("Lowest-type", 3.0),
            ("Low-frequency", 440.0),
            ("High Mids-quality", 2.5),
            ("High-gain", 0.5),
            ("Highest-active", 0.0),
        ] {
            let change = layout.decode(id, value).unwrap();
            assert_eq!(layout.encode(&change), Some((id.to_string(), value)));
        }
        assert_eq!(layout.encode(&ParamChange::band(6, BandChange::Gain(1.0))), None);
    }

    #[test]
    fn test_text_converters() {
        let layout = ParamLayout::new();
        assert_eq!(layout.value_to_text("output", 1.0).unwrap(), "0.0 dB");
        assert_eq!(layout.value_to_text("Low-gain", 2.0).unwrap(), "6.0 dB");
        assert_eq!(layout.value_to_text("Low-frequency", 250.0).unwrap(), "250 Hz");
        assert_eq!(layout.value_to_text("Low-frequency", 12500.0).unwrap(), "12.50 kHz");
        assert_eq!(layout.value_to_text("Low-quality", 0.707).unwrap(), "0.7");
        assert_eq!(layout.value_to_text("Low-active", 1.0).unwrap(), "active");
        assert_eq!(layout.value_to_text("Low-active", 0.0).unwrap(), "bypassed");
        assert_eq!(layout.value_to_text("Low-type", 9.0).unwrap(), "High Shelf");
        assert!(layout.value_to_text("nope", 1.0).is_err());
    }

    #[test]
    fn test_text_parsers() {
        let layout = ParamLayout::new();
        assert_relative_eq!(layout.text_to_value("output", "0.0 dB").unwrap(), 1.0);
        assert_relative_eq!(
            layout.text_to_value("Low-gain", "6.0 dB").unwrap(),
            1.9953,
            epsilon = 1e-4
        );
        assert_eq!(layout.text_to_value("Low-frequency", "250 Hz").unwrap(), 250.0);
        assert_eq!(layout.text_to_value("Low-frequency", "12.50 kHz").unwrap(), 12500.0);
        assert_eq!(layout.text_to_value("Low-quality", "2.5").unwrap(), 2.5);
        assert_eq!(layout.text_to_value("Low-active", "active").unwrap(), 1.0);
        assert_eq!(layout.text_to_value("Low-active", "bypassed").unwrap(), 0.0);
        assert_eq!(layout.text_to_value("Low-type", "Notch").unwrap(), 7.0);
        assert_eq!(layout.text_to_value("Low-type", "Tilt").unwrap(), 0.0);

        assert!(matches!(
            layout.text_to_value("Low-quality", "wide"),
            Err(FqError::InvalidParamText { .. })
        ));
        assert!(matches!(
            layout.text_to_value("nope", "1"),
            Err(FqError::UnknownParam(_))
        ));
    }
}
