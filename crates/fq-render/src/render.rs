//! Offline rendering and response export

use anyhow::{Context, Result, bail};
use fq_core::{Decibels, ProcessSpec, Sample, StereoBuffer};
use fq_dsp::{Equalizer, PlotBounds, PlotPath};
use fq_state::EqSnapshot;
use std::path::Path;

use crate::config::RenderConfig;

/// Interleaved audio loaded from or written to disk
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<Sample>,
    pub channels: usize,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl AudioData {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0_f64, |peak, s| peak.max(s.abs()))
    }
}

/// Summary of a finished render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStats {
    pub frames: usize,
    pub channels: usize,
    pub sample_rate: u32,
    pub peak_in: f64,
    pub peak_out: f64,
}

// ============ WAV I/O ============

/// Load a WAV file as normalized f64 samples
pub fn load_wav(path: &Path) -> Result<AudioData> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let spec = reader.spec();
    let samples: Vec<Sample> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f64 / max_val))
                .collect::<Result<_, _>>()?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
    };

    Ok(AudioData {
        samples,
        channels: usize::from(spec.channels),
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
    })
}

/// Write interleaved samples; 32 bits is float, 16/24 are integer
pub fn write_wav(path: &Path, audio: &AudioData) -> Result<()> {
    let spec = hound::WavSpec {
        channels: u16::try_from(audio.channels).context("too many channels")?,
        sample_rate: audio.sample_rate,
        bits_per_sample: audio.bits_per_sample,
        sample_format: if audio.bits_per_sample == 32 {
            hound::SampleFormat::Float
        } else {
            hound::SampleFormat::Int
        },
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;

    match audio.bits_per_sample {
        16 => {
            for &sample in &audio.samples {
                writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
            }
        }
        24 => {
            for &sample in &audio.samples {
                writer.write_sample((sample.clamp(-1.0, 1.0) * 8388607.0) as i32)?;
            }
        }
        32 => {
            for &sample in &audio.samples {
                writer.write_sample(sample as f32)?;
            }
        }
        other => bail!("unsupported bit depth: {other}"),
    }

    writer.finalize()?;
    Ok(())
}

// ============ Equalizer ============

/// Snapshot named by the config, or factory defaults
pub fn load_snapshot(config: &RenderConfig) -> Result<EqSnapshot> {
    match &config.snapshot {
        Some(path) => EqSnapshot::load(path)
            .with_context(|| format!("loading snapshot {}", path.display())),
        None => Ok(EqSnapshot::default()),
    }
}

/// Equalizer configured from `snapshot` at `sample_rate`
pub fn build_equalizer(snapshot: &EqSnapshot, spec: &ProcessSpec) -> Equalizer {
    let mut eq = Equalizer::new();
    eq.prepare(spec);
    snapshot.restore(&mut eq);
    eq
}

/// Run `input` through the equalizer block by block
pub fn render(input: &AudioData, snapshot: &EqSnapshot, config: &RenderConfig) -> AudioData {
    let channels = input.channels.max(1);
    let block_size = config.block_size.max(1);
    let spec = ProcessSpec::stereo(f64::from(input.sample_rate), block_size);

    let eq = build_equalizer(snapshot, &spec);
    let mut processor = eq.processor();
    processor.prepare(&spec);

    let mut samples = input.samples.clone();
    for chunk in samples.chunks_mut(block_size * channels) {
        let mut buffer = StereoBuffer::from_interleaved(chunk, channels);
        processor.process_stereo(&mut buffer);
        buffer.write_interleaved(channels, chunk);
    }

    AudioData {
        samples,
        channels,
        sample_rate: input.sample_rate,
        bits_per_sample: config.bit_depth.unwrap_or(input.bits_per_sample),
    }
}

/// Render a WAV file to another WAV file
pub fn render_file(input: &Path, output: &Path, config: &RenderConfig) -> Result<RenderStats> {
    let snapshot = load_snapshot(config)?;
    let audio = load_wav(input)?;
    if audio.channels > 2 {
        log::warn!(
            "[RENDER] {} has {} channels, only the first two are equalized",
            input.display(),
            audio.channels
        );
    }

    let rendered = render(&audio, &snapshot, config);
    write_wav(output, &rendered)?;

    let stats = RenderStats {
        frames: rendered.frames(),
        channels: rendered.channels,
        sample_rate: rendered.sample_rate,
        peak_in: audio.peak(),
        peak_out: rendered.peak(),
    };
    log::info!(
        "[RENDER] {} -> {}: {} frames, peak {:.1} dB -> {:.1} dB",
        input.display(),
        output.display(),
        stats.frames,
        Decibels::from_gain(stats.peak_in).0,
        Decibels::from_gain(stats.peak_out).0
    );
    Ok(stats)
}

// ============ Response ============

/// `(frequency, linear magnitude)` of the aggregate response
pub fn response(snapshot: &EqSnapshot, sample_rate: f64) -> Result<Vec<(f64, f64)>> {
    if !fq_core::is_valid_sample_rate(sample_rate) {
        bail!("invalid sample rate: {sample_rate}");
    }
    let eq = build_equalizer(snapshot, &ProcessSpec::stereo(sample_rate, 512));
    Ok(eq
        .frequencies()
        .iter()
        .copied()
        .zip(eq.magnitudes().iter().copied())
        .collect())
}

/// CSV with frequency, linear magnitude and dB columns
pub fn response_csv(points: &[(f64, f64)]) -> String {
    let mut csv = String::from("frequency_hz,magnitude,db\n");
    for &(freq, mag) in points {
        csv.push_str(&format!(
            "{freq:.3},{mag:.6},{:.3}\n",
            Decibels::from_gain(mag).0
        ));
    }
    csv
}

/// Device-space plot of the aggregate response
pub fn response_plot(
    snapshot: &EqSnapshot,
    sample_rate: f64,
    bounds: PlotBounds,
    pixels_per_octave: f64,
) -> Result<PlotPath> {
    if !fq_core::is_valid_sample_rate(sample_rate) {
        bail!("invalid sample rate: {sample_rate}");
    }
    let eq = build_equalizer(snapshot, &ProcessSpec::stereo(sample_rate, 512));
    Ok(eq.response_plot(bounds, pixels_per_octave))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fq_dsp::FilterType;

    fn sine(frames: usize, channels: usize, freq: f64, sample_rate: u32) -> AudioData {
        let samples = (0..frames)
            .flat_map(|i| {
                let s = 0.25
                    * (2.0 * std::f64::consts::PI * freq * i as f64 / f64::from(sample_rate)).sin();
                std::iter::repeat_n(s, channels)
            })
            .collect();
        AudioData {
            samples,
            channels,
            sample_rate,
            bits_per_sample: 32,
        }
    }

    fn flat_snapshot() -> EqSnapshot {
        let mut snapshot = EqSnapshot::default();
        for band in &mut snapshot.bands {
            band.filter_type = FilterType::NoFilter;
        }
        snapshot
    }

    #[test]
    fn test_flat_render_is_transparent() {
        let input = sine(4800, 2, 440.0, 48000);
        let output = render(&input, &flat_snapshot(), &RenderConfig::default());
        assert_eq!(output.samples, input.samples);
    }

    #[test]
    fn test_mono_render_keeps_layout() {
        let input = sine(1000, 1, 440.0, 44100);
        let mut snapshot = flat_snapshot();
        snapshot.output_gain = 0.5;
        let output = render(&input, &snapshot, &RenderConfig::default().with_block_size(64));
        assert_eq!(output.channels, 1);
        assert_eq!(output.samples.len(), input.samples.len());
        for (o, i) in output.samples.iter().zip(&input.samples) {
            assert_relative_eq!(*o, i * 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_extra_channels_pass_through() {
        let input = AudioData {
            samples: [0.1, 0.2, 0.3, 0.4].repeat(300),
            channels: 4,
            sample_rate: 48000,
            bits_per_sample: 32,
        };
        let mut snapshot = flat_snapshot();
        snapshot.output_gain = 0.5;
        let output = render(&input, &snapshot, &RenderConfig::default().with_block_size(64));

        assert_eq!(output.channels, 4);
        assert_eq!(output.samples.len(), input.samples.len());
        for frame in output.samples.chunks_exact(4) {
            assert_relative_eq!(frame[0], 0.05, epsilon = 1e-12);
            assert_relative_eq!(frame[1], 0.1, epsilon = 1e-12);
            assert_eq!(&frame[2..], &[0.3, 0.4]);
        }
    }

    #[test]
    fn test_wav_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("in.wav");
        let output_path = dir.path().join("out.wav");
        let snapshot_path = dir.path().join("eq.json");

        write_wav(&input_path, &sine(9600, 2, 1000.0, 48000)).unwrap();
        let mut snapshot = EqSnapshot::default();
        snapshot.bands[3].gain = 2.0;
        snapshot.save(&snapshot_path).unwrap();

        let config = RenderConfig::default().with_snapshot(snapshot_path);
        let stats = render_file(&input_path, &output_path, &config).unwrap();
        assert_eq!(stats.frames, 9600);
        assert_eq!(stats.channels, 2);
        assert_relative_eq!(stats.peak_out / stats.peak_in, 2.0, epsilon = 0.1);

        let rendered = load_wav(&output_path).unwrap();
        assert_eq!(rendered.frames(), 9600);
        assert_eq!(rendered.sample_rate, 48000);
    }

    #[test]
    fn test_sixteen_bit_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out16.wav");
        let mut audio = sine(100, 2, 440.0, 44100);
        audio.bits_per_sample = 16;
        write_wav(&path, &audio).unwrap();

        let loaded = load_wav(&path).unwrap();
        assert_eq!(loaded.bits_per_sample, 16);
        for (a, b) in loaded.samples.iter().zip(&audio.samples) {
            assert!((a - b).abs() < 1e-4);
        }

        audio.bits_per_sample = 12;
        assert!(write_wav(&dir.path().join("bad.wav"), &audio).is_err());
    }

    #[test]
    fn test_response_table() {
        let points = response(&EqSnapshot::default(), 48000.0).unwrap();
        assert_eq!(points.len(), fq_dsp::plot::NUM_POINTS);
        assert_eq!(points[0].0, 20.0);

        let csv = response_csv(&points[..2]);
        assert!(csv.starts_with("frequency_hz,magnitude,db\n20.000,"));
        assert_eq!(csv.lines().count(), 3);

        assert!(response(&EqSnapshot::default(), 0.0).is_err());
    }

    #[test]
    fn test_response_plot_flat() {
        let bounds = PlotBounds::new(0, 0, 600, 400);
        let path = response_plot(&flat_snapshot(), 48000.0, bounds, 40.0).unwrap();
        assert_eq!(path.len(), fq_dsp::plot::NUM_POINTS);
        assert!(path.points().iter().all(|&(_, y)| y == 200));
    }
}
