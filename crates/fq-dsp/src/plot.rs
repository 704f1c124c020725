//! Response plotting
//!
//! ## Contents
//! - `FrequencyGrid` - the fixed 300-point logarithmic frequency axis
//! - `aggregate` - combine band curves and output gain into one response
//! - `create_frequency_plot` - map a magnitude curve to device coordinates
//! - `ResponseNotifier` - change notification for display invalidation

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::OnceLock;

// ============ Frequency Grid ============

/// Number of points on the frequency grid
pub const NUM_POINTS: usize = 300;

/// Grid resolution
pub const POINTS_PER_OCTAVE: usize = 30;

/// First grid frequency in Hz
pub const GRID_START: f64 = 20.0;

/// Magnitudes are floored here before taking the log
const MIN_PLOT_MAGNITUDE: f64 = 1e-12;

/// Logarithmically spaced frequency axis: `freq[i] = 20 * 2^(i / 30)`
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyGrid {
    frequencies: Vec<f64>,
}

impl FrequencyGrid {
    pub fn new() -> Self {
        let frequencies = (0..NUM_POINTS)
            .map(|i| GRID_START * 2.0_f64.powf(i as f64 / POINTS_PER_OCTAVE as f64))
            .collect();
        Self { frequencies }
    }

    /// Process-wide grid, computed on first use
    pub fn shared() -> &'static FrequencyGrid {
        static GRID: OnceLock<FrequencyGrid> = OnceLock::new();
        GRID.get_or_init(FrequencyGrid::new)
    }

    #[inline]
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Index of the grid point closest to `freq` (in octaves)
    pub fn nearest_index(&self, freq: f64) -> usize {
        if freq <= GRID_START {
            return 0;
        }
        let idx = ((freq / GRID_START).log2() * POINTS_PER_OCTAVE as f64).round() as usize;
        idx.min(NUM_POINTS - 1)
    }
}

impl Default for FrequencyGrid {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Aggregation ============

/// Fill `out` with `output_gain` and multiply every curve in pointwise
pub fn aggregate<'a>(
    output_gain: f64,
    curves: impl IntoIterator<Item = &'a [f64]>,
    out: &mut [f64],
) {
    out.fill(output_gain);
    for curve in curves {
        for (o, &m) in out.iter_mut().zip(curve) {
            *o *= m;
        }
    }
}

// ============ Plot Path ============

/// Integer device-space rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlotBounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PlotBounds {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn centre_y(&self) -> i32 {
        self.y + self.height / 2
    }
}

/// Polyline in device coordinates, one point per grid frequency
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlotPath {
    points: Vec<(i32, i32)>,
}

impl PlotPath {
    #[inline]
    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Start point of the path
    pub fn start(&self) -> Option<(i32, i32)> {
        self.points.first().copied()
    }
}

/// Map a linear magnitude curve to a log-frequency / log-magnitude path.
///
/// The first point sits at `bounds.x`; point `i` at
/// `x = bounds.x + i * width / len`, `y = centreY - ppo * log2(mag[i])`,
/// both rounded to whole pixels.
pub fn create_frequency_plot(
    magnitudes: &[f64],
    bounds: PlotBounds,
    pixels_per_octave: f64,
) -> PlotPath {
    let centre_y = bounds.centre_y() as f64;
    let y_for = |mag: f64| {
        (centre_y - pixels_per_octave * mag.max(MIN_PLOT_MAGNITUDE).log2()).round() as i32
    };

    let Some(&first) = magnitudes.first() else {
        return PlotPath::default();
    };

    let x_factor = bounds.width as f64 / magnitudes.len() as f64;
    let mut points = Vec::with_capacity(magnitudes.len());
    points.push((bounds.x, y_for(first)));
    for (i, &mag) in magnitudes.iter().enumerate().skip(1) {
        let x = (bounds.x as f64 + i as f64 * x_factor).round() as i32;
        points.push((x, y_for(mag)));
    }

    PlotPath { points }
}

// ============ Change Notification ============

/// Publishes a monotonically increasing generation whenever the aggregate
/// response changes.
///
/// Each subscriber gets a one-slot channel; a subscriber that has not yet
/// drained its slot simply coalesces further notifications.
#[derive(Debug, Default)]
pub struct ResponseNotifier {
    generation: u64,
    subscribers: Vec<Sender<u64>>,
}

impl ResponseNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer
    pub fn subscribe(&mut self) -> Receiver<u64> {
        let (tx, rx) = bounded(1);
        self.subscribers.push(tx);
        rx
    }

    /// Bump the generation and wake subscribers
    pub fn notify(&mut self) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        self.subscribers.retain(|tx| match tx.try_send(generation) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => {
                log::trace!("[EQ] Dropping disconnected response subscriber");
                false
            }
        });
        generation
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_spacing() {
        let grid = FrequencyGrid::new();
        assert_eq!(grid.len(), NUM_POINTS);
        assert_eq!(grid.frequencies()[0], 20.0);
        assert!((grid.frequencies()[30] - 40.0).abs() < 1e-9);
        assert!((grid.frequencies()[299] - 20.0 * 2.0_f64.powf(299.0 / 30.0)).abs() < 1e-9);
        assert!(grid.frequencies().windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_nearest_index() {
        let grid = FrequencyGrid::shared();
        assert_eq!(grid.nearest_index(1.0), 0);
        assert_eq!(grid.nearest_index(40.0), 30);
        assert_eq!(grid.nearest_index(1_000_000.0), NUM_POINTS - 1);
    }

    #[test]
    fn test_aggregate() {
        let a = [2.0, 1.0, 0.5];
        let b = [0.5, 3.0, 1.0];
        let mut out = [0.0; 3];
        aggregate(2.0, [&a[..], &b[..]], &mut out);
        assert_eq!(out, [2.0, 6.0, 1.0]);

        aggregate(0.5, std::iter::empty(), &mut out);
        assert_eq!(out, [0.5; 3]);
    }

    #[test]
    fn test_flat_curve_sits_on_centre() {
        let bounds = PlotBounds::new(10, 20, 600, 301);
        let path = create_frequency_plot(&[1.0; NUM_POINTS], bounds, 40.0);
        assert_eq!(path.len(), NUM_POINTS);
        assert_eq!(path.start(), Some((10, bounds.centre_y())));
        assert!(path.points().iter().all(|&(_, y)| y == bounds.centre_y()));
        assert_eq!(path.points()[150].0, 10 + 300);
    }

    #[test]
    fn test_octave_maps_to_ppo() {
        let bounds = PlotBounds::new(0, 0, 300, 200);
        let path = create_frequency_plot(&[2.0, 0.5, 4.0], bounds, 25.0);
        assert_eq!(path.points(), &[(0, 75), (100, 125), (200, 50)]);
    }

    #[test]
    fn test_zero_magnitude_is_finite() {
        let path = create_frequency_plot(&[0.0], PlotBounds::new(0, 0, 100, 100), 10.0);
        assert_eq!(path.len(), 1);
        assert!(path.points()[0].1 > 100);
        assert!(create_frequency_plot(&[], PlotBounds::default(), 10.0).is_empty());
    }

    #[test]
    fn test_notifier_coalesces() {
        let mut notifier = ResponseNotifier::new();
        let rx = notifier.subscribe();
        notifier.notify();
        notifier.notify();
        assert_eq!(rx.try_recv(), Ok(1));
        assert!(rx.try_recv().is_err());
        assert_eq!(notifier.notify(), 3);
        assert_eq!(rx.try_recv(), Ok(3));
    }

    #[test]
    fn test_notifier_drops_closed_subscribers() {
        let mut notifier = ResponseNotifier::new();
        let rx = notifier.subscribe();
        drop(notifier.subscribe());
        notifier.notify();
        assert_eq!(notifier.subscriber_count(), 1);
        drop(rx);
        notifier.notify();
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
