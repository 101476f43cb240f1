//! Tracker - Pitch stabilisation and display-window auto-follow.
//!
//! Raw per-frame estimates jitter, drop out on unvoiced frames and jump an
//! octave now and then. [`PitchTracker::smooth`] turns the recent history
//! into one stable value; [`FollowController`] recommends how a display
//! window should drift to keep that value centred.
//!
//! # Smoothing
//!
//! History is read newest first, limited to the 30 most recent samples:
//!
//! 1. A sample is discarded if it lies outside `[50, 1500]` Hz or differs
//!    from the next older sample by more than 3×.
//! 2. A run is a sequence of kept samples whose adjacent ratios stay within
//!    `[1/1.5, 1.5]`. Runs are scanned from newest to oldest and the last
//!    one spanning at least 5 adjacent pairs is the stable segment; without
//!    one there is no pitch.
//! 3. Sample `i` of the segment (0 = newest) is repeated
//!    `ceil(exp(-0.5·i)·10)` times, and the median of that multiset is the
//!    result.

use tracing::trace;

use crate::error::{Error, Result};

/// Display span of one octave plus a semitone, as a frequency ratio.
pub const DEFAULT_FOLLOW_SPAN: f64 = 2.118_926_188_718_590_6;

/// Recentre when the pitch is off the window centre by more than this ratio.
const CENTRE_TOLERANCE: f64 = 1.12;

/// Resize when the window span is off the target span by more than this
/// ratio.
const SPREAD_TOLERANCE: f64 = 1.1;

/// Keep moving while momentum is above this level.
const MOMENTUM_THRESHOLD: f64 = 0.05;

/// Weight of the previous value in every exponential update.
const SMOOTHING: f64 = 0.9;

/// One entry of the raw pitch history.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PitchSample {
    /// Raw estimate, `None` for unvoiced or unreliable frames.
    pub frequency_hz: Option<f64>,
    /// Frame number the estimate came from.
    pub ordinal: u64,
}

/// Lower and upper bound of a display window in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrequencyRange {
    pub lower_hz: f64,
    pub upper_hz: f64,
}

impl FrequencyRange {
    /// Create a new range.
    pub fn new(lower_hz: f64, upper_hz: f64) -> Self {
        Self { lower_hz, upper_hz }
    }

    /// Geometric centre `sqrt(lower·upper)`.
    #[inline]
    pub fn centre(&self) -> f64 {
        (self.lower_hz * self.upper_hz).sqrt()
    }

    /// Span as a ratio `upper / lower`.
    #[inline]
    pub fn span(&self) -> f64 {
        self.upper_hz / self.lower_hz
    }

    fn is_valid(&self) -> bool {
        self.lower_hz > 0.0 && self.upper_hz > self.lower_hz && self.upper_hz.is_finite()
    }
}

/// Outlier rejection, stable-segment detection and weighted median.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PitchTracker {
    /// Number of most recent samples considered.
    pub window: usize,
    /// Lowest plausible pitch in Hz.
    pub min_hz: f64,
    /// Highest plausible pitch in Hz.
    pub max_hz: f64,
    /// Ratio to the older neighbour beyond which a sample is an outlier.
    pub outlier_ratio: f64,
    /// Largest adjacent ratio inside a stable run.
    pub max_jump: f64,
    /// Adjacent pairs a run needs to count as stable.
    pub min_stable_pairs: usize,
}

impl Default for PitchTracker {
    fn default() -> Self {
        Self {
            window: 30,
            min_hz: 50.0,
            max_hz: 1500.0,
            outlier_ratio: 3.0,
            max_jump: 1.5,
            min_stable_pairs: 5,
        }
    }
}

impl PitchTracker {
    /// Stabilised pitch of a history given newest first.
    ///
    /// Only the first `window` items are read.
    pub fn smooth<I>(&self, history: I) -> Option<f64>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let recent: Vec<Option<f64>> = history.into_iter().take(self.window).collect();
        let filtered = self.reject_outliers(&recent);
        let (start, end) = self.stable_segment(&filtered)?;

        let mut weighted: Vec<f64> = Vec::new();
        for (i, pitch) in filtered[start..=end].iter().flatten().enumerate() {
            let weight = ((-0.5 * i as f64).exp() * 10.0).ceil() as usize;
            weighted.extend(std::iter::repeat(*pitch).take(weight));
        }
        if weighted.is_empty() {
            return None;
        }

        weighted.sort_by(f64::total_cmp);
        Some(weighted[weighted.len() / 2])
    }

    /// Convenience wrapper over [`PitchTracker::smooth`] for sample records.
    pub fn smooth_samples<'a, I>(&self, samples: I) -> Option<f64>
    where
        I: IntoIterator<Item = &'a PitchSample>,
    {
        self.smooth(samples.into_iter().map(|s| s.frequency_hz))
    }

    fn reject_outliers(&self, recent: &[Option<f64>]) -> Vec<Option<f64>> {
        recent
            .iter()
            .enumerate()
            .map(|(i, &pitch)| {
                let pitch = pitch.filter(|p| (self.min_hz..=self.max_hz).contains(p))?;
                // Compared against the raw older neighbour, as received
                if let Some(Some(older)) = recent.get(i + 1) {
                    let ratio = pitch / older;
                    if ratio > self.outlier_ratio || ratio < 1.0 / self.outlier_ratio {
                        return None;
                    }
                }
                Some(pitch)
            })
            .collect()
    }

    /// Inclusive index bounds of the last qualifying run in scan order.
    ///
    /// Later runs overwrite earlier ones, so with several stable runs the
    /// oldest one in the window wins.
    fn stable_segment(&self, filtered: &[Option<f64>]) -> Option<(usize, usize)> {
        let mut run_start: Option<usize> = None;
        let mut stable: Option<(usize, usize)> = None;

        for i in 0..filtered.len().saturating_sub(1) {
            let continues = match (filtered[i], filtered[i + 1]) {
                (Some(current), Some(next)) => {
                    let ratio = current / next;
                    ratio <= self.max_jump && ratio >= 1.0 / self.max_jump
                }
                _ => false,
            };

            if !continues {
                run_start = None;
                continue;
            }

            let start = *run_start.get_or_insert(i);
            if i - start + 1 >= self.min_stable_pairs {
                stable = Some((start, i + 1));
            }
        }

        stable
    }
}

/// Display-window auto-follow with momentum.
///
/// Momentum is an exponentially decayed measure of how far off-centre the
/// pitch has recently been. It keeps the window gliding after the pitch is
/// back inside the tolerances, and is the only state carried between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowController {
    span: f64,
    momentum: f64,
}

impl Default for FollowController {
    fn default() -> Self {
        Self {
            span: DEFAULT_FOLLOW_SPAN,
            momentum: 0.0,
        }
    }
}

impl FollowController {
    /// Create a controller targeting a window of `span` (upper/lower ratio).
    ///
    /// # Errors
    ///
    /// `Error::InvalidParameter` unless `span` is finite and greater than 1.
    pub fn new(span: f64) -> Result<Self> {
        if !(span.is_finite() && span > 1.0) {
            return Err(Error::InvalidParameter(format!(
                "follow span must be a ratio above 1, got {}",
                span
            )));
        }
        Ok(Self { span, momentum: 0.0 })
    }

    /// Target span ratio.
    #[inline]
    pub fn span(&self) -> f64 {
        self.span
    }

    /// Current momentum.
    #[inline]
    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    /// Forget accumulated momentum.
    pub fn reset(&mut self) {
        self.momentum = 0.0;
    }

    /// Recommend a new display window for `frequency`.
    ///
    /// # Returns
    ///
    /// The adjusted range, or `None` when the window is already centred and
    /// sized within tolerance and momentum has died down (also for a
    /// non-positive frequency or an empty range).
    pub fn follow(&mut self, frequency: f64, current: FrequencyRange) -> Option<FrequencyRange> {
        if !(frequency.is_finite() && frequency > 0.0) || !current.is_valid() {
            return None;
        }

        let ratio = frequency / current.centre();
        let spread = current.span() / self.span;
        let off_centre = ratio > CENTRE_TOLERANCE || ratio < 1.0 / CENTRE_TOLERANCE;
        let off_size = spread > SPREAD_TOLERANCE || spread < 1.0 / SPREAD_TOLERANCE;

        if !(off_centre || off_size || self.momentum > MOMENTUM_THRESHOLD) {
            return None;
        }

        let half_span = self.span.sqrt();
        let target = FrequencyRange::new(frequency / half_span, frequency * half_span);
        let next = FrequencyRange::new(
            SMOOTHING * current.lower_hz + (1.0 - SMOOTHING) * target.lower_hz,
            SMOOTHING * current.upper_hz + (1.0 - SMOOTHING) * target.upper_hz,
        );
        self.momentum = SMOOTHING * self.momentum + (1.0 - SMOOTHING) * (ratio - 1.0).abs();

        trace!(
            frequency,
            ratio,
            spread,
            momentum = self.momentum,
            "display window follows pitch"
        );
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().map(|&v| Some(v)).collect()
    }

    #[test]
    fn test_default_span_is_thirteen_semitones() {
        assert!((DEFAULT_FOLLOW_SPAN - 2f64.powf(13.0 / 12.0)).abs() < 1e-9);
    }

    #[test]
    fn test_smooth_steady_pitch() {
        let tracker = PitchTracker::default();
        assert_eq!(tracker.smooth(history(&[220.0; 12])), Some(220.0));
    }

    #[test]
    fn test_smooth_excludes_spike() {
        let tracker = PitchTracker::default();
        let values = [201.0, 199.0, 700.0, 200.0, 202.0, 198.0, 200.0, 201.0, 199.0, 200.0];
        let pitch = tracker.smooth(history(&values)).unwrap();
        assert!((195.0..=205.0).contains(&pitch), "pitch {}", pitch);
    }

    #[test]
    fn test_smooth_requires_five_pairs() {
        let tracker = PitchTracker::default();
        // 5 samples = 4 pairs
        assert_eq!(tracker.smooth(history(&[300.0; 5])), None);
        assert_eq!(tracker.smooth(history(&[300.0; 6])), Some(300.0));

        // A gap splits an otherwise long run into two short ones
        let mut gapped = history(&[300.0; 9]);
        gapped[4] = None;
        assert_eq!(tracker.smooth(gapped), None);
    }

    #[test]
    fn test_smooth_rejects_implausible() {
        let tracker = PitchTracker::default();
        assert_eq!(tracker.smooth(history(&[40.0; 10])), None);
        assert_eq!(tracker.smooth(history(&[2000.0; 10])), None);
        assert_eq!(tracker.smooth(Vec::new()), None);
    }

    #[test]
    fn test_smooth_weighted_median() {
        let tracker = PitchTracker::default();
        // Weights 10, 7, 4, 3, 2, 1: index 13 of 27 falls on the second value
        let values = [100.0, 110.0, 120.0, 130.0, 140.0, 150.0];
        assert_eq!(tracker.smooth(history(&values)), Some(110.0));
    }

    #[test]
    fn test_smooth_last_scanned_run_wins() {
        let tracker = PitchTracker::default();
        let mut values = vec![400.0; 6];
        values.extend([200.0; 6]);
        assert_eq!(tracker.smooth(history(&values)), Some(200.0));

        // A short older run does not displace a qualifying newer one
        let mut values = vec![400.0; 6];
        values.extend([200.0; 3]);
        assert_eq!(tracker.smooth(history(&values)), Some(400.0));

        // Samples beyond the window are never read
        let mut long = vec![None; 30];
        long.extend(history(&[250.0; 10]));
        assert_eq!(tracker.smooth(long), None);
    }

    #[test]
    fn test_smooth_samples() {
        let tracker = PitchTracker::default();
        let samples: Vec<PitchSample> = (0..8)
            .map(|i| PitchSample {
                frequency_hz: Some(330.0),
                ordinal: 100 - i,
            })
            .collect();
        assert_eq!(tracker.smooth_samples(&samples), Some(330.0));
    }

    #[test]
    fn test_follow_idle_when_centred() {
        let mut follow = FollowController::default();
        assert_eq!(follow.follow(150.0, FrequencyRange::new(100.0, 200.0)), None);
        assert_eq!(follow.momentum(), 0.0);
    }

    #[test]
    fn test_follow_moves_towards_pitch() {
        let mut follow = FollowController::default();
        let range = FrequencyRange::new(100.0, 200.0);
        let next = follow.follow(300.0, range).unwrap();

        let half = DEFAULT_FOLLOW_SPAN.sqrt();
        assert!((next.lower_hz - (0.9 * 100.0 + 0.1 * 300.0 / half)).abs() < 1e-9);
        assert!((next.upper_hz - (0.9 * 200.0 + 0.1 * 300.0 * half)).abs() < 1e-9);
        let ratio = 300.0 / range.centre();
        assert!((follow.momentum() - 0.1 * (ratio - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_follow_momentum_persists() {
        let mut follow = FollowController::default();
        follow.follow(300.0, FrequencyRange::new(100.0, 200.0)).unwrap();
        assert!(follow.momentum() > MOMENTUM_THRESHOLD);

        // Perfectly centred window still moves while momentum is high
        let half = DEFAULT_FOLLOW_SPAN.sqrt();
        let centred = FrequencyRange::new(300.0 / half, 300.0 * half);
        assert!(follow.follow(300.0, centred).is_some());

        follow.reset();
        assert_eq!(follow.follow(300.0, centred), None);
    }

    #[test]
    fn test_follow_converges_and_settles() {
        let mut follow = FollowController::default();
        let mut range = FrequencyRange::new(100.0, 200.0);
        let mut settled = false;
        for _ in 0..500 {
            match follow.follow(440.0, range) {
                Some(next) => range = next,
                None => {
                    settled = true;
                    break;
                }
            }
        }
        assert!(settled);
        assert!((range.centre() / 440.0 - 1.0).abs() < 0.12);
        assert!((range.span() / DEFAULT_FOLLOW_SPAN - 1.0).abs() < 0.1);
    }

    #[test]
    fn test_follow_rejects_bad_input() {
        assert!(FollowController::new(1.0).is_err());
        let mut follow = FollowController::new(2.0).unwrap();
        assert_eq!(follow.follow(0.0, FrequencyRange::new(100.0, 200.0)), None);
        assert_eq!(follow.follow(440.0, FrequencyRange::new(200.0, 100.0)), None);
    }
}
