//! Pitch - Fundamental frequency (F0) by Harmonic Product Spectrum.
//!
//! # Algorithm Overview
//!
//! A periodic sound has energy at `f0, 2·f0, 3·f0, ...`. For every candidate
//! bin `i` in the search range, the estimator looks at where each harmonic of
//! that bin would land and multiplies together how loud the spectrum is
//! there:
//!
//! ```text
//! avg_h  = Σ_{k<h} spectrum[i·h + k] / h        (h = 1..=partials)
//! score  = Π_h (0.1 + 0.9 · avg_h)
//! ```
//!
//! `avg_h` averages the `h` bins that bin `i` maps onto after stretching by
//! `h`. The `0.1` floor keeps a single missing harmonic from zeroing the whole
//! product. The candidate with the largest score wins.
//!
//! # Confidence
//!
//! ```text
//! peak        = max(spectrum[range])
//! theoretical = (0.1 + 0.9 · peak)^partials
//! confidence  = clamp01((1 - ln(best / theoretical) / 10) · peak)
//! ```
//!
//! `theoretical` is what a perfect harmonic stack at full peak level would
//! score. This is a heuristic, not a probability: it is dominated by `peak`
//! and only loosely penalises incomplete harmonic stacks.
//!
//! # Input
//!
//! The spectrum must be normalised to `[0, 1]` (see
//! [`crate::spectrum::Frame::freq_normalized`]). Harmonic bins beyond the
//! end of the spectrum count as silent.

/// Default lower end of the search range in Hz.
pub const DEFAULT_MIN_HZ: f64 = 50.0;

/// Default upper end of the search range in Hz.
pub const DEFAULT_MAX_HZ: f64 = 600.0;

/// Default number of harmonics multiplied together.
pub const DEFAULT_PARTIALS: usize = 8;

/// Floor added to every harmonic term of the product.
const HARMONIC_FLOOR: f64 = 0.1;

/// Fundamental frequency estimate for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FundamentalEstimate {
    /// Frequency in Hz (bin resolution).
    pub frequency_hz: f64,
    /// Heuristic confidence in `[0, 1]`.
    pub confidence: f64,
}

impl FundamentalEstimate {
    /// Create a new estimate.
    pub fn new(frequency_hz: f64, confidence: f64) -> Self {
        Self {
            frequency_hz,
            confidence,
        }
    }
}

/// Harmonic Product Spectrum estimator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HpsEstimator {
    /// Lowest candidate fundamental in Hz.
    pub min_hz: f64,
    /// Highest candidate fundamental in Hz.
    pub max_hz: f64,
    /// Number of harmonics multiplied together.
    pub partials: usize,
}

impl Default for HpsEstimator {
    fn default() -> Self {
        Self {
            min_hz: DEFAULT_MIN_HZ,
            max_hz: DEFAULT_MAX_HZ,
            partials: DEFAULT_PARTIALS,
        }
    }
}

impl HpsEstimator {
    /// Create an estimator searching `[min_hz, max_hz]` with `partials`
    /// harmonics.
    pub fn new(min_hz: f64, max_hz: f64, partials: usize) -> Self {
        Self {
            min_hz,
            max_hz,
            partials,
        }
    }

    /// Candidate bin range `[floor(min/hz), ceil(max/hz))`, clipped to the
    /// spectrum.
    fn search_range(&self, n_bins: usize, hz_per_bin: f64) -> (usize, usize) {
        let lower = (self.min_hz / hz_per_bin).floor().max(0.0) as usize;
        let upper = ((self.max_hz / hz_per_bin).ceil() as usize).min(n_bins);
        (lower.min(upper), upper)
    }

    /// Harmonic product score of candidate bin `bin`.
    fn score(&self, normalized: &[f32], bin: usize) -> f64 {
        (1..=self.partials).fold(1.0, |score, h| {
            let start = bin * h;
            let sum: f64 = (start..start + h)
                .map(|k| normalized.get(k).copied().unwrap_or(0.0) as f64)
                .sum();
            score * (HARMONIC_FLOOR + (1.0 - HARMONIC_FLOOR) * sum / h as f64)
        })
    }

    /// Estimate the fundamental of a normalised spectrum.
    ///
    /// # Arguments
    ///
    /// * `normalized` - Power spectrum scaled to `[0, 1]`
    /// * `hz_per_bin` - Bin width in Hz
    ///
    /// # Returns
    ///
    /// The best candidate. An empty search range (spectrum too short, or
    /// bins wider than the range) yields `0 Hz` with zero confidence.
    pub fn estimate(&self, normalized: &[f32], hz_per_bin: f64) -> FundamentalEstimate {
        let (lower, upper) = self.search_range(normalized.len(), hz_per_bin);
        if lower >= upper {
            return FundamentalEstimate::new(0.0, 0.0);
        }

        let mut best_bin = lower;
        let mut best_score = f64::NEG_INFINITY;
        for bin in lower..upper {
            let score = self.score(normalized, bin);
            if score > best_score {
                best_score = score;
                best_bin = bin;
            }
        }

        let peak = normalized[lower..upper]
            .iter()
            .fold(0.0f64, |m, &v| m.max(v as f64));
        let theoretical = (HARMONIC_FLOOR + (1.0 - HARMONIC_FLOOR) * peak).powi(self.partials as i32);
        let confidence = ((1.0 - (best_score / theoretical).ln() / 10.0) * peak).clamp(0.0, 1.0);

        FundamentalEstimate::new(best_bin as f64 * hz_per_bin, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Triangular lobes (3 bins wide) at every multiple of `f0_bin`.
    fn harmonic_spectrum(n_bins: usize, f0_bin: usize, harmonics: usize) -> Vec<f32> {
        let mut spectrum = vec![0.02f32; n_bins];
        for h in 1..=harmonics {
            let centre = f0_bin * h;
            if centre + 1 >= n_bins {
                break;
            }
            let level = 0.95 * 0.92f32.powi(h as i32 - 1);
            spectrum[centre] = level;
            spectrum[centre - 1] = level * 0.6;
            spectrum[centre + 1] = level * 0.6;
        }
        spectrum
    }

    #[test]
    fn test_finds_fundamental_of_harmonic_stack() {
        let hz_per_bin = 10.0;
        let spectrum = harmonic_spectrum(1024, 22, 8);
        let estimate = HpsEstimator::default().estimate(&spectrum, hz_per_bin);
        assert!(
            (estimate.frequency_hz - 220.0).abs() <= hz_per_bin,
            "got {} Hz",
            estimate.frequency_hz
        );
        assert!(estimate.confidence > 0.5, "confidence {}", estimate.confidence);
    }

    #[test]
    fn test_prefers_fundamental_over_octave_below() {
        // Sub-octave candidates only line up with every other harmonic
        let hz_per_bin = 5.0;
        let spectrum = harmonic_spectrum(2048, 60, 8);
        let estimate = HpsEstimator::default().estimate(&spectrum, hz_per_bin);
        assert!((estimate.frequency_hz - 300.0).abs() <= hz_per_bin);
    }

    #[test]
    fn test_silence_has_low_confidence() {
        let spectrum = vec![0.0f32; 512];
        let estimate = HpsEstimator::default().estimate(&spectrum, 10.0);
        assert_eq!(estimate.confidence, 0.0);
        assert!(estimate.frequency_hz >= DEFAULT_MIN_HZ - 10.0);
    }

    #[test]
    fn test_empty_range() {
        let estimate = HpsEstimator::default().estimate(&[0.5f32; 4], 10.0);
        assert_eq!(estimate, FundamentalEstimate::new(0.0, 0.0));
    }

    #[test]
    fn test_estimate_idempotent() {
        let spectrum = harmonic_spectrum(1024, 17, 6);
        let hps = HpsEstimator::new(60.0, 500.0, 6);
        assert_eq!(hps.estimate(&spectrum, 11.71875), hps.estimate(&spectrum, 11.71875));
    }
}
