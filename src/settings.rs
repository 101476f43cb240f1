//! Settings - Analysis configuration.
//!
//! One [`Settings`] value describes a whole analysis stream. Defaults follow
//! a browser-style analyser: 4096-point FFT, spectrum clamped to
//! `[-100, -30]` dB, no spectral tilt, 2048 frames of history.

use crate::error::{Error, Result};
use crate::formant::LpcSettings;
use crate::pitch::HpsEstimator;
use crate::tracker::{PitchTracker, DEFAULT_FOLLOW_SPAN};

/// Allowed FFT sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "usize", into = "usize"))]
pub enum FftSize {
    Fft1024,
    Fft2048,
    Fft4096,
    Fft8192,
    Fft16384,
}

impl FftSize {
    /// All sizes, ascending.
    pub const ALL: [FftSize; 5] = [
        FftSize::Fft1024,
        FftSize::Fft2048,
        FftSize::Fft4096,
        FftSize::Fft8192,
        FftSize::Fft16384,
    ];

    /// Number of samples per frame.
    #[inline]
    pub fn samples(self) -> usize {
        match self {
            FftSize::Fft1024 => 1024,
            FftSize::Fft2048 => 2048,
            FftSize::Fft4096 => 4096,
            FftSize::Fft8192 => 8192,
            FftSize::Fft16384 => 16384,
        }
    }

    /// Number of spectrum bins (`samples / 2`).
    #[inline]
    pub fn bins(self) -> usize {
        self.samples() / 2
    }
}

impl Default for FftSize {
    fn default() -> Self {
        FftSize::Fft4096
    }
}

impl TryFrom<usize> for FftSize {
    type Error = Error;

    fn try_from(size: usize) -> Result<Self> {
        FftSize::ALL
            .into_iter()
            .find(|s| s.samples() == size)
            .ok_or(Error::InvalidSize(size))
    }
}

impl From<FftSize> for usize {
    fn from(size: FftSize) -> usize {
        size.samples()
    }
}

/// Configuration of an analysis stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings {
    /// Samples per frame.
    pub fft_size: FftSize,
    /// Temporal smoothing in `[0, 1]`, handed to the capture side untouched.
    pub smoothing: f64,
    /// Level mapped to 0 in the normalised spectrum.
    pub min_db: f64,
    /// Level mapped to 1 in the normalised spectrum.
    pub max_db: f64,
    /// Spectral tilt added above 50 Hz, in dB per octave (typically 0, 3, 6
    /// or 12).
    pub emphasis_db_per_octave: f64,
    /// Gain added to every spectrum bin, in dB.
    pub input_boost_db: f64,
    /// Number of spectral peaks reported.
    pub peak_count: usize,
    /// Minimum distance between reported peaks.
    pub min_peak_separation_hz: f64,
    /// Frames of spectrum and result history kept.
    pub history_capacity: usize,
    /// Fundamental estimation.
    pub hps: HpsEstimator,
    /// Frames whose estimate is less confident than this are unvoiced for
    /// the tracker.
    pub min_pitch_confidence: f64,
    /// Pitch stabilisation.
    pub tracker: PitchTracker,
    /// Target display span as a frequency ratio.
    pub follow_span: f64,
    /// Formant analysis, `None` to skip it.
    pub lpc: Option<LpcSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fft_size: FftSize::default(),
            smoothing: 0.0,
            min_db: -100.0,
            max_db: -30.0,
            emphasis_db_per_octave: 0.0,
            input_boost_db: 0.0,
            peak_count: 3,
            min_peak_separation_hz: 50.0,
            history_capacity: 2048,
            hps: HpsEstimator::default(),
            min_pitch_confidence: 0.5,
            tracker: PitchTracker::default(),
            follow_span: DEFAULT_FOLLOW_SPAN,
            lpc: Some(LpcSettings::default()),
        }
    }
}

fn invalid(message: String) -> Error {
    Error::InvalidParameter(message)
}

impl Settings {
    /// Check every field for a usable value.
    ///
    /// # Errors
    ///
    /// `Error::InvalidParameter` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(invalid(format!("smoothing must be in [0, 1], got {}", self.smoothing)));
        }
        if !(self.min_db.is_finite() && self.max_db.is_finite() && self.min_db < self.max_db) {
            return Err(invalid(format!(
                "decibel range [{}, {}] is empty",
                self.min_db, self.max_db
            )));
        }
        if !(self.emphasis_db_per_octave.is_finite() && self.emphasis_db_per_octave >= 0.0) {
            return Err(invalid(format!(
                "emphasis must be a non-negative dB/octave value, got {}",
                self.emphasis_db_per_octave
            )));
        }
        if !self.input_boost_db.is_finite() {
            return Err(invalid("input boost must be finite".into()));
        }
        if !(self.min_peak_separation_hz.is_finite() && self.min_peak_separation_hz >= 0.0) {
            return Err(invalid(format!(
                "peak separation must be non-negative, got {}",
                self.min_peak_separation_hz
            )));
        }
        if self.history_capacity == 0 {
            return Err(invalid("history capacity must be at least 1".into()));
        }
        if !(self.hps.min_hz > 0.0 && self.hps.min_hz < self.hps.max_hz) || self.hps.partials == 0 {
            return Err(invalid(format!(
                "pitch search [{}, {}] Hz with {} partials is unusable",
                self.hps.min_hz, self.hps.max_hz, self.hps.partials
            )));
        }
        if !(0.0..=1.0).contains(&self.min_pitch_confidence) {
            return Err(invalid(format!(
                "pitch confidence threshold must be in [0, 1], got {}",
                self.min_pitch_confidence
            )));
        }
        if self.tracker.window < 2 || self.tracker.max_jump <= 1.0 || self.tracker.outlier_ratio <= 1.0 {
            return Err(invalid("pitch tracker needs a window of 2+ and ratios above 1".into()));
        }
        if !(self.follow_span.is_finite() && self.follow_span > 1.0) {
            return Err(invalid(format!("follow span must exceed 1, got {}", self.follow_span)));
        }
        if let Some(lpc) = &self.lpc {
            lpc.validate()?;
            if lpc.order >= self.fft_size.samples() {
                return Err(invalid(format!(
                    "LPC order {} needs frames longer than {} samples",
                    lpc.order,
                    self.fft_size.samples()
                )));
            }
        }
        Ok(())
    }

    /// Bin width in Hz at `sample_rate`.
    #[inline]
    pub fn hz_per_bin(&self, sample_rate: f64) -> f64 {
        sample_rate / self.fft_size.samples() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.fft_size.samples(), 4096);
        assert_eq!(settings.fft_size.bins(), 2048);
        assert_eq!(settings.hps.partials, 8);
        assert_eq!(settings.lpc.as_ref().map(|l| l.order), Some(10));
        assert!((settings.hz_per_bin(48000.0) - 11.71875).abs() < 1e-12);
    }

    #[test]
    fn test_fft_size_conversion() {
        assert_eq!(FftSize::try_from(8192).unwrap(), FftSize::Fft8192);
        assert!(matches!(FftSize::try_from(4000), Err(Error::InvalidSize(4000))));
        assert!(matches!(FftSize::try_from(512), Err(Error::InvalidSize(512))));
        assert_eq!(usize::from(FftSize::Fft16384), 16384);
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let cases: Vec<Settings> = vec![
            Settings { min_db: -30.0, max_db: -100.0, ..Settings::default() },
            Settings { smoothing: 1.5, ..Settings::default() },
            Settings { emphasis_db_per_octave: -3.0, ..Settings::default() },
            Settings { history_capacity: 0, ..Settings::default() },
            Settings { follow_span: 1.0, ..Settings::default() },
            Settings { hps: HpsEstimator::new(600.0, 50.0, 8), ..Settings::default() },
            Settings {
                lpc: Some(LpcSettings { order: 0, ..LpcSettings::default() }),
                ..Settings::default()
            },
        ];
        for settings in cases {
            assert!(
                matches!(settings.validate(), Err(Error::InvalidParameter(_))),
                "{:?} accepted",
                settings
            );
        }

        let no_lpc = Settings { lpc: None, ..Settings::default() };
        assert!(no_lpc.validate().is_ok());
    }

    #[test]
    fn test_lpc_order_must_fit_frame() {
        let too_deep = Settings {
            fft_size: FftSize::Fft1024,
            lpc: Some(LpcSettings { order: 1024, ..LpcSettings::default() }),
            ..Settings::default()
        };
        assert!(matches!(too_deep.validate(), Err(Error::InvalidParameter(_))));
        assert!(matches!(crate::Analyzer::new(too_deep), Err(Error::InvalidParameter(_))));

        let deepest = Settings {
            fft_size: FftSize::Fft1024,
            lpc: Some(LpcSettings { order: 1023, ..LpcSettings::default() }),
            ..Settings::default()
        };
        assert!(deepest.validate().is_ok());
    }
}
