//! Spectrum - Per-frame power spectrum in decibel and normalised form.
//!
//! Each tick turns one block of time samples into a [`Frame`]:
//!
//! 1. Blackman window (computed once per FFT size)
//! 2. Power spectrum `10·log10(|X[k]|² / N²)` for `k < N/2`
//! 3. Input boost added to every bin, and spectral tilt above 50 Hz:
//!    `+emphasis·log2(f / 50)` dB
//! 4. Normalisation `clamp01((dB - min_db) / (max_db - min_db))`
//!
//! Step 3 compensates for the natural roll-off of voices and instruments so
//! upper harmonics stay visible; with the default settings it is a no-op.
//! Digitally silent bins stay at `-inf` dB and normalise to 0.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::fft::FftEngine;
use crate::settings::Settings;
use crate::window::{self, WindowKind};

/// Frequency above which spectral tilt applies.
pub const EMPHASIS_START_HZ: f64 = 50.0;

/// One analysis cycle: the time block and its spectrum.
///
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    time: Vec<f32>,
    freq_db: Vec<f32>,
    freq_normalized: Vec<f32>,
    sample_rate: f64,
}

impl Frame {
    /// Time samples (length = FFT size).
    #[inline]
    pub fn time(&self) -> &[f32] {
        &self.time
    }

    /// Power spectrum in dB, boost and tilt applied (length = FFT size / 2).
    #[inline]
    pub fn freq_db(&self) -> &[f32] {
        &self.freq_db
    }

    /// Spectrum scaled to `[0, 1]` over the configured dB range.
    #[inline]
    pub fn freq_normalized(&self) -> &[f32] {
        &self.freq_normalized
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of spectrum bins.
    #[inline]
    pub fn bin_count(&self) -> usize {
        self.freq_db.len()
    }

    /// Bin width in Hz (`nyquist / bin_count`).
    #[inline]
    pub fn hz_per_bin(&self) -> f64 {
        self.sample_rate / self.time.len() as f64
    }

    /// Centre frequency of bin `index`.
    #[inline]
    pub fn frequency(&self, index: usize) -> f64 {
        index as f64 * self.hz_per_bin()
    }
}

/// Turns time blocks of one fixed size into [`Frame`]s.
#[derive(Debug, Clone)]
pub struct SpectrumAnalyzer {
    fft: FftEngine,
    window: Arc<[f64]>,
    scratch: Vec<f64>,
    min_db: f64,
    max_db: f64,
    emphasis_db_per_octave: f64,
    input_boost_db: f64,
}

impl SpectrumAnalyzer {
    /// Build an analyzer for `settings.fft_size`.
    ///
    /// # Errors
    ///
    /// `Error::InvalidParameter` if the settings do not validate.
    pub fn new(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let size = settings.fft_size.samples();
        let window: Arc<[f64]> = window::window(WindowKind::Blackman, size)?.into();

        Ok(Self {
            fft: FftEngine::new(size)?,
            window,
            scratch: vec![0.0; size],
            min_db: settings.min_db,
            max_db: settings.max_db,
            emphasis_db_per_octave: settings.emphasis_db_per_octave,
            input_boost_db: settings.input_boost_db,
        })
    }

    /// Samples expected per block.
    #[inline]
    pub fn fft_size(&self) -> usize {
        self.fft.size()
    }

    /// Analyse one block of time samples.
    ///
    /// # Errors
    ///
    /// `Error::DimensionMismatch` if `time.len()` differs from the FFT size.
    pub fn analyze(&mut self, time: &[f32], sample_rate: f64) -> Result<Frame> {
        if time.len() != self.scratch.len() {
            return Err(Error::DimensionMismatch {
                expected: self.scratch.len(),
                got: time.len(),
            });
        }

        for (dst, &src) in self.scratch.iter_mut().zip(time) {
            *dst = src as f64;
        }
        window::apply(&mut self.scratch, &self.window)?;
        let raw_db = self.fft.power_spectrum_db(&self.scratch)?;

        let hz_per_bin = sample_rate / self.fft.size() as f64;
        let range = self.max_db - self.min_db;

        let freq_db: Vec<f32> = raw_db
            .iter()
            .enumerate()
            .map(|(i, &db)| (db as f64 + self.gain_db(i as f64 * hz_per_bin)) as f32)
            .collect();
        let freq_normalized = freq_db
            .iter()
            .map(|&db| {
                let v = (db as f64 - self.min_db) / range;
                // NaN and -inf both end up at 0
                if v > 0.0 {
                    v.min(1.0) as f32
                } else {
                    0.0
                }
            })
            .collect();

        Ok(Frame {
            time: time.to_vec(),
            freq_db,
            freq_normalized,
            sample_rate,
        })
    }

    /// Boost plus tilt for a bin at `frequency`.
    #[inline]
    fn gain_db(&self, frequency: f64) -> f64 {
        let tilt = if frequency > EMPHASIS_START_HZ {
            self.emphasis_db_per_octave * (frequency / EMPHASIS_START_HZ).log2()
        } else {
            0.0
        };
        self.input_boost_db + tilt
    }
}
