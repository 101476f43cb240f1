//! Analyzer - Per-stream orchestration of the analysis pipeline.
//!
//! One [`Analyzer`] owns everything a stream needs between ticks: the FFT
//! engine and window for its frame size, the LPC analyzer, the spectrum
//! history, the result history and the auto-follow momentum. Each call to
//! [`Analyzer::process`] runs one frame through
//!
//! ```text
//! time block ─► SpectrumAnalyzer ─► Frame ─┬─► find_peaks (dB)
//!                                          ├─► HpsEstimator (normalised)
//!                                          └─► LpcAnalyzer (time block)
//! ```
//!
//! and then feeds the raw pitch history to the [`PitchTracker`].
//!
//! All fallible work happens before any state is touched, so an error leaves
//! the analyzer exactly as it was.

use std::collections::VecDeque;
use std::iter;

use tracing::{debug, trace};

use crate::error::{Error, NumericalIssue, Result};
use crate::formant::{Formant, LpcAnalyzer};
use crate::peaks::{find_peaks, SpectralPeak};
use crate::pitch::FundamentalEstimate;
use crate::settings::Settings;
use crate::spectrogram::HistoryRing;
use crate::spectrum::{Frame, SpectrumAnalyzer};
use crate::tracker::{FollowController, FrequencyRange, PitchSample};

/// Everything computed for one frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnalysisResult {
    /// Frame number within the stream, starting at 0.
    pub ordinal: u64,
    /// Harmonic Product Spectrum estimate.
    pub fundamental: FundamentalEstimate,
    /// Raw pitch fed to the tracker (`None` below the confidence threshold).
    pub pitch: PitchSample,
    /// Stabilised pitch over the recent results.
    pub tracked_pitch: Option<f64>,
    /// Dominant spectral peaks, loudest first.
    pub peaks: Vec<SpectralPeak>,
    /// LPC formants, ascending (empty when LPC is disabled).
    pub formants: Vec<Formant>,
    /// LPC prediction-error filter (empty when LPC is disabled).
    pub lpc_coefficients: Vec<f64>,
    /// Recoverable numerical conditions met in this frame.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub issues: Vec<NumericalIssue>,
}

/// Analysis state for one audio stream.
#[derive(Debug)]
pub struct Analyzer {
    settings: Settings,
    spectrum: SpectrumAnalyzer,
    lpc: Option<LpcAnalyzer>,
    history: HistoryRing,
    results: VecDeque<AnalysisResult>,
    follow: FollowController,
    frame: Option<Frame>,
    next_ordinal: u64,
}

/// Components rebuilt together on (re)configuration.
struct Parts {
    spectrum: SpectrumAnalyzer,
    lpc: Option<LpcAnalyzer>,
    history: HistoryRing,
    follow: FollowController,
}

impl Parts {
    fn build(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            spectrum: SpectrumAnalyzer::new(settings)?,
            lpc: settings.lpc.clone().map(LpcAnalyzer::new).transpose()?,
            history: HistoryRing::new(settings.history_capacity, settings.fft_size.bins())?,
            follow: FollowController::new(settings.follow_span)?,
        })
    }
}

impl Analyzer {
    /// Create an analyzer.
    ///
    /// # Errors
    ///
    /// `Error::InvalidParameter` if the settings do not validate.
    pub fn new(settings: Settings) -> Result<Self> {
        let parts = Parts::build(&settings)?;
        Ok(Self {
            results: VecDeque::with_capacity(settings.history_capacity),
            settings,
            spectrum: parts.spectrum,
            lpc: parts.lpc,
            history: parts.history,
            follow: parts.follow,
            frame: None,
            next_ordinal: 0,
        })
    }

    /// Current settings.
    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Samples expected per call to [`Analyzer::process`].
    #[inline]
    pub fn fft_size(&self) -> usize {
        self.spectrum.fft_size()
    }

    /// Replace the settings and every buffer that depends on them.
    ///
    /// Histories and follow momentum start over. On error nothing changes.
    pub fn reconfigure(&mut self, settings: Settings) -> Result<()> {
        let parts = Parts::build(&settings)?;
        debug!(
            fft_size = settings.fft_size.samples(),
            history = settings.history_capacity,
            "reconfiguring analyzer"
        );

        self.spectrum = parts.spectrum;
        self.lpc = parts.lpc;
        self.history = parts.history;
        self.follow = parts.follow;
        self.results = VecDeque::with_capacity(settings.history_capacity);
        self.frame = None;
        self.settings = settings;
        Ok(())
    }

    /// Analyse one block of `fft_size` samples.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidParameter` for a non-positive sample rate
    /// - `Error::DimensionMismatch` if `time.len() != fft_size`
    /// - `Error::ResampleError` if LPC downsampling fails
    pub fn process(&mut self, time: &[f32], sample_rate: f64) -> Result<&AnalysisResult> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }

        let frame = self.spectrum.analyze(time, sample_rate)?;
        let hz_per_bin = frame.hz_per_bin();

        let peaks = find_peaks(
            frame.freq_db(),
            self.settings.peak_count,
            self.settings.min_peak_separation_hz,
            hz_per_bin,
        );
        let fundamental = self.settings.hps.estimate(frame.freq_normalized(), hz_per_bin);

        let (formants, lpc_coefficients, issues) = match self.lpc.as_mut() {
            Some(lpc) => {
                let analysis = lpc.analyze(frame.time(), sample_rate)?;
                (analysis.formants, analysis.coefficients, analysis.issues)
            }
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        let voiced = fundamental.frequency_hz > 0.0
            && fundamental.confidence >= self.settings.min_pitch_confidence;
        let pitch = PitchSample {
            frequency_hz: voiced.then_some(fundamental.frequency_hz),
            ordinal: self.next_ordinal,
        };
        let tracked_pitch = self.settings.tracker.smooth(
            iter::once(pitch.frequency_hz).chain(self.results.iter().map(|r| r.pitch.frequency_hz)),
        );

        self.history.push(frame.freq_db())?;

        trace!(
            ordinal = pitch.ordinal,
            f0 = fundamental.frequency_hz,
            confidence = fundamental.confidence,
            tracked = ?tracked_pitch,
            "frame analysed"
        );

        self.results.push_front(AnalysisResult {
            ordinal: pitch.ordinal,
            fundamental,
            pitch,
            tracked_pitch,
            peaks,
            formants,
            lpc_coefficients,
            issues,
        });
        self.results.truncate(self.settings.history_capacity);
        self.frame = Some(frame);
        self.next_ordinal += 1;

        Ok(&self.results[0])
    }

    /// Most recent result.
    #[inline]
    pub fn latest(&self) -> Option<&AnalysisResult> {
        self.results.front()
    }

    /// Result history, newest first.
    pub fn results(&self) -> impl Iterator<Item = &AnalysisResult> + '_ {
        self.results.iter()
    }

    /// Number of results held.
    #[inline]
    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    /// Most recent frame.
    #[inline]
    pub fn latest_frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Spectrum history.
    #[inline]
    pub fn spectrum_history(&self) -> &HistoryRing {
        &self.history
    }

    /// Recommend a new display window around the latest tracked pitch.
    ///
    /// Returns `None` when there is no tracked pitch or the window may stay.
    pub fn follow(&mut self, current: FrequencyRange) -> Option<FrequencyRange> {
        let pitch = self.latest()?.tracked_pitch?;
        self.follow.follow(pitch, current)
    }
}
