//! # pitchscope
//!
//! Real-time pitch, spectral peak and formant analysis for monophonic audio.
//!
//! A capture loop hands the library one block of samples per tick. For every
//! block the library produces:
//!
//! - a decibel and a normalised power spectrum (Blackman window, radix-2 FFT)
//! - the dominant spectral peaks, refined to sub-bin precision
//! - a fundamental frequency estimate by Harmonic Product Spectrum
//! - vocal tract formants by LPC (Levinson-Durbin, Durand-Kerner)
//! - a stabilised pitch from the recent history, and a recommendation for
//!   where a display window should move to keep that pitch centred
//!
//! # Quick Start
//!
//! ```no_run
//! use pitchscope::{Analyzer, FrequencyRange, Settings};
//!
//! let mut analyzer = Analyzer::new(Settings::default()).unwrap();
//! let block = vec![0.0f32; analyzer.fft_size()];
//!
//! // Once per tick
//! let result = analyzer.process(&block, 48000.0).unwrap();
//! println!("f0 = {:.1} Hz", result.fundamental.frequency_hz);
//!
//! // Let the display follow the tracked pitch
//! let display = FrequencyRange::new(100.0, 400.0);
//! if let Some(next) = analyzer.follow(display) {
//!     println!("move display to {:.0}-{:.0} Hz", next.lower_hz, next.upper_hz);
//! }
//! ```
//!
//! # Module Organization
//!
//! The building blocks can be used on their own:
//!
//! - [`window`], [`fft`], [`complex`]: numerical primitives
//! - [`peaks`], [`pitch`], [`formant`]: per-frame estimators
//! - [`tracker`]: smoothing over time and display auto-follow
//! - [`spectrum`], [`spectrogram`], [`analyzer`]: per-stream pipeline and
//!   histories
//! - [`settings`], [`notes`], [`scale`], [`sound`]: configuration, note
//!   names, display axis mapping and WAV input
//!
//! # Errors and Logging
//!
//! Misuse (wrong buffer sizes, invalid settings) is reported as [`Error`].
//! Numerical trouble that is expected on real audio (silence, DC, clipping)
//! never fails a tick: it is emitted as a `tracing` event and listed in the
//! result as a [`NumericalIssue`]. The library installs no subscriber.

pub mod analyzer;
pub mod complex;
pub mod error;
pub mod fft;
pub mod formant;
pub mod notes;
pub mod peaks;
pub mod pitch;
pub mod settings;
pub mod scale;
pub mod sound;
pub mod spectrogram;
pub mod spectrum;
pub mod tracker;
pub mod window;

/// Error types.
pub use error::{Error, NumericalIssue, Result};

/// Per-stream pipeline.
///
/// - `Analyzer`: owns all buffers of one stream
/// - `AnalysisResult`: everything computed for one frame
pub use analyzer::{AnalysisResult, Analyzer};

/// Configuration.
pub use settings::{FftSize, Settings};

/// Per-frame estimators and their outputs.
pub use fft::FftEngine;
pub use formant::{lpc_envelope, Formant, LpcAnalysis, LpcAnalyzer, LpcSettings};
pub use peaks::{find_peaks, SpectralPeak};
pub use pitch::{FundamentalEstimate, HpsEstimator};
pub use window::{WindowCache, WindowKind};

/// Spectra and their history.
pub use spectrogram::HistoryRing;
pub use spectrum::{Frame, SpectrumAnalyzer};

/// Tracking over time.
pub use tracker::{FollowController, FrequencyRange, PitchSample, PitchTracker};

/// Note lookup and display axes.
pub use notes::{nearest_note, Note};
pub use scale::FrequencyScale;

/// WAV input.
pub use sound::Sound;
