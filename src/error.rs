//! Error types for pitchscope.
//!
//! Two families of failure are kept apart:
//!
//! - [`Error`]: programmer or configuration mistakes (bad FFT size, buffers of
//!   the wrong length, out-of-range settings) and adapter failures (WAV
//!   loading, resampling). These are returned through [`Result`] and should
//!   fail fast at construction or call time.
//! - [`NumericalIssue`]: degeneracies that are expected during normal
//!   operation (silence, clipped input, DC-only frames). These never abort an
//!   analysis tick. They are logged through `tracing` and attached to the
//!   result that produced them so callers can inspect them.

use thiserror::Error;

/// Result type alias using pitchscope's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort an operation.
#[derive(Error, Debug)]
pub enum Error {
    /// FFT size is not a power of two (or is smaller than 2).
    #[error("Invalid FFT size {0}: must be a power of two >= 2")]
    InvalidSize(usize),

    /// Two buffers that must have the same length do not.
    ///
    /// Raised when a window is applied to a signal of a different length,
    /// or when a frame handed to the FFT does not match its configured size.
    #[error("Dimension mismatch: expected {expected} samples, got {got}")]
    DimensionMismatch {
        /// Length the callee was configured for.
        expected: usize,
        /// Length actually supplied.
        got: usize,
    },

    /// Invalid parameter value.
    ///
    /// The string describes which parameter was rejected and why.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error reading audio file.
    ///
    /// This wraps errors from the `hound` WAV library.
    #[error("Failed to read audio file: {0}")]
    AudioRead(#[from] hound::Error),

    /// Audio file must be mono.
    ///
    /// The u16 parameter contains the actual number of channels.
    #[error("Audio must be mono (single channel), got {0} channels")]
    NotMono(u16),

    /// Resampling error.
    ///
    /// Only reachable when LPC analysis is configured to downsample.
    #[error("Resampling failed: {0}")]
    ResampleError(String),
}

/// Recoverable numerical conditions met while analysing a frame.
///
/// None of these stop the analysis. Each one is emitted as a `tracing`
/// event where it is detected and carried in the analysis output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericalIssue {
    /// Levinson-Durbin produced a non-positive prediction error.
    ///
    /// The recursion is truncated: coefficients above `order` stay zero.
    #[error("Ill-conditioned signal: prediction error {error:e} at order {order}")]
    IllConditionedSignal {
        /// Order at which the error became non-positive (1-based).
        order: usize,
        /// The offending prediction error.
        error: f64,
    },

    /// Durand-Kerner did not converge within its iteration cap.
    ///
    /// The roots returned are the last iterate.
    #[error("Root search did not converge after {iterations} iterations (last update {last_update:e})")]
    NonConvergence {
        /// Number of iterations performed.
        iterations: usize,
        /// Largest root update in the final iteration.
        last_update: f64,
    },

    /// Root updates were skipped because the Durand-Kerner denominator
    /// vanished or the update was not finite.
    #[error("Skipped {skipped} degenerate root updates")]
    DegenerateDenominator {
        /// How many individual root updates were skipped.
        skipped: usize,
    },
}
