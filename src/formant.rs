//! Formant - LPC-based vocal tract resonances for a single frame.
//!
//! # Documentation Sources
//! - Makhoul (1975): "Linear Prediction: A Tutorial Review" (autocorrelation
//!   method, Levinson-Durbin recursion)
//! - Markel & Gray (1976): root-to-formant conversion
//! - Kerner (1966): simultaneous polynomial root iteration
//!
//! # Algorithm Overview
//!
//! 1. Optionally resample to `target_sample_rate` (formants live below a few
//!    kHz, so a lower rate lets a smaller order cover them)
//! 2. Pre-emphasis, in place and back to front: `s[i] -= α·s[i-1]`
//! 3. Window (Hamming by default) and remove the mean
//! 4. Biased autocorrelation `R[k] = (1/N)·Σ s[n]·s[n+k]`
//! 5. Levinson-Durbin gives the prediction-error filter
//!    `A(z) = 1 + a1·z⁻¹ + ... + ap·z⁻ᵖ`
//! 6. Durand-Kerner finds the roots of `zᵖ + a1·zᵖ⁻¹ + ... + ap`
//! 7. Each root `z = r·e^{iθ}` above the real axis is a resonance:
//!    - Frequency = θ·sr / 2π
//!    - Bandwidth = -ln(r)·sr / π
//!
//! Numerical trouble (ill-conditioned frames, roots that refuse to settle) is
//! never fatal: it is logged and reported as [`NumericalIssue`]s next to the
//! best-effort result.

use std::f64::consts::PI;

use num_complex::Complex64;
use rubato::{FftFixedIn, Resampler};
use tracing::{debug, warn};

use crate::complex::{eval_polynomial, CheckedDiv};
use crate::error::{Error, NumericalIssue, Result};
use crate::window::{WindowCache, WindowKind};

/// Root iteration cap.
pub const MAX_ROOT_ITERATIONS: usize = 10_000;

/// Largest root update still considered converged.
pub const ROOT_EPSILON: f64 = 1e-10;

/// Radius of the initial root guesses.
const INITIAL_RADIUS: f64 = 0.9;

/// Angular offset of the initial guesses. Without it the guesses for a real
/// polynomial are conjugate-symmetric and the iteration can stall on the
/// real axis.
const INITIAL_ANGLE_OFFSET: f64 = 0.25;

/// Lowest accepted formant frequency, also the margin below Nyquist.
const FORMANT_MARGIN_HZ: f64 = 50.0;

/// Widest accepted formant bandwidth.
const MAX_BANDWIDTH_HZ: f64 = 500.0;

/// A single resonance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Formant {
    /// Frequency in Hz.
    pub frequency_hz: f64,
    /// Bandwidth in Hz.
    pub bandwidth_hz: f64,
    /// Root magnitude in dB (`20·log10|z|`).
    pub amplitude_db: f64,
}

impl Formant {
    /// Create a new Formant.
    pub fn new(frequency_hz: f64, bandwidth_hz: f64, amplitude_db: f64) -> Self {
        Self {
            frequency_hz,
            bandwidth_hz,
            amplitude_db,
        }
    }
}

/// LPC analysis parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LpcSettings {
    /// Prediction order.
    pub order: usize,
    /// Pre-emphasis coefficient α.
    pub pre_emphasis: f64,
    /// Analysis window.
    pub window: WindowKind,
    /// Subtract the frame mean after windowing.
    pub remove_mean: bool,
    /// Maximum number of formants reported.
    pub max_formants: usize,
    /// Resample to this rate first (only ever downwards).
    pub target_sample_rate: Option<f64>,
}

impl Default for LpcSettings {
    fn default() -> Self {
        Self {
            order: 10,
            pre_emphasis: 0.95,
            window: WindowKind::Hamming,
            remove_mean: true,
            max_formants: 4,
            target_sample_rate: None,
        }
    }
}

impl LpcSettings {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.order == 0 {
            return Err(Error::InvalidParameter("LPC order must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&self.pre_emphasis) {
            return Err(Error::InvalidParameter(format!(
                "pre-emphasis must be in [0, 1), got {}",
                self.pre_emphasis
            )));
        }
        if let Some(rate) = self.target_sample_rate {
            if !(rate.is_finite() && rate > 2.0 * FORMANT_MARGIN_HZ) {
                return Err(Error::InvalidParameter(format!(
                    "invalid LPC target sample rate {}",
                    rate
                )));
            }
        }
        Ok(())
    }
}

/// Levinson-Durbin output.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Prediction-error filter, `a[0] == 1`, length `order + 1`.
    pub coefficients: Vec<f64>,
    /// Final prediction error.
    pub error: f64,
    /// Set when the recursion had to stop early.
    pub issue: Option<NumericalIssue>,
}

impl Prediction {
    /// AR predictor coefficients `φ = -a[1..]`.
    pub fn predictor(&self) -> Vec<f64> {
        self.coefficients[1..].iter().map(|a| -a).collect()
    }
}

/// Durand-Kerner output.
#[derive(Debug, Clone, PartialEq)]
pub struct RootSolution {
    /// Roots (best effort if the iteration did not converge).
    pub roots: Vec<Complex64>,
    /// Sweeps performed.
    pub iterations: usize,
    /// Degenerate updates and non-convergence.
    pub issues: Vec<NumericalIssue>,
}

/// Result of analysing one frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LpcAnalysis {
    /// Prediction-error filter, `a[0] == 1`.
    pub coefficients: Vec<f64>,
    /// Formants in ascending frequency.
    pub formants: Vec<Formant>,
    /// Rate the coefficients refer to (after any resampling).
    pub sample_rate: f64,
    /// Recoverable conditions met along the way.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub issues: Vec<NumericalIssue>,
}

/// Pre-emphasis filter `s[i] -= α·s[i-1]`, in place.
///
/// Runs from the end so every sample sees its unfiltered predecessor.
pub fn pre_emphasis(samples: &mut [f64], alpha: f64) {
    for i in (1..samples.len()).rev() {
        samples[i] -= alpha * samples[i - 1];
    }
}

/// Subtract the arithmetic mean.
pub fn remove_mean(samples: &mut [f64]) {
    if samples.is_empty() {
        return;
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    for s in samples.iter_mut() {
        *s -= mean;
    }
}

/// Biased autocorrelation `R[k] = (1/N)·Σ_{n<N-k} s[n]·s[n+k]` for
/// `k = 0..=max_lag`. Lags at or beyond `N` are zero.
pub fn autocorrelation(samples: &[f64], max_lag: usize) -> Vec<f64> {
    let n = samples.len();
    if n == 0 {
        return vec![0.0; max_lag + 1];
    }

    (0..=max_lag)
        .map(|k| {
            if k >= n {
                return 0.0;
            }
            let sum: f64 = samples[..n - k]
                .iter()
                .zip(&samples[k..])
                .map(|(a, b)| a * b)
                .sum();
            sum / n as f64
        })
        .collect()
}

/// Levinson-Durbin recursion on an autocorrelation sequence.
///
/// # Arguments
///
/// * `r` - Autocorrelation, at least `order + 1` lags
/// * `order` - Prediction order
///
/// # Returns
///
/// The prediction-error filter. If the error stops being positive at step
/// `m`, the recursion ends there: coefficients above `m` stay zero and an
/// [`NumericalIssue::IllConditionedSignal`] is attached.
///
/// # Panics
///
/// If `r.len() <= order`.
pub fn levinson_durbin(r: &[f64], order: usize) -> Prediction {
    let mut a = vec![0.0; order + 1];
    a[0] = 1.0;
    let mut error = r[0];

    if !(error > 0.0 && error.is_finite()) {
        warn!(order = 0, error, "signal energy is not positive, no prediction");
        return Prediction {
            coefficients: a,
            error,
            issue: Some(NumericalIssue::IllConditionedSignal { order: 0, error }),
        };
    }

    let mut previous = a.clone();
    for i in 1..=order {
        let acc: f64 = r[i] + (1..i).map(|j| a[j] * r[i - j]).sum::<f64>();
        let k = -acc / error;

        previous[..i].copy_from_slice(&a[..i]);
        for j in 1..i {
            a[j] = previous[j] + k * previous[i - j];
        }
        a[i] = k;
        error *= 1.0 - k * k;

        if !(error > 0.0 && error.is_finite()) {
            warn!(order = i, error, "prediction error collapsed, truncating recursion");
            return Prediction {
                coefficients: a,
                error,
                issue: Some(NumericalIssue::IllConditionedSignal { order: i, error }),
            };
        }
    }

    Prediction {
        coefficients: a,
        error,
        issue: None,
    }
}

/// Find all roots of a real polynomial by Durand-Kerner iteration.
///
/// `coefficients` are ordered highest power first. The polynomial is made
/// monic before iterating.
///
/// # Errors
///
/// `Error::InvalidParameter` if the leading coefficient is zero or not
/// finite.
pub fn durand_kerner(coefficients: &[f64]) -> Result<RootSolution> {
    let lead = match coefficients.first() {
        Some(&c) if c != 0.0 && c.is_finite() => c,
        _ => {
            return Err(Error::InvalidParameter(
                "polynomial needs a finite, non-zero leading coefficient".into(),
            ))
        }
    };
    let monic: Vec<f64> = coefficients.iter().map(|c| c / lead).collect();
    let degree = monic.len() - 1;

    let mut roots: Vec<Complex64> = (0..degree)
        .map(|k| {
            let angle = 2.0 * PI * k as f64 / degree as f64 + INITIAL_ANGLE_OFFSET;
            Complex64::from_polar(INITIAL_RADIUS, angle)
        })
        .collect();

    let mut skipped = 0;
    let mut last_update = 0.0;
    let mut iterations = 0;
    let mut converged = degree == 0;

    while !converged && iterations < MAX_ROOT_ITERATIONS {
        iterations += 1;
        let mut max_update = 0.0f64;
        let mut degenerate = false;

        for i in 0..degree {
            let z = roots[i];
            let numerator = eval_polynomial(&monic, z);
            let denominator = roots
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .fold(Complex64::new(1.0, 0.0), |acc, (_, &other)| acc * (z - other));

            match numerator.checked_div(denominator) {
                Some(delta) if (z - delta).is_finite() => {
                    roots[i] = z - delta;
                    max_update = max_update.max(delta.norm());
                }
                _ => {
                    skipped += 1;
                    degenerate = true;
                }
            }
        }

        last_update = max_update;
        converged = !degenerate && max_update < ROOT_EPSILON;
    }

    let mut issues = Vec::new();
    if skipped > 0 {
        debug!(skipped, "skipped degenerate root updates");
        issues.push(NumericalIssue::DegenerateDenominator { skipped });
    }
    if !converged {
        warn!(iterations, last_update, "root finding hit the iteration cap");
        issues.push(NumericalIssue::NonConvergence {
            iterations,
            last_update,
        });
    }

    Ok(RootSolution {
        roots,
        iterations,
        issues,
    })
}

/// Convert polynomial roots to formants.
///
/// For a root z = r·exp(iθ) with θ > 0:
/// - Frequency = θ·sample_rate / 2π
/// - Bandwidth = -ln(r)·sample_rate / π
///
/// Keeps resonances strictly inside `(50 Hz, nyquist - 50 Hz)` with bandwidth
/// of at most 500 Hz, sorted by frequency and truncated to `max_formants`.
pub fn roots_to_formants(roots: &[Complex64], sample_rate: f64, max_formants: usize) -> Vec<Formant> {
    let max_freq = sample_rate / 2.0 - FORMANT_MARGIN_HZ;

    let mut formants: Vec<Formant> = roots
        .iter()
        .filter(|root| root.im > 0.0)
        .filter_map(|root| {
            let r = root.norm();
            let frequency = root.arg() * sample_rate / (2.0 * PI);
            let bandwidth = -r.ln() * sample_rate / PI;

            let keep = frequency > FORMANT_MARGIN_HZ
                && frequency < max_freq
                && bandwidth <= MAX_BANDWIDTH_HZ;
            keep.then(|| Formant::new(frequency, bandwidth, 20.0 * r.log10()))
        })
        .collect();

    formants.sort_by(|a, b| a.frequency_hz.total_cmp(&b.frequency_hz));
    formants.truncate(max_formants);
    formants
}

/// LPC spectral envelope `1 / |A(e^{jω})|` at `frequency`.
///
/// `coefficients` is a prediction-error filter as returned by
/// [`levinson_durbin`] (`a[0] == 1`).
pub fn lpc_envelope(coefficients: &[f64], frequency: f64, sample_rate: f64) -> f64 {
    let omega = 2.0 * PI * frequency / sample_rate;
    let response = coefficients
        .iter()
        .enumerate()
        .fold(Complex64::new(0.0, 0.0), |acc, (k, &a)| {
            acc + Complex64::from_polar(a, -omega * k as f64)
        });
    1.0 / response.norm()
}

/// Resample a frame with rubato, falling back to linear interpolation if no
/// resampler can be built for the rate pair.
///
/// # Errors
///
/// `Error::ResampleError` if the resampler fails mid-stream.
pub fn resample(samples: &[f64], old_rate: f64, new_rate: f64) -> Result<Vec<f64>> {
    if (old_rate - new_rate).abs() < 1e-6 {
        return Ok(samples.to_vec());
    }

    let new_length = (samples.len() as f64 * new_rate / old_rate).round() as usize;
    if new_length == 0 {
        return Ok(Vec::new());
    }

    let chunk_size = 1024.min(samples.len());
    let mut resampler = match FftFixedIn::<f64>::new(
        old_rate.round() as usize,
        new_rate.round() as usize,
        chunk_size,
        2,
        1,
    ) {
        Ok(r) => r,
        Err(e) => {
            debug!(error = %e, "rubato unavailable for rate pair, using linear resampling");
            return Ok(linear_resample(samples, new_length));
        }
    };

    // Output lags the input by this many samples
    let delay = resampler.output_delay();
    let wanted = new_length + delay;

    let mut output = Vec::with_capacity(wanted + chunk_size);
    let mut pos = 0;
    // Zero chunks past the end flush the resampler's delay line
    let mut flush_chunks = 4;

    while output.len() < wanted && (pos < samples.len() || flush_chunks > 0) {
        let mut chunk = vec![0.0; chunk_size];
        if pos < samples.len() {
            let end = (pos + chunk_size).min(samples.len());
            chunk[..end - pos].copy_from_slice(&samples[pos..end]);
            pos = end;
        } else {
            flush_chunks -= 1;
        }

        let result = resampler
            .process(&[chunk], None)
            .map_err(|e| Error::ResampleError(e.to_string()))?;
        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    output.drain(..delay.min(output.len()));
    output.resize(new_length, 0.0);
    Ok(output)
}

/// Linear interpolation onto `new_length` evenly spaced points spanning the
/// input.
pub fn linear_resample(samples: &[f64], new_length: usize) -> Vec<f64> {
    if samples.is_empty() || new_length == 0 {
        return Vec::new();
    }

    let last = samples.len() - 1;
    let ratio = last as f64 / (new_length - 1).max(1) as f64;

    (0..new_length)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            if idx >= last {
                samples[last]
            } else {
                let frac = pos - idx as f64;
                samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
            }
        })
        .collect()
}

/// Frame-by-frame LPC analyzer.
///
/// Owns a window cache so repeated frames of the same length reuse their
/// window.
#[derive(Debug)]
pub struct LpcAnalyzer {
    settings: LpcSettings,
    windows: WindowCache,
}

impl LpcAnalyzer {
    /// Create an analyzer.
    ///
    /// # Errors
    ///
    /// `Error::InvalidParameter` if the settings are out of range.
    pub fn new(settings: LpcSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            windows: WindowCache::new(),
        })
    }

    /// Current settings.
    #[inline]
    pub fn settings(&self) -> &LpcSettings {
        &self.settings
    }

    /// Analyse one time-domain frame.
    ///
    /// # Arguments
    ///
    /// * `frame` - Time samples, left untouched
    /// * `sample_rate` - Rate of `frame` in Hz
    ///
    /// # Errors
    ///
    /// `Error::InvalidParameter` for a non-positive sample rate or a frame
    /// shorter than `order + 1` samples (after any resampling), and
    /// `Error::ResampleError` if resampling fails.
    pub fn analyze(&mut self, frame: &[f32], sample_rate: f64) -> Result<LpcAnalysis> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }

        let mut samples: Vec<f64> = frame.iter().map(|&s| s as f64).collect();
        let mut rate = sample_rate;
        if let Some(target) = self.settings.target_sample_rate {
            if target < sample_rate {
                samples = resample(&samples, sample_rate, target)?;
                rate = target;
            }
        }

        let order = self.settings.order;
        if samples.len() <= order {
            return Err(Error::InvalidParameter(format!(
                "frame of {} samples is too short for order {}",
                samples.len(),
                order
            )));
        }

        pre_emphasis(&mut samples, self.settings.pre_emphasis);
        let window = self.windows.get(self.settings.window, samples.len())?;
        crate::window::apply(&mut samples, &window)?;
        if self.settings.remove_mean {
            remove_mean(&mut samples);
        }

        let r = autocorrelation(&samples, order);
        let prediction = levinson_durbin(&r, order);
        let mut issues: Vec<NumericalIssue> = prediction.issue.iter().cloned().collect();

        // Trailing zero coefficients are roots at the origin
        let degree = prediction
            .coefficients
            .iter()
            .rposition(|&a| a != 0.0)
            .unwrap_or(0);
        let solution = durand_kerner(&prediction.coefficients[..=degree])?;
        issues.extend(solution.issues);

        let formants = roots_to_formants(&solution.roots, rate, self.settings.max_formants);

        Ok(LpcAnalysis {
            coefficients: prediction.coefficients,
            formants,
            sample_rate: rate,
            issues,
        })
    }
}
