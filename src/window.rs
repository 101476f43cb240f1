//! Window - Analysis windows for spectral and LPC analysis.
//!
//! Windows taper a frame towards its edges so that the discontinuity at the
//! frame boundary does not leak energy across the whole spectrum.
//!
//! # Supported Shapes
//!
//! All shapes are the symmetric (N-1 denominator) variants:
//!
//! - **Hamming**: `α - (1-α)·cos(2πn/(N-1))` with α = 0.53836
//! - **Hann**: `0.5 - 0.5·cos(2πn/(N-1))`
//! - **Blackman**: `a0 - a1·cos(2πn/(N-1)) + a2·cos(4πn/(N-1))` with
//!   α = 0.16, a0 = 0.5(1-α), a1 = 0.5, a2 = 0.5α
//!
//! The spectrum path uses Blackman (lowest sidelobes, matches what browser
//! analysers apply); LPC uses Hamming by default.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Hamming window α.
pub const HAMMING_ALPHA: f64 = 0.53836;

/// Blackman window α.
pub const BLACKMAN_ALPHA: f64 = 0.16;

/// Window shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WindowKind {
    /// Hamming window (α = 0.53836).
    Hamming,
    /// Hann window.
    Hann,
    /// Classic Blackman window (α = 0.16).
    Blackman,
}

impl WindowKind {
    /// Coefficient of sample `n` in a window of `length` samples.
    fn coefficient(self, n: usize, length: usize) -> f64 {
        let phase = 2.0 * PI * n as f64 / (length - 1) as f64;
        match self {
            WindowKind::Hamming => HAMMING_ALPHA - (1.0 - HAMMING_ALPHA) * phase.cos(),
            WindowKind::Hann => 0.5 - 0.5 * phase.cos(),
            WindowKind::Blackman => {
                let a0 = 0.5 * (1.0 - BLACKMAN_ALPHA);
                let a1 = 0.5;
                let a2 = 0.5 * BLACKMAN_ALPHA;
                a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
            }
        }
    }
}

/// Generate a window of the given shape.
///
/// # Errors
///
/// `Error::InvalidParameter` if `length < 2` (the N-1 denominator would be
/// zero).
pub fn window(kind: WindowKind, length: usize) -> Result<Vec<f64>> {
    if length < 2 {
        return Err(Error::InvalidParameter(format!(
            "window length must be at least 2, got {}",
            length
        )));
    }

    Ok((0..length).map(|n| kind.coefficient(n, length)).collect())
}

/// Multiply `signal` by `window` element-wise, in place.
///
/// # Errors
///
/// `Error::DimensionMismatch` if the two slices differ in length.
pub fn apply(signal: &mut [f64], window: &[f64]) -> Result<()> {
    if signal.len() != window.len() {
        return Err(Error::DimensionMismatch {
            expected: window.len(),
            got: signal.len(),
        });
    }

    for (s, w) in signal.iter_mut().zip(window) {
        *s *= w;
    }
    Ok(())
}

/// Windows memoised by `(kind, length)`.
///
/// Windows are pure functions of their key, so a cache owned by the component
/// that needs them avoids recomputing thousands of cosines per frame. The
/// cache hands out `Arc`s so a caller can hold a window while the cache keeps
/// growing.
#[derive(Debug, Default)]
pub struct WindowCache {
    windows: HashMap<(WindowKind, usize), Arc<[f64]>>,
}

impl WindowCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the window for `(kind, length)`, computing it on first use.
    pub fn get(&mut self, kind: WindowKind, length: usize) -> Result<Arc<[f64]>> {
        if let Some(w) = self.windows.get(&(kind, length)) {
            return Ok(Arc::clone(w));
        }

        let w: Arc<[f64]> = window(kind, length)?.into();
        self.windows.insert((kind, length), Arc::clone(&w));
        Ok(w)
    }

    /// Number of distinct windows held.
    #[inline]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether the cache holds no windows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Drop every cached window.
    pub fn clear(&mut self) {
        self.windows.clear();
    }
}
