//! Peaks - Dominant spectral maxima with sub-bin refinement.
//!
//! # Algorithm Overview
//!
//! Peaks are chosen greedily: each round takes the loudest bin that keeps at
//! least `min_separation_hz` distance (in bins) from every bin already taken.
//! Greedy selection is not globally optimal, but the peaks of interest are
//! well separated harmonics and partials, so it picks the same bins an
//! exhaustive search would.
//!
//! Each selected bin is then refined by fitting a parabola through it and its
//! two neighbours:
//!
//! ```text
//! p     = 0.5 · (a - c) / (a - 2b + c)
//! index = i + p
//! value = b - 0.25 · (a - c) · p
//! ```

use tracing::debug;

/// A refined spectral maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpectralPeak {
    /// Fractional bin index after parabolic refinement.
    pub index: f64,
    /// Frequency in Hz (`index × hz_per_bin`).
    pub frequency_hz: f64,
    /// Interpolated spectrum value at the refined index.
    pub value: f64,
}

/// Parabolic interpolation around bin `index`.
///
/// Neighbours are clamped to the slice bounds, so an edge bin is fitted
/// against itself on the missing side. A flat neighbourhood (zero curvature)
/// yields the unrefined bin.
///
/// # Returns
///
/// `(refined_index, refined_value)`
///
/// # Panics
///
/// If `index` is out of bounds.
pub fn refine_peak(spectrum: &[f32], index: usize) -> (f64, f64) {
    let a = spectrum[index.saturating_sub(1)] as f64;
    let b = spectrum[index] as f64;
    let c = spectrum[(index + 1).min(spectrum.len() - 1)] as f64;

    let curvature = a - 2.0 * b + c;
    let p = 0.5 * (a - c) / curvature;
    if !p.is_finite() {
        return (index as f64, b);
    }

    (index as f64 + p, b - 0.25 * (a - c) * p)
}

/// Find up to `count` well-separated maxima in `spectrum`.
///
/// # Arguments
///
/// * `spectrum` - Spectrum to search (typically decibels)
/// * `count` - Maximum number of peaks to return
/// * `min_separation_hz` - Minimum distance between two selected bins
/// * `hz_per_bin` - Bin width in Hz
///
/// # Returns
///
/// Peaks in selection order (loudest first). A round in which every bin is
/// excluded (or not finite) contributes nothing, so fewer than `count` peaks
/// may come back.
pub fn find_peaks(
    spectrum: &[f32],
    count: usize,
    min_separation_hz: f64,
    hz_per_bin: f64,
) -> Vec<SpectralPeak> {
    let min_distance = min_separation_hz / hz_per_bin;
    let mut selected: Vec<usize> = Vec::with_capacity(count);

    for round in 0..count {
        let mut best: Option<usize> = None;

        for (j, &value) in spectrum.iter().enumerate() {
            // -inf bins (digital silence) are never peaks
            if !value.is_finite() {
                continue;
            }
            if best.map_or(false, |b| value <= spectrum[b]) {
                continue;
            }
            if selected
                .iter()
                .any(|&other| (other as f64 - j as f64).abs() < min_distance)
            {
                continue;
            }
            best = Some(j);
        }

        match best {
            Some(j) => selected.push(j),
            None => {
                debug!(round, "no bin left for spectral peak, skipping slot");
                break;
            }
        }
    }

    selected
        .into_iter()
        .map(|i| {
            let (index, value) = refine_peak(spectrum, i);
            SpectralPeak {
                index,
                frequency_hz: index * hz_per_bin,
                value,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refine_recovers_parabola_vertex() {
        for &centre in &[10.0f64, 10.25, 10.5, 9.7, 12.999] {
            let samples: Vec<f32> = (0..24)
                .map(|x| {
                    let d = x as f64 - centre;
                    (-(d * d)) as f32
                })
                .collect();
            let argmax = centre.round() as usize;
            let (index, value) = refine_peak(&samples, argmax);
            assert!((index - centre).abs() < 1e-6, "centre {} got {}", centre, index);
            assert!(value.abs() < 1e-5, "vertex value {}", value);
        }
    }

    #[test]
    fn test_refine_edges_and_flat() {
        let flat = [3.0f32; 5];
        assert_eq!(refine_peak(&flat, 2), (2.0, 3.0));

        // Edge bin: left neighbour clamps to itself
        let edge = [5.0f32, 4.0, 1.0];
        let (index, _) = refine_peak(&edge, 0);
        assert!((index + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_find_peaks_respects_separation() {
        // Two bumps 3 bins apart and one far away
        let mut spectrum = vec![-100.0f32; 64];
        spectrum[10] = -10.0;
        spectrum[13] = -12.0;
        spectrum[40] = -20.0;

        // 10 Hz bins, 50 Hz separation = 5 bins: bin 13 is too close to bin 10
        let peaks = find_peaks(&spectrum, 2, 50.0, 10.0);
        assert_eq!(peaks.len(), 2);
        assert!((peaks[0].index - 10.0).abs() < 0.5);
        assert!((peaks[1].index - 40.0).abs() < 0.5);

        // One-bin separation lets the neighbour win the second slot
        let peaks = find_peaks(&spectrum, 2, 10.0, 10.0);
        assert!((peaks[1].index - 13.0).abs() < 0.5);
    }

    #[test]
    fn test_find_peaks_skips_exhausted_slots() {
        let spectrum = vec![-30.0f32, -20.0, -10.0, -20.0];
        // Separation covers the whole spectrum: only one slot can be filled
        let peaks = find_peaks(&spectrum, 3, 1000.0, 10.0);
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].frequency_hz - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_find_peaks_ignores_silence() {
        let spectrum = vec![f32::NEG_INFINITY; 32];
        assert!(find_peaks(&spectrum, 3, 50.0, 10.0).is_empty());
    }

    #[test]
    fn test_find_peaks_idempotent() {
        let spectrum: Vec<f32> = (0..128).map(|i| ((i as f32) * 0.37).sin() * 20.0 - 50.0).collect();
        let a = find_peaks(&spectrum, 3, 50.0, 11.71875);
        let b = find_peaks(&spectrum, 3, 50.0, 11.71875);
        assert_eq!(a, b);
    }
}
