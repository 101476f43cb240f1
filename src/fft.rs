//! FFT - Fixed-size radix-2 power spectrum.
//!
//! # Algorithm Overview
//!
//! Iterative decimation-in-time Cooley-Tukey:
//!
//! 1. Copy the input into the real scratch buffer in bit-reversed order and
//!    zero the imaginary buffer.
//! 2. Run butterfly passes for stage sizes 2, 4, 8, ..., N. Stage `s` uses
//!    every `N/s`-th precomputed twiddle:
//!    ```text
//!    t     = w · odd
//!    odd'  = even - t
//!    even' = even + t
//!    ```
//! 3. Emit the power of the first N/2 bins, scaled by `(1/N)²`.
//!
//! Twiddles `exp(-2πik/N)` for `k < N/2` and the bit-reversal permutation are
//! computed once per engine. An engine is only rebuilt when the FFT size
//! changes; frames of the same size reuse its tables and scratch buffers.

use std::f64::consts::PI;

use crate::error::{Error, Result};

/// Radix-2 FFT with precomputed tables and reusable scratch space.
#[derive(Debug, Clone)]
pub struct FftEngine {
    size: usize,
    reversed_bits: Vec<usize>,
    twiddle_re: Vec<f64>,
    twiddle_im: Vec<f64>,
    real: Vec<f64>,
    imag: Vec<f64>,
}

impl FftEngine {
    /// Build an engine for `size`-point transforms.
    ///
    /// # Errors
    ///
    /// `Error::InvalidSize` unless `size` is a power of two and at least 2.
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(Error::InvalidSize(size));
        }

        let bits = size.trailing_zeros();
        let reversed_bits = (0..size).map(|i| reverse_bits(i, bits)).collect();

        let half = size / 2;
        let mut twiddle_re = Vec::with_capacity(half);
        let mut twiddle_im = Vec::with_capacity(half);
        for k in 0..half {
            let angle = -2.0 * PI * k as f64 / size as f64;
            twiddle_re.push(angle.cos());
            twiddle_im.push(angle.sin());
        }

        Ok(Self {
            size,
            reversed_bits,
            twiddle_re,
            twiddle_im,
            real: vec![0.0; size],
            imag: vec![0.0; size],
        })
    }

    /// Transform length.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of output bins (`size / 2`).
    #[inline]
    pub fn bin_count(&self) -> usize {
        self.size / 2
    }

    /// Normalised power spectrum: `(re² + im²) / N²` for bins `0..N/2`.
    ///
    /// # Errors
    ///
    /// `Error::DimensionMismatch` if `signal.len() != size`.
    pub fn power_spectrum<T>(&mut self, signal: &[T]) -> Result<Vec<f32>>
    where
        T: Copy + Into<f64>,
    {
        self.transform(signal)?;
        Ok((0..self.bin_count()).map(|i| self.bin_power(i) as f32).collect())
    }

    /// Power spectrum in decibels: `10·log10(power)`.
    ///
    /// Silent bins come out as `-inf`, matching what a browser analyser
    /// reports for digital silence.
    ///
    /// # Errors
    ///
    /// `Error::DimensionMismatch` if `signal.len() != size`.
    pub fn power_spectrum_db<T>(&mut self, signal: &[T]) -> Result<Vec<f32>>
    where
        T: Copy + Into<f64>,
    {
        self.transform(signal)?;
        Ok((0..self.bin_count())
            .map(|i| (10.0 * self.bin_power(i).log10()) as f32)
            .collect())
    }

    #[inline]
    fn bin_power(&self, i: usize) -> f64 {
        let scale = 1.0 / self.size as f64;
        (self.real[i] * self.real[i] + self.imag[i] * self.imag[i]) * scale * scale
    }

    /// Run the in-place transform into the scratch buffers.
    fn transform<T>(&mut self, signal: &[T]) -> Result<()>
    where
        T: Copy + Into<f64>,
    {
        if signal.len() != self.size {
            return Err(Error::DimensionMismatch {
                expected: self.size,
                got: signal.len(),
            });
        }

        for (dst, &src) in self.real.iter_mut().zip(&self.reversed_bits) {
            *dst = signal[src].into();
        }
        self.imag.fill(0.0);

        let n = self.size;
        let mut stage = 2;
        while stage <= n {
            let half = stage / 2;
            let stride = n / stage;

            for start in (0..n).step_by(stage) {
                for j in 0..half {
                    let tw = j * stride;
                    let even = start + j;
                    let odd = even + half;

                    let w_re = self.twiddle_re[tw];
                    let w_im = self.twiddle_im[tw];
                    let t_re = self.real[odd] * w_re - self.imag[odd] * w_im;
                    let t_im = self.real[odd] * w_im + self.imag[odd] * w_re;

                    self.real[odd] = self.real[even] - t_re;
                    self.imag[odd] = self.imag[even] - t_im;
                    self.real[even] += t_re;
                    self.imag[even] += t_im;
                }
            }
            stage *= 2;
        }

        Ok(())
    }
}

fn reverse_bits(mut value: usize, bits: u32) -> usize {
    let mut reversed = 0;
    for _ in 0..bits {
        reversed = (reversed << 1) | (value & 1);
        value >>= 1;
    }
    reversed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::{num_complex::Complex, FftPlanner};

    fn sine(freq: f64, sample_rate: f64, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin() as f32)
            .collect()
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        assert!(matches!(FftEngine::new(1000), Err(Error::InvalidSize(1000))));
        assert!(matches!(FftEngine::new(0), Err(Error::InvalidSize(0))));
        assert!(matches!(FftEngine::new(1), Err(Error::InvalidSize(1))));
        assert!(FftEngine::new(2).is_ok());
    }

    #[test]
    fn test_rejects_wrong_input_length() {
        let mut fft = FftEngine::new(64).unwrap();
        let err = fft.power_spectrum(&[0.0f32; 32]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 64, got: 32 }));
    }

    #[test]
    fn test_reverse_bits() {
        assert_eq!(reverse_bits(1, 3), 4);
        assert_eq!(reverse_bits(3, 3), 6);
        assert_eq!(reverse_bits(6, 4), 6);
        assert_eq!(reverse_bits(0, 10), 0);
    }

    #[test]
    fn test_matches_rustfft() {
        let n = 256;
        let signal: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64;
                (0.37 * t).sin() + 0.5 * (1.91 * t).cos() + 0.01 * t
            })
            .collect();

        let mut engine = FftEngine::new(n).unwrap();
        let ours = engine.power_spectrum(&signal).unwrap();

        let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        let mut planner = FftPlanner::new();
        planner.plan_fft_forward(n).process(&mut buffer);

        let scale = 1.0 / (n * n) as f64;
        for i in 0..n / 2 {
            let expected = buffer[i].norm_sqr() * scale;
            let got = ours[i] as f64;
            assert!(
                (got - expected).abs() <= 1e-6 * expected.max(1e-6),
                "bin {}: {} vs {}",
                i,
                got,
                expected
            );
        }
    }

    #[test]
    fn test_pure_tone_argmax() {
        let sample_rate = 48000.0;
        for &(n, freq) in &[(1024usize, 440.0), (4096, 1000.0), (4096, 220.0), (8192, 3150.0)] {
            let mut engine = FftEngine::new(n).unwrap();
            let spectrum = engine.power_spectrum_db(&sine(freq, sample_rate, n)).unwrap();
            let argmax = spectrum
                .iter()
                .enumerate()
                .fold(0, |best, (i, &v)| if v > spectrum[best] { i } else { best });
            let expected = (freq / (sample_rate / n as f64)).round() as isize;
            assert!(
                (argmax as isize - expected).abs() <= 1,
                "n={} f={}: argmax {} expected {}",
                n,
                freq,
                argmax,
                expected
            );
        }
    }

    #[test]
    fn test_dc_power_and_silence() {
        let mut engine = FftEngine::new(16).unwrap();
        let power = engine.power_spectrum(&[1.0f32; 16]).unwrap();
        // Full-scale DC: |X[0]| = N, scaled by 1/N² gives 1
        assert!((power[0] - 1.0).abs() < 1e-6);
        assert!(power[1..].iter().all(|&p| p < 1e-12));

        let db = engine.power_spectrum_db(&[0.0f32; 16]).unwrap();
        assert!(db.iter().all(|v| *v == f32::NEG_INFINITY));
    }

    #[test]
    fn test_reuse_is_deterministic() {
        let mut engine = FftEngine::new(512).unwrap();
        let signal = sine(1234.5, 44100.0, 512);
        let first = engine.power_spectrum_db(&signal).unwrap();
        engine.power_spectrum_db(&sine(99.0, 44100.0, 512)).unwrap();
        let again = engine.power_spectrum_db(&signal).unwrap();
        assert_eq!(first, again);
    }
}
