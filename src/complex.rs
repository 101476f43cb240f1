//! Complex helpers for polynomial root finding.
//!
//! `num_complex::Complex64` already provides the arithmetic, `norm`, `arg`,
//! `from_polar` and `is_finite`. Root refinement additionally needs a division
//! that refuses to divide by a vanishing denominator instead of producing
//! `inf`/`NaN`, and a Horner evaluator for monic polynomials.

use num_complex::Complex64;

/// Division that reports degenerate denominators.
pub trait CheckedDiv: Sized {
    /// `self / rhs`, or `None` if `|rhs|` underflows to zero or the quotient
    /// is not finite.
    fn checked_div(self, rhs: Self) -> Option<Self>;
}

impl CheckedDiv for Complex64 {
    fn checked_div(self, rhs: Self) -> Option<Self> {
        let denom = rhs.norm_sqr();
        if denom == 0.0 || !denom.is_finite() {
            return None;
        }

        let q = Complex64::new(
            (self.re * rhs.re + self.im * rhs.im) / denom,
            (self.im * rhs.re - self.re * rhs.im) / denom,
        );
        q.is_finite().then_some(q)
    }
}

/// Evaluate a polynomial with real coefficients at `z` using Horner's method.
///
/// `coefficients` are ordered from the highest power down:
/// `c[0]·z^n + c[1]·z^(n-1) + ... + c[n]`.
pub fn eval_polynomial(coefficients: &[f64], z: Complex64) -> Complex64 {
    coefficients
        .iter()
        .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z + c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_div() {
        let a = Complex64::new(1.0, 2.0);
        let b = Complex64::new(3.0, -1.0);
        let q = a.checked_div(b).unwrap();
        let expected = a / b;
        assert!((q - expected).norm() < 1e-15);

        assert!(a.checked_div(Complex64::new(0.0, 0.0)).is_none());
        // |b|² underflows to zero even though b itself is non-zero
        assert!(a.checked_div(Complex64::new(1e-200, 1e-200)).is_none());
        assert!(a.checked_div(Complex64::new(f64::NAN, 0.0)).is_none());
    }

    #[test]
    fn test_eval_polynomial() {
        // z² + 1 vanishes at ±i
        let p = [1.0, 0.0, 1.0];
        assert!(eval_polynomial(&p, Complex64::new(0.0, 1.0)).norm() < 1e-15);
        assert!(eval_polynomial(&p, Complex64::new(0.0, -1.0)).norm() < 1e-15);

        // z³ - 6z² + 11z - 6 at z = 4 is 6
        let q = [1.0, -6.0, 11.0, -6.0];
        let v = eval_polynomial(&q, Complex64::new(4.0, 0.0));
        assert!((v - Complex64::new(6.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_polar_round_trip() {
        let z = Complex64::from_polar(0.9, 1.2);
        assert!((z.norm() - 0.9).abs() < 1e-15);
        assert!((z.arg() - 1.2).abs() < 1e-15);
    }
}
