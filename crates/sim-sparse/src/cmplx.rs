//! Small complex-arithmetic helpers on top of `num_complex`.
//!
//! The engine stores element values as separate (re, im) pairs; these helpers
//! package them as `Complex64` for the handful of places that need complex
//! products and the overflow-safe reciprocal.

use num_complex::Complex64;

/// 1-norm of a complex value: `|re| + |im|`. Used as the pivot magnitude in
/// the complex paths.
#[inline]
pub(crate) fn one_norm(c: Complex64) -> f64 {
    c.re.abs() + c.im.abs()
}

/// Infinity norm of a complex value: `max(|re|, |im|)`.
#[inline]
pub(crate) fn inf_norm(c: Complex64) -> f64 {
    c.re.abs().max(c.im.abs())
}

/// Reciprocal in the branch-on-magnitude form. Dividing by the larger
/// component first keeps the intermediate ratio at or below one, which avoids
/// the overflow/underflow of the textbook `1 / (a + bi)` expansion.
#[inline]
pub(crate) fn reciprocal(c: Complex64) -> Complex64 {
    if (c.re >= c.im && c.re > -c.im) || (c.re < c.im && c.re <= -c.im) {
        let r = c.im / c.re;
        let re = 1.0 / (c.re + r * c.im);
        Complex64::new(re, -r * re)
    } else {
        let r = c.re / c.im;
        let im = -1.0 / (c.im + r * c.re);
        Complex64::new(-r * im, im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reciprocal_matches_division() {
        for &(re, im) in &[(3.0, 4.0), (-2.0, 0.5), (1e-3, -7.0), (5.0, 0.0), (0.0, 2.0)] {
            let c = Complex64::new(re, im);
            let r = reciprocal(c);
            let expected = Complex64::new(1.0, 0.0) / c;
            assert_relative_eq!(r.re, expected.re, max_relative = 1e-14);
            assert_relative_eq!(r.im, expected.im, max_relative = 1e-14);
        }
    }

    #[test]
    fn reciprocal_survives_extreme_magnitudes() {
        // The naive form overflows the denominator for components near
        // sqrt(f64::MAX); the scaled form must not.
        let c = Complex64::new(1e200, 1e200);
        let r = reciprocal(c);
        assert!(r.re.is_finite() && r.im.is_finite());
        let back = reciprocal(r);
        assert_relative_eq!(back.re, c.re, max_relative = 1e-12);
        assert_relative_eq!(back.im, c.im, max_relative = 1e-12);
    }

    #[test]
    fn norms() {
        let c = Complex64::new(-3.0, 4.0);
        assert_eq!(one_norm(c), 7.0);
        assert_eq!(inf_norm(c), 4.0);
    }
}
