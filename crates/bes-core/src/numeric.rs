use crate::CoreError;

/// Floating point type used throughout the engine.
pub type Real = f64;

/// Convergence tolerance for fixed-point iteration of implicit groups.
///
/// A value is converged when `|new - old| <= rel * (|new| + abs_band)`; the band keeps
/// the test meaningful for quantities that settle near zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub rel: Real,
    pub abs_band: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rel: 1e-9,
            abs_band: 0.1,
        }
    }
}

impl Tolerances {
    /// A non-finite new value never counts as converged.
    pub fn converged(&self, old: Real, new: Real) -> bool {
        new.is_finite() && (new - old).abs() <= self.rel * (new.abs() + self.abs_band)
    }
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_band_handles_zero() {
        let tol = Tolerances::default();
        assert!(tol.converged(0.0, 1e-11));
        assert!(!tol.converged(0.0, 1e-9));
        assert!(tol.converged(1000.0, 1000.0 + 1e-7));
    }

    #[test]
    fn overflow_is_not_convergence() {
        let tol = Tolerances::default();
        assert!(!tol.converged(1.0, Real::INFINITY));
        assert!(!tol.converged(Real::INFINITY, Real::INFINITY));
        assert!(!tol.converged(1.0, Real::NAN));
        assert!(!tol.converged(Real::NAN, 1.0));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }
}
