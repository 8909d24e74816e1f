//! Core types for the motor simulator
//!
//! This module defines the fundamental types used throughout the rotorlab
//! crates, particularly the scalar precision and the complex representation
//! of space vectors.
//!
//! ## Space vectors as complex numbers
//!
//! Three balanced phase quantities collapse to a single point in a 2-D
//! stationary plane (the Clarke transform). We represent that point as a
//! complex number where:
//! - **re (α)**: the component along phase a's magnetic axis
//! - **im (β)**: the component 90° ahead of it
//!
//! Rotating-frame (Park) quantities reuse the same representation with
//! q on the real axis and d on the imaginary axis.
//!
//! ```text
//!            β (Imaginary)
//!            ^
//!            |     * (α=0.7, β=0.7)
//!            |    /
//!            |   / magnitude = 1.0
//!            |  /  angle = 45°
//!            | /
//!   ---------+---------> α (Real)
//!            |
//! ```

use num_complex::Complex64;
use std::f64::consts::PI;

/// The simulator's single source of floating-point precision.
pub type Scalar = f64;

/// A space vector in either the stationary (αβ) or rotating (qd) frame.
pub type Complex = Complex64;

/// One value per motor phase, in coil order a, b, c.
pub type PhaseTriple = [Scalar; 3];

/// Electrical angle offset of each coil, radians.
///
/// Positive abc sequence: coil b lags a by 120°, coil c leads a by 120°,
/// so a rotor spinning with positive angular velocity sweeps a, then b,
/// then c.
pub const PHASE_OFFSETS: PhaseTriple = [0.0, -2.0 * PI / 3.0, 2.0 * PI / 3.0];

/// Number of odd harmonics in the back-EMF series (a1, a3, a5, a7, a9).
pub const NUM_BEMF_HARMONICS: usize = 5;

/// Result type for parameter edits.
pub type ParamResult<T> = Result<T, ParamError>;

/// Errors raised at the parameter-edit boundary.
///
/// The tick path never observes an invalid parameter: every mutation is
/// validated here first, and rejected edits leave the previous value in
/// place.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("{name} must be strictly positive, got {value}")]
    NonPositive { name: &'static str, value: Scalar },

    #[error("num_pole_pairs must be in 1..=8, got {0}")]
    PolePairsOutOfRange(u32),

    #[error("{name} must be in [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: Scalar,
        min: Scalar,
        max: Scalar,
    },

    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: Scalar },

    #[error("cogging map must not be empty")]
    EmptyCoggingMap,

    #[error("PWM resolution must be 0 or a power of two reciprocal in (0, 1], got {0}")]
    InvalidPwmResolution(Scalar),
}

/// Validate that `value` is finite and strictly positive.
pub fn check_positive(name: &'static str, value: Scalar) -> ParamResult<()> {
    if !value.is_finite() {
        return Err(ParamError::NotFinite { name, value });
    }
    if value <= 0.0 {
        return Err(ParamError::NonPositive { name, value });
    }
    Ok(())
}

/// Validate that `value` is finite and inside `[min, max]`.
pub fn check_range(name: &'static str, value: Scalar, min: Scalar, max: Scalar) -> ParamResult<()> {
    if !value.is_finite() {
        return Err(ParamError::NotFinite { name, value });
    }
    if value < min || value > max {
        return Err(ParamError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_positive() {
        assert!(check_positive("r", 0.1).is_ok());
        assert!(check_positive("r", 0.0).is_err());
        assert!(check_positive("r", -1.0).is_err());
        assert!(check_positive("r", Scalar::NAN).is_err());
    }

    #[test]
    fn test_check_range() {
        assert!(check_range("adv", 0.25, -0.5, 0.5).is_ok());
        assert!(check_range("adv", 0.75, -0.5, 0.5).is_err());
        assert!(check_range("adv", Scalar::INFINITY, -0.5, 0.5).is_err());
    }

    #[test]
    fn test_phase_offsets_balanced() {
        let sum: Scalar = PHASE_OFFSETS.iter().sum();
        assert!(sum.abs() < 1e-12);
    }
}
