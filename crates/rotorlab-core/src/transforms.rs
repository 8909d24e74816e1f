//! Clarke and Park transforms
//!
//! Reference-frame machinery for three-phase quantities. The Clarke
//! transform maps the three coil values onto a stationary two-axis plane;
//! the Park transform rotates that plane so the q axis tracks the rotor
//! flux. Both are expressed through complex arithmetic: a frame rotation
//! is a multiplication by a unit phasor.
//!
//! The Clarke variant here is amplitude-invariant: a balanced sinusoidal
//! triple of amplitude `A` maps to a vector of magnitude `A`.

use crate::types::{Complex, PhaseTriple, Scalar};
use std::f64::consts::{FRAC_PI_2, PI};

/// √3, used by both Clarke directions.
pub const SQRT_3: Scalar = 1.732_050_807_568_877_2;

/// Amplitude-invariant Clarke transform: three coil values to one
/// stationary-frame vector.
///
/// `α = (2a − b − c)/3`, `β = (b − c)/√3`, returned as `α + jβ`.
#[inline]
pub fn clarke(phases: PhaseTriple) -> Complex {
    let [a, b, c] = phases;
    Complex::new((2.0 * a - b - c) / 3.0, (b - c) / SQRT_3)
}

/// Inverse Clarke transform onto a balanced triple (a + b + c = 0).
#[inline]
pub fn inverse_clarke(v: Complex) -> PhaseTriple {
    let a = v.re;
    let b = (-v.re + SQRT_3 * v.im) / 2.0;
    let c = (-v.re - SQRT_3 * v.im) / 2.0;
    [a, b, c]
}

/// Unit phasor `cos φ + j sin φ`.
///
/// Multiplying a space vector by `rotation(φ)` rotates it by `φ`;
/// multiplying by `rotation(-φ)` projects it into a frame rotated by `φ`.
#[inline]
pub fn rotation(angle: Scalar) -> Complex {
    let (s, c) = angle.sin_cos();
    Complex::new(c, s)
}

/// Park transform: stationary αβ vector into the rotating qd frame whose
/// q axis sits at electrical angle `q_axis_angle`.
///
/// The result carries q on the real axis and d on the imaginary axis.
#[inline]
pub fn park(v_alphabeta: Complex, q_axis_angle: Scalar) -> Complex {
    v_alphabeta * rotation(-q_axis_angle)
}

/// Inverse Park transform: rotor-frame qd vector back to the stationary
/// frame.
#[inline]
pub fn inverse_park(v_qd: Complex, q_axis_angle: Scalar) -> Complex {
    v_qd * rotation(q_axis_angle)
}

/// Electrical angle of the rotor flux, wrapped to `[0, 2π)`.
#[inline]
pub fn electrical_angle(num_pole_pairs: u32, rotor_angle: Scalar) -> Scalar {
    (num_pole_pairs as Scalar * rotor_angle).rem_euclid(2.0 * PI)
}

/// Electrical angle of the q axis, which leads the rotor flux vector by
/// 90°.
#[inline]
pub fn q_axis_electrical_angle(num_pole_pairs: u32, rotor_angle: Scalar) -> Scalar {
    num_pole_pairs as Scalar * rotor_angle - FRAC_PI_2
}
