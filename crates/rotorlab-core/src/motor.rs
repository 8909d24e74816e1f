//! Motor model
//!
//! Parameters and state for a three-phase permanent-magnet machine with an
//! odd-harmonic back-EMF waveform and a tabulated cogging torque.
//!
//! The back-EMF of each coil is described by its *normed* waveform: the
//! voltage the coil would produce at a rotor speed of exactly 1 rad/s. The
//! normed waveform is a five-term odd sine series in electrical angle,
//! `a1 sin θ_e + a3 sin 3θ_e + … + a9 sin 9θ_e`, and the physical bEMF is
//! the normed value times the mechanical angular velocity. The same normed
//! waveform doubles as the torque constant: torque is the dot product of
//! phase currents with the normed bEMF triple.

use crate::cogging::CoggingMap;
use crate::sine_series::odd_sine_dot;
use crate::types::{
    check_positive, ParamError, ParamResult, PhaseTriple, Scalar, NUM_BEMF_HARMONICS,
    PHASE_OFFSETS,
};
use serde::{Deserialize, Serialize};

/// Ratios of the 3rd/5th/7th/9th harmonics to the fundamental for the
/// trapezoidal back-EMF preset.
const TRAPEZOID_RATIOS: [Scalar; 4] = [0.278, 0.119, 0.053, 0.029];

/// Physical constants of one motor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorParams {
    /// Number of rotor pole pairs (1..=8)
    pub num_pole_pairs: u32,
    /// Rotor moment of inertia in kg·m²
    pub rotor_inertia: Scalar,
    /// Per-phase winding resistance in Ω
    pub phase_resistance: Scalar,
    /// Per-phase winding inductance in H
    pub phase_inductance: Scalar,
    /// Odd-harmonic normed back-EMF coefficients [a1, a3, a5, a7, a9]
    /// in V·s/rad. a1 is the fundamental; the rest are absolute values,
    /// not ratios.
    pub normed_bemf_coeffs: [Scalar; NUM_BEMF_HARMONICS],
    /// Cogging torque over one mechanical revolution
    pub cogging_map: CoggingMap,
}

impl Default for MotorParams {
    fn default() -> Self {
        Self {
            num_pole_pairs: 4,
            rotor_inertia: 0.01,        // small hobby outrunner
            phase_resistance: 0.1,      // Ω
            phase_inductance: 1e-4,     // H
            normed_bemf_coeffs: Self::sinusoidal_bemf(0.05),
            cogging_map: CoggingMap::zero(),
        }
    }
}

impl MotorParams {
    /// Coefficients for a purely sinusoidal back-EMF with fundamental `a1`.
    pub fn sinusoidal_bemf(a1: Scalar) -> [Scalar; NUM_BEMF_HARMONICS] {
        [a1, 0.0, 0.0, 0.0, 0.0]
    }

    /// Coefficients approximating a trapezoidal back-EMF with fundamental
    /// `a1`, using the harmonic ratios of an ideal 120° trapezoid.
    pub fn trapezoidal_bemf(a1: Scalar) -> [Scalar; NUM_BEMF_HARMONICS] {
        [
            a1,
            a1 * TRAPEZOID_RATIOS[0],
            a1 * TRAPEZOID_RATIOS[1],
            a1 * TRAPEZOID_RATIOS[2],
            a1 * TRAPEZOID_RATIOS[3],
        ]
    }

    /// Validate every parameter. Called at the edit boundary so the
    /// integrator never sees a non-physical motor.
    pub fn validate(&self) -> ParamResult<()> {
        if !(1..=8).contains(&self.num_pole_pairs) {
            return Err(ParamError::PolePairsOutOfRange(self.num_pole_pairs));
        }
        check_positive("rotor_inertia", self.rotor_inertia)?;
        check_positive("phase_resistance", self.phase_resistance)?;
        check_positive("phase_inductance", self.phase_inductance)?;
        for (k, &a) in self.normed_bemf_coeffs.iter().enumerate() {
            if !a.is_finite() {
                return Err(ParamError::NotFinite {
                    name: "normed_bemf_coeffs",
                    value: a,
                });
            }
            // Only the fundamental has a sign constraint: a non-positive a1
            // flips the torque convention and breaks the drive math.
            if k == 0 && a <= 0.0 {
                return Err(ParamError::NonPositive {
                    name: "normed_bemf_coeffs[0]",
                    value: a,
                });
            }
        }
        self.cogging_map.validate()
    }

    /// Normed back-EMF waveform at the given electrical angle.
    #[inline]
    pub fn normed_bemf(&self, electrical_angle: Scalar) -> Scalar {
        odd_sine_dot(electrical_angle, &self.normed_bemf_coeffs)
    }

    /// Normed back-EMF of all three coils at the given electrical angle.
    #[inline]
    pub fn normed_bemfs(&self, electrical_angle: Scalar) -> PhaseTriple {
        [
            self.normed_bemf(electrical_angle + PHASE_OFFSETS[0]),
            self.normed_bemf(electrical_angle + PHASE_OFFSETS[1]),
            self.normed_bemf(electrical_angle + PHASE_OFFSETS[2]),
        ]
    }

    /// Torque produced by one ampere of q-axis current at this electrical
    /// angle.
    ///
    /// A unit q-axis current maps to phase currents `sin(θ_e + φ_n)`;
    /// dotting those with the normed bEMF triple gives the instantaneous
    /// torque-per-amp. For a sinusoidal machine this is the constant
    /// `(3/2)·a1`; with harmonics present it ripples with angle, which is
    /// exactly what the non-sinusoidal drive mode compensates.
    pub fn torque_per_amp(&self, electrical_angle: Scalar) -> Scalar {
        let normed = self.normed_bemfs(electrical_angle);
        let mut k = 0.0;
        for n in 0..3 {
            k += (electrical_angle + PHASE_OFFSETS[n]).sin() * normed[n];
        }
        k
    }

    /// The sinusoidal-machine torque constant `(3/2)·a1`, the angle-free
    /// approximation of [`Self::torque_per_amp`].
    #[inline]
    pub fn sinusoidal_torque_constant(&self) -> Scalar {
        1.5 * self.normed_bemf_coeffs[0]
    }
}

/// Rotor kinematics.
///
/// `torque` holds the torque the motor itself produces (electromagnetic
/// plus cogging); external load torque enters only the acceleration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotorKinematic {
    /// Mechanical rotor angle, always in [0, 2π)
    pub rotor_angle: Scalar,
    /// Mechanical angular velocity in rad/s
    pub rotor_angular_vel: Scalar,
    /// Mechanical angular acceleration in rad/s²
    pub rotor_angular_accel: Scalar,
    /// Motor-produced torque in N·m
    pub torque: Scalar,
}

/// Electrical state of the three windings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotorElectrical {
    /// Phase currents in A
    pub phase_currents: PhaseTriple,
    /// Back-EMF of each coil in V
    pub bemfs: PhaseTriple,
    /// Back-EMF divided by angular velocity (the waveform at ω = 1)
    pub normed_bemfs: PhaseTriple,
}

/// Full motor: parameters plus live state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotorState {
    pub params: MotorParams,
    pub kinematic: MotorKinematic,
    pub electrical: MotorElectrical,
}

impl MotorState {
    /// A quiescent motor with the given parameters.
    pub fn new(params: MotorParams) -> Self {
        Self {
            params,
            kinematic: MotorKinematic::default(),
            electrical: MotorElectrical::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_default_params_valid() {
        assert!(MotorParams::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_nonphysical() {
        let mut p = MotorParams::default();
        p.phase_resistance = 0.0;
        assert!(p.validate().is_err());

        let mut p = MotorParams::default();
        p.num_pole_pairs = 9;
        assert!(matches!(
            p.validate(),
            Err(ParamError::PolePairsOutOfRange(9))
        ));

        let mut p = MotorParams::default();
        p.rotor_inertia = -1.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_sinusoidal_normed_bemf() {
        let p = MotorParams::default();
        let a1 = p.normed_bemf_coeffs[0];
        for i in 0..32 {
            let theta = i as Scalar * PI / 16.0;
            assert!((p.normed_bemf(theta) - a1 * theta.sin()).abs() < 1e-14);
        }
    }

    #[test]
    fn test_sinusoidal_torque_per_amp_is_constant() {
        let p = MotorParams::default();
        let expected = p.sinusoidal_torque_constant();
        for i in 0..64 {
            let theta = i as Scalar * PI / 32.0;
            assert!(
                (p.torque_per_amp(theta) - expected).abs() < 1e-12,
                "angle {}: {} vs {}",
                theta,
                p.torque_per_amp(theta),
                expected
            );
        }
    }

    #[test]
    fn test_trapezoid_torque_per_amp_ripples() {
        let mut p = MotorParams::default();
        p.normed_bemf_coeffs = MotorParams::trapezoidal_bemf(0.05);
        let k0 = p.torque_per_amp(0.0);
        let k1 = p.torque_per_amp(PI / 7.0);
        assert!((k0 - k1).abs() > 1e-6, "harmonics should modulate the curve");
    }

    #[test]
    fn test_normed_bemfs_are_phase_shifted_copies() {
        let p = MotorParams::default();
        let theta = 0.9;
        let triple = p.normed_bemfs(theta);
        for n in 0..3 {
            let expected = p.normed_bemf(theta + PHASE_OFFSETS[n]);
            assert_eq!(triple[n], expected);
        }
    }
}
