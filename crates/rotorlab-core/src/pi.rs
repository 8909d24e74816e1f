//! PI current regulator
//!
//! One proportional-integral controller per rotor-frame current axis. The
//! FOC loop runs two of these (q and d) at the controller period, each
//! producing a voltage command from a current error.
//!
//! Anti-windup uses conditional integration: when the output saturates at
//! the inverter's voltage limit, error that would drive the output further
//! into saturation is not accumulated. Without this the integral keeps
//! growing during saturation and the controller badly overshoots once the
//! error reverses.

use crate::types::Scalar;
use serde::{Deserialize, Serialize};

/// Proportional/integral gain pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PiGains {
    pub p_gain: Scalar,
    pub i_gain: Scalar,
}

impl PiGains {
    /// Gains for a first-order current-loop bandwidth of `bandwidth`
    /// rad/s on an R-L plant: `p = ω_c·L`, `i = ω_c·R`.
    ///
    /// With these gains the closed current loop behaves like a low-pass
    /// filter with time constant `1/ω_c`, independent of the motor's
    /// electrical time constant.
    pub fn for_bandwidth(bandwidth: Scalar, resistance: Scalar, inductance: Scalar) -> Self {
        Self {
            p_gain: bandwidth * inductance,
            i_gain: bandwidth * resistance,
        }
    }
}

/// PI regulator state for one axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiController {
    pub gains: PiGains,
    /// Accumulated error·dt
    pub integral: Scalar,
    /// Most recent error (observable)
    pub err: Scalar,
    /// Clamp the output and gate the integrator at ±sat_limit
    pub anti_windup: bool,
    /// Output saturation magnitude, set by the caller to the inverter's
    /// linear voltage limit
    pub sat_limit: Scalar,
}

impl PiController {
    pub fn new(gains: PiGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            err: 0.0,
            anti_windup: false,
            sat_limit: Scalar::INFINITY,
        }
    }

    /// Run one update of length `dt`: returns the commanded output for
    /// the measured value against the setpoint.
    pub fn update(&mut self, desired: Scalar, measured: Scalar, dt: Scalar) -> Scalar {
        self.err = desired - measured;

        let candidate = self.integral + self.err * dt;
        let raw = self.gains.p_gain * self.err + self.gains.i_gain * candidate;

        if !self.anti_windup {
            self.integral = candidate;
            return raw;
        }

        if raw > self.sat_limit {
            // Saturated high: only integrate error that pulls back down.
            if self.err < 0.0 {
                self.integral = candidate;
            }
            self.sat_limit
        } else if raw < -self.sat_limit {
            if self.err > 0.0 {
                self.integral = candidate;
            }
            -self.sat_limit
        } else {
            self.integral = candidate;
            raw
        }
    }

    /// Clear accumulated state, keeping the gains.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.err = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bandwidth_gains() {
        let g = PiGains::for_bandwidth(1000.0, 0.1, 1e-4);
        assert!((g.p_gain - 0.1).abs() < 1e-12);
        assert!((g.i_gain - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_proportional_response() {
        let mut pi = PiController::new(PiGains {
            p_gain: 2.0,
            i_gain: 0.0,
        });
        assert!((pi.update(1.0, 0.0, 0.01) - 2.0).abs() < 1e-12);
        assert!((pi.update(1.0, 0.5, 0.01) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_integral_accumulates() {
        let mut pi = PiController::new(PiGains {
            p_gain: 0.0,
            i_gain: 10.0,
        });
        let mut out = 0.0;
        for _ in 0..100 {
            out = pi.update(1.0, 0.0, 0.01);
        }
        // 100 steps of err=1 at dt=0.01 → integral=1, output=10.
        assert!((out - 10.0).abs() < 1e-9);
        assert!((pi.integral - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_anti_windup_clamps_and_gates() {
        let mut pi = PiController::new(PiGains {
            p_gain: 0.0,
            i_gain: 1.0,
        });
        pi.anti_windup = true;
        pi.sat_limit = 1.0;

        // Drive hard into saturation; the integral must stop at the point
        // where the output saturates instead of growing without bound.
        for _ in 0..1000 {
            let out = pi.update(10.0, 0.0, 0.01);
            assert!(out <= 1.0);
        }
        assert!(pi.integral <= 1.0 + 0.1 + 1e-9, "integral wound up: {}", pi.integral);

        // Error reversal must bring the output back quickly.
        let out = pi.update(-10.0, 0.0, 0.01);
        assert!(out < 1.0);
    }

    #[test]
    fn test_reset() {
        let mut pi = PiController::new(PiGains {
            p_gain: 1.0,
            i_gain: 1.0,
        });
        pi.update(1.0, 0.0, 0.1);
        assert!(pi.integral != 0.0);
        pi.reset();
        assert_eq!(pi.integral, 0.0);
        assert_eq!(pi.err, 0.0);
    }
}
