//! PWM carrier and duty model
//!
//! The FOC controller outputs one duty cycle per phase; the gate commands
//! are recovered each tick by comparing the (optionally quantized) duty
//! against a sawtooth carrier. Quantization models the finite timer
//! resolution of a real PWM peripheral: a 1-bit timer can only emit
//! duties {0, ½, 1}, an 8-bit timer multiples of 2⁻⁸, and so on.

use crate::gate::Switch;
use crate::types::{check_range, ParamError, ParamResult, PhaseTriple, Scalar};
use serde::{Deserialize, Serialize};

/// PWM carrier and per-phase duty state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PwmState {
    /// Sawtooth carrier position in [0, 1)
    pub level: Scalar,
    /// Carrier frequency, Hz
    pub frequency: Scalar,
    /// Per-phase duty cycles in [0, 1]
    pub duties: PhaseTriple,
    /// Duty quantization step: 0 disables quantization, otherwise 2⁻ⁿ
    pub resolution: Scalar,
}

impl Default for PwmState {
    fn default() -> Self {
        Self {
            level: 0.0,
            frequency: 15_000.0, // typical drive carrier
            duties: [0.0; 3],
            resolution: 0.0,
        }
    }
}

impl PwmState {
    /// Validate a resolution edit: zero, or a reciprocal power of two in
    /// (0, 1].
    pub fn check_resolution(resolution: Scalar) -> ParamResult<()> {
        if resolution == 0.0 {
            return Ok(());
        }
        check_range("pwm_resolution", resolution, 0.0, 1.0)?;
        // log2 of a power-of-two reciprocal is a negative integer.
        let bits = -resolution.log2();
        if bits.fract() != 0.0 {
            return Err(ParamError::InvalidPwmResolution(resolution));
        }
        Ok(())
    }

    /// Advance the carrier by one tick of length `dt`.
    pub fn advance_carrier(&mut self, dt: Scalar) {
        self.level = (self.level + dt * self.frequency).rem_euclid(1.0);
    }

    /// Quantize a duty to the nearest multiple of `self.resolution`.
    #[inline]
    pub fn quantize(&self, duty: Scalar) -> Scalar {
        if self.resolution > 0.0 {
            (duty / self.resolution).round() * self.resolution
        } else {
            duty
        }
    }

    /// Store duties, clamped to [0, 1] and quantized.
    pub fn set_duties(&mut self, duties: PhaseTriple) {
        for n in 0..3 {
            self.duties[n] = self.quantize(duties[n].clamp(0.0, 1.0));
        }
    }

    /// Gate commands from the duty/carrier comparison.
    ///
    /// Duties are stored already quantized, so the comparison is a plain
    /// threshold against the carrier level.
    pub fn commands(&self) -> [Switch; 3] {
        let mut out = [Switch::Low; 3];
        for n in 0..3 {
            out[n] = if self.duties[n] > self.level {
                Switch::High
            } else {
                Switch::Low
            };
        }
        out
    }
}
