//! Cogging torque map
//!
//! Cogging is the parasitic, position-dependent torque produced by the
//! stator teeth attracting the rotor magnets even with zero current. The
//! simulator models it as a fixed-length table of torque samples over one
//! mechanical revolution, looked up with linear interpolation and cyclic
//! wrap.
//!
//! Because cogging is a conservative effect, its integral over a full
//! revolution must vanish or the map would pump energy into (or out of)
//! the rotor every turn. Installing a map audits that integral; the
//! [`CoggingMap::recenter`] pass removes any end-to-end slope and DC
//! offset so the audit passes by construction.

use crate::types::{ParamError, ParamResult, Scalar};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Default number of samples over one revolution (0.1° spacing).
pub const DEFAULT_MAP_LEN: usize = 3600;

/// Threshold on |∮ τ_cog dθ| above which a map is flagged as
/// energy-non-conserving.
pub const ENERGY_AUDIT_THRESHOLD: Scalar = 1e-8;

/// Peak torque the random generator rescales to, N·m.
const RANDOM_MAP_PEAK: Scalar = 0.01;

/// Tabulated cogging torque over one mechanical revolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoggingMap {
    samples: Vec<Scalar>,
}

impl Default for CoggingMap {
    fn default() -> Self {
        Self::zero()
    }
}

impl CoggingMap {
    /// An all-zero map (no cogging) at the default resolution.
    pub fn zero() -> Self {
        Self {
            samples: vec![0.0; DEFAULT_MAP_LEN],
        }
    }

    /// Wrap an explicit sample table.
    pub fn from_samples(samples: Vec<Scalar>) -> ParamResult<Self> {
        if samples.is_empty() {
            return Err(ParamError::EmptyCoggingMap);
        }
        for &s in &samples {
            if !s.is_finite() {
                return Err(ParamError::NotFinite {
                    name: "cogging_map",
                    value: s,
                });
            }
        }
        Ok(Self { samples })
    }

    /// Generate a plausible random map for a motor with `num_pole_pairs`
    /// pole pairs.
    ///
    /// Superimposes six Fourier components at frequencies that tend to
    /// dominate real cogging spectra (multiples of the pole count plus
    /// slot-interaction terms), with normally distributed amplitudes, then
    /// rescales the peak to 0.01 N·m. The map is then recentered so the
    /// energy audit passes.
    pub fn random(num_pole_pairs: u32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).expect("unit normal is valid");

        let p = num_pole_pairs as usize;
        let frequencies = [1, p, 2 * p + 1, 3 * p + 2, 7 * p + 3, 10 * p + 4];
        let scales = [0.5, 1.5, 1.0, 1.5, 0.5, 0.25];

        // Cos coefficients at even indices, sin at odd.
        let mut coeffs = [0.0; 12];
        for (i, c) in coeffs.iter_mut().enumerate() {
            *c = normal.sample(&mut rng) * scales[i / 2];
        }

        let n = DEFAULT_MAP_LEN;
        let mut samples = vec![0.0; n];
        for (i, slot) in samples.iter_mut().enumerate() {
            let progress = i as Scalar / n as Scalar;
            let mut val = 0.0;
            for (f, freq) in frequencies.iter().enumerate() {
                let phase = progress * 2.0 * PI * *freq as Scalar;
                val += coeffs[2 * f] * phase.cos() + coeffs[2 * f + 1] * phase.sin();
            }
            *slot = val;
        }

        let mut map = Self { samples };
        map.recenter();
        map.rescale_peak(RANDOM_MAP_PEAK);
        map
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Scalar] {
        &self.samples
    }

    pub fn validate(&self) -> ParamResult<()> {
        if self.samples.is_empty() {
            return Err(ParamError::EmptyCoggingMap);
        }
        Ok(())
    }

    /// Cogging torque at a mechanical angle, linearly interpolated with
    /// cyclic wrap at the table boundary.
    pub fn lookup(&self, rotor_angle: Scalar) -> Scalar {
        let n = self.samples.len();
        let pos = rotor_angle.rem_euclid(2.0 * PI) / (2.0 * PI) * n as Scalar;
        let i0 = (pos as usize) % n;
        let i1 = (i0 + 1) % n;
        let frac = pos - pos.floor();
        self.samples[i0] * (1.0 - frac) + self.samples[i1] * frac
    }

    /// Integral of the map over one revolution, `Σ τ_cog · 2π/N`.
    ///
    /// Nonzero values mean the map injects net energy every turn.
    pub fn energy_integral(&self) -> Scalar {
        let sum: Scalar = self.samples.iter().sum();
        sum * 2.0 * PI / self.samples.len() as Scalar
    }

    /// Whether the map satisfies the energy-conservation audit.
    pub fn conserves_energy(&self) -> bool {
        self.energy_integral().abs() <= ENERGY_AUDIT_THRESHOLD
    }

    /// Run the energy audit, logging a warning on failure. Returns
    /// whether the map conserves energy.
    pub fn audit(&self) -> bool {
        let integral = self.energy_integral();
        if integral.abs() > ENERGY_AUDIT_THRESHOLD {
            tracing::warn!(integral, "cogging map violates energy conservation");
            false
        } else {
            true
        }
    }

    /// Remove the end-to-end slope and the DC offset.
    ///
    /// After this pass the first and last samples agree and the mean is
    /// zero, so [`Self::energy_integral`] vanishes to rounding error.
    pub fn recenter(&mut self) {
        let n = self.samples.len();
        if n < 2 {
            self.samples.fill(0.0);
            return;
        }

        let slope = (self.samples[n - 1] - self.samples[0]) / (n - 1) as Scalar;
        for (i, s) in self.samples.iter_mut().enumerate() {
            *s -= slope * i as Scalar;
        }

        let mean: Scalar = self.samples.iter().sum::<Scalar>() / n as Scalar;
        for s in self.samples.iter_mut() {
            *s -= mean;
        }
    }

    /// Rescale so the largest magnitude equals `peak` (no-op for an
    /// all-zero map).
    pub fn rescale_peak(&mut self, peak: Scalar) {
        let max_abs = self
            .samples
            .iter()
            .fold(0.0_f64, |acc, &s| acc.max(s.abs()));
        if max_abs > 0.0 {
            let scale = peak / max_abs;
            for s in self.samples.iter_mut() {
                *s *= scale;
            }
        }
    }
}
