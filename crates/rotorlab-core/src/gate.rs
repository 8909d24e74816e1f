//! H-bridge gate model
//!
//! Each motor phase hangs off one half-bridge whose midpoint is either tied
//! to the bus (HIGH), tied to ground (LOW), or floating (OFF) with only the
//! body diodes available to conduct. Controllers request LOW/HIGH (or OFF
//! for a six-step floating phase); the *actual* switch state lags the
//! request by the configured dead time, during which the phase floats.
//!
//! Dead time is the mandatory lockout real gate drivers insert between
//! turning one transistor off and the complementary one on; without it the
//! bridge would momentarily short the bus (shoot-through). The simulator
//! models it as a per-phase countdown that starts whenever the commanded
//! value changes.

use crate::types::{PhaseTriple, Scalar};
use serde::{Deserialize, Serialize};

/// State of one half-bridge output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Switch {
    /// Midpoint tied to ground
    Low,
    /// Midpoint tied to the bus
    High,
    /// Both transistors off; only the body diodes conduct
    Off,
}

impl Default for Switch {
    fn default() -> Self {
        Switch::Low
    }
}

/// Gate drive state for all three half-bridges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateState {
    /// Controller-requested switch states
    pub commanded: [Switch; 3],
    /// Physical switch states, lagging `commanded` by the dead time
    pub actual: [Switch; 3],
    /// Lockout inserted after every commanded transition, seconds
    pub dead_time: Scalar,
    /// Per-phase countdown until `actual` may follow `commanded`
    pub dead_time_remaining: PhaseTriple,
    /// Forward drop of a conducting body diode, V
    pub diode_active_voltage: Scalar,
    /// Minimum current magnitude for a body diode to be treated as
    /// conducting, A
    pub diode_active_current_threshold: Scalar,
}

impl Default for GateState {
    fn default() -> Self {
        Self {
            commanded: [Switch::Low; 3],
            actual: [Switch::Low; 3],
            dead_time: 0.0,
            dead_time_remaining: [0.0; 3],
            diode_active_voltage: 0.7, // silicon body diode
            diode_active_current_threshold: 1e-6,
        }
    }
}

impl GateState {
    /// Advance the dead-time state machine by one tick of length `dt`.
    ///
    /// Invariant: whenever `commanded[n]` changes, `actual[n]` goes OFF and
    /// the countdown restarts; `actual[n]` assumes the commanded value only
    /// once the countdown reaches zero. `prev_commanded` is the commanded
    /// triple observed on the previous tick.
    pub fn step(&mut self, dt: Scalar, prev_commanded: [Switch; 3]) {
        for n in 0..3 {
            if self.commanded[n] != prev_commanded[n] {
                if self.dead_time > 0.0 {
                    self.actual[n] = Switch::Off;
                    self.dead_time_remaining[n] = self.dead_time;
                } else {
                    self.actual[n] = self.commanded[n];
                    self.dead_time_remaining[n] = 0.0;
                }
            } else if self.dead_time_remaining[n] > 0.0 {
                self.dead_time_remaining[n] -= dt;
                if self.dead_time_remaining[n] <= 0.0 {
                    self.dead_time_remaining[n] = 0.0;
                    self.actual[n] = self.commanded[n];
                }
            }
        }
    }
}

/// Result of resolving one tick's pole voltages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoleVoltages {
    /// Half-bridge midpoint voltages, V
    pub volts: PhaseTriple,
    /// Phases whose OFF-state current was too small to pick a diode;
    /// their voltage was pinned to ground deterministically
    pub indeterminate: [bool; 3],
}

/// Resolve the half-bridge midpoint voltages from the actual switch
/// states and the instantaneous phase currents.
///
/// An OFF phase freewheels through a body diode: current flowing out of
/// the pole pulls it one diode drop below ground; current flowing into
/// the pole pushes it one diode drop above the bus. Below the conduction
/// threshold neither diode is on and the midpoint is physically
/// indeterminate; it is pinned to ground and flagged so observers can
/// render a sentinel.
pub fn pole_voltages(
    bus_voltage: Scalar,
    phase_currents: PhaseTriple,
    gate: &GateState,
) -> PoleVoltages {
    let mut out = PoleVoltages::default();
    for n in 0..3 {
        out.volts[n] = match gate.actual[n] {
            Switch::High => bus_voltage,
            Switch::Low => 0.0,
            Switch::Off => {
                let i = phase_currents[n];
                if i > gate.diode_active_current_threshold {
                    // Low-side diode conducts toward ground.
                    -gate.diode_active_voltage
                } else if i < -gate.diode_active_current_threshold {
                    // High-side diode conducts toward the bus.
                    bus_voltage + gate.diode_active_voltage
                } else {
                    out.indeterminate[n] = true;
                    0.0
                }
            }
        };
    }
    out
}
