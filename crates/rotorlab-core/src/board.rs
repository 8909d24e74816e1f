//! Drive-board state
//!
//! The board is everything between the DC supply and the motor terminals:
//! the bus, the three half-bridges, and the PWM peripheral that times
//! their gates.

use crate::gate::GateState;
use crate::pwm::PwmState;
use crate::types::{check_positive, ParamResult, Scalar};
use serde::{Deserialize, Serialize};

/// Power-stage state: bus, gates, PWM.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardState {
    /// DC bus voltage, V
    pub bus_voltage: Scalar,
    pub gate: GateState,
    pub pwm: PwmState,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            bus_voltage: 24.0,
            gate: GateState::default(),
            pwm: PwmState::default(),
        }
    }
}

impl BoardState {
    pub fn validate(&self) -> ParamResult<()> {
        check_positive("bus_voltage", self.bus_voltage)?;
        PwmState::check_resolution(self.pwm.resolution)
    }
}
