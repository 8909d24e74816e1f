//! Simulation scheduler
//!
//! The [`Simulator`] owns the whole simulation state and is the only
//! executor: a host calls [`Simulator::run_frame`] once per frame, which
//! performs `step_multiplier` ticks unless paused. Each tick runs, in
//! order:
//!
//! 1. the active commutation controller (FOC only when its period has
//!    elapsed),
//! 2. the gate dead-time state machine and the PWM carrier/comparator,
//! 3. the physics integrator,
//! 4. the observer recorder.
//!
//! Everything is synchronous and single-threaded; operator edits go
//! through the validated setters and may only happen between frames, so
//! the integrator never races an edit and never sees a non-physical
//! parameter.

use crate::config::{ConfigError, SimConfig, MAX_STEP_MULTIPLIER};
use crate::recorder::Recorder;
use rotorlab_core::board::BoardState;
use rotorlab_core::cogging::CoggingMap;
use rotorlab_core::foc::{self, FocState};
use rotorlab_core::gate::Switch;
use rotorlab_core::motor::{MotorParams, MotorState};
use rotorlab_core::physics;
use rotorlab_core::pi::PiGains;
use rotorlab_core::pwm::PwmState;
use rotorlab_core::six_step;
use rotorlab_core::transforms::electrical_angle;
use rotorlab_core::types::{check_positive, check_range, ParamError, ParamResult, Scalar};
use serde::{Deserialize, Serialize};

/// Which controller drives the gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommutationMode {
    /// Operator sets each half-bridge directly
    Manual,
    /// Sector-table commutation from the electrical angle
    SixStep,
    /// Field-oriented control through PWM
    Foc,
}

/// Aggregate simulation state, exclusively owned by the [`Simulator`].
#[derive(Debug, Clone)]
pub struct SimState {
    /// Simulation time, seconds
    pub time: Scalar,
    pub motor: MotorState,
    pub board: BoardState,
    pub foc: FocState,
    pub commutation_mode: CommutationMode,
    /// Signed external shaft torque, N·m (braking loads negative)
    pub load_torque: Scalar,
    /// Torque setpoint for FOC, N·m
    pub foc_desired_torque: Scalar,
    /// Six-step phase advance in turns, [-0.5, 0.5]
    pub six_step_phase_advance: Scalar,
    /// Operator gate commands for manual mode
    pub manual_commanded: [Switch; 3],
    /// Ticks per host frame, [1, 5000]
    pub step_multiplier: u32,
    pub paused: bool,
}

/// The simulation scheduler and edit boundary.
pub struct Simulator {
    dt: Scalar,
    state: SimState,
    recorder: Recorder,
    /// Commanded gates as observed by the previous tick's dead-time pass
    prev_commanded: [Switch; 3],
    /// Total OFF-phase ticks whose diode polarity was indeterminate
    degenerate_pole_events: u64,
}

impl Simulator {
    /// Build a simulator from a validated configuration.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut foc_state = FocState::default();
        foc_state.period = config.foc.period;
        foc_state.options = config.foc.options;
        foc_state.set_gains(config.foc.gains_for(&config.motor));

        let mut motor_params = config.motor;
        if config.recenter_cogging {
            motor_params.cogging_map.recenter();
        }
        motor_params.cogging_map.audit();

        let state = SimState {
            time: 0.0,
            motor: MotorState::new(motor_params),
            board: config.board,
            foc: foc_state,
            commutation_mode: CommutationMode::Manual,
            load_torque: 0.0,
            foc_desired_torque: 0.0,
            six_step_phase_advance: 0.0,
            manual_commanded: [Switch::Low; 3],
            step_multiplier: config.step_multiplier,
            paused: false,
        };

        let prev_commanded = state.board.gate.commanded;
        Ok(Self {
            dt: config.dt,
            state,
            recorder: Recorder::new(config.recorder_capacity),
            prev_commanded,
            degenerate_pole_events: 0,
        })
    }

    /// A simulator with default configuration; never fails.
    pub fn with_defaults() -> Self {
        Self::new(SimConfig::default()).expect("default config is valid")
    }

    pub fn dt(&self) -> Scalar {
        self.dt
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// Mutable access for hosts and tests. Edits through this escape the
    /// validated setters; keep them between frames.
    pub fn state_mut(&mut self) -> &mut SimState {
        &mut self.state
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Total ticks whose OFF-phase diode polarity was indeterminate.
    pub fn degenerate_pole_events(&self) -> u64 {
        self.degenerate_pole_events
    }

    /// Run one host frame: `step_multiplier` ticks, unless paused.
    /// Returns the number of ticks executed.
    pub fn run_frame(&mut self) -> u32 {
        if self.state.paused {
            return 0;
        }
        for _ in 0..self.state.step_multiplier {
            self.tick();
        }
        self.state.step_multiplier
    }

    /// Advance simulated time by at least `duration` seconds, ignoring
    /// the frame structure. Convenience for scripted runs and tests.
    pub fn run_for(&mut self, duration: Scalar) {
        let ticks = (duration / self.dt).ceil() as u64;
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// One simulation tick: controller, gates/PWM, physics, recorder.
    pub fn tick(&mut self) {
        let state = &mut self.state;

        // (a) Commutation controller.
        match state.commutation_mode {
            CommutationMode::Manual => {
                state.board.gate.commanded = state.manual_commanded;
            }
            CommutationMode::SixStep => {
                let theta_e = electrical_angle(
                    state.motor.params.num_pole_pairs,
                    state.motor.kinematic.rotor_angle,
                );
                state.board.gate.commanded =
                    six_step::commands(theta_e, state.six_step_phase_advance);
            }
            CommutationMode::Foc => {
                if state.foc.due(state.time) {
                    foc::tick(
                        &mut state.foc,
                        &state.motor,
                        &mut state.board,
                        state.foc_desired_torque,
                        state.time,
                    );
                }
            }
        }

        // (b) PWM carrier and gate dead time. The carrier always runs;
        // only FOC drives the gates through the comparator, the other
        // modes command them directly.
        state.board.pwm.advance_carrier(self.dt);
        if state.commutation_mode == CommutationMode::Foc {
            state.board.gate.commanded = state.board.pwm.commands();
        }
        state.board.gate.step(self.dt, self.prev_commanded);
        self.prev_commanded = state.board.gate.commanded;

        // (c) Physics.
        let diagnostics = physics::step(self.dt, &mut state.motor, &state.board, state.load_torque);
        if diagnostics.indeterminate_poles > 0 {
            if self.degenerate_pole_events == 0 {
                tracing::warn!(
                    time = state.time,
                    "OFF-phase current below diode threshold; pole voltage pinned to ground"
                );
            }
            self.degenerate_pole_events += diagnostics.indeterminate_poles as u64;
        }

        state.time += self.dt;

        // (d) Observer.
        self.recorder.sample(state);
    }

    // ----- edit boundary -------------------------------------------------
    //
    // Every setter validates before mutating; a rejected edit leaves the
    // previous value in place.

    pub fn set_commutation_mode(&mut self, mode: CommutationMode) {
        if mode != self.state.commutation_mode {
            tracing::debug!(?mode, "commutation mode change");
            if mode == CommutationMode::Foc {
                // A stale integral from a previous FOC session would kick
                // the motor on re-entry.
                self.state.foc.reset();
            }
            self.state.commutation_mode = mode;
        }
    }

    pub fn set_manual_command(&mut self, phase: usize, command: Switch) {
        if phase < 3 {
            self.state.manual_commanded[phase] = command;
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.state.paused = paused;
    }

    pub fn set_step_multiplier(&mut self, multiplier: u32) -> ParamResult<()> {
        check_range(
            "step_multiplier",
            multiplier as Scalar,
            1.0,
            MAX_STEP_MULTIPLIER as Scalar,
        )?;
        self.state.step_multiplier = multiplier;
        Ok(())
    }

    pub fn set_load_torque(&mut self, torque: Scalar) -> ParamResult<()> {
        if !torque.is_finite() {
            return Err(ParamError::NotFinite {
                name: "load_torque",
                value: torque,
            });
        }
        self.state.load_torque = torque;
        Ok(())
    }

    pub fn set_desired_torque(&mut self, torque: Scalar) -> ParamResult<()> {
        if !torque.is_finite() {
            return Err(ParamError::NotFinite {
                name: "foc_desired_torque",
                value: torque,
            });
        }
        self.state.foc_desired_torque = torque;
        Ok(())
    }

    pub fn set_six_step_phase_advance(&mut self, advance: Scalar) -> ParamResult<()> {
        check_range("six_step_phase_advance", advance, -0.5, 0.5)?;
        self.state.six_step_phase_advance = advance;
        Ok(())
    }

    pub fn set_foc_period(&mut self, period: Scalar) -> ParamResult<()> {
        check_positive("foc.period", period)?;
        self.state.foc.period = period;
        Ok(())
    }

    pub fn set_pi_gains(&mut self, gains: PiGains) -> ParamResult<()> {
        check_positive("p_gain", gains.p_gain)?;
        check_positive("i_gain", gains.i_gain)?;
        self.state.foc.set_gains(gains);
        Ok(())
    }

    /// Derive PI gains from a target bandwidth and the current motor.
    pub fn auto_tune_pi(&mut self, bandwidth: Scalar) -> ParamResult<()> {
        check_positive("pi_bandwidth", bandwidth)?;
        let gains = PiGains::for_bandwidth(
            bandwidth,
            self.state.motor.params.phase_resistance,
            self.state.motor.params.phase_inductance,
        );
        self.state.foc.set_gains(gains);
        Ok(())
    }

    pub fn set_non_sinusoidal_drive(&mut self, enabled: bool) {
        self.state.foc.options.non_sinusoidal_drive = enabled;
    }

    pub fn set_cogging_compensation(&mut self, enabled: bool) {
        self.state.foc.options.cogging_compensation = enabled;
    }

    pub fn set_qd_decoupling(&mut self, enabled: bool) {
        self.state.foc.options.qd_decoupling = enabled;
    }

    pub fn set_pi_anti_windup(&mut self, enabled: bool) {
        self.state.foc.options.pi_anti_windup = enabled;
    }

    pub fn set_bus_voltage(&mut self, volts: Scalar) -> ParamResult<()> {
        check_positive("bus_voltage", volts)?;
        self.state.board.bus_voltage = volts;
        Ok(())
    }

    pub fn set_diode_active_voltage(&mut self, volts: Scalar) -> ParamResult<()> {
        check_range("diode_active_voltage", volts, 0.0, 10.0)?;
        self.state.board.gate.diode_active_voltage = volts;
        Ok(())
    }

    pub fn set_dead_time(&mut self, seconds: Scalar) -> ParamResult<()> {
        check_range("dead_time", seconds, 0.0, 1e-3)?;
        self.state.board.gate.dead_time = seconds;
        Ok(())
    }

    pub fn set_pwm_resolution(&mut self, resolution: Scalar) -> ParamResult<()> {
        PwmState::check_resolution(resolution)?;
        self.state.board.pwm.resolution = resolution;
        Ok(())
    }

    /// Replace the motor parameters wholesale after validation.
    pub fn set_motor_params(&mut self, params: MotorParams) -> ParamResult<()> {
        params.validate()?;
        self.state.motor.params = params;
        Ok(())
    }

    /// Install a cogging map. With `recenter` the map is de-sloped and
    /// recentered to zero mean before the energy audit; either way a
    /// non-conserving map logs a warning and is kept.
    pub fn set_cogging_map(&mut self, mut map: CoggingMap, recenter: bool) -> ParamResult<()> {
        map.validate()?;
        if recenter {
            map.recenter();
        }
        map.audit();
        self.state.motor.params.cogging_map = map;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_defaults_is_quiescent() {
        let mut sim = Simulator::with_defaults();
        sim.run_frame();
        let state = sim.state();
        assert!(state.time > 0.0);
        assert_eq!(state.motor.electrical.phase_currents, [0.0; 3]);
        assert_eq!(state.motor.kinematic.rotor_angular_vel, 0.0);
    }

    #[test]
    fn test_pause_skips_frames() {
        let mut sim = Simulator::with_defaults();
        sim.set_paused(true);
        assert_eq!(sim.run_frame(), 0);
        assert_eq!(sim.state().time, 0.0);
        sim.set_paused(false);
        assert!(sim.run_frame() > 0);
    }

    #[test]
    fn test_step_multiplier_controls_frame_length() {
        let mut sim = Simulator::with_defaults();
        sim.set_step_multiplier(100).unwrap();
        sim.run_frame();
        assert!((sim.state().time - 100.0 * sim.dt()).abs() < 1e-12);

        assert!(sim.set_step_multiplier(0).is_err());
        assert!(sim.set_step_multiplier(100_000).is_err());
    }

    #[test]
    fn test_manual_mode_passes_commands_through() {
        let mut sim = Simulator::with_defaults();
        sim.set_manual_command(0, Switch::High);
        sim.tick();
        assert_eq!(sim.state().board.gate.commanded[0], Switch::High);
    }

    #[test]
    fn test_edit_boundary_rejects_bad_values() {
        let mut sim = Simulator::with_defaults();
        assert!(sim.set_bus_voltage(-5.0).is_err());
        assert_eq!(sim.state().board.bus_voltage, 24.0);

        assert!(sim.set_six_step_phase_advance(0.6).is_err());
        assert!(sim.set_load_torque(Scalar::NAN).is_err());

        let mut params = MotorParams::default();
        params.phase_inductance = 0.0;
        assert!(sim.set_motor_params(params).is_err());
        assert!(sim.state().motor.params.phase_inductance > 0.0);
    }

    #[test]
    fn test_mode_switch_resets_foc() {
        let mut sim = Simulator::with_defaults();
        sim.set_commutation_mode(CommutationMode::Foc);
        sim.set_desired_torque(0.1).unwrap();
        sim.run_for(0.001);
        assert!(sim.state().foc.iq_controller.integral != 0.0);

        sim.set_commutation_mode(CommutationMode::Manual);
        sim.set_commutation_mode(CommutationMode::Foc);
        assert_eq!(sim.state().foc.iq_controller.integral, 0.0);
    }

    #[test]
    fn test_recorder_sees_every_tick() {
        let mut sim = Simulator::with_defaults();
        sim.set_step_multiplier(10).unwrap();
        sim.run_frame();
        assert_eq!(sim.recorder().len(), 10);
    }

    #[test]
    fn test_six_step_commands_follow_rotor() {
        let mut sim = Simulator::with_defaults();
        sim.set_commutation_mode(CommutationMode::SixStep);
        sim.tick();
        // Rotor at zero: first sector, A high, B low, C floating.
        assert_eq!(
            sim.state().board.gate.commanded,
            [Switch::High, Switch::Low, Switch::Off]
        );
    }

    #[test]
    fn test_degenerate_pole_counter() {
        let mut sim = Simulator::with_defaults();
        // OFF everywhere with zero current: every tick flags all three.
        for n in 0..3 {
            sim.set_manual_command(n, Switch::Off);
        }
        sim.tick();
        sim.tick();
        assert!(sim.degenerate_pole_events() >= 3);
    }
}
