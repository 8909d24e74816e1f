//! Electromechanical integrator
//!
//! One forward-Euler step of the coupled motor/bridge system. The step
//! order is load-bearing and must not be rearranged:
//!
//! 1. Resolve half-bridge pole voltages from the actual gate states and
//!    the present phase currents (diode freewheel for OFF phases).
//! 2. Evaluate the normed back-EMF waveform and scale by rotor speed.
//! 3. Solve the floating-neutral voltage of the wye winding.
//! 4. Per-phase voltage, then di/dt through the R-L winding.
//! 5. Advance the currents.
//! 6. Torque from the updated currents dotted with the normed bEMFs,
//!    plus the cogging table.
//! 7. Advance the rotor and wrap its angle.
//!
//! The scheme is first-order explicit Euler by design. Stiff regimes
//! (tiny inductance against a big bus) need a smaller `dt`, not a
//! different scheme.

use crate::board::BoardState;
use crate::gate::{pole_voltages, PoleVoltages};
use crate::motor::MotorState;
use crate::transforms::electrical_angle;
use crate::types::{PhaseTriple, Scalar};
use std::f64::consts::PI;

/// Per-step diagnostics surfaced to the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepDiagnostics {
    /// Number of phases whose OFF-state pole voltage was indeterminate
    /// this step (|i| at or below the diode conduction threshold)
    pub indeterminate_poles: u32,
}

/// Advance the motor by one step of length `dt`.
///
/// Reads the board (bus voltage, actual gates), writes the motor's
/// electrical and kinematic state. `load_torque` is the signed external
/// torque applied to the shaft (braking loads are negative).
pub fn step(
    dt: Scalar,
    motor: &mut MotorState,
    board: &BoardState,
    load_torque: Scalar,
) -> StepDiagnostics {
    let params = &motor.params;
    let kin = &mut motor.kinematic;
    let elec = &mut motor.electrical;

    let theta_e = electrical_angle(params.num_pole_pairs, kin.rotor_angle);

    // 1. Pole voltages from the bridge.
    let PoleVoltages {
        volts: v_poles,
        indeterminate,
    } = pole_voltages(board.bus_voltage, elec.phase_currents, &board.gate);

    // 2. Back-EMFs at the present angle and speed.
    let normed = params.normed_bemfs(theta_e);
    for n in 0..3 {
        elec.normed_bemfs[n] = normed[n];
        elec.bemfs[n] = normed[n] * kin.rotor_angular_vel;
    }

    // 3. Floating neutral of the wye winding: with equal per-phase
    // impedances the neutral settles at the mean of (pole minus bEMF).
    let v_neutral =
        (v_poles.iter().sum::<Scalar>() - elec.bemfs.iter().sum::<Scalar>()) / 3.0;

    // 4./5. Winding currents through R-L.
    let mut di_dt: PhaseTriple = [0.0; 3];
    for n in 0..3 {
        let v_phase = v_poles[n] - v_neutral;
        di_dt[n] = (v_phase - elec.bemfs[n] - elec.phase_currents[n] * params.phase_resistance)
            / params.phase_inductance;
    }
    for n in 0..3 {
        elec.phase_currents[n] += di_dt[n] * dt;
    }

    // 6. Motor torque: electromagnetic plus cogging.
    let torque_em: Scalar = elec
        .phase_currents
        .iter()
        .zip(&normed)
        .map(|(i, e)| i * e)
        .sum();
    kin.torque = torque_em + params.cogging_map.lookup(kin.rotor_angle);

    // 7. Rotor update; the external load enters only here.
    kin.rotor_angular_accel = (kin.torque + load_torque) / params.rotor_inertia;
    kin.rotor_angular_vel += kin.rotor_angular_accel * dt;
    kin.rotor_angle = (kin.rotor_angle + kin.rotor_angular_vel * dt).rem_euclid(2.0 * PI);

    StepDiagnostics {
        indeterminate_poles: indeterminate.iter().filter(|&&f| f).count() as u32,
    }
}

/// Phase voltages implied by the present state, for observers.
///
/// Recomputes the same pole/neutral resolution the integrator uses so a
/// reader at a tick boundary sees voltages consistent with the step that
/// produced the state.
pub fn phase_voltages(motor: &MotorState, board: &BoardState) -> PhaseTriple {
    let pv = pole_voltages(
        board.bus_voltage,
        motor.electrical.phase_currents,
        &board.gate,
    );
    let v_neutral = (pv.volts.iter().sum::<Scalar>()
        - motor.electrical.bemfs.iter().sum::<Scalar>())
        / 3.0;
    [
        pv.volts[0] - v_neutral,
        pv.volts[1] - v_neutral,
        pv.volts[2] - v_neutral,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardState;
    use crate::gate::Switch;
    use crate::motor::{MotorParams, MotorState};

    fn quiet_motor() -> MotorState {
        MotorState::new(MotorParams::default())
    }

    #[test]
    fn test_no_drive_equilibrium() {
        // All gates LOW, zero speed, zero cogging, zero load: nothing moves.
        let mut motor = quiet_motor();
        let board = BoardState::default();
        for _ in 0..10_000 {
            step(1e-6, &mut motor, &board, 0.0);
        }
        assert_eq!(motor.electrical.phase_currents, [0.0; 3]);
        assert_eq!(motor.kinematic.rotor_angular_vel, 0.0);
        assert_eq!(motor.kinematic.rotor_angle, 0.0);
    }

    #[test]
    fn test_high_gate_drives_current() {
        let mut motor = quiet_motor();
        let mut board = BoardState::default();
        board.gate.actual = [Switch::High, Switch::Low, Switch::Low];
        step(1e-6, &mut motor, &board, 0.0);
        assert!(motor.electrical.phase_currents[0] > 0.0);
        assert!(motor.electrical.phase_currents[1] < 0.0);
        // Returns split evenly across the two LOW phases.
        assert!(
            (motor.electrical.phase_currents[1] - motor.electrical.phase_currents[2]).abs()
                < 1e-15
        );
    }

    #[test]
    fn test_currents_sum_to_zero_without_diodes() {
        // Isolated neutral: whatever the drive does, Kirchhoff holds.
        let mut motor = quiet_motor();
        let mut board = BoardState::default();
        board.gate.actual = [Switch::High, Switch::High, Switch::Low];
        for _ in 0..1000 {
            step(1e-6, &mut motor, &board, 0.0);
        }
        let sum: Scalar = motor.electrical.phase_currents.iter().sum();
        assert!(sum.abs() < 1e-9, "current sum {}", sum);
    }

    #[test]
    fn test_rotor_wraps_forward_and_backward() {
        let mut motor = quiet_motor();
        let board = BoardState::default();

        motor.kinematic.rotor_angular_vel = 7000.0;
        for _ in 0..2000 {
            step(1e-6, &mut motor, &board, 0.0);
            assert!((0.0..2.0 * PI).contains(&motor.kinematic.rotor_angle));
        }

        motor.kinematic.rotor_angular_vel = -7000.0;
        for _ in 0..2000 {
            step(1e-6, &mut motor, &board, 0.0);
            assert!((0.0..2.0 * PI).contains(&motor.kinematic.rotor_angle));
        }
    }

    #[test]
    fn test_load_torque_accelerates_shaft() {
        let mut motor = quiet_motor();
        let board = BoardState::default();
        step(1e-6, &mut motor, &board, 0.5);
        assert!(motor.kinematic.rotor_angular_vel > 0.0);
        assert!((motor.kinematic.rotor_angular_accel - 0.5 / 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_freewheel_decays_injected_current() {
        // All switches OFF with current circulating: the diode drops
        // oppose the current and |i| must shrink.
        let mut motor = quiet_motor();
        let mut board = BoardState::default();
        board.gate.actual = [Switch::Off; 3];
        motor.electrical.phase_currents = [1.0, 0.0, -1.0];

        let initial: Scalar = motor
            .electrical
            .phase_currents
            .iter()
            .map(|i| i * i)
            .sum();
        for _ in 0..10 {
            step(1e-6, &mut motor, &board, 0.0);
        }
        let after: Scalar = motor
            .electrical
            .phase_currents
            .iter()
            .map(|i| i * i)
            .sum();
        assert!(after < initial, "freewheel should dissipate: {} -> {}", initial, after);
    }

    #[test]
    fn test_bemf_scales_with_speed() {
        let mut motor = quiet_motor();
        let board = BoardState::default();
        motor.kinematic.rotor_angle = 0.3;
        motor.kinematic.rotor_angular_vel = 100.0;
        step(1e-6, &mut motor, &board, 0.0);
        for n in 0..3 {
            assert!(
                (motor.electrical.bemfs[n] - motor.electrical.normed_bemfs[n] * 100.0).abs()
                    < 1e-9
            );
        }
    }
}
