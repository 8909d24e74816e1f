//! Field-Oriented Control
//!
//! The FOC loop is a periodic digital controller that regulates the motor
//! current *in the rotor frame*, where a three-phase AC problem becomes two
//! DC ones:
//!
//! ```text
//! i_abc ──clarke──► i_αβ ──park(−θ_q)──► (iq, id)
//!                                           │
//!                         τ* ──► iq*  ──►  PI ──► (uq, ud)
//!                                           │  (+ decoupling)
//! duties ◄──SVM◄── v_αβ ◄──park(+θ_q)───────┘
//! ```
//!
//! The q axis carries torque, the d axis carries flux; a surface-magnet
//! machine wants `id = 0`. Optional refinements: cogging feed-forward
//! (cancel the tabulated parasitic torque before the PI sees it),
//! non-sinusoidal drive (divide by the live torque-per-amp curve instead
//! of the sinusoidal constant), and qd decoupling (cancel the speed
//! cross-coupling between the axes).

use crate::board::BoardState;
use crate::motor::MotorState;
use crate::pi::{PiController, PiGains};
use crate::transforms::{clarke, inverse_clarke, park, q_axis_electrical_angle, rotation, SQRT_3};
use crate::types::{Complex, PhaseTriple, Scalar};
use serde::{Deserialize, Serialize};

/// Feature toggles for the FOC pipeline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FocOptions {
    /// Divide desired torque by the live torque-per-amp curve instead of
    /// the sinusoidal constant (accounts for all bEMF harmonics)
    pub non_sinusoidal_drive: bool,
    /// Feed the cogging table forward into the current command
    pub cogging_compensation: bool,
    /// Cancel the ω·L cross-coupling between the q and d axes
    pub qd_decoupling: bool,
    /// Enable PI anti-windup at the inverter voltage limit
    pub pi_anti_windup: bool,
}

/// FOC controller state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocState {
    /// Controller tick interval, seconds
    pub period: Scalar,
    /// Simulation time of the last controller tick
    pub last_tick_time: Scalar,
    /// q-axis (torque) current regulator
    pub iq_controller: PiController,
    /// d-axis (flux) current regulator
    pub id_controller: PiController,
    /// Last commanded voltage in the rotor frame (q = re, d = im)
    pub voltage_qd: Complex,
    pub options: FocOptions,
}

impl Default for FocState {
    fn default() -> Self {
        let gains = PiGains::for_bandwidth(10_000.0, 0.1, 1e-4);
        Self {
            period: 1e-4, // 10 kHz control loop
            last_tick_time: Scalar::NEG_INFINITY,
            iq_controller: PiController::new(gains),
            id_controller: PiController::new(gains),
            voltage_qd: Complex::new(0.0, 0.0),
            options: FocOptions::default(),
        }
    }
}

impl FocState {
    /// Whether the controller is due at simulation time `time`.
    #[inline]
    pub fn due(&self, time: Scalar) -> bool {
        time - self.last_tick_time >= self.period
    }

    /// Set both axis regulators to the same gain pair.
    pub fn set_gains(&mut self, gains: PiGains) {
        self.iq_controller.gains = gains;
        self.id_controller.gains = gains;
    }

    /// Clear both regulators (used when switching commutation modes so a
    /// stale integral cannot kick the motor).
    pub fn reset(&mut self) {
        self.iq_controller.reset();
        self.id_controller.reset();
        self.voltage_qd = Complex::new(0.0, 0.0);
        self.last_tick_time = Scalar::NEG_INFINITY;
    }
}

/// Run one FOC controller tick at simulation time `time`, writing new PWM
/// duties to the board.
///
/// The caller is responsible for invoking this only when [`FocState::due`]
/// says so; the PI integrators assume a fixed update interval.
pub fn tick(
    foc: &mut FocState,
    motor: &MotorState,
    board: &mut BoardState,
    desired_torque: Scalar,
    time: Scalar,
) {
    foc.last_tick_time = time;

    let params = &motor.params;
    let p = params.num_pole_pairs as Scalar;
    let theta_q = q_axis_electrical_angle(params.num_pole_pairs, motor.kinematic.rotor_angle);
    let theta_e = p * motor.kinematic.rotor_angle;

    // Measured currents into the rotor frame.
    let i_qd = park(clarke(motor.electrical.phase_currents), theta_q);
    let iq = i_qd.re;
    let id = i_qd.im;

    // Desired torque to desired q current. The torque-per-amp divisor is
    // floored at 10% of the sinusoidal constant so a harmonic-rich zero
    // crossing cannot command unbounded current.
    let kt_sin = params.sinusoidal_torque_constant();
    let kt = if foc.options.non_sinusoidal_drive {
        let live = params.torque_per_amp(theta_e);
        let floor = 0.1 * kt_sin;
        if live.abs() >= floor {
            live
        } else if live >= 0.0 {
            floor
        } else {
            -floor
        }
    } else {
        kt_sin
    };

    let mut iq_desired = desired_torque / kt;
    let id_desired = 0.0;

    if foc.options.cogging_compensation {
        // Feed-forward: command enough extra electromagnetic torque to
        // cancel the map's contribution at this angle.
        iq_desired -= params.cogging_map.lookup(motor.kinematic.rotor_angle) / kt;
    }

    // PI regulation with the inverter's linear-range limit.
    let sat_limit = board.bus_voltage / SQRT_3;
    for ctrl in [&mut foc.iq_controller, &mut foc.id_controller] {
        ctrl.anti_windup = foc.options.pi_anti_windup;
        ctrl.sat_limit = sat_limit;
    }
    let mut uq = foc.iq_controller.update(iq_desired, iq, foc.period);
    let mut ud = foc.id_controller.update(id_desired, id, foc.period);

    if foc.options.qd_decoupling {
        let omega_e = p * motor.kinematic.rotor_angular_vel;
        uq += omega_e * params.phase_inductance * id;
        ud -= omega_e * params.phase_inductance * iq;
    }

    foc.voltage_qd = Complex::new(uq, ud);

    // Back to the stationary frame and out through the modulator.
    let v_alphabeta = foc.voltage_qd * rotation(theta_q);
    let duties = space_vector_modulation(v_alphabeta, board.bus_voltage);
    board.pwm.set_duties(duties);
}

/// Space-vector modulation by min/max injection.
///
/// Projects the stationary voltage vector onto the three phases, then
/// shifts all three by the midpoint of their envelope so the waveform is
/// centered in the bus. This common-mode injection extends the linear
/// range to `bus/√3` (15% beyond plain sinusoidal modulation). Duties are
/// clamped to [0, 1]; quantization happens where they are stored.
pub fn space_vector_modulation(v_alphabeta: Complex, bus_voltage: Scalar) -> PhaseTriple {
    let v_abc = inverse_clarke(v_alphabeta);

    let v_min = v_abc[0].min(v_abc[1]).min(v_abc[2]);
    let v_max = v_abc[0].max(v_abc[1]).max(v_abc[2]);
    let v_offset = (v_min + v_max) / 2.0;

    let mut duties = [0.0; 3];
    for n in 0..3 {
        duties[n] = ((v_abc[n] - v_offset) / bus_voltage + 0.5).clamp(0.0, 1.0);
    }
    duties
}
