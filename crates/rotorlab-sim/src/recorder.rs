//! Observer recorder
//!
//! Captures one row of samples per tick into fixed-capacity rolling
//! buffers, one per channel, all sharing a single write cursor so a row
//! is consistent across channels. A plotting front-end reads the buffers
//! through [`Recorder::plot_window`]; headless hosts dump them with
//! [`Recorder::to_csv`].
//!
//! Alongside the raw state the recorder derives a few signals the plots
//! want but the integrator does not store: phase voltages (recomputed
//! with the same pole/neutral resolution the step used), the qd
//! projection of the phase currents, and the instantaneous power drawn
//! from the bus (the sum of bus · current over phases whose high-side
//! switch is closed).

use crate::simulator::SimState;
use rotorlab_core::gate::Switch;
use rotorlab_core::physics;
use rotorlab_core::rolling::RollingContext;
use rotorlab_core::transforms::{clarke, park, q_axis_electrical_angle};
use rotorlab_core::types::Scalar;

/// Sentinel value recorded for an OFF gate so plots can put it on its own
/// tick band below LOW (0) and HIGH (1).
pub const GATE_OFF_SENTINEL: Scalar = -0.5;

/// One rolling Scalar channel.
type Channel = Vec<Scalar>;

/// Rolling time-series buffers for every observable signal.
pub struct Recorder {
    ctx: RollingContext,
    pub timestamps: Channel,
    pub phase_currents: [Channel; 3],
    pub phase_voltages: [Channel; 3],
    pub bemfs: [Channel; 3],
    pub normed_bemfs: [Channel; 3],
    pub pwm_duties: [Channel; 3],
    pub pwm_level: Channel,
    /// Gate actuals encoded LOW → 0, HIGH → 1, OFF → −0.5
    pub gate_states: [Channel; 3],
    pub current_q: Channel,
    pub current_d: Channel,
    pub current_q_err: Channel,
    pub current_q_integral: Channel,
    pub current_d_err: Channel,
    pub current_d_integral: Channel,
    pub power_draw: Channel,
    pub rotor_angular_vel: Channel,
    pub torque: Channel,
}

/// Clipped view parameters for a rolling plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotWindow {
    /// Number of valid rows
    pub count: usize,
    /// Slot index of the oldest valid row
    pub begin: usize,
    /// Timestamp at the left edge (clipped to the rolling history)
    pub begin_time: Scalar,
    /// Timestamp of the newest row
    pub end_time: Scalar,
}

impl Recorder {
    pub fn new(capacity: usize) -> Self {
        let mk = || vec![0.0; capacity.max(1)];
        let mk3 = || [mk(), mk(), mk()];
        Self {
            ctx: RollingContext::new(capacity),
            timestamps: mk(),
            phase_currents: mk3(),
            phase_voltages: mk3(),
            bemfs: mk3(),
            normed_bemfs: mk3(),
            pwm_duties: mk3(),
            pwm_level: mk(),
            gate_states: mk3(),
            current_q: mk(),
            current_d: mk(),
            current_q_err: mk(),
            current_q_integral: mk(),
            current_d_err: mk(),
            current_d_integral: mk(),
            power_draw: mk(),
            rotor_angular_vel: mk(),
            torque: mk(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.ctx.capacity()
    }

    /// Number of valid rows.
    pub fn len(&self) -> usize {
        self.ctx.count()
    }

    pub fn is_empty(&self) -> bool {
        self.ctx.is_empty()
    }

    pub fn context(&self) -> &RollingContext {
        &self.ctx
    }

    /// Forget all recorded rows.
    pub fn clear(&mut self) {
        self.ctx.clear();
    }

    /// Record one row from the state at a tick boundary.
    pub fn sample(&mut self, state: &SimState) {
        let idx = self.ctx.advance();

        self.timestamps[idx] = state.time;

        let v_phases = physics::phase_voltages(&state.motor, &state.board);
        let elec = &state.motor.electrical;
        for n in 0..3 {
            self.phase_currents[n][idx] = elec.phase_currents[n];
            self.phase_voltages[n][idx] = v_phases[n];
            self.bemfs[n][idx] = elec.bemfs[n];
            self.normed_bemfs[n][idx] = elec.normed_bemfs[n];
            self.pwm_duties[n][idx] = state.board.pwm.duties[n];
            self.gate_states[n][idx] = match state.board.gate.actual[n] {
                Switch::Low => 0.0,
                Switch::High => 1.0,
                Switch::Off => GATE_OFF_SENTINEL,
            };
        }
        self.pwm_level[idx] = state.board.pwm.level;

        // Project the phase currents onto the rotor qd frame.
        let theta_q = q_axis_electrical_angle(
            state.motor.params.num_pole_pairs,
            state.motor.kinematic.rotor_angle,
        );
        let i_qd = park(clarke(elec.phase_currents), theta_q);
        self.current_q[idx] = i_qd.re;
        self.current_d[idx] = i_qd.im;

        self.current_q_err[idx] = state.foc.iq_controller.err;
        self.current_q_integral[idx] = state.foc.iq_controller.integral;
        self.current_d_err[idx] = state.foc.id_controller.err;
        self.current_d_integral[idx] = state.foc.id_controller.integral;

        // Power flows from the bus through whichever high sides are closed.
        let mut power = 0.0;
        for n in 0..3 {
            if state.board.gate.actual[n] == Switch::High {
                power += state.board.bus_voltage * elec.phase_currents[n];
            }
        }
        self.power_draw[idx] = power;

        self.rotor_angular_vel[idx] = state.motor.kinematic.rotor_angular_vel;
        self.torque[idx] = state.motor.kinematic.torque;
    }

    /// Plot-view parameters clipped to the trailing `rolling_history`
    /// seconds.
    pub fn plot_window(&self, rolling_history: Scalar) -> PlotWindow {
        let count = self.ctx.count();
        let (mut begin_time, end_time) = if count > 0 {
            (
                self.timestamps[self.ctx.begin()],
                self.timestamps[self.ctx.back()],
            )
        } else {
            (0.0, 0.0)
        };
        begin_time = begin_time.max(end_time - rolling_history);

        PlotWindow {
            count,
            begin: self.ctx.begin(),
            begin_time,
            end_time,
        }
    }

    /// Dump the buffer as CSV, oldest row first.
    ///
    /// Columns: timestamp, torque, the three bEMFs, the three currents.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str("timestamp,torque,bEmf_a,bEmf_b,bEmf_c,current_a,current_b,current_c\n");

        for idx in self.ctx.iter() {
            let row = [
                self.timestamps[idx],
                self.torque[idx],
                self.bemfs[0][idx],
                self.bemfs[1][idx],
                self.bemfs[2][idx],
                self.phase_currents[0][idx],
                self.phase_currents[1][idx],
                self.phase_currents[2][idx],
            ];
            for (col, value) in row.iter().enumerate() {
                if col > 0 {
                    out.push(',');
                }
                out.push_str(&value.to_string());
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::Simulator;

    #[test]
    fn test_sample_rows_are_consistent() {
        let mut sim = Simulator::with_defaults();
        for _ in 0..5 {
            sim.tick();
        }
        let rec = sim.recorder();
        assert_eq!(rec.len(), 5);
        // Timestamps strictly increasing.
        let times: Vec<Scalar> = rec.context().iter().map(|i| rec.timestamps[i]).collect();
        for pair in times.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_wrap_keeps_newest() {
        let mut sim = Simulator::new(crate::config::SimConfig {
            recorder_capacity: 8,
            ..Default::default()
        })
        .unwrap();
        for _ in 0..20 {
            sim.tick();
        }
        let rec = sim.recorder();
        assert_eq!(rec.len(), 8);
        let window = rec.plot_window(Scalar::INFINITY);
        // Newest row is tick 20, oldest retained is tick 13.
        assert!((window.end_time - 20.0 * sim.dt()).abs() < 1e-12);
        assert!((rec.timestamps[window.begin] - 13.0 * sim.dt()).abs() < 1e-12);
    }

    #[test]
    fn test_plot_window_clips_history() {
        let mut sim = Simulator::with_defaults();
        for _ in 0..100 {
            sim.tick();
        }
        let rec = sim.recorder();
        let window = rec.plot_window(10.0 * sim.dt());
        assert!((window.end_time - window.begin_time - 10.0 * sim.dt()).abs() < 1e-12);
    }

    #[test]
    fn test_csv_shape() {
        let mut sim = Simulator::with_defaults();
        for _ in 0..3 {
            sim.tick();
        }
        let csv = sim.recorder().to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "timestamp,torque,bEmf_a,bEmf_b,bEmf_c,current_a,current_b,current_c"
        );
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), 8);
        }
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn test_csv_chronological_after_wrap() {
        let mut sim = Simulator::new(crate::config::SimConfig {
            recorder_capacity: 4,
            ..Default::default()
        })
        .unwrap();
        for _ in 0..10 {
            sim.tick();
        }
        let csv = sim.recorder().to_csv();
        let stamps: Vec<Scalar> = csv
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(stamps.len(), 4);
        for pair in stamps.windows(2) {
            assert!(pair[1] > pair[0], "rows out of order: {:?}", stamps);
        }
    }

    #[test]
    fn test_empty_recorder() {
        let rec = Recorder::new(16);
        assert!(rec.is_empty());
        let window = rec.plot_window(1.0);
        assert_eq!(window.count, 0);
        assert_eq!(window.begin_time, 0.0);
        let csv = rec.to_csv();
        assert_eq!(csv.lines().count(), 1);
    }
}
