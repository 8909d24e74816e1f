//! Spin a motor up under six-step commutation and dump the recorded
//! signals as CSV on stdout.
//!
//! ```bash
//! cargo run -p rotorlab-sim --example six_step_spinup > spinup.csv
//! ```

use rotorlab_core::observe::{init_logging, LogConfig};
use rotorlab_sim::config::SimConfig;
use rotorlab_sim::simulator::{CommutationMode, Simulator};

fn main() {
    init_logging(&LogConfig::default());

    let config = SimConfig::load().unwrap_or_else(|err| {
        eprintln!("config error: {err}");
        std::process::exit(1);
    });

    let mut sim = Simulator::new(config).expect("validated config");
    sim.set_commutation_mode(CommutationMode::SixStep);

    // 50 ms of simulated time in 1 ms frames.
    sim.set_step_multiplier(1000).expect("within range");
    for _ in 0..50 {
        sim.run_frame();
    }

    let kin = &sim.state().motor.kinematic;
    tracing::info!(
        omega = kin.rotor_angular_vel,
        angle = kin.rotor_angle,
        "spin-up finished"
    );

    print!("{}", sim.recorder().to_csv());
}
