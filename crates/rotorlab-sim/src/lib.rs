//! # Rotorlab Sim
//!
//! The simulation host layer on top of `rotorlab-core`: configuration,
//! the scheduler that owns and clocks the whole simulation, and the
//! rolling-buffer recorder a front-end reads its plots from.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Simulator                          │
//! │                                                          │
//! │  tick():  controller ─► gates/PWM ─► physics ─► recorder │
//! │                                                          │
//! │  run_frame()  =  step_multiplier × tick(), unless paused │
//! └──────────────────────────────────────────────────────────┘
//!        ▲ validated setters                │ rolling buffers
//!   operator edits                     plots / CSV
//! ```
//!
//! ## Example
//!
//! ```rust
//! use rotorlab_sim::config::SimConfig;
//! use rotorlab_sim::simulator::{CommutationMode, Simulator};
//!
//! let mut sim = Simulator::new(SimConfig::default()).unwrap();
//! sim.set_commutation_mode(CommutationMode::SixStep);
//! sim.run_for(0.001); // 1 ms of simulated time
//! assert!(sim.state().motor.kinematic.rotor_angular_vel > 0.0);
//! ```

pub mod config;
pub mod recorder;
pub mod simulator;

pub use config::SimConfig;
pub use recorder::Recorder;
pub use simulator::{CommutationMode, SimState, Simulator};
