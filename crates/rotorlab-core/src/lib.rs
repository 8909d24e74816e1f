//! # Rotorlab Core
//!
//! Core models for an educational three-phase BLDC/PMSM simulator: the
//! motor, the H-bridge drive electronics, and the commutation algorithms
//! that connect them.
//!
//! ## Overview
//!
//! A permanent-magnet machine is three R-L windings in wye, each with a
//! rotor-position-dependent back-EMF, hanging off three half-bridges.
//! This crate models that system explicitly and integrates it with a
//! fixed-timestep forward-Euler scheme, including effects a first-pass
//! simulation usually skips:
//!
//! - **Diode freewheeling**: an undriven (OFF) phase conducts through the
//!   body diodes, with a forward drop and a polarity decided by the
//!   instantaneous current.
//! - **Dead time**: gate transitions pass through a configurable OFF
//!   lockout, exactly like a real gate driver.
//! - **Non-sinusoidal back-EMF**: a five-term odd-harmonic series spans
//!   sinusoidal through trapezoidal waveshapes.
//! - **Cogging torque**: a cyclic lookup table with an energy audit.
//! - **PWM quantization**: duties snap to a configurable timer grid.
//!
//! ## Control
//!
//! Three commutation strategies drive the bridge:
//!
//! ```text
//! Manual    operator sets each half-bridge directly
//! Six-step  sector table from the electrical angle, ±phase advance
//! FOC       Clarke/Park → PI(iq, id) → inverse Park → SVM → duties
//! ```
//!
//! ## Example
//!
//! ```rust
//! use rotorlab_core::board::BoardState;
//! use rotorlab_core::motor::{MotorParams, MotorState};
//! use rotorlab_core::physics;
//!
//! let mut motor = MotorState::new(MotorParams::default());
//! let board = BoardState::default();
//!
//! // One microsecond of freewheeling from rest: nothing moves.
//! physics::step(1e-6, &mut motor, &board, 0.0);
//! assert_eq!(motor.kinematic.rotor_angular_vel, 0.0);
//! ```

pub mod board;
pub mod cogging;
pub mod foc;
pub mod gate;
pub mod motor;
pub mod observe;
pub mod physics;
pub mod pi;
pub mod pwm;
pub mod rolling;
pub mod sine_series;
pub mod six_step;
pub mod transforms;
pub mod types;

pub use types::{Complex, PhaseTriple, Scalar};
