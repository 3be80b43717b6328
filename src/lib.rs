//! # thermal-turret
//! A `#![no_std]` control core for a thermally guided launcher turret
//!
//! # Generic components
//! [`scheduler`] contains the cooperative scheduler that steps tasks at their desired periods.
//!
//! [`hal`] contains the hardware abstraction layer.
//!
//! [`SharedChannel`] is the single-slot mailbox tasks publish to and poll.
//!
//! # Turret components
//! [`tasks`] contains the five task state machines: start trigger, thermal acquisition,
//! pitch control, yaw control and the fire sequence.
//!
//! [`control`] contains the proportional position controller both axes use.
//!
//! [`targeting`] turns a thermal frame into a yaw angle.
//!
//! [`sim`] contains simulated hardware for running the whole rig on a host.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod control;
pub use control::ClosedLoopController;

mod error;
pub use error::Error;

pub mod hal;
pub use hal::{Actuator, PositionSensor};

pub mod scheduler;
pub use scheduler::Scheduler;

mod share;
pub use share::SharedChannel;

pub mod sim;

pub mod targeting;
pub use targeting::{TargetEstimate, ThermalTargetingEngine};

pub mod tasks;
