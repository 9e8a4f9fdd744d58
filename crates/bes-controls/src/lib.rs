//! Controller state capsules for building energy models.
//!
//! Small stateful sub-models (direct, hysteresis, P, PI, PID) owned by the model that
//! drives them. Controllers compute a control value from an error signal; their
//! persistent state changes only when a step is accepted, and round-trips through a
//! fixed-size little-endian byte blob for checkpoint/restart.

mod blob;
pub mod controller;
pub mod error;
pub mod spec;

pub use controller::{
    Controller, DigitalDirectController, DigitalHysteresisController, IntegralState, PController,
    PIController, PIDController,
};
pub use error::{ControlError, ControlResult};
pub use spec::ControllerSpec;
