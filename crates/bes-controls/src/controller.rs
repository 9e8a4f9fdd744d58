//! Controller state capsules.
//!
//! Provides standard controller types:
//! - **Digital direct**: on/off by sign of the error
//! - **Digital hysteresis**: on/off with a dead band around zero error
//! - **P**: proportional
//! - **PI / PID**: with integral clamping and output clamping
//!
//! Every controller follows the same two-phase contract:
//! - [`Controller::update`] may be called any number of times per step (solver iterations,
//!   retries). It recomputes the control value from the *committed* state and the current
//!   error, and never changes the committed state.
//! - [`Controller::step_completed`] commits the state of the accepted step (integral,
//!   hysteresis switch position, last error/time stamp). It is the only mutation point.

use crate::blob::{self, F64_BYTES};
use crate::error::{ControlError, ControlResult};

/// Common interface of all controllers, used through `Box<dyn Controller>` by models.
pub trait Controller: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> &'static str;

    /// Recompute the control value for error `error` at time `t`.
    fn update(&mut self, t: f64, error: f64);

    /// Last computed control value.
    fn control_value(&self) -> f64;

    /// Commit the state belonging to the accepted step ending at `t`.
    fn step_completed(&mut self, _t: f64) {}

    /// Byte size of the restart blob; 0 for stateless controllers.
    fn serialization_size(&self) -> usize {
        0
    }

    /// Append exactly `serialization_size()` bytes.
    fn serialize(&self, _buf: &mut Vec<u8>) {}

    fn deserialize(&mut self, buf: &[u8]) -> ControlResult<()> {
        if buf.is_empty() {
            Ok(())
        } else {
            Err(ControlError::BlobSize {
                controller: self.kind(),
                expected: 0,
                actual: buf.len(),
            })
        }
    }
}

/// On (1) when the error is positive, off (0) otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DigitalDirectController {
    control_value: f64,
}

impl DigitalDirectController {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Controller for DigitalDirectController {
    fn kind(&self) -> &'static str {
        "digital direct"
    }

    fn update(&mut self, _t: f64, error: f64) {
        self.control_value = if error > 0.0 { 1.0 } else { 0.0 };
    }

    fn control_value(&self) -> f64 {
        self.control_value
    }
}

/// On/off controller with a dead band of width `band` centred on zero error.
///
/// Switches on above `+band/2`, off below `-band/2`, and otherwise keeps the switch
/// position committed at the end of the previous step.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitalHysteresisController {
    band: f64,
    committed_on: bool,
    control_value: f64,
}

impl DigitalHysteresisController {
    pub fn new(band: f64) -> ControlResult<Self> {
        if !(band >= 0.0) || !band.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "hysteresis band must be finite and non-negative",
            });
        }
        Ok(Self {
            band,
            committed_on: false,
            control_value: 0.0,
        })
    }

    pub fn band(&self) -> f64 {
        self.band
    }
}

impl Controller for DigitalHysteresisController {
    fn kind(&self) -> &'static str {
        "digital hysteresis"
    }

    fn update(&mut self, _t: f64, error: f64) {
        let half = 0.5 * self.band;
        let on = if error > half {
            true
        } else if error < -half {
            false
        } else {
            self.committed_on
        };
        self.control_value = if on { 1.0 } else { 0.0 };
    }

    fn control_value(&self) -> f64 {
        self.control_value
    }

    fn step_completed(&mut self, _t: f64) {
        self.committed_on = self.control_value > 0.5;
    }

    fn serialization_size(&self) -> usize {
        F64_BYTES
    }

    fn serialize(&self, buf: &mut Vec<u8>) {
        blob::write_f64s(buf, &[if self.committed_on { 1.0 } else { 0.0 }]);
    }

    fn deserialize(&mut self, buf: &[u8]) -> ControlResult<()> {
        let [on] = blob::read_f64s::<1>(self.kind(), buf)?;
        self.committed_on = on > 0.5;
        self.control_value = on;
        Ok(())
    }
}

/// Proportional controller: `kp * e`, clamped to the output range.
#[derive(Debug, Clone, PartialEq)]
pub struct PController {
    pub kp: f64,
    pub out_min: f64,
    pub out_max: f64,
    control_value: f64,
}

impl PController {
    pub fn new(kp: f64, out_min: f64, out_max: f64) -> ControlResult<Self> {
        check_gain(kp)?;
        check_limits(out_min, out_max)?;
        Ok(Self {
            kp,
            out_min,
            out_max,
            control_value: 0.0,
        })
    }
}

impl Controller for PController {
    fn kind(&self) -> &'static str {
        "P"
    }

    fn update(&mut self, _t: f64, error: f64) {
        self.control_value = (self.kp * error).clamp(self.out_min, self.out_max);
    }

    fn control_value(&self) -> f64 {
        self.control_value
    }
}

/// Committed state of a PI/PID controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegralState {
    pub error_integral: f64,
    pub last_error: f64,
    /// Time stamp of the last accepted step; `None` before the first one.
    pub last_time: Option<f64>,
}

impl Default for IntegralState {
    fn default() -> Self {
        Self {
            error_integral: 0.0,
            last_error: 0.0,
            last_time: None,
        }
    }
}

impl IntegralState {
    const LEN: usize = 3;

    fn dt(&self, t: f64) -> f64 {
        self.last_time.map_or(0.0, |last| (t - last).max(0.0))
    }

    fn to_array(self) -> [f64; Self::LEN] {
        // NaN marks "no step accepted yet"
        [
            self.error_integral,
            self.last_error,
            self.last_time.unwrap_or(f64::NAN),
        ]
    }

    fn from_array(controller: &'static str, a: [f64; Self::LEN]) -> ControlResult<Self> {
        if !a[0].is_finite() || !a[1].is_finite() {
            return Err(ControlError::CorruptBlob {
                controller,
                what: "non-finite integral or error",
            });
        }
        Ok(Self {
            error_integral: a[0],
            last_error: a[1],
            last_time: (!a[2].is_nan()).then_some(a[2]),
        })
    }
}

/// PI controller configuration and state.
#[derive(Debug, Clone, PartialEq)]
pub struct PIController {
    /// Proportional gain.
    pub kp: f64,
    /// Integral time constant (seconds). Larger values reduce integral action.
    pub ti: f64,
    pub out_min: f64,
    pub out_max: f64,
    /// Clamp for the error integral. If None, the integral is unbounded.
    pub integral_limit: Option<f64>,
    state: IntegralState,
    pending_error: f64,
    control_value: f64,
}

impl PIController {
    pub fn new(kp: f64, ti: f64, out_min: f64, out_max: f64) -> ControlResult<Self> {
        check_gain(kp)?;
        if !(ti > 0.0) {
            return Err(ControlError::InvalidArg {
                what: "ti must be positive",
            });
        }
        check_limits(out_min, out_max)?;
        Ok(Self {
            kp,
            ti,
            out_min,
            out_max,
            integral_limit: None,
            state: IntegralState::default(),
            pending_error: 0.0,
            control_value: 0.0,
        })
    }

    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = Some(limit.abs());
        self
    }

    pub fn state(&self) -> &IntegralState {
        &self.state
    }

    fn integral_at(&self, t: f64, error: f64) -> f64 {
        let raw = self.state.error_integral + error * self.state.dt(t);
        match self.integral_limit {
            Some(limit) => raw.clamp(-limit, limit),
            None => raw,
        }
    }
}

impl Controller for PIController {
    fn kind(&self) -> &'static str {
        "PI"
    }

    fn update(&mut self, t: f64, error: f64) {
        self.pending_error = error;
        let integral = self.integral_at(t, error);
        let raw = self.kp * (error + integral / self.ti);
        self.control_value = raw.clamp(self.out_min, self.out_max);
    }

    fn control_value(&self) -> f64 {
        self.control_value
    }

    fn step_completed(&mut self, t: f64) {
        self.state.error_integral = self.integral_at(t, self.pending_error);
        self.state.last_error = self.pending_error;
        self.state.last_time = Some(t);
    }

    fn serialization_size(&self) -> usize {
        IntegralState::LEN * F64_BYTES
    }

    fn serialize(&self, buf: &mut Vec<u8>) {
        blob::write_f64s(buf, &self.state.to_array());
    }

    fn deserialize(&mut self, buf: &[u8]) -> ControlResult<()> {
        let a = blob::read_f64s::<{ IntegralState::LEN }>(self.kind(), buf)?;
        self.state = IntegralState::from_array(self.kind(), a)?;
        Ok(())
    }
}

/// PID controller: PI plus a derivative term on the error change since the last accepted step.
#[derive(Debug, Clone, PartialEq)]
pub struct PIDController {
    /// Derivative time constant (seconds).
    pub td: f64,
    pi: PIController,
    control_value: f64,
}

impl PIDController {
    pub fn new(kp: f64, ti: f64, td: f64, out_min: f64, out_max: f64) -> ControlResult<Self> {
        if !(td >= 0.0) {
            return Err(ControlError::InvalidArg {
                what: "td must be non-negative",
            });
        }
        Ok(Self {
            td,
            pi: PIController::new(kp, ti, out_min, out_max)?,
            control_value: 0.0,
        })
    }

    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.pi = self.pi.with_integral_limit(limit);
        self
    }

    pub fn state(&self) -> &IntegralState {
        self.pi.state()
    }
}

impl Controller for PIDController {
    fn kind(&self) -> &'static str {
        "PID"
    }

    fn update(&mut self, t: f64, error: f64) {
        let pi = &mut self.pi;
        pi.pending_error = error;
        let integral = pi.integral_at(t, error);
        let dt = pi.state.dt(t);
        let derivative = if dt > 0.0 {
            (error - pi.state.last_error) / dt
        } else {
            0.0
        };
        let raw = pi.kp * (error + integral / pi.ti + self.td * derivative);
        self.control_value = raw.clamp(pi.out_min, pi.out_max);
    }

    fn control_value(&self) -> f64 {
        self.control_value
    }

    fn step_completed(&mut self, t: f64) {
        self.pi.step_completed(t);
    }

    fn serialization_size(&self) -> usize {
        self.pi.serialization_size()
    }

    fn serialize(&self, buf: &mut Vec<u8>) {
        self.pi.serialize(buf);
    }

    fn deserialize(&mut self, buf: &[u8]) -> ControlResult<()> {
        let a = blob::read_f64s::<{ IntegralState::LEN }>(self.kind(), buf)?;
        self.pi.state = IntegralState::from_array(self.kind(), a)?;
        Ok(())
    }
}

fn check_gain(kp: f64) -> ControlResult<()> {
    if !kp.is_finite() {
        return Err(ControlError::InvalidArg {
            what: "kp must be finite",
        });
    }
    Ok(())
}

fn check_limits(out_min: f64, out_max: f64) -> ControlResult<()> {
    if !(out_min < out_max) {
        return Err(ControlError::InvalidArg {
            what: "out_min must be less than out_max",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_switches_on_sign() {
        let mut c = DigitalDirectController::new();
        c.update(0.0, 0.3);
        assert_eq!(c.control_value(), 1.0);
        c.update(0.0, 0.0);
        assert_eq!(c.control_value(), 0.0);
    }

    #[test]
    fn hysteresis_keeps_committed_state_inside_band() {
        let mut c = DigitalHysteresisController::new(2.0).unwrap();
        c.update(0.0, 0.5);
        assert_eq!(c.control_value(), 0.0); // inside band, committed off

        c.update(0.0, 1.5);
        assert_eq!(c.control_value(), 1.0);
        // not committed yet: a retried iteration inside the band still sees "off"
        c.update(0.0, 0.5);
        assert_eq!(c.control_value(), 0.0);

        c.update(0.0, 1.5);
        c.step_completed(60.0);
        c.update(60.0, 0.5);
        assert_eq!(c.control_value(), 1.0);
        c.update(60.0, -1.5);
        assert_eq!(c.control_value(), 0.0);
    }

    #[test]
    fn p_controller_clamps() {
        let mut c = PController::new(2.0, 0.0, 1.0).unwrap();
        c.update(0.0, 0.25);
        assert_eq!(c.control_value(), 0.5);
        c.update(0.0, 10.0);
        assert_eq!(c.control_value(), 1.0);
    }

    #[test]
    fn pi_integral_only_changes_on_step_completed() {
        let mut c = PIController::new(1.0, 10.0, -100.0, 100.0).unwrap();
        c.update(0.0, 1.0);
        c.step_completed(0.0);
        assert_eq!(c.state().error_integral, 0.0);

        // repeated iterations at t=10 leave committed state untouched
        for _ in 0..5 {
            c.update(10.0, 1.0);
        }
        assert_eq!(c.state().error_integral, 0.0);
        // kp * (e + (0 + 1*10)/ti) = 1 + 1
        assert!((c.control_value() - 2.0).abs() < 1e-12);

        c.step_completed(10.0);
        assert!((c.state().error_integral - 10.0).abs() < 1e-12);
    }

    #[test]
    fn pi_integral_limit_applies() {
        let mut c = PIController::new(1.0, 1.0, -1e6, 1e6)
            .unwrap()
            .with_integral_limit(5.0);
        c.update(0.0, 1.0);
        c.step_completed(0.0);
        c.update(100.0, 1.0);
        c.step_completed(100.0);
        assert_eq!(c.state().error_integral, 5.0);
    }

    #[test]
    fn pid_derivative_uses_last_committed_error() {
        let mut c = PIDController::new(1.0, 1e9, 2.0, -100.0, 100.0).unwrap();
        c.update(0.0, 0.0);
        c.step_completed(0.0);
        c.update(1.0, 1.0);
        // P = 1, I ~ 0, D = 2 * (1 - 0)/1
        assert!((c.control_value() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_controller_params() {
        assert!(PIController::new(1.0, -1.0, 0.0, 1.0).is_err());
        assert!(PIController::new(1.0, 1.0, 1.0, 0.0).is_err());
        assert!(PIDController::new(1.0, 1.0, -0.5, 0.0, 1.0).is_err());
        assert!(DigitalHysteresisController::new(f64::NAN).is_err());
    }

    #[test]
    fn wrong_blob_size_rejected() {
        let mut c = PIController::new(1.0, 1.0, 0.0, 1.0).unwrap();
        let err = c.deserialize(&[0_u8; 7]).unwrap_err();
        assert!(matches!(err, ControlError::BlobSize { expected: 24, actual: 7, .. }));
        let mut d = DigitalDirectController::new();
        assert!(d.deserialize(&[1]).is_err());
    }
}
