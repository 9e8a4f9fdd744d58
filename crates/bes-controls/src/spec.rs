//! Serializable controller parameter blocks, as found in project files.

use serde::{Deserialize, Serialize};

use crate::controller::{
    Controller, DigitalDirectController, DigitalHysteresisController, PController, PIController,
    PIDController,
};
use crate::error::ControlResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerSpec {
    DigitalDirect,
    DigitalHysteresis {
        band: f64,
    },
    P {
        kp: f64,
        #[serde(default = "default_out_min")]
        out_min: f64,
        #[serde(default = "default_out_max")]
        out_max: f64,
    },
    #[serde(rename = "pi")]
    PI {
        kp: f64,
        ti: f64,
        #[serde(default = "default_out_min")]
        out_min: f64,
        #[serde(default = "default_out_max")]
        out_max: f64,
        #[serde(default)]
        integral_limit: Option<f64>,
    },
    #[serde(rename = "pid")]
    PID {
        kp: f64,
        ti: f64,
        td: f64,
        #[serde(default = "default_out_min")]
        out_min: f64,
        #[serde(default = "default_out_max")]
        out_max: f64,
        #[serde(default)]
        integral_limit: Option<f64>,
    },
}

fn default_out_min() -> f64 {
    0.0
}

fn default_out_max() -> f64 {
    1.0
}

impl ControllerSpec {
    /// Construct a fresh controller with initial (uncommitted) state.
    pub fn build(&self) -> ControlResult<Box<dyn Controller>> {
        Ok(match *self {
            ControllerSpec::DigitalDirect => Box::new(DigitalDirectController::new()),
            ControllerSpec::DigitalHysteresis { band } => {
                Box::new(DigitalHysteresisController::new(band)?)
            }
            ControllerSpec::P {
                kp,
                out_min,
                out_max,
            } => Box::new(PController::new(kp, out_min, out_max)?),
            ControllerSpec::PI {
                kp,
                ti,
                out_min,
                out_max,
                integral_limit,
            } => {
                let c = PIController::new(kp, ti, out_min, out_max)?;
                Box::new(match integral_limit {
                    Some(limit) => c.with_integral_limit(limit),
                    None => c,
                })
            }
            ControllerSpec::PID {
                kp,
                ti,
                td,
                out_min,
                out_max,
                integral_limit,
            } => {
                let c = PIDController::new(kp, ti, td, out_min, out_max)?;
                Box::new(match integral_limit {
                    Some(limit) => c.with_integral_limit(limit),
                    None => c,
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tagged_spec() {
        let spec: ControllerSpec =
            serde_json::from_str(r#"{"type":"pi","kp":2.0,"ti":600.0}"#).unwrap();
        assert_eq!(
            spec,
            ControllerSpec::PI {
                kp: 2.0,
                ti: 600.0,
                out_min: 0.0,
                out_max: 1.0,
                integral_limit: None
            }
        );
        assert_eq!(spec.build().unwrap().kind(), "PI");
    }

    #[test]
    fn build_rejects_bad_parameters() {
        let spec = ControllerSpec::P {
            kp: 1.0,
            out_min: 1.0,
            out_max: 1.0,
        };
        assert!(spec.build().is_err());
    }
}
