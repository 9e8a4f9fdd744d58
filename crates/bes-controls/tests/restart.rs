//! Checkpoint/restart behaviour of controllers.

use bes_controls::{Controller, ControllerSpec};
use proptest::prelude::*;

fn specs() -> Vec<ControllerSpec> {
    vec![
        ControllerSpec::DigitalDirect,
        ControllerSpec::DigitalHysteresis { band: 1.0 },
        ControllerSpec::P {
            kp: 0.5,
            out_min: -10.0,
            out_max: 10.0,
        },
        ControllerSpec::PI {
            kp: 0.8,
            ti: 120.0,
            out_min: -10.0,
            out_max: 10.0,
            integral_limit: Some(500.0),
        },
        ControllerSpec::PID {
            kp: 0.8,
            ti: 120.0,
            td: 30.0,
            out_min: -10.0,
            out_max: 10.0,
            integral_limit: None,
        },
    ]
}

/// Drive a controller through accepted steps and return its control values.
fn run(c: &mut dyn Controller, t0: f64, errors: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(errors.len());
    for (i, e) in errors.iter().enumerate() {
        let t = t0 + 60.0 * i as f64;
        c.update(t, *e);
        out.push(c.control_value());
        c.step_completed(t);
    }
    out
}

proptest! {
    #[test]
    fn restart_reproduces_outputs_bit_identically(
        warmup in prop::collection::vec(-5.0_f64..5.0, 1..20),
        tail in prop::collection::vec(-5.0_f64..5.0, 1..20),
    ) {
        for spec in specs() {
            let mut original = spec.build().unwrap();
            run(original.as_mut(), 0.0, &warmup);

            let mut blob = Vec::new();
            original.serialize(&mut blob);
            prop_assert_eq!(blob.len(), original.serialization_size());

            let mut restored = spec.build().unwrap();
            restored.deserialize(&blob).unwrap();

            let t0 = 60.0 * warmup.len() as f64;
            let a = run(original.as_mut(), t0, &tail);
            let b = run(restored.as_mut(), t0, &tail);
            let a_bits: Vec<u64> = a.iter().map(|v| v.to_bits()).collect();
            let b_bits: Vec<u64> = b.iter().map(|v| v.to_bits()).collect();
            prop_assert_eq!(a_bits, b_bits);
        }
    }
}

#[test]
fn failed_iterations_do_not_leak_into_committed_state() {
    for spec in specs() {
        let mut clean = spec.build().unwrap();
        let mut noisy = spec.build().unwrap();
        clean.update(0.0, 1.0);
        clean.step_completed(0.0);
        noisy.update(0.0, 1.0);
        noisy.step_completed(0.0);

        // rejected solver iterations with wild errors
        for e in [100.0, -100.0, 42.0] {
            noisy.update(60.0, e);
        }
        clean.update(60.0, 0.2);
        noisy.update(60.0, 0.2);
        assert_eq!(clean.control_value(), noisy.control_value(), "{}", spec_name(&spec));
    }
}

fn spec_name(spec: &ControllerSpec) -> String {
    format!("{:?}", spec)
}
