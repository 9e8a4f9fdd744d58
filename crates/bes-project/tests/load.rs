use std::path::PathBuf;

use bes_controls::ControllerSpec;
use bes_core::ReferenceType;
use bes_project::*;

fn demo_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/office.yaml")
}

const MINIMAL: &str = r#"
name: Minimal
simulation:
  end_h: 1
  step_s: 60
climate:
  temperature_c:
    times_h: [0]
    values: [5.0]
"#;

#[test]
fn demo_project_loads() {
    let project = load_path(&demo_path()).unwrap();
    assert_eq!(project.zones.len(), 2);
    assert_eq!(project.models.len(), 4);
    assert!(project.solver.parallel);
    assert_eq!(
        project.object_list("All zones").unwrap().reference_type,
        ReferenceType::Zone
    );
    let Some(ModelDef::Thermostat { controller, .. }) =
        project.models.iter().find(|m| m.id() == 20)
    else {
        panic!("thermostat missing");
    };
    assert!(matches!(controller, ControllerSpec::PI { .. }));
}

#[test]
fn defaults_are_filled_in() {
    let project = parse_yaml(MINIMAL).unwrap();
    assert_eq!(project.simulation.start_h, 0.0);
    assert_eq!(project.simulation.max_retries, 8);
    assert_eq!(project.solver, SolverDef::default());
    assert_eq!(project.solver.max_iterations, 100);
    assert!(project.zones.is_empty());
    assert_eq!(
        project.climate.temperature_c.interpolation,
        InterpolationDef::Linear
    );
}

#[test]
fn yaml_and_json_roundtrip() {
    let project = load_path(&demo_path()).unwrap();
    let dir = std::env::temp_dir();

    let yaml = dir.join("bes_project_roundtrip.yaml");
    save_yaml(&yaml, &project).unwrap();
    assert_eq!(load_path(&yaml).unwrap(), project);

    let json = dir.join("bes_project_roundtrip.json");
    save_json(&json, &project).unwrap();
    assert_eq!(load_path(&json).unwrap(), project);
}

#[test]
fn unknown_extension_is_rejected() {
    let err = load_path(std::path::Path::new("project.toml")).unwrap_err();
    assert!(matches!(err, ProjectError::UnknownFormat { .. }));
}

#[test]
fn all_problems_are_reported_together() {
    let text = r#"
name: Broken
simulation:
  end_h: 1
  step_s: 0
climate:
  temperature_c:
    times_h: [0, 0]
    values: [1.0, 2.0]
zones:
  - { id: 1, name: A, volume_m3: 10, initial_temperature_c: 20 }
  - { id: 1, name: B, volume_m3: -1, initial_temperature_c: 20 }
object_lists:
  - { name: Zones, reference_type: Zone, filter: "0-4" }
  - { name: Models, reference_type: Model, filter: "7" }
models:
  - type: thermostat
    id: 5
    name: T
    zone_list: Models
    heating_setpoint_c: 24
    cooling_setpoint_c: 20
    controller: { type: digital_direct }
  - type: ideal_heating_cooling
    id: 6
    name: H
    zone_list: Nowhere
    thermostat: 99
    max_heating_w: 100
    max_cooling_w: 100
outputs:
  - Zone(id=1)AirTemperature
"#;
    let err = parse_yaml(text).unwrap_err();
    let ProjectError::Validation(report) = err else {
        panic!("expected validation report, got {err}");
    };
    let fields: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
    let has = |needle: &str| fields.iter().any(|f| f.contains(needle));

    assert!(has("simulation.step_s"));
    assert!(has("climate.temperature_c.times_h"));
    assert!(has("Duplicate ID: 1 in zones"));
    assert!(has("zone 'B'.volume_m3"));
    assert!(has("object list 'Zones'.filter"));
    assert!(has("model 'T'.zone_list"));
    assert!(has("model 'T'.heating_setpoint_c"));
    assert!(has("Missing reference: Nowhere"));
    assert!(has("Missing reference: 99"));
    assert!(has("outputs"));
}
