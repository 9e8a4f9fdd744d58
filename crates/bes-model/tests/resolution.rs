//! Input resolution through the engine: precedence, vectors, required and optional inputs.

use bes_core::{InputReference, QuantityName, ReferenceType, ResultKey};
use bes_model::models::{
    ExternalInput, ExternalInputs, HeatLoadSummationModel, Loads, NaturalVentilationModel,
    ScheduleDefinition, Schedules, ThermostatMode, ThermostatModel, Setpoints, TimeSeries,
    VentilationRate, ZoneModel,
};
use bes_model::{Engine, EngineConfig, ModelError};
use bes_controls::ControllerSpec;

fn reference(text: &str) -> InputReference {
    text.parse().unwrap()
}

fn base(engine: &mut Engine, zones: &[u32]) {
    engine
        .register(Box::new(Loads::from_celsius("Climate", TimeSeries::constant(10.0))))
        .unwrap();
    for z in zones {
        engine
            .register(Box::new(ZoneModel::new(*z, format!("Zone {z}"), 50.0, 20.0).unwrap()))
            .unwrap();
    }
}

#[test]
fn identical_setups_resolve_identically() {
    let build = || {
        let mut engine = Engine::new(EngineConfig::default());
        base(&mut engine, &[1, 2, 3]);
        engine
            .register(Box::new(
                NaturalVentilationModel::new(10, "V", vec![1, 2, 3], VentilationRate::Constant(1.0))
                    .unwrap(),
            ))
            .unwrap();
        engine
            .register(Box::new(HeatLoadSummationModel::new(
                11,
                "Sum",
                ReferenceType::Model,
                vec![10],
                QuantityName::new("VentilationHeatFlux"),
            )))
            .unwrap();
        engine.initialize().unwrap();
        engine
    };
    let a = build();
    let b = build();

    assert_eq!(a.describe_schedule(), b.describe_schedule());
    let r = reference("Model(id=10).VentilationHeatFlux[2]");
    assert_eq!(a.find_result(&r), b.find_result(&r));
    for i in 0..a.node_count() {
        let idx = bes_core::NodeIdx(i as u32);
        assert_eq!(a.inputs(idx), b.inputs(idx));
        assert_eq!(a.dependencies(idx), b.dependencies(idx));
    }
}

#[test]
fn missing_required_inputs_are_reported_together() {
    let mut engine = Engine::new(EngineConfig::default());
    base(&mut engine, &[1]);
    engine
        .register(Box::new(
            NaturalVentilationModel::new(10, "V", vec![7], VentilationRate::Constant(1.0)).unwrap(),
        ))
        .unwrap();
    engine
        .register(Box::new(
            ThermostatModel::new(
                20,
                "T",
                vec![9],
                ThermostatMode::PerZone,
                Setpoints::Constant {
                    heating: 20.0,
                    cooling: 26.0,
                },
                &ControllerSpec::DigitalDirect,
            )
            .unwrap(),
        ))
        .unwrap();

    let Err(ModelError::Configuration { issues }) = engine.initialize() else {
        panic!("expected configuration error");
    };
    // Zone 7: AirTemperature and Volume, zone 9: AirTemperature.
    assert_eq!(issues.len(), 3);
    assert!(issues.iter().any(|i| i.source.contains("NaturalVentilationModel #10")));
    assert!(issues.iter().any(|i| i.source.contains("ThermostatModel #20")));
    assert!(issues.iter().any(|i| i.what.contains("Zone(id=9).AirTemperature")));
}

#[test]
fn optional_input_without_producer_contributes_nothing() {
    let mut engine = Engine::new(EngineConfig::default());
    base(&mut engine, &[1]);
    engine
        .register(Box::new(
            NaturalVentilationModel::new(10, "V", vec![1], VentilationRate::Constant(1.0)).unwrap(),
        ))
        .unwrap();
    let with_missing = engine
        .register(Box::new(HeatLoadSummationModel::new(
            11,
            "Sum",
            ReferenceType::Model,
            vec![10, 99],
            QuantityName::new("VentilationHeatFlux"),
        )))
        .unwrap();
    let empty = engine
        .register(Box::new(HeatLoadSummationModel::new(
            12,
            "Nothing",
            ReferenceType::Model,
            Vec::new(),
            QuantityName::new("VentilationHeatFlux"),
        )))
        .unwrap();
    engine.initialize().unwrap();
    engine.set_time(0.0).unwrap();
    engine.evaluate().unwrap();

    let flux = engine
        .find_result(&reference("Model(id=10).VentilationHeatFlux[1]"))
        .unwrap();
    let total = engine
        .result_value_ref(with_missing, &QuantityName::new("TotalLoad"))
        .unwrap();
    let nothing = engine
        .result_value_ref(empty, &QuantityName::new("TotalLoad"))
        .unwrap();

    assert!(engine.inputs(with_missing)[1].1.is_none());
    assert_eq!(engine.value(total.start), engine.value(flux.start));
    assert_eq!(engine.value(nothing.start), 0.0);
}

#[test]
fn overrides_beat_regular_results_which_beat_schedules() {
    let mut engine = Engine::new(EngineConfig::default());
    base(&mut engine, &[1]);
    let external = engine
        .register(Box::new(ExternalInputs::new(vec![ExternalInput {
            target: ResultKey {
                reference_type: ReferenceType::Location,
                id: 0,
                name: "Temperature".into(),
            },
            unit: "K".into(),
            series: Some(TimeSeries::constant(300.0)),
            initial: 300.0,
        }])))
        .unwrap();
    let schedules = engine
        .register(Box::new(Schedules::new(vec![
            ScheduleDefinition {
                quantity: "AirTemperature".into(),
                unit: "K".into(),
                reference_type: ReferenceType::Zone,
                object_ids: vec![1],
                series: TimeSeries::constant(250.0),
            },
            ScheduleDefinition {
                quantity: "VentilationRateSchedule".into(),
                unit: "1/h".into(),
                reference_type: ReferenceType::Zone,
                object_ids: vec![1],
                series: TimeSeries::constant(2.0),
            },
        ])))
        .unwrap();
    engine
        .register(Box::new(
            NaturalVentilationModel::new(10, "V", vec![1], VentilationRate::Scheduled).unwrap(),
        ))
        .unwrap();
    engine.initialize().unwrap();

    let ambient = engine.find_result(&reference("Location(id=0).Temperature")).unwrap();
    let air = engine.find_result(&reference("Zone(id=1).AirTemperature")).unwrap();
    let rate = engine
        .find_result(&reference("Zone(id=1).VentilationRateSchedule"))
        .unwrap();

    assert_eq!(
        Some(ambient),
        engine.result_value_ref(external, &QuantityName::new("Temperature"))
    );
    let zone = engine.find_node(ReferenceType::Zone, 1).unwrap();
    assert_eq!(
        Some(air),
        engine.result_value_ref(zone, &QuantityName::new("AirTemperature"))
    );
    assert_eq!(
        Some(rate),
        engine.result_value_ref(schedules, &QuantityName::new("VentilationRateSchedule"))
    );

    engine.set_time(0.0).unwrap();
    engine.evaluate().unwrap();
    let flux = engine
        .find_result(&reference("Model(id=10).VentilationHeatFlux[1]"))
        .unwrap();
    let expected = 1.205 * 1006.0 * 50.0 * (2.0 / 3600.0) * (300.0 - 293.15);
    assert!((engine.value(flux.start) - expected).abs() < 1e-9);
}

#[test]
fn one_schedule_answers_for_every_listed_object() {
    let mut engine = Engine::new(EngineConfig::default());
    base(&mut engine, &[1, 2]);
    engine
        .register(Box::new(Schedules::new(vec![ScheduleDefinition {
            quantity: "HeatingSetpointSchedule".into(),
            unit: "K".into(),
            reference_type: ReferenceType::Zone,
            object_ids: vec![1, 2],
            series: TimeSeries::new(vec![0.0, 3600.0], vec![290.0, 294.0]).unwrap(),
        }])))
        .unwrap();
    engine.initialize().unwrap();

    let one = engine
        .find_result(&reference("Zone(id=1).HeatingSetpointSchedule"))
        .unwrap();
    let two = engine
        .find_result(&reference("Zone(id=2).HeatingSetpointSchedule"))
        .unwrap();
    assert_eq!(one, two);

    engine.set_time(1800.0).unwrap();
    assert!((engine.value(one.start) - 292.0).abs() < 1e-12);
}

#[test]
fn vector_elements_are_addressed_by_object_id() {
    let mut engine = Engine::new(EngineConfig::default());
    base(&mut engine, &[3, 8]);
    let v = engine
        .register(Box::new(
            NaturalVentilationModel::new(10, "V", vec![3, 8], VentilationRate::Constant(1.0))
                .unwrap(),
        ))
        .unwrap();
    engine.initialize().unwrap();

    let whole = engine
        .result_value_ref(v, &QuantityName::new("VentilationHeatFlux"))
        .unwrap();
    let eight = engine
        .find_result(&reference("Model(id=10).VentilationHeatFlux[8]"))
        .unwrap();
    assert_eq!(whole.len, 2);
    assert_eq!(eight.len, 1);
    assert_eq!(Some(eight.start), whole.get(1));

    // Unknown element and index into a scalar never resolve.
    assert!(engine
        .find_result(&reference("Model(id=10).VentilationHeatFlux[4]"))
        .is_none());
    assert!(engine
        .find_result(&reference("Zone(id=3).AirTemperature[3]"))
        .is_none());
}

#[test]
fn duplicate_producers_are_a_configuration_error() {
    let mut engine = Engine::new(EngineConfig::default());
    base(&mut engine, &[1]);
    engine
        .register(Box::new(ZoneModel::new(1, "Again", 10.0, 20.0).unwrap()))
        .unwrap();
    let err = engine.initialize().unwrap_err();
    assert!(err.to_string().contains("Zone(id=1).AirTemperature"));
}
