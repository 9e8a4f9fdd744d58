//! End-to-end evaluation of a small building: climate, one zone, ventilation, summation.

use bes_core::units::constants::{C_AIR, RHO_AIR};
use bes_core::{InputReference, NodeIdx, QuantityName, ReferenceType};
use bes_graph::GroupKind;
use bes_model::models::{
    HeatLoadSummationModel, Loads, NaturalVentilationModel, TimeSeries, VentilationRate, ZoneModel,
};
use bes_model::{Engine, EngineConfig};

struct Building {
    engine: Engine,
    loads: NodeIdx,
    zone: NodeIdx,
    ventilation: NodeIdx,
    summation: NodeIdx,
}

fn building() -> Building {
    let mut engine = Engine::new(EngineConfig::default());
    let loads = engine
        .register(Box::new(Loads::from_celsius("Climate", TimeSeries::constant(10.0))))
        .unwrap();
    let zone = engine
        .register(Box::new(ZoneModel::new(1, "Office", 100.0, 22.0).unwrap()))
        .unwrap();
    let ventilation = engine
        .register(Box::new(
            NaturalVentilationModel::new(5, "Ventilation", vec![1], VentilationRate::Constant(0.5))
                .unwrap(),
        ))
        .unwrap();
    let summation = engine
        .register(Box::new(HeatLoadSummationModel::new(
            6,
            "Ventilation loads",
            ReferenceType::Model,
            vec![5],
            QuantityName::new("VentilationHeatFlux"),
        )))
        .unwrap();
    engine.initialize().unwrap();
    Building {
        engine,
        loads,
        zone,
        ventilation,
        summation,
    }
}

fn expected_flux() -> f64 {
    RHO_AIR * C_AIR * 100.0 * (0.5 / 3600.0) * (283.15 - 295.15)
}

#[test]
fn ventilation_runs_before_summation() {
    let b = building();
    let schedule = b.engine.schedule();

    assert!(schedule.group_of(b.loads).is_none());
    assert!(schedule.group_of(b.zone).is_none());
    let v = schedule.group_of(b.ventilation).unwrap();
    let s = schedule.group_of(b.summation).unwrap();
    assert!(v < s);
    assert!(schedule.groups.iter().all(|g| g.kind == GroupKind::Single));
}

#[test]
fn cold_ambient_cools_the_zone() {
    let mut b = building();
    b.engine.set_time(0.0).unwrap();
    b.engine.evaluate().unwrap();

    let flux = b
        .engine
        .result_value_ref(b.ventilation, &QuantityName::indexed("VentilationHeatFlux", 1))
        .unwrap();
    let total = b
        .engine
        .result_value_ref(b.summation, &QuantityName::new("TotalLoad"))
        .unwrap();

    let flux = b.engine.value(flux.start);
    assert!(flux < 0.0);
    assert!((flux - expected_flux()).abs() < 1e-9);
    assert_eq!(b.engine.value(total.start), flux);
}

#[test]
fn ventilation_rate_is_published_per_second() {
    let mut b = building();
    b.engine.set_time(0.0).unwrap();
    b.engine.evaluate().unwrap();

    let rate: InputReference = "Model(id=5).VentilationRate[1]".parse().unwrap();
    let range = b.engine.find_result(&rate).unwrap();
    assert!((b.engine.value(range.start) - 0.5 / 3600.0).abs() < 1e-15);
}

#[test]
fn zone_state_written_by_caller_is_seen_next_pass() {
    let mut b = building();
    b.engine.set_time(0.0).unwrap();
    b.engine.evaluate().unwrap();

    let air = b
        .engine
        .result_value_ref(b.zone, &QuantityName::new("AirTemperature"))
        .unwrap();
    // Zone at ambient temperature exchanges no heat.
    b.engine.set_value(air.start, 283.15);
    b.engine.evaluate().unwrap();

    let total = b
        .engine
        .result_value_ref(b.summation, &QuantityName::new("TotalLoad"))
        .unwrap();
    assert_eq!(b.engine.value(total.start), 0.0);
}

#[test]
fn dependencies_name_ambient_and_zone_temperature() {
    let b = building();
    let ambient = b
        .engine
        .result_value_ref(b.loads, &QuantityName::new("Temperature"))
        .unwrap()
        .start;
    let air = b
        .engine
        .result_value_ref(b.zone, &QuantityName::new("AirTemperature"))
        .unwrap()
        .start;
    let volume = b
        .engine
        .result_value_ref(b.zone, &QuantityName::new("Volume"))
        .unwrap()
        .start;

    let inputs: Vec<_> = b
        .engine
        .dependencies(b.ventilation)
        .iter()
        .map(|(_, input)| *input)
        .collect();
    assert!(inputs.contains(&ambient));
    assert!(inputs.contains(&air));
    // Constant parameters never produce edges.
    assert!(!inputs.contains(&volume));
}
