use crate::*;
use disorder_engines::{ImpulseScenario, Preset};
use neurodyn_core::{
    ClosedLoopDynamics, DopamineParams, DopamineSystem, DynamicsError, FeedbackLoop,
    MedicationSimulator, MedicationTable, SimRng, StateField, StateVector,
};
use rand::SeedableRng;
use std::collections::BTreeMap;

fn short_config(preset: Preset, steps: u64) -> SimulationConfig {
    SimulationConfig {
        steps,
        ..SimulationConfig::for_preset(preset)
    }
}

#[test]
fn default_config_is_valid() {
    let config = SimulationConfig::default();
    config.validate().unwrap();
    assert_eq!(config.resolved_parameters(), Preset::Healthy.parameters());
}

#[test]
fn partial_json_fills_defaults() {
    let config = SimulationConfig::from_json_str(r#"{"preset": "adhd", "steps": 100, "seed": 7}"#).unwrap();
    assert_eq!(config.steps, 100);
    assert_eq!(config.seed, 7);
    assert_eq!(config.dt, 0.1);
    assert_eq!(config.resolved_parameters(), Preset::Adhd.parameters());
    assert_eq!(config.task, TaskProtocol::default());
}

#[test]
fn explicit_parameters_win_over_preset() {
    let raw = r#"{"preset": "depression", "parameters": {"adhd_deficit": 0.9}}"#;
    let config = SimulationConfig::from_json_str(raw).unwrap();
    let params = config.resolved_parameters();
    assert_eq!(params.adhd_deficit, 0.9);
    assert_eq!(params.negative_bias_strength, 0.0);
}

#[test]
fn config_survives_json() {
    let config = SimulationConfig {
        medications: vec![DoseEvent {
            medication: "methylphenidate".to_string(),
            dose: 20.0,
            time_s: 0.0,
        }],
        ..SimulationConfig::for_preset(Preset::Ptsd)
    };
    let json = config.to_json_pretty().unwrap();
    let parsed = SimulationConfig::from_json_str(&json).unwrap();
    assert_eq!(parsed.preset, Some(Preset::Ptsd));
    assert_eq!(parsed.medications, config.medications);
    assert_eq!(parsed.task.distraction_events.len(), 3);
    assert_eq!(parsed.resolved_parameters(), Preset::Ptsd.parameters());
}

#[test]
fn bad_configs_are_rejected() {
    assert!(matches!(
        SimulationConfig::from_json_str(r#"{"dt": 0.0}"#),
        Err(SimError::Dynamics(DynamicsError::InvalidTimeStep(_)))
    ));
    assert!(matches!(
        SimulationConfig::from_json_str(r#"{"parameters": {"control_impairment": 2.0}}"#),
        Err(SimError::Dynamics(DynamicsError::Configuration { .. }))
    ));
    assert!(matches!(
        SimulationConfig::from_json_str(r#"{"history_capacity": 0}"#),
        Err(SimError::InvalidConfig(_))
    ));
    assert!(matches!(
        SimulationConfig::from_json_str(r#"{"history_capacity": 1152921504606846976}"#),
        Err(SimError::InvalidConfig(_))
    ));
    assert!(matches!(
        SimulationConfig::from_json_str(r#"{"engines": {"hyperactivity": {"window": 1152921504606846976}}}"#),
        Err(SimError::Dynamics(DynamicsError::Configuration { .. }))
    ));
    assert!(matches!(
        SimulationConfig::from_json_str(r#"{"preset": "bipolar"}"#),
        Err(SimError::Json(_))
    ));
    assert!(matches!(
        SimulationConfig::from_json_str(r#"{"task": {"threat_events": [{"start": 5.0, "end": 1.0, "intensity": 0.5}]}}"#),
        Err(SimError::InvalidConfig(_))
    ));
    assert!(matches!(
        SimulationConfig::from_path("/nonexistent/neurodyn.json"),
        Err(SimError::Io { .. })
    ));
}

#[test]
fn medication_schedule_is_checked_at_construction() {
    let unknown = SimulationConfig {
        medications: vec![DoseEvent {
            medication: "caffeine".to_string(),
            dose: 10.0,
            time_s: 0.0,
        }],
        ..SimulationConfig::default()
    };
    assert!(matches!(
        DisorderSimulator::new(unknown),
        Err(SimError::Dynamics(DynamicsError::UnknownMedication(_)))
    ));

    let overdose = SimulationConfig {
        medications: vec![DoseEvent {
            medication: "amphetamine".to_string(),
            dose: 400.0,
            time_s: 0.0,
        }],
        ..SimulationConfig::default()
    };
    assert!(matches!(
        DisorderSimulator::new(overdose),
        Err(SimError::Dynamics(DynamicsError::DoseAboveMaximum { .. }))
    ));
}

#[test]
fn work_blocks_alternate_with_rest() {
    let protocol = TaskProtocol::default();
    assert_eq!(protocol.demand_at(0.0), 0.8);
    assert_eq!(protocol.demand_at(59.9), 0.8);
    assert_eq!(protocol.demand_at(60.0), 0.1);
    assert_eq!(protocol.demand_at(95.0), 0.8);

    let continuous = TaskProtocol {
        rest_seconds: 0.0,
        ..TaskProtocol::default()
    };
    assert_eq!(continuous.demand_at(75.0), 0.8);
}

#[test]
fn driver_writes_scheduled_distraction_and_is_seeded() {
    let quiet = TaskProtocol {
        distraction_rate: 0.0,
        ..TaskProtocol::default()
    };
    let mut driver = InputDriver::new(quiet.clone(), SimRng::seed_from_u64(1));
    let mut state = StateVector::default();
    for _ in 0..60 {
        driver.apply(&mut state, 0.1).unwrap();
    }
    // t = 5.9 falls in the first scheduled window.
    assert!((state.value(StateField::Distraction) - 0.42).abs() < 1e-12);
    assert_eq!(state.value(StateField::TaskDemand), 0.8);

    let trace = |seed: u64| {
        let mut driver = InputDriver::new(quiet.clone(), SimRng::seed_from_u64(seed));
        let mut state = StateVector::default();
        (0..500)
            .map(|_| {
                driver.apply(&mut state, 0.1).unwrap();
                (state.value(StateField::Reward), state.value(StateField::Valence))
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(trace(9), trace(9));
    assert_ne!(trace(9), trace(10));
}

#[test]
fn energy_jitter_does_not_drift() {
    let mut baseline =
        BaselineDynamics::new(1.0, BaselineParams::default(), SimRng::seed_from_u64(4)).unwrap();
    let mut state = StateVector::default();
    state.set_field(StateField::Energy, 50.0).unwrap();
    let mut sum = 0.0;
    for _ in 0..1000 {
        baseline.apply(&mut state, 0.1).unwrap();
        sum += state.value(StateField::Energy);
    }
    assert!((sum / 1000.0 - 50.0).abs() < 2.0);
}

#[test]
fn methylphenidate_lifts_tonic_dopamine() {
    let build = |doses: Vec<DoseEvent>| {
        let dopamine = DopamineSystem::new(0.3, DopamineParams::default()).unwrap();
        let medication = MedicationSimulator::new(MedicationTable::standard());
        let mut dynamics = ClosedLoopDynamics::new(StateVector::default());
        dynamics.register_feedback_loop(NeuromodulationLoop::new(medication, dopamine, doses));
        for _ in 0..600 {
            dynamics.step(0.1).unwrap();
        }
        dynamics
    };
    let untreated = build(Vec::new());
    let treated = build(vec![DoseEvent {
        medication: "methylphenidate".to_string(),
        dose: 20.0,
        time_s: 0.0,
    }]);
    let tonic = |d: &ClosedLoopDynamics| d.state().value(StateField::DopamineTonic);
    assert!(tonic(&treated) > tonic(&untreated));
    assert!(treated.state().value(StateField::AttentionBoost) > 0.0);
    assert_eq!(untreated.state().value(StateField::AttentionBoost), 0.0);

    let summary = treated
        .find_loop::<NeuromodulationLoop>()
        .unwrap()
        .medication_summary();
    assert_eq!(summary.administrations, 1);
    assert!((summary.peak_concentration - 20.0 / 2.1).abs() < 1e-9);
}

#[test]
fn short_run_reports_scores_and_history() {
    let config = SimulationConfig {
        history_capacity: 50,
        ..short_config(Preset::Adhd, 200)
    };
    let run = DisorderSimulator::new(config).unwrap().run().unwrap();
    assert_eq!(run.steps, 200);
    assert_eq!(run.snapshots.len(), 50);
    assert!(run.stability.stable);
    for key in [
        "attention_mean",
        "impulsivity_rate",
        "hyperactivity",
        "negative_bias",
        "energy_final",
        "motivation_score",
    ] {
        assert!(run.final_scores.contains_key(key), "missing {key}");
    }
    assert_eq!(run.assessment.impulse.decisions, 4);
    assert!(run.final_scores.values().all(|v| v.is_finite()));
}

#[test]
fn deficit_lowers_dopamine_and_attention() {
    let healthy = DisorderSimulator::new(short_config(Preset::Healthy, 600))
        .unwrap()
        .run()
        .unwrap();
    let adhd = DisorderSimulator::new(SimulationConfig {
        parameters: Some(disorder_engines::DisorderParameters {
            adhd_deficit: 0.9,
            ..Default::default()
        }),
        steps: 600,
        ..SimulationConfig::default()
    })
    .unwrap()
    .run()
    .unwrap();
    assert!(adhd.final_scores["dopamine_mean"] < healthy.final_scores["dopamine_mean"]);
    assert!(adhd.final_scores["discount_rate"] > healthy.final_scores["discount_rate"]);
    assert!(adhd.final_scores["hyperactivity"] > healthy.final_scores["hyperactivity"]);
}

#[test]
fn impulsivity_task_records_every_scenario() {
    let mut sim = DisorderSimulator::new(short_config(Preset::Adhd, 10)).unwrap();
    let scenarios = vec![ImpulseScenario::new(9.0, 10.0, 600.0); 12];
    let result = sim.simulate_impulsivity_task(&scenarios).unwrap();
    assert_eq!(result.decisions, 12);
    assert!(result.impulsivity_rate > 0.5);
    let bad = [ImpulseScenario::new(1.0, 2.0, f64::NAN)];
    assert!(sim.simulate_impulsivity_task(&bad).is_err());
}

#[test]
fn decline_rate_compares_halves() {
    assert_eq!(decline_rate(&[]), 0.0);
    assert_eq!(decline_rate(&[0.0, 0.0, 1.0, 1.0]), 0.0);
    assert!((decline_rate(&[1.0, 1.0, 0.5, 0.5]) - 0.5).abs() < 1e-12);
}

#[test]
fn distribution_statistics() {
    let d = ScoreDistribution::from_values(&[3.0, 1.0, 2.0, 4.0]).unwrap();
    assert_eq!(d.count, 4);
    assert_eq!(d.mean, 2.5);
    assert_eq!(d.median, 2.5);
    assert_eq!(d.min, 1.0);
    assert_eq!(d.max, 4.0);
    assert!((d.std - 1.25f64.sqrt()).abs() < 1e-12);
    assert!(ScoreDistribution::from_values(&[]).is_none());
    assert!(ScoreDistribution::from_values(&[0.3, 0.3, 0.3]).unwrap().is_zero_variance());
}

#[test]
fn aggregate_skips_unstable_runs_and_non_finite_values() {
    let outcome = |seed: u64, stable: bool, x: f64| SeedOutcome {
        seed,
        stable,
        scores: BTreeMap::from([("x".to_string(), x), ("flat".to_string(), 1.0)]),
    };
    let report = aggregate(vec![
        outcome(1, true, 1.0),
        outcome(2, true, f64::NAN),
        outcome(3, false, 100.0),
        outcome(4, true, 3.0),
    ]);
    assert_eq!(report.runs, 4);
    assert_eq!(report.stable_runs, 3);
    assert_eq!(report.unstable_seeds, vec![3]);
    assert_eq!(report.dropped_values, 1);
    assert_eq!(report.scores["x"].mean, 2.0);
    assert_eq!(report.scores["x"].count, 2);
    assert_eq!(report.zero_variance_scores, vec!["flat".to_string()]);
}

#[test]
fn sweep_runs_each_seed_independently() {
    let sweep = SeedSweep::consecutive(short_config(Preset::Anxiety, 150), 100, 3);
    let report = sweep.run().unwrap();
    assert_eq!(report.runs, 3);
    assert_eq!(report.outcomes.iter().map(|o| o.seed).collect::<Vec<_>>(), vec![100, 101, 102]);
    let solo = sweep.run_seed(101).unwrap();
    assert_eq!(solo, report.outcomes[1]);
    assert!(matches!(
        SeedSweep::new(SimulationConfig::default(), Vec::new()).run(),
        Err(SimError::EmptySweep)
    ));
}
