use crate::{render, NeurodynMetrics};
use disorder_engines::Preset;
use disorder_sim::{DisorderSimulator, SeedSweep, SimulationConfig};
use prometheus::Registry;

fn config() -> SimulationConfig {
    SimulationConfig {
        steps: 100,
        ..SimulationConfig::for_preset(Preset::Adhd)
    }
}

#[test]
fn assessment_scores_become_gauges() {
    let registry = Registry::new();
    let metrics = NeurodynMetrics::new(&registry).unwrap();
    let mut sim = DisorderSimulator::new(config()).unwrap();
    let run = sim.run().unwrap();
    metrics.observe_assessment("adhd", &run.assessment);

    let attention = metrics
        .score
        .with_label_values(&["adhd", "attention_mean"])
        .get();
    assert_eq!(attention, run.final_scores["attention_mean"]);
    assert_eq!(metrics.run_stable.with_label_values(&["adhd"]).get(), 1.0);
    assert_eq!(metrics.runs_total.with_label_values(&["adhd", "single"]).get(), 1);

    let text = render(&registry).unwrap();
    assert!(text.contains("neurodyn_score{config=\"adhd\",score=\"attention_mean\"}"));
    assert!(text.contains("neurodyn_run_stable"));
}

#[test]
fn sweep_distributions_become_gauges() {
    let registry = Registry::new();
    let metrics = NeurodynMetrics::new(&registry).unwrap();
    let report = SeedSweep::consecutive(config(), 1, 2).run().unwrap();
    metrics.observe_sweep("adhd", &report);

    let mean = metrics
        .sweep_score_mean
        .with_label_values(&["adhd", "dopamine_mean"])
        .get();
    assert_eq!(mean, report.scores["dopamine_mean"].mean);
    assert_eq!(metrics.runs_total.with_label_values(&["adhd", "sweep"]).get(), 2);
    assert_eq!(metrics.sweep_unstable_runs.with_label_values(&["adhd"]).get(), 0.0);
}

#[test]
fn second_registration_on_one_registry_fails() {
    let registry = Registry::new();
    NeurodynMetrics::new(&registry).unwrap();
    assert!(NeurodynMetrics::new(&registry).is_err());
}
