use disorder_engines::Preset;
use disorder_sim::{DisorderSimulator, DoseEvent, SimulationConfig};
use neurodyn_core::StateField;
use proptest::prelude::*;

fn config(preset: Preset, seed: u64, steps: u64) -> SimulationConfig {
    SimulationConfig {
        seed,
        steps,
        ..SimulationConfig::for_preset(preset)
    }
}

#[test]
fn ten_thousand_steps_stay_finite() {
    for preset in Preset::ALL {
        let mut sim = DisorderSimulator::new(config(preset, 11, 0)).unwrap();
        for _ in 0..10_000 {
            let outcome = sim.step().unwrap();
            assert!(outcome.stability.is_stable(), "{preset} at step {}", outcome.step);
            for field in StateField::ALL {
                assert!(outcome.snapshot.value(field).is_finite(), "{preset} {field}");
            }
        }
        assert!(!sim.dynamics().is_unstable());
        assert_eq!(sim.dynamics().steps(), 10_000);
    }
}

#[test]
fn same_seed_gives_bit_identical_snapshots() {
    let a = DisorderSimulator::new(config(Preset::Ptsd, 2024, 800)).unwrap().run().unwrap();
    let b = DisorderSimulator::new(config(Preset::Ptsd, 2024, 800)).unwrap().run().unwrap();
    assert_eq!(a.snapshots.len(), b.snapshots.len());
    assert!(a
        .snapshots
        .iter()
        .zip(&b.snapshots)
        .all(|(x, y)| x.bit_identical(y)));
    assert_eq!(a.final_scores, b.final_scores);

    let c = DisorderSimulator::new(config(Preset::Ptsd, 2025, 800)).unwrap().run().unwrap();
    assert!(a
        .snapshots
        .iter()
        .zip(&c.snapshots)
        .any(|(x, y)| !x.bit_identical(y)));
}

#[test]
fn depression_drains_energy_more_than_healthy() {
    let healthy = DisorderSimulator::new(config(Preset::Healthy, 5, 3000)).unwrap().run().unwrap();
    let depressed = DisorderSimulator::new(config(Preset::Depression, 5, 3000)).unwrap().run().unwrap();
    assert!(depressed.final_scores["energy_mean"] < healthy.final_scores["energy_mean"]);
    assert!(depressed.final_scores["negative_bias"] > healthy.final_scores["negative_bias"]);
    assert!(depressed.final_scores["control_score"] < healthy.final_scores["control_score"]);
    assert!(depressed.final_scores["motivation_score"] < healthy.final_scores["motivation_score"]);
    assert!(depressed.final_scores["motivation_mean"] < healthy.final_scores["motivation_mean"]);
    assert_eq!(healthy.final_scores["anhedonia"], 0.0);
}

#[test]
fn stimulant_raises_mean_dopamine_in_adhd() {
    let untreated = DisorderSimulator::new(config(Preset::Adhd, 8, 3000)).unwrap().run().unwrap();
    let treated = DisorderSimulator::new(SimulationConfig {
        medications: vec![DoseEvent {
            medication: "methylphenidate".to_string(),
            dose: 20.0,
            time_s: 0.0,
        }],
        ..config(Preset::Adhd, 8, 3000)
    })
    .unwrap()
    .run()
    .unwrap();
    assert!(treated.final_scores["dopamine_mean"] > untreated.final_scores["dopamine_mean"]);
    assert!(treated.final_scores["medication_peak_concentration"] > 0.0);
    assert_eq!(untreated.final_scores["medication_peak_concentration"], 0.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn any_seed_and_preset_runs_stable_and_reproducible(seed in any::<u64>(), preset in 0usize..Preset::ALL.len()) {
        let preset = Preset::ALL[preset];
        let first = DisorderSimulator::new(config(preset, seed, 300)).unwrap().run().unwrap();
        let second = DisorderSimulator::new(config(preset, seed, 300)).unwrap().run().unwrap();
        prop_assert!(first.stability.stable);
        prop_assert!(first.final_scores.values().all(|v| v.is_finite()));
        prop_assert_eq!(first.snapshots.len(), second.snapshots.len());
        prop_assert!(first
            .snapshots
            .iter()
            .zip(&second.snapshots)
            .all(|(x, y)| x.bit_identical(y)));
    }
}
