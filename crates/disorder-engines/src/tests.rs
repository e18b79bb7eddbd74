use crate::*;
use neurodyn_core::{
    ClosedLoopDynamics, DynamicsError, FeedbackLoop, SimRng, StateField, StateVector,
};
use rand::SeedableRng;

fn rng(seed: u64) -> SimRng {
    SimRng::seed_from_u64(seed)
}

#[test]
fn presets_validate_and_parse() {
    for preset in Preset::ALL {
        preset.parameters().validate().unwrap();
        assert_eq!(preset.name().parse::<Preset>().unwrap(), preset);
    }
    assert_eq!("ADHD".parse::<Preset>().unwrap(), Preset::Adhd);
    assert!("bipolar".parse::<Preset>().is_err());
    assert_eq!(Preset::Healthy.parameters(), DisorderParameters::default());
}

#[test]
fn out_of_range_parameters_fail_fast() {
    let bad = DisorderParameters {
        control_impairment: 1.2,
        ..DisorderParameters::default()
    };
    assert!(matches!(
        bad.validate(),
        Err(DynamicsError::Configuration { field: "control_impairment", .. })
    ));
    assert!(AttentionEngine::new(-0.1, AttentionParams::default()).is_err());
    assert!(ImpulseEngine::new(1.5, ImpulseParams::default()).is_err());
    assert!(NegativeBiasEngine::new(2.0, NegativeBiasParams::default()).is_err());
    assert!(CognitiveControlEngine::new(f64::NAN, CognitiveControlParams::default(), rng(1)).is_err());
    assert!(EnergyDepletionEngine::new(0.5, 1.1).is_err());
    assert!(HyperarousalEngine::new(-1.0, HyperarousalParams::default()).is_err());
}

#[test]
fn loop_core_reinforces_above_threshold() {
    let mut core = LoopCore::new(LoopParameters::default()).unwrap();
    assert!(!core.trigger(1.0));
    assert!((core.strength() - 0.05).abs() < 1e-12);
    let mut active = false;
    for _ in 0..10 {
        active = core.trigger(1.0);
    }
    assert!(active);
    assert!(core.activations() > 0);
    let before = core.strength();
    core.decay(1.0);
    assert!(core.strength() < before);
    core.suppress(0.0);
    assert_eq!(core.strength(), 0.0);
}

#[test]
fn attention_decays_with_time_on_task() {
    let engine = AttentionEngine::new(0.3, AttentionParams::default()).unwrap();
    let early = engine.score(0.8, 0.0, 1.0, 0.5, 1.0).unwrap();
    let late = engine.score(0.8, 0.0, 100.0, 0.5, 1.0).unwrap();
    assert!(late < early);
    assert!(engine.score(0.8, -1.0, 1.0, 0.5, 1.0).is_err());
}

#[test]
fn closed_gate_filters_distraction() {
    let engine = AttentionEngine::new(0.0, AttentionParams::default()).unwrap();
    let quiet = engine.score(0.8, 0.0, 5.0, 0.0, 1.0).unwrap();
    let filtered = engine.score(0.8, 2.0, 5.0, 0.0, 1.0).unwrap();
    let open = engine.score(0.8, 0.2, 5.0, 1.0, 1.0).unwrap();
    assert_eq!(quiet, filtered);
    assert!(open < quiet);
}

#[test]
fn deficit_speeds_attention_decay() {
    let healthy = AttentionEngine::new(0.0, AttentionParams::default()).unwrap();
    let adhd = AttentionEngine::new(0.8, AttentionParams::default()).unwrap();
    assert!(adhd.base_decay_rate() > healthy.base_decay_rate());
    let h = healthy.score(0.8, 0.0, 30.0, 0.5, 1.0).unwrap();
    let a = adhd.score(0.8, 0.0, 30.0, 0.5, 1.0).unwrap();
    assert!(a < h);
}

#[test]
fn attention_loop_tracks_score_and_results() {
    let mut dynamics = ClosedLoopDynamics::new(StateVector::default());
    dynamics.register_feedback_loop(AttentionEngine::new(0.3, AttentionParams::default()).unwrap());
    dynamics.state_mut().set_field(StateField::TaskDemand, 0.9).unwrap();
    for _ in 0..50 {
        dynamics.step(0.1).unwrap();
    }
    let engine = dynamics.find_loop::<AttentionEngine>().unwrap();
    assert!((engine.time_on_task() - 5.0).abs() < 1e-9);
    let result = engine.result();
    assert!(result.mean > 0.5);
    assert!(result.decay_rate > 0.0);

    dynamics.state_mut().set_field(StateField::TaskDemand, 0.4).unwrap();
    dynamics.step(0.1).unwrap();
    let engine = dynamics.find_loop::<AttentionEngine>().unwrap();
    assert!((engine.time_on_task() - 0.1).abs() < 1e-9);
}

#[test]
fn discount_rate_rises_with_deficit_and_low_dopamine() {
    let healthy = ImpulseEngine::new(0.0, ImpulseParams::default()).unwrap();
    let adhd = ImpulseEngine::new(0.6, ImpulseParams::default()).unwrap();
    assert!(adhd.discount_rate(0.6) > healthy.discount_rate(0.6));
    assert!(healthy.discount_rate(0.2) > healthy.discount_rate(0.8));
    assert!((healthy.discount_rate(1.0) - 0.5).abs() < 1e-12);
}

#[test]
fn hyperbolic_value_and_choice() {
    let engine = ImpulseEngine::new(0.0, ImpulseParams::default()).unwrap();
    // k = 0.5 at full dopamine; two minutes halves the value.
    let v = engine.discounted_value(10.0, 120.0, 1.0);
    assert!((v - 5.0).abs() < 1e-12);

    let wait = engine.decide(&ImpulseScenario::new(4.0, 10.0, 120.0), 1.0).unwrap();
    assert_eq!(wait.choice, Choice::Delayed);
    assert!(wait.p_delayed > 0.5);

    let grab = engine.decide(&ImpulseScenario::new(6.0, 10.0, 120.0), 1.0).unwrap();
    assert_eq!(grab.choice, Choice::Immediate);

    let tie = engine.decide(&ImpulseScenario::new(5.0, 10.0, 120.0), 1.0).unwrap();
    assert_eq!(tie.choice, Choice::Delayed);
    assert!((tie.p_delayed - 0.5).abs() < 1e-12);

    assert!(engine.decide(&ImpulseScenario::new(5.0, 10.0, -1.0), 1.0).is_err());
}

#[test]
fn sampled_choices_are_seeded() {
    let scenarios: Vec<_> = (0..30)
        .map(|i| ImpulseScenario::new(5.0, 10.0, 60.0 + i as f64 * 5.0))
        .collect();
    let run = |seed: u64| {
        let mut engine = ImpulseEngine::new(0.3, ImpulseParams::default()).unwrap();
        let mut r = rng(seed);
        scenarios
            .iter()
            .map(|s| engine.sample_choice(s, 0.5, &mut r).unwrap().choice)
            .collect::<Vec<_>>()
    };
    assert_eq!(run(3), run(3));

    let mut engine = ImpulseEngine::new(0.3, ImpulseParams::default()).unwrap();
    for s in &scenarios {
        engine.choose(s, 0.5).unwrap();
    }
    let result = engine.result();
    assert_eq!(result.decisions, 30);
    assert!(result.impulsivity_rate > 0.0 && result.impulsivity_rate <= 1.0);
}

#[test]
fn hyperactivity_needs_a_full_window() {
    let mut engine = HyperactivityEngine::new(HyperactivityParams::default()).unwrap();
    for i in 0..9 {
        assert_eq!(engine.record(if i % 2 == 0 { 90.0 } else { 70.0 }).unwrap(), 0.0);
    }
    let score = engine.record(70.0).unwrap();
    assert!(score > 0.0 && score <= 1.0);

    let mut flat = HyperactivityEngine::new(HyperactivityParams::default()).unwrap();
    for _ in 0..20 {
        flat.record(50.0).unwrap();
    }
    assert_eq!(flat.score(), 0.0);

    let wild = HyperactivityParams {
        variance_threshold: 1.0,
        ..HyperactivityParams::default()
    };
    let mut capped = HyperactivityEngine::new(wild).unwrap();
    for i in 0..10 {
        capped.record(if i % 2 == 0 { 100.0 } else { 0.0 }).unwrap();
    }
    assert_eq!(capped.score(), 1.0);
    assert!(HyperactivityEngine::new(HyperactivityParams {
        window: 1,
        ..HyperactivityParams::default()
    })
    .is_err());
}

#[test]
fn oversized_hyperactivity_window_is_a_configuration_error() {
    let huge = HyperactivityParams {
        window: 1 << 60,
        ..HyperactivityParams::default()
    };
    assert!(matches!(
        HyperactivityEngine::new(huge),
        Err(DynamicsError::Configuration { field: "hyperactivity_window", .. })
    ));
    let largest = HyperactivityParams {
        window: MAX_WINDOW,
        ..HyperactivityParams::default()
    };
    assert!(HyperactivityEngine::new(largest).is_ok());
}

#[test]
fn negative_bias_grows_with_exposure_and_saturates() {
    let mut engine = NegativeBiasEngine::new(0.6, NegativeBiasParams::default()).unwrap();
    let start = engine.bias();
    assert!((start - 0.6).abs() < 1e-12);
    let mut previous = start;
    for _ in 0..200 {
        engine.process_stimulus(-0.8, 1.0).unwrap();
        let bias = engine.bias();
        assert!(bias >= previous && bias <= 1.0);
        previous = bias;
    }
    assert!(previous > 0.99);
}

#[test]
fn zero_strength_never_builds_bias() {
    let mut engine = NegativeBiasEngine::new(0.0, NegativeBiasParams::default()).unwrap();
    for _ in 0..100 {
        engine.process_stimulus(-1.0, 1.0).unwrap();
    }
    assert_eq!(engine.bias(), 0.0);
}

#[test]
fn appraisal_amplifies_negative_and_dampens_positive() {
    let mut engine = NegativeBiasEngine::new(0.5, NegativeBiasParams::default()).unwrap();
    let negative = engine.process_stimulus(-0.2, 1.0).unwrap();
    assert!(negative.perceived_valence < -0.2);
    let positive = engine.process_stimulus(0.5, 1.0).unwrap();
    assert!(positive.perceived_valence < 0.5 && positive.perceived_valence > 0.0);
    assert!(engine.rumination() > 0.0);
}

#[test]
fn override_probability_falls_with_impairment() {
    assert!((override_probability(0.0, 0.0) - 1.0).abs() < 1e-12);
    assert!((override_probability(1.0, 1.0) - 0.2).abs() < 1e-12);
    assert!(override_probability(0.6, 0.5) < override_probability(0.3, 0.5));
}

#[test]
fn control_failure_feeds_the_loop() {
    let mut impaired =
        CognitiveControlEngine::new(1.0, CognitiveControlParams::default(), rng(5)).unwrap();
    let mut healthy =
        CognitiveControlEngine::new(0.0, CognitiveControlParams::default(), rng(5)).unwrap();
    for _ in 0..200 {
        impaired.attempt_control(0.8).unwrap();
        healthy.attempt_control(0.8).unwrap();
    }
    let i = impaired.result();
    let h = healthy.result();
    assert!(i.success_rate < h.success_rate);
    assert!(i.control_score < h.control_score);
    assert!(i.loop_strength >= h.loop_strength);
}

#[test]
fn control_suppresses_rumination_in_the_loop() {
    let mut dynamics = ClosedLoopDynamics::new(StateVector::default());
    dynamics.register_feedback_loop(
        CognitiveControlEngine::new(0.0, CognitiveControlParams::default(), rng(9)).unwrap(),
    );
    dynamics.state_mut().set_field(StateField::Rumination, 0.8).unwrap();
    dynamics.state_mut().set_field(StateField::TaskDemand, 0.0).unwrap();
    for _ in 0..20 {
        dynamics.step(0.1).unwrap();
    }
    // Zero impairment and zero difficulty: every attempt succeeds.
    let rumination = dynamics.state().value(StateField::Rumination);
    assert!((rumination - 0.8 * 0.9f64.powi(20)).abs() < 1e-9);
    let engine = dynamics.find_loop::<CognitiveControlEngine>().unwrap();
    assert_eq!(engine.result().successes, 20);
}

#[test]
fn energy_drains_faster_with_depletion_rate() {
    let mut slow = EnergyDepletionEngine::new(0.0, 0.0).unwrap();
    let mut fast = EnergyDepletionEngine::new(1.0, 0.0).unwrap();
    for _ in 0..100 {
        slow.update(0.5, 0.0, false, 0.1).unwrap();
        fast.update(0.5, 0.0, false, 0.1).unwrap();
    }
    assert!(fast.energy() < slow.energy());
}

#[test]
fn rest_recovers_unless_inhibited() {
    let mut free = EnergyDepletionEngine::new(0.2, 0.0).unwrap();
    let mut blocked = EnergyDepletionEngine::new(0.2, 1.0).unwrap();
    let start = 50.0;
    let a = free.advance(start, 0.0, 0.0, true, 1.0).unwrap();
    let b = blocked.advance(start, 0.0, 0.0, true, 1.0).unwrap();
    assert!(a.energy > start);
    assert!(b.energy <= start);
    assert_eq!(b.recovered, 0.0);
}

#[test]
fn low_energy_halves_recovery() {
    let mut engine = EnergyDepletionEngine::new(0.0, 0.0).unwrap();
    let high = engine.advance(80.0, 0.0, 0.0, true, 1.0).unwrap();
    let low = engine.advance(10.0, 0.0, 0.0, true, 1.0).unwrap();
    assert!((low.recovered - 0.5 * high.recovered).abs() < 1e-12);
}

#[test]
fn hyperarousal_rises_under_threat() {
    let mut calm = ClosedLoopDynamics::new(StateVector::default());
    calm.register_feedback_loop(HyperarousalEngine::new(0.7, HyperarousalParams::default()).unwrap());
    let mut threatened = ClosedLoopDynamics::new(StateVector::default());
    threatened
        .register_feedback_loop(HyperarousalEngine::new(0.7, HyperarousalParams::default()).unwrap());
    threatened.state_mut().set_field(StateField::Threat, 0.9).unwrap();
    for _ in 0..50 {
        calm.step(0.1).unwrap();
        threatened.step(0.1).unwrap();
    }
    let c = calm.state().value(StateField::Arousal);
    let t = threatened.state().value(StateField::Arousal);
    assert!(t > c);
    let result = threatened.find_loop::<HyperarousalEngine>().unwrap().result();
    assert_eq!(result.threat_events, 50);
    assert!(result.sleep_quality < 1.0);
}

#[test]
fn healthy_hyperarousal_rests_at_baseline() {
    let mut engine = HyperarousalEngine::new(0.0, HyperarousalParams::default()).unwrap();
    assert_eq!(engine.arousal_target(0.0), 0.5);
    let mut state = StateVector::default();
    for _ in 0..10 {
        engine.apply(&mut state, 0.1).unwrap();
    }
    assert!((state.value(StateField::Arousal) - 0.5).abs() < 1e-12);
}

#[test]
fn motivation_deficit_blunts_reward() {
    let mut healthy = MotivationEngine::new(0.0).unwrap();
    let outcome = healthy.process_reward(1.0, 0.5).unwrap();
    assert_eq!(outcome.motivation_gain, 0.5);
    assert!(outcome.can_engage);
    assert_eq!(healthy.level(), 1.0);

    let mut depressed = MotivationEngine::new(0.6).unwrap();
    assert!((depressed.anhedonia() - 0.48).abs() < 1e-12);
    assert!((depressed.effort_cost() - 1.9).abs() < 1e-12);
    let outcome = depressed.process_reward(1.0, 0.5).unwrap();
    assert!((outcome.pleasure - 0.3016).abs() < 1e-12);
    assert!((outcome.motivation_gain + 0.6484).abs() < 1e-12);
    assert!(!outcome.can_engage);
    assert!((depressed.level() - 0.45516).abs() < 1e-12);

    assert!(depressed.score() < healthy.score());
    assert!((MotivationEngine::new(0.0).unwrap().score() - (0.9 + 0.1 / 1.5)).abs() < 1e-12);
    assert!(MotivationEngine::new(1.5).is_err());
    assert!(depressed.process_reward(f64::NAN, 0.5).is_err());
}

#[test]
fn action_value_falls_with_delay_and_deficit() {
    let healthy = MotivationEngine::new(0.0).unwrap();
    let now = healthy.evaluate_action(1.0, 0.5, 0.0).unwrap();
    let later = healthy.evaluate_action(1.0, 0.5, 4.0).unwrap();
    assert_eq!(now.total_value, 0.5);
    assert!(now.should_act && now.goal_directed && now.motivation_sufficient);
    assert!(later.total_value < now.total_value);

    let depressed = MotivationEngine::new(0.6).unwrap();
    let offer = depressed.evaluate_action(1.0, 0.5, 0.0).unwrap();
    assert!(offer.total_value < 0.0);
    assert!(!offer.should_act);
}

#[test]
fn motivation_loop_writes_level_and_recovers_at_rest() {
    let mut engine = MotivationEngine::new(0.6).unwrap();
    let mut state = StateVector::default();
    state.set_field(StateField::Reward, 1.0).unwrap();
    state.set_field(StateField::TaskDemand, 0.5).unwrap();
    engine.apply(&mut state, 0.1).unwrap();
    assert_eq!(state.value(StateField::Motivation), engine.level());
    assert!(engine.level() < 0.52);

    state.set_field(StateField::Reward, 0.0).unwrap();
    state.set_field(StateField::TaskDemand, 0.0).unwrap();
    for _ in 0..2000 {
        engine.apply(&mut state, 0.1).unwrap();
    }
    assert!((state.value(StateField::Motivation) - 0.52).abs() < 1e-3);
    let result = engine.result();
    assert_eq!(result.rewards_processed, 1);
    assert_eq!(result.engagement_rate, 0.0);
    assert!(result.min_level < 0.52);
}

#[test]
fn impulse_and_hyperactivity_loops_keep_to_their_fields() {
    let mut dynamics = ClosedLoopDynamics::new(StateVector::default());
    dynamics.register_feedback_loop(ImpulseEngine::new(0.5, ImpulseParams::default()).unwrap());
    dynamics.register_feedback_loop(HyperactivityEngine::new(HyperactivityParams::default()).unwrap());
    dynamics.state_mut().set_field(StateField::PfcInhibition, 0.2).unwrap();
    dynamics.state_mut().set_field(StateField::Arousal, 0.9).unwrap();
    for _ in 0..30 {
        dynamics.step(0.1).unwrap();
    }
    let state = dynamics.state();
    assert_eq!(state.value(StateField::PfcInhibition), 0.2);
    assert_eq!(state.value(StateField::Arousal), 0.9);
    assert_ne!(state.value(StateField::BgDrive), StateField::BgDrive.default_value());
}
