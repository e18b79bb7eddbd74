use crate::assessment::{decline_rate, AssessmentResult, StabilitySummary};
use crate::config::SimulationConfig;
use crate::driver::{BaselineDynamics, InputDriver};
use crate::error::{SimError, SimResult};
use crate::neuromodulation::NeuromodulationLoop;
use disorder_engines::{
    AttentionEngine, CognitiveControlEngine, DisorderParameters, EnergyDepletionEngine,
    HyperactivityEngine, HyperarousalEngine, ImpulseEngine, ImpulseResult, ImpulseScenario,
    MotivationEngine, NegativeBiasEngine,
};
use neurodyn_core::{
    ClosedLoopDynamics, DopamineSystem, FeedbackLoop, MedicationSimulator, MedicationTable,
    SimulationContext, StateField, StateSnapshot, StateVector, StepOutcome,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Output of one completed run. Read-only once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    pub seed: u64,
    pub steps: u64,
    /// Last `history_capacity` snapshots, oldest first.
    pub snapshots: Vec<StateSnapshot>,
    pub final_scores: BTreeMap<String, f64>,
    pub stability: StabilitySummary,
    pub assessment: AssessmentResult,
}

/// One seeded, single-threaded closed loop with every engine registered.
///
/// Loop order per step: input driver, neuromodulation (medication and
/// dopamine), baseline gating/noise, attention, impulse, energy,
/// hyperactivity, negative bias, cognitive control, hyperarousal.
#[derive(Debug)]
pub struct DisorderSimulator {
    config: SimulationConfig,
    parameters: DisorderParameters,
    context: SimulationContext,
    dynamics: ClosedLoopDynamics,
}

impl DisorderSimulator {
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        let parameters = config.resolved_parameters();
        let mut context = SimulationContext::new(config.seed).with_dt(config.dt)?;

        let mut table = MedicationTable::standard();
        for profile in &config.extra_medications {
            table.insert(profile.clone())?;
        }
        let medication = MedicationSimulator::new(table);
        // Reject a bad schedule now rather than mid-run.
        let mut dry_run = medication.clone();
        for dose in &config.medications {
            dry_run.administer(&dose.medication, dose.dose, dose.time_s / 3600.0)?;
        }

        let engines = &config.engines;
        let mut dynamics = ClosedLoopDynamics::with_history_capacity(
            StateVector::new(config.clamp_policy),
            config.history_capacity,
        );
        dynamics.register_feedback_loop(InputDriver::new(config.task.clone(), context.fork()));

        let dopamine = DopamineSystem::new(parameters.adhd_deficit, config.dopamine)?
            .with_volatility(config.dopamine_volatility, context.fork())?;
        dynamics.state_mut().set_field(StateField::DopamineTonic, dopamine.state().tonic)?;
        dynamics.state_mut().set_field(StateField::DopamineLevel, dopamine.state().level)?;
        dynamics.register_feedback_loop(NeuromodulationLoop::new(
            medication,
            dopamine,
            config.medications.clone(),
        ));
        dynamics.register_feedback_loop(BaselineDynamics::new(
            parameters.adhd_deficit,
            engines.baseline,
            context.fork(),
        )?);
        dynamics.register_feedback_loop(AttentionEngine::new(parameters.adhd_deficit, engines.attention)?);
        dynamics.register_feedback_loop(ImpulseEngine::new(parameters.adhd_deficit, engines.impulse)?);
        dynamics.register_feedback_loop(EnergyDepletionEngine::with_params(
            parameters.energy_depletion_rate,
            parameters.recovery_inhibition,
            engines.energy,
        )?);
        dynamics.register_feedback_loop(HyperactivityEngine::new(engines.hyperactivity)?);
        dynamics.register_feedback_loop(NegativeBiasEngine::new(
            parameters.negative_bias_strength,
            engines.negative_bias,
        )?);
        dynamics.register_feedback_loop(CognitiveControlEngine::new(
            parameters.control_impairment,
            engines.cognitive_control,
            context.fork(),
        )?);
        dynamics.register_feedback_loop(HyperarousalEngine::new(
            parameters.hyperarousal_level,
            engines.hyperarousal,
        )?);
        dynamics.register_feedback_loop(MotivationEngine::with_params(
            parameters.motivation_deficit,
            engines.motivation,
        )?);

        debug!(seed = config.seed, loops = ?dynamics.loop_names(), "simulator built");
        Ok(Self {
            config,
            parameters,
            context,
            dynamics,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn parameters(&self) -> &DisorderParameters {
        &self.parameters
    }

    pub fn dynamics(&self) -> &ClosedLoopDynamics {
        &self.dynamics
    }

    pub fn state(&self) -> &StateVector {
        self.dynamics.state()
    }

    pub fn engine<T: FeedbackLoop + 'static>(&self) -> Option<&T> {
        self.dynamics.find_loop::<T>()
    }

    fn require<T: FeedbackLoop + 'static>(&self, name: &'static str) -> SimResult<&T> {
        self.dynamics.find_loop::<T>().ok_or(SimError::MissingLoop(name))
    }

    /// Advance one `dt`. Instability is reported in the outcome, not as an error.
    pub fn step(&mut self) -> SimResult<StepOutcome> {
        Ok(self.dynamics.step(self.config.dt)?)
    }

    /// Step `config.steps` times, run the configured impulsivity scenarios
    /// and assess.
    pub fn run(&mut self) -> SimResult<SimulationRun> {
        for _ in 0..self.config.steps {
            self.step()?;
        }
        let scenarios = self.config.task.impulsivity_scenarios.clone();
        if !scenarios.is_empty() {
            self.simulate_impulsivity_task(&scenarios)?;
        }
        let assessment = self.assess()?;
        info!(
            seed = self.config.seed,
            steps = self.dynamics.steps(),
            stable = assessment.stability.stable,
            "simulation run complete"
        );
        Ok(SimulationRun {
            seed: self.config.seed,
            steps: self.dynamics.steps(),
            snapshots: self.dynamics.history().to_vec(),
            final_scores: assessment.scores(),
            stability: assessment.stability.clone(),
            assessment,
        })
    }

    /// Sample one choice per scenario at the current dopamine level. Draws
    /// come from a fresh fork of the run's context.
    pub fn simulate_impulsivity_task(&mut self, scenarios: &[ImpulseScenario]) -> SimResult<ImpulseResult> {
        let mut rng = self.context.fork();
        let dopamine = self.dynamics.state().value(StateField::DopamineLevel);
        let engine = self
            .dynamics
            .find_loop_mut::<ImpulseEngine>()
            .ok_or(SimError::MissingLoop("impulse"))?;
        for scenario in scenarios {
            engine.sample_choice(scenario, dopamine, &mut rng)?;
        }
        Ok(engine.result())
    }

    pub fn stability(&self) -> StabilitySummary {
        StabilitySummary {
            stable: !self.dynamics.is_unstable(),
            steps: self.dynamics.steps(),
            unstable_steps: self.dynamics.instability_count(),
            first_instability: self.dynamics.first_instability().cloned(),
        }
    }

    pub fn assess(&self) -> SimResult<AssessmentResult> {
        let attention_series: Vec<f64> = self
            .dynamics
            .history()
            .iter()
            .map(|s| s.value(StateField::Attention))
            .collect();
        let neuromodulation = self.require::<NeuromodulationLoop>("neuromodulation")?;
        Ok(AssessmentResult {
            parameters: self.parameters,
            attention: self.require::<AttentionEngine>("attention")?.result(),
            attention_decline: decline_rate(&attention_series),
            impulse: self.require::<ImpulseEngine>("impulse")?.result(),
            hyperactivity: self.require::<HyperactivityEngine>("hyperactivity")?.result(),
            negative_bias: self.require::<NegativeBiasEngine>("negative_bias")?.result(),
            cognitive_control: self
                .require::<CognitiveControlEngine>("cognitive_control")?
                .result(),
            energy: self.require::<EnergyDepletionEngine>("energy_depletion")?.result(),
            hyperarousal: self.require::<HyperarousalEngine>("hyperarousal")?.result(),
            motivation: self.require::<MotivationEngine>("motivation")?.result(),
            dopamine: neuromodulation.dopamine_summary(),
            medication: neuromodulation.medication_summary(),
            stability: self.stability(),
        })
    }
}
