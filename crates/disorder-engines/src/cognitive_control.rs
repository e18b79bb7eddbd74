use crate::loop_core::{LoopCore, LoopParameters};
use neurodyn_core::dopamine::inhibition_multiplier;
use neurodyn_core::error::{ensure_input, ensure_positive, ensure_unit, DynamicsResult};
use neurodyn_core::{FeedbackLoop, SimRng, StateField, StateVector};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Chance of overriding a reactive response: `(1 - 0.6 i) * (1 - 0.5 d)`.
pub fn override_probability(impairment: f64, difficulty: f64) -> f64 {
    let i = impairment.clamp(0.0, 1.0);
    let d = difficulty.clamp(0.0, 1.0);
    (1.0 - 0.6 * i) * (1.0 - 0.5 * d)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveControlParams {
    /// Rumination level above which control is attempted each step.
    pub engage_threshold: f64,
    /// Rumination retained after a successful override.
    pub suppression: f64,
    /// Rumination growth after a failed override.
    pub continuation_gain: f64,
    /// Rate at which `pfc_inhibition` follows inhibition strength, per second.
    pub pfc_rate: f64,
    pub core: LoopParameters,
}

impl Default for CognitiveControlParams {
    fn default() -> Self {
        Self {
            engage_threshold: 0.05,
            suppression: 0.9,
            continuation_gain: 0.05,
            pfc_rate: 0.5,
            core: LoopParameters::default(),
        }
    }
}

impl CognitiveControlParams {
    pub fn validate(&self) -> DynamicsResult<()> {
        ensure_unit("engage_threshold", self.engage_threshold)?;
        ensure_unit("suppression", self.suppression)?;
        ensure_unit("continuation_gain", self.continuation_gain)?;
        ensure_positive("pfc_rate", self.pfc_rate)?;
        self.core.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlAttempt {
    pub success: bool,
    pub probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CognitiveControlResult {
    pub attempts: u64,
    pub successes: u64,
    pub success_rate: f64,
    pub control_score: f64,
    pub inhibition_strength: f64,
    pub executive_function: f64,
    pub working_memory: f64,
    pub loop_strength: f64,
    pub negative_thought_frequency: f64,
}

/// Inhibitory control over a gated loop; failed overrides let the loop run on.
#[derive(Debug, Clone)]
pub struct CognitiveControlEngine {
    impairment: f64,
    params: CognitiveControlParams,
    core: LoopCore,
    rng: SimRng,
    attempts: u64,
    successes: u64,
    negative_thought_frequency: f64,
}

impl CognitiveControlEngine {
    pub fn new(
        control_impairment: f64,
        params: CognitiveControlParams,
        rng: SimRng,
    ) -> DynamicsResult<Self> {
        ensure_unit("control_impairment", control_impairment)?;
        params.validate()?;
        Ok(Self {
            impairment: control_impairment,
            params,
            core: LoopCore::new(params.core)?,
            rng,
            attempts: 0,
            successes: 0,
            negative_thought_frequency: 0.0,
        })
    }

    /// Configured impairment, worsened by an active failure loop.
    pub fn effective_impairment(&self) -> f64 {
        self.impairment.max(self.core.strength())
    }

    pub fn inhibition_strength(&self) -> f64 {
        1.0 - 0.7 * self.effective_impairment()
    }

    pub fn cognitive_flexibility(&self) -> f64 {
        1.0 - 0.6 * self.effective_impairment()
    }

    pub fn working_memory(&self) -> f64 {
        1.0 - 0.5 * self.effective_impairment()
    }

    pub fn executive_function(&self) -> f64 {
        1.0 - 0.6 * self.effective_impairment()
    }

    pub fn control_score(&self) -> f64 {
        (0.3 * self.inhibition_strength()
            + 0.2 * self.cognitive_flexibility()
            + 0.2 * self.working_memory()
            + 0.2 * self.executive_function()
            + 0.1 * (1.0 - self.negative_thought_frequency))
            .clamp(0.0, 1.0)
    }

    pub fn success_probability(&self, difficulty: f64) -> DynamicsResult<f64> {
        let difficulty = ensure_input("task_difficulty", difficulty, true)?;
        Ok(override_probability(self.effective_impairment(), difficulty))
    }

    /// One override attempt. Success weakens the failure loop; failure
    /// triggers it in proportion to how likely success was not.
    pub fn attempt_control(&mut self, difficulty: f64) -> DynamicsResult<ControlAttempt> {
        let probability = self.success_probability(difficulty)?;
        let success = self.rng.gen::<f64>() < probability;
        self.attempts += 1;
        if success {
            self.successes += 1;
            self.core.suppress(0.9);
        } else {
            let intensity = difficulty.clamp(0.0, 1.0) * (1.0 - probability);
            self.core.trigger(intensity);
            self.negative_thought_frequency =
                (self.negative_thought_frequency + 0.1 * intensity).min(1.0);
            if self.inhibition_strength() < 0.5 {
                self.core.reinforce(0.2);
            }
            if self.negative_thought_frequency > 0.5 {
                self.core.reinforce(0.15);
            }
        }
        Ok(ControlAttempt {
            success,
            probability,
        })
    }

    pub fn result(&self) -> CognitiveControlResult {
        CognitiveControlResult {
            attempts: self.attempts,
            successes: self.successes,
            success_rate: if self.attempts == 0 {
                1.0
            } else {
                self.successes as f64 / self.attempts as f64
            },
            control_score: self.control_score(),
            inhibition_strength: self.inhibition_strength(),
            executive_function: self.executive_function(),
            working_memory: self.working_memory(),
            loop_strength: self.core.strength(),
            negative_thought_frequency: self.negative_thought_frequency,
        }
    }
}

impl FeedbackLoop for CognitiveControlEngine {
    fn name(&self) -> &str {
        "cognitive_control"
    }

    fn apply(&mut self, state: &mut StateVector, dt: f64) -> DynamicsResult<()> {
        let rumination = state.value(StateField::Rumination);
        if rumination > self.params.engage_threshold {
            let attempt = self.attempt_control(state.value(StateField::TaskDemand))?;
            let next = if attempt.success {
                rumination * self.params.suppression
            } else {
                rumination + self.params.continuation_gain * rumination * (1.0 - attempt.probability)
            };
            state.set_field(StateField::Rumination, next)?;
        }
        self.core.decay(dt);
        self.negative_thought_frequency *= 0.99f64.powf(dt * 10.0);

        state.set_field(StateField::ControlStrength, self.control_score())?;
        let target = self.inhibition_strength() * inhibition_multiplier(state.value(StateField::DopamineLevel));
        state.relax_toward(StateField::PfcInhibition, target, self.params.pfc_rate, dt)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
