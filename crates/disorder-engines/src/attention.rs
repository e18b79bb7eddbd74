use neurodyn_core::buffer::RingBuffer;
use neurodyn_core::dopamine::attention_decay_multiplier;
use neurodyn_core::error::{
    ensure_input, ensure_non_negative, ensure_positive, ensure_unit, DynamicsResult,
};
use neurodyn_core::{FeedbackLoop, StateField, StateVector};
use serde::{Deserialize, Serialize};
use std::any::Any;

const HISTORY_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionParams {
    /// Per second.
    pub decay_rate: f64,
    pub distraction_sensitivity: f64,
    pub recovery_rate: f64,
    /// Attention below this counts as a deficit step.
    pub deficit_threshold: f64,
    /// Extra decay at full deficit, as a multiple of `decay_rate`.
    pub deficit_decay_gain: f64,
    /// Rate at which the state follows the computed score, per second.
    pub smoothing_rate: f64,
}

impl Default for AttentionParams {
    fn default() -> Self {
        Self {
            decay_rate: 0.02,
            distraction_sensitivity: 1.5,
            recovery_rate: 0.01,
            deficit_threshold: 0.5,
            deficit_decay_gain: 1.0,
            smoothing_rate: 2.0,
        }
    }
}

impl AttentionParams {
    pub fn validate(&self) -> DynamicsResult<()> {
        ensure_positive("attention_decay_rate", self.decay_rate)?;
        ensure_positive("distraction_sensitivity", self.distraction_sensitivity)?;
        ensure_unit("attention_recovery_rate", self.recovery_rate)?;
        ensure_unit("deficit_threshold", self.deficit_threshold)?;
        ensure_non_negative("deficit_decay_gain", self.deficit_decay_gain)?;
        ensure_positive("attention_smoothing_rate", self.smoothing_rate)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttentionResult {
    pub mean: f64,
    /// Effective decay rate at the last step, per second.
    pub decay_rate: f64,
    pub variance: f64,
    pub deficit_fraction: f64,
    pub sustained_attention_time: f64,
}

/// Attention that fades with time on task and is pulled down by gated distraction.
#[derive(Debug, Clone)]
pub struct AttentionEngine {
    deficit: f64,
    params: AttentionParams,
    time_on_task: f64,
    last_task_demand: Option<f64>,
    sustained_attention_time: f64,
    last_decay_rate: f64,
    history: RingBuffer<f64>,
    steps: u64,
    deficit_steps: u64,
}

impl AttentionEngine {
    pub fn new(adhd_deficit: f64, params: AttentionParams) -> DynamicsResult<Self> {
        ensure_unit("adhd_deficit", adhd_deficit)?;
        params.validate()?;
        Ok(Self {
            deficit: adhd_deficit,
            params,
            time_on_task: 0.0,
            last_task_demand: None,
            sustained_attention_time: 0.0,
            last_decay_rate: params.decay_rate,
            history: RingBuffer::new(HISTORY_CAPACITY),
            steps: 0,
            deficit_steps: 0,
        })
    }

    pub fn params(&self) -> &AttentionParams {
        &self.params
    }

    /// Decay rate with the deficit applied, before the dopamine multiplier.
    pub fn base_decay_rate(&self) -> f64 {
        self.params.decay_rate * (1.0 + self.params.deficit_decay_gain * self.deficit)
    }

    /// Attention score for one moment of a task.
    ///
    /// `distraction` is the summed intensity x relevance of active
    /// distractors; `gate` is thalamic openness, so a closed gate filters
    /// distraction out entirely.
    pub fn score(
        &self,
        importance: f64,
        distraction: f64,
        time: f64,
        gate: f64,
        decay_multiplier: f64,
    ) -> DynamicsResult<f64> {
        let importance = ensure_input("task_importance", importance, true)?;
        let distraction = ensure_input("distraction", distraction, true)?;
        let time = ensure_input("time_on_task", time, true)?;
        let gate = ensure_input("thalamus_gate", gate, true)?;
        let multiplier = ensure_input("decay_multiplier", decay_multiplier, true)?;

        let base = importance * (-self.base_decay_rate() * multiplier * time).exp();
        let penalty = self.params.distraction_sensitivity * distraction * gate;
        let raw = (base - penalty).max(0.0);
        let r = self.params.recovery_rate;
        Ok((r + (1.0 - r) * raw).min(1.0))
    }

    pub fn time_on_task(&self) -> f64 {
        self.time_on_task
    }

    pub fn result(&self) -> AttentionResult {
        AttentionResult {
            mean: self.history.mean(),
            decay_rate: self.last_decay_rate,
            variance: self.history.variance(),
            deficit_fraction: if self.steps == 0 {
                0.0
            } else {
                self.deficit_steps as f64 / self.steps as f64
            },
            sustained_attention_time: self.sustained_attention_time,
        }
    }
}

impl FeedbackLoop for AttentionEngine {
    fn name(&self) -> &str {
        "attention"
    }

    /// A change in `task_demand` starts a new task and resets time on task.
    fn apply(&mut self, state: &mut StateVector, dt: f64) -> DynamicsResult<()> {
        let importance = state.value(StateField::TaskDemand);
        if self
            .last_task_demand
            .map_or(false, |last| (last - importance).abs() > f64::EPSILON)
        {
            self.time_on_task = 0.0;
        }
        self.last_task_demand = Some(importance);
        self.time_on_task += dt;

        let multiplier = attention_decay_multiplier(state.value(StateField::DopamineLevel));
        self.last_decay_rate = self.base_decay_rate() * multiplier;
        let score = self.score(
            importance,
            state.value(StateField::Distraction),
            self.time_on_task,
            state.value(StateField::ThalamusGate),
            multiplier,
        )?;
        let boost = state.value(StateField::AttentionBoost);
        let target = score + boost * (1.0 - score);
        let attention = state.relax_toward(StateField::Attention, target, self.params.smoothing_rate, dt)?;

        if attention > self.params.deficit_threshold {
            self.sustained_attention_time += dt;
        } else {
            self.deficit_steps += 1;
            self.sustained_attention_time = (self.sustained_attention_time - 2.0 * dt).max(0.0);
        }
        self.history.push(attention);
        self.steps += 1;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
