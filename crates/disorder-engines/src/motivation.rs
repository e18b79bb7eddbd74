use neurodyn_core::error::{ensure_input, ensure_non_negative, ensure_unit, DynamicsResult};
use neurodyn_core::{FeedbackLoop, StateField, StateVector};
use serde::{Deserialize, Serialize};
use std::any::Any;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotivationParams {
    /// Share of each reward outcome's net gain applied to the motivation level.
    pub learning_rate: f64,
    /// Per second, toward the deficit-dependent baseline level.
    pub recovery_rate: f64,
    /// Per second, scaled by task demand and effort cost.
    pub effort_drain: f64,
    /// Per unit of delay in `evaluate_action`.
    pub delay_discount: f64,
    /// Rewards below this are ignored.
    pub reward_threshold: f64,
}

impl Default for MotivationParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            recovery_rate: 0.05,
            effort_drain: 0.01,
            delay_discount: 0.5,
            reward_threshold: 1e-6,
        }
    }
}

impl MotivationParams {
    pub fn validate(&self) -> DynamicsResult<()> {
        ensure_unit("motivation_learning_rate", self.learning_rate)?;
        ensure_non_negative("motivation_recovery_rate", self.recovery_rate)?;
        ensure_non_negative("effort_drain", self.effort_drain)?;
        ensure_non_negative("delay_discount", self.delay_discount)?;
        ensure_unit("reward_threshold", self.reward_threshold)?;
        Ok(())
    }
}

/// Outcome of one received reward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardOutcome {
    pub perceived_reward: f64,
    pub pleasure: f64,
    pub effort_cost: f64,
    pub motivation_gain: f64,
    pub can_engage: bool,
}

/// Whether an offered action is worth the effort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionEvaluation {
    pub total_value: f64,
    pub should_act: bool,
    pub motivation_sufficient: bool,
    pub goal_directed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotivationResult {
    pub score: f64,
    pub final_level: f64,
    pub mean_level: f64,
    pub min_level: f64,
    pub reward_sensitivity: f64,
    pub anhedonia: f64,
    pub effort_cost: f64,
    pub rewards_processed: u64,
    pub engagement_rate: f64,
}

/// Reward-driven motivation with deficit-scaled sensitivity, anhedonia and effort cost.
#[derive(Debug, Clone)]
pub struct MotivationEngine {
    params: MotivationParams,
    reward_sensitivity: f64,
    goal_directed: f64,
    anhedonia: f64,
    effort_cost: f64,
    baseline: f64,
    level: f64,
    min_level: f64,
    level_sum: f64,
    steps: u64,
    rewards: u64,
    engaged: u64,
}

impl MotivationEngine {
    pub fn new(motivation_deficit: f64) -> DynamicsResult<Self> {
        Self::with_params(motivation_deficit, MotivationParams::default())
    }

    pub fn with_params(motivation_deficit: f64, params: MotivationParams) -> DynamicsResult<Self> {
        let deficit = ensure_unit("motivation_deficit", motivation_deficit)?;
        params.validate()?;
        let baseline = 1.0 - 0.8 * deficit;
        Ok(Self {
            params,
            reward_sensitivity: 1.0 - 0.7 * deficit,
            goal_directed: 1.0 - 0.7 * deficit,
            anhedonia: 0.8 * deficit,
            effort_cost: 1.0 + 1.5 * deficit,
            baseline,
            level: baseline,
            min_level: baseline,
            level_sum: 0.0,
            steps: 0,
            rewards: 0,
            engaged: 0,
        })
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn anhedonia(&self) -> f64 {
        self.anhedonia
    }

    pub fn effort_cost(&self) -> f64 {
        self.effort_cost
    }

    fn pleasure(&self, reward: f64) -> (f64, f64) {
        let perceived = reward * self.reward_sensitivity;
        (perceived, perceived * (1.0 - self.anhedonia))
    }

    /// Receive a reward that took `effort` to earn; moves the motivation level.
    pub fn process_reward(&mut self, reward: f64, effort: f64) -> DynamicsResult<RewardOutcome> {
        let reward = ensure_input("reward", reward, true)?;
        let effort = ensure_input("effort", effort, true)?;
        let (perceived_reward, pleasure) = self.pleasure(reward);
        let effort_cost = effort * self.effort_cost;
        let motivation_gain = pleasure - effort_cost;
        self.level = (self.level + self.params.learning_rate * motivation_gain).clamp(0.0, 1.0);

        let can_engage = self.level > 0.3 && motivation_gain > -0.2;
        self.rewards += 1;
        if can_engage {
            self.engaged += 1;
        }
        Ok(RewardOutcome {
            perceived_reward,
            pleasure,
            effort_cost,
            motivation_gain,
            can_engage,
        })
    }

    /// Pure: value of acting for `expected_reward` after `delay`, net of effort.
    pub fn evaluate_action(
        &self,
        expected_reward: f64,
        effort: f64,
        delay: f64,
    ) -> DynamicsResult<ActionEvaluation> {
        let expected_reward = ensure_input("expected_reward", expected_reward, true)?;
        let effort = ensure_input("effort", effort, true)?;
        let delay = ensure_input("delay", delay, true)?;
        let (_, pleasure) = self.pleasure(expected_reward);
        let discounted = pleasure * (-self.params.delay_discount * delay).exp();
        let total_value = discounted - effort * self.effort_cost;
        Ok(ActionEvaluation {
            total_value,
            should_act: total_value > 0.0 && self.level > 0.2,
            motivation_sufficient: self.level > 0.3,
            goal_directed: self.goal_directed > 0.5,
        })
    }

    /// Relax toward baseline while effort under `demand` wears the level down.
    pub fn drift(&mut self, demand: f64, dt: f64) -> DynamicsResult<f64> {
        let demand = ensure_input("task_demand", demand, true)?;
        let dt = ensure_input("dt", dt, true)?;
        let p = &self.params;
        let relax = 1.0 - (-p.recovery_rate * dt).exp();
        let drain = p.effort_drain * demand * self.effort_cost * dt;
        self.level = (self.level + (self.baseline - self.level) * relax - drain).clamp(0.0, 1.0);
        self.min_level = self.min_level.min(self.level);
        self.level_sum += self.level;
        self.steps += 1;
        Ok(self.level)
    }

    /// In [0, 1]; lower means a deeper motivational deficit.
    pub fn score(&self) -> f64 {
        (0.3 * self.reward_sensitivity
            + 0.3 * self.level
            + 0.2 * self.goal_directed
            + 0.1 * (1.0 - self.anhedonia)
            + 0.1 * (2.0 - self.effort_cost) / 1.5)
            .clamp(0.0, 1.0)
    }

    pub fn result(&self) -> MotivationResult {
        MotivationResult {
            score: self.score(),
            final_level: self.level,
            mean_level: if self.steps == 0 {
                self.level
            } else {
                self.level_sum / self.steps as f64
            },
            min_level: self.min_level,
            reward_sensitivity: self.reward_sensitivity,
            anhedonia: self.anhedonia,
            effort_cost: self.effort_cost,
            rewards_processed: self.rewards,
            engagement_rate: if self.rewards == 0 {
                0.0
            } else {
                self.engaged as f64 / self.rewards as f64
            },
        }
    }
}

impl FeedbackLoop for MotivationEngine {
    fn name(&self) -> &str {
        "motivation"
    }

    fn apply(&mut self, state: &mut StateVector, dt: f64) -> DynamicsResult<()> {
        let demand = state.value(StateField::TaskDemand);
        let reward = state.value(StateField::Reward);
        if reward > self.params.reward_threshold {
            self.process_reward(reward, demand)?;
        }
        let level = self.drift(demand, dt)?;
        state.set_field(StateField::Motivation, level)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
