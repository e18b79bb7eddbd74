use neurodyn_core::dopamine::inhibition_multiplier;
use neurodyn_core::error::{ensure_input, ensure_non_negative, ensure_positive, ensure_unit, DynamicsResult};
use neurodyn_core::{FeedbackLoop, StateField, StateVector};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::any::Any;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpulseParams {
    /// Hyperbolic discount rate per delay unit for a healthy, normal-dopamine subject.
    pub base_discount_rate: f64,
    pub deficit_gain: f64,
    pub dopamine_gain: f64,
    /// Softness of the choice rule, in reward units.
    pub temperature: f64,
    /// Seconds per delay unit.
    pub delay_unit: f64,
    /// Rate at which `bg_drive` follows the discount rate, per second.
    pub drive_rate: f64,
}

impl Default for ImpulseParams {
    fn default() -> Self {
        Self {
            base_discount_rate: 0.5,
            deficit_gain: 1.0,
            dopamine_gain: 1.0,
            temperature: 0.1,
            delay_unit: 60.0,
            drive_rate: 0.5,
        }
    }
}

impl ImpulseParams {
    pub fn validate(&self) -> DynamicsResult<()> {
        ensure_positive("base_discount_rate", self.base_discount_rate)?;
        ensure_non_negative("deficit_gain", self.deficit_gain)?;
        ensure_non_negative("dopamine_gain", self.dopamine_gain)?;
        ensure_positive("temperature", self.temperature)?;
        ensure_positive("delay_unit", self.delay_unit)?;
        ensure_positive("drive_rate", self.drive_rate)?;
        Ok(())
    }

    /// Largest reachable discount rate (full deficit, no dopamine).
    pub fn max_discount_rate(&self) -> f64 {
        self.base_discount_rate * (1.0 + self.deficit_gain) * (1.0 + self.dopamine_gain)
    }
}

/// One intertemporal choice: a smaller reward now against a larger one later.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpulseScenario {
    pub immediate_reward: f64,
    pub delayed_reward: f64,
    /// Seconds.
    pub delay: f64,
}

impl ImpulseScenario {
    pub fn new(immediate_reward: f64, delayed_reward: f64, delay: f64) -> Self {
        Self {
            immediate_reward,
            delayed_reward,
            delay,
        }
    }

    fn validate(&self) -> DynamicsResult<()> {
        ensure_input("immediate_reward", self.immediate_reward, true)?;
        ensure_input("delayed_reward", self.delayed_reward, true)?;
        ensure_input("delay", self.delay, true)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Immediate,
    Delayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpulseDecision {
    pub scenario: ImpulseScenario,
    pub discount_rate: f64,
    pub immediate_value: f64,
    pub delayed_value: f64,
    pub p_delayed: f64,
    pub choice: Choice,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpulseResult {
    pub decisions: u64,
    pub immediate_choices: u64,
    pub impulsivity_rate: f64,
    pub mean_p_delayed: f64,
    pub mean_discount_rate: f64,
    pub current_discount_rate: f64,
}

/// Hyperbolic discounting whose rate rises with deficit and falling dopamine.
#[derive(Debug, Clone)]
pub struct ImpulseEngine {
    deficit: f64,
    params: ImpulseParams,
    decisions: Vec<ImpulseDecision>,
    current_rate: f64,
    rate_sum: f64,
    rate_samples: u64,
}

impl ImpulseEngine {
    pub fn new(adhd_deficit: f64, params: ImpulseParams) -> DynamicsResult<Self> {
        ensure_unit("adhd_deficit", adhd_deficit)?;
        params.validate()?;
        let mut engine = Self {
            deficit: adhd_deficit,
            params,
            decisions: Vec::new(),
            current_rate: 0.0,
            rate_sum: 0.0,
            rate_samples: 0,
        };
        engine.current_rate = engine.discount_rate(1.0);
        Ok(engine)
    }

    pub fn params(&self) -> &ImpulseParams {
        &self.params
    }

    /// `k = k0 * (1 + deficit_gain * deficit) * (1 + dopamine_gain * (1 - dopamine))`.
    pub fn discount_rate(&self, dopamine: f64) -> f64 {
        let dopamine = dopamine.clamp(0.0, 1.0);
        self.params.base_discount_rate
            * (1.0 + self.params.deficit_gain * self.deficit)
            * (1.0 + self.params.dopamine_gain * (1.0 - dopamine))
    }

    /// `V = R / (1 + k * D)` with `D` in delay units.
    pub fn discounted_value(&self, reward: f64, delay: f64, dopamine: f64) -> f64 {
        reward / (1.0 + self.discount_rate(dopamine) * delay / self.params.delay_unit)
    }

    /// Deterministic decision: the higher value wins, ties go to the delayed option.
    pub fn decide(&self, scenario: &ImpulseScenario, dopamine: f64) -> DynamicsResult<ImpulseDecision> {
        scenario.validate()?;
        let k = self.discount_rate(dopamine);
        let immediate_value = scenario.immediate_reward;
        let delayed_value = self.discounted_value(scenario.delayed_reward, scenario.delay, dopamine);
        let p_delayed = logistic((delayed_value - immediate_value) / self.params.temperature);
        let choice = if delayed_value >= immediate_value {
            Choice::Delayed
        } else {
            Choice::Immediate
        };
        Ok(ImpulseDecision {
            scenario: *scenario,
            discount_rate: k,
            immediate_value,
            delayed_value,
            p_delayed,
            choice,
        })
    }

    /// Probability of waiting for the delayed reward.
    pub fn p_delayed(&self, scenario: &ImpulseScenario, dopamine: f64) -> DynamicsResult<f64> {
        Ok(self.decide(scenario, dopamine)?.p_delayed)
    }

    /// Record a deterministic decision in the choice history.
    pub fn choose(&mut self, scenario: &ImpulseScenario, dopamine: f64) -> DynamicsResult<ImpulseDecision> {
        let decision = self.decide(scenario, dopamine)?;
        self.decisions.push(decision);
        Ok(decision)
    }

    /// Draw the choice from `p_delayed` and record it.
    pub fn sample_choice<R: Rng + ?Sized>(
        &mut self,
        scenario: &ImpulseScenario,
        dopamine: f64,
        rng: &mut R,
    ) -> DynamicsResult<ImpulseDecision> {
        let mut decision = self.decide(scenario, dopamine)?;
        decision.choice = if rng.gen::<f64>() < decision.p_delayed {
            Choice::Delayed
        } else {
            Choice::Immediate
        };
        self.decisions.push(decision);
        Ok(decision)
    }

    pub fn decisions(&self) -> &[ImpulseDecision] {
        &self.decisions
    }

    pub fn result(&self) -> ImpulseResult {
        let decisions = self.decisions.len() as u64;
        let immediate_choices = self
            .decisions
            .iter()
            .filter(|d| d.choice == Choice::Immediate)
            .count() as u64;
        let (impulsivity_rate, mean_p_delayed) = if decisions == 0 {
            (0.0, 0.0)
        } else {
            (
                immediate_choices as f64 / decisions as f64,
                self.decisions.iter().map(|d| d.p_delayed).sum::<f64>() / decisions as f64,
            )
        };
        ImpulseResult {
            decisions,
            immediate_choices,
            impulsivity_rate,
            mean_p_delayed,
            mean_discount_rate: if self.rate_samples == 0 {
                self.current_rate
            } else {
                self.rate_sum / self.rate_samples as f64
            },
            current_discount_rate: self.current_rate,
        }
    }
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl FeedbackLoop for ImpulseEngine {
    fn name(&self) -> &str {
        "impulse"
    }

    fn apply(&mut self, state: &mut StateVector, dt: f64) -> DynamicsResult<()> {
        let dopamine = state.value(StateField::DopamineLevel);
        let k = self.discount_rate(dopamine);
        self.current_rate = k;
        self.rate_sum += k;
        self.rate_samples += 1;

        let normalized = k / self.params.max_discount_rate();
        state.set_field(StateField::DiscountRate, normalized)?;
        // Reward-seeking drive rises with steeper discounting and weaker inhibition.
        let disinhibition = 1.0 - inhibition_multiplier(dopamine) * state.value(StateField::PfcInhibition);
        let drive = 0.5 * normalized + 0.5 * disinhibition;
        state.relax_toward(StateField::BgDrive, drive, self.params.drive_rate, dt)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
