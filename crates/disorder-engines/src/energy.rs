use crate::loop_core::{LoopCore, LoopParameters};
use neurodyn_core::error::{ensure_input, ensure_non_negative, ensure_unit, DynamicsResult};
use neurodyn_core::{FeedbackLoop, StateField, StateVector};
use serde::{Deserialize, Serialize};
use std::any::Any;

pub const MAX_ENERGY: f64 = 100.0;

/// Energy rates are in energy units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyParams {
    pub base_depletion: f64,
    pub depletion_gain: f64,
    pub base_recovery: f64,
    pub recovery_loss: f64,
    pub min_recovery: f64,
    /// Fraction of normal consumption while resting.
    pub rest_consumption: f64,
    /// Recovery is halved below this energy.
    pub low_energy: f64,
    /// `task_demand` below this counts as rest.
    pub rest_threshold: f64,
    /// Extra consumption per unit of collapse-loop strength.
    pub loop_amplification: f64,
    pub core: LoopParameters,
}

impl Default for EnergyParams {
    fn default() -> Self {
        Self {
            base_depletion: 0.1,
            depletion_gain: 0.4,
            base_recovery: 0.5,
            recovery_loss: 0.4,
            min_recovery: 0.1,
            rest_consumption: 0.2,
            low_energy: 30.0,
            rest_threshold: 0.2,
            loop_amplification: 0.5,
            core: LoopParameters {
                gain: 0.04,
                decay: 0.99,
                threshold: 0.2,
                max_strength: 1.0,
            },
        }
    }
}

impl EnergyParams {
    pub fn validate(&self) -> DynamicsResult<()> {
        ensure_non_negative("base_depletion", self.base_depletion)?;
        ensure_non_negative("depletion_gain", self.depletion_gain)?;
        ensure_non_negative("base_recovery", self.base_recovery)?;
        ensure_non_negative("recovery_loss", self.recovery_loss)?;
        ensure_non_negative("min_recovery", self.min_recovery)?;
        ensure_unit("rest_consumption", self.rest_consumption)?;
        ensure_non_negative("low_energy", self.low_energy)?;
        ensure_unit("rest_threshold", self.rest_threshold)?;
        ensure_non_negative("loop_amplification", self.loop_amplification)?;
        self.core.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyStep {
    pub energy: f64,
    pub consumed: f64,
    pub recovered: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyResult {
    pub final_energy: f64,
    pub min_energy: f64,
    pub mean_energy: f64,
    pub total_consumed: f64,
    pub total_recovered: f64,
    pub low_energy_fraction: f64,
    pub loop_strength: f64,
    pub sleep_quality: f64,
}

/// Energy drain with recovery gated by `recovery_inhibition`.
#[derive(Debug, Clone)]
pub struct EnergyDepletionEngine {
    depletion_rate: f64,
    recovery_inhibition: f64,
    params: EnergyParams,
    core: LoopCore,
    energy: f64,
    min_energy: f64,
    energy_sum: f64,
    total_consumed: f64,
    total_recovered: f64,
    steps: u64,
    low_steps: u64,
}

impl EnergyDepletionEngine {
    pub fn new(energy_depletion_rate: f64, recovery_inhibition: f64) -> DynamicsResult<Self> {
        Self::with_params(energy_depletion_rate, recovery_inhibition, EnergyParams::default())
    }

    pub fn with_params(
        energy_depletion_rate: f64,
        recovery_inhibition: f64,
        params: EnergyParams,
    ) -> DynamicsResult<Self> {
        ensure_unit("energy_depletion_rate", energy_depletion_rate)?;
        ensure_unit("recovery_inhibition", recovery_inhibition)?;
        params.validate()?;
        Ok(Self {
            depletion_rate: energy_depletion_rate,
            recovery_inhibition,
            params,
            core: LoopCore::new(params.core)?,
            energy: MAX_ENERGY,
            min_energy: MAX_ENERGY,
            energy_sum: 0.0,
            total_consumed: 0.0,
            total_recovered: 0.0,
            steps: 0,
            low_steps: 0,
        })
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn sleep_quality(&self) -> f64 {
        1.0 - 0.7 * self.depletion_rate
    }

    pub fn circadian_rhythm(&self) -> f64 {
        1.0 - 0.6 * self.depletion_rate
    }

    pub fn depletion_per_second(&self) -> f64 {
        self.params.base_depletion + self.params.depletion_gain * self.depletion_rate
    }

    /// Recovery while resting, before the low-energy penalty. Zero at full inhibition.
    pub fn recovery_per_second(&self) -> f64 {
        let p = &self.params;
        (p.base_recovery - p.recovery_loss * self.depletion_rate).max(p.min_recovery)
            * self.sleep_quality()
            * self.circadian_rhythm()
            * (1.0 - self.recovery_inhibition)
    }

    /// Advance from `energy` by `dt` seconds.
    pub fn advance(
        &mut self,
        energy: f64,
        load: f64,
        stress: f64,
        resting: bool,
        dt: f64,
    ) -> DynamicsResult<EnergyStep> {
        let energy = ensure_input("energy", energy, false)?.clamp(0.0, MAX_ENERGY);
        let load = ensure_input("cognitive_load", load, true)?;
        let stress = ensure_input("stress", stress, true)?;
        let dt = ensure_input("dt", dt, true)?;

        let activity = if resting { self.params.rest_consumption } else { 1.0 };
        let consumed = self.depletion_per_second()
            * (1.0 + 0.5 * load + 0.5 * stress)
            * (1.0 + self.params.loop_amplification * self.core.strength())
            * activity
            * dt;
        let recovered = if resting {
            let penalty = if energy < self.params.low_energy { 0.5 } else { 1.0 };
            self.recovery_per_second() * penalty * dt
        } else {
            0.0
        };
        let next = (energy - consumed + recovered).clamp(0.0, MAX_ENERGY);

        let ratio = next / MAX_ENERGY;
        if ratio < 0.5 {
            self.core.trigger(1.0 - ratio);
        }
        self.core.decay(dt);

        self.energy = next;
        self.min_energy = self.min_energy.min(next);
        self.energy_sum += next;
        self.total_consumed += consumed;
        self.total_recovered += recovered;
        self.steps += 1;
        if next < self.params.low_energy {
            self.low_steps += 1;
        }
        Ok(EnergyStep {
            energy: next,
            consumed,
            recovered,
        })
    }

    /// Advance the engine's own energy reserve.
    pub fn update(&mut self, load: f64, stress: f64, resting: bool, dt: f64) -> DynamicsResult<EnergyStep> {
        self.advance(self.energy, load, stress, resting, dt)
    }

    pub fn result(&self) -> EnergyResult {
        let n = self.steps.max(1) as f64;
        EnergyResult {
            final_energy: self.energy,
            min_energy: self.min_energy,
            mean_energy: if self.steps == 0 { self.energy } else { self.energy_sum / n },
            total_consumed: self.total_consumed,
            total_recovered: self.total_recovered,
            low_energy_fraction: self.low_steps as f64 / n,
            loop_strength: self.core.strength(),
            sleep_quality: self.sleep_quality(),
        }
    }
}

impl FeedbackLoop for EnergyDepletionEngine {
    fn name(&self) -> &str {
        "energy_depletion"
    }

    fn apply(&mut self, state: &mut StateVector, dt: f64) -> DynamicsResult<()> {
        let load = state.value(StateField::TaskDemand);
        let step = self.advance(
            state.value(StateField::Energy),
            load,
            state.value(StateField::Threat),
            load < self.params.rest_threshold,
            dt,
        )?;
        state.set_field(StateField::Energy, step.energy)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
