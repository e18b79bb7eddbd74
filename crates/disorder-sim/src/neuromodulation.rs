use crate::config::DoseEvent;
use neurodyn_core::error::DynamicsResult;
use neurodyn_core::{
    DopamineState, DopamineSummary, DopamineSystem, FeedbackLoop, MedicationSimulator,
    PharmacodynamicEffect, StateField, StateVector,
};
use serde::{Deserialize, Serialize};
use std::any::Any;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Rescorla-Wagner learning rate for the expected reward.
pub const EXPECTATION_RATE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MedicationSummary {
    pub administrations: usize,
    pub peak_concentration: f64,
    pub final_concentration: f64,
    pub peak_dopamine_boost: f64,
    pub peak_attention_boost: f64,
}

/// Medication schedule, PK/PD and dopamine, writing the dopamine fields and
/// the attention boost into the state.
#[derive(Debug, Clone)]
pub struct NeuromodulationLoop {
    medication: MedicationSimulator,
    dopamine: DopamineSystem,
    schedule: Vec<DoseEvent>,
    next_dose: usize,
    expected_reward: f64,
    time: f64,
    last_effect: PharmacodynamicEffect,
    peak: PharmacodynamicEffect,
}

impl NeuromodulationLoop {
    /// `schedule` is sorted by time; doses are checked when they fall due.
    pub fn new(medication: MedicationSimulator, dopamine: DopamineSystem, mut schedule: Vec<DoseEvent>) -> Self {
        schedule.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
        Self {
            medication,
            dopamine,
            schedule,
            next_dose: 0,
            expected_reward: 0.0,
            time: 0.0,
            last_effect: PharmacodynamicEffect::default(),
            peak: PharmacodynamicEffect::default(),
        }
    }

    pub fn medication(&self) -> &MedicationSimulator {
        &self.medication
    }

    pub fn dopamine(&self) -> &DopamineSystem {
        &self.dopamine
    }

    pub fn dopamine_state(&self) -> DopamineState {
        self.dopamine.state()
    }

    pub fn dopamine_summary(&self) -> DopamineSummary {
        self.dopamine.summary()
    }

    pub fn expected_reward(&self) -> f64 {
        self.expected_reward
    }

    pub fn current_effect(&self) -> PharmacodynamicEffect {
        self.last_effect
    }

    pub fn medication_summary(&self) -> MedicationSummary {
        MedicationSummary {
            administrations: self.medication.administrations().len(),
            peak_concentration: self.peak.concentration,
            final_concentration: self.last_effect.concentration,
            peak_dopamine_boost: self.peak.dopamine_boost,
            peak_attention_boost: self.peak.attention_boost,
        }
    }

    fn administer_due(&mut self) -> DynamicsResult<()> {
        while let Some(event) = self.schedule.get(self.next_dose) {
            if event.time_s > self.time {
                break;
            }
            self.medication
                .administer(&event.medication, event.dose, event.time_s / SECONDS_PER_HOUR)?;
            self.next_dose += 1;
        }
        Ok(())
    }
}

impl FeedbackLoop for NeuromodulationLoop {
    fn name(&self) -> &str {
        "neuromodulation"
    }

    /// The medication boost is spread over the step so that a constant
    /// effect settles tonic dopamine roughly `dopamine_boost` above baseline.
    fn apply(&mut self, state: &mut StateVector, dt: f64) -> DynamicsResult<()> {
        self.administer_due()?;
        let effect = self.medication.combined_effect(self.time / SECONDS_PER_HOUR)?;
        let spread = 1.0 - (-self.dopamine.params().tonic_decay_rate * dt).exp();

        let reward = state.value(StateField::Reward);
        let rpe = reward - self.expected_reward;
        self.expected_reward += EXPECTATION_RATE * rpe;

        let dopamine = self.dopamine.update(rpe, dt, effect.dopamine_boost * spread)?;
        state.set_field(StateField::DopamineTonic, dopamine.tonic)?;
        state.set_field(StateField::DopaminePhasic, dopamine.phasic)?;
        state.set_field(StateField::DopamineLevel, dopamine.level)?;
        state.set_field(StateField::AttentionBoost, effect.attention_boost)?;

        self.peak.concentration = self.peak.concentration.max(effect.concentration);
        self.peak.dopamine_boost = self.peak.dopamine_boost.max(effect.dopamine_boost);
        self.peak.attention_boost = self.peak.attention_boost.max(effect.attention_boost);
        self.last_effect = effect;
        self.time += dt;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
