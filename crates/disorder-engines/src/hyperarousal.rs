use crate::loop_core::{LoopCore, LoopParameters};
use neurodyn_core::error::{ensure_input, ensure_positive, ensure_unit, DynamicsResult};
use neurodyn_core::{FeedbackLoop, StateField, StateVector};
use serde::{Deserialize, Serialize};
use std::any::Any;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperarousalParams {
    pub baseline_arousal: f64,
    /// Per second.
    pub arousal_rate: f64,
    /// Weight of the startle response to the current threat.
    pub threat_weight: f64,
    pub core: LoopParameters,
}

impl Default for HyperarousalParams {
    fn default() -> Self {
        Self {
            baseline_arousal: 0.5,
            arousal_rate: 1.0,
            threat_weight: 0.25,
            core: LoopParameters {
                gain: 0.06,
                decay: 0.97,
                threshold: 0.4,
                max_strength: 1.0,
            },
        }
    }
}

impl HyperarousalParams {
    pub fn validate(&self) -> DynamicsResult<()> {
        ensure_unit("baseline_arousal", self.baseline_arousal)?;
        ensure_positive("arousal_rate", self.arousal_rate)?;
        ensure_unit("threat_weight", self.threat_weight)?;
        self.core.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperarousalResult {
    pub loop_strength: f64,
    pub mean_arousal: f64,
    pub peak_arousal: f64,
    pub sleep_quality: f64,
    pub vigilance: f64,
    pub startle: f64,
    pub activations: u64,
    pub threat_events: u64,
}

/// Threat-driven arousal loop.
#[derive(Debug, Clone)]
pub struct HyperarousalEngine {
    level: f64,
    params: HyperarousalParams,
    core: LoopCore,
    arousal_sum: f64,
    peak_arousal: f64,
    samples: u64,
    threat_events: u64,
}

impl HyperarousalEngine {
    pub fn new(hyperarousal_level: f64, params: HyperarousalParams) -> DynamicsResult<Self> {
        ensure_unit("hyperarousal_level", hyperarousal_level)?;
        params.validate()?;
        Ok(Self {
            level: hyperarousal_level,
            params,
            core: LoopCore::new(params.core)?,
            arousal_sum: 0.0,
            peak_arousal: 0.0,
            samples: 0,
            threat_events: 0,
        })
    }

    /// Half the configured level acts as a standing floor under the loop strength.
    pub fn effective_strength(&self) -> f64 {
        self.core.strength().max(0.5 * self.level)
    }

    pub fn sleep_quality(&self) -> f64 {
        1.0 - 0.8 * self.effective_strength()
    }

    pub fn vigilance(&self) -> f64 {
        1.0 + 1.5 * self.effective_strength()
    }

    pub fn startle(&self) -> f64 {
        1.0 + 2.0 * self.effective_strength()
    }

    /// Feed one threat observation; returns the loop strength afterwards.
    pub fn process_threat(&mut self, threat: f64) -> DynamicsResult<f64> {
        let threat = ensure_input("threat", threat, true)?.min(1.0);
        if threat > 0.0 {
            self.threat_events += 1;
            self.core.trigger(threat * self.vigilance());
        }
        Ok(self.core.strength())
    }

    pub fn arousal_target(&self, threat: f64) -> f64 {
        let b = self.params.baseline_arousal;
        (b + (1.0 - b) * self.effective_strength()
            + self.params.threat_weight * threat.clamp(0.0, 1.0) * self.startle() / 3.0)
            .min(1.0)
    }

    pub fn result(&self) -> HyperarousalResult {
        HyperarousalResult {
            loop_strength: self.core.strength(),
            mean_arousal: if self.samples == 0 {
                self.params.baseline_arousal
            } else {
                self.arousal_sum / self.samples as f64
            },
            peak_arousal: self.peak_arousal,
            sleep_quality: self.sleep_quality(),
            vigilance: self.vigilance(),
            startle: self.startle(),
            activations: self.core.activations(),
            threat_events: self.threat_events,
        }
    }
}

impl FeedbackLoop for HyperarousalEngine {
    fn name(&self) -> &str {
        "hyperarousal"
    }

    fn apply(&mut self, state: &mut StateVector, dt: f64) -> DynamicsResult<()> {
        let threat = state.value(StateField::Threat);
        self.process_threat(threat)?;
        self.core.decay(dt);
        let target = self.arousal_target(threat);
        let arousal = state.relax_toward(StateField::Arousal, target, self.params.arousal_rate, dt)?;
        self.arousal_sum += arousal;
        self.peak_arousal = self.peak_arousal.max(arousal);
        self.samples += 1;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
