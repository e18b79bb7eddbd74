use neurodyn_core::error::{ensure_in_range, ensure_unit, DynamicsResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gain/decay/threshold of a self-reinforcing loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopParameters {
    pub gain: f64,
    /// Retention per 0.1 s.
    pub decay: f64,
    pub threshold: f64,
    pub max_strength: f64,
}

impl Default for LoopParameters {
    fn default() -> Self {
        Self {
            gain: 0.05,
            decay: 0.98,
            threshold: 0.3,
            max_strength: 1.0,
        }
    }
}

impl LoopParameters {
    pub fn validate(&self) -> DynamicsResult<()> {
        ensure_unit("loop_gain", self.gain)?;
        ensure_in_range("loop_decay", self.decay, 0.0, 1.0)?;
        ensure_unit("loop_threshold", self.threshold)?;
        ensure_unit("loop_max_strength", self.max_strength)?;
        Ok(())
    }
}

/// Loop strength that grows on triggers, decays with time and feeds itself
/// once it crosses its threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopCore {
    params: LoopParameters,
    strength: f64,
    activations: u64,
    cumulative: f64,
}

impl LoopCore {
    pub fn new(params: LoopParameters) -> DynamicsResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            strength: 0.0,
            activations: 0,
            cumulative: 0.0,
        })
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength.clamp(0.0, self.params.max_strength);
        self
    }

    pub fn params(&self) -> &LoopParameters {
        &self.params
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn activations(&self) -> u64 {
        self.activations
    }

    pub fn cumulative_effect(&self) -> f64 {
        self.cumulative
    }

    pub fn is_active(&self) -> bool {
        self.strength >= self.params.threshold
    }

    /// Raise strength by `gain * intensity`; an active loop also reinforces
    /// itself by a tenth of its gain. Returns whether the loop is active.
    pub fn trigger(&mut self, intensity: f64) -> bool {
        let intensity = intensity.max(0.0);
        let was_active = self.is_active();
        self.strength = (self.strength + intensity * self.params.gain).min(self.params.max_strength);
        let active = self.is_active();
        if active && !was_active {
            debug!(strength = self.strength, threshold = self.params.threshold, "loop crossed activation threshold");
        }
        if active {
            self.activations += 1;
            self.reinforce(0.1);
        }
        active
    }

    /// Extra self-reinforcement, in units of gain.
    pub fn reinforce(&mut self, gain_fraction: f64) {
        if self.strength > self.params.threshold {
            self.strength =
                (self.strength + self.params.gain * gain_fraction).min(self.params.max_strength);
        }
    }

    pub fn suppress(&mut self, factor: f64) {
        self.strength = (self.strength * factor.clamp(0.0, 1.0)).max(0.0);
    }

    pub fn decay(&mut self, dt: f64) {
        self.strength = (self.strength * self.params.decay.powf(dt * 10.0)).max(0.0);
        self.cumulative = self.cumulative * 0.99 + self.strength * 0.01;
    }
}
