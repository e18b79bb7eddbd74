use crate::loop_core::{LoopCore, LoopParameters};
use neurodyn_core::error::{ensure_input, ensure_positive, ensure_unit, DynamicsResult};
use neurodyn_core::{FeedbackLoop, StateField, StateVector};
use serde::{Deserialize, Serialize};
use std::any::Any;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegativeBiasParams {
    /// `g` in `bias = 1 - (1 - s) * exp(-g * s * E)`.
    pub exposure_gain: f64,
    pub rumination_gain: f64,
    /// Retention per 0.1 s.
    pub rumination_decay: f64,
    pub memory_gain: f64,
    /// Retention per 0.1 s.
    pub memory_decay: f64,
    /// Rumination above this tints neutral stimuli negative.
    pub neutral_tint_threshold: f64,
    pub core: LoopParameters,
}

impl Default for NegativeBiasParams {
    fn default() -> Self {
        Self {
            exposure_gain: 1.0,
            rumination_gain: 0.1,
            rumination_decay: 0.95,
            memory_gain: 0.05,
            memory_decay: 0.98,
            neutral_tint_threshold: 0.3,
            core: LoopParameters::default(),
        }
    }
}

impl NegativeBiasParams {
    pub fn validate(&self) -> DynamicsResult<()> {
        ensure_positive("exposure_gain", self.exposure_gain)?;
        ensure_unit("rumination_gain", self.rumination_gain)?;
        ensure_unit("rumination_decay", self.rumination_decay)?;
        ensure_unit("memory_gain", self.memory_gain)?;
        ensure_unit("memory_decay", self.memory_decay)?;
        ensure_unit("neutral_tint_threshold", self.neutral_tint_threshold)?;
        self.core.validate()
    }
}

/// How one stimulus was perceived through the current bias.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Appraisal {
    pub perceived_valence: f64,
    pub perceived_intensity: f64,
    pub loop_triggered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NegativeBiasResult {
    pub bias: f64,
    pub exposure: f64,
    pub rumination: f64,
    pub memory_bias: f64,
    pub loop_strength: f64,
    pub negative_amplification: f64,
    pub positive_dampening: f64,
    pub mean_perceived_valence: f64,
    pub negative_stimuli: u64,
    pub positive_stimuli: u64,
}

/// Negative interpretation bias fed by cumulative exposure to negative stimuli.
#[derive(Debug, Clone)]
pub struct NegativeBiasEngine {
    strength: f64,
    params: NegativeBiasParams,
    core: LoopCore,
    exposure: f64,
    rumination: f64,
    memory_bias: f64,
    perceived_sum: f64,
    negative_stimuli: u64,
    positive_stimuli: u64,
    neutral_stimuli: u64,
}

impl NegativeBiasEngine {
    pub fn new(negative_bias_strength: f64, params: NegativeBiasParams) -> DynamicsResult<Self> {
        ensure_unit("negative_bias_strength", negative_bias_strength)?;
        params.validate()?;
        Ok(Self {
            strength: negative_bias_strength,
            params,
            core: LoopCore::new(params.core)?,
            exposure: 0.0,
            rumination: 0.0,
            memory_bias: 0.8 * negative_bias_strength,
            perceived_sum: 0.0,
            negative_stimuli: 0,
            positive_stimuli: 0,
            neutral_stimuli: 0,
        })
    }

    /// Saturating bias in [s, 1]; stays at zero for a zero-strength subject.
    pub fn bias(&self) -> f64 {
        let s = self.strength;
        (1.0 - (1.0 - s) * (-self.params.exposure_gain * s * self.exposure).exp()).clamp(0.0, 1.0)
    }

    pub fn negative_amplification(&self) -> f64 {
        1.0 + 1.5 * self.bias()
    }

    pub fn positive_dampening(&self) -> f64 {
        1.0 - 0.7 * self.bias()
    }

    pub fn exposure(&self) -> f64 {
        self.exposure
    }

    pub fn rumination(&self) -> f64 {
        self.rumination
    }

    pub fn loop_strength(&self) -> f64 {
        self.core.strength()
    }

    /// Appraise one stimulus. `valence` is in [-1, 1]; negative stimuli add
    /// exposure, trigger the loop and feed rumination.
    pub fn process_stimulus(&mut self, valence: f64, intensity: f64) -> DynamicsResult<Appraisal> {
        let valence = ensure_input("valence", valence, false)?.clamp(-1.0, 1.0);
        let intensity = ensure_input("stimulus_intensity", intensity, true)?;

        let appraisal = if valence < 0.0 {
            let amplification = self.negative_amplification();
            let trigger = valence.abs() * intensity;
            self.exposure += trigger;
            let active = self.core.trigger(trigger);
            self.rumination = (self.rumination + self.params.rumination_gain * trigger).min(1.0);
            self.memory_bias = (self.memory_bias + self.params.memory_gain * trigger).min(1.0);
            if self.rumination > 0.5 {
                self.core.reinforce(0.2);
            }
            if self.memory_bias > 0.5 {
                self.core.reinforce(0.15);
            }
            self.negative_stimuli += 1;
            Appraisal {
                perceived_valence: (valence * amplification).clamp(-1.0, 1.0),
                perceived_intensity: intensity * amplification,
                loop_triggered: active,
            }
        } else if valence > 0.0 {
            let dampening = self.positive_dampening();
            self.rumination *= 0.95;
            self.positive_stimuli += 1;
            Appraisal {
                perceived_valence: valence * dampening,
                perceived_intensity: intensity * dampening,
                loop_triggered: false,
            }
        } else {
            self.neutral_stimuli += 1;
            let tinted = if self.rumination > self.params.neutral_tint_threshold {
                -0.1 * self.rumination
            } else {
                0.0
            };
            Appraisal {
                perceived_valence: tinted,
                perceived_intensity: intensity,
                loop_triggered: false,
            }
        };
        self.perceived_sum += appraisal.perceived_valence;
        Ok(appraisal)
    }

    /// Time-based decay of the loop, rumination and memory bias.
    pub fn decay(&mut self, dt: f64) {
        self.core.decay(dt);
        self.rumination *= self.params.rumination_decay.powf(dt * 10.0);
        self.memory_bias *= self.params.memory_decay.powf(dt * 10.0);
    }

    pub fn result(&self) -> NegativeBiasResult {
        let stimuli = self.negative_stimuli + self.positive_stimuli + self.neutral_stimuli;
        NegativeBiasResult {
            bias: self.bias(),
            exposure: self.exposure,
            rumination: self.rumination,
            memory_bias: self.memory_bias,
            loop_strength: self.core.strength(),
            negative_amplification: self.negative_amplification(),
            positive_dampening: self.positive_dampening(),
            mean_perceived_valence: if stimuli == 0 {
                0.0
            } else {
                self.perceived_sum / stimuli as f64
            },
            negative_stimuli: self.negative_stimuli,
            positive_stimuli: self.positive_stimuli,
        }
    }
}

impl FeedbackLoop for NegativeBiasEngine {
    fn name(&self) -> &str {
        "negative_bias"
    }

    /// Rumination is shared with cognitive control, so it is read back from
    /// the state before each update.
    fn apply(&mut self, state: &mut StateVector, dt: f64) -> DynamicsResult<()> {
        self.rumination = state.value(StateField::Rumination);
        let valence = state.value(StateField::Valence);
        if valence != 0.0 {
            self.process_stimulus(valence, 1.0)?;
        }
        if self.core.is_active() {
            self.rumination =
                (self.rumination + self.params.rumination_gain * self.core.strength() * dt).min(1.0);
        }
        self.decay(dt);
        state.set_field(StateField::NegativeBias, self.bias())?;
        state.set_field(StateField::Rumination, self.rumination)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
