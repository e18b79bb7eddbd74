use neurodyn_core::buffer::RingBuffer;
use neurodyn_core::error::{ensure_input, ensure_positive, DynamicsResult};
use neurodyn_core::{DynamicsError, FeedbackLoop, StateField, StateVector};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Longest energy window the engine accepts.
pub const MAX_WINDOW: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperactivityParams {
    pub window: usize,
    /// Energy variance that maps to a full score.
    pub variance_threshold: f64,
    /// Score above which a step counts as hyperactive.
    pub hyperactive_cutoff: f64,
}

impl Default for HyperactivityParams {
    fn default() -> Self {
        Self {
            window: 10,
            variance_threshold: 100.0,
            hyperactive_cutoff: 0.6,
        }
    }
}

impl HyperactivityParams {
    pub fn validate(&self) -> DynamicsResult<()> {
        if !(2..=MAX_WINDOW).contains(&self.window) {
            return Err(DynamicsError::Configuration {
                field: "hyperactivity_window",
                value: self.window as f64,
                min: 2.0,
                max: MAX_WINDOW as f64,
            });
        }
        ensure_positive("variance_threshold", self.variance_threshold)?;
        ensure_positive("hyperactive_cutoff", self.hyperactive_cutoff)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperactivityResult {
    pub score: f64,
    pub mean_score: f64,
    pub max_score: f64,
    pub energy_variance: f64,
    pub hyperactive_fraction: f64,
}

/// Energy variability over a sliding window.
#[derive(Debug, Clone)]
pub struct HyperactivityEngine {
    params: HyperactivityParams,
    energy: RingBuffer<f64>,
    score: f64,
    score_sum: f64,
    max_score: f64,
    samples: u64,
    hyperactive_samples: u64,
}

impl HyperactivityEngine {
    pub fn new(params: HyperactivityParams) -> DynamicsResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            energy: RingBuffer::new(params.window),
            score: 0.0,
            score_sum: 0.0,
            max_score: 0.0,
            samples: 0,
            hyperactive_samples: 0,
        })
    }

    /// Push one energy sample and return the variability score in [0, 1].
    /// The score stays at zero until the window is full.
    pub fn record(&mut self, energy: f64) -> DynamicsResult<f64> {
        let energy = ensure_input("energy", energy, false)?;
        self.energy.push(energy);
        self.score = if self.energy.is_full() {
            (self.energy.variance() / self.params.variance_threshold).min(1.0)
        } else {
            0.0
        };
        self.score_sum += self.score;
        self.max_score = self.max_score.max(self.score);
        self.samples += 1;
        if self.score > self.params.hyperactive_cutoff {
            self.hyperactive_samples += 1;
        }
        Ok(self.score)
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn energy_variance(&self) -> f64 {
        self.energy.variance()
    }

    pub fn result(&self) -> HyperactivityResult {
        let n = self.samples.max(1) as f64;
        HyperactivityResult {
            score: self.score,
            mean_score: self.score_sum / n,
            max_score: self.max_score,
            energy_variance: self.energy.variance(),
            hyperactive_fraction: self.hyperactive_samples as f64 / n,
        }
    }
}

impl FeedbackLoop for HyperactivityEngine {
    fn name(&self) -> &str {
        "hyperactivity"
    }

    fn apply(&mut self, state: &mut StateVector, _dt: f64) -> DynamicsResult<()> {
        let score = self.record(state.value(StateField::Energy))?;
        state.set_field(StateField::Hyperactivity, score)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
