use crate::buffer::RingBuffer;
use crate::context::SimRng;
use crate::error::{ensure_in_range, ensure_input, ensure_positive, ensure_unit, DynamicsResult};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Level below which dopamine starts to degrade downstream behaviour.
pub const LOW_DOPAMINE_THRESHOLD: f64 = 0.4;

const HISTORY_CAPACITY: usize = 1000;

/// Tunable constants of the tonic/phasic model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DopamineParams {
    /// Weight `k` in the phasic scale `1 - deficit * k`.
    pub deficit_weight: f64,
    pub phasic_gain: f64,
    pub phasic_ceiling: f64,
    /// Per second.
    pub phasic_decay_rate: f64,
    pub tonic_baseline: f64,
    /// Fraction of the baseline removed at full deficit.
    pub baseline_drop: f64,
    /// Per second.
    pub tonic_decay_rate: f64,
    pub phasic_weight: f64,
}

impl Default for DopamineParams {
    fn default() -> Self {
        Self {
            deficit_weight: 0.5,
            phasic_gain: 0.5,
            phasic_ceiling: 1.0,
            phasic_decay_rate: 1.0,
            tonic_baseline: 0.6,
            baseline_drop: 0.5,
            tonic_decay_rate: 0.1,
            phasic_weight: 0.5,
        }
    }
}

impl DopamineParams {
    pub fn validate(&self) -> DynamicsResult<()> {
        ensure_unit("deficit_weight", self.deficit_weight)?;
        ensure_positive("phasic_gain", self.phasic_gain)?;
        ensure_in_range("phasic_ceiling", self.phasic_ceiling, f64::MIN_POSITIVE, 1.0)?;
        ensure_positive("phasic_decay_rate", self.phasic_decay_rate)?;
        ensure_unit("tonic_baseline", self.tonic_baseline)?;
        ensure_unit("baseline_drop", self.baseline_drop)?;
        ensure_positive("tonic_decay_rate", self.tonic_decay_rate)?;
        ensure_unit("phasic_weight", self.phasic_weight)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DopamineState {
    pub tonic: f64,
    pub phasic: f64,
    pub reward_sensitivity: f64,
    /// Effective level seen by downstream engines.
    pub level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DopamineSummary {
    pub mean_level: f64,
    pub level_variance: f64,
    pub final_tonic: f64,
    pub final_phasic: f64,
    pub reward_sensitivity: f64,
    pub updates: u64,
}

/// Tonic/phasic dopamine driven by reward-prediction error and external boosts.
#[derive(Debug, Clone)]
pub struct DopamineSystem {
    deficit: f64,
    params: DopamineParams,
    state: DopamineState,
    noise: Option<(Normal<f64>, SimRng)>,
    history: RingBuffer<f64>,
    updates: u64,
}

impl DopamineSystem {
    pub fn new(deficit: f64, params: DopamineParams) -> DynamicsResult<Self> {
        ensure_unit("adhd_deficit", deficit)?;
        params.validate()?;
        let mut system = Self {
            deficit,
            params,
            state: DopamineState {
                tonic: 0.0,
                phasic: 0.0,
                reward_sensitivity: 0.0,
                level: 0.0,
            },
            noise: None,
            history: RingBuffer::new(HISTORY_CAPACITY),
            updates: 0,
        };
        system.reset();
        Ok(system)
    }

    /// Add zero-mean Gaussian jitter of width `sigma` to the effective level.
    pub fn with_volatility(mut self, sigma: f64, rng: SimRng) -> DynamicsResult<Self> {
        ensure_in_range("volatility", sigma, 0.0, 1.0)?;
        self.noise = if sigma > 0.0 {
            Normal::new(0.0, sigma).ok().map(|normal| (normal, rng))
        } else {
            None
        };
        Ok(self)
    }

    pub fn deficit(&self) -> f64 {
        self.deficit
    }

    pub fn params(&self) -> &DopamineParams {
        &self.params
    }

    pub fn state(&self) -> DopamineState {
        self.state
    }

    /// Tonic target, lowered by the deficit.
    pub fn baseline(&self) -> f64 {
        self.params.tonic_baseline * (1.0 - self.params.baseline_drop * self.deficit)
    }

    fn phasic_scale(&self) -> f64 {
        (1.0 - self.deficit * self.params.deficit_weight).max(0.0)
    }

    /// Advance by `time_elapsed` seconds since the previous update.
    pub fn update(
        &mut self,
        rpe: f64,
        time_elapsed: f64,
        external_boost: f64,
    ) -> DynamicsResult<DopamineState> {
        let rpe = ensure_input("reward_prediction_error", rpe, false)?;
        let dt = ensure_input("time_elapsed", time_elapsed, true)?;
        let boost = ensure_input("external_boost", external_boost, true)?;
        let p = self.params;
        let scale = self.phasic_scale();

        let mut phasic = self.state.phasic * (-p.phasic_decay_rate * dt).exp();
        if rpe != 0.0 {
            let target = p.phasic_ceiling * rpe.signum();
            let pull = 1.0 - (-p.phasic_gain * rpe.abs() * scale).exp();
            phasic += (target - phasic) * pull;
        }
        let phasic = phasic.clamp(-p.phasic_ceiling, p.phasic_ceiling);

        let baseline = self.baseline();
        let boosted = (self.state.tonic + boost).clamp(0.0, 1.0);
        let tonic = (baseline + (boosted - baseline) * (-p.tonic_decay_rate * dt).exp()).clamp(0.0, 1.0);

        let jitter = match self.noise.as_mut() {
            Some((normal, rng)) => normal.sample(rng),
            None => 0.0,
        };
        let level = (tonic + p.phasic_weight * phasic + jitter).clamp(0.0, 1.0);

        self.state = DopamineState {
            tonic,
            phasic,
            reward_sensitivity: scale * (0.5 + 0.5 * tonic),
            level,
        };
        self.history.push(level);
        self.updates += 1;
        Ok(self.state)
    }

    pub fn effect_on_attention(&self) -> f64 {
        attention_decay_multiplier(self.state.level)
    }

    pub fn effect_on_impulse(&self) -> f64 {
        inhibition_multiplier(self.state.level)
    }

    pub fn effect_on_hyperactivity(&self) -> f64 {
        hyperactivity_multiplier(self.state.level)
    }

    pub fn summary(&self) -> DopamineSummary {
        DopamineSummary {
            mean_level: self.history.mean(),
            level_variance: self.history.variance(),
            final_tonic: self.state.tonic,
            final_phasic: self.state.phasic,
            reward_sensitivity: self.state.reward_sensitivity,
            updates: self.updates,
        }
    }

    /// Back to the deficit-adjusted baseline with no phasic activity.
    pub fn reset(&mut self) {
        let tonic = self.baseline();
        self.state = DopamineState {
            tonic,
            phasic: 0.0,
            reward_sensitivity: self.phasic_scale() * (0.5 + 0.5 * tonic),
            level: tonic,
        };
        self.history.clear();
        self.updates = 0;
    }
}

/// Multiplier (>= 1) on attention decay when dopamine is low.
pub fn attention_decay_multiplier(level: f64) -> f64 {
    if level < LOW_DOPAMINE_THRESHOLD {
        (1.0 + (LOW_DOPAMINE_THRESHOLD - level) * 2.5).min(2.5)
    } else {
        1.0
    }
}

/// Multiplier (<= 1) on inhibitory control when dopamine is low.
pub fn inhibition_multiplier(level: f64) -> f64 {
    if level < LOW_DOPAMINE_THRESHOLD {
        (level / LOW_DOPAMINE_THRESHOLD).max(0.3)
    } else {
        1.0
    }
}

pub fn hyperactivity_multiplier(level: f64) -> f64 {
    if level < LOW_DOPAMINE_THRESHOLD {
        (1.0 + (LOW_DOPAMINE_THRESHOLD - level) * 1.5).min(2.0)
    } else {
        1.0
    }
}
