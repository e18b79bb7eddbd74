use crate::config::{BaselineParams, DistractionEvent, TaskProtocol, ThreatEvent};
use neurodyn_core::dopamine::hyperactivity_multiplier;
use neurodyn_core::error::{ensure_unit, DynamicsResult};
use neurodyn_core::{FeedbackLoop, SimRng, StateField, StateVector};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use std::any::Any;

/// Probability that a Poisson process with `rate` per second fires within `dt`.
fn fire_probability(rate: f64, dt: f64) -> f64 {
    1.0 - (-rate * dt).exp()
}

/// Writes the external inputs (task demand, distraction, reward, valence,
/// threat) at the start of every step.
///
/// Every step draws the same number of random values whatever fires, so the
/// stream stays aligned across protocol changes that only alter rates.
#[derive(Debug, Clone)]
pub struct InputDriver {
    protocol: TaskProtocol,
    rng: SimRng,
    time: f64,
    random_distractions: Vec<DistractionEvent>,
    random_threats: Vec<ThreatEvent>,
    rewards: u64,
    negative_stimuli: u64,
    positive_stimuli: u64,
}

impl InputDriver {
    pub fn new(protocol: TaskProtocol, rng: SimRng) -> Self {
        Self {
            protocol,
            rng,
            time: 0.0,
            random_distractions: Vec::new(),
            random_threats: Vec::new(),
            rewards: 0,
            negative_stimuli: 0,
            positive_stimuli: 0,
        }
    }

    pub fn protocol(&self) -> &TaskProtocol {
        &self.protocol
    }

    pub fn rewards(&self) -> u64 {
        self.rewards
    }

    pub fn stimuli(&self) -> (u64, u64) {
        (self.negative_stimuli, self.positive_stimuli)
    }

    fn distraction_at(&self, t: f64) -> f64 {
        self.protocol
            .distraction_events
            .iter()
            .chain(self.random_distractions.iter())
            .filter(|e| e.is_active(t))
            .map(DistractionEvent::magnitude)
            .sum()
    }

    fn threat_at(&self, t: f64) -> f64 {
        self.protocol
            .threat_events
            .iter()
            .chain(self.random_threats.iter())
            .filter(|e| e.is_active(t))
            .map(|e| e.intensity)
            .fold(0.0, f64::max)
    }
}

impl FeedbackLoop for InputDriver {
    fn name(&self) -> &str {
        "input_driver"
    }

    fn apply(&mut self, state: &mut StateVector, dt: f64) -> DynamicsResult<()> {
        let t = self.time;
        let p = &self.protocol;

        let reward_draw: f64 = self.rng.gen();
        let stimulus_draw: f64 = self.rng.gen();
        let sign_draw: f64 = self.rng.gen();
        let strength_draw: f64 = self.rng.gen();
        let distraction_draw: f64 = self.rng.gen();
        let threat_draw: f64 = self.rng.gen();
        let magnitude_draw: f64 = self.rng.gen();

        if distraction_draw < fire_probability(p.distraction_rate, dt) {
            self.random_distractions.push(DistractionEvent {
                start: t,
                end: t + p.distraction_duration,
                intensity: 0.3 + 0.5 * magnitude_draw,
                relevance: 0.5 + 0.5 * strength_draw,
            });
        }
        if threat_draw < fire_probability(p.threat_rate, dt) {
            self.random_threats.push(ThreatEvent {
                start: t,
                end: t + p.threat_duration,
                intensity: 0.4 + 0.6 * magnitude_draw,
            });
        }
        self.random_distractions.retain(|e| e.end > t);
        self.random_threats.retain(|e| e.end > t);

        let reward = if reward_draw < fire_probability(p.reward_rate, dt) {
            self.rewards += 1;
            p.reward_magnitude
        } else {
            0.0
        };
        let valence = if stimulus_draw < fire_probability(p.stimulus_rate, dt) {
            let strength = 0.3 + 0.7 * strength_draw;
            if sign_draw < p.negative_fraction {
                self.negative_stimuli += 1;
                -strength
            } else {
                self.positive_stimuli += 1;
                strength
            }
        } else {
            0.0
        };

        state.set_field(StateField::TaskDemand, p.demand_at(t))?;
        state.set_field(StateField::Distraction, self.distraction_at(t))?;
        state.set_field(StateField::Reward, reward)?;
        state.set_field(StateField::Valence, valence)?;
        state.set_field(StateField::Threat, self.threat_at(t))?;
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

/// Thalamic gating, intrinsic noise and short-lived energy fluctuations.
#[derive(Debug, Clone)]
pub struct BaselineDynamics {
    deficit: f64,
    params: BaselineParams,
    rng: SimRng,
    last_jitter: f64,
}

impl BaselineDynamics {
    pub fn new(adhd_deficit: f64, params: BaselineParams, rng: SimRng) -> DynamicsResult<Self> {
        ensure_unit("adhd_deficit", adhd_deficit)?;
        Ok(Self {
            deficit: adhd_deficit,
            params,
            rng,
            last_jitter: 0.0,
        })
    }

    /// Gate openness: arousal and deficit open it, prefrontal inhibition closes it.
    pub fn gate_target(&self, arousal: f64, pfc_inhibition: f64) -> f64 {
        (0.3 + 0.3 * arousal + 0.3 * self.deficit - 0.2 * (pfc_inhibition - 0.5)).clamp(0.0, 1.0)
    }

    pub fn noise_target(&self, dopamine: f64) -> f64 {
        let p = &self.params;
        (p.base_noise + p.noise_gain * self.deficit * hyperactivity_multiplier(dopamine)).min(1.0)
    }
}

impl FeedbackLoop for BaselineDynamics {
    fn name(&self) -> &str {
        "baseline"
    }

    /// The jitter added to energy is withdrawn on the next step, so it
    /// widens short-window variance without drifting the reserve.
    fn apply(&mut self, state: &mut StateVector, dt: f64) -> DynamicsResult<()> {
        let gate = self.gate_target(
            state.value(StateField::Arousal),
            state.value(StateField::PfcInhibition),
        );
        state.relax_toward(StateField::ThalamusGate, gate, self.params.gate_rate, dt)?;

        let noise = self.noise_target(state.value(StateField::DopamineLevel));
        state.set_field(StateField::NoiseLevel, noise)?;

        let z: f64 = StandardNormal.sample(&mut self.rng);
        let jitter = z * self.params.energy_jitter * noise;
        let base = state.value(StateField::Energy) - self.last_jitter;
        let stored = state.set_field(StateField::Energy, base + jitter)?;
        self.last_jitter = stored - base;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
