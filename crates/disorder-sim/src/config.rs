use crate::error::{SimError, SimResult};
use disorder_engines::{
    AttentionParams, CognitiveControlParams, DisorderParameters, EnergyParams, HyperactivityParams,
    HyperarousalParams, ImpulseParams, ImpulseScenario, MotivationParams, NegativeBiasParams, Preset,
};
use neurodyn_core::error::{ensure_in_range, ensure_input, ensure_non_negative, ensure_positive, ensure_unit};
use neurodyn_core::{
    ClampPolicy, DopamineParams, DynamicsError, MedicationProfile, DEFAULT_DT, MAX_HISTORY_CAPACITY,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_STEPS: u64 = 3000;

/// One scheduled dose. `time_s` is simulated seconds from the start of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseEvent {
    pub medication: String,
    pub dose: f64,
    pub time_s: f64,
}

/// Scheduled distractor, active on `[start, end)` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistractionEvent {
    pub start: f64,
    pub end: f64,
    pub intensity: f64,
    pub relevance: f64,
}

impl DistractionEvent {
    pub fn magnitude(&self) -> f64 {
        self.intensity * self.relevance
    }

    pub fn is_active(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// Threat exposure window, active on `[start, end)` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatEvent {
    pub start: f64,
    pub end: f64,
    pub intensity: f64,
}

impl ThreatEvent {
    pub fn is_active(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// External inputs fed to the loop each step. Rates are events per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskProtocol {
    pub task_demand: f64,
    /// Length of a work block; 0 keeps the task running continuously.
    pub block_seconds: f64,
    pub rest_seconds: f64,
    pub rest_demand: f64,
    pub distraction_events: Vec<DistractionEvent>,
    pub distraction_rate: f64,
    pub distraction_duration: f64,
    pub reward_rate: f64,
    pub reward_magnitude: f64,
    pub stimulus_rate: f64,
    /// Share of emotional stimuli that are negative.
    pub negative_fraction: f64,
    pub threat_events: Vec<ThreatEvent>,
    pub threat_rate: f64,
    pub threat_duration: f64,
    /// Delay-discounting choices run at the end of `run`.
    pub impulsivity_scenarios: Vec<ImpulseScenario>,
}

impl Default for TaskProtocol {
    fn default() -> Self {
        Self {
            task_demand: 0.8,
            block_seconds: 60.0,
            rest_seconds: 30.0,
            rest_demand: 0.1,
            distraction_events: vec![
                DistractionEvent { start: 5.0, end: 7.0, intensity: 0.6, relevance: 0.7 },
                DistractionEvent { start: 15.0, end: 17.0, intensity: 0.5, relevance: 0.6 },
                DistractionEvent { start: 25.0, end: 27.0, intensity: 0.7, relevance: 0.8 },
            ],
            distraction_rate: 0.02,
            distraction_duration: 2.0,
            reward_rate: 0.1,
            reward_magnitude: 1.0,
            stimulus_rate: 0.2,
            negative_fraction: 0.5,
            threat_events: Vec::new(),
            threat_rate: 0.0,
            threat_duration: 3.0,
            impulsivity_scenarios: vec![
                ImpulseScenario::new(5.0, 50.0, 10.0),
                ImpulseScenario::new(10.0, 100.0, 20.0),
                ImpulseScenario::new(20.0, 200.0, 30.0),
                ImpulseScenario::new(15.0, 150.0, 25.0),
            ],
        }
    }
}

impl TaskProtocol {
    pub fn validate(&self) -> SimResult<()> {
        ensure_unit("task_demand", self.task_demand)?;
        ensure_non_negative("block_seconds", self.block_seconds)?;
        ensure_non_negative("rest_seconds", self.rest_seconds)?;
        ensure_unit("rest_demand", self.rest_demand)?;
        ensure_non_negative("distraction_rate", self.distraction_rate)?;
        ensure_non_negative("distraction_duration", self.distraction_duration)?;
        ensure_non_negative("reward_rate", self.reward_rate)?;
        ensure_unit("reward_magnitude", self.reward_magnitude)?;
        ensure_non_negative("stimulus_rate", self.stimulus_rate)?;
        ensure_unit("negative_fraction", self.negative_fraction)?;
        ensure_non_negative("threat_rate", self.threat_rate)?;
        ensure_non_negative("threat_duration", self.threat_duration)?;
        for event in &self.distraction_events {
            check_window("distraction", event.start, event.end)?;
            ensure_non_negative("distraction_intensity", event.intensity)?;
            ensure_unit("distraction_relevance", event.relevance)?;
        }
        for event in &self.threat_events {
            check_window("threat", event.start, event.end)?;
            ensure_unit("threat_intensity", event.intensity)?;
        }
        for scenario in &self.impulsivity_scenarios {
            ensure_input("immediate_reward", scenario.immediate_reward, true)?;
            ensure_input("delayed_reward", scenario.delayed_reward, true)?;
            ensure_input("delay", scenario.delay, true)?;
        }
        Ok(())
    }

    /// Task demand at time `t`, alternating work blocks and rest when both are set.
    pub fn demand_at(&self, t: f64) -> f64 {
        let cycle = self.block_seconds + self.rest_seconds;
        if self.block_seconds > 0.0 && self.rest_seconds > 0.0 && t % cycle >= self.block_seconds {
            self.rest_demand
        } else {
            self.task_demand
        }
    }
}

fn check_window(kind: &str, start: f64, end: f64) -> SimResult<()> {
    if start.is_finite() && end.is_finite() && start >= 0.0 && end >= start {
        Ok(())
    } else {
        Err(SimError::InvalidConfig(format!(
            "{kind} event window [{start}, {end}) must be finite, non-negative and ordered"
        )))
    }
}

/// Tunables for every engine; anything omitted falls back to its `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub attention: AttentionParams,
    pub impulse: ImpulseParams,
    pub hyperactivity: HyperactivityParams,
    pub negative_bias: NegativeBiasParams,
    pub cognitive_control: CognitiveControlParams,
    pub energy: EnergyParams,
    pub hyperarousal: HyperarousalParams,
    pub motivation: MotivationParams,
    pub baseline: BaselineParams,
}

/// Gate, noise and energy-jitter constants for the baseline loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineParams {
    /// Per second.
    pub gate_rate: f64,
    pub base_noise: f64,
    pub noise_gain: f64,
    /// Energy jitter standard deviation at full noise.
    pub energy_jitter: f64,
}

impl Default for BaselineParams {
    fn default() -> Self {
        Self {
            gate_rate: 1.0,
            base_noise: 0.05,
            noise_gain: 0.5,
            energy_jitter: 20.0,
        }
    }
}

impl BaselineParams {
    pub fn validate(&self) -> SimResult<()> {
        ensure_positive("gate_rate", self.gate_rate)?;
        ensure_unit("base_noise", self.base_noise)?;
        ensure_unit("noise_gain", self.noise_gain)?;
        ensure_in_range("energy_jitter", self.energy_jitter, 0.0, 50.0)?;
        Ok(())
    }
}

/// Everything needed to reproduce one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub dt: f64,
    pub steps: u64,
    pub history_capacity: usize,
    pub clamp_policy: ClampPolicy,
    pub preset: Option<Preset>,
    /// Explicit parameters; take precedence over `preset`.
    pub parameters: Option<DisorderParameters>,
    pub dopamine: DopamineParams,
    pub dopamine_volatility: f64,
    pub medications: Vec<DoseEvent>,
    /// Profiles added to the standard medication table.
    pub extra_medications: Vec<MedicationProfile>,
    pub task: TaskProtocol,
    pub engines: EngineConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            dt: DEFAULT_DT,
            steps: DEFAULT_STEPS,
            history_capacity: neurodyn_core::DEFAULT_HISTORY_CAPACITY,
            clamp_policy: ClampPolicy::Clamp,
            preset: None,
            parameters: None,
            dopamine: DopamineParams::default(),
            dopamine_volatility: 0.0,
            medications: Vec::new(),
            extra_medications: Vec::new(),
            task: TaskProtocol::default(),
            engines: EngineConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn for_preset(preset: Preset) -> Self {
        Self {
            preset: Some(preset),
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn resolved_parameters(&self) -> DisorderParameters {
        match (self.parameters, self.preset) {
            (Some(parameters), _) => parameters,
            (None, Some(preset)) => preset.parameters(),
            (None, None) => DisorderParameters::default(),
        }
    }

    /// Range checks that do not need the medication table; dose checks run
    /// when the simulator is built.
    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(DynamicsError::InvalidTimeStep(self.dt).into());
        }
        if self.history_capacity == 0 || self.history_capacity > MAX_HISTORY_CAPACITY {
            return Err(SimError::InvalidConfig(format!(
                "history_capacity must be in 1..={MAX_HISTORY_CAPACITY}, got {}",
                self.history_capacity
            )));
        }
        self.resolved_parameters().validate()?;
        self.dopamine.validate()?;
        ensure_unit("dopamine_volatility", self.dopamine_volatility)?;
        for dose in &self.medications {
            ensure_input("dose_time", dose.time_s, true)?;
        }
        for profile in &self.extra_medications {
            profile.validate()?;
        }
        self.task.validate()?;
        self.engines.hyperactivity.validate()?;
        self.engines.motivation.validate()?;
        self.engines.baseline.validate()?;
        Ok(())
    }
}
