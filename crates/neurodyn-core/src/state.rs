use crate::error::{DynamicsError, DynamicsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Fixed vocabulary of continuous state variables.
///
/// The first block is internal state written by loops; the trailing block
/// (`TaskDemand` onwards) carries external inputs written by the task driver
/// at the start of each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    Attention,
    Arousal,
    Energy,
    DopamineTonic,
    DopaminePhasic,
    DopamineLevel,
    PfcInhibition,
    DiscountRate,
    ThalamusGate,
    BgDrive,
    NoiseLevel,
    NegativeBias,
    Rumination,
    ControlStrength,
    Hyperactivity,
    Motivation,
    TaskDemand,
    Distraction,
    Reward,
    Valence,
    Threat,
    AttentionBoost,
}

/// Upper bound of the summed distraction input (intensity x relevance).
pub const MAX_DISTRACTION: f64 = 5.0;


impl StateField {
    pub const COUNT: usize = 22;

    pub const ALL: [StateField; StateField::COUNT] = [
        StateField::Attention,
        StateField::Arousal,
        StateField::Energy,
        StateField::DopamineTonic,
        StateField::DopaminePhasic,
        StateField::DopamineLevel,
        StateField::PfcInhibition,
        StateField::DiscountRate,
        StateField::ThalamusGate,
        StateField::BgDrive,
        StateField::NoiseLevel,
        StateField::NegativeBias,
        StateField::Rumination,
        StateField::ControlStrength,
        StateField::Hyperactivity,
        StateField::Motivation,
        StateField::TaskDemand,
        StateField::Distraction,
        StateField::Reward,
        StateField::Valence,
        StateField::Threat,
        StateField::AttentionBoost,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            StateField::Attention => "attention",
            StateField::Arousal => "arousal",
            StateField::Energy => "energy",
            StateField::DopamineTonic => "dopamine_tonic",
            StateField::DopaminePhasic => "dopamine_phasic",
            StateField::DopamineLevel => "dopamine_level",
            StateField::PfcInhibition => "pfc_inhibition",
            StateField::DiscountRate => "discount_rate",
            StateField::ThalamusGate => "thalamus_gate",
            StateField::BgDrive => "bg_drive",
            StateField::NoiseLevel => "noise_level",
            StateField::NegativeBias => "negative_bias",
            StateField::Rumination => "rumination",
            StateField::ControlStrength => "control_strength",
            StateField::Hyperactivity => "hyperactivity",
            StateField::Motivation => "motivation",
            StateField::TaskDemand => "task_demand",
            StateField::Distraction => "distraction",
            StateField::Reward => "reward",
            StateField::Valence => "valence",
            StateField::Threat => "threat",
            StateField::AttentionBoost => "attention_boost",
        }
    }

    /// Documented clamping range.
    pub fn range(self) -> (f64, f64) {
        match self {
            StateField::Energy => (0.0, 100.0),
            StateField::DopaminePhasic | StateField::Valence => (-1.0, 1.0),
            StateField::Distraction => (0.0, MAX_DISTRACTION),
            _ => (0.0, 1.0),
        }
    }

    pub fn default_value(self) -> f64 {
        match self {
            StateField::Energy => 100.0,
            StateField::DopamineTonic | StateField::DopamineLevel => 0.6,
            StateField::DiscountRate => 0.3,
            StateField::NoiseLevel => 0.1,
            StateField::ControlStrength | StateField::Motivation => 1.0,
            StateField::Attention
            | StateField::Arousal
            | StateField::PfcInhibition
            | StateField::ThalamusGate
            | StateField::BgDrive
            | StateField::TaskDemand => 0.5,
            StateField::DopaminePhasic
            | StateField::NegativeBias
            | StateField::Rumination
            | StateField::Hyperactivity
            | StateField::Distraction
            | StateField::Reward
            | StateField::Valence
            | StateField::Threat
            | StateField::AttentionBoost => 0.0,
        }
    }

    pub fn clamp(self, value: f64) -> f64 {
        let (min, max) = self.range();
        value.clamp(min, max)
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StateField {
    type Err = DynamicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateField::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| DynamicsError::UnknownField(s.to_string()))
    }
}

/// How `set` treats non-finite writes. Finite out-of-range values are always clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampPolicy {
    /// `+inf` goes to the upper bound, `-inf` and NaN to the lower bound.
    /// Every coercion is counted and surfaces in the loop's stability check.
    #[default]
    Clamp,
    /// Reject non-finite values with `DynamicsError::NonFiniteValue`.
    Strict,
}

/// Named-field continuous state container owned by one `ClosedLoopDynamics`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    values: [f64; StateField::COUNT],
    policy: ClampPolicy,
    coerced: [u32; StateField::COUNT],
}

impl Default for StateVector {
    fn default() -> Self {
        Self::new(ClampPolicy::Clamp)
    }
}

impl StateVector {
    pub fn new(policy: ClampPolicy) -> Self {
        let mut values = [0.0; StateField::COUNT];
        for field in StateField::ALL {
            values[field.index()] = field.default_value();
        }
        Self {
            values,
            policy,
            coerced: [0; StateField::COUNT],
        }
    }

    pub fn policy(&self) -> ClampPolicy {
        self.policy
    }

    pub fn value(&self, field: StateField) -> f64 {
        self.values[field.index()]
    }

    pub fn get(&self, name: &str) -> DynamicsResult<f64> {
        let field: StateField = name.parse()?;
        Ok(self.value(field))
    }

    /// Store `value` clamped to the field range and return what was stored.
    pub fn set_field(&mut self, field: StateField, value: f64) -> DynamicsResult<f64> {
        let (min, max) = field.range();
        let stored = if value.is_finite() {
            value.clamp(min, max)
        } else {
            match self.policy {
                ClampPolicy::Strict => {
                    return Err(DynamicsError::NonFiniteValue {
                        field: field.name(),
                        value,
                    })
                }
                ClampPolicy::Clamp => {
                    self.coerced[field.index()] += 1;
                    if value == f64::INFINITY {
                        max
                    } else {
                        min
                    }
                }
            }
        };
        self.values[field.index()] = stored;
        Ok(stored)
    }

    pub fn set(&mut self, name: &str, value: f64) -> DynamicsResult<f64> {
        let field: StateField = name.parse()?;
        self.set_field(field, value)
    }

    pub fn update<F>(&mut self, field: StateField, f: F) -> DynamicsResult<f64>
    where
        F: FnOnce(f64) -> f64,
    {
        let next = f(self.value(field));
        self.set_field(field, next)
    }

    /// First-order relaxation toward `target` with time constant `1 / rate`.
    pub fn relax_toward(
        &mut self,
        field: StateField,
        target: f64,
        rate: f64,
        dt: f64,
    ) -> DynamicsResult<f64> {
        let alpha = 1.0 - (-rate * dt).exp();
        self.update(field, |v| v + (target - v) * alpha)
    }

    /// Non-finite writes coerced under `ClampPolicy::Clamp` since the last drain.
    pub fn non_finite_writes(&self) -> u64 {
        self.coerced.iter().map(|&n| u64::from(n)).sum()
    }

    /// Per-field coercion counts, reset on read.
    pub(crate) fn drain_coerced(&mut self) -> [u32; StateField::COUNT] {
        std::mem::replace(&mut self.coerced, [0; StateField::COUNT])
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            values: self.values,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateField, f64)> + '_ {
        StateField::ALL.iter().map(move |f| (*f, self.value(*f)))
    }
}

/// Immutable copy of a `StateVector` for history recording.
///
/// Serializes as a `name -> value` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<String, f64>", try_from = "BTreeMap<String, f64>")]
pub struct StateSnapshot {
    values: [f64; StateField::COUNT],
}

impl StateSnapshot {
    pub fn value(&self, field: StateField) -> f64 {
        self.values[field.index()]
    }

    pub fn get(&self, name: &str) -> DynamicsResult<f64> {
        let field: StateField = name.parse()?;
        Ok(self.value(field))
    }

    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        StateField::ALL
            .iter()
            .map(|f| (f.name(), self.value(*f)))
            .collect()
    }

    /// Raw IEEE-754 bit patterns, field order.
    pub fn to_bits(&self) -> [u64; StateField::COUNT] {
        self.values.map(f64::to_bits)
    }

    pub fn bit_identical(&self, other: &StateSnapshot) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl From<StateSnapshot> for BTreeMap<String, f64> {
    fn from(snapshot: StateSnapshot) -> Self {
        snapshot
            .to_map()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

impl TryFrom<BTreeMap<String, f64>> for StateSnapshot {
    type Error = DynamicsError;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut state = StateVector::new(ClampPolicy::Strict);
        for (name, value) in map {
            state.set(&name, value)?;
        }
        Ok(state.snapshot())
    }
}
