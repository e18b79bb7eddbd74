use neurodyn_core::error::{ensure_unit, DynamicsError, DynamicsResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity knobs fixed for one run. All values live in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisorderParameters {
    pub adhd_deficit: f64,
    pub negative_bias_strength: f64,
    pub control_impairment: f64,
    pub energy_depletion_rate: f64,
    pub recovery_inhibition: f64,
    pub hyperarousal_level: f64,
    pub motivation_deficit: f64,
}

impl DisorderParameters {
    pub fn validate(&self) -> DynamicsResult<()> {
        ensure_unit("adhd_deficit", self.adhd_deficit)?;
        ensure_unit("negative_bias_strength", self.negative_bias_strength)?;
        ensure_unit("control_impairment", self.control_impairment)?;
        ensure_unit("energy_depletion_rate", self.energy_depletion_rate)?;
        ensure_unit("recovery_inhibition", self.recovery_inhibition)?;
        ensure_unit("hyperarousal_level", self.hyperarousal_level)?;
        ensure_unit("motivation_deficit", self.motivation_deficit)?;
        Ok(())
    }

    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Healthy => Self::default(),
            Preset::Adhd => Self {
                adhd_deficit: 0.3,
                control_impairment: 0.3,
                ..Self::default()
            },
            Preset::Depression => Self {
                negative_bias_strength: 0.6,
                control_impairment: 0.5,
                energy_depletion_rate: 0.5,
                recovery_inhibition: 0.5,
                motivation_deficit: 0.6,
                ..Self::default()
            },
            Preset::Ptsd => Self {
                negative_bias_strength: 0.4,
                control_impairment: 0.6,
                hyperarousal_level: 0.7,
                ..Self::default()
            },
            Preset::Anxiety => Self {
                negative_bias_strength: 0.5,
                control_impairment: 0.3,
                hyperarousal_level: 0.6,
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Healthy,
    Adhd,
    Depression,
    Ptsd,
    Anxiety,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Healthy,
        Preset::Adhd,
        Preset::Depression,
        Preset::Ptsd,
        Preset::Anxiety,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Healthy => "healthy",
            Preset::Adhd => "adhd",
            Preset::Depression => "depression",
            Preset::Ptsd => "ptsd",
            Preset::Anxiety => "anxiety",
        }
    }

    pub fn parameters(self) -> DisorderParameters {
        DisorderParameters::preset(self)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = DynamicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Preset::ALL
            .iter()
            .copied()
            .find(|p| p.name() == lower)
            .ok_or_else(|| DynamicsError::UnknownField(format!("preset {s}")))
    }
}
