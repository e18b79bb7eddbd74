use crate::neuromodulation::MedicationSummary;
use disorder_engines::{
    AttentionResult, CognitiveControlResult, DisorderParameters, EnergyResult, HyperactivityResult,
    HyperarousalResult, ImpulseResult, MotivationResult, NegativeBiasResult,
};
use neurodyn_core::{DopamineSummary, InstabilityReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilitySummary {
    pub stable: bool,
    pub steps: u64,
    pub unstable_steps: u64,
    pub first_instability: Option<InstabilityReport>,
}

/// Per-engine results of one run plus the flattened score map consumers read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub parameters: DisorderParameters,
    pub attention: AttentionResult,
    /// Relative drop of mean attention from the first to the second half of
    /// the recorded history.
    pub attention_decline: f64,
    pub impulse: ImpulseResult,
    pub hyperactivity: HyperactivityResult,
    pub negative_bias: NegativeBiasResult,
    pub cognitive_control: CognitiveControlResult,
    pub energy: EnergyResult,
    pub hyperarousal: HyperarousalResult,
    pub motivation: MotivationResult,
    pub dopamine: DopamineSummary,
    pub medication: MedicationSummary,
    pub stability: StabilitySummary,
}

impl AssessmentResult {
    /// Named final scores, sorted by name.
    pub fn scores(&self) -> BTreeMap<String, f64> {
        let entries = [
            ("attention_mean", self.attention.mean),
            ("attention_deficit", 1.0 - self.attention.mean),
            ("attention_decline", self.attention_decline),
            ("attention_variance", self.attention.variance),
            ("sustained_attention_time", self.attention.sustained_attention_time),
            ("impulsivity_rate", self.impulse.impulsivity_rate),
            ("discount_rate", self.impulse.mean_discount_rate),
            ("hyperactivity", self.hyperactivity.mean_score),
            ("energy_variance", self.hyperactivity.energy_variance),
            ("negative_bias", self.negative_bias.bias),
            ("rumination", self.negative_bias.rumination),
            ("negative_loop_strength", self.negative_bias.loop_strength),
            ("control_score", self.cognitive_control.control_score),
            ("control_success_rate", self.cognitive_control.success_rate),
            ("energy_final", self.energy.final_energy),
            ("energy_mean", self.energy.mean_energy),
            ("low_energy_fraction", self.energy.low_energy_fraction),
            ("sleep_quality", self.energy.sleep_quality.min(self.hyperarousal.sleep_quality)),
            ("arousal_mean", self.hyperarousal.mean_arousal),
            ("hyperarousal_loop_strength", self.hyperarousal.loop_strength),
            ("motivation_score", self.motivation.score),
            ("motivation_mean", self.motivation.mean_level),
            ("anhedonia", self.motivation.anhedonia),
            ("dopamine_mean", self.dopamine.mean_level),
            ("dopamine_variance", self.dopamine.level_variance),
            ("medication_peak_concentration", self.medication.peak_concentration),
        ];
        entries
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

/// `(first_half_mean - second_half_mean) / first_half_mean`, zero when
/// there are fewer than two samples or the first half is silent.
pub fn decline_rate(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let (first, second) = series.split_at(series.len() / 2);
    let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    let head = mean(first);
    if head > 0.0 {
        (head - mean(second)) / head
    } else {
        0.0
    }
}
