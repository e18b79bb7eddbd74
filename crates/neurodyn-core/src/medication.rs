use crate::error::{
    ensure_input, ensure_positive, ensure_unit, DynamicsError, DynamicsResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Concentration decay after a single administration. Rates are per hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum PkModel {
    OneCompartment {
        ke: f64,
    },
    /// Bi-exponential: a fast distribution phase `alpha` carrying
    /// `fast_fraction` of the initial concentration, then elimination `beta`.
    TwoCompartment {
        alpha: f64,
        beta: f64,
        fast_fraction: f64,
    },
}

impl PkModel {
    /// Fraction of the initial concentration left after `hours`.
    pub fn remaining(&self, hours: f64) -> f64 {
        match *self {
            PkModel::OneCompartment { ke } => (-ke * hours).exp(),
            PkModel::TwoCompartment {
                alpha,
                beta,
                fast_fraction,
            } => fast_fraction * (-alpha * hours).exp() + (1.0 - fast_fraction) * (-beta * hours).exp(),
        }
    }

    /// Terminal elimination rate.
    pub fn elimination_rate(&self) -> f64 {
        match *self {
            PkModel::OneCompartment { ke } => ke,
            PkModel::TwoCompartment { beta, .. } => beta,
        }
    }

    fn validate(&self) -> DynamicsResult<()> {
        match *self {
            PkModel::OneCompartment { ke } => {
                ensure_positive("ke", ke)?;
            }
            PkModel::TwoCompartment {
                alpha,
                beta,
                fast_fraction,
            } => {
                ensure_positive("alpha", alpha)?;
                ensure_positive("beta", beta)?;
                ensure_unit("fast_fraction", fast_fraction)?;
            }
        }
        Ok(())
    }
}

/// Emax saturation curve for one downstream effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmaxCurve {
    pub emax: f64,
    pub ec50: f64,
}

impl EmaxCurve {
    /// Hill equation `Emax * C^n / (EC50^n + C^n)`; zero for non-positive concentration.
    pub fn effect(&self, concentration: f64, hill: f64) -> f64 {
        if concentration <= 0.0 {
            return 0.0;
        }
        let c = concentration.powf(hill);
        let denominator = self.ec50.powf(hill) + c;
        if denominator <= 0.0 {
            return 0.0;
        }
        (self.emax * c / denominator).clamp(0.0, self.emax)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationProfile {
    pub id: String,
    pub pk: PkModel,
    /// Volume of distribution.
    pub vd: f64,
    pub dopamine: EmaxCurve,
    pub attention: EmaxCurve,
    pub hill: f64,
    #[serde(default)]
    pub max_dose: Option<f64>,
}

impl MedicationProfile {
    pub fn one_compartment(
        id: &str,
        ke: f64,
        vd: f64,
        dopamine: EmaxCurve,
        attention: EmaxCurve,
        hill: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            pk: PkModel::OneCompartment { ke },
            vd,
            dopamine,
            attention,
            hill,
            max_dose: None,
        }
    }

    pub fn with_max_dose(mut self, max_dose: f64) -> Self {
        self.max_dose = Some(max_dose);
        self
    }

    pub fn validate(&self) -> DynamicsResult<()> {
        self.pk.validate()?;
        ensure_positive("vd", self.vd)?;
        ensure_unit("emax_dopamine", self.dopamine.emax)?;
        ensure_positive("ec50_dopamine", self.dopamine.ec50)?;
        ensure_unit("emax_attention", self.attention.emax)?;
        ensure_positive("ec50_attention", self.attention.ec50)?;
        ensure_positive("hill_coefficient", self.hill)?;
        if let Some(max) = self.max_dose {
            ensure_positive("max_dose", max)?;
        }
        Ok(())
    }

    pub fn half_life(&self) -> f64 {
        std::f64::consts::LN_2 / self.pk.elimination_rate()
    }
}

/// Medication id -> profile lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MedicationTable {
    profiles: BTreeMap<String, MedicationProfile>,
}

impl MedicationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stimulant and non-stimulant profiles commonly used in ADHD treatment.
    pub fn standard() -> Self {
        let profiles = [
            MedicationProfile::one_compartment(
                "methylphenidate",
                0.23,
                2.1,
                EmaxCurve { emax: 0.4, ec50: 10.0 },
                EmaxCurve { emax: 0.5, ec50: 12.0 },
                1.2,
            )
            .with_max_dose(60.0),
            MedicationProfile::one_compartment(
                "atomoxetine",
                0.14,
                0.85,
                EmaxCurve { emax: 0.25, ec50: 15.0 },
                EmaxCurve { emax: 0.35, ec50: 18.0 },
                1.0,
            )
            .with_max_dose(100.0),
            MedicationProfile::one_compartment(
                "amphetamine",
                0.35,
                3.5,
                EmaxCurve { emax: 0.5, ec50: 8.0 },
                EmaxCurve { emax: 0.6, ec50: 10.0 },
                1.5,
            )
            .with_max_dose(40.0),
        ];
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
        }
    }

    /// Add or replace a profile after validating it.
    pub fn insert(&mut self, profile: MedicationProfile) -> DynamicsResult<()> {
        profile.validate()?;
        self.profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    pub fn get(&self, id: &str) -> DynamicsResult<&MedicationProfile> {
        self.profiles
            .get(id)
            .ok_or_else(|| DynamicsError::UnknownMedication(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationAdministration {
    pub medication_id: String,
    pub dose: f64,
    /// Hours.
    pub time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PharmacodynamicEffect {
    pub dopamine_boost: f64,
    pub attention_boost: f64,
    pub concentration: f64,
}

/// Closed-form PK/PD over the recorded administration history.
///
/// All times are in hours. Queries are pure functions of the history, so
/// repeated calls at the same time return the same value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MedicationSimulator {
    table: MedicationTable,
    administrations: Vec<MedicationAdministration>,
}

impl MedicationSimulator {
    pub fn new(table: MedicationTable) -> Self {
        Self {
            table,
            administrations: Vec::new(),
        }
    }

    pub fn table(&self) -> &MedicationTable {
        &self.table
    }

    pub fn administer(
        &mut self,
        medication_id: &str,
        dose: f64,
        time: f64,
    ) -> DynamicsResult<&MedicationAdministration> {
        let profile = self.table.get(medication_id)?;
        if !(dose.is_finite() && dose > 0.0) {
            return Err(DynamicsError::InvalidDose(dose));
        }
        if let Some(max) = profile.max_dose {
            if dose > max {
                return Err(DynamicsError::DoseAboveMaximum {
                    medication: medication_id.to_string(),
                    dose,
                    max,
                });
            }
        }
        let time = ensure_input("administration_time", time, false)?;
        debug!(medication = medication_id, dose, time, "medication administered");
        self.administrations.push(MedicationAdministration {
            medication_id: medication_id.to_string(),
            dose,
            time,
        });
        let last = self.administrations.len() - 1;
        Ok(&self.administrations[last])
    }

    pub fn administrations(&self) -> &[MedicationAdministration] {
        &self.administrations
    }

    /// Medications with at least one recorded administration.
    pub fn active_medications(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .administrations
            .iter()
            .map(|a| a.medication_id.as_str())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn concentration_at(&self, medication_id: &str, query_time: f64) -> DynamicsResult<f64> {
        let profile = self.table.get(medication_id)?;
        let query_time = ensure_input("query_time", query_time, false)?;
        Ok(self
            .administrations
            .iter()
            .filter(|a| a.medication_id == medication_id && query_time >= a.time)
            .map(|a| (a.dose / profile.vd) * profile.pk.remaining(query_time - a.time))
            .sum())
    }

    pub fn pharmacodynamic_effect(
        &self,
        medication_id: &str,
        query_time: f64,
    ) -> DynamicsResult<PharmacodynamicEffect> {
        let profile = self.table.get(medication_id)?;
        let concentration = self.concentration_at(medication_id, query_time)?;
        Ok(PharmacodynamicEffect {
            dopamine_boost: profile.dopamine.effect(concentration, profile.hill),
            attention_boost: profile.attention.effect(concentration, profile.hill),
            concentration,
        })
    }

    /// Boosts summed over every active medication and capped at 1.
    /// `concentration` is the plain sum of per-medication concentrations.
    pub fn combined_effect(&self, query_time: f64) -> DynamicsResult<PharmacodynamicEffect> {
        let mut total = PharmacodynamicEffect::default();
        for id in self.active_medications() {
            let effect = self.pharmacodynamic_effect(id, query_time)?;
            total.dopamine_boost += effect.dopamine_boost;
            total.attention_boost += effect.attention_boost;
            total.concentration += effect.concentration;
        }
        total.dopamine_boost = total.dopamine_boost.min(1.0);
        total.attention_boost = total.attention_boost.min(1.0);
        Ok(total)
    }

    /// Trapezoid area under the concentration curve over `[t0, t1]`.
    pub fn auc(&self, medication_id: &str, t0: f64, t1: f64, samples: usize) -> DynamicsResult<f64> {
        let t0 = ensure_input("auc_start", t0, false)?;
        let t1 = ensure_input("auc_end", t1, false)?;
        if t1 <= t0 {
            self.table.get(medication_id)?;
            return Ok(0.0);
        }
        let intervals = samples.max(1);
        let h = (t1 - t0) / intervals as f64;
        let mut area = 0.0;
        let mut previous = self.concentration_at(medication_id, t0)?;
        for i in 1..=intervals {
            let current = self.concentration_at(medication_id, t0 + h * i as f64)?;
            area += 0.5 * (previous + current) * h;
            previous = current;
        }
        Ok(area)
    }

    pub fn half_life(&self, medication_id: &str) -> DynamicsResult<f64> {
        Ok(self.table.get(medication_id)?.half_life())
    }

    /// Drop every administration of one medication; returns how many were removed.
    pub fn stop(&mut self, medication_id: &str) -> DynamicsResult<usize> {
        self.table.get(medication_id)?;
        let before = self.administrations.len();
        self.administrations.retain(|a| a.medication_id != medication_id);
        let removed = before - self.administrations.len();
        debug!(medication = medication_id, removed, "medication stopped");
        Ok(removed)
    }
}
