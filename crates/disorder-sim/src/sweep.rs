use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::simulator::DisorderSimulator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Standard deviation below which a score is reported as not varying across seeds.
pub const ZERO_VARIANCE_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedOutcome {
    pub seed: u64,
    pub stable: bool,
    pub scores: BTreeMap<String, f64>,
}

/// Distribution of one score over the stable runs of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl ScoreDistribution {
    /// `None` for an empty sample.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
        } else {
            sorted[n / 2]
        };
        Some(Self {
            count: n,
            mean,
            std: variance.sqrt(),
            min: sorted[0],
            max: sorted[n - 1],
            median,
        })
    }

    pub fn is_zero_variance(&self) -> bool {
        self.std < ZERO_VARIANCE_EPSILON
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub runs: usize,
    pub stable_runs: usize,
    pub unstable_seeds: Vec<u64>,
    pub scores: BTreeMap<String, ScoreDistribution>,
    /// Scores whose spread across seeds is below [`ZERO_VARIANCE_EPSILON`].
    pub zero_variance_scores: Vec<String>,
    /// Non-finite score values left out of the distributions.
    pub dropped_values: usize,
    pub outcomes: Vec<SeedOutcome>,
}

/// Runs one independent simulator per seed and aggregates the final scores.
#[derive(Debug, Clone)]
pub struct SeedSweep {
    config: SimulationConfig,
    seeds: Vec<u64>,
}

impl SeedSweep {
    pub fn new(config: SimulationConfig, seeds: Vec<u64>) -> Self {
        Self { config, seeds }
    }

    /// `count` consecutive seeds starting at `start`.
    pub fn consecutive(config: SimulationConfig, start: u64, count: u64) -> Self {
        Self::new(config, (0..count).map(|i| start.wrapping_add(i)).collect())
    }

    pub fn seeds(&self) -> &[u64] {
        &self.seeds
    }

    pub fn run_seed(&self, seed: u64) -> SimResult<SeedOutcome> {
        let config = SimulationConfig {
            seed,
            ..self.config.clone()
        };
        let run = DisorderSimulator::new(config)?.run()?;
        debug!(seed, stable = run.stability.stable, "sweep seed finished");
        Ok(SeedOutcome {
            seed,
            stable: run.stability.stable,
            scores: run.final_scores,
        })
    }

    pub fn run(&self) -> SimResult<SweepReport> {
        if self.seeds.is_empty() {
            return Err(SimError::EmptySweep);
        }
        let outcomes = self
            .seeds
            .iter()
            .map(|&seed| self.run_seed(seed))
            .collect::<SimResult<Vec<_>>>()?;
        let report = aggregate(outcomes);
        if !report.unstable_seeds.is_empty() {
            warn!(unstable = ?report.unstable_seeds, "sweep contains unstable runs");
        }
        info!(
            runs = report.runs,
            stable_runs = report.stable_runs,
            zero_variance = report.zero_variance_scores.len(),
            "seed sweep complete"
        );
        Ok(report)
    }
}

/// Aggregate outcomes; unstable runs are listed but excluded from the distributions.
pub fn aggregate(outcomes: Vec<SeedOutcome>) -> SweepReport {
    let mut samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut dropped_values = 0;
    let mut unstable_seeds = Vec::new();
    for outcome in &outcomes {
        if !outcome.stable {
            unstable_seeds.push(outcome.seed);
            continue;
        }
        for (name, &value) in &outcome.scores {
            let entry = samples.entry(name.clone()).or_default();
            if value.is_finite() {
                entry.push(value);
            } else {
                dropped_values += 1;
            }
        }
    }

    let scores: BTreeMap<String, ScoreDistribution> = samples
        .into_iter()
        .filter_map(|(name, values)| ScoreDistribution::from_values(&values).map(|d| (name, d)))
        .collect();
    let zero_variance_scores = scores
        .iter()
        .filter(|(_, d)| d.count > 1 && d.is_zero_variance())
        .map(|(name, _)| name.clone())
        .collect();

    SweepReport {
        runs: outcomes.len(),
        stable_runs: outcomes.len() - unstable_seeds.len(),
        unstable_seeds,
        scores,
        zero_variance_scores,
        dropped_values,
        outcomes,
    }
}
