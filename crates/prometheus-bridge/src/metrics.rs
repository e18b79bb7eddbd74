use disorder_sim::{AssessmentResult, SweepReport};
use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Gauges for one labelled configuration (usually a preset name).
pub struct NeurodynMetrics {
    pub score: GaugeVec,
    pub run_stable: GaugeVec,
    pub unstable_steps: GaugeVec,
    pub sweep_score_mean: GaugeVec,
    pub sweep_score_std: GaugeVec,
    pub sweep_unstable_runs: GaugeVec,
    pub runs_total: IntCounterVec,
}

fn gauge_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> prometheus::Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

impl NeurodynMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let score = gauge_vec(
            registry,
            "neurodyn_score",
            "Final score of the latest run",
            &["config", "score"],
        )?;
        let run_stable = gauge_vec(
            registry,
            "neurodyn_run_stable",
            "1 when the latest run finished without instability",
            &["config"],
        )?;
        let unstable_steps = gauge_vec(
            registry,
            "neurodyn_unstable_steps",
            "Steps flagged unstable in the latest run",
            &["config"],
        )?;
        let sweep_score_mean = gauge_vec(
            registry,
            "neurodyn_sweep_score_mean",
            "Mean of a score over the stable runs of a seed sweep",
            &["config", "score"],
        )?;
        let sweep_score_std = gauge_vec(
            registry,
            "neurodyn_sweep_score_std",
            "Standard deviation of a score over the stable runs of a seed sweep",
            &["config", "score"],
        )?;
        let sweep_unstable_runs = gauge_vec(
            registry,
            "neurodyn_sweep_unstable_runs",
            "Seeds whose run became unstable",
            &["config"],
        )?;

        let runs_total = IntCounterVec::new(
            Opts::new("neurodyn_runs_total", "Completed simulation runs"),
            &["config", "kind"],
        )?;
        registry.register(Box::new(runs_total.clone()))?;

        Ok(Self {
            score,
            run_stable,
            unstable_steps,
            sweep_score_mean,
            sweep_score_std,
            sweep_unstable_runs,
            runs_total,
        })
    }

    pub fn observe_assessment(&self, config: &str, assessment: &AssessmentResult) {
        for (name, value) in assessment.scores() {
            self.score.with_label_values(&[config, &name]).set(value);
        }
        let stable = if assessment.stability.stable { 1.0 } else { 0.0 };
        self.run_stable.with_label_values(&[config]).set(stable);
        self.unstable_steps
            .with_label_values(&[config])
            .set(assessment.stability.unstable_steps as f64);
        self.runs_total.with_label_values(&[config, "single"]).inc();
    }

    pub fn observe_sweep(&self, config: &str, report: &SweepReport) {
        for (name, distribution) in &report.scores {
            self.sweep_score_mean
                .with_label_values(&[config, name])
                .set(distribution.mean);
            self.sweep_score_std
                .with_label_values(&[config, name])
                .set(distribution.std);
        }
        self.sweep_unstable_runs
            .with_label_values(&[config])
            .set(report.unstable_seeds.len() as f64);
        self.runs_total
            .with_label_values(&[config, "sweep"])
            .inc_by(report.runs as u64);
    }
}

/// Text exposition format of everything in `registry`.
pub fn render(registry: &Registry) -> prometheus::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
