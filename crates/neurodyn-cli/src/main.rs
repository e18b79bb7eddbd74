//! neurodyn: seeded disorder-dynamics runs, seed sweeps and metrics export.
//! - `run` prints one run's scores, stability and assessment as JSON
//! - `sweep` aggregates scores across consecutive seeds
//! - `metrics` prints the same results in Prometheus text format

mod metadata;

#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use disorder_engines::Preset;
use disorder_sim::{DisorderSimulator, DoseEvent, SeedSweep, SimulationConfig};
use prometheus::Registry;
use prometheus_bridge::{render, NeurodynMetrics};
use serde_json::{json, Value};
use tracing::info;

use crate::metadata::ExperimentMetadata;

const TOOL: &str = "neurodyn";

fn config_args() -> Vec<Arg> {
    vec![
        Arg::new("config")
            .long("config")
            .value_name("PATH")
            .help("Simulation config JSON; omitted fields take their defaults"),
        Arg::new("preset")
            .long("preset")
            .value_name("NAME")
            .help("healthy, adhd, depression, ptsd or anxiety; replaces config parameters"),
        Arg::new("seed")
            .long("seed")
            .value_name("N")
            .value_parser(value_parser!(u64))
            .help("Override the config seed"),
        Arg::new("steps")
            .long("steps")
            .value_name("N")
            .value_parser(value_parser!(u64))
            .help("Override the number of steps"),
        Arg::new("dose")
            .long("dose")
            .value_name("MED:DOSE[@SECONDS]")
            .action(ArgAction::Append)
            .help("Add a scheduled dose, e.g. methylphenidate:20@0"),
    ]
}

fn seed_args() -> Vec<Arg> {
    vec![
        Arg::new("seeds")
            .long("seeds")
            .value_name("COUNT")
            .value_parser(value_parser!(u64))
            .default_value("10")
            .help("Number of consecutive seeds"),
        Arg::new("start-seed")
            .long("start-seed")
            .value_name("N")
            .value_parser(value_parser!(u64))
            .help("First seed of the sweep (defaults to the config seed)"),
    ]
}

fn output_arg() -> Arg {
    Arg::new("output")
        .long("output")
        .value_name("PATH")
        .help("Write the JSON result here instead of stdout")
}

pub(crate) fn cli() -> Command {
    Command::new(TOOL)
        .about("Closed-loop psychiatric-disorder dynamics simulator")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .value_parser(["text", "json"])
                .default_value("text")
                .help("Log line format on stderr"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log at info level unless RUST_LOG is set"),
        )
        .subcommand(
            Command::new("run")
                .about("Run one seeded simulation")
                .args(config_args())
                .arg(
                    Arg::new("snapshots")
                        .long("snapshots")
                        .action(ArgAction::SetTrue)
                        .help("Include the recorded state snapshots"),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("sweep")
                .about("Run one simulation per seed and aggregate the scores")
                .args(config_args())
                .args(seed_args())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("metrics")
                .about("Print run or sweep results in Prometheus text format")
                .args(config_args())
                .args(seed_args()),
        )
        .subcommand(
            Command::new("config")
                .about("Print the resolved configuration as JSON")
                .args(config_args()),
        )
        .subcommand(Command::new("presets").about("List the built-in parameter presets"))
}

fn init_tracing(json: bool, verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default = if verbose { "info" } else { "warn" };
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()),
    );
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .init();
    }
}

/// `MED:DOSE` or `MED:DOSE@SECONDS`.
pub(crate) fn parse_dose(spec: &str) -> Result<DoseEvent> {
    let (medication, rest) = spec
        .split_once(':')
        .ok_or_else(|| anyhow!("dose {spec:?} must look like MED:DOSE[@SECONDS]"))?;
    let (dose, time) = match rest.split_once('@') {
        Some((dose, time)) => (dose, Some(time)),
        None => (rest, None),
    };
    let dose: f64 = dose
        .trim()
        .parse()
        .with_context(|| format!("dose amount in {spec:?}"))?;
    let time_s: f64 = match time {
        Some(t) => t.trim().parse().with_context(|| format!("dose time in {spec:?}"))?,
        None => 0.0,
    };
    Ok(DoseEvent {
        medication: medication.trim().to_string(),
        dose,
        time_s,
    })
}

/// Config file (or defaults), then command-line overrides, then validation.
pub(crate) fn load_config(matches: &ArgMatches) -> Result<SimulationConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => SimulationConfig::from_path(path)
            .with_context(|| format!("loading config {path}"))?,
        None => SimulationConfig::default(),
    };
    if let Some(name) = matches.get_one::<String>("preset") {
        let preset: Preset = name.parse()?;
        config.preset = Some(preset);
        config.parameters = None;
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.seed = *seed;
    }
    if let Some(steps) = matches.get_one::<u64>("steps") {
        config.steps = *steps;
    }
    if let Some(doses) = matches.get_many::<String>("dose") {
        for spec in doses {
            config.medications.push(parse_dose(spec)?);
        }
    }
    config.validate()?;
    Ok(config)
}

fn config_label(config: &SimulationConfig) -> String {
    match (config.parameters, config.preset) {
        (None, Some(preset)) => preset.name().to_string(),
        (None, None) => Preset::Healthy.name().to_string(),
        (Some(_), _) => "custom".to_string(),
    }
}

fn sweep_seeds(matches: &ArgMatches, config: &SimulationConfig) -> (u64, u64) {
    let count = matches.get_one::<u64>("seeds").copied().unwrap_or(10);
    let start = matches
        .get_one::<u64>("start-seed")
        .copied()
        .unwrap_or(config.seed);
    (start, count)
}

fn emit(value: &Value, output: Option<&String>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(Path::new(path), text).with_context(|| format!("writing {path}"))?;
            println!(
                "{}",
                json!({"tool": TOOL, "status": "ok", "output": path})
            );
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn cmd_run(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let metadata = ExperimentMetadata::new(&config, vec![config.seed])?;
    let run = DisorderSimulator::new(config.clone())?.run()?;
    info!(id = %metadata.id, config = %config_label(&config), "run finished");

    let mut body = json!({
        "tool": TOOL,
        "status": if run.stability.stable { "ok" } else { "unstable" },
        "command": "run",
        "metadata": metadata,
        "scores": run.final_scores,
        "stability": run.stability,
        "assessment": run.assessment,
    });
    if matches.get_flag("snapshots") {
        body["snapshots"] = serde_json::to_value(&run.snapshots)?;
    }
    emit(&body, matches.get_one::<String>("output"))
}

fn cmd_sweep(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let (start, count) = sweep_seeds(matches, &config);
    let sweep = SeedSweep::consecutive(config.clone(), start, count);
    let metadata = ExperimentMetadata::new(&config, sweep.seeds().to_vec())?;
    let report = sweep.run()?;

    let body = json!({
        "tool": TOOL,
        "status": if report.unstable_seeds.is_empty() { "ok" } else { "unstable" },
        "command": "sweep",
        "metadata": metadata,
        "runs": report.runs,
        "stable_runs": report.stable_runs,
        "unstable_seeds": report.unstable_seeds,
        "zero_variance_scores": report.zero_variance_scores,
        "dropped_values": report.dropped_values,
        "scores": report.scores,
    });
    emit(&body, matches.get_one::<String>("output"))
}

fn cmd_metrics(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let label = config_label(&config);
    let registry = Registry::new();
    let metrics = NeurodynMetrics::new(&registry)?;
    let (start, count) = sweep_seeds(matches, &config);
    if count > 1 {
        let report = SeedSweep::consecutive(config, start, count).run()?;
        metrics.observe_sweep(&label, &report);
    } else {
        let run = DisorderSimulator::new(SimulationConfig { seed: start, ..config })?.run()?;
        metrics.observe_assessment(&label, &run.assessment);
    }
    print!("{}", render(&registry)?);
    Ok(())
}

fn cmd_config(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

fn cmd_presets() -> Result<()> {
    let presets: Vec<Value> = Preset::ALL
        .iter()
        .map(|p| json!({"name": p.name(), "parameters": p.parameters()}))
        .collect();
    emit(
        &json!({"tool": TOOL, "status": "ok", "command": "presets", "presets": presets}),
        None,
    )
}

fn dispatch(matches: &ArgMatches) -> Result<()> {
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("a subcommand is required"))?;
    let json_logs = sub.get_one::<String>("log-format").map(String::as_str) == Some("json");
    init_tracing(json_logs, sub.get_flag("verbose"));
    match name {
        "run" => cmd_run(sub),
        "sweep" => cmd_sweep(sub),
        "metrics" => cmd_metrics(sub),
        "config" => cmd_config(sub),
        "presets" => cmd_presets(),
        other => Err(anyhow!("unknown subcommand {other}")),
    }
}

fn main() {
    let matches = cli().get_matches();
    if let Err(err) = dispatch(&matches) {
        eprintln!("{TOOL}: {err:#}");
        std::process::exit(1);
    }
}
