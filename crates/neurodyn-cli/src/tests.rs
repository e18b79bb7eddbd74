use crate::metadata::{config_hash, ExperimentMetadata};
use crate::{cli, load_config, parse_dose};
use disorder_engines::Preset;
use disorder_sim::SimulationConfig;

fn sub_matches(args: &[&str]) -> clap::ArgMatches {
    let matches = cli().try_get_matches_from(args).unwrap();
    let (_, sub) = matches.subcommand().unwrap();
    sub.clone()
}

#[test]
fn command_definition_is_consistent() {
    cli().debug_assert();
}

#[test]
fn dose_specs_parse() {
    let dose = parse_dose("methylphenidate:20@3600").unwrap();
    assert_eq!(dose.medication, "methylphenidate");
    assert_eq!(dose.dose, 20.0);
    assert_eq!(dose.time_s, 3600.0);
    assert_eq!(parse_dose("atomoxetine:40").unwrap().time_s, 0.0);
    assert!(parse_dose("atomoxetine").is_err());
    assert!(parse_dose("atomoxetine:lots").is_err());
}

#[test]
fn flags_override_defaults() {
    let matches = sub_matches(&[
        "neurodyn", "run", "--preset", "ptsd", "--seed", "9", "--steps", "25", "--dose",
        "amphetamine:10@60",
    ]);
    let config = load_config(&matches).unwrap();
    assert_eq!(config.seed, 9);
    assert_eq!(config.steps, 25);
    assert_eq!(config.resolved_parameters(), Preset::Ptsd.parameters());
    assert_eq!(config.medications.len(), 1);
    assert_eq!(config.medications[0].time_s, 60.0);
}

#[test]
fn unknown_preset_is_an_error() {
    let matches = sub_matches(&["neurodyn", "config", "--preset", "bipolar"]);
    assert!(load_config(&matches).is_err());
}

#[test]
fn global_flags_reach_subcommands() {
    let matches = sub_matches(&["neurodyn", "presets", "--log-format", "json", "-v"]);
    assert_eq!(matches.get_one::<String>("log-format").unwrap(), "json");
    assert!(matches.get_flag("verbose"));
}

#[test]
fn config_hash_tracks_content() {
    let a = SimulationConfig::default();
    let b = SimulationConfig { seed: 43, ..SimulationConfig::default() };
    assert_eq!(config_hash(&a).unwrap(), config_hash(&a.clone()).unwrap());
    assert_ne!(config_hash(&a).unwrap(), config_hash(&b).unwrap());
    assert_eq!(config_hash(&a).unwrap().len(), 64);

    let first = ExperimentMetadata::new(&a, vec![42]).unwrap();
    let second = ExperimentMetadata::new(&a, vec![42]).unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(first.config_hash, second.config_hash);
}
