//! The simulator's configuration and cli parsing code using [serde] and [clap]. This contains all
//! of the configuration options, each of which is also exposed as a CLI option.
//!
//! [schemars] is used to get the option description (its doc comment) and default value so that
//! it can be shown in the CLI help text.
//!
//! This code should be careful about validating or interpreting values. It should be focused on
//! parsing and checking that the format is correct, and not validating the values. For example the
//! topology model is kept as a string here, and is only checked against the supported models by
//! [`SimConfig`](crate::core::sim_config::SimConfig).

use std::str::FromStr;

use clap::Parser;
use merge::Merge;
use once_cell::sync::Lazy;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

const START_HELP_TEXT: &str = "\
    Route packets over randomly generated, randomly mutating network topologies.";

const END_HELP_TEXT: &str = "\
    Options given on the command line override options in the configuration file. \
    Times and latencies are in abstract simulation time units.";

#[derive(Debug, Clone, Parser)]
#[clap(name = "packetsim", about = START_HELP_TEXT, after_help = END_HELP_TEXT)]
#[clap(version)]
#[clap(next_display_order = None)]
#[clap(hide_possible_values = true)]
pub struct CliOptions {
    /// Path to a configuration file. Use '-' to read from stdin
    pub config: Option<String>,

    /// Exit after printing the final configuration
    #[clap(long)]
    pub show_config: bool,

    #[clap(flatten)]
    pub general: GeneralOptions,

    #[clap(flatten)]
    pub topology: TopologyOptions,

    #[clap(flatten)]
    pub engine: EngineOptions,
}

/// Options contained in a configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileOptions {
    #[serde(default)]
    pub general: GeneralOptions,

    #[serde(default)]
    pub topology: TopologyOptions,

    #[serde(default)]
    pub engine: EngineOptions,
}

/// Configuration options after processing command-line and configuration file options.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigOptions {
    pub general: GeneralOptions,

    pub topology: TopologyOptions,

    pub engine: EngineOptions,
}

impl ConfigOptions {
    pub fn new(config_file: ConfigFileOptions, options: CliOptions) -> Self {
        // a section missing from the file deserializes to its defaults, but a section given in the
        // file may still leave some fields unset, so fill those in before applying the cli options
        let general = config_file.general.with_defaults(GeneralOptions::default());
        let topology = config_file
            .topology
            .with_defaults(TopologyOptions::default());
        let engine = config_file.engine.with_defaults(EngineOptions::default());

        // override config options with command line options
        Self {
            general: options.general.with_defaults(general),
            topology: options.topology.with_defaults(topology),
            engine: options.engine.with_defaults(engine),
        }
    }
}

/// Help messages used by Clap for command line arguments, combining the doc string with
/// the Serde default.
static GENERAL_HELP: Lazy<std::collections::HashMap<String, String>> =
    Lazy::new(|| generate_help_strs(schema_for!(GeneralOptions)));

// these must all be Option types since they aren't required by the CLI, even if they're
// required in the configuration file
#[derive(Debug, Clone, Parser, Serialize, Deserialize, Merge, JsonSchema)]
#[clap(next_help_heading = "General (Override configuration file options)")]
#[clap(next_display_order = None)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralOptions {
    /// Initialize randomness using seed N
    #[clap(long, value_name = "N")]
    #[clap(help = GENERAL_HELP.get("seed").unwrap().as_str())]
    pub seed: Option<u64>,

    /// Number of independent simulation runs
    #[clap(long, short = 'r', value_name = "N")]
    #[clap(help = GENERAL_HELP.get("runs").unwrap().as_str())]
    pub runs: Option<u32>,

    /// Number of packet arrivals injected at the start of each run
    #[clap(long, short = 'n', value_name = "N")]
    #[clap(help = GENERAL_HELP.get("packets_per_run").unwrap().as_str())]
    pub packets_per_run: Option<u32>,

    /// How many parallel threads to use to execute runs. A value of 0 will use one thread per
    /// logical CPU core.
    #[clap(long, short = 'p', value_name = "cores")]
    #[clap(help = GENERAL_HELP.get("parallelism").unwrap().as_str())]
    pub parallelism: Option<u32>,

    /// Log level of output written on stdout. If built in release mode, then log messages at
    /// level 'trace' will always be dropped
    #[clap(long, short = 'l', value_name = "level")]
    #[clap(help = GENERAL_HELP.get("log_level").unwrap().as_str())]
    pub log_level: Option<LogLevel>,

    /// Path of a JSON file to write the run statistics to
    #[clap(long, value_name = "path")]
    #[clap(help = GENERAL_HELP.get("stats_file").unwrap().as_str())]
    pub stats_file: Option<String>,
}

impl GeneralOptions {
    /// Replace unset (`None`) values of `base` with values from `default`.
    pub fn with_defaults(mut self, default: Self) -> Self {
        self.merge(default);
        self
    }
}

impl Default for GeneralOptions {
    fn default() -> Self {
        Self {
            seed: Some(1),
            runs: Some(10),
            packets_per_run: Some(50),
            parallelism: Some(0),
            log_level: Some(LogLevel::Info),
            stats_file: None,
        }
    }
}

/// Help messages used by Clap for command line arguments, combining the doc string with
/// the Serde default.
static TOPOLOGY_HELP: Lazy<std::collections::HashMap<String, String>> =
    Lazy::new(|| generate_help_strs(schema_for!(TopologyOptions)));

#[derive(Debug, Clone, Parser, Serialize, Deserialize, Merge, JsonSchema)]
#[clap(next_help_heading = "Topology (Override topology options)")]
#[clap(next_display_order = None)]
#[serde(default, deny_unknown_fields)]
pub struct TopologyOptions {
    /// Random graph model used to generate the initial topology ('barabasi_albert' or 'waxman')
    #[clap(long, value_name = "model")]
    #[clap(help = TOPOLOGY_HELP.get("model").unwrap().as_str())]
    pub model: Option<String>,

    /// Number of nodes in the initial topology
    #[clap(long, value_name = "N")]
    #[clap(help = TOPOLOGY_HELP.get("nodes").unwrap().as_str())]
    pub nodes: Option<u32>,

    /// Number of links each new node makes in the Barabási–Albert model
    #[clap(long, short = 'm', value_name = "N")]
    #[clap(help = TOPOLOGY_HELP.get("m").unwrap().as_str())]
    pub m: Option<u32>,

    /// Waxman model alpha parameter; larger values make long links more likely
    #[clap(long, value_name = "value")]
    #[clap(help = TOPOLOGY_HELP.get("alpha").unwrap().as_str())]
    pub alpha: Option<f64>,

    /// Waxman model beta parameter; larger values make links more likely overall
    #[clap(long, value_name = "value")]
    #[clap(help = TOPOLOGY_HELP.get("beta").unwrap().as_str())]
    pub beta: Option<f64>,

    /// Lower bound of the link latency range
    #[clap(long, value_name = "time")]
    #[clap(help = TOPOLOGY_HELP.get("latency_min").unwrap().as_str())]
    pub latency_min: Option<f64>,

    /// Upper bound of the link latency range
    #[clap(long, value_name = "time")]
    #[clap(help = TOPOLOGY_HELP.get("latency_max").unwrap().as_str())]
    pub latency_max: Option<f64>,

    /// Lower bound of the link bandwidth range, in Mbit/s
    #[clap(long, value_name = "Mbit/s")]
    #[clap(help = TOPOLOGY_HELP.get("bandwidth_min").unwrap().as_str())]
    pub bandwidth_min: Option<f64>,

    /// Upper bound of the link bandwidth range, in Mbit/s
    #[clap(long, value_name = "Mbit/s")]
    #[clap(help = TOPOLOGY_HELP.get("bandwidth_max").unwrap().as_str())]
    pub bandwidth_max: Option<f64>,
}

impl TopologyOptions {
    /// Replace unset (`None`) values of `base` with values from `default`.
    pub fn with_defaults(mut self, default: Self) -> Self {
        self.merge(default);
        self
    }
}

impl Default for TopologyOptions {
    fn default() -> Self {
        Self {
            model: Some("barabasi_albert".to_string()),
            nodes: Some(100),
            m: Some(2),
            alpha: Some(0.4),
            beta: Some(0.1),
            latency_min: Some(1.0),
            latency_max: Some(10.0),
            bandwidth_min: Some(10.0),
            bandwidth_max: Some(1000.0),
        }
    }
}

/// Help messages used by Clap for command line arguments, combining the doc string with
/// the Serde default.
static ENGINE_HELP: Lazy<std::collections::HashMap<String, String>> =
    Lazy::new(|| generate_help_strs(schema_for!(EngineOptions)));

#[derive(Debug, Clone, Parser, Serialize, Deserialize, Merge, JsonSchema)]
#[clap(next_help_heading = "Engine (Override engine options)")]
#[clap(next_display_order = None)]
#[serde(default, deny_unknown_fields)]
pub struct EngineOptions {
    /// Probability of mutating the topology after each processed event
    #[clap(long, value_name = "probability")]
    #[clap(help = ENGINE_HELP.get("mutation_probability").unwrap().as_str())]
    pub mutation_probability: Option<f64>,

    /// Packet arrival times are drawn uniformly from [0, arrival_window)
    #[clap(long, value_name = "time")]
    #[clap(help = ENGINE_HELP.get("arrival_window").unwrap().as_str())]
    pub arrival_window: Option<f64>,

    /// Smallest packet size, in bytes
    #[clap(long, value_name = "bytes")]
    #[clap(help = ENGINE_HELP.get("packet_size_min").unwrap().as_str())]
    pub packet_size_min: Option<u32>,

    /// Largest packet size, in bytes
    #[clap(long, value_name = "bytes")]
    #[clap(help = ENGINE_HELP.get("packet_size_max").unwrap().as_str())]
    pub packet_size_max: Option<u32>,

    /// Schedule a departure event at the destination for every delivered packet
    #[clap(long, value_name = "bool")]
    #[clap(help = ENGINE_HELP.get("schedule_departures").unwrap().as_str())]
    pub schedule_departures: Option<bool>,
}

impl EngineOptions {
    /// Replace unset (`None`) values of `base` with values from `default`.
    pub fn with_defaults(mut self, default: Self) -> Self {
        self.merge(default);
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            mutation_probability: Some(0.5),
            arrival_window: Some(100.0),
            packet_size_min: Some(64),
            packet_size_max: Some(1500),
            schedule_departures: Some(false),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = serde_yaml::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str(s)
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Generate help strings for objects in a JSON schema, including the Serde defaults if available.
fn generate_help_strs(
    schema: schemars::schema::RootSchema,
) -> std::collections::HashMap<String, String> {
    let mut defaults = std::collections::HashMap::<String, String>::new();
    for (name, obj) in &schema.schema.object.as_ref().unwrap().properties {
        if let Some(meta) = obj.clone().into_object().metadata {
            let description = meta.description.clone().unwrap_or_default();
            let space = if !description.is_empty() { " " } else { "" };
            match meta.default {
                Some(default) if !default.is_null() => defaults.insert(
                    name.clone(),
                    format!("{}{}[default: {}]", description, space, default),
                ),
                _ => defaults.insert(name.clone(), description.to_string()),
            };
        }
    }
    defaults
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_cli(args: &[&str]) -> CliOptions {
        CliOptions::try_parse_from(std::iter::once("packetsim").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = ConfigOptions::new(ConfigFileOptions::default(), parse_cli(&[]));
        assert_eq!(config.general.seed, Some(1));
        assert_eq!(config.general.runs, Some(10));
        assert_eq!(config.general.packets_per_run, Some(50));
        assert_eq!(config.general.log_level, Some(LogLevel::Info));
        assert_eq!(config.general.stats_file, None);
        assert_eq!(config.topology.model.as_deref(), Some("barabasi_albert"));
        assert_eq!(config.topology.nodes, Some(100));
        assert_eq!(config.topology.m, Some(2));
        assert_eq!(config.engine.mutation_probability, Some(0.5));
        assert_eq!(config.engine.schedule_departures, Some(false));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let yaml = r#"
            general:
              seed: 42
              log_level: debug
            topology:
              model: waxman
              nodes: 20
              alpha: 0.3
        "#;
        let file: ConfigFileOptions = serde_yaml::from_str(yaml).unwrap();
        let config = ConfigOptions::new(file, parse_cli(&[]));

        assert_eq!(config.general.seed, Some(42));
        assert_eq!(config.general.log_level, Some(LogLevel::Debug));
        // unspecified fields keep their defaults
        assert_eq!(config.general.runs, Some(10));
        assert_eq!(config.topology.model.as_deref(), Some("waxman"));
        assert_eq!(config.topology.nodes, Some(20));
        assert_eq!(config.topology.alpha, Some(0.3));
        assert_eq!(config.topology.beta, Some(0.1));
        assert_eq!(config.engine.arrival_window, Some(100.0));
    }

    #[test]
    fn test_cli_overrides_file() {
        let yaml = r#"
            general:
              seed: 42
              runs: 3
            engine:
              mutation_probability: 0.25
        "#;
        let file: ConfigFileOptions = serde_yaml::from_str(yaml).unwrap();
        let cli = parse_cli(&[
            "--seed",
            "7",
            "--mutation-probability",
            "0",
            "--schedule-departures",
            "true",
            "-l",
            "trace",
        ]);
        let config = ConfigOptions::new(file, cli);

        assert_eq!(config.general.seed, Some(7));
        assert_eq!(config.general.runs, Some(3));
        assert_eq!(config.general.log_level, Some(LogLevel::Trace));
        assert_eq!(config.engine.mutation_probability, Some(0.0));
        assert_eq!(config.engine.schedule_departures, Some(true));
    }

    #[test]
    fn test_explicit_null() {
        // an explicit null is indistinguishable from a missing value, so it gets the default
        let yaml = r#"
            topology:
              m: null
        "#;
        let file: ConfigFileOptions = serde_yaml::from_str(yaml).unwrap();
        let config = ConfigOptions::new(file, parse_cli(&[]));
        assert_eq!(config.topology.m, Some(2));
    }

    #[test]
    fn test_unknown_fields() {
        assert!(serde_yaml::from_str::<ConfigFileOptions>("foo: 1").is_err());
        assert!(serde_yaml::from_str::<ConfigFileOptions>("general: {bar: 1}").is_err());
        assert!(serde_yaml::from_str::<ConfigFileOptions>("topology: {nodes: -3}").is_err());
    }

    #[test]
    fn test_config_arg() {
        let cli = parse_cli(&["sim.yaml", "--show-config"]);
        assert_eq!(cli.config.as_deref(), Some("sim.yaml"));
        assert!(cli.show_config);

        let cli = parse_cli(&["-"]);
        assert_eq!(cli.config.as_deref(), Some("-"));
    }

    #[test]
    fn test_log_level() {
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warning);
        assert!(LogLevel::from_str("loud").is_err());
        assert_eq!(log::Level::from(LogLevel::Warning), log::Level::Warn);
    }

    #[test]
    fn test_help_strs() {
        let help = generate_help_strs(schema_for!(GeneralOptions));
        assert_eq!(
            help.get("seed").unwrap(),
            "Initialize randomness using seed N [default: 1]"
        );
        // no default for this one
        assert_eq!(
            help.get("stats_file").unwrap(),
            "Path of a JSON file to write the run statistics to"
        );
    }
}
