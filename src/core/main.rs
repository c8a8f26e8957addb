use std::ffi::OsString;
use std::io::Read;

use anyhow::{self, Context};
use clap::Parser;

use crate::core::configuration::{CliOptions, ConfigFileOptions, ConfigOptions};
use crate::core::controller::Controller;
use crate::core::logger::sim_logger;
use crate::core::sim_config::SimConfig;
use crate::core::sim_stats::SweepStats;

/// Main entry point for the simulator.
pub fn run_packetsim(args: Vec<OsString>) -> anyhow::Result<()> {
    // parse the options from the command line
    let options = match CliOptions::try_parse_from(args.clone()) {
        Ok(x) => x,
        Err(e) => {
            // clap reports '--help' and '--version' as errors too
            e.print()?;
            std::process::exit(e.exit_code());
        }
    };

    let config_file = match &options.config {
        Some(filename) => load_config_file(filename)?,
        None => ConfigFileOptions::default(),
    };

    // generate the final configuration from the config file and cli options
    let config = ConfigOptions::new(config_file, options.clone());

    if options.show_config {
        print!(
            "{}",
            serde_yaml::to_string(&config).context("Failed to serialize the configuration")?
        );
        return Ok(());
    }

    let log_level: log::Level = config.general.log_level.unwrap().into();

    // start up the logging subsystem to handle all future messages
    sim_logger::init(log_level.to_level_filter(), true)
        .context("Failed to initialize the logger")?;

    // disable log buffering during startup so that we see every message immediately in the terminal
    sim_logger::set_buffering_enabled(false);

    // check if some log levels have been compiled out
    if log_level > log::STATIC_MAX_LEVEL {
        log::warn!(
            "Log level set to {}, but messages higher than {} have been compiled out",
            log_level,
            log::STATIC_MAX_LEVEL,
        );
    }

    log_environment(&args);

    let sim_config = SimConfig::new(&config).context("Invalid configuration")?;
    log::debug!("Startup checks passed, we are ready to start the simulation");

    sim_logger::set_buffering_enabled(true);
    let sweep = Controller::new(&sim_config).run();
    sim_logger::set_buffering_enabled(false);
    let sweep = sweep?;

    sweep.log_summary();

    if let Some(path) = &sim_config.stats_file {
        write_stats_file(path, &sweep)
            .with_context(|| format!("Failed to write statistics to {path:?}"))?;
        log::info!("Wrote statistics to {path:?}");
    }

    Ok(())
}

fn load_config_file(filename: &str) -> anyhow::Result<ConfigFileOptions> {
    // read from stdin if the config filename is given as '-'
    let contents = if filename == "-" {
        let mut contents = String::new();
        std::io::stdin()
            .read_to_string(&mut contents)
            .context("Could not read the configuration from stdin")?;
        contents
    } else {
        std::fs::read_to_string(filename)
            .with_context(|| format!("Could not open config file {filename:?}"))?
    };

    // an empty file is a valid configuration that sets no options
    if contents.trim().is_empty() {
        return Ok(ConfigFileOptions::default());
    }

    serde_yaml::from_str(&contents)
        .with_context(|| format!("Could not parse configuration file {filename:?}"))
}

fn write_stats_file(path: &std::path::Path, sweep: &SweepStats) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, sweep)?;
    std::io::Write::flush(&mut writer)?;
    Ok(())
}

fn log_environment(args: &[OsString]) {
    for arg in args {
        log::info!("arg: {}", arg.to_string_lossy());
    }

    for (key, value) in std::env::vars_os() {
        let level = match key.to_string_lossy().as_ref() {
            "RAYON_NUM_THREADS" => log::Level::Info,
            _ => log::Level::Trace,
        };
        log::log!(level, "env: {:?}={:?}", key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("sim.yaml");
        std::fs::write(&path, "general:\n  runs: 3\ntopology:\n  model: waxman\n").unwrap();
        let file = load_config_file(path.to_str().unwrap()).unwrap();
        assert_eq!(file.general.runs, Some(3));
        assert_eq!(file.topology.model.as_deref(), Some("waxman"));

        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "\n").unwrap();
        let file = load_config_file(path.to_str().unwrap()).unwrap();
        assert_eq!(file.general.runs, Some(10));

        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "general:\n  nonsense: 3\n").unwrap();
        assert!(load_config_file(path.to_str().unwrap()).is_err());

        assert!(load_config_file(dir.path().join("missing.yaml").to_str().unwrap()).is_err());
    }

    #[test]
    fn test_write_stats_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");

        let sweep = SweepStats::new(vec![], 5);
        write_stats_file(&path, &sweep).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["packets_per_run"], 5);
        assert_eq!(json["runs"], serde_json::json!([]));
        assert!(json["latency_summary"].is_null());
    }
}
