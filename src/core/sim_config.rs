use std::path::PathBuf;

use anyhow::Context;

use crate::core::configuration::{ConfigOptions, LogLevel};
use crate::core::engine::EngineOptions;
use crate::core::work::arrivals::ArrivalInjector;
use crate::network::graph::{GraphGenerator, LinkProfile, ModelParams, TopologyModel};
use crate::utility::random;

/// The simulation configuration after processing and validating the configuration options.
#[derive(Debug, Clone)]
pub struct SimConfig {
    // the seed that all per-run seeds are derived from
    pub seed: u64,

    // one seed per run, drawn up front so that results don't depend on scheduling
    pub run_seeds: Vec<u64>,

    pub packets_per_run: u32,

    // number of worker threads, or 0 to let rayon decide
    pub parallelism: usize,

    pub log_level: LogLevel,

    pub stats_file: Option<PathBuf>,

    pub generator: GraphGenerator,

    // weights of every link, both generated and added by mutations
    pub link_profile: LinkProfile,

    pub arrivals: ArrivalInjector,

    pub engine: EngineOptions,
}

impl SimConfig {
    pub fn new(config: &ConfigOptions) -> anyhow::Result<Self> {
        let general = &config.general;
        let topology = &config.topology;
        let engine = &config.engine;

        let seed = general.seed.unwrap();
        let runs = general.runs.unwrap();

        let model: TopologyModel = topology
            .model
            .as_deref()
            .unwrap()
            .parse()
            .context("Invalid topology model")?;

        let params = ModelParams {
            n: topology.nodes,
            m: topology.m,
            alpha: topology.alpha,
            beta: topology.beta,
        };
        let generator = GraphGenerator::new(model, &params)
            .with_context(|| format!("Invalid parameters for the {model} topology model"))?;

        // packets travel between two distinct nodes
        if generator.num_nodes() < 2 {
            return Err(anyhow::anyhow!(
                "The topology must have at least 2 nodes, but {} were requested",
                generator.num_nodes()
            ));
        }

        let link_profile = LinkProfile::new(
            (
                topology.bandwidth_min.unwrap(),
                topology.bandwidth_max.unwrap(),
            ),
            (topology.latency_min.unwrap(), topology.latency_max.unwrap()),
        )
        .map_err(|e| anyhow::anyhow!(e))
        .context("Invalid link profile")?;

        let mutation_probability = engine.mutation_probability.unwrap();
        if !(0.0..=1.0).contains(&mutation_probability) {
            return Err(anyhow::anyhow!(
                "The mutation probability {mutation_probability} is not in the range [0, 1]"
            ));
        }

        let arrival_window = engine.arrival_window.unwrap();
        if !(arrival_window.is_finite() && arrival_window >= 0.0) {
            return Err(anyhow::anyhow!(
                "The arrival window {arrival_window} must be finite and non-negative"
            ));
        }

        let packet_size = (
            engine.packet_size_min.unwrap(),
            engine.packet_size_max.unwrap(),
        );
        if packet_size.0 > packet_size.1 {
            return Err(anyhow::anyhow!(
                "The minimum packet size {} is larger than the maximum packet size {}",
                packet_size.0,
                packet_size.1
            ));
        }

        if runs == 0 {
            log::warn!("No runs were requested");
        }
        if general.packets_per_run == Some(0) {
            log::warn!("No packets will be injected");
        }

        Ok(Self {
            seed,
            run_seeds: random::run_seeds(seed, runs),
            packets_per_run: general.packets_per_run.unwrap(),
            parallelism: general.parallelism.unwrap().try_into()?,
            log_level: general.log_level.unwrap(),
            stats_file: general.stats_file.as_ref().map(PathBuf::from),
            generator,
            link_profile,
            arrivals: ArrivalInjector {
                count: general.packets_per_run.unwrap(),
                window: arrival_window,
                packet_size,
            },
            engine: EngineOptions {
                mutation_probability,
                schedule_departures: engine.schedule_departures.unwrap(),
                link_profile,
            },
        })
    }

    pub fn runs(&self) -> u32 {
        // 'run_seeds' was built from a u32 count
        self.run_seeds.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::configuration::{CliOptions, ConfigFileOptions};
    use clap::Parser;

    fn config_from_yaml(yaml: &str) -> ConfigOptions {
        let file: ConfigFileOptions = serde_yaml::from_str(yaml).unwrap();
        let cli = CliOptions::try_parse_from(["packetsim"]).unwrap();
        ConfigOptions::new(file, cli)
    }

    #[test]
    fn test_defaults() {
        let config = SimConfig::new(&config_from_yaml("{}")).unwrap();
        assert_eq!(config.runs(), 10);
        assert_eq!(config.packets_per_run, 50);
        assert_eq!(
            config.generator,
            GraphGenerator::BarabasiAlbert { n: 100, m: 2 }
        );
        assert_eq!(config.link_profile, LinkProfile::default());
        assert_eq!(config.engine, EngineOptions::default());
        assert_eq!(
            config.arrivals,
            ArrivalInjector {
                count: 50,
                window: 100.0,
                packet_size: (64, 1500),
            }
        );
        assert_eq!(config.run_seeds, random::run_seeds(1, 10));
    }

    #[test]
    fn test_waxman() {
        let config = SimConfig::new(&config_from_yaml(
            "topology: {model: Waxman, nodes: 30, beta: 0.5}",
        ))
        .unwrap();
        assert_eq!(
            config.generator,
            GraphGenerator::Waxman {
                n: 30,
                alpha: 0.4,
                beta: 0.5
            }
        );
    }

    #[test]
    fn test_invalid() {
        let invalid = [
            "topology: {model: erdos_renyi}",
            "topology: {nodes: 1}",
            "topology: {nodes: 5, m: 5}",
            "topology: {model: waxman, alpha: 0}",
            "topology: {latency_min: 5, latency_max: 2}",
            "topology: {bandwidth_min: 0}",
            "engine: {mutation_probability: 1.5}",
            "engine: {arrival_window: -1}",
            "engine: {packet_size_min: 100, packet_size_max: 10}",
        ];
        for yaml in invalid {
            assert!(
                SimConfig::new(&config_from_yaml(yaml)).is_err(),
                "accepted: {yaml}"
            );
        }
    }

    #[test]
    fn test_unsupported_model_error() {
        let err = SimConfig::new(&config_from_yaml("topology: {model: erdos_renyi}")).unwrap_err();
        let source = err
            .downcast_ref::<crate::network::graph::UnsupportedModelError>()
            .unwrap();
        assert_eq!(source.0, "erdos_renyi");
    }
}
