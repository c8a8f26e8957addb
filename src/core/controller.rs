use std::time::Instant;

use anyhow::Context;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::core::engine::SimulationEngine;
use crate::core::sim_config::SimConfig;
use crate::core::sim_stats::{RunResult, SweepStats};
use crate::core::worker::{RunId, Worker};
use crate::network::graph::Topology;
use crate::utility::random;
use crate::utility::time::TimeParts;

/// Executes every run of a sweep. Runs share nothing but the read-only configuration.
pub struct Controller<'a> {
    config: &'a SimConfig,
}

impl<'a> Controller<'a> {
    pub fn new(config: &'a SimConfig) -> Self {
        Self { config }
    }

    pub fn run(self) -> anyhow::Result<SweepStats> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.parallelism)
            .thread_name(|i| format!("run-worker-{i}"))
            .build()
            .context("Failed to create the worker thread pool")?;

        log::info!(
            "Starting {} runs of {} packets on {} threads",
            self.config.runs(),
            self.config.packets_per_run,
            pool.current_num_threads()
        );

        let start = Instant::now();

        // the results are collected in run order regardless of which thread executed each run
        let runs = pool.install(|| {
            (0..self.config.runs())
                .into_par_iter()
                .map(|run| self.run_one(run))
                .collect::<anyhow::Result<Vec<_>>>()
        })?;

        log::info!(
            "Finished all runs after {} of wall time",
            TimeParts::from_micros(start.elapsed().as_micros())
        );

        Ok(SweepStats::new(runs, self.config.packets_per_run))
    }

    fn run_one(&self, run: u32) -> anyhow::Result<RunResult> {
        let _guard = Worker::enter_run(RunId(run));
        let seed = self.config.run_seeds[run as usize];
        let start = Instant::now();

        let mut random = random::rng_from_seed(seed);

        let generated = self.config.generator.generate(&mut random);
        let topology = Topology::from_edges(
            generated.num_nodes,
            generated.edges,
            &self.config.link_profile,
            &mut random,
        )
        .with_context(|| format!("Failed to build the topology for run {run}"))?;

        log::debug!(
            "Run {run} starting with seed {seed}: {} nodes, {} links",
            topology.node_count(),
            topology.link_count()
        );

        let arrivals = self
            .config
            .arrivals
            .sample(&topology, &mut random)
            .with_context(|| format!("Failed to inject packets for run {run}"))?;

        let mut engine = SimulationEngine::new(topology, self.config.engine, random)
            .with_context(|| format!("Invalid engine options for run {run}"))?;
        for event in arrivals {
            engine.schedule(event);
        }

        let stats = engine
            .run()
            .with_context(|| format!("Run {run} failed at time {}", engine.now()))?;

        let result = RunResult {
            run,
            seed,
            stats,
            wall_time: start.elapsed(),
            final_nodes: engine.topology().node_count(),
            final_links: engine.topology().link_count(),
        };

        log::info!(
            "Run {run} done: {}/{} packets delivered, average latency {:.3}",
            result.stats.transmissions_succeeded,
            result.stats.transmissions_attempted,
            result.stats.average_latency(),
        );

        Ok(result)
    }
}
