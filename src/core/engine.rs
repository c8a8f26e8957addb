//! The event-driven control loop of a single simulation run.

use log::*;
use rand::Rng;

use crate::core::sim_stats::PacketStats;
use crate::core::support::simulation_time::SimulationTime;
use crate::core::work::event::{Event, EventKind};
use crate::core::work::event_queue::EventQueue;
use crate::core::worker::Worker;
use crate::network::graph::{LinkProfile, Topology, TopologyError};
use crate::network::router::{self, RouteError};

/// The probability of mutating the topology after each event, unless configured otherwise.
pub const DEFAULT_MUTATION_PROBABILITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    /// Probability in `[0, 1]` of applying one topology mutation after each event.
    pub mutation_probability: f64,
    /// Schedule a departure event for every delivered packet.
    pub schedule_departures: bool,
    /// Weights for links created by mutations.
    pub link_profile: LinkProfile,
}

impl EngineOptions {
    /// Check that the mutation probability is a probability.
    pub fn validate(&self) -> Result<(), InvalidProbabilityError> {
        // written so that NaN is rejected
        if !(0.0..=1.0).contains(&self.mutation_probability) {
            return Err(InvalidProbabilityError(self.mutation_probability));
        }
        Ok(())
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            mutation_probability: DEFAULT_MUTATION_PROBABILITY,
            schedule_departures: false,
            link_profile: LinkProfile::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidProbabilityError(pub f64);

impl std::error::Error for InvalidProbabilityError {}

impl std::fmt::Display for InvalidProbabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "The mutation probability {} is not in the range [0, 1]",
            self.0
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// There are pending events.
    Running,
    /// The event queue is exhausted.
    Terminated,
}

/// What happened while processing one event.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// An arrival was routed.
    Delivered { latency: f64 },
    /// An arrival could not be routed.
    Dropped(RouteError),
    /// A departure was processed.
    Departed,
}

/// Drives one simulation run: pops events in time order, routes arrivals over the current
/// topology, records the outcome, and randomly mutates the topology between events.
///
/// The engine exclusively owns its topology, queue, statistics, and clock. Independent runs
/// must use independent engines.
pub struct SimulationEngine<R: Rng> {
    topology: Topology,
    queue: EventQueue,
    stats: PacketStats,
    now: SimulationTime,
    options: EngineOptions,
    random: R,
}

impl<R: Rng> SimulationEngine<R> {
    pub fn new(
        topology: Topology,
        options: EngineOptions,
        random: R,
    ) -> Result<Self, InvalidProbabilityError> {
        options.validate()?;

        Ok(Self {
            topology,
            queue: EventQueue::new(),
            stats: PacketStats::new(),
            now: SimulationTime::ZERO,
            options,
            random,
        })
    }

    pub fn schedule(&mut self, event: Event) {
        self.queue.schedule(event);
    }

    pub fn state(&self) -> EngineState {
        if self.queue.is_empty() {
            EngineState::Terminated
        } else {
            EngineState::Running
        }
    }

    /// The current simulation time: the time of the most recently processed event.
    pub fn now(&self) -> SimulationTime {
        self.now
    }

    pub fn stats(&self) -> &PacketStats {
        &self.stats
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Mutable access to the topology between steps, for scripted changes.
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Process the next event. Returns `Ok(None)` once the queue is empty.
    pub fn step(&mut self) -> Result<Option<StepOutcome>, TopologyError> {
        let Some(event) = self.queue.next() else {
            return Ok(None);
        };

        // the queue pops in time order, so the clock never moves backward as long as nothing
        // is scheduled in the past
        self.now = event.time();
        Worker::set_current_time(self.now);

        let outcome = match event.kind() {
            EventKind::Arrival => self.handle_arrival(&event),
            EventKind::Departure => {
                trace!(
                    "Packet {}->{} departed ({} bytes, {} hops)",
                    event.source(),
                    event.destination(),
                    event.packet_size_bytes(),
                    event.path().map_or(0, |p| p.len().saturating_sub(1)),
                );
                StepOutcome::Departed
            }
        };

        if self.options.mutation_probability > 0.0
            && self.random.gen_bool(self.options.mutation_probability)
        {
            let mutation = self
                .topology
                .mutate(&mut self.random, &self.options.link_profile)?;
            debug!(
                "Topology mutation {mutation:?}: {} nodes, {} links",
                self.topology.node_count(),
                self.topology.link_count()
            );
        }

        Ok(Some(outcome))
    }

    fn handle_arrival(&mut self, event: &Event) -> StepOutcome {
        let (source, destination) = (event.source(), event.destination());

        let routed = if self.options.schedule_departures {
            router::route_path(&self.topology, source, destination).map(|route| {
                match Event::departure(event, route.weight, route.path) {
                    Some(departure) => self.queue.schedule(departure),
                    None => warn!("Path weight {} gives an invalid departure time", route.weight),
                }
                route.weight
            })
        } else {
            router::route(&self.topology, source, destination)
        };

        match routed {
            Ok(latency) => {
                trace!(
                    "Packet {source}->{destination} routed with latency {latency} ({} bytes)",
                    event.packet_size_bytes()
                );
                self.stats.record_success(latency);
                StepOutcome::Delivered { latency }
            }
            Err(e) => {
                trace!("Packet {source}->{destination} dropped: {e}");
                self.stats.record_failure();
                StepOutcome::Dropped(e)
            }
        }
    }

    /// Process events until the queue is empty, returning the final statistics.
    pub fn run(&mut self) -> Result<PacketStats, TopologyError> {
        while self.step()?.is_some() {}

        debug!(
            "Event queue exhausted at time {}: attempted={}, succeeded={}",
            self.now, self.stats.transmissions_attempted, self.stats.transmissions_succeeded
        );

        Ok(self.stats.clone())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::*;
    use crate::network::graph::NodeId;

    fn ring(n: u32, latency: f64) -> Topology {
        let mut topology = Topology::new();
        for _ in 0..n {
            topology.add_node();
        }
        for i in 0..n {
            topology
                .add_link(NodeId::new(i), NodeId::new((i + 1) % n), 100.0, latency)
                .unwrap();
        }
        topology
    }

    fn engine(topology: Topology, options: EngineOptions) -> SimulationEngine<Xoshiro256PlusPlus> {
        SimulationEngine::new(topology, options, Xoshiro256PlusPlus::seed_from_u64(1)).unwrap()
    }

    fn no_mutation() -> EngineOptions {
        EngineOptions {
            mutation_probability: 0.0,
            ..Default::default()
        }
    }

    fn arrival(time: f64, src: u32, dst: u32) -> Event {
        Event::arrival(
            SimulationTime::new(time).unwrap(),
            NodeId::new(src),
            NodeId::new(dst),
            100,
        )
    }

    #[test]
    fn test_invalid_mutation_probability() {
        for p in [1.5, -0.1, f64::NAN, f64::INFINITY] {
            let options = EngineOptions {
                mutation_probability: p,
                ..Default::default()
            };
            let rng = Xoshiro256PlusPlus::seed_from_u64(1);
            let err = SimulationEngine::new(ring(5, 2.0), options, rng).err().unwrap();
            assert!(err.0.is_nan() || err.0 == p);
        }

        for p in [0.0, 1.0] {
            let options = EngineOptions {
                mutation_probability: p,
                ..Default::default()
            };
            let mut engine = engine(ring(5, 2.0), options);
            engine.schedule(arrival(1.0, 0, 2));
            assert_eq!(engine.run().unwrap().transmissions_attempted, 1);
        }
    }

    #[test]
    fn test_states() {
        let mut engine = engine(ring(5, 2.0), no_mutation());
        assert_eq!(engine.state(), EngineState::Terminated);

        engine.schedule(arrival(1.0, 0, 2));
        assert_eq!(engine.state(), EngineState::Running);

        assert_eq!(
            engine.step().unwrap(),
            Some(StepOutcome::Delivered { latency: 4.0 })
        );
        assert_eq!(engine.state(), EngineState::Terminated);
        assert_eq!(engine.step().unwrap(), None);
    }

    #[test]
    fn test_clock_follows_events() {
        let mut engine = engine(ring(5, 2.0), no_mutation());
        engine.schedule(arrival(7.0, 0, 1));
        engine.schedule(arrival(3.0, 1, 2));
        engine.schedule(arrival(5.0, 2, 3));

        let mut times = vec![];
        while engine.step().unwrap().is_some() {
            times.push(engine.now().as_f64());
        }
        assert_eq!(times, vec![3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_dropped_packets() {
        let mut topology = ring(5, 2.0);
        // an isolated node
        let isolated = topology.add_node();

        let mut engine = engine(topology, no_mutation());
        engine.schedule(arrival(1.0, 0, isolated.raw()));
        engine.schedule(arrival(2.0, 0, 99));

        assert_eq!(
            engine.step().unwrap(),
            Some(StepOutcome::Dropped(RouteError::NoPath {
                source: NodeId::new(0),
                destination: isolated
            }))
        );
        assert_eq!(
            engine.step().unwrap(),
            Some(StepOutcome::Dropped(RouteError::NodeNotFound(NodeId::new(
                99
            ))))
        );

        let stats = engine.run().unwrap();
        assert_eq!(stats.transmissions_attempted, 2);
        assert_eq!(stats.transmissions_succeeded, 0);
        assert!(stats.latencies.is_empty());
    }

    #[test]
    fn test_departures() {
        let options = EngineOptions {
            schedule_departures: true,
            ..no_mutation()
        };
        let mut engine = engine(ring(5, 2.0), options);
        engine.schedule(arrival(1.0, 0, 2));
        engine.schedule(arrival(2.0, 3, 4));

        let outcomes: Vec<_> = std::iter::from_fn(|| engine.step().unwrap()).collect();
        assert_eq!(
            outcomes,
            vec![
                StepOutcome::Delivered { latency: 4.0 },
                StepOutcome::Delivered { latency: 2.0 },
                // 2 + 2
                StepOutcome::Departed,
                // 1 + 4
                StepOutcome::Departed,
            ]
        );
        assert_eq!(engine.now().as_f64(), 5.0);

        // departures don't count as transmissions
        assert_eq!(engine.stats().transmissions_attempted, 2);
    }

    #[test]
    fn test_mutations_happen() {
        let options = EngineOptions {
            mutation_probability: 1.0,
            ..Default::default()
        };
        let mut engine = engine(ring(10, 1.0), options);
        for i in 0..100 {
            engine.schedule(arrival(f64::from(i), 0, 5));
        }

        let stats = engine.run().unwrap();
        let topology = engine.topology();
        assert_eq!(stats.transmissions_attempted, 100);
        assert!(stats.transmissions_succeeded <= 100);
        assert_eq!(stats.latencies.len() as u64, stats.transmissions_succeeded);

        // 100 mutations happened, each adding or removing one node
        let original: Vec<NodeId> = (0..10).map(NodeId::new).collect();
        assert_ne!(topology.live_nodes().collect::<Vec<_>>(), original);
        assert!(topology.node_count() >= 2);
        for link in topology.links() {
            let (a, b) = link.endpoints();
            assert!(topology.contains(a) && topology.contains(b));
        }
    }

    #[test]
    fn test_deterministic_replay() {
        let run = || {
            let mut engine = engine(ring(20, 1.5), EngineOptions::default());
            for i in 0..50 {
                engine.schedule(arrival(f64::from(i % 7), i % 20, (i * 3 + 1) % 20));
            }
            engine.run().unwrap()
        };
        assert_eq!(run(), run());
    }
}
