use rand::Rng;

use crate::core::support::simulation_time::SimulationTime;
use crate::network::graph::{NodeId, Topology};

use super::event::Event;

/// Generates the initial packet arrivals for a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrivalInjector {
    /// Number of arrivals to generate.
    pub count: u32,
    /// Arrival times are drawn uniformly from `[0, window)`.
    pub window: f64,
    /// Inclusive range of packet sizes in bytes.
    pub packet_size: (u32, u32),
}

impl ArrivalInjector {
    /// Sample `count` arrivals between distinct random pairs of live nodes.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        topology: &Topology,
        rng: &mut R,
    ) -> Result<Vec<Event>, NotEnoughNodesError> {
        let live: Vec<NodeId> = topology.live_nodes().collect();
        if self.count > 0 && live.len() < 2 {
            return Err(NotEnoughNodesError(live.len()));
        }

        let (size_min, size_max) = self.packet_size;
        let events = (0..self.count)
            .map(|_| {
                let time = if self.window > 0.0 {
                    rng.gen_range(0.0..self.window)
                } else {
                    0.0
                };
                // 'window' is validated when configuring, so this only fails on a programming error
                let time = SimulationTime::new(time).unwrap();

                let pair = rand::seq::index::sample(rng, live.len(), 2);
                let source = live[pair.index(0)];
                let destination = live[pair.index(1)];

                let size = rng.gen_range(size_min..=size_max.max(size_min));
                Event::arrival(time, source, destination, size)
            })
            .collect();

        Ok(events)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotEnoughNodesError(pub usize);

impl std::error::Error for NotEnoughNodesError {}

impl std::fmt::Display for NotEnoughNodesError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "At least two live nodes are needed to inject packets, but there are {}",
            self.0
        )
    }
}
