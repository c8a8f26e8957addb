mod generators;

pub use generators::{
    GenerateError, GeneratedGraph, GraphGenerator, ModelParams, ModelParamsError, TopologyModel,
    UnsupportedModelError,
};

use std::collections::BTreeMap;

use log::*;
use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Identifier of a node in a [`Topology`]. Ids are allocated in increasing order and never
/// reused within a topology, even after the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A symmetric link between two live nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Link {
    // stored with the smaller id first
    endpoints: (NodeId, NodeId),
    bandwidth: f64,
    latency: f64,
}

impl Link {
    fn new(a: NodeId, b: NodeId, bandwidth: f64, latency: f64) -> Self {
        Self {
            endpoints: (a.min(b), a.max(b)),
            bandwidth,
            latency,
        }
    }

    pub fn endpoints(&self) -> (NodeId, NodeId) {
        self.endpoints
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// The routing weight of this link.
    pub fn latency(&self) -> f64 {
        self.latency
    }

    pub fn connects(&self, id: NodeId) -> bool {
        self.endpoints.0 == id || self.endpoints.1 == id
    }

    /// The endpoint opposite `id`, or `None` if `id` is not an endpoint.
    pub fn other(&self, id: NodeId) -> Option<NodeId> {
        match self.endpoints {
            (a, b) if a == id => Some(b),
            (a, b) if b == id => Some(a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopologyError {
    /// The node id is not live in the topology.
    UnknownNode(NodeId),
    /// A link from a node to itself was requested.
    SelfLoop(NodeId),
    /// Link weights must be finite and strictly positive.
    InvalidLinkWeight { bandwidth: f64, latency: f64 },
}

impl std::error::Error for TopologyError {}

impl std::fmt::Display for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::UnknownNode(id) => write!(f, "Node {id} does not exist in the topology"),
            Self::SelfLoop(id) => write!(f, "Node {id} cannot be linked to itself"),
            Self::InvalidLinkWeight { bandwidth, latency } => write!(
                f,
                "Link weights must be positive and finite (bandwidth={bandwidth}, latency={latency})"
            ),
        }
    }
}

/// Ranges that new link weights are sampled from. Both ends of a range are inclusive only when
/// they are equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkProfile {
    pub bandwidth: (f64, f64),
    pub latency: (f64, f64),
}

impl LinkProfile {
    pub fn new(bandwidth: (f64, f64), latency: (f64, f64)) -> Result<Self, String> {
        for (name, (lo, hi)) in [("bandwidth", bandwidth), ("latency", latency)] {
            if !(lo.is_finite() && hi.is_finite()) || lo <= 0.0 {
                return Err(format!(
                    "The {name} range [{lo}, {hi}] must be finite and strictly positive"
                ));
            }
            if lo > hi {
                return Err(format!(
                    "The {name} range minimum {lo} is larger than its maximum {hi}"
                ));
            }
        }
        Ok(Self { bandwidth, latency })
    }

    /// Sample a `(bandwidth, latency)` pair.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        (
            sample_range(rng, self.bandwidth),
            sample_range(rng, self.latency),
        )
    }
}

impl Default for LinkProfile {
    fn default() -> Self {
        Self {
            bandwidth: (10.0, 1000.0),
            latency: (1.0, 10.0),
        }
    }
}

fn sample_range<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    if lo < hi {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

/// A structural change made by [`Topology::mutate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyMutation {
    RemovedNode(NodeId),
    AddedNode {
        id: NodeId,
        attached_to: Option<NodeId>,
    },
}

/// A mutable, undirected, weighted graph of live nodes and the links between them.
///
/// The graph is always simple: there are no self-loops and at most one link between any pair
/// of nodes. Removing a node removes every link incident to it.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: StableUnGraph<NodeId, Link>,
    // ordered so that iterating over live nodes is deterministic
    node_id_to_index_map: BTreeMap<NodeId, NodeIndex>,
    next_node_id: u32,
}

impl Topology {
    /// An empty topology.
    pub fn new() -> Self {
        Self {
            graph: StableUnGraph::default(),
            node_id_to_index_map: BTreeMap::new(),
            next_node_id: 0,
        }
    }

    /// Build a topology with nodes `0..num_nodes` and the given edges, sampling the weights of
    /// each link from `profile`. Duplicate edges overwrite earlier ones.
    pub fn from_edges<R: Rng + ?Sized>(
        num_nodes: u32,
        edges: impl IntoIterator<Item = (u32, u32)>,
        profile: &LinkProfile,
        rng: &mut R,
    ) -> Result<Self, TopologyError> {
        let mut topology = Self::new();
        for _ in 0..num_nodes {
            topology.add_node();
        }

        for (a, b) in edges {
            let (bandwidth, latency) = profile.sample(rng);
            topology.add_link(NodeId(a), NodeId(b), bandwidth, latency)?;
        }

        Ok(topology)
    }

    /// Generate a topology from a named random-graph model.
    pub fn generate<R: Rng + ?Sized>(
        model: &str,
        params: &ModelParams,
        profile: &LinkProfile,
        rng: &mut R,
    ) -> Result<Self, GenerateError> {
        let model: TopologyModel = model.parse()?;
        let generator = GraphGenerator::new(model, params)?;
        let generated = generator.generate(rng);

        debug!(
            "Generated {model} graph with {} nodes and {} edges",
            generated.num_nodes,
            generated.edges.len()
        );

        Ok(Self::from_edges(
            generated.num_nodes,
            generated.edges,
            profile,
            rng,
        )?)
    }

    /// The underlying graph, for routing.
    pub(crate) fn graph(&self) -> &StableUnGraph<NodeId, Link> {
        &self.graph
    }

    pub fn node_index(&self, id: NodeId) -> Option<NodeIndex> {
        self.node_id_to_index_map.get(&id).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node_id_to_index_map.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.node_id_to_index_map.len()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Live node ids in ascending order.
    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_id_to_index_map.keys().copied()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_weight(edge))
    }

    /// The nodes directly linked to `id`, in ascending order.
    pub fn neighbors(&self, id: NodeId) -> Result<Vec<NodeId>, TopologyError> {
        let index = self.node_index(id).ok_or(TopologyError::UnknownNode(id))?;
        let mut neighbors: Vec<NodeId> = self
            .graph
            .neighbors(index)
            .map(|x| self.graph[x])
            .collect();
        neighbors.sort();
        Ok(neighbors)
    }

    /// Allocate a new node without any links.
    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;

        let index = self.graph.add_node(id);
        assert!(self.node_id_to_index_map.insert(id, index).is_none());
        id
    }

    /// Allocate a new node and link it to `neighbor`. Nothing is added if `neighbor` is not live
    /// or the weights are invalid.
    pub fn add_node_connected(
        &mut self,
        neighbor: NodeId,
        bandwidth: f64,
        latency: f64,
    ) -> Result<NodeId, TopologyError> {
        if !self.contains(neighbor) {
            return Err(TopologyError::UnknownNode(neighbor));
        }
        check_link_weights(bandwidth, latency)?;

        let id = self.add_node();
        self.add_link(id, neighbor, bandwidth, latency)?;
        Ok(id)
    }

    /// Insert the link between `a` and `b`, or overwrite its weights if it already exists.
    pub fn add_link(
        &mut self,
        a: NodeId,
        b: NodeId,
        bandwidth: f64,
        latency: f64,
    ) -> Result<(), TopologyError> {
        let a_index = self.node_index(a).ok_or(TopologyError::UnknownNode(a))?;
        let b_index = self.node_index(b).ok_or(TopologyError::UnknownNode(b))?;

        if a == b {
            return Err(TopologyError::SelfLoop(a));
        }
        check_link_weights(bandwidth, latency)?;

        self.graph
            .update_edge(a_index, b_index, Link::new(a, b, bandwidth, latency));
        Ok(())
    }

    /// Remove a node and every link incident to it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), TopologyError> {
        let index = self
            .node_id_to_index_map
            .remove(&id)
            .ok_or(TopologyError::UnknownNode(id))?;

        // petgraph removes the incident edges along with the node
        let removed = self.graph.remove_node(index);
        assert_eq!(removed, Some(id));
        Ok(())
    }

    pub fn link_between(&self, a: NodeId, b: NodeId) -> Option<&Link> {
        let edge = self.graph.find_edge(self.node_index(a)?, self.node_index(b)?)?;
        self.graph.edge_weight(edge)
    }

    /// Apply one random structural change. With equal probability this removes a random live
    /// node (only when more than two nodes are live) or adds a node linked to a random live
    /// node. When removal is chosen but not allowed, a node is added instead.
    pub fn mutate<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        profile: &LinkProfile,
    ) -> Result<TopologyMutation, TopologyError> {
        let live: Vec<NodeId> = self.live_nodes().collect();
        let remove = rng.gen_bool(0.5);

        if remove && live.len() > 2 {
            // 'live' has more than two elements
            let id = *live.choose(rng).unwrap();
            self.remove_node(id)?;
            return Ok(TopologyMutation::RemovedNode(id));
        }

        let Some(&neighbor) = live.choose(rng) else {
            let id = self.add_node();
            return Ok(TopologyMutation::AddedNode {
                id,
                attached_to: None,
            });
        };

        let (bandwidth, latency) = profile.sample(rng);
        let id = self.add_node_connected(neighbor, bandwidth, latency)?;
        Ok(TopologyMutation::AddedNode {
            id,
            attached_to: Some(neighbor),
        })
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

fn check_link_weights(bandwidth: f64, latency: f64) -> Result<(), TopologyError> {
    let valid = |x: f64| x.is_finite() && x > 0.0;
    if !valid(bandwidth) || !valid(latency) {
        return Err(TopologyError::InvalidLinkWeight { bandwidth, latency });
    }
    Ok(())
}
