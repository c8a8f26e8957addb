//! Shortest-path routing over the current topology.
//!
//! The router only ever borrows the topology immutably, and it validates the endpoints on every
//! call: a node that was live when a packet was scheduled may have been removed since.

use crate::network::graph::{NodeId, Topology};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    /// The node is not live in the topology.
    NodeNotFound(NodeId),
    /// Both nodes are live, but they are in different components.
    NoPath {
        source: NodeId,
        destination: NodeId,
    },
}

impl std::error::Error for RouteError {}

impl std::fmt::Display for RouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "Node {id} not found in the topology"),
            Self::NoPath {
                source,
                destination,
            } => write!(f, "No path from node {source} to node {destination}"),
        }
    }
}

/// A minimum-latency path between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Sum of the link latencies along the path.
    pub weight: f64,
    /// The nodes along the path, including both endpoints.
    pub path: Vec<NodeId>,
}

/// The minimum total latency of any path from `source` to `destination`.
pub fn route(topology: &Topology, source: NodeId, destination: NodeId) -> Result<f64, RouteError> {
    let src = topology
        .node_index(source)
        .ok_or(RouteError::NodeNotFound(source))?;
    let dst = topology
        .node_index(destination)
        .ok_or(RouteError::NodeNotFound(destination))?;

    petgraph::algo::dijkstra(topology.graph(), src, Some(dst), |e| e.weight().latency())
        .get(&dst)
        .copied()
        .ok_or(RouteError::NoPath {
            source,
            destination,
        })
}

/// Like [`route`], but also returns the nodes along the path.
pub fn route_path(
    topology: &Topology,
    source: NodeId,
    destination: NodeId,
) -> Result<Route, RouteError> {
    let src = topology
        .node_index(source)
        .ok_or(RouteError::NodeNotFound(source))?;
    let dst = topology
        .node_index(destination)
        .ok_or(RouteError::NodeNotFound(destination))?;

    // a* with a zero heuristic is dijkstra, but it also gives us the path
    let (weight, path) = petgraph::algo::astar(
        topology.graph(),
        src,
        |x| x == dst,
        |e| e.weight().latency(),
        |_| 0.0,
    )
    .ok_or(RouteError::NoPath {
        source,
        destination,
    })?;

    let graph = topology.graph();
    Ok(Route {
        weight,
        path: path.into_iter().map(|x| graph[x]).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(num_nodes: u32, edges: &[(u32, u32, f64)]) -> Topology {
        let mut topology = Topology::new();
        for _ in 0..num_nodes {
            topology.add_node();
        }
        for &(a, b, latency) in edges {
            topology
                .add_link(NodeId::new(a), NodeId::new(b), 100.0, latency)
                .unwrap();
        }
        topology
    }

    /// Minimum weight over every simple path, by exhaustive search.
    fn brute_force(topology: &Topology, source: NodeId, destination: NodeId) -> Option<f64> {
        fn visit(
            topology: &Topology,
            current: NodeId,
            destination: NodeId,
            visited: &mut Vec<NodeId>,
            weight: f64,
            best: &mut Option<f64>,
        ) {
            if current == destination {
                *best = Some(best.map_or(weight, |b| b.min(weight)));
                return;
            }
            for next in topology.neighbors(current).unwrap() {
                if visited.contains(&next) {
                    continue;
                }
                let latency = topology.link_between(current, next).unwrap().latency();
                visited.push(next);
                visit(topology, next, destination, visited, weight + latency, best);
                visited.pop();
            }
        }

        let mut best = None;
        visit(topology, source, destination, &mut vec![source], 0.0, &mut best);
        best
    }

    #[test]
    fn test_ring() {
        let topology = build(
            5,
            &[(0, 1, 2.0), (1, 2, 2.0), (2, 3, 2.0), (3, 4, 2.0), (4, 0, 2.0)],
        );
        let (n0, n2) = (NodeId::new(0), NodeId::new(2));

        assert_eq!(route(&topology, n0, n2), Ok(4.0));
        assert_eq!(route(&topology, n2, n0), Ok(4.0));

        let r = route_path(&topology, n0, n2).unwrap();
        assert_eq!(r.weight, 4.0);
        assert_eq!(r.path, vec![n0, NodeId::new(1), n2]);
    }

    #[test]
    fn test_same_node() {
        let topology = build(2, &[(0, 1, 3.0)]);
        let n0 = NodeId::new(0);
        assert_eq!(route(&topology, n0, n0), Ok(0.0));
        assert_eq!(route_path(&topology, n0, n0).unwrap().path, vec![n0]);
    }

    #[test]
    fn test_prefers_lighter_longer_path() {
        let topology = build(4, &[(0, 3, 10.0), (0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)]);
        let r = route_path(&topology, NodeId::new(0), NodeId::new(3)).unwrap();
        assert_eq!(r.weight, 3.0);
        assert_eq!(r.path.len(), 4);
    }

    #[test]
    fn test_matches_brute_force() {
        let topology = build(
            5,
            &[
                (0, 1, 4.0),
                (0, 2, 1.5),
                (1, 2, 2.0),
                (1, 3, 5.0),
                (2, 3, 8.0),
                (2, 4, 9.5),
                (3, 4, 1.0),
            ],
        );

        let nodes: Vec<NodeId> = topology.live_nodes().collect();
        for &a in &nodes {
            for &b in &nodes {
                let expected = brute_force(&topology, a, b).unwrap();
                let weight = route(&topology, a, b).unwrap();
                assert!(weight >= 0.0 && weight.is_finite());
                assert!((weight - expected).abs() < 1e-9, "{a}->{b}");
                let r = route_path(&topology, a, b).unwrap();
                assert!((r.weight - expected).abs() < 1e-9, "{a}->{b}");
            }
        }
    }

    #[test]
    fn test_disconnected() {
        let topology = build(4, &[(0, 1, 1.0), (2, 3, 1.0)]);
        let (n0, n3) = (NodeId::new(0), NodeId::new(3));
        let expected = RouteError::NoPath {
            source: n0,
            destination: n3,
        };
        assert_eq!(route(&topology, n0, n3), Err(expected));
        assert_eq!(route_path(&topology, n0, n3), Err(expected));
    }

    #[test]
    fn test_removed_node() {
        let mut topology = build(3, &[(0, 1, 1.0), (1, 2, 1.0)]);
        let n2 = NodeId::new(2);
        topology.remove_node(n2).unwrap();

        assert_eq!(
            route(&topology, NodeId::new(0), n2),
            Err(RouteError::NodeNotFound(n2))
        );
        assert_eq!(
            route_path(&topology, n2, NodeId::new(0)),
            Err(RouteError::NodeNotFound(n2))
        );
    }
}
