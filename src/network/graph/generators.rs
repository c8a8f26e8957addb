//! Random graph models used to build the initial topology.

use std::collections::BTreeSet;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;

use super::TopologyError;

/// The default Waxman `alpha`.
const WAXMAN_DEFAULT_ALPHA: f64 = 0.4;
/// The default Waxman `beta`.
const WAXMAN_DEFAULT_BETA: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyModel {
    BarabasiAlbert,
    Waxman,
}

impl FromStr for TopologyModel {
    type Err = UnsupportedModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // accept "barabasi_albert", "barabasi-albert", "BarabasiAlbert", etc
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "barabasialbert" => Ok(Self::BarabasiAlbert),
            "waxman" => Ok(Self::Waxman),
            _ => Err(UnsupportedModelError(s.to_string())),
        }
    }
}

impl std::fmt::Display for TopologyModel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::BarabasiAlbert => write!(f, "barabasi_albert"),
            Self::Waxman => write!(f, "waxman"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedModelError(pub String);

impl std::error::Error for UnsupportedModelError {}

impl std::fmt::Display for UnsupportedModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unsupported network model '{}' (expected 'barabasi_albert' or 'waxman')",
            self.0
        )
    }
}

/// Untyped model parameters, as they come from the configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelParams {
    pub n: Option<u32>,
    pub m: Option<u32>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelParamsError {
    Missing {
        model: TopologyModel,
        param: &'static str,
    },
    OutOfRange {
        model: TopologyModel,
        param: &'static str,
        value: f64,
        expected: &'static str,
    },
}

impl std::error::Error for ModelParamsError {}

impl std::fmt::Display for ModelParamsError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Missing { model, param } => {
                write!(f, "The {model} model requires parameter '{param}'")
            }
            Self::OutOfRange {
                model,
                param,
                value,
                expected,
            } => write!(
                f,
                "The {model} parameter '{param}' is {value}, but must be {expected}"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerateError {
    UnsupportedModel(UnsupportedModelError),
    InvalidParams(ModelParamsError),
    Topology(TopologyError),
}

impl std::error::Error for GenerateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UnsupportedModel(e) => Some(e),
            Self::InvalidParams(e) => Some(e),
            Self::Topology(e) => Some(e),
        }
    }
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::UnsupportedModel(e) => write!(f, "{e}"),
            Self::InvalidParams(e) => write!(f, "{e}"),
            Self::Topology(e) => write!(f, "Generated graph is invalid: {e}"),
        }
    }
}

impl From<UnsupportedModelError> for GenerateError {
    fn from(e: UnsupportedModelError) -> Self {
        Self::UnsupportedModel(e)
    }
}

impl From<ModelParamsError> for GenerateError {
    fn from(e: ModelParamsError) -> Self {
        Self::InvalidParams(e)
    }
}

impl From<TopologyError> for GenerateError {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}

/// The nodes (`0..num_nodes`) and edges produced by a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedGraph {
    pub num_nodes: u32,
    pub edges: Vec<(u32, u32)>,
}

/// A random graph model with validated parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GraphGenerator {
    BarabasiAlbert { n: u32, m: u32 },
    Waxman { n: u32, alpha: f64, beta: f64 },
}

impl GraphGenerator {
    pub fn new(model: TopologyModel, params: &ModelParams) -> Result<Self, ModelParamsError> {
        let missing = |param| ModelParamsError::Missing { model, param };
        let out_of_range = |param, value, expected| ModelParamsError::OutOfRange {
            model,
            param,
            value,
            expected,
        };

        let n = params.n.ok_or_else(|| missing("n"))?;
        if n < 1 {
            return Err(out_of_range("n", n.into(), "at least 1"));
        }

        match model {
            TopologyModel::BarabasiAlbert => {
                let m = params.m.ok_or_else(|| missing("m"))?;
                if m < 1 || m >= n {
                    return Err(out_of_range("m", m.into(), "in the range [1, n)"));
                }
                Ok(Self::BarabasiAlbert { n, m })
            }
            TopologyModel::Waxman => {
                let alpha = params.alpha.unwrap_or(WAXMAN_DEFAULT_ALPHA);
                let beta = params.beta.unwrap_or(WAXMAN_DEFAULT_BETA);
                // written so that NaN is rejected
                if !(alpha > 0.0 && alpha <= 1.0) {
                    return Err(out_of_range("alpha", alpha, "in the range (0, 1]"));
                }
                if !(beta > 0.0 && beta <= 1.0) {
                    return Err(out_of_range("beta", beta, "in the range (0, 1]"));
                }
                Ok(Self::Waxman { n, alpha, beta })
            }
        }
    }

    pub fn model(&self) -> TopologyModel {
        match self {
            Self::BarabasiAlbert { .. } => TopologyModel::BarabasiAlbert,
            Self::Waxman { .. } => TopologyModel::Waxman,
        }
    }

    pub fn num_nodes(&self) -> u32 {
        match self {
            Self::BarabasiAlbert { n, .. } | Self::Waxman { n, .. } => *n,
        }
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> GeneratedGraph {
        let edges = match *self {
            Self::BarabasiAlbert { n, m } => barabasi_albert(n, m, rng),
            Self::Waxman { n, alpha, beta } => waxman(n, alpha, beta, rng),
        };

        GeneratedGraph {
            num_nodes: self.num_nodes(),
            edges,
        }
    }
}

/// Preferential attachment. Starts from a star on `m + 1` nodes, then links every following
/// node to `m` distinct existing nodes chosen with probability proportional to their degree.
fn barabasi_albert<R: Rng + ?Sized>(n: u32, m: u32, rng: &mut R) -> Vec<(u32, u32)> {
    assert!(m >= 1 && m < n);

    let mut edges: Vec<(u32, u32)> = (1..=m).map(|leaf| (0, leaf)).collect();

    // every node appears once per incident edge
    let mut repeated_nodes: Vec<u32> = edges.iter().flat_map(|&(a, b)| [a, b]).collect();

    for source in (m + 1)..n {
        let mut targets = BTreeSet::new();
        while targets.len() < m as usize {
            // 'repeated_nodes' always contains at least m + 1 distinct nodes
            targets.insert(*repeated_nodes.choose(rng).unwrap());
        }

        for &target in &targets {
            edges.push((source, target));
            repeated_nodes.push(target);
            repeated_nodes.push(source);
        }
    }

    edges
}

/// Waxman's geometric model. Nodes are placed uniformly in the unit square and each pair is
/// linked with probability `beta * exp(-d / (alpha * L))`, where `L` is the largest distance
/// between any two nodes.
fn waxman<R: Rng + ?Sized>(n: u32, alpha: f64, beta: f64, rng: &mut R) -> Vec<(u32, u32)> {
    let positions: Vec<(f64, f64)> = (0..n).map(|_| (rng.gen(), rng.gen())).collect();
    let distance = |a: usize, b: usize| {
        let (ax, ay) = positions[a];
        let (bx, by) = positions[b];
        (ax - bx).hypot(ay - by)
    };

    let pairs = move || {
        (0..n as usize).flat_map(move |a| ((a + 1)..n as usize).map(move |b| (a, b)))
    };

    let max_distance = pairs()
        .map(|(a, b)| distance(a, b))
        .fold(0.0, f64::max);

    pairs()
        .filter(|&(a, b)| {
            let probability = if max_distance > 0.0 {
                beta * (-distance(a, b) / (alpha * max_distance)).exp()
            } else {
                beta
            };
            rng.gen::<f64>() < probability
        })
        .map(|(a, b)| (a as u32, b as u32))
        .collect()
}
