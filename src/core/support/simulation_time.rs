/*!
Values for working with time in simulation units.

Simulation time is an abstract, real-valued quantity: it has the same unit as link latency
weights, so a packet that arrives at time `t` and follows a path of weight `w` departs at
`t + w`. Wall-clock time is never mixed in.
*/

use std::cmp::Ordering;

use serde::Serialize;

/// An instant on the simulation clock. Always finite and non-negative.
#[derive(Copy, Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct SimulationTime(f64);

impl SimulationTime {
    pub const ZERO: SimulationTime = SimulationTime(0.0);

    /// Returns `None` if `val` is negative, infinite, or NaN.
    pub fn new(val: f64) -> Option<Self> {
        if !val.is_finite() || val < 0.0 {
            return None;
        }
        // normalize -0.0 so that equal times compare equal bitwise as well
        Some(Self(val + 0.0))
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// The time `delta` units after `self`. Returns `None` if the result would not be a valid
    /// time (for example if `delta` is negative enough to move before zero).
    pub fn checked_add(&self, delta: f64) -> Option<Self> {
        Self::new(self.0 + delta)
    }
}

impl PartialEq for SimulationTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimulationTime {}

impl PartialOrd for SimulationTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimulationTime {
    fn cmp(&self, other: &Self) -> Ordering {
        // NaN is rejected at construction, so this agrees with the usual float order
        self.0.total_cmp(&other.0)
    }
}

impl std::fmt::Display for SimulationTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

impl TryFrom<f64> for SimulationTime {
    type Error = InvalidTimeError;

    fn try_from(val: f64) -> Result<Self, Self::Error> {
        Self::new(val).ok_or(InvalidTimeError(val))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidTimeError(pub f64);

impl std::error::Error for InvalidTimeError {}

impl std::fmt::Display for InvalidTimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} is not a valid simulation time", self.0)
    }
}
