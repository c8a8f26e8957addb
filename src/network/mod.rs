//! The simulated network.
//!
//! This contains the mutable topology that packets travel over, the random graph models used to
//! build it, and shortest-path routing.

pub mod graph;
pub mod router;
