//! A discrete-event simulator that routes packets over randomly generated network topologies
//! which mutate while the simulation runs.

#![forbid(unsafe_code)]

pub mod core;
pub mod network;
pub mod utility;
