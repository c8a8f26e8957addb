pub mod configuration;
pub mod controller;
pub mod engine;
pub mod logger;
pub mod main;
pub mod sim_config;
pub mod sim_stats;
pub mod support;
pub mod work;
pub mod worker;
