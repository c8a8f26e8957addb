pub mod simulation_time;
