pub mod market_handler;
pub mod simulation_handler;
