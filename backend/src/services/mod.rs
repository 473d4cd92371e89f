pub mod market_data;
pub mod price_poller;
pub mod session_manager;
pub mod simulation_engine;
pub mod strategy_generator;
