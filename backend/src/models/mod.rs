pub mod market;
pub mod simulation;
pub mod strategy;
