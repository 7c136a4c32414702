pub mod simulation;
pub mod worldgen;
