pub mod cli;
pub mod config;
pub mod error;
pub mod persistence;
pub mod render;
pub mod simulation;
pub mod world;
