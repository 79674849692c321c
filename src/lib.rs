pub mod cli;
pub mod error;
pub mod node;
pub mod settings;
pub mod simulation;
pub mod transport;
