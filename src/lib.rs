pub mod cli;
pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod listing;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod prompt;
pub mod sanitize;

pub use error::{OptimizerError, Result};
