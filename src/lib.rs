pub mod cleaner;
pub mod configuration;
pub mod domain;
pub mod repository;
pub mod telemetry;
mod utils;

pub use utils::*;
