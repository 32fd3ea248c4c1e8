//! Core utilities and types shared across all Qualis crates

pub mod config;
pub mod types;
mod constants;

pub use config::*;
pub use constants::*;
pub use types::*;

// Re-export external dependencies
pub use chrono;
pub use serde;
pub use serde_json;
pub use thiserror;
