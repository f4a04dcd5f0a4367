//! Engine configuration module

pub mod engine_config;
pub mod null_handling;

pub use engine_config::*;
pub use null_handling::*;
