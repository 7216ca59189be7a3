//! Utility modules for miniogre
//!
//! - Structured logging setup and configuration

pub mod logging;

pub use logging::{init_default, init_from_env, init_logging, LoggingConfig};
