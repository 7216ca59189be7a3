pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands};
pub use output::{DetectionReport, OutputFormat, OutputFormatter};
