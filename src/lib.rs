//! miniogre - reproducible container environments inferred from source imports
//!
//! Given a project directory, miniogre infers the third-party packages the code
//! imports, pins them, and produces a ready-to-build container environment in a
//! dedicated directory inside the project.
//!
//! # Pipeline
//!
//! - **Scan**: list every project file, pruning VCS, cache and virtualenv directories
//! - **Detect**: dominant language from the extension histogram, web framework from
//!   `package.json` / `angular.json`
//! - **Imports**: top-level modules imported by Python sources and notebooks
//! - **Resolve**: module → package via installed metadata, the standard library
//!   list and the package registry
//! - **Lock**: pin each requirement with an external lock tool
//! - **Synthesize**: Dockerfile and shell profile in the environment directory
//! - **SBOM / build / run**: delegated to external tools and the container engine
//!
//! ```no_run
//! use miniogre::config::OgreConfig;
//! use miniogre::pipeline::{PipelineContext, PipelineOrchestrator, RunOptions, Workflow};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut context = PipelineContext::new(Path::new("."), OgreConfig::default())?
//!     .with_options(RunOptions { no_container: true, ..Default::default() });
//! let report = PipelineOrchestrator::new(None)
//!     .execute(Workflow::Run, &mut context)
//!     .await?;
//! println!("{} stages", report.stages.len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod dockerfile;
pub mod engine;
pub mod extractors;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod resolver;
pub mod stack;
pub mod util;

pub use config::{ConfigError, OgreConfig};
pub use pipeline::{PipelineContext, PipelineOrchestrator, RunReport, Workflow};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
