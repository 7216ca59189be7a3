use miniogre::cli::commands::{CliArgs, Commands};
use miniogre::cli::handlers::{
    handle_build_base_image, handle_detect, handle_requirements, handle_run, handle_spinup,
};
use miniogre::{init_logging, LoggingConfig, VERSION};

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::from_cli(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("miniogre v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Run(run_args) => handle_run(run_args, args.quiet, args.verbose).await,
        Commands::Requirements(req_args) => handle_requirements(req_args, args.quiet).await,
        Commands::Detect(detect_args) => handle_detect(detect_args).await,
        Commands::Spinup(spinup_args) => handle_spinup(spinup_args).await,
        Commands::BuildBaseImage(base_args) => {
            handle_build_base_image(base_args, args.quiet, args.verbose).await
        }
    };

    std::process::exit(exit_code);
}
