// Command line host for action flows
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use std::io::stderr;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

mod cmd;
mod console;

use cmd::check::CheckArgs;
use cmd::run::RunArgs;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run server-driven UI action flows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output - shows per-action logs
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Executes a flow, printing each effect as a JSON line.
    Run(RunArgs),
    /// Parses a flow and prints its normalized form.
    Check(CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info for our crates, debug with --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let default_directives = format!(
        "sprig={level},sprig_actions={level},sprig_expr={level},reqwest=warn,hyper=warn,rustls=warn"
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    // Logs go to stderr so stdout stays machine readable
    registry()
        .with(filter)
        .with(fmt::layer().with_writer(stderr))
        .init();
    debug!("Logger initialized");

    let result = match cli.command {
        Commands::Run(args) => cmd::run::run_flow(args).await,
        Commands::Check(args) => cmd::check::check_flow(args),
    };
    if let Err(e) = &result {
        error!("Command failed: {:#}", e);
    }
    result
}
