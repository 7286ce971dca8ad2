//! Tandem CLI - controller front-end for the engine dispatch layer.

mod affordance;
mod colors;
mod compare;
mod handlers;
mod probe;
mod run;
mod session;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tandem_core::{EngineKind, ProblemParams};

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Capability-negotiated engine loading and dispatch")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report host capabilities
    Probe,

    /// List the published handlers
    Handlers {
        /// Print the registry manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one engine build
    Run {
        /// Engine build to activate
        #[arg(long, default_value = "standard")]
        variant: EngineKind,

        #[command(flatten)]
        params: ParamsArgs,

        /// Write the raw RGBA payload to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run both builds and compare their payloads
    Compare {
        #[command(flatten)]
        params: ParamsArgs,
    },
}

#[derive(Args)]
struct ParamsArgs {
    /// Image width in pixels
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Iteration limit per pixel
    #[arg(long, default_value_t = 1000)]
    max_iterations: u32,
}

impl From<ParamsArgs> for ProblemParams {
    fn from(args: ParamsArgs) -> Self {
        ProblemParams::new(args.width, args.height, args.max_iterations)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Probe => probe::execute(config).await?,

        Commands::Handlers { json } => handlers::execute(config, json).await?,

        Commands::Run {
            variant,
            params,
            output,
        } => {
            run::execute(config, variant, params.into(), output.as_deref()).await?;
        }

        Commands::Compare { params } => compare::execute(config, params.into()).await?,
    }

    Ok(())
}
