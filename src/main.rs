//! Taproot CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "taproot")]
#[command(about = "Transitive dependency tree tracing for JavaScript projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Project root path (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace the dependency tree of the matching entry files
    Trace {
        /// Glob selecting entry files, relative to the project root
        #[arg(short, long, default_value = "**/*.js")]
        lineup: String,

        /// Write the tree to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON tree
        #[arg(short, long)]
        pretty: bool,

        /// Trace into vendored (node_modules) dependencies
        #[arg(long)]
        keep_vendored: bool,

        /// Skip the ES module syntax lowering stage
        #[arg(long)]
        no_module_syntax: bool,

        /// Report unresolvable specifiers instead of dropping them silently
        #[arg(long)]
        strict: bool,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "taproot={}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Trace {
            lineup,
            output,
            pretty,
            keep_vendored,
            no_module_syntax,
            strict,
        } => {
            commands::trace(
                cli.root,
                lineup,
                output,
                pretty,
                keep_vendored,
                no_module_syntax,
                strict,
            )
            .await
        }
        Commands::Version => {
            println!("Taproot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
