use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod config;
mod error;
mod pandoc;
mod process_session;
mod subcommands;

/// Literate documents: chunk header preprocessing and code execution for pandoc
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite chunk headers into pandoc fenced attributes
    Preprocess(subcommands::preprocess::Args),

    /// Execute the code chunks of a pandoc JSON document read from stdin
    Stitch(subcommands::stitch::Args),
}

fn main() -> miette::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Preprocess(args) => subcommands::preprocess::run(args),
        Commands::Stitch(args) => subcommands::stitch::run(args),
    }
}
