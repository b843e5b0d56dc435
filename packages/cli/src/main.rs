mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, run, CheckArgs, RunArgs};
use tracing_subscriber::EnvFilter;

/// Scribe CLI - drive the rich-text editing engine from JSON
#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a command script against a document and print the result
    Run(RunArgs),

    /// Validate a document against the configured schema
    Check(CheckArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| {
            let cwd = cwd.display().to_string();
            match cli.command {
                Command::Run(args) => run(args, &cwd),
                Command::Check(args) => check(args, &cwd),
            }
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
