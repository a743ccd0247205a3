//! exbridge CLI
//!
//! Serves the keys of an exchanged JSON snapshot over HTTP

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod http;
mod subscriber;

#[derive(Debug, Parser)]
#[command(name = "exbridge")]
#[command(about = "exbridge - JSON snapshot exchange bridge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Watch the exchange file and serve its keys over HTTP
    Serve(commands::serve::ServeArgs),
    /// Compare two exchange files key by key
    Diff(commands::diff::DiffArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args),
        Commands::Diff(args) => commands::diff::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
