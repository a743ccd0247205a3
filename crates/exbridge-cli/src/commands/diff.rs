//! Diff command
//!
//! Usage: exbridge diff <OLD> <NEW> [--json] [--output <FILE>]

use clap::Args;
use exbridge_core::diff::{compute_diff, render_human_summary};
use exbridge_core::errors::BridgeError;
use exbridge_core::snapshot::{parse_bytes, Document, Snapshot};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Previous exchange file
    pub old: PathBuf,

    /// New exchange file
    pub new: PathBuf,

    /// Print the diff as JSON instead of a Markdown summary
    #[arg(long)]
    pub json: bool,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute diff command
pub fn execute(args: DiffArgs) -> Result<(), Box<dyn std::error::Error>> {
    let previous = Snapshot::from_document(load(&args.old)?);
    let next = load(&args.new)?;

    let diff = compute_diff(&previous, &next);
    let rendered = if args.json {
        let mut json = serde_json::to_string_pretty(&diff)?;
        json.push('\n');
        json
    } else {
        render_human_summary(&diff)
    };

    if let Some(output_path) = args.output {
        std::fs::write(&output_path, rendered).map_err(|e| BridgeError::io(&output_path, &e))?;
        println!("✓ Diff written to {}", output_path.display());
    } else {
        print!("{}", rendered);
    }

    Ok(())
}

fn load(path: &Path) -> Result<Document, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path).map_err(|e| BridgeError::io(path, &e))?;
    let document = parse_bytes(&bytes).map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(document)
}
