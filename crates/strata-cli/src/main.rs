//! Strata CLI - Command-line interface for document canonicalization,
//! relabeling, and subset extraction.

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{canonicalize, check, digest, extract, relabel};

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Strata typed-document canonicalization and extraction CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show canonical bytes for input JSON
    Canonicalize {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Spill directory for documents above the in-memory threshold
        #[arg(long)]
        temp_dir: Option<String>,
        /// Sort in memory only up to SIZE bytes (default: unlimited)
        #[arg(long)]
        max_in_memory: Option<u64>,
    },
    /// Report whether input JSON is already canonical
    Check {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compute the content digest of input JSON
    Digest {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
    },
    /// Extract the searchable subset and metadata from input JSON
    Extract {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Selection specification file (fields/keys trees)
        #[arg(long)]
        selection: String,
        /// Metadata specification file (name to dotted path)
        #[arg(long)]
        metadata: Option<String>,
        /// Fail extraction beyond SIZE bytes (default: unlimited)
        #[arg(long)]
        max_bytes: Option<u64>,
    },
    /// Substitute absolute ids into input JSON
    Relabel {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Identifier occurrence file (validator output)
        #[arg(long)]
        refs: String,
        /// Original-id to absolute-id mapping file
        #[arg(long)]
        mapping: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Canonicalize {
            input,
            temp_dir,
            max_in_memory,
        } => canonicalize::run(input, temp_dir, max_in_memory),
        Commands::Check { input, json } => check::run(input, json),
        Commands::Digest { input } => digest::run(input),
        Commands::Extract {
            input,
            selection,
            metadata,
            max_bytes,
        } => extract::run(input, selection, metadata, max_bytes),
        Commands::Relabel {
            input,
            refs,
            mapping,
        } => relabel::run(input, refs, mapping),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
