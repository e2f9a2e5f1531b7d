//! Subcommand implementations.

pub mod canonicalize;
pub mod check;
pub mod digest;
pub mod extract;
pub mod relabel;

use std::io::{self, Read};

use strata_canonical::InMemoryDocument;
use strata_report::{MetadataSelection, SubsetSelection, ValidationReport};

/// Reads input bytes from a file, or from stdin when no path is given.
pub fn read_input(input: Option<String>) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if let Some(path) = input {
        Ok(std::fs::read(&path).map_err(|e| format!("Failed to read file {}: {}", path, e))?)
    } else {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

/// Wraps raw document bytes in a minimal valid report.
pub fn report_for(bytes: Vec<u8>) -> ValidationReport {
    ValidationReport::new(
        Box::new(InMemoryDocument::new(bytes)),
        "cli.Document-0.1",
        Vec::new(),
        SubsetSelection::default(),
        MetadataSelection::default(),
        Vec::new(),
    )
}
