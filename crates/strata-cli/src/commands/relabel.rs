//! Relabel command implementation.

use std::collections::BTreeMap;

use strata_canonical::InMemoryDocument;
use strata_idref::IdReference;
use strata_report::{MetadataSelection, SubsetSelection, ValidationReport};

use crate::commands::read_input;
use crate::output;

pub fn run(
    input: Option<String>,
    refs: String,
    mapping: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let refs_str = std::fs::read_to_string(&refs)
        .map_err(|e| format!("Failed to read refs file {}: {}", refs, e))?;
    let refs: Vec<IdReference> = serde_json::from_str(&refs_str)
        .map_err(|e| format!("Invalid identifier occurrences: {}", e))?;

    let mapping_str = std::fs::read_to_string(&mapping)
        .map_err(|e| format!("Failed to read mapping file {}: {}", mapping, e))?;
    let mapping: BTreeMap<String, String> = serde_json::from_str(&mapping_str)
        .map_err(|e| format!("Invalid id mapping: {}", e))?;

    let bytes = read_input(input)?;
    let mut report = ValidationReport::new(
        Box::new(InMemoryDocument::new(bytes)),
        "cli.Document-0.1",
        Vec::new(),
        SubsetSelection::default(),
        MetadataSelection::default(),
        refs,
    );
    report
        .set_absolute_id_mapping(mapping)
        .map_err(|e| format!("Failed to set id mapping: {}", e))?;

    let value = report
        .relabeled_value()
        .map_err(|e| format!("Relabeling failed: {}", e))?;
    println!("{}", output::format_json(&value));
    Ok(())
}
