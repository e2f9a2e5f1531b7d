//! Extract command implementation.

use serde_json::Value;

use strata_canonical::InMemoryDocument;
use strata_report::{MetadataSelection, SubsetSelection, ValidationReport};

use crate::commands::read_input;
use crate::output;

pub fn run(
    input: Option<String>,
    selection: String,
    metadata: Option<String>,
    max_bytes: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let selection_str = std::fs::read_to_string(&selection)
        .map_err(|e| format!("Failed to read selection file {}: {}", selection, e))?;
    let selection: SubsetSelection = serde_json::from_str(&selection_str)
        .map_err(|e| format!("Invalid selection: {}", e))?;

    let metadata: MetadataSelection = match metadata {
        Some(path) => {
            let s = std::fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read metadata file {}: {}", path, e))?;
            serde_json::from_str(&s).map_err(|e| format!("Invalid metadata selection: {}", e))?
        }
        None => MetadataSelection::default(),
    };

    let bytes = read_input(input)?;
    let report = ValidationReport::new(
        Box::new(InMemoryDocument::new(bytes)),
        "cli.Document-0.1",
        Vec::new(),
        selection,
        metadata,
        Vec::new(),
    );

    let extraction = report
        .extract_subset_and_metadata(max_bytes.unwrap_or(u64::MAX))
        .map_err(|e| format!("Extraction failed: {}", e))?;

    let metadata_value: Value = extraction
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect::<serde_json::Map<String, Value>>()
        .into();
    println!(
        "{}",
        output::format_json(&serde_json::json!({
            "subset": extraction.subset,
            "metadata": metadata_value,
        }))
    );
    Ok(())
}
