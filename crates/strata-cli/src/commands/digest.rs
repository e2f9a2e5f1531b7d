//! Digest command implementation.

use strata_canonical::digest_canonical_bytes;

use crate::commands::{read_input, report_for};
use crate::output;

pub fn run(input: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = read_input(input)?;
    let mut report = report_for(bytes);
    report
        .ensure_canonicalized(None, u64::MAX)
        .map_err(|e| format!("Canonicalization failed: {}", e))?;

    let mut canonical = Vec::new();
    report
        .writable()
        .write_to(&mut canonical)
        .map_err(|e| format!("Failed to produce canonical bytes: {}", e))?;

    let digest = digest_canonical_bytes(&canonical);
    println!("{}", output::format_json(&serde_json::to_value(&digest)?));
    Ok(())
}
