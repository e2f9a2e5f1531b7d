//! Check command implementation.

use crate::commands::{read_input, report_for};
use crate::output;

pub fn run(input: Option<String>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = read_input(input)?;
    let mut report = report_for(bytes);
    let summary = report
        .ensure_canonicalized(None, u64::MAX)
        .map_err(|e| format!("Canonicalization failed: {}", e))?;

    if json {
        println!(
            "{}",
            output::format_json(&serde_json::json!({
                "already_canonical": summary.already_canonical,
                "bytes": summary.bytes,
            }))
        );
    } else if summary.already_canonical {
        println!("canonical ({} bytes)", summary.bytes);
    } else {
        println!("not canonical ({} bytes once sorted)", summary.bytes);
    }
    Ok(())
}
