//! Canonicalize command implementation.

use std::io::{self, Write};

use strata_report::TempFileManager;

use crate::commands::{read_input, report_for};

pub fn run(
    input: Option<String>,
    temp_dir: Option<String>,
    max_in_memory: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = read_input(input)?;
    let mut report = report_for(bytes);

    let tempfiles = match temp_dir {
        Some(dir) => Some(
            TempFileManager::new(&dir)
                .map_err(|e| format!("Failed to open temp dir {}: {}", dir, e))?,
        ),
        None => None,
    };

    report
        .ensure_canonicalized(tempfiles.as_ref(), max_in_memory.unwrap_or(u64::MAX))
        .map_err(|e| format!("Canonicalization failed: {}", e))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report
        .writable()
        .write_to(&mut out)
        .map_err(|e| format!("Failed to write canonical bytes: {}", e))?;
    out.write_all(b"\n")?;
    Ok(())
}
