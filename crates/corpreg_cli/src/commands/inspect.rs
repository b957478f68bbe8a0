//! Inspect command implementation.

use corpreg_core::{Company, DurableLog};
use std::collections::HashSet;
use std::path::Path;

/// Summary of a registry CSV file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FileSummary {
    /// Rows in the file.
    pub rows: usize,
    /// Rows whose name appeared earlier in the file.
    pub duplicate_names: usize,
    /// Rows whose tax id appeared earlier in the file.
    pub duplicate_tax_ids: usize,
}

/// Runs the inspect command.
pub fn run(file: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("file not found: {}", file.display()).into());
    }

    let records = DurableLog::open_file(file)?.load_all()?;
    let summary = summarize(&records);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        "text" => {
            println!("Registry file {:?}", file);
            println!();
            for c in &records {
                println!(
                    "  {:<32} inn={:<14} phone={:<16} individual={}",
                    c.name, c.tax_id, c.phone, c.individual
                );
            }
            println!();
            println!("  Rows:                {}", summary.rows);
            println!("  Duplicate names:     {}", summary.duplicate_names);
            println!("  Duplicate tax ids:   {}", summary.duplicate_tax_ids);
        }
        other => return Err(format!("unknown format: {other}").into()),
    }

    Ok(())
}

/// Counts rows and key repeats.
pub fn summarize(records: &[Company]) -> FileSummary {
    let mut names = HashSet::new();
    let mut tax_ids = HashSet::new();
    let mut summary = FileSummary {
        rows: records.len(),
        ..FileSummary::default()
    };

    for c in records {
        if !names.insert(c.name.as_str()) {
            summary.duplicate_names += 1;
        }
        if !tax_ids.insert(c.tax_id.as_str()) {
            summary.duplicate_tax_ids += 1;
        }
    }
    summary
}
