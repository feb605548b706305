//! Vehicle list input.

use crate::Result;
use std::path::Path;
use tracing::info;

/// Read MVAs from a text or CSV file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let mvas = parse(&content);
    info!(target: "MVA", verbosity = "MED", "loaded {} MVAs from {}", mvas.len(), path.display());
    Ok(mvas)
}

/// One MVA per line, first CSV column only. `#` comments and blank lines are skipped.
pub fn parse(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split(',').next().unwrap_or_default().trim())
        .filter(|mva| !mva.is_empty() && !mva.starts_with('#'))
        .map(String::from)
        .collect()
}
