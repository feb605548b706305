//! Check a run's log against the MVA list it was given.

use crate::{Error, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

/// Marker the runner logs once per vehicle.
const STARTED_MVA: &str = r"started MVA (\S+)";

/// Which expected MVAs a log shows as processed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub expected: BTreeSet<String>,
    pub found: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    /// In the log but not in the list.
    pub unexpected: BTreeSet<String>,
    /// `found / expected`, 0 for an empty list.
    pub success_rate: f64,
}

impl ValidationReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Fail with [`Error::Validation`] when any expected MVA is missing.
    pub fn require_all(&self) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }
        let missing: Vec<&str> = self.missing.iter().map(String::as_str).collect();
        Err(Error::Validation(format!(
            "{}/{} MVAs were not processed: {}",
            self.missing.len(),
            self.expected.len(),
            missing.join(", ")
        )))
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Run Validation Report\n");
        let _ = writeln!(out, "## Summary");
        let _ = writeln!(out, "- **Expected MVAs**: {}", self.expected.len());
        let _ = writeln!(out, "- **Processed MVAs**: {}", self.found.len());
        let _ = writeln!(out, "- **Success Rate**: {:.1}%", self.success_rate * 100.0);
        let _ = writeln!(out, "- **Missing MVAs**: {}", self.missing.len());

        for (title, set) in [
            ("Processed", &self.found),
            ("Missing", &self.missing),
            ("Unexpected", &self.unexpected),
        ] {
            if set.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n## {}", title);
            for mva in set {
                let _ = writeln!(out, "- {}", mva);
            }
        }
        out
    }
}

/// MVAs named in `started MVA` markers of `log`.
pub fn processed_mvas(log: &str) -> Result<BTreeSet<String>> {
    let re = Regex::new(STARTED_MVA).map_err(|e| Error::Validation(e.to_string()))?;
    Ok(re
        .captures_iter(log)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect())
}

pub fn validate_log(expected: &[String], log: &str) -> Result<ValidationReport> {
    let expected: BTreeSet<String> = expected.iter().cloned().collect();
    let processed = processed_mvas(log)?;

    let found: BTreeSet<String> = expected.intersection(&processed).cloned().collect();
    let missing = expected.difference(&processed).cloned().collect();
    let unexpected = processed.difference(&expected).cloned().collect();
    let success_rate = if expected.is_empty() {
        0.0
    } else {
        found.len() as f64 / expected.len() as f64
    };

    Ok(ValidationReport {
        expected,
        found,
        missing,
        unexpected,
        success_rate,
    })
}

/// [`validate_log`] on a log file; a missing file reads as an empty log.
pub fn validate_file<P: AsRef<Path>>(expected: &[String], log_file: P) -> Result<ValidationReport> {
    let log = match std::fs::read_to_string(log_file.as_ref()) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    validate_log(expected, &log)
}
