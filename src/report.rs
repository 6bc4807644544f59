//! Serializable reports of a run.

use crate::core::recovery::RecoveredString;
use serde::Serialize;

/// One recovered call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveredEntry {
    pub file: String,
    pub line: usize,
    pub identifier: i64,
    /// Decoded text; unpaired surrogates are replaced.
    pub text: String,
    /// Escaped literal body as written back into the source.
    pub literal: String,
}

impl RecoveredEntry {
    pub fn new(file: &str, line: usize, string: &RecoveredString) -> Self {
        Self {
            file: file.to_string(),
            line,
            identifier: string.identifier,
            text: string.to_text(),
            literal: string.to_literal(),
        }
    }
}

/// Every string recovered from a corpus, plus the units that failed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StringReport {
    pub target: String,
    pub chunk_field: String,
    pub strings: Vec<RecoveredEntry>,
    pub problems: Vec<(String, String)>,
}

impl StringReport {
    /// The `[<hex-id>]:<text>` listing, one line per string.
    pub fn listing(&self) -> Vec<String> {
        self.strings
            .iter()
            .map(|e| {
                format!(
                    "[{}]:{}",
                    crate::utils::helpers::format_identifier(e.identifier),
                    e.text
                )
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "target": self.target,
            "chunk_field": self.chunk_field,
            "strings": self.strings,
            "problems": self.problems,
        })
    }
}

/// Outcome of a rewrite pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub units: usize,
    pub rewritten: usize,
    pub strings: usize,
    pub problems: Vec<(String, String)>,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.problems.len()
    }
}
