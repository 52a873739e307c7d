//! Deterministic response text.
//!
//! The layout is three fixed sections, in order:
//!
//! ```text
//! Query: <prompt>
//!
//! Retrieved Information:
//! <description 1>
//! <description 2>
//!
//! Summary: Based on the retrieved data, here are the relevant insights.
//! ```
//!
//! Consumers may split on the section markers, so they never change.

use crate::error::Result;
use crate::types::Record;

/// Marker opening the echoed prompt.
pub const QUERY_MARKER: &str = "Query: ";

/// Marker opening the evidence block.
pub const EVIDENCE_MARKER: &str = "Retrieved Information:";

/// Closing summary line.
pub const SUMMARY_LINE: &str = "Summary: Based on the retrieved data, here are the relevant insights.";

/// Pure formatter: no I/O, no clock, no randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseComposer;

impl ResponseComposer {
    pub fn new() -> Self {
        Self
    }

    /// Render `prompt` and the records' descriptions, preserving record order.
    ///
    /// Fails with [`crate::Error::MalformedRecord`] on the first record
    /// without a text `description`.
    pub fn compose(&self, prompt: &str, records: &[Record]) -> Result<String> {
        let descriptions = records
            .iter()
            .map(Record::description)
            .collect::<Result<Vec<&str>>>()?;

        Ok(format!(
            "{QUERY_MARKER}{prompt}\n\n{EVIDENCE_MARKER}\n{}\n\n{SUMMARY_LINE}",
            descriptions.join("\n")
        ))
    }
}
