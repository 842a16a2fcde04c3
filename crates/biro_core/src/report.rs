//! crates/biro_core/src/report.rs
//!
//! Decoding of evaluation reports and uploaded files.
//!
//! Both arrive as base64 strings. Reports are additionally parsed as JSON; the
//! outcome of that parse is decided once, here, and recorded in the `Report`
//! variant. Decoding never fails: malformed payloads degrade to text.

use base64::{prelude::BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::domain::{EncodedFile, SubmissionFile};

/// One node of a report's score tree. Groups carry child tests, leaves don't.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportTest {
    pub name: String,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub passed: Option<bool>,
    pub message: Option<String>,
    pub tests: Vec<ReportTest>,
}

impl ReportTest {
    pub fn is_group(&self) -> bool {
        !self.tests.is_empty()
    }

    /// Own score for a leaf, summed children for a group without one.
    pub fn total_score(&self) -> f64 {
        match self.score {
            Some(score) => score,
            None => self.tests.iter().map(ReportTest::total_score).sum(),
        }
    }

    pub fn total_max_score(&self) -> f64 {
        match self.max_score {
            Some(max) => max,
            None => self.tests.iter().map(ReportTest::total_max_score).sum(),
        }
    }
}

/// Structured evaluation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportContent {
    pub report_type: String,
    #[serde(default)]
    pub tests: Vec<ReportTest>,
}

impl ReportContent {
    pub fn total_score(&self) -> f64 {
        self.tests.iter().map(ReportTest::total_score).sum()
    }

    pub fn total_max_score(&self) -> f64 {
        self.tests.iter().map(ReportTest::total_max_score).sum()
    }
}

/// A decoded report: either the structured score tree or free text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Text { content: String },
    Structured { tree: ReportContent },
}

impl Report {
    /// Decodes a base64 report payload.
    pub fn decode(payload: &str) -> Self {
        let text = decode_text(payload);
        match serde_json::from_str::<ReportContent>(&text) {
            Ok(tree) => Report::Structured { tree },
            Err(_) => Report::Text { content: text },
        }
    }

    pub fn as_structured(&self) -> Option<&ReportContent> {
        match self {
            Report::Structured { tree } => Some(tree),
            Report::Text { .. } => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Report::Text { content } => Some(content),
            Report::Structured { .. } => None,
        }
    }
}

/// A report together with the filename it was shipped under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedReport {
    pub filename: String,
    pub report: Report,
}

impl From<EncodedFile> for NamedReport {
    fn from(file: EncodedFile) -> Self {
        Self {
            report: Report::decode(&file.content),
            filename: file.filename,
        }
    }
}

impl From<EncodedFile> for SubmissionFile {
    fn from(file: EncodedFile) -> Self {
        Self {
            content: decode_text(&file.content),
            filename: file.filename,
        }
    }
}

/// Base64 then UTF-8 decoding of a payload.
///
/// A payload that is not valid base64 is kept as-is; bytes that are not valid
/// UTF-8 are replaced rather than rejected.
pub fn decode_text(payload: &str) -> String {
    // The portal sometimes wraps long payloads.
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    match BASE64_STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => payload.to_string(),
    }
}
