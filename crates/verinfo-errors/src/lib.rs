/*
 * Error types shared by the verinfo library and CLI.
 *
 * This crate uses:
 * 1. snafu: For the error definitions and context selectors.
 * 2. miette: For terminal diagnostics with source snippets.
 * 3. tracing + serde: For a machine-readable summary logged on failure.
 */

pub mod types;

use miette::Diagnostic;
use serde::Serialize;
use tracing::error;

pub use miette::Result as CliResult;
pub use types::*;

pub type VerResult<T> = std::result::Result<T, VerError>;

/// Flat, serializable view of a [`VerError`].
#[derive(Debug, Serialize)]
pub struct ErrorSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

pub trait SummaryExt {
    fn to_summary(&self) -> ErrorSummary;
}

impl SummaryExt for VerError {
    fn to_summary(&self) -> ErrorSummary {
        let summary = ErrorSummary {
            code: self.code().map(|c| c.to_string()),
            title: self.to_string(),
            help: self.help().map(|h| h.to_string()),
        };

        error!(
            code = summary.code.as_deref(),
            title = %summary.title,
            "verinfo failed"
        );

        summary
    }
}

/// Converts a byte range reported by a parser into a label span.
pub fn span_of(range: Option<std::ops::Range<usize>>) -> Option<miette::SourceSpan> {
    range.map(|r| (r.start, r.end.saturating_sub(r.start)).into())
}
