//! Outcome accounting for multi-file operations.
//!
//! Batch flows never abort on a single bad file. Each file either succeeds,
//! is skipped (usable input that lacks data, e.g. a photo without GPS), or
//! fails (unreadable input, codec errors). The report keeps the reasons keyed
//! by the original file name.

use std::fmt;

use crate::error::Error;

/// One skipped or failed file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct BatchIssue {
    pub file: String,
    pub reason: String,
}

impl fmt::Display for BatchIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file, self.reason)
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct BatchReport {
    pub succeeded: usize,
    pub skipped: Vec<BatchIssue>,
    pub failed: Vec<BatchIssue>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_skip(&mut self, file: impl Into<String>, reason: impl Into<String>) {
        let issue = BatchIssue {
            file: file.into(),
            reason: reason.into(),
        };
        log::info!("skipped {issue}");
        self.skipped.push(issue);
    }

    pub fn record_failure(&mut self, file: impl Into<String>, error: &Error) {
        let issue = BatchIssue {
            file: file.into(),
            reason: error.to_string(),
        };
        log::warn!("failed {issue}");
        self.failed.push(issue);
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }

    /// Skipped and failed entries, in that order.
    pub fn issues(&self) -> impl Iterator<Item = &BatchIssue> {
        self.skipped.iter().chain(self.failed.iter())
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} skipped, {} failed",
            self.succeeded,
            self.skipped.len(),
            self.failed.len()
        )
    }
}
