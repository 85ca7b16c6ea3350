// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use testcentric_model::Severity;
use thiserror::Error;

/// The outcome categories offered by the outcome filter.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum OutcomeBucket {
    /// The test passed.
    Passed,
    /// The test failed.
    Failed,
    /// The test passed with a warning.
    Warning,
    /// The test has no result, or was skipped or inconclusive.
    NotRun,
}

impl OutcomeBucket {
    /// All buckets in display order.
    pub const ALL: [OutcomeBucket; 4] = [Self::Passed, Self::Failed, Self::Warning, Self::NotRun];

    /// Returns the bucket for a (possibly aggregated) severity. `None` means no result.
    pub fn from_severity(severity: Option<Severity>) -> Self {
        match severity {
            Some(Severity::Passed) => Self::Passed,
            Some(Severity::Failed) => Self::Failed,
            Some(Severity::Warning) => Self::Warning,
            Some(Severity::Skipped | Severity::Inconclusive) | None => Self::NotRun,
        }
    }

    /// Returns the label shown for this bucket.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::Warning => "Warning",
            Self::NotRun => "Not Run",
        }
    }
}

impl fmt::Display for OutcomeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeBucket {
    type Err = UnknownOutcomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            "warning" => Ok(Self::Warning),
            "notrun" => Ok(Self::NotRun),
            _ => Err(UnknownOutcomeError {
                input: s.to_owned(),
            }),
        }
    }
}

/// An unrecognized outcome bucket name.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unrecognized outcome `{input}` (known values: passed, failed, warning, not-run)")]
pub struct UnknownOutcomeError {
    input: String,
}
