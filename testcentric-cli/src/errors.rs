// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::error::Error;
use testcentric_model::MalformedResultError;
use testcentric_tree::errors::{SettingsError, VisualStateError};
use thiserror::Error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Exit codes returned by `testtree`.
pub enum TestTreeExitCode {}

impl TestTreeExitCode {
    /// The tree was shown.
    pub const OK: i32 = 0;

    /// The settings file could not be read.
    pub const SETUP_ERROR: i32 = 96;

    /// The result document could not be read or parsed.
    pub const DOCUMENT_ERROR: i32 = 97;

    /// Writing the tree or the visual state failed.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

// The #[error()] strings are placeholders. Errors are printed with display_to_stderr, which
// colorizes them.

/// An error that `testtree` reports to the user instead of panicking.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("settings error")]
    Settings {
        #[from]
        err: SettingsError,
    },
    #[error("failed to read result document")]
    DocumentRead {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to parse result document")]
    DocumentParse {
        path: Utf8PathBuf,
        #[source]
        err: MalformedResultError,
    },
    #[error("failed to write visual state")]
    VisualStateSave {
        path: Utf8PathBuf,
        #[source]
        err: VisualStateError,
    },
    #[error("failed to write tree")]
    WriteTree {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::Settings { .. } => TestTreeExitCode::SETUP_ERROR,
            Self::DocumentRead { .. } | Self::DocumentParse { .. } => {
                TestTreeExitCode::DOCUMENT_ERROR
            }
            Self::VisualStateSave { .. } | Self::WriteTree { .. } => {
                TestTreeExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::Settings { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::DocumentRead { path, err } => {
                tracing::error!(
                    "failed to read result document `{}`",
                    path.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::DocumentParse { path, err } => {
                tracing::error!(
                    "failed to parse result document `{}`",
                    path.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::VisualStateSave { path, err } => {
                tracing::error!(
                    "failed to write visual state to `{}`",
                    path.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::WriteTree { err } => {
                tracing::error!("failed to write tree to stdout");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            tracing::error!(target: NO_HEADING, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
