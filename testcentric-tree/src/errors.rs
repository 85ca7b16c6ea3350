// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the test tree.
//!
//! None of these reach the user through the presenter: each is logged and recovered from
//! locally. They are public so that callers outside the presenter (such as the command line
//! tool) can report them.

use camino::Utf8PathBuf;
pub use display_error_chain::DisplayErrorChain;
use thiserror::Error;

/// An error that occurs while reading a settings file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings file at `{path}`")]
    Read {
        /// The path to the settings file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The settings file is not valid TOML, or has values of the wrong type.
    #[error("failed to parse settings file at `{path}`")]
    Parse {
        /// The path to the settings file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: toml::de::Error,
    },
}

/// An error that occurs while loading or saving visual state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VisualStateError {
    /// The visual state file could not be read.
    #[error("failed to read visual state at `{path}`")]
    Read {
        /// The path to the visual state file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The visual state file is corrupt.
    #[error("failed to deserialize visual state at `{path}`")]
    Deserialize {
        /// The path to the visual state file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// The visual state file was written by an incompatible version.
    #[error("visual state at `{path}` has version {actual}, expected {expected}")]
    VersionMismatch {
        /// The path to the visual state file.
        path: Utf8PathBuf,

        /// The version this build reads and writes.
        expected: u32,

        /// The version found in the file.
        actual: u32,
    },

    /// The visual state could not be serialized.
    #[error("failed to serialize visual state")]
    Serialize {
        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// The visual state could not be written.
    #[error("failed to write visual state to `{path}`")]
    Write {
        /// The path to the visual state file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: atomicwrites::Error<std::io::Error>,
    },
}

/// An unknown display strategy id was requested.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error(
    "unknown display format `{input}` (known formats: NUNIT_TREE, FIXTURE_LIST, TEST_LIST)"
)]
pub struct UnknownStrategyError {
    /// The input that failed to parse.
    pub input: String,
}

/// An unknown grouping key was requested.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown grouping `{input}` (known groupings: ASSEMBLY, CATEGORY, OUTCOME, DURATION)")]
pub struct UnknownGroupingError {
    /// The input that failed to parse.
    pub input: String,
}

/// An unknown settings key was passed to [`SettingChange::from_key`](crate::SettingChange::from_key).
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum SettingChangeError {
    /// The key is not one of the test tree settings.
    #[error("unknown test tree setting `{key}`")]
    UnknownKey {
        /// The key.
        key: String,
    },

    /// The value could not be parsed for this key.
    #[error("invalid value `{value}` for setting `{key}`")]
    InvalidValue {
        /// The key.
        key: String,

        /// The value.
        value: String,
    },

    /// The key names a display format that is not known.
    #[error(transparent)]
    UnknownStrategy(#[from] UnknownStrategyError),

    /// The key names a grouping that is not known.
    #[error(transparent)]
    UnknownGrouping(#[from] UnknownGroupingError),
}
