// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage and retrieval of per-file visual state.
//!
//! Visual state is what the user would expect to find again after closing and reopening a test
//! file: the display format, groupings, filters, and which nodes were expanded, checked and
//! selected. It is stored as JSON next to the test file.

use crate::{
    display::VisualNodeKey,
    errors::{DisplayErrorChain, VisualStateError},
    settings::{Grouping, StrategyId},
    strategy::TreeState,
};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::BTreeSet, fs, io::Write};
use testcentric_filtering::OutcomeBucket;
use tracing::{debug, warn};

/// The visual state of one test file, serialized to disk.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct VisualState {
    /// Version of the file format.
    pub version: u32,

    /// The display strategy that was active. An unknown id in the file reads as `None`.
    #[serde(default, deserialize_with = "deserialize_strategy")]
    pub display_strategy: Option<StrategyId>,

    /// The test list grouping, if the test list was active. An unknown grouping reads as `None`.
    #[serde(default, deserialize_with = "deserialize_grouping")]
    pub test_list_group_by: Option<Grouping>,

    /// The fixture list grouping, if the fixture list was active.
    #[serde(default, deserialize_with = "deserialize_grouping")]
    pub fixture_list_group_by: Option<Grouping>,

    /// Whether check boxes were shown.
    #[serde(default)]
    pub show_check_boxes: bool,

    /// Whether durations were shown.
    #[serde(default)]
    pub show_test_duration: bool,

    /// Categories selected in the category filter.
    #[serde(default)]
    pub selected_categories: BTreeSet<String>,

    /// Whether the selected categories are excluded rather than included.
    #[serde(default)]
    pub exclude_categories: bool,

    /// Outcome buckets accepted by the outcome filter.
    #[serde(default)]
    pub outcome_filter: BTreeSet<OutcomeBucket>,

    /// The text filter.
    #[serde(default)]
    pub text_filter: String,

    /// Expanded nodes.
    #[serde(default)]
    pub expanded: BTreeSet<VisualNodeKey>,

    /// Checked nodes.
    #[serde(default)]
    pub checked: BTreeSet<VisualNodeKey>,

    /// The selected node.
    #[serde(default)]
    pub selected: Option<VisualNodeKey>,

    /// The topmost visible node.
    #[serde(default)]
    pub top_node: Option<VisualNodeKey>,
}

impl VisualState {
    /// Current version of the file format.
    pub const CURRENT_VERSION: u32 = 1;

    /// Creates an empty visual state at the current version.
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            ..Self::default()
        }
    }

    /// Loads visual state from `path`.
    ///
    /// Returns `Ok(None)` if the file does not exist or is empty.
    pub fn load(path: &Utf8Path) -> Result<Option<Self>, VisualStateError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!("visual state: no file at {path}");
                return Ok(None);
            }
            Err(error) => {
                return Err(VisualStateError::Read {
                    path: path.to_owned(),
                    error,
                });
            }
        };
        if contents.trim().is_empty() {
            debug!("visual state: empty file at {path}");
            return Ok(None);
        }

        let state: Self =
            serde_json::from_str(&contents).map_err(|error| VisualStateError::Deserialize {
                path: path.to_owned(),
                error,
            })?;
        if state.version != Self::CURRENT_VERSION {
            return Err(VisualStateError::VersionMismatch {
                path: path.to_owned(),
                expected: Self::CURRENT_VERSION,
                actual: state.version,
            });
        }

        debug!("visual state: loaded from {path}");
        Ok(Some(state))
    }

    /// Saves visual state to `path`, replacing any existing file atomically.
    pub fn save(&self, path: &Utf8Path) -> Result<(), VisualStateError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|error| VisualStateError::Serialize { error })?;

        atomicwrites::AtomicFile::new(path, atomicwrites::AllowOverwrite)
            .write(|file| file.write_all(contents.as_bytes()))
            .map_err(|error| VisualStateError::Write {
                path: path.to_owned(),
                error,
            })?;

        debug!("visual state: saved to {path}");
        Ok(())
    }

    /// Returns the tree part of this state.
    pub fn tree_state(&self) -> TreeState {
        TreeState {
            expanded: self.expanded.clone(),
            checked: self.checked.clone(),
            selected: self.selected.clone(),
            top: self.top_node.clone(),
        }
    }

    /// Replaces the tree part of this state.
    pub fn set_tree_state(&mut self, tree: TreeState) {
        self.expanded = tree.expanded;
        self.checked = tree.checked;
        self.selected = tree.selected;
        self.top_node = tree.top;
    }
}

/// Returns the visual state file for a test file: `<dir>/<stem>.VisualState.json`.
pub fn visual_state_file_name(test_file: &Utf8Path) -> Utf8PathBuf {
    let stem = test_file.file_stem().unwrap_or("tests");
    let file_name = format!("{stem}.VisualState.json");
    match test_file.parent() {
        Some(parent) => parent.join(file_name),
        None => Utf8PathBuf::from(file_name),
    }
}

fn deserialize_strategy<'de, D>(deserializer: D) -> Result<Option<StrategyId>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(s) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match s.parse() {
        Ok(id) => Ok(Some(id)),
        Err(error) => {
            warn!(
                "visual state: {}, ignoring saved display strategy",
                DisplayErrorChain::new(error)
            );
            Ok(None)
        }
    }
}

fn deserialize_grouping<'de, D>(deserializer: D) -> Result<Option<Grouping>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(s) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match s.parse() {
        Ok(grouping) => Ok(Some(grouping)),
        Err(error) => {
            warn!(
                "visual state: {}, ignoring saved grouping",
                DisplayErrorChain::new(error)
            );
            Ok(None)
        }
    }
}
