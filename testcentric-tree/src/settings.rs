// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test tree settings.
//!
//! Settings are an explicit snapshot handed to the presenter at construction. Later changes
//! arrive as [`SettingChange`] events rather than through shared mutable state.

use crate::errors::{
    DisplayErrorChain, SettingChangeError, SettingsError, UnknownGroupingError,
    UnknownStrategyError,
};
use camino::Utf8Path;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{collections::BTreeSet, fmt, io, str::FromStr};
use tracing::{debug, warn};

/// The stable identifier of a display strategy.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum StrategyId {
    /// The natural suite hierarchy.
    NUnitTree,
    /// Fixtures, grouped.
    FixtureList,
    /// Test cases, grouped.
    TestList,
}

impl StrategyId {
    /// All strategies.
    pub const ALL: [Self; 3] = [Self::NUnitTree, Self::FixtureList, Self::TestList];

    /// Returns the persisted form of this id.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NUnitTree => "NUNIT_TREE",
            Self::FixtureList => "FIXTURE_LIST",
            Self::TestList => "TEST_LIST",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = UnknownStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStrategyError {
                input: s.to_owned(),
            })
    }
}

/// The key by which the list strategies group their nodes.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Grouping {
    /// By containing assembly.
    Assembly,
    /// By category. A test with several categories appears under each of them.
    Category,
    /// By result outcome.
    Outcome,
    /// By how long the test took.
    Duration,
}

impl Grouping {
    /// All groupings.
    pub const ALL: [Self; 4] = [Self::Assembly, Self::Category, Self::Outcome, Self::Duration];

    /// Returns the persisted form of this grouping.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assembly => "ASSEMBLY",
            Self::Category => "CATEGORY",
            Self::Outcome => "OUTCOME",
            Self::Duration => "DURATION",
        }
    }

    /// Returns true if group membership changes as results arrive.
    pub fn depends_on_results(self) -> bool {
        matches!(self, Self::Outcome | Self::Duration)
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grouping {
    type Err = UnknownGroupingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|grouping| grouping.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownGroupingError {
                input: s.to_owned(),
            })
    }
}

macro_rules! serde_via_str {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

serde_via_str!(StrategyId);
serde_via_str!(Grouping);

/// The overall window layout, which affects which commands are shown.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuiLayout {
    /// The full layout, with a properties pane beside the tree.
    #[default]
    Full,
    /// The compact layout. Test properties are shown on demand from the context menu.
    Mini,
}

/// A resolved settings snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeSettings {
    /// The active display strategy.
    pub display_format: StrategyId,
    /// Whether check boxes are shown.
    pub show_check_boxes: bool,
    /// The name of the status image set.
    pub alternate_image_set: String,
    /// Whether namespace suites are shown.
    pub show_namespace: bool,
    /// Whether the filter controls are shown.
    pub show_filter: bool,
    /// Whether durations are appended to node text.
    pub show_test_duration: bool,
    /// The grouping used by the test list.
    pub test_list_group_by: Grouping,
    /// The grouping used by the fixture list.
    pub fixture_list_group_by: Grouping,
    /// The window layout.
    pub layout: GuiLayout,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self::from_embedded()
    }
}

impl TreeSettings {
    /// The built-in settings.
    pub const DEFAULT_SETTINGS: &'static str = include_str!("../default-settings.toml");

    /// Returns the built-in settings.
    pub fn from_embedded() -> Self {
        Self::resolve(&DefaultSettings::from_embedded(), None)
    }

    /// Reads settings from a TOML file, layered over the built-in settings.
    ///
    /// A missing file yields the built-in settings.
    pub fn from_path(path: &Utf8Path) -> Result<Self, SettingsError> {
        debug!("settings: attempting to load from {path}");
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("settings: file does not exist at {path}");
                return Ok(Self::from_embedded());
            }
            Err(error) => {
                return Err(SettingsError::Read {
                    path: path.to_owned(),
                    error,
                });
            }
        };

        let (user, unknown) =
            DeserializedSettings::deserialize_toml(&contents).map_err(|error| {
                SettingsError::Parse {
                    path: path.to_owned(),
                    error,
                }
            })?;
        if !unknown.is_empty() {
            warn!(
                "in settings file {path}, ignoring unknown keys: {}",
                unknown.into_iter().collect::<Vec<_>>().join(", ")
            );
        }

        Ok(Self::resolve(&DefaultSettings::from_embedded(), Some(&user)))
    }

    fn resolve(defaults: &DefaultSettings, user: Option<&DeserializedSettings>) -> Self {
        let tree = user.map(|user| &user.test_tree);
        Self {
            display_format: tree
                .and_then(|tree| tree.display_format.as_deref())
                .and_then(|s| parse_or_warn::<StrategyId>(s, "display-format"))
                .unwrap_or(defaults.test_tree.display_format),
            show_check_boxes: tree
                .and_then(|tree| tree.show_check_boxes)
                .unwrap_or(defaults.test_tree.show_check_boxes),
            alternate_image_set: tree
                .and_then(|tree| tree.alternate_image_set.clone())
                .unwrap_or_else(|| defaults.test_tree.alternate_image_set.clone()),
            show_namespace: tree
                .and_then(|tree| tree.show_namespace)
                .unwrap_or(defaults.test_tree.show_namespace),
            show_filter: tree
                .and_then(|tree| tree.show_filter)
                .unwrap_or(defaults.test_tree.show_filter),
            show_test_duration: tree
                .and_then(|tree| tree.show_test_duration)
                .unwrap_or(defaults.test_tree.show_test_duration),
            test_list_group_by: tree
                .and_then(|tree| tree.test_list.group_by.as_deref())
                .and_then(|s| parse_or_warn::<Grouping>(s, "test-list.group-by"))
                .unwrap_or(defaults.test_tree.test_list.group_by),
            fixture_list_group_by: tree
                .and_then(|tree| tree.fixture_list.group_by.as_deref())
                .and_then(|s| parse_or_warn::<Grouping>(s, "fixture-list.group-by"))
                .unwrap_or(defaults.test_tree.fixture_list.group_by),
            layout: user
                .and_then(|user| user.gui.layout)
                .unwrap_or(defaults.gui.layout),
        }
    }

    /// Returns the grouping used by the given strategy, if it groups at all.
    pub fn grouping_for(&self, strategy: StrategyId) -> Option<Grouping> {
        match strategy {
            StrategyId::NUnitTree => None,
            StrategyId::FixtureList => Some(self.fixture_list_group_by),
            StrategyId::TestList => Some(self.test_list_group_by),
        }
    }

    /// Applies a change, returning true if the snapshot actually changed.
    pub fn apply(&mut self, change: &SettingChange) -> bool {
        fn set<T: PartialEq>(slot: &mut T, value: T) -> bool {
            if *slot == value {
                false
            } else {
                *slot = value;
                true
            }
        }

        match change {
            SettingChange::DisplayFormat(id) => set(&mut self.display_format, *id),
            SettingChange::ShowCheckBoxes(show) => set(&mut self.show_check_boxes, *show),
            SettingChange::AlternateImageSet(name) => {
                set(&mut self.alternate_image_set, name.clone())
            }
            SettingChange::ShowNamespace(show) => set(&mut self.show_namespace, *show),
            SettingChange::ShowFilter(show) => set(&mut self.show_filter, *show),
            SettingChange::ShowTestDuration(show) => set(&mut self.show_test_duration, *show),
            SettingChange::TestListGroupBy(grouping) => {
                set(&mut self.test_list_group_by, *grouping)
            }
            SettingChange::FixtureListGroupBy(grouping) => {
                set(&mut self.fixture_list_group_by, *grouping)
            }
            SettingChange::GuiLayout(layout) => set(&mut self.layout, *layout),
        }
    }
}

fn parse_or_warn<T>(s: &str, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::error::Error,
{
    match s.parse() {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(
                "settings: {key}: {}, using the default",
                DisplayErrorChain::new(error)
            );
            None
        }
    }
}

/// A change to one test tree setting.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SettingChange {
    /// `Gui.TestTree.DisplayFormat`
    DisplayFormat(StrategyId),
    /// `Gui.TestTree.ShowCheckBoxes`
    ShowCheckBoxes(bool),
    /// `Gui.TestTree.AlternateImageSet`
    AlternateImageSet(String),
    /// `Gui.TestTree.ShowNamespace`
    ShowNamespace(bool),
    /// `Gui.TestTree.ShowFilter`
    ShowFilter(bool),
    /// `Gui.TestTree.ShowTestDuration`
    ShowTestDuration(bool),
    /// `Gui.TestTree.TestList.GroupBy`
    TestListGroupBy(Grouping),
    /// `Gui.TestTree.FixtureList.GroupBy`
    FixtureListGroupBy(Grouping),
    /// `Gui.GuiLayout`
    GuiLayout(GuiLayout),
}

impl SettingChange {
    /// Builds a change from a dotted settings key and its string value.
    pub fn from_key(key: &str, value: &str) -> Result<Self, SettingChangeError> {
        let parse_bool = || match value.trim() {
            v if v.eq_ignore_ascii_case("true") => Ok(true),
            v if v.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(SettingChangeError::InvalidValue {
                key: key.to_owned(),
                value: value.to_owned(),
            }),
        };

        let change = match key {
            "Gui.TestTree.DisplayFormat" => Self::DisplayFormat(value.parse()?),
            "Gui.TestTree.ShowCheckBoxes" => Self::ShowCheckBoxes(parse_bool()?),
            "Gui.TestTree.AlternateImageSet" => Self::AlternateImageSet(value.to_owned()),
            "Gui.TestTree.ShowNamespace" => Self::ShowNamespace(parse_bool()?),
            "Gui.TestTree.ShowFilter" => Self::ShowFilter(parse_bool()?),
            "Gui.TestTree.ShowTestDuration" => Self::ShowTestDuration(parse_bool()?),
            "Gui.TestTree.TestList.GroupBy" => Self::TestListGroupBy(value.parse()?),
            "Gui.TestTree.FixtureList.GroupBy" => Self::FixtureListGroupBy(value.parse()?),
            "Gui.GuiLayout" => match value.trim() {
                v if v.eq_ignore_ascii_case("full") => Self::GuiLayout(GuiLayout::Full),
                v if v.eq_ignore_ascii_case("mini") => Self::GuiLayout(GuiLayout::Mini),
                _ => {
                    return Err(SettingChangeError::InvalidValue {
                        key: key.to_owned(),
                        value: value.to_owned(),
                    });
                }
            },
            _ => {
                return Err(SettingChangeError::UnknownKey {
                    key: key.to_owned(),
                });
            }
        };
        Ok(change)
    }

    /// Returns the dotted settings key this change applies to.
    pub fn key(&self) -> &'static str {
        match self {
            Self::DisplayFormat(_) => "Gui.TestTree.DisplayFormat",
            Self::ShowCheckBoxes(_) => "Gui.TestTree.ShowCheckBoxes",
            Self::AlternateImageSet(_) => "Gui.TestTree.AlternateImageSet",
            Self::ShowNamespace(_) => "Gui.TestTree.ShowNamespace",
            Self::ShowFilter(_) => "Gui.TestTree.ShowFilter",
            Self::ShowTestDuration(_) => "Gui.TestTree.ShowTestDuration",
            Self::TestListGroupBy(_) => "Gui.TestTree.TestList.GroupBy",
            Self::FixtureListGroupBy(_) => "Gui.TestTree.FixtureList.GroupBy",
            Self::GuiLayout(_) => "Gui.GuiLayout",
        }
    }
}

/// User settings (deserialized form). Every key is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedSettings {
    #[serde(default)]
    test_tree: DeserializedTreeSettings,
    #[serde(default)]
    gui: DeserializedGuiSettings,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedTreeSettings {
    // Strategy and grouping names are parsed leniently during resolution, so that an unknown
    // name falls back to the default instead of rejecting the whole file.
    display_format: Option<String>,
    show_check_boxes: Option<bool>,
    alternate_image_set: Option<String>,
    show_namespace: Option<bool>,
    show_filter: Option<bool>,
    show_test_duration: Option<bool>,
    #[serde(default)]
    test_list: DeserializedListSettings,
    #[serde(default)]
    fixture_list: DeserializedListSettings,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedListSettings {
    group_by: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedGuiSettings {
    layout: Option<GuiLayout>,
}

impl DeserializedSettings {
    fn deserialize_toml(contents: &str) -> Result<(Self, BTreeSet<String>), toml::de::Error> {
        let deserializer = toml::Deserializer::parse(contents)?;
        let mut unknown = BTreeSet::new();
        let settings: DeserializedSettings = serde_ignored::deserialize(deserializer, |path| {
            unknown.insert(path.to_string());
        })?;
        Ok((settings, unknown))
    }
}

/// Built-in settings with every key required.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultSettings {
    test_tree: DefaultTreeSettings,
    gui: DefaultGuiSettings,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultTreeSettings {
    display_format: StrategyId,
    show_check_boxes: bool,
    alternate_image_set: String,
    show_namespace: bool,
    show_filter: bool,
    show_test_duration: bool,
    test_list: DefaultListSettings,
    fixture_list: DefaultListSettings,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultListSettings {
    group_by: Grouping,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultGuiSettings {
    layout: GuiLayout,
}

impl DefaultSettings {
    fn from_embedded() -> Self {
        let deserializer = toml::Deserializer::parse(TreeSettings::DEFAULT_SETTINGS)
            .expect("embedded default settings should parse");
        let mut unknown = BTreeSet::new();
        let settings: DefaultSettings =
            serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
                unknown.insert(path.to_string());
            })
            .expect("embedded default settings should be valid");

        // The embedded settings ship with this binary, so unknown keys are a bug.
        if !unknown.is_empty() {
            panic!(
                "found unknown keys in default settings: {}",
                unknown.into_iter().collect::<Vec<_>>().join(", ")
            );
        }
        settings
    }
}
