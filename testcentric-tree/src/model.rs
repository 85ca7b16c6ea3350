// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8Path;
use indexmap::IndexSet;
use testcentric_model::{ResultNode, TestId, TestNode};

/// The test model consumed by a [`TreeViewPresenter`](crate::TreeViewPresenter).
///
/// The model owns the loaded tests and talks to the test engine. The presenter reads the loaded
/// graph from it and pushes selections and run requests back.
pub trait TestModel {
    /// Returns the loaded test graph, if tests are loaded.
    fn loaded_tests(&self) -> Option<&TestNode>;

    /// Returns the path of the loaded test file, used to locate its visual state.
    fn test_file(&self) -> Option<&Utf8Path>;

    /// Returns true if the presenter may write visual state next to the test file on its own.
    ///
    /// Visual state is still read at load time when this returns false.
    fn saves_visual_state(&self) -> bool {
        true
    }

    /// Returns the categories available for filtering.
    fn available_categories(&self) -> Vec<String> {
        self.loaded_tests()
            .map(TestNode::all_categories)
            .unwrap_or_default()
    }

    /// Replaces the set of tests that a run applies to.
    fn set_selected_tests(&mut self, selection: TestSelection);

    /// Replaces the single active item, used for properties and single-test actions.
    fn set_active_test_item(&mut self, item: Option<ActiveTestItem>);

    /// Starts a run of `selection`.
    fn run_tests(&mut self, selection: &TestSelection);

    /// Starts a debugging run of `selection`.
    fn debug_tests(&mut self, selection: &TestSelection);
}

/// A set of tests, in the order they were selected, without duplicates.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TestSelection(IndexSet<TestId>);

impl TestSelection {
    /// Creates an empty selection. An empty selection selects nothing, not everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a test, returning false if it was already selected.
    pub fn insert(&mut self, id: TestId) -> bool {
        self.0.insert(id)
    }

    /// Returns true if `id` is selected.
    pub fn contains(&self, id: &TestId) -> bool {
        self.0.contains(id)
    }

    /// Returns the number of selected tests.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the selected tests.
    pub fn iter(&self) -> impl Iterator<Item = &TestId> + '_ {
        self.0.iter()
    }
}

impl FromIterator<TestId> for TestSelection {
    fn from_iter<I: IntoIterator<Item = TestId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<TestId> for TestSelection {
    fn extend<I: IntoIterator<Item = TestId>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// The single item a user is looking at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ActiveTestItem {
    /// A test.
    Test(TestId),
    /// A group from a list strategy, with the tests directly under it.
    Group {
        /// The group name.
        name: String,
        /// The member tests.
        tests: TestSelection,
    },
}

/// A life-cycle event raised by the test model or engine.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelEvent {
    /// Tests were loaded.
    TestLoaded,
    /// The loaded tests were reloaded, for example after a rebuild.
    TestReloaded,
    /// Tests were unloaded.
    TestUnloaded,
    /// A run is starting.
    RunStarting,
    /// A run finished.
    RunFinished,
    /// A test case finished.
    TestFinished(ResultNode),
    /// A suite finished.
    SuiteFinished(ResultNode),
}
