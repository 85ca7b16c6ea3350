// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use std::{collections::HashMap, sync::LazyLock};
use testcentric_filtering::TestFilter;
use testcentric_model::{TestId, TestNode};
use testcentric_tree::{
    ActiveTestItem, CommandState, DisplayNodeId, DisplayTree, TestImage, TestModel,
    TestSelection, TestTreeView, TreeCommand, TreeSettings, TreeViewPresenter,
};

pub(crate) static MOCK_ASSEMBLY: LazyLock<TestNode> = LazyLock::new(|| {
    static FIXTURE_XML: &str = include_str!("../../../fixtures/mock-assembly.xml");
    TestNode::parse(FIXTURE_XML).expect("fixture is a valid test document")
});

/// One fixture with two test cases, ids 1 and 2.
pub(crate) const TWO_CASES: &str = r#"
    <test-suite type="TestFixture" id="0" name="Fixture" fullname="Ns.Fixture">
        <test-case id="1" name="First" fullname="Ns.Fixture.First" />
        <test-case id="2" name="Second" fullname="Ns.Fixture.Second" />
    </test-suite>
"#;

/// A call made on a [`RecordingView`], with node references resolved to text where useful.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ViewCall {
    LoadTree,
    Clear,
    SetImage(DisplayNodeId, TestImage),
    ResetAllImages,
    SetText(DisplayNodeId, String),
    AddNode {
        node: DisplayNodeId,
        parent: Option<DisplayNodeId>,
        index: usize,
    },
    MoveNode {
        node: DisplayNodeId,
        parent: Option<DisplayNodeId>,
        index: usize,
    },
    RemoveNode(DisplayNodeId),
    SetExpanded(DisplayNodeId, bool),
    ShowCheckBoxes(bool),
    AlternateImageSet(String),
    FilterVisible(bool),
    FilterControls(Vec<String>),
    CloseCategoryFilter,
    ShowTestProperties(TestId),
}

/// A view that records every call and keeps the latest command state and rendered tree.
#[derive(Debug, Default)]
pub(crate) struct RecordingView {
    pub(crate) calls: Vec<ViewCall>,
    pub(crate) commands: HashMap<TreeCommand, CommandState>,
    pub(crate) rendered: String,
}

impl RecordingView {
    pub(crate) fn load_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| **call == ViewCall::LoadTree)
            .count()
    }

    pub(crate) fn command(&self, command: TreeCommand) -> CommandState {
        self.commands[&command]
    }
}

impl TestTreeView for RecordingView {
    fn load_tree(&mut self, tree: &DisplayTree) {
        self.rendered = tree.render();
        self.calls.push(ViewCall::LoadTree);
    }

    fn clear(&mut self) {
        self.rendered.clear();
        self.calls.push(ViewCall::Clear);
    }

    fn set_image(&mut self, node: DisplayNodeId, image: TestImage) {
        self.calls.push(ViewCall::SetImage(node, image));
    }

    fn reset_all_images(&mut self, _tree: &DisplayTree) {
        self.calls.push(ViewCall::ResetAllImages);
    }

    fn set_text(&mut self, node: DisplayNodeId, text: &str) {
        self.calls.push(ViewCall::SetText(node, text.to_owned()));
    }

    fn add_node(
        &mut self,
        _tree: &DisplayTree,
        node: DisplayNodeId,
        parent: Option<DisplayNodeId>,
        index: usize,
    ) {
        self.calls.push(ViewCall::AddNode {
            node,
            parent,
            index,
        });
    }

    fn move_node(&mut self, node: DisplayNodeId, parent: Option<DisplayNodeId>, index: usize) {
        self.calls.push(ViewCall::MoveNode {
            node,
            parent,
            index,
        });
    }

    fn remove_node(&mut self, node: DisplayNodeId) {
        self.calls.push(ViewCall::RemoveNode(node));
    }

    fn set_expanded(&mut self, node: DisplayNodeId, expanded: bool) {
        self.calls.push(ViewCall::SetExpanded(node, expanded));
    }

    fn show_check_boxes(&mut self, show: bool) {
        self.calls.push(ViewCall::ShowCheckBoxes(show));
    }

    fn set_alternate_image_set(&mut self, name: &str) {
        self.calls.push(ViewCall::AlternateImageSet(name.to_owned()));
    }

    fn set_filter_visible(&mut self, visible: bool) {
        self.calls.push(ViewCall::FilterVisible(visible));
    }

    fn set_filter_controls(&mut self, categories: &[String], _filter: &TestFilter) {
        self.calls.push(ViewCall::FilterControls(categories.to_vec()));
    }

    fn close_category_filter(&mut self) {
        self.calls.push(ViewCall::CloseCategoryFilter);
    }

    fn set_command(&mut self, command: TreeCommand, state: CommandState) {
        self.commands.insert(command, state);
    }

    fn show_test_properties(&mut self, test: &TestId) {
        self.calls.push(ViewCall::ShowTestProperties(test.clone()));
    }
}

/// A model holding a fixed test graph that records selections and runs.
#[derive(Debug, Default)]
pub(crate) struct MockModel {
    pub(crate) tests: Option<TestNode>,
    pub(crate) test_file: Option<Utf8PathBuf>,
    pub(crate) read_only_state: bool,
    pub(crate) selected: Option<TestSelection>,
    pub(crate) active: Option<ActiveTestItem>,
    pub(crate) runs: Vec<TestSelection>,
    pub(crate) debug_runs: Vec<TestSelection>,
}

impl MockModel {
    pub(crate) fn new(tests: TestNode) -> Self {
        Self {
            tests: Some(tests),
            ..Self::default()
        }
    }

    pub(crate) fn with_test_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.test_file = Some(path.into());
        self
    }

    pub(crate) fn with_read_only_state(mut self) -> Self {
        self.read_only_state = true;
        self
    }
}

impl TestModel for MockModel {
    fn loaded_tests(&self) -> Option<&TestNode> {
        self.tests.as_ref()
    }

    fn test_file(&self) -> Option<&Utf8Path> {
        self.test_file.as_deref()
    }

    fn saves_visual_state(&self) -> bool {
        !self.read_only_state
    }

    fn set_selected_tests(&mut self, selection: TestSelection) {
        self.selected = Some(selection);
    }

    fn set_active_test_item(&mut self, item: Option<ActiveTestItem>) {
        self.active = item;
    }

    fn run_tests(&mut self, selection: &TestSelection) {
        self.runs.push(selection.clone());
    }

    fn debug_tests(&mut self, selection: &TestSelection) {
        self.debug_runs.push(selection.clone());
    }
}

pub(crate) type Presenter = TreeViewPresenter<MockModel, RecordingView>;

pub(crate) fn presenter(model: MockModel, settings: TreeSettings) -> Presenter {
    TreeViewPresenter::new(model, RecordingView::default(), settings)
}

/// Returns the first display node showing a test.
pub(crate) fn node_for(presenter: &Presenter, id: &str) -> DisplayNodeId {
    let nodes = presenter.tree().nodes_for_test(&TestId::new(id));
    assert!(!nodes.is_empty(), "test {id} is not shown");
    nodes[0]
}

pub(crate) fn selection(ids: &[&str]) -> TestSelection {
    ids.iter().map(|id| TestId::new(id)).collect()
}
