// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::TreeStyles;
use owo_colors::OwoColorize;
use std::io::{self, Write};
use swrite::{SWrite, swrite};
use testcentric_filtering::TestFilter;
use testcentric_model::TestId;
use testcentric_tree::{
    CommandState, DisplayNodeId, DisplayNodeKind, DisplayTree, TestImage, TestTreeView,
    TreeCommand,
};
use tracing::{debug, trace};

/// A view with no widgets of its own. It tracks what a graphical view would show and prints the
/// final tree on request.
#[derive(Debug, Default)]
pub(crate) struct TextView {
    show_check_boxes: bool,
    loads: usize,
    updates: usize,
}

impl TextView {
    /// Returns how many times the whole tree was loaded.
    pub(crate) fn loads(&self) -> usize {
        self.loads
    }

    /// Returns how many incremental updates were applied.
    pub(crate) fn updates(&self) -> usize {
        self.updates
    }

    /// Writes `tree` with one node per line, a status column on the left.
    pub(crate) fn write_tree(
        &self,
        tree: &DisplayTree,
        styles: &TreeStyles,
        mut writer: impl Write,
    ) -> io::Result<()> {
        for (depth, id) in tree.iter() {
            let node = tree.node(id);
            let status = format!("{:>7}", status_label(node.image()));
            write!(writer, "{} ", status.style(styles.image(node.image())))?;

            let mut prefix = "  ".repeat(depth);
            if self.show_check_boxes {
                swrite!(prefix, "[{}] ", if node.is_checked() { 'x' } else { ' ' });
            }
            write!(writer, "{prefix}")?;
            match node.kind() {
                DisplayNodeKind::Group { .. } => {
                    writeln!(writer, "{}", node.text().style(styles.group))?;
                }
                DisplayNodeKind::Test { .. } => writeln!(writer, "{}", node.text())?,
            }
        }
        writer.flush()
    }
}

fn status_label(image: TestImage) -> &'static str {
    match image {
        TestImage::Initial => "",
        TestImage::Success => "PASS",
        TestImage::Inconclusive => "INCONCL",
        TestImage::Skipped => "SKIP",
        TestImage::Ignored => "IGNORED",
        TestImage::Warning => "WARN",
        TestImage::Failure => "FAIL",
    }
}

impl TestTreeView for TextView {
    fn load_tree(&mut self, tree: &DisplayTree) {
        self.loads += 1;
        debug!("view: loaded tree with {} roots", tree.roots().len());
    }

    fn clear(&mut self) {
        debug!("view: cleared");
    }

    fn set_image(&mut self, node: DisplayNodeId, image: TestImage) {
        self.updates += 1;
        trace!("view: {node} image -> {image:?}");
    }

    fn reset_all_images(&mut self, _tree: &DisplayTree) {
        debug!("view: reset all images");
    }

    fn set_text(&mut self, node: DisplayNodeId, text: &str) {
        self.updates += 1;
        trace!("view: {node} text -> {text}");
    }

    fn add_node(
        &mut self,
        _tree: &DisplayTree,
        node: DisplayNodeId,
        parent: Option<DisplayNodeId>,
        index: usize,
    ) {
        self.updates += 1;
        trace!("view: added {node} under {parent:?} at {index}");
    }

    fn move_node(&mut self, node: DisplayNodeId, parent: Option<DisplayNodeId>, index: usize) {
        self.updates += 1;
        trace!("view: moved {node} under {parent:?} at {index}");
    }

    fn remove_node(&mut self, node: DisplayNodeId) {
        self.updates += 1;
        trace!("view: removed {node}");
    }

    fn set_expanded(&mut self, node: DisplayNodeId, expanded: bool) {
        trace!("view: {node} expanded -> {expanded}");
    }

    fn show_check_boxes(&mut self, show: bool) {
        self.show_check_boxes = show;
    }

    fn set_alternate_image_set(&mut self, name: &str) {
        debug!("view: image set {name}");
    }

    fn set_filter_visible(&mut self, visible: bool) {
        trace!("view: filter visible -> {visible}");
    }

    fn set_filter_controls(&mut self, categories: &[String], filter: &TestFilter) {
        debug!(
            "view: {} categories available, filter {}",
            categories.len(),
            if filter.is_empty() { "empty" } else { "active" }
        );
    }

    fn close_category_filter(&mut self) {}

    fn set_command(&mut self, command: TreeCommand, state: CommandState) {
        trace!("view: {command:?} -> {state:?}");
    }

    fn show_test_properties(&mut self, test: &TestId) {
        debug!("view: properties for {test}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_model::FileModel;
    use camino::Utf8Path;
    use pretty_assertions::assert_eq;
    use testcentric_tree::{ModelEvent, TreeSettings, TreeViewPresenter, ViewEvent};

    fn loaded(settings: TreeSettings) -> TreeViewPresenter<FileModel, TextView> {
        let path = Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../fixtures/mock-assembly-results.xml");
        let model = FileModel::load(&path).unwrap();
        let mut presenter = TreeViewPresenter::new(model, TextView::default(), settings);
        presenter.dispatch(ModelEvent::TestLoaded);
        presenter.model().replay(&presenter.handle());
        presenter.process_pending();
        presenter
    }

    fn written(presenter: &TreeViewPresenter<FileModel, TextView>) -> String {
        let mut out = Vec::new();
        presenter
            .view()
            .write_tree(presenter.tree(), &TreeStyles::default(), &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn replayed_run_is_written_with_status_column() {
        let presenter = loaded(TreeSettings::default());
        assert_eq!(presenter.view().loads(), 1);
        assert!(presenter.view().updates() > 0);
        assert_eq!(
            written(&presenter),
            "   FAIL mock-assembly.dll
   FAIL   NUnit
   FAIL     Tests
   FAIL       Assemblies
   FAIL         MockTestFixture
   PASS           MockTest1
   FAIL           MockTest2
   PASS           MockTest3
IGNORED           MockTest4
   FAIL       BadFixture
   FAIL         SomeTest
   WARN       ParameterizedFixture
   WARN         Add
   PASS           Add(1,2)
   WARN           Add(2,3)
"
        );
    }

    #[test]
    fn check_boxes_are_written() {
        let settings = TreeSettings {
            show_check_boxes: true,
            ..TreeSettings::default()
        };
        let mut presenter = loaded(settings);
        let node = presenter.tree().nodes_for_test(&TestId::new("0-1021"))[0];
        presenter.dispatch(ViewEvent::NodeChecked {
            node,
            checked: true,
        });

        let written = written(&presenter);
        assert!(written.contains("   FAIL         [x] SomeTest\n"), "{written}");
        assert!(written.contains("   PASS           [ ] MockTest1\n"), "{written}");
    }
}
