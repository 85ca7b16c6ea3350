// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    display::{DisplayNodeId, DisplayTree, TestImage, TreeChange, TreeSort},
    settings::Grouping,
};
use testcentric_filtering::{CategoryFilter, OutcomeFilter, TestFilter};
use testcentric_model::TestId;

/// The tree view driven by a [`TreeViewPresenter`](crate::TreeViewPresenter).
///
/// A view renders the state handed to it and reports user gestures back as [`ViewEvent`]s. It
/// never reads the model directly. Every method is called on the thread that drains the
/// presenter's queue.
pub trait TestTreeView {
    /// Replaces everything shown with `tree`.
    fn load_tree(&mut self, tree: &DisplayTree);

    /// Removes every node.
    fn clear(&mut self);

    /// Changes the status image of one node.
    fn set_image(&mut self, node: DisplayNodeId, image: TestImage);

    /// Resets every status image to [`TestImage::Initial`] and every node's text to its label.
    fn reset_all_images(&mut self, tree: &DisplayTree);

    /// Changes the text of one node.
    fn set_text(&mut self, node: DisplayNodeId, text: &str);

    /// Inserts `node`, which already exists in `tree`, under `parent` at `index`.
    fn add_node(
        &mut self,
        tree: &DisplayTree,
        node: DisplayNodeId,
        parent: Option<DisplayNodeId>,
        index: usize,
    );

    /// Moves `node` under `parent` at `index`.
    fn move_node(&mut self, node: DisplayNodeId, parent: Option<DisplayNodeId>, index: usize);

    /// Removes `node` and everything under it.
    fn remove_node(&mut self, node: DisplayNodeId);

    /// Expands or collapses one node.
    fn set_expanded(&mut self, node: DisplayNodeId, expanded: bool);

    /// Shows or hides check boxes.
    fn show_check_boxes(&mut self, show: bool);

    /// Switches to another set of status images.
    fn set_alternate_image_set(&mut self, name: &str);

    /// Shows or hides the filter controls.
    fn set_filter_visible(&mut self, visible: bool);

    /// Refreshes the filter controls with the categories available for filtering and the
    /// current filter.
    fn set_filter_controls(&mut self, categories: &[String], filter: &TestFilter);

    /// Closes the category filter popup if it is open.
    fn close_category_filter(&mut self);

    /// Updates the state of a command surface.
    fn set_command(&mut self, command: TreeCommand, state: CommandState);

    /// Shows the properties of a test.
    fn show_test_properties(&mut self, test: &TestId);

    /// Mirrors one incremental change to the tree.
    fn apply_change(&mut self, tree: &DisplayTree, change: &TreeChange) {
        match change {
            TreeChange::Image { node, image } => self.set_image(*node, *image),
            TreeChange::Text { node, text } => self.set_text(*node, text),
            TreeChange::Added {
                node,
                parent,
                index,
            } => {
                self.add_node(tree, *node, *parent, *index);
                if tree.node(*node).is_expanded() {
                    self.set_expanded(*node, true);
                }
            }
            TreeChange::Moved {
                node,
                parent,
                index,
            } => self.move_node(*node, *parent, *index),
            TreeChange::Removed { node } => self.remove_node(*node),
        }
    }
}

/// A command surface in the tree's context menu or toolbar.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TreeCommand {
    /// Run the checked or selected tests.
    Run,
    /// Debug the checked or selected tests.
    Debug,
    /// Show the properties of the selected test.
    TestProperties,
    /// Toggle check boxes.
    ShowCheckBoxes,
    /// Expand every node.
    ExpandAll,
    /// Collapse every node.
    CollapseAll,
    /// Expand down to fixtures and collapse the fixtures themselves.
    CollapseToFixtures,
    /// Save the visual state now.
    SaveVisualState,
}

/// The settable properties of a command surface.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CommandState {
    /// Whether the command can be executed.
    pub enabled: bool,
    /// Whether the command is shown.
    pub visible: bool,
    /// Whether the command shows a check mark.
    pub checked: bool,
}

impl CommandState {
    /// An enabled, visible, unchecked command.
    pub const ENABLED: Self = Self {
        enabled: true,
        visible: true,
        checked: false,
    };

    /// A disabled, visible, unchecked command.
    pub const DISABLED: Self = Self {
        enabled: false,
        visible: true,
        checked: false,
    };
}

/// One edit from the filter controls. Edits submitted together are applied as one change.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FilterEdit {
    /// Replace the outcome filter.
    Outcome(OutcomeFilter),
    /// Replace the text filter.
    Text(String),
    /// Replace the category filter.
    Category(CategoryFilter),
    /// Reset every filter dimension.
    Clear,
}

/// A user gesture reported by the view.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    /// The context menu is about to open. Command state is updated before this event returns.
    ContextMenuOpening,
    /// A node's check box changed.
    NodeChecked {
        /// The node.
        node: DisplayNodeId,
        /// Whether it is now checked.
        checked: bool,
    },
    /// The selected node changed.
    NodeSelected(Option<DisplayNodeId>),
    /// A node was expanded or collapsed.
    NodeExpanded {
        /// The node.
        node: DisplayNodeId,
        /// Whether it is now expanded.
        expanded: bool,
    },
    /// The view scrolled so that a different node is at the top.
    TopNodeChanged(Option<DisplayNodeId>),
    /// A sort order was picked.
    SortChanged(TreeSort),
    /// The filter controls were edited.
    FilterEdited(Vec<FilterEdit>),
    /// A grouping was picked for the active list strategy.
    GroupByChanged(Grouping),
    /// A command was executed.
    Command(TreeCommand),
}
