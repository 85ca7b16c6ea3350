// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The display tree: an arena of display nodes addressed by stable indices.
//!
//! Display strategies build a [`DisplayTree`] from the test graph. Parent and child links are
//! [`DisplayNodeId`]s, and each tree keeps an index from [`TestId`] to the display nodes showing
//! that test, so incremental result updates are lookups rather than traversals.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::{cmp::Ordering, collections::HashMap, fmt};
use swrite::{SWrite, swrite};
use testcentric_model::{Outcome, ResultNode, TestId, TestStatus, TestType};

/// The index of a node within a [`DisplayTree`].
///
/// Ids are only meaningful for the tree that produced them, and are invalidated by a reload.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DisplayNodeId(u32);

impl DisplayNodeId {
    /// Returns the raw index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DisplayNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The status image shown beside a node.
///
/// Variants are ordered from least to most severe.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TestImage {
    /// No result yet.
    #[default]
    Initial,
    /// Passed.
    Success,
    /// Inconclusive.
    Inconclusive,
    /// Skipped.
    Skipped,
    /// Ignored.
    Ignored,
    /// Passed with warnings.
    Warning,
    /// Failed, errored or cancelled.
    Failure,
}

impl TestImage {
    /// Returns the image for an outcome.
    pub fn from_outcome(outcome: &Outcome) -> Self {
        match outcome.status {
            TestStatus::Passed => Self::Success,
            TestStatus::Inconclusive => Self::Inconclusive,
            TestStatus::Skipped if outcome.is_ignored() => Self::Ignored,
            TestStatus::Skipped => Self::Skipped,
            TestStatus::Warning => Self::Warning,
            TestStatus::Failed => Self::Failure,
        }
    }

    /// Returns the index of this image within an image set.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the severity rank used to aggregate images up the tree.
    ///
    /// Skipped and ignored share a rank.
    fn rank(self) -> u8 {
        match self {
            Self::Initial => 0,
            Self::Success => 1,
            Self::Inconclusive => 2,
            Self::Skipped | Self::Ignored => 3,
            Self::Warning => 4,
            Self::Failure => 5,
        }
    }

    /// Returns the more severe of two images. Between skipped and ignored, ignored wins.
    pub fn worst(self, other: Self) -> Self {
        if (other.rank(), other.index()) > (self.rank(), self.index()) {
            other
        } else {
            self
        }
    }
}

/// What a display node stands for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DisplayNodeKind {
    /// A test from the loaded graph.
    Test {
        /// The test id.
        id: TestId,
        /// The test type.
        test_type: TestType,
    },

    /// A synthetic group created by a list strategy.
    Group {
        /// The group name, without the count suffix.
        name: String,
    },
}

/// A persistent key for a display node, valid across reloads.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualNodeKey {
    /// A test node, by test id.
    Test(TestId),
    /// A group node, by group name.
    Group(String),
}

/// A node in a [`DisplayTree`].
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayNode {
    kind: DisplayNodeKind,
    label: String,
    text: String,
    own_image: TestImage,
    image: TestImage,
    duration: Option<f64>,
    parent: Option<DisplayNodeId>,
    children: Vec<DisplayNodeId>,
    expanded: bool,
    checked: bool,
}

impl DisplayNode {
    /// Returns what this node stands for.
    pub fn kind(&self) -> &DisplayNodeKind {
        &self.kind
    }

    /// Returns the test id, if this is a test node.
    pub fn test_id(&self) -> Option<&TestId> {
        match &self.kind {
            DisplayNodeKind::Test { id, .. } => Some(id),
            DisplayNodeKind::Group { .. } => None,
        }
    }

    /// Returns true if this node stands for a single test case.
    pub fn is_test_case(&self) -> bool {
        matches!(
            &self.kind,
            DisplayNodeKind::Test {
                test_type: TestType::TestCase,
                ..
            }
        )
    }

    /// Returns the persistent key for this node.
    pub fn key(&self) -> VisualNodeKey {
        match &self.kind {
            DisplayNodeKind::Test { id, .. } => VisualNodeKey::Test(id.clone()),
            DisplayNodeKind::Group { name } => VisualNodeKey::Group(name.clone()),
        }
    }

    /// Returns the label, which is the displayed text without any duration suffix.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the displayed text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the displayed image, which accounts for all descendants.
    pub fn image(&self) -> TestImage {
        self.image
    }

    /// Returns the recorded duration in seconds, used for sorting.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Returns the parent node.
    pub fn parent(&self) -> Option<DisplayNodeId> {
        self.parent
    }

    /// Returns the child nodes in display order.
    pub fn children(&self) -> &[DisplayNodeId] {
        &self.children
    }

    /// Returns true if this node is expanded.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Returns true if this node is checked.
    pub fn is_checked(&self) -> bool {
        self.checked
    }
}

/// The field a [`TreeSort`] orders by.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Lexicographic by displayed text.
    #[default]
    Name,
    /// Numeric by duration. Nodes without a duration sort lowest.
    Duration,
}

/// The direction of a [`TreeSort`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// A sibling ordering applied to test nodes. Group nodes keep their grouping order.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TreeSort {
    /// What to order by.
    pub key: SortKey,
    /// Which way.
    pub direction: SortDirection,
}

impl TreeSort {
    fn compare(&self, a: &DisplayNode, b: &DisplayNode) -> Ordering {
        let ordering = match self.key {
            SortKey::Name => a.text.cmp(&b.text),
            SortKey::Duration => match (a.duration, b.duration) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// An incremental change to a [`DisplayTree`], to be mirrored by the view.
#[derive(Clone, Debug, PartialEq)]
pub enum TreeChange {
    /// A node's image changed.
    Image {
        /// The node.
        node: DisplayNodeId,
        /// The new image.
        image: TestImage,
    },
    /// A node's text changed.
    Text {
        /// The node.
        node: DisplayNodeId,
        /// The new text.
        text: String,
    },
    /// A node was added.
    Added {
        /// The new node.
        node: DisplayNodeId,
        /// Its parent, or `None` for a root.
        parent: Option<DisplayNodeId>,
        /// Its position among its siblings.
        index: usize,
    },
    /// A node moved to a new parent.
    Moved {
        /// The node.
        node: DisplayNodeId,
        /// Its new parent, or `None` for a root.
        parent: Option<DisplayNodeId>,
        /// Its position among its new siblings.
        index: usize,
    },
    /// A node was removed along with its descendants.
    Removed {
        /// The node.
        node: DisplayNodeId,
    },
}

/// An arena of display nodes.
#[derive(Clone, Debug, Default)]
pub struct DisplayTree {
    nodes: Vec<DisplayNode>,
    roots: Vec<DisplayNodeId>,
    by_test: HashMap<TestId, SmallVec<[DisplayNodeId; 2]>>,
    groups: IndexMap<String, DisplayNodeId>,
    selected: Option<DisplayNodeId>,
    top: Option<DisplayNodeId>,
}

impl DisplayTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the tree shows nothing.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Returns the root nodes in display order.
    pub fn roots(&self) -> &[DisplayNodeId] {
        &self.roots
    }

    /// Returns the node with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this tree.
    pub fn node(&self, id: DisplayNodeId) -> &DisplayNode {
        &self.nodes[id.index()]
    }

    /// Returns the node with the given id, or `None` if it does not belong to this tree.
    pub fn get(&self, id: DisplayNodeId) -> Option<&DisplayNode> {
        self.nodes.get(id.index())
    }

    /// Returns every display node showing the given test.
    pub fn nodes_for_test(&self, id: &TestId) -> &[DisplayNodeId] {
        self.by_test.get(id).map_or(&[][..], |nodes| nodes.as_slice())
    }

    /// Returns the group node with the given name.
    pub fn group(&self, name: &str) -> Option<DisplayNodeId> {
        self.groups.get(name).copied()
    }

    /// Returns the names of the current groups, in creation order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.groups.keys().map(String::as_str)
    }

    /// Returns the selected node.
    pub fn selected(&self) -> Option<DisplayNodeId> {
        self.selected
    }

    /// Returns the topmost visible node.
    pub fn top(&self) -> Option<DisplayNodeId> {
        self.top
    }

    /// Iterates over the attached nodes in pre-order, with their depth.
    pub fn iter(&self) -> impl Iterator<Item = (usize, DisplayNodeId)> + '_ {
        let mut stack: Vec<(usize, DisplayNodeId)> =
            self.roots.iter().rev().map(|&id| (0, id)).collect();
        std::iter::from_fn(move || {
            let (depth, id) = stack.pop()?;
            stack.extend(
                self.node(id)
                    .children
                    .iter()
                    .rev()
                    .map(|&child| (depth + 1, child)),
            );
            Some((depth, id))
        })
    }

    /// Iterates over `id` and its descendants in pre-order.
    pub fn descendants(&self, id: DisplayNodeId) -> impl Iterator<Item = DisplayNodeId> + '_ {
        let mut stack = vec![id];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.node(id).children.iter().rev().copied());
            Some(id)
        })
    }

    /// Returns the number of test cases at or below `id`.
    pub fn test_case_count(&self, id: DisplayNodeId) -> usize {
        self.descendants(id)
            .filter(|&node| self.node(node).is_test_case())
            .count()
    }

    /// Finds the first node with the given key.
    pub fn find_key(&self, key: &VisualNodeKey) -> Option<DisplayNodeId> {
        match key {
            VisualNodeKey::Test(id) => self.nodes_for_test(id).first().copied(),
            VisualNodeKey::Group(name) => self.group(name),
        }
    }

    /// Returns every node with the given key.
    pub fn nodes_for_key(&self, key: &VisualNodeKey) -> SmallVec<[DisplayNodeId; 2]> {
        match key {
            VisualNodeKey::Test(id) => self.nodes_for_test(id).iter().copied().collect(),
            VisualNodeKey::Group(name) => self.group(name).into_iter().collect(),
        }
    }

    // ---
    // Construction and mutation
    // ---

    /// Appends a test node under `parent`.
    pub(crate) fn push_test(
        &mut self,
        parent: Option<DisplayNodeId>,
        id: TestId,
        test_type: TestType,
        label: String,
    ) -> DisplayNodeId {
        let node = self.push(
            parent,
            DisplayNodeKind::Test {
                id: id.clone(),
                test_type,
            },
            label,
        );
        self.by_test.entry(id).or_default().push(node);
        node
    }

    /// Inserts a group node among the roots at `index`. The text is set by
    /// [`Self::refresh_group_text`].
    pub(crate) fn insert_group(&mut self, name: String, index: usize) -> DisplayNodeId {
        let node = self.alloc(DisplayNodeKind::Group { name: name.clone() }, name.clone());
        let index = index.min(self.roots.len());
        self.roots.insert(index, node);
        self.groups.insert(name, node);
        node
    }

    fn push(
        &mut self,
        parent: Option<DisplayNodeId>,
        kind: DisplayNodeKind,
        label: String,
    ) -> DisplayNodeId {
        let node = self.alloc(kind, label);
        self.nodes[node.index()].parent = parent;
        match parent {
            Some(parent) => self.nodes[parent.index()].children.push(node),
            None => self.roots.push(node),
        }
        node
    }

    fn alloc(&mut self, kind: DisplayNodeKind, label: String) -> DisplayNodeId {
        let id = DisplayNodeId(
            u32::try_from(self.nodes.len()).expect("display trees hold fewer than u32::MAX nodes"),
        );
        self.nodes.push(DisplayNode {
            kind,
            text: label.clone(),
            label,
            own_image: TestImage::Initial,
            image: TestImage::Initial,
            duration: None,
            parent: None,
            children: Vec::new(),
            expanded: false,
            checked: false,
        });
        id
    }

    pub(crate) fn set_text(&mut self, id: DisplayNodeId, text: String) -> Option<TreeChange> {
        let node = &mut self.nodes[id.index()];
        if node.text == text {
            return None;
        }
        node.text.clone_from(&text);
        Some(TreeChange::Text { node: id, text })
    }

    pub(crate) fn set_duration(&mut self, id: DisplayNodeId, duration: Option<f64>) {
        self.nodes[id.index()].duration = duration;
    }

    /// Records a node's own result: its image (without propagating it) and its duration.
    ///
    /// Returns the text change if the duration suffix changed.
    pub(crate) fn set_result(
        &mut self,
        id: DisplayNodeId,
        result: Option<&ResultNode>,
        show_duration: bool,
    ) -> Option<TreeChange> {
        let node = &mut self.nodes[id.index()];
        node.own_image = result.map_or(TestImage::Initial, |result| {
            TestImage::from_outcome(result.outcome())
        });
        node.duration = result.and_then(ResultNode::duration);
        self.refresh_text(id, show_duration)
    }

    /// Recomputes the text of a test node from its label and duration.
    pub(crate) fn refresh_text(&mut self, id: DisplayNodeId, show_duration: bool) -> Option<TreeChange> {
        let node = &self.nodes[id.index()];
        let text = match node.duration {
            Some(seconds) if show_duration => format!("{} [{seconds:.3}s]", node.label),
            _ => node.label.clone(),
        };
        self.set_text(id, text)
    }

    /// Updates the text of a group node to `"<name> (<count>)"`.
    pub(crate) fn refresh_group_text(&mut self, id: DisplayNodeId) -> Option<TreeChange> {
        let DisplayNodeKind::Group { name } = &self.nodes[id.index()].kind else {
            return None;
        };
        let text = format!("{name} ({})", self.test_case_count(id));
        self.set_text(id, text)
    }

    /// Sets a node's own image and re-aggregates it and its ancestors.
    pub(crate) fn set_own_image(
        &mut self,
        id: DisplayNodeId,
        image: TestImage,
        changes: &mut Vec<TreeChange>,
    ) {
        self.nodes[id.index()].own_image = image;
        self.refresh_images_from(Some(id), changes);
    }

    /// Re-aggregates images from `start` up to its root, stopping early once a node's image is
    /// unchanged.
    pub(crate) fn refresh_images_from(
        &mut self,
        start: Option<DisplayNodeId>,
        changes: &mut Vec<TreeChange>,
    ) {
        let mut current = start;
        while let Some(id) = current {
            let node = &self.nodes[id.index()];
            let image = node
                .children
                .iter()
                .map(|child| self.nodes[child.index()].image)
                .fold(node.own_image, TestImage::worst);
            if image == node.image {
                break;
            }
            self.nodes[id.index()].image = image;
            changes.push(TreeChange::Image { node: id, image });
            current = self.nodes[id.index()].parent;
        }
    }

    /// Aggregates every image bottom-up. Used once after a build.
    pub(crate) fn refresh_all_images(&mut self) {
        let order: Vec<_> = self.iter().map(|(_, id)| id).collect();
        for &id in order.iter().rev() {
            let node = &self.nodes[id.index()];
            let image = node
                .children
                .iter()
                .map(|child| self.nodes[child.index()].image)
                .fold(node.own_image, TestImage::worst);
            self.nodes[id.index()].image = image;
        }
    }

    /// Resets every image to [`TestImage::Initial`].
    pub(crate) fn reset_images(&mut self) {
        for node in &mut self.nodes {
            node.own_image = TestImage::Initial;
            node.image = TestImage::Initial;
            node.duration = None;
            if matches!(node.kind, DisplayNodeKind::Test { .. }) {
                node.text.clone_from(&node.label);
            }
        }
    }

    /// Moves `id` under the root group `group`, keeping the group's children in `sort` order.
    pub(crate) fn move_to_group(
        &mut self,
        id: DisplayNodeId,
        group: DisplayNodeId,
        sort: Option<TreeSort>,
    ) -> TreeChange {
        self.detach(id);
        let index = match sort {
            Some(sort) => {
                let node = &self.nodes[id.index()];
                self.nodes[group.index()]
                    .children
                    .iter()
                    .position(|&sibling| {
                        sort.compare(node, &self.nodes[sibling.index()]) == Ordering::Less
                    })
                    .unwrap_or(self.nodes[group.index()].children.len())
            }
            None => self.nodes[group.index()].children.len(),
        };
        self.nodes[group.index()].children.insert(index, id);
        self.nodes[id.index()].parent = Some(group);
        TreeChange::Moved {
            node: id,
            parent: Some(group),
            index,
        }
    }

    /// Removes a root group node. Its children must already have been moved away.
    pub(crate) fn remove_group(&mut self, id: DisplayNodeId) -> TreeChange {
        self.detach(id);
        self.groups.retain(|_, node| *node != id);
        TreeChange::Removed { node: id }
    }

    fn detach(&mut self, id: DisplayNodeId) {
        match self.nodes[id.index()].parent.take() {
            Some(parent) => self.nodes[parent.index()].children.retain(|&c| c != id),
            None => self.roots.retain(|&root| root != id),
        }
    }

    /// Reorders sibling test nodes throughout the tree.
    pub(crate) fn sort(&mut self, sort: TreeSort) {
        let nodes = &self.nodes;
        let sort_siblings = |siblings: &mut Vec<DisplayNodeId>| {
            let all_tests = siblings
                .iter()
                .all(|id| matches!(nodes[id.index()].kind, DisplayNodeKind::Test { .. }));
            if all_tests {
                siblings.sort_by(|a, b| sort.compare(&nodes[a.index()], &nodes[b.index()]));
            }
        };

        let mut roots = std::mem::take(&mut self.roots);
        sort_siblings(&mut roots);
        let children: Vec<_> = self
            .nodes
            .iter()
            .map(|node| {
                let mut children = node.children.clone();
                sort_siblings(&mut children);
                children
            })
            .collect();

        self.roots = roots;
        for (node, children) in self.nodes.iter_mut().zip(children) {
            node.children = children;
        }
    }

    pub(crate) fn set_expanded(&mut self, id: DisplayNodeId, expanded: bool) -> bool {
        match self.nodes.get_mut(id.index()) {
            Some(node) if node.expanded != expanded => {
                node.expanded = expanded;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_checked(&mut self, id: DisplayNodeId, checked: bool) -> bool {
        match self.nodes.get_mut(id.index()) {
            Some(node) if node.checked != checked => {
                node.checked = checked;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn select(&mut self, id: Option<DisplayNodeId>) {
        self.selected = id.filter(|id| id.index() < self.nodes.len());
    }

    pub(crate) fn set_top(&mut self, id: Option<DisplayNodeId>) {
        self.top = id.filter(|id| id.index() < self.nodes.len());
    }

    /// Returns the checked nodes that are still attached, in display order.
    pub fn checked(&self) -> impl Iterator<Item = DisplayNodeId> + '_ {
        self.iter()
            .map(|(_, id)| id)
            .filter(|&id| self.node(id).checked)
    }

    /// Returns the expanded nodes that are still attached, in display order.
    pub fn expanded(&self) -> impl Iterator<Item = DisplayNodeId> + '_ {
        self.iter()
            .map(|(_, id)| id)
            .filter(|&id| self.node(id).expanded)
    }

    /// Renders the tree as indented text, one node per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (depth, id) in self.iter() {
            let node = self.node(id);
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(&node.text);
            if node.image != TestImage::Initial {
                swrite!(out, " <{:?}>", node.image);
            }
            out.push('\n');
        }
        out
    }
}
