// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Display strategies.
//!
//! A [`DisplayStrategy`] owns the mapping from the loaded test graph to a [`DisplayTree`]. There
//! are three shapes, selected by [`StrategyId`]:
//!
//! * `NUNIT_TREE` keeps the suite hierarchy.
//! * `FIXTURE_LIST` shows fixtures under groups.
//! * `TEST_LIST` shows test cases under groups.
//!
//! Strategies rebuild the tree on [`reload`](DisplayStrategy::reload) and patch it as results
//! arrive, returning the [`TreeChange`]s the view needs to mirror.

mod grouping;
mod list;
mod nunit_tree;

pub use grouping::{DURATION_GROUPS, NO_CATEGORY_GROUP, NOT_RUN_GROUP, OUTCOME_GROUPS};

use crate::{
    display::{DisplayNodeId, DisplayTree, TreeChange, TreeSort, VisualNodeKey},
    settings::{Grouping, StrategyId, TreeSettings},
};
use std::collections::BTreeSet;
use testcentric_filtering::FilterVerdict;
use testcentric_model::{ResultLookup, ResultNode, TestNode};
use tracing::debug;

/// The inputs a strategy reads while building or patching its tree.
#[derive(Clone, Copy)]
pub struct StrategyContext<'a> {
    /// The loaded test graph.
    pub tests: &'a TestNode,
    /// The latest results.
    pub results: &'a dyn ResultLookup,
    /// Which tests pass the active filter.
    pub verdict: &'a FilterVerdict,
    /// The current settings.
    pub settings: &'a TreeSettings,
}

/// Expansion, checked state, selection and scroll position of a tree, by persistent key.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TreeState {
    /// Expanded nodes.
    pub expanded: BTreeSet<VisualNodeKey>,
    /// Checked nodes.
    pub checked: BTreeSet<VisualNodeKey>,
    /// The selected node.
    pub selected: Option<VisualNodeKey>,
    /// The topmost visible node.
    pub top: Option<VisualNodeKey>,
}

/// One of the three display strategies, with the tree it currently shows.
#[derive(Clone, Debug)]
pub struct DisplayStrategy {
    id: StrategyId,
    grouping: Option<Grouping>,
    sort: Option<TreeSort>,
    tree: DisplayTree,
}

impl DisplayStrategy {
    /// Creates the strategy for `id`, taking its grouping from `settings`. The tree starts out
    /// empty.
    pub fn new(id: StrategyId, settings: &TreeSettings) -> Self {
        debug!("creating display strategy {id}");
        Self {
            id,
            grouping: settings.grouping_for(id),
            sort: None,
            tree: DisplayTree::new(),
        }
    }

    /// Returns the id of this strategy.
    pub fn id(&self) -> StrategyId {
        self.id
    }

    /// Returns the active grouping, or `None` for the NUnit tree.
    pub fn grouping(&self) -> Option<Grouping> {
        self.grouping
    }

    /// Changes the grouping. Returns false if this strategy does not group, or the grouping is
    /// unchanged. The tree must be reloaded afterwards.
    pub fn set_grouping(&mut self, grouping: Grouping) -> bool {
        match &mut self.grouping {
            Some(current) if *current != grouping => {
                *current = grouping;
                true
            }
            _ => false,
        }
    }

    /// Returns the active sort, if any.
    pub fn sort_order(&self) -> Option<TreeSort> {
        self.sort
    }

    /// Returns the tree currently shown.
    pub fn tree(&self) -> &DisplayTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut DisplayTree {
        &mut self.tree
    }

    /// Rebuilds the tree.
    ///
    /// With `preserve_state`, expansion, checked state, selection and scroll position are
    /// carried over from the current tree by key. Keys that no longer exist are dropped.
    pub fn reload(&mut self, ctx: &StrategyContext<'_>, preserve_state: bool) {
        let state = preserve_state.then(|| self.capture_state());
        self.reload_with_state(ctx, state.as_ref());
    }

    /// Rebuilds the tree and applies `state`, or the default expansion if `state` is `None`.
    pub fn reload_with_state(&mut self, ctx: &StrategyContext<'_>, state: Option<&TreeState>) {
        let mut tree = DisplayTree::new();
        match (self.id, self.grouping) {
            (StrategyId::NUnitTree, _) => nunit_tree::build(&mut tree, ctx),
            (StrategyId::FixtureList, grouping) => list::build(
                &mut tree,
                ctx,
                grouping::ListLevel::Fixtures,
                grouping.unwrap_or(ctx.settings.fixture_list_group_by),
            ),
            (StrategyId::TestList, grouping) => list::build(
                &mut tree,
                ctx,
                grouping::ListLevel::TestCases,
                grouping.unwrap_or(ctx.settings.test_list_group_by),
            ),
        }
        tree.refresh_all_images();
        if let Some(sort) = self.sort {
            tree.sort(sort);
        }

        match state {
            Some(state) => apply_state(&mut tree, state),
            None => self.apply_default_expansion(&mut tree),
        }
        debug!(
            "{} reloaded: {} root nodes",
            self.id,
            tree.roots().len()
        );
        self.tree = tree;
    }

    fn apply_default_expansion(&self, tree: &mut DisplayTree) {
        let to_expand: Vec<_> = match self.id {
            // Expand down to, but not into, fixtures.
            StrategyId::NUnitTree => tree
                .iter()
                .map(|(_, id)| id)
                .filter(|&id| {
                    let node = tree.node(id);
                    !node.children().is_empty()
                        && node.children().iter().any(|&c| !tree.node(c).is_test_case())
                })
                .collect(),
            StrategyId::FixtureList | StrategyId::TestList => tree.roots().to_vec(),
        };
        for id in to_expand {
            tree.set_expanded(id, true);
        }
    }

    /// Returns the current tree state by key.
    pub fn capture_state(&self) -> TreeState {
        let key = |id: DisplayNodeId| self.tree.node(id).key();
        TreeState {
            expanded: self.tree.expanded().map(key).collect(),
            checked: self.tree.checked().map(key).collect(),
            selected: self.tree.selected().map(key),
            top: self.tree.top().map(key),
        }
    }

    /// Empties the tree, as on unload.
    pub fn clear(&mut self) {
        self.tree = DisplayTree::new();
    }

    /// Resets every result-dependent visual, as at the start of a run.
    pub fn reset_results(&mut self) {
        self.tree.reset_images();
    }

    /// Re-orders sibling test nodes.
    pub fn sort(&mut self, sort: TreeSort) {
        self.sort = Some(sort);
        self.tree.sort(sort);
    }

    /// Patches the tree for a finished test case.
    pub fn on_test_finished(
        &mut self,
        result: &ResultNode,
        ctx: &StrategyContext<'_>,
    ) -> Vec<TreeChange> {
        self.on_result(result, ctx)
    }

    /// Patches the tree for a finished suite.
    pub fn on_suite_finished(
        &mut self,
        result: &ResultNode,
        ctx: &StrategyContext<'_>,
    ) -> Vec<TreeChange> {
        self.on_result(result, ctx)
    }

    fn on_result(&mut self, result: &ResultNode, ctx: &StrategyContext<'_>) -> Vec<TreeChange> {
        let nodes = self.tree.nodes_for_test(result.id()).to_vec();
        if nodes.is_empty() {
            // The test is filtered out, folded away, or not shown by this strategy.
            debug!("{}: no display node for test {}", self.id, result.id());
            return Vec::new();
        }

        let show_duration = ctx.settings.show_test_duration;
        let mut changes = Vec::new();
        for &node in &nodes {
            changes.extend(self.tree.set_result(node, Some(result), show_duration));
            self.tree.refresh_images_from(Some(node), &mut changes);
        }

        if let Some(grouping) = self.grouping
            && self.id != StrategyId::NUnitTree
        {
            list::regroup(&mut self.tree, &nodes, grouping, result, self.sort, &mut changes);
        }
        changes
    }
}

fn apply_state(tree: &mut DisplayTree, state: &TreeState) {
    for key in &state.expanded {
        for id in tree.nodes_for_key(key) {
            tree.set_expanded(id, true);
        }
    }
    for key in &state.checked {
        for id in tree.nodes_for_key(key) {
            tree.set_checked(id, true);
        }
    }
    let selected = state.selected.as_ref().and_then(|key| tree.find_key(key));
    tree.select(selected);
    let top = state.top.as_ref().and_then(|key| tree.find_key(key));
    tree.set_top(top);
}
