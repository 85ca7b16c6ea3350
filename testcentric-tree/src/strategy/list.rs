// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The fixture list and test list strategies.

use super::{
    StrategyContext,
    grouping::{self, ListLevel, Member},
};
use crate::{
    display::{DisplayNodeId, DisplayNodeKind, DisplayTree, TreeChange, TreeSort},
    settings::Grouping,
};
use indexmap::IndexMap;
use testcentric_model::{ResultNode, TestNode};

/// Builds a grouped list of fixtures or test cases.
///
/// Members appear once under each group they belong to, so with category grouping the total
/// shown across groups can exceed the number of tests. Empty groups are not shown.
pub(super) fn build(
    tree: &mut DisplayTree,
    ctx: &StrategyContext<'_>,
    level: ListLevel,
    grouping: Grouping,
) {
    let mut groups: IndexMap<&str, Vec<&Member<'_>>> = IndexMap::new();
    let members = grouping::collect_members(ctx.tests, level);
    for member in &members {
        if !ctx.verdict.is_visible(member.node.id()) {
            continue;
        }
        for name in grouping::group_names(grouping, member, ctx.results) {
            groups.entry(name).or_default().push(member);
        }
    }
    // A stable sort, so that assembly groups keep their first-seen order.
    groups.sort_by(|a, _, b, _| grouping::compare_groups(grouping, a, b));

    for (name, members) in groups {
        let group = tree.insert_group(name.to_owned(), tree.roots().len());
        for member in members {
            let label = if ctx.settings.show_namespace {
                member.node.full_name()
            } else {
                member.node.name()
            };
            add_subtree(tree, group, member.node, label, ctx);
        }
        let _ = tree.refresh_group_text(group);
    }
}

fn add_subtree(
    tree: &mut DisplayTree,
    parent: DisplayNodeId,
    node: &TestNode,
    label: &str,
    ctx: &StrategyContext<'_>,
) {
    let id = tree.push_test(
        Some(parent),
        node.id().clone(),
        node.test_type().clone(),
        label.to_owned(),
    );
    let _ = tree.set_result(
        id,
        ctx.results.result(node.id()),
        ctx.settings.show_test_duration,
    );
    for child in node.children() {
        if ctx.verdict.is_visible(child.id()) {
            add_subtree(tree, id, child, child.name(), ctx);
        }
    }
}

/// Moves group members whose result changed group under outcome or duration grouping.
///
/// Missing groups are created in their display position, and groups left empty are removed.
pub(super) fn regroup(
    tree: &mut DisplayTree,
    nodes: &[DisplayNodeId],
    grouping: Grouping,
    result: &ResultNode,
    sort: Option<TreeSort>,
    changes: &mut Vec<TreeChange>,
) {
    let Some(target_name) = grouping::result_group(grouping, result) else {
        return;
    };

    for &node in nodes {
        // Only direct members of a group move. Test cases inside a fixture stay put.
        let Some(old_group) = tree.node(node).parent() else {
            continue;
        };
        let DisplayNodeKind::Group { name } = tree.node(old_group).kind() else {
            continue;
        };
        if name == target_name {
            continue;
        }

        let new_group = match tree.group(target_name) {
            Some(group) => group,
            None => {
                let index = tree
                    .roots()
                    .iter()
                    .position(|&root| match tree.node(root).kind() {
                        DisplayNodeKind::Group { name } => {
                            grouping::compare_groups(grouping, target_name, name).is_lt()
                        }
                        DisplayNodeKind::Test { .. } => false,
                    })
                    .unwrap_or(tree.roots().len());
                let group = tree.insert_group(target_name.to_owned(), index);
                tree.set_expanded(group, true);
                changes.push(TreeChange::Added {
                    node: group,
                    parent: None,
                    index,
                });
                group
            }
        };

        changes.push(tree.move_to_group(node, new_group, sort));
        changes.extend(tree.refresh_group_text(new_group));
        tree.refresh_images_from(Some(new_group), changes);

        if tree.node(old_group).children().is_empty() {
            changes.push(tree.remove_group(old_group));
        } else {
            changes.extend(tree.refresh_group_text(old_group));
            tree.refresh_images_from(Some(old_group), changes);
        }
    }
}
