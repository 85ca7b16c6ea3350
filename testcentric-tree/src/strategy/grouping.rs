// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group membership and ordering for the list strategies.

use crate::settings::Grouping;
use smallvec::{SmallVec, smallvec};
use std::cmp::Ordering;
use testcentric_model::{ResultLookup, ResultNode, TestNode, TestStatus, TestType};

/// The group for tests without a category.
pub const NO_CATEGORY_GROUP: &str = "None";

/// The group for tests without a result.
pub const NOT_RUN_GROUP: &str = "Not Run";

/// Outcome groups, in display order.
pub const OUTCOME_GROUPS: [&str; 6] = [
    "Failed",
    "Warning",
    "Ignored",
    "Inconclusive",
    "Passed",
    NOT_RUN_GROUP,
];

/// Duration groups, in display order.
pub const DURATION_GROUPS: [&str; 4] = [
    "Slow > 1 sec",
    "Medium > 100 ms",
    "Fast < 100 ms",
    NOT_RUN_GROUP,
];

/// A test that a list strategy shows under one or more groups.
#[derive(Clone, Debug)]
pub(crate) struct Member<'a> {
    pub(crate) node: &'a TestNode,
    /// Own and inherited categories, sorted and deduplicated.
    pub(crate) categories: Vec<&'a str>,
    /// The name of the containing assembly.
    pub(crate) assembly: &'a str,
}

/// Which nodes a list strategy shows directly under its groups.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ListLevel {
    Fixtures,
    TestCases,
}

impl ListLevel {
    fn is_member(self, node: &TestNode) -> bool {
        match self {
            Self::Fixtures => node.test_type().is_fixture(),
            Self::TestCases => !node.is_suite(),
        }
    }
}

/// Collects list members in declaration order.
pub(crate) fn collect_members(root: &TestNode, level: ListLevel) -> Vec<Member<'_>> {
    let mut members = Vec::new();
    let mut inherited = Vec::new();
    visit(root, level, root.name(), &mut inherited, &mut members);
    members
}

fn visit<'a>(
    node: &'a TestNode,
    level: ListLevel,
    assembly: &'a str,
    inherited: &mut Vec<&'a str>,
    members: &mut Vec<Member<'a>>,
) {
    let depth = inherited.len();
    inherited.extend(node.categories());
    let assembly = if node.test_type() == &TestType::Assembly {
        node.name()
    } else {
        assembly
    };

    if level.is_member(node) {
        let mut categories = inherited.clone();
        categories.sort_unstable();
        categories.dedup();
        members.push(Member {
            node,
            categories,
            assembly,
        });
    } else {
        for child in node.children() {
            visit(child, level, assembly, inherited, members);
        }
    }
    inherited.truncate(depth);
}

/// Returns the groups a member belongs to. Only category grouping yields more than one.
pub(crate) fn group_names<'a, R: ResultLookup + ?Sized>(
    grouping: Grouping,
    member: &Member<'a>,
    results: &R,
) -> SmallVec<[&'a str; 2]> {
    match grouping {
        Grouping::Assembly => smallvec![member.assembly],
        Grouping::Category if member.categories.is_empty() => smallvec![NO_CATEGORY_GROUP],
        Grouping::Category => member.categories.iter().copied().collect(),
        Grouping::Outcome => smallvec![outcome_group(results.result(member.node.id()))],
        Grouping::Duration => smallvec![duration_group(results.result(member.node.id()))],
    }
}

/// Returns the outcome group for a result.
pub(crate) fn outcome_group(result: Option<&ResultNode>) -> &'static str {
    let Some(result) = result else {
        return NOT_RUN_GROUP;
    };
    let outcome = result.outcome();
    match outcome.status {
        TestStatus::Failed => "Failed",
        TestStatus::Warning => "Warning",
        TestStatus::Skipped if outcome.is_ignored() => "Ignored",
        TestStatus::Skipped => NOT_RUN_GROUP,
        TestStatus::Inconclusive => "Inconclusive",
        TestStatus::Passed => "Passed",
    }
}

/// Returns the duration group for a result.
pub(crate) fn duration_group(result: Option<&ResultNode>) -> &'static str {
    match result.and_then(ResultNode::duration) {
        None => NOT_RUN_GROUP,
        Some(seconds) if seconds > 1.0 => DURATION_GROUPS[0],
        Some(seconds) if seconds > 0.1 => DURATION_GROUPS[1],
        Some(_) => DURATION_GROUPS[2],
    }
}

/// Returns the group a result moves its member to, for groupings that depend on results.
pub(crate) fn result_group(grouping: Grouping, result: &ResultNode) -> Option<&'static str> {
    match grouping {
        Grouping::Outcome => Some(outcome_group(Some(result))),
        Grouping::Duration => Some(duration_group(Some(result))),
        Grouping::Assembly | Grouping::Category => None,
    }
}

/// Compares two group names by their display order.
///
/// Assembly groups have no fixed order; they compare equal and keep their first-seen order.
pub(crate) fn compare_groups(grouping: Grouping, a: &str, b: &str) -> Ordering {
    fn fixed(groups: &[&str], name: &str) -> usize {
        groups
            .iter()
            .position(|group| *group == name)
            .unwrap_or(groups.len())
    }

    match grouping {
        Grouping::Assembly => Ordering::Equal,
        Grouping::Category => (a == NO_CATEGORY_GROUP)
            .cmp(&(b == NO_CATEGORY_GROUP))
            .then_with(|| a.cmp(b)),
        Grouping::Outcome => fixed(&OUTCOME_GROUPS, a).cmp(&fixed(&OUTCOME_GROUPS, b)),
        Grouping::Duration => fixed(&DURATION_GROUPS, a).cmp(&fixed(&DURATION_GROUPS, b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testcentric_model::{NoResults, Outcome, TestStatus};
    use test_case::test_case;

    fn assembly() -> TestNode {
        TestNode::suite(
            "1",
            TestType::Assembly,
            "mock.dll",
            vec![TestNode::suite(
                "2",
                TestType::TestFixture,
                "Ns.Fixture",
                vec![
                    TestNode::test_case("3", "Ns.Fixture.A")
                        .with_category("A")
                        .with_category("B"),
                    TestNode::test_case("4", "Ns.Fixture.B"),
                ],
            )
            .with_category("A")],
        )
    }

    #[test]
    fn members_inherit_categories_and_assembly() {
        let root = assembly();
        let cases = collect_members(&root, ListLevel::TestCases);
        let summary: Vec<_> = cases
            .iter()
            .map(|m| (m.node.id().as_str(), m.categories.clone(), m.assembly))
            .collect();
        assert_eq!(
            summary,
            [
                ("3", vec!["A", "B"], "mock.dll"),
                ("4", vec!["A"], "mock.dll"),
            ]
        );

        let fixtures = collect_members(&root, ListLevel::Fixtures);
        assert_eq!(fixtures.len(), 1);
        assert_eq!(fixtures[0].node.id().as_str(), "2");
    }

    #[test]
    fn category_fan_out() {
        let root = assembly();
        let cases = collect_members(&root, ListLevel::TestCases);
        assert_eq!(
            group_names(Grouping::Category, &cases[0], &NoResults).as_slice(),
            ["A", "B"]
        );
        assert_eq!(
            group_names(Grouping::Assembly, &cases[0], &NoResults).as_slice(),
            ["mock.dll"]
        );
    }

    #[test_case(None, "Not Run"; "no result")]
    #[test_case(Some(Outcome::FAILED), "Failed"; "failed")]
    #[test_case(Some(Outcome::with_label(TestStatus::Skipped, "Ignored")), "Ignored"; "ignored")]
    #[test_case(Some(Outcome::SKIPPED), "Not Run"; "skipped")]
    #[test_case(Some(Outcome::PASSED), "Passed"; "passed")]
    fn outcome_groups(outcome: Option<Outcome>, expected: &str) {
        let result = outcome.map(|outcome| ResultNode::new("1", outcome));
        assert_eq!(outcome_group(result.as_ref()), expected);
    }

    #[test_case(None, "Not Run")]
    #[test_case(Some(2.5), "Slow > 1 sec")]
    #[test_case(Some(0.5), "Medium > 100 ms")]
    #[test_case(Some(0.1), "Fast < 100 ms")]
    fn duration_groups(duration: Option<f64>, expected: &str) {
        let result = ResultNode::new("1", Outcome::PASSED);
        let result = match duration {
            Some(seconds) => result.with_duration(seconds),
            None => result,
        };
        assert_eq!(duration_group(Some(&result)), expected);
    }

    #[test]
    fn group_order() {
        let mut names = vec!["Passed", "Not Run", "Failed"];
        names.sort_by(|a, b| compare_groups(Grouping::Outcome, a, b));
        assert_eq!(names, ["Failed", "Passed", "Not Run"]);

        let mut names = vec!["None", "Zeta", "Alpha"];
        names.sort_by(|a, b| compare_groups(Grouping::Category, a, b));
        assert_eq!(names, ["Alpha", "Zeta", "None"]);
    }
}
