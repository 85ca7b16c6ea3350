// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::StrategyContext;
use crate::display::{DisplayNodeId, DisplayTree};
use testcentric_model::{TestNode, TestType};

/// Builds the suite hierarchy.
///
/// A `test-run` root is transparent, so its assemblies become the roots. With namespaces
/// hidden, namespace suites are folded into their parents and fixtures show their full names.
pub(super) fn build(tree: &mut DisplayTree, ctx: &StrategyContext<'_>) {
    if ctx.tests.test_type() == &TestType::TestRun {
        for child in ctx.tests.children() {
            add_subtree(tree, None, child, ctx);
        }
    } else {
        add_subtree(tree, None, ctx.tests, ctx);
    }
}

fn add_subtree(
    tree: &mut DisplayTree,
    parent: Option<DisplayNodeId>,
    node: &TestNode,
    ctx: &StrategyContext<'_>,
) {
    if !ctx.verdict.is_visible(node.id()) {
        return;
    }

    let show_namespace = ctx.settings.show_namespace;
    if !show_namespace && node.test_type() == &TestType::TestSuite {
        for child in node.children() {
            add_subtree(tree, parent, child, ctx);
        }
        return;
    }

    let label = if !show_namespace && node.test_type().is_fixture() {
        node.full_name()
    } else {
        node.name()
    };
    let id = tree.push_test(
        parent,
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
        add_subtree(tree, Some(id), child, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        settings::TreeSettings,
        test_helpers::{mock_assembly, mock_results},
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use testcentric_filtering::FilterVerdict;
    use testcentric_model::{NoResults, Outcome, ResultNode, ResultStore};

    fn render(tests: &TestNode, settings: &TreeSettings, results: &ResultStore) -> String {
        let verdict = FilterVerdict::all();
        let ctx = StrategyContext {
            tests,
            results,
            verdict: &verdict,
            settings,
        };
        let mut tree = DisplayTree::new();
        build(&mut tree, &ctx);
        tree.refresh_all_images();
        tree.render()
    }

    #[test]
    fn keeps_hierarchy_without_test_run() {
        let tests = mock_assembly();
        assert_eq!(
            render(&tests, &TreeSettings::default(), &ResultStore::new()),
            indoc! {"
                mock-assembly.dll
                  NUnit
                    Tests
                      Assemblies
                        MockTestFixture
                          MockTest1
                          MockTest2
                          MockTest3
                          MockTest4
                      BadFixture
                        SomeTest
                      ParameterizedFixture
                        Add
                          Add(1,2)
                          Add(2,3)
            "}
        );
    }

    #[test]
    fn hidden_namespaces_are_folded() {
        let tests = mock_assembly();
        let settings = TreeSettings {
            show_namespace: false,
            ..TreeSettings::default()
        };
        assert_eq!(
            render(&tests, &settings, &ResultStore::new()),
            indoc! {"
                mock-assembly.dll
                  NUnit.Tests.Assemblies.MockTestFixture
                    MockTest1
                    MockTest2
                    MockTest3
                    MockTest4
                  NUnit.Tests.BadFixture
                    SomeTest
                  NUnit.Tests.ParameterizedFixture
                    Add
                      Add(1,2)
                      Add(2,3)
            "}
        );
    }

    #[test]
    fn durations_and_images() {
        let tests = mock_assembly();
        let settings = TreeSettings {
            show_test_duration: true,
            ..TreeSettings::default()
        };
        let mut results = ResultStore::new();
        results.insert(ResultNode::new("0-1021", Outcome::FAILED).with_duration(0.25));
        let rendered = render(&tests, &settings, &results);
        assert!(
            rendered.contains("      BadFixture <Failure>\n        SomeTest [0.250s] <Failure>\n"),
            "{rendered}"
        );
        assert!(rendered.starts_with("mock-assembly.dll <Failure>\n"), "{rendered}");
    }

    #[test]
    fn full_run_images() {
        let tests = mock_assembly();
        let rendered = render(&tests, &TreeSettings::default(), &mock_results());
        assert_eq!(
            rendered,
            indoc! {"
                mock-assembly.dll <Failure>
                  NUnit <Failure>
                    Tests <Failure>
                      Assemblies <Failure>
                        MockTestFixture <Failure>
                          MockTest1 <Success>
                          MockTest2 <Failure>
                          MockTest3 <Success>
                          MockTest4 <Ignored>
                      BadFixture <Failure>
                        SomeTest <Failure>
                      ParameterizedFixture <Warning>
                        Add <Warning>
                          Add(1,2) <Success>
                          Add(2,3) <Warning>
            "}
        );
    }

    #[test]
    fn single_suite_document() {
        let tests = TestNode::parse(
            r#"<test-suite type="TestFixture" id="1" name="Fixture"><test-case id="2" name="Case" /></test-suite>"#,
        )
        .unwrap();
        let verdict = FilterVerdict::all();
        let settings = TreeSettings::default();
        let ctx = StrategyContext {
            tests: &tests,
            results: &NoResults,
            verdict: &verdict,
            settings: &settings,
        };
        let mut tree = DisplayTree::new();
        build(&mut tree, &ctx);

        assert_eq!(tree.roots().len(), 1);
        let root = tree.node(tree.roots()[0]);
        assert_eq!(root.test_id().map(|id| id.as_str()), Some("1"));
        assert_eq!(root.children().len(), 1);
        let child = tree.node(root.children()[0]);
        assert_eq!(child.test_id().map(|id| id.as_str()), Some("2"));
    }
}
