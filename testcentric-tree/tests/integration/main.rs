// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presenter scenarios, driven through the event queue with a recording view and a mock model.

use camino_tempfile::Utf8TempDir;
use pretty_assertions::assert_eq;
use testcentric_filtering::{CategoryFilter, OutcomeBucket, OutcomeFilter};
use testcentric_model::{Outcome, ResultNode, TestId, TestNode};
use testcentric_tree::{
    ActiveTestItem, FilterEdit, Grouping, GuiLayout, ModelEvent, SessionState, SettingChange,
    StrategyId, TestImage, TestSelection, TreeCommand, TreeSettings, ViewEvent,
    visual_state::{VisualState, visual_state_file_name},
};

mod fixtures;

use fixtures::*;

fn settings(display_format: StrategyId) -> TreeSettings {
    TreeSettings {
        display_format,
        ..TreeSettings::default()
    }
}

fn loaded(tests: TestNode, settings: TreeSettings) -> Presenter {
    let mut presenter = presenter(MockModel::new(tests), settings);
    presenter.dispatch(ModelEvent::TestLoaded);
    presenter
}

fn single_suite() -> TestNode {
    TestNode::parse(
        r#"<test-suite type="TestFixture" id="1" name="Suite"><test-case id="2" name="Case" /></test-suite>"#,
    )
    .unwrap()
}

#[test]
fn single_suite_then_test_list_by_outcome() {
    let mut presenter = loaded(single_suite(), TreeSettings::default());
    let tree = presenter.tree();
    assert_eq!(tree.roots().len(), 1);
    let root = tree.node(tree.roots()[0]);
    assert_eq!(root.test_id(), Some(&TestId::new("1")));
    assert_eq!(root.children().len(), 1);
    assert_eq!(
        tree.node(root.children()[0]).test_id(),
        Some(&TestId::new("2"))
    );

    let handle = presenter.handle();
    assert!(handle.post(SettingChange::DisplayFormat(StrategyId::TestList)));
    assert!(handle.post(SettingChange::TestListGroupBy(Grouping::Outcome)));
    assert_eq!(presenter.process_pending(), 2);

    let tree = presenter.tree();
    assert_eq!(presenter.strategy().id(), StrategyId::TestList);
    assert_eq!(tree.group_names().collect::<Vec<_>>(), ["Not Run"]);
    let group = tree.node(tree.roots()[0]);
    assert_eq!(group.text(), "Not Run (1)");
    let members: Vec<_> = group
        .children()
        .iter()
        .map(|&child| tree.node(child).test_id().cloned())
        .collect();
    assert_eq!(members, [Some(TestId::new("2"))]);
}

#[test]
fn finished_test_updates_ancestor_without_reload() {
    let mut presenter = loaded(single_suite(), TreeSettings::default());
    let loads = presenter.view().load_count();

    presenter.dispatch(ModelEvent::TestFinished(ResultNode::new(
        "2",
        Outcome::FAILED,
    )));

    let root = node_for(&presenter, "1");
    assert_eq!(presenter.tree().node(root).image(), TestImage::Failure);
    assert!(
        presenter
            .view()
            .calls
            .contains(&ViewCall::SetImage(root, TestImage::Failure))
    );
    assert_eq!(presenter.view().load_count(), loads, "no full reload");
}

#[test]
fn passed_filter_with_only_failures_hides_everything() {
    let mut presenter = loaded(single_suite(), TreeSettings::default());
    presenter.dispatch(ModelEvent::TestFinished(ResultNode::new(
        "2",
        Outcome::FAILED,
    )));
    presenter.dispatch(ViewEvent::FilterEdited(vec![FilterEdit::Outcome(
        OutcomeFilter::new([OutcomeBucket::Passed]),
    )]));

    assert!(presenter.tree().is_empty());
    assert_eq!(presenter.view().rendered, "");

    // Widening the filter brings the failure back, with its image.
    presenter.dispatch(ViewEvent::FilterEdited(vec![FilterEdit::Outcome(
        OutcomeFilter::new([OutcomeBucket::Passed, OutcomeBucket::Failed]),
    )]));
    assert_eq!(
        presenter.view().rendered,
        "Suite <Failure>\n  Case <Failure>\n"
    );
}

#[test]
fn checking_leaves_selects_exactly_those_tests() {
    let settings = TreeSettings {
        show_check_boxes: true,
        ..TreeSettings::default()
    };
    let mut presenter = loaded(TestNode::parse(TWO_CASES).unwrap(), settings);
    let first = node_for(&presenter, "1");
    let second = node_for(&presenter, "2");

    for node in [first, second] {
        presenter.dispatch(ViewEvent::NodeChecked {
            node,
            checked: true,
        });
    }
    assert_eq!(presenter.model().selected, Some(selection(&["1", "2"])));

    for node in [first, second] {
        presenter.dispatch(ViewEvent::NodeChecked {
            node,
            checked: false,
        });
    }
    // An empty selection, not "all tests".
    assert_eq!(presenter.model().selected, Some(TestSelection::new()));
}

#[test]
fn checked_groups_and_nodes_are_deduplicated() {
    let settings = TreeSettings {
        display_format: StrategyId::TestList,
        test_list_group_by: Grouping::Category,
        show_check_boxes: true,
        ..TreeSettings::default()
    };
    let mut presenter = loaded(MOCK_ASSEMBLY.clone(), settings);

    let in_group = |presenter: &Presenter, id: &str, group: &str| {
        let tree = presenter.tree();
        tree.nodes_for_test(&TestId::new(id))
            .iter()
            .copied()
            .find(|&node| {
                tree.node(node)
                    .parent()
                    .is_some_and(|parent| tree.node(parent).label() == group)
            })
            .unwrap()
    };
    let foo = presenter.tree().group("Foo").unwrap();
    let mock_test2 = in_group(&presenter, "0-1004", "FixtureCategory");
    let mock_test3 = in_group(&presenter, "0-1005", "AnotherCategory");

    for node in [foo, mock_test2, mock_test3] {
        presenter.dispatch(ViewEvent::NodeChecked {
            node,
            checked: true,
        });
    }
    let selected = presenter.model().selected.clone().unwrap();
    assert_eq!(selected.len(), 3);
    assert_eq!(selected, selection(&["0-1004", "0-1005", "0-1006"]));
}

#[test]
fn unload_resets_filters_and_tree() {
    let mut presenter = loaded(MOCK_ASSEMBLY.clone(), TreeSettings::default());
    presenter.dispatch(ViewEvent::FilterEdited(vec![
        FilterEdit::Text("Mock".to_owned()),
        FilterEdit::Category(CategoryFilter::new(["Foo"], false)),
    ]));
    assert!(!presenter.filter().is_empty());

    presenter.dispatch(ModelEvent::TestUnloaded);

    assert!(presenter.filter().is_empty());
    assert!(presenter.tree().is_empty());
    assert_eq!(presenter.session(), SessionState::Unloaded);
    let calls = &presenter.view().calls;
    assert!(calls.contains(&ViewCall::CloseCategoryFilter));
    assert!(calls.contains(&ViewCall::Clear));
    assert!(!presenter.view().command(TreeCommand::Run).enabled);
}

#[test]
fn visual_state_display_format_overrides_settings() {
    let dir = Utf8TempDir::new().unwrap();
    let test_file = dir.path().join("mock-assembly.dll");
    let mut state = VisualState::new();
    state.display_strategy = Some(StrategyId::TestList);
    state.test_list_group_by = Some(Grouping::Category);
    state.save(&visual_state_file_name(&test_file)).unwrap();

    let model = MockModel::new(MOCK_ASSEMBLY.clone()).with_test_file(test_file);
    let mut presenter = presenter(model, settings(StrategyId::NUnitTree));
    presenter.dispatch(ModelEvent::TestLoaded);

    assert_eq!(presenter.strategy().id(), StrategyId::TestList);
    assert_eq!(presenter.strategy().grouping(), Some(Grouping::Category));
    // The saved format is written back into the settings snapshot.
    assert_eq!(presenter.settings().display_format, StrategyId::TestList);
    assert!(presenter.tree().group("Foo").is_some());
}

#[test]
fn settings_apply_when_visual_state_has_no_format() {
    let dir = Utf8TempDir::new().unwrap();
    let test_file = dir.path().join("mock-assembly.dll");
    VisualState::new()
        .save(&visual_state_file_name(&test_file))
        .unwrap();

    let model = MockModel::new(MOCK_ASSEMBLY.clone()).with_test_file(test_file);
    let mut presenter = presenter(model, settings(StrategyId::FixtureList));
    presenter.dispatch(ModelEvent::TestLoaded);

    assert_eq!(presenter.strategy().id(), StrategyId::FixtureList);
    assert_eq!(presenter.settings().display_format, StrategyId::FixtureList);
    assert_eq!(presenter.strategy().grouping(), Some(Grouping::Category));
}

#[test]
fn corrupt_visual_state_does_not_abort_load() {
    let dir = Utf8TempDir::new().unwrap();
    let test_file = dir.path().join("mock-assembly.dll");
    std::fs::write(visual_state_file_name(&test_file), "{ not json").unwrap();

    let model = MockModel::new(MOCK_ASSEMBLY.clone()).with_test_file(test_file);
    let mut presenter = presenter(model, TreeSettings::default());
    presenter.dispatch(ModelEvent::TestLoaded);

    assert_eq!(presenter.session(), SessionState::Loaded { running: false });
    assert_eq!(presenter.strategy().id(), StrategyId::NUnitTree);
    assert!(!presenter.tree().is_empty());
}

#[test]
fn visual_state_survives_unload_and_load() {
    let dir = Utf8TempDir::new().unwrap();
    let test_file = dir.path().join("mock-assembly.dll");
    let model = MockModel::new(MOCK_ASSEMBLY.clone()).with_test_file(&test_file);
    let mut presenter = presenter(model, TreeSettings::default());
    presenter.dispatch(ModelEvent::TestLoaded);

    let mock_test2 = node_for(&presenter, "0-1004");
    presenter.dispatch(ViewEvent::NodeSelected(Some(mock_test2)));
    presenter.dispatch(ViewEvent::FilterEdited(vec![FilterEdit::Text(
        "MockTest".to_owned(),
    )]));
    let before = presenter.strategy().capture_state();

    presenter.dispatch(ModelEvent::TestUnloaded);
    assert!(visual_state_file_name(&test_file).exists());
    assert!(presenter.filter().is_empty());

    presenter.dispatch(ModelEvent::TestLoaded);
    assert_eq!(presenter.filter().text_filter().text(), "MockTest");
    assert_eq!(presenter.strategy().capture_state(), before);
    let selected = presenter.tree().selected().unwrap();
    assert_eq!(
        presenter.tree().node(selected).test_id(),
        Some(&TestId::new("0-1004"))
    );
}

#[test]
fn reload_twice_is_idempotent() {
    for id in StrategyId::ALL {
        let mut presenter = loaded(MOCK_ASSEMBLY.clone(), settings(id));
        let node = node_for(&presenter, "0-1005");
        presenter.dispatch(ViewEvent::NodeSelected(Some(node)));

        presenter.dispatch(ModelEvent::TestReloaded);
        let once = (
            presenter.view().rendered.clone(),
            presenter.strategy().capture_state(),
        );
        presenter.dispatch(ModelEvent::TestReloaded);
        let twice = (
            presenter.view().rendered.clone(),
            presenter.strategy().capture_state(),
        );
        assert_eq!(once, twice, "strategy {id}");
    }
}

#[test]
fn context_menu_command_state() {
    let settings = TreeSettings {
        layout: GuiLayout::Mini,
        ..TreeSettings::default()
    };
    let mut presenter = loaded(single_suite(), settings);

    presenter.dispatch(ViewEvent::ContextMenuOpening);
    assert!(presenter.view().command(TreeCommand::Run).enabled);
    assert!(presenter.view().command(TreeCommand::Debug).enabled);
    assert!(presenter.view().command(TreeCommand::TestProperties).visible);

    presenter.dispatch(ModelEvent::RunStarting);
    presenter.dispatch(ViewEvent::ContextMenuOpening);
    assert!(!presenter.view().command(TreeCommand::Run).enabled);
    assert!(!presenter.view().command(TreeCommand::Debug).enabled);

    presenter.dispatch(ModelEvent::RunFinished);
    presenter.dispatch(ViewEvent::ContextMenuOpening);
    assert!(presenter.view().command(TreeCommand::Run).enabled);

    // In the full layout, properties have their own pane.
    let mut presenter = loaded(single_suite(), TreeSettings::default());
    presenter.dispatch(ViewEvent::ContextMenuOpening);
    assert!(!presenter.view().command(TreeCommand::TestProperties).visible);
}

#[test]
fn queued_edits_reload_once() {
    let mut presenter = loaded(MOCK_ASSEMBLY.clone(), TreeSettings::default());
    let loads = presenter.view().load_count();

    let handle = presenter.handle();
    std::thread::spawn(move || {
        handle.post(ViewEvent::FilterEdited(vec![FilterEdit::Text(
            "Mock".to_owned(),
        )]));
        handle.post(ViewEvent::FilterEdited(vec![FilterEdit::Text(
            "MockTest2".to_owned(),
        )]));
        handle.post(SettingChange::ShowTestDuration(true));
    })
    .join()
    .unwrap();

    assert_eq!(presenter.process_pending(), 3);
    assert_eq!(presenter.view().load_count(), loads + 1);
    let rendered = &presenter.view().rendered;
    assert!(rendered.contains("MockTest2"), "{rendered}");
    assert!(!rendered.contains("MockTest1"), "{rendered}");
    assert_eq!(presenter.process_pending(), 0);
    assert_eq!(presenter.view().load_count(), loads + 1);
}

#[test]
fn run_and_debug_commands() {
    let settings = TreeSettings {
        display_format: StrategyId::TestList,
        test_list_group_by: Grouping::Category,
        ..TreeSettings::default()
    };
    let mut presenter = loaded(MOCK_ASSEMBLY.clone(), settings);

    let mock_test3 = node_for(&presenter, "0-1005");
    presenter.dispatch(ViewEvent::NodeSelected(Some(mock_test3)));
    assert_eq!(
        presenter.model().active,
        Some(ActiveTestItem::Test(TestId::new("0-1005")))
    );
    presenter.dispatch(ViewEvent::Command(TreeCommand::Run));
    assert_eq!(presenter.model().runs, [selection(&["0-1005"])]);

    let foo = presenter.tree().group("Foo").unwrap();
    presenter.dispatch(ViewEvent::NodeSelected(Some(foo)));
    assert_eq!(
        presenter.model().active,
        Some(ActiveTestItem::Group {
            name: "Foo".to_owned(),
            tests: selection(&["0-1004", "0-1006"]),
        })
    );
    presenter.dispatch(ViewEvent::Command(TreeCommand::Debug));
    assert_eq!(
        presenter.model().debug_runs,
        [selection(&["0-1004", "0-1006"])]
    );

    // Nothing runs while a run is in progress.
    presenter.dispatch(ModelEvent::RunStarting);
    presenter.dispatch(ViewEvent::Command(TreeCommand::Run));
    assert_eq!(presenter.model().runs.len(), 1);
}

#[test]
fn results_move_tests_between_outcome_groups() {
    let settings = TreeSettings {
        display_format: StrategyId::TestList,
        test_list_group_by: Grouping::Outcome,
        ..TreeSettings::default()
    };
    let mut presenter = loaded(MOCK_ASSEMBLY.clone(), settings);
    presenter.dispatch(ModelEvent::RunStarting);
    assert!(presenter.view().calls.contains(&ViewCall::ResetAllImages));

    let mock_test1 = node_for(&presenter, "0-1003");
    presenter.dispatch(ModelEvent::TestFinished(ResultNode::new(
        "0-1003",
        Outcome::FAILED,
    )));

    let tree = presenter.tree();
    let failed = tree.group("Failed").unwrap();
    let roots: Vec<_> = tree
        .roots()
        .iter()
        .map(|&root| tree.node(root).label())
        .collect();
    assert_eq!(roots, ["Failed", "Not Run"]);
    let calls = &presenter.view().calls;
    assert!(calls.contains(&ViewCall::AddNode {
        node: failed,
        parent: None,
        index: 0
    }));
    assert!(calls.contains(&ViewCall::MoveNode {
        node: mock_test1,
        parent: Some(failed),
        index: 0
    }));
    assert!(calls.contains(&ViewCall::SetText(failed, "Failed (1)".to_owned())));
}

#[test]
fn stale_results_are_ignored() {
    let mut presenter = loaded(single_suite(), TreeSettings::default());
    let calls = presenter.view().calls.len();
    presenter.dispatch(ModelEvent::TestFinished(ResultNode::new(
        "no-such-test",
        Outcome::FAILED,
    )));
    assert_eq!(presenter.view().calls.len(), calls);
    assert_eq!(presenter.view().rendered, "Suite\n  Case\n");
}

#[test]
fn collapse_and_expand_commands() {
    let mut presenter = loaded(MOCK_ASSEMBLY.clone(), TreeSettings::default());
    let fixture = node_for(&presenter, "0-1009");
    let add = node_for(&presenter, "0-1031");
    assert!(!presenter.tree().node(fixture).is_expanded());

    presenter.dispatch(ViewEvent::Command(TreeCommand::ExpandAll));
    assert!(presenter.tree().node(fixture).is_expanded());
    assert!(presenter.tree().node(add).is_expanded());
    assert!(
        presenter
            .view()
            .calls
            .contains(&ViewCall::SetExpanded(fixture, true))
    );

    presenter.dispatch(ViewEvent::Command(TreeCommand::CollapseToFixtures));
    assert!(!presenter.tree().node(fixture).is_expanded());
    assert!(!presenter.tree().node(add).is_expanded());
    let parameterized = node_for(&presenter, "0-1030");
    assert!(presenter.tree().node(parameterized).is_expanded());

    presenter.dispatch(ViewEvent::Command(TreeCommand::CollapseAll));
    assert_eq!(presenter.tree().expanded().count(), 0);
}

#[test]
fn save_command_writes_visual_state() {
    let dir = Utf8TempDir::new().unwrap();
    let test_file = dir.path().join("mock-assembly.dll");
    let model = MockModel::new(MOCK_ASSEMBLY.clone()).with_test_file(&test_file);
    let mut presenter = presenter(model, settings(StrategyId::TestList));
    presenter.dispatch(ModelEvent::TestLoaded);
    presenter.dispatch(ViewEvent::GroupByChanged(Grouping::Outcome));

    presenter.dispatch(ViewEvent::Command(TreeCommand::SaveVisualState));

    let saved = VisualState::load(&visual_state_file_name(&test_file))
        .unwrap()
        .unwrap();
    assert_eq!(saved.display_strategy, Some(StrategyId::TestList));
    assert_eq!(saved.test_list_group_by, Some(Grouping::Outcome));
    assert_eq!(saved, presenter.visual_state());
}

#[test]
fn read_only_model_keeps_state_file_unchanged() {
    let dir = Utf8TempDir::new().unwrap();
    let test_file = dir.path().join("mock-assembly.dll");
    let state_file = visual_state_file_name(&test_file);
    let mut state = VisualState::new();
    state.display_strategy = Some(StrategyId::TestList);
    state.save(&state_file).unwrap();

    let model = MockModel::new(MOCK_ASSEMBLY.clone())
        .with_test_file(&test_file)
        .with_read_only_state();
    let mut presenter = presenter(model, TreeSettings::default());
    presenter.dispatch(ModelEvent::TestLoaded);
    assert_eq!(presenter.strategy().id(), StrategyId::TestList);

    presenter.dispatch(SettingChange::DisplayFormat(StrategyId::FixtureList));
    presenter.dispatch(ViewEvent::Command(TreeCommand::SaveVisualState));
    presenter.dispatch(ModelEvent::TestUnloaded);

    assert_eq!(VisualState::load(&state_file).unwrap(), Some(state));
}
