// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The tree view presenter and its event queue.
//!
//! Every external event reaches the presenter through one unbounded channel. Producers on any
//! thread post to a [`PresenterHandle`]; the UI thread drains the queue with
//! [`TreeViewPresenter::process_pending`]. This is the only place where events touch the display
//! tree or the view.
//!
//! Reloads requested while draining are coalesced: however many filter edits or settings
//! changes arrive in one batch, the tree is rebuilt once at the end, with the last values.

use crate::{
    display::{DisplayNodeId, DisplayNodeKind, DisplayTree},
    errors::DisplayErrorChain,
    model::{ActiveTestItem, ModelEvent, TestModel, TestSelection},
    settings::{Grouping, GuiLayout, SettingChange, StrategyId, TreeSettings},
    strategy::{DisplayStrategy, StrategyContext, TreeState},
    view::{CommandState, FilterEdit, TestTreeView, TreeCommand, ViewEvent},
    visual_state::{VisualState, visual_state_file_name},
};
use itertools::Itertools;
use smallvec::{SmallVec, smallvec};
use std::fmt;
use testcentric_filtering::{CategoryFilter, FilterVerdict, OutcomeFilter, TestFilter};
use testcentric_model::{ResultNode, ResultStore, TestId};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, warn};

/// An event queued for a [`TreeViewPresenter`].
#[derive(Clone, Debug, PartialEq)]
pub enum PresenterEvent {
    /// A life-cycle event from the model or engine.
    Model(ModelEvent),
    /// A gesture from the view.
    View(ViewEvent),
    /// A settings change.
    Setting(SettingChange),
}

impl From<ModelEvent> for PresenterEvent {
    fn from(event: ModelEvent) -> Self {
        Self::Model(event)
    }
}

impl From<ViewEvent> for PresenterEvent {
    fn from(event: ViewEvent) -> Self {
        Self::View(event)
    }
}

impl From<SettingChange> for PresenterEvent {
    fn from(change: SettingChange) -> Self {
        Self::Setting(change)
    }
}

/// A cloneable, thread-safe sender of events to a [`TreeViewPresenter`].
#[derive(Clone, Debug)]
pub struct PresenterHandle {
    sender: UnboundedSender<PresenterEvent>,
}

impl PresenterHandle {
    /// Queues an event. Returns false if the presenter has been dropped.
    pub fn post(&self, event: impl Into<PresenterEvent>) -> bool {
        match self.sender.send(event.into()) {
            Ok(()) => true,
            Err(error) => {
                debug!("presenter is gone, discarding {:?}", error.0);
                false
            }
        }
    }
}

/// Whether tests are loaded, and whether a run is in progress.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// No tests are loaded.
    Unloaded,
    /// Tests are loaded.
    Loaded {
        /// Whether a run is in progress. Only affects which commands are enabled.
        running: bool,
    },
}

/// Keeps a [`TestTreeView`] in step with a [`TestModel`].
pub struct TreeViewPresenter<M, V> {
    model: M,
    view: V,
    settings: TreeSettings,
    strategy: DisplayStrategy,
    filter: TestFilter,
    verdict: FilterVerdict,
    results: ResultStore,
    session: SessionState,
    sender: UnboundedSender<PresenterEvent>,
    receiver: UnboundedReceiver<PresenterEvent>,
    pending_reload: bool,
    reloading: bool,
}

impl<M, V> fmt::Debug for TreeViewPresenter<M, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeViewPresenter")
            .field("settings", &self.settings)
            .field("strategy", &self.strategy.id())
            .field("filter", &self.filter)
            .field("session", &self.session)
            .field("pending_reload", &self.pending_reload)
            .finish_non_exhaustive()
    }
}

impl<M: TestModel, V: TestTreeView> TreeViewPresenter<M, V> {
    /// Creates a presenter with a settings snapshot, and initializes the view from it.
    ///
    /// The presenter starts out unloaded. If the model already has tests, post
    /// [`ModelEvent::TestLoaded`].
    pub fn new(model: M, view: V, settings: TreeSettings) -> Self {
        let (sender, receiver) = unbounded_channel();
        let strategy = DisplayStrategy::new(settings.display_format, &settings);
        let mut presenter = Self {
            model,
            view,
            settings,
            strategy,
            filter: TestFilter::new(),
            verdict: FilterVerdict::all(),
            results: ResultStore::new(),
            session: SessionState::Unloaded,
            sender,
            receiver,
            pending_reload: false,
            reloading: false,
        };
        presenter.view.show_check_boxes(presenter.settings.show_check_boxes);
        presenter
            .view
            .set_alternate_image_set(&presenter.settings.alternate_image_set);
        presenter.view.set_filter_visible(presenter.settings.show_filter);
        presenter.update_commands();
        presenter
    }

    /// Returns a handle for posting events from other threads.
    pub fn handle(&self) -> PresenterHandle {
        PresenterHandle {
            sender: self.sender.clone(),
        }
    }

    /// Handles every queued event, then performs at most one coalesced reload.
    ///
    /// Returns the number of events handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        self.flush_reload();
        handled
    }

    /// Handles one event immediately, on the calling thread.
    ///
    /// Use this for events the view needs answered before it continues, such as
    /// [`ViewEvent::ContextMenuOpening`].
    pub fn dispatch(&mut self, event: impl Into<PresenterEvent>) {
        self.handle_event(event.into());
        self.flush_reload();
    }

    /// Returns the model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Returns the model mutably, for example to load tests before posting
    /// [`ModelEvent::TestLoaded`].
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Returns the view.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Returns the current settings snapshot.
    pub fn settings(&self) -> &TreeSettings {
        &self.settings
    }

    /// Returns the active display strategy.
    pub fn strategy(&self) -> &DisplayStrategy {
        &self.strategy
    }

    /// Returns the tree currently shown.
    pub fn tree(&self) -> &DisplayTree {
        self.strategy.tree()
    }

    /// Returns the active filter.
    pub fn filter(&self) -> &TestFilter {
        &self.filter
    }

    /// Returns the results received since the last run started.
    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    /// Returns the session state.
    pub fn session(&self) -> SessionState {
        self.session
    }

    fn is_loaded(&self) -> bool {
        matches!(self.session, SessionState::Loaded { .. })
    }

    fn handle_event(&mut self, event: PresenterEvent) {
        match event {
            PresenterEvent::Model(event) => self.handle_model_event(event),
            PresenterEvent::View(event) => self.handle_view_event(event),
            PresenterEvent::Setting(change) => self.handle_setting_change(change),
        }
    }

    // ---
    // Model events
    // ---

    fn handle_model_event(&mut self, event: ModelEvent) {
        match event {
            ModelEvent::TestLoaded => self.test_loaded(),
            ModelEvent::TestReloaded => self.test_reloaded(),
            ModelEvent::TestUnloaded => self.test_unloaded(),
            ModelEvent::RunStarting => self.run_starting(),
            ModelEvent::RunFinished => {
                if let SessionState::Loaded { running } = &mut self.session {
                    *running = false;
                }
                self.update_commands();
            }
            ModelEvent::TestFinished(result) => self.result_received(result, false),
            ModelEvent::SuiteFinished(result) => self.result_received(result, true),
        }
    }

    fn test_loaded(&mut self) {
        if self.model.loaded_tests().is_none() {
            warn!("tests were reported loaded, but the model has none");
            return;
        }
        self.session = SessionState::Loaded { running: false };
        self.results.clear();
        self.pending_reload = false;

        let state = self.load_visual_state();
        if let Some(state) = &state {
            self.apply_visual_state_settings(state);
        }

        let sort = self.strategy.sort_order();
        self.strategy = DisplayStrategy::new(self.settings.display_format, &self.settings);
        if let Some(sort) = sort {
            self.strategy.sort(sort);
        }

        match &state {
            Some(state) => {
                let grouping = match self.strategy.id() {
                    StrategyId::NUnitTree => None,
                    StrategyId::FixtureList => state.fixture_list_group_by,
                    StrategyId::TestList => state.test_list_group_by,
                };
                if let Some(grouping) = grouping {
                    let _ = self.strategy.set_grouping(grouping);
                }
                let _ = self
                    .filter
                    .update()
                    .outcome(OutcomeFilter::new(state.outcome_filter.iter().copied()))
                    .text(state.text_filter.clone())
                    .category(CategoryFilter::new(
                        state.selected_categories.iter().cloned(),
                        state.exclude_categories,
                    ))
                    .commit();
            }
            None => {
                let _ = self.filter.clear();
            }
        }

        self.view.show_check_boxes(self.settings.show_check_boxes);
        let tree_state = state.as_ref().map(VisualState::tree_state);
        self.reload_with_state(tree_state.as_ref());
        self.refresh_filter_controls();
        self.update_commands();
    }

    /// Visual state is per test file, and wins over the settings snapshot. The display format it
    /// names is written back into the snapshot.
    fn apply_visual_state_settings(&mut self, state: &VisualState) {
        if let Some(id) = state.display_strategy
            && id != self.settings.display_format
        {
            info!(
                "visual state display format {id} overrides the {} setting",
                self.settings.display_format
            );
            self.settings.display_format = id;
        }
        self.settings.show_check_boxes = state.show_check_boxes;
        self.settings.show_test_duration = state.show_test_duration;
    }

    fn test_reloaded(&mut self) {
        if !self.is_loaded() {
            debug!("reload reported while unloaded, treating as a load");
            self.test_loaded();
            return;
        }
        self.save_visual_state();
        self.reload(true);
        self.refresh_filter_controls();
        self.update_commands();
    }

    fn test_unloaded(&mut self) {
        if self.is_loaded() {
            self.save_visual_state();
        }
        let _ = self.filter.clear();
        self.view.close_category_filter();
        self.strategy.clear();
        self.view.clear();
        self.results.clear();
        self.verdict = FilterVerdict::all();
        self.session = SessionState::Unloaded;
        self.pending_reload = false;
        self.view.set_filter_controls(&[], &self.filter);
        self.update_commands();
    }

    fn run_starting(&mut self) {
        if !self.is_loaded() {
            debug!("run starting while unloaded, ignoring");
            return;
        }
        self.session = SessionState::Loaded { running: true };
        self.results.clear();
        self.strategy.reset_results();
        self.view.reset_all_images(self.strategy.tree());

        // Groups and visibility computed from the previous run's results are now stale.
        if self
            .strategy
            .grouping()
            .is_some_and(Grouping::depends_on_results)
            || !self.filter.outcome_filter().is_empty()
        {
            self.request_reload();
        }
        self.update_commands();
    }

    fn result_received(&mut self, result: ResultNode, is_suite: bool) {
        if !self.is_loaded() {
            debug!("result for {} while unloaded, ignoring", result.id());
            return;
        }
        self.results.insert(result.clone());

        // A new result can change which tests pass the outcome filter.
        if !self.filter.outcome_filter().is_empty() {
            self.request_reload();
            return;
        }

        let Some(tests) = self.model.loaded_tests() else {
            return;
        };
        let ctx = StrategyContext {
            tests,
            results: &self.results,
            verdict: &self.verdict,
            settings: &self.settings,
        };
        let changes = if is_suite {
            self.strategy.on_suite_finished(&result, &ctx)
        } else {
            self.strategy.on_test_finished(&result, &ctx)
        };
        for change in &changes {
            self.view.apply_change(self.strategy.tree(), change);
        }
    }

    // ---
    // Settings
    // ---

    fn handle_setting_change(&mut self, change: SettingChange) {
        if !self.settings.apply(&change) {
            debug!("setting {} is unchanged", change.key());
            return;
        }
        debug!("setting {} changed: {change:?}", change.key());

        match change {
            SettingChange::DisplayFormat(id) => self.change_display_format(id),
            SettingChange::ShowCheckBoxes(show) => {
                self.view.show_check_boxes(show);
                self.update_commands();
            }
            SettingChange::AlternateImageSet(name) => self.view.set_alternate_image_set(&name),
            SettingChange::ShowFilter(show) => self.view.set_filter_visible(show),
            // Same shape, different text: reload the current strategy.
            SettingChange::ShowNamespace(_) | SettingChange::ShowTestDuration(_) => {
                self.request_reload();
            }
            SettingChange::TestListGroupBy(grouping) => {
                self.change_grouping(StrategyId::TestList, grouping);
            }
            SettingChange::FixtureListGroupBy(grouping) => {
                self.change_grouping(StrategyId::FixtureList, grouping);
            }
            SettingChange::GuiLayout(_) => self.update_commands(),
        }
    }

    fn change_display_format(&mut self, id: StrategyId) {
        if self.strategy.id() == id {
            return;
        }

        let state = if self.is_loaded() {
            self.save_visual_state();
            Some(self.strategy.capture_state())
        } else {
            None
        };
        let sort = self.strategy.sort_order();
        self.strategy = DisplayStrategy::new(id, &self.settings);
        if let Some(sort) = sort {
            self.strategy.sort(sort);
        }
        if let Some(state) = state {
            self.reload_with_state(Some(&state));
        }
        self.update_commands();
    }

    fn change_grouping(&mut self, strategy: StrategyId, grouping: Grouping) {
        if self.strategy.id() == strategy && self.strategy.set_grouping(grouping) {
            debug!("{strategy} now grouped by {grouping}");
            self.request_reload();
        }
    }

    // ---
    // View events
    // ---

    fn handle_view_event(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::ContextMenuOpening => self.update_commands(),
            ViewEvent::NodeChecked { node, checked } => {
                if self.is_stale(node) {
                    return;
                }
                self.strategy.tree_mut().set_checked(node, checked);
                let selection = self.checked_selection();
                debug!(
                    "checked selection: [{}]",
                    selection.iter().map(TestId::as_str).join(", ")
                );
                self.model.set_selected_tests(selection);
            }
            ViewEvent::NodeSelected(node) => {
                let node = node.filter(|&node| !self.is_stale(node));
                self.strategy.tree_mut().select(node);
                let item = node.map(|node| self.active_item(node));
                self.model.set_active_test_item(item);
                self.update_commands();
            }
            ViewEvent::NodeExpanded { node, expanded } => {
                if !self.is_stale(node) {
                    self.strategy.tree_mut().set_expanded(node, expanded);
                }
            }
            ViewEvent::TopNodeChanged(node) => {
                let node = node.filter(|&node| !self.is_stale(node));
                self.strategy.tree_mut().set_top(node);
            }
            ViewEvent::SortChanged(sort) => {
                self.strategy.sort(sort);
                self.view.load_tree(self.strategy.tree());
            }
            ViewEvent::FilterEdited(edits) => self.edit_filter(edits),
            ViewEvent::GroupByChanged(grouping) => {
                let change = match self.strategy.id() {
                    StrategyId::NUnitTree => {
                        debug!("the NUnit tree is not grouped, ignoring grouping {grouping}");
                        return;
                    }
                    StrategyId::FixtureList => SettingChange::FixtureListGroupBy(grouping),
                    StrategyId::TestList => SettingChange::TestListGroupBy(grouping),
                };
                let _ = self.settings.apply(&change);
                self.change_grouping(self.strategy.id(), grouping);
            }
            ViewEvent::Command(command) => self.execute(command),
        }
    }

    fn is_stale(&self, node: DisplayNodeId) -> bool {
        let stale = self.strategy.tree().get(node).is_none();
        if stale {
            debug!("view referred to unknown node {node}, ignoring");
        }
        stale
    }

    fn edit_filter(&mut self, edits: Vec<FilterEdit>) {
        let mut update = self.filter.update();
        for edit in edits {
            update = match edit {
                FilterEdit::Outcome(outcome) => update.outcome(outcome),
                FilterEdit::Text(text) => update.text(text),
                FilterEdit::Category(category) => update.category(category),
                FilterEdit::Clear => update.clear(),
            };
        }
        if let Some(changed) = update.commit() {
            debug!("filter changed: {:?}", changed.dimensions);
            self.request_reload();
        }
    }

    fn execute(&mut self, command: TreeCommand) {
        match command {
            TreeCommand::Run | TreeCommand::Debug => {
                if !self.can_run() {
                    debug!("{command:?} is disabled, ignoring");
                    return;
                }
                let selection = self.run_selection();
                if selection.is_empty() {
                    debug!("{command:?}: nothing selected");
                    return;
                }
                if command == TreeCommand::Run {
                    self.model.run_tests(&selection);
                } else {
                    self.model.debug_tests(&selection);
                }
            }
            TreeCommand::TestProperties => {
                let tree = self.strategy.tree();
                if let Some(id) = tree
                    .selected()
                    .and_then(|node| tree.node(node).test_id())
                    .cloned()
                {
                    self.view.show_test_properties(&id);
                }
            }
            TreeCommand::ShowCheckBoxes => {
                let show = !self.settings.show_check_boxes;
                self.handle_setting_change(SettingChange::ShowCheckBoxes(show));
            }
            TreeCommand::ExpandAll => {
                self.set_expansion(|tree, node| !tree.node(node).children().is_empty());
            }
            TreeCommand::CollapseAll => self.set_expansion(|_, _| false),
            TreeCommand::CollapseToFixtures => self.set_expansion(|tree, node| {
                let node = tree.node(node);
                match node.kind() {
                    DisplayNodeKind::Group { .. } => true,
                    DisplayNodeKind::Test { .. } => node
                        .children()
                        .iter()
                        .any(|&child| !tree.node(child).is_test_case()),
                }
            }),
            TreeCommand::SaveVisualState => self.save_visual_state(),
        }
    }

    fn set_expansion(&mut self, expand: impl Fn(&DisplayTree, DisplayNodeId) -> bool) {
        let tree = self.strategy.tree();
        let updates: Vec<_> = tree
            .iter()
            .map(|(_, node)| (node, expand(tree, node)))
            .filter(|&(node, expanded)| tree.node(node).is_expanded() != expanded)
            .collect();
        for (node, expanded) in updates {
            self.strategy.tree_mut().set_expanded(node, expanded);
            self.view.set_expanded(node, expanded);
        }
    }

    // ---
    // Selection and commands
    // ---

    /// The tests a node stands for: itself, or for a group, the tests directly under it.
    fn node_tests(&self, node: DisplayNodeId) -> SmallVec<[TestId; 1]> {
        let tree = self.strategy.tree();
        match tree.node(node).kind() {
            DisplayNodeKind::Test { id, .. } => smallvec![id.clone()],
            DisplayNodeKind::Group { .. } => tree
                .node(node)
                .children()
                .iter()
                .filter_map(|&child| tree.node(child).test_id().cloned())
                .collect(),
        }
    }

    /// The union of the tests under every checked node. A group checked alongside some of its
    /// members contributes each test once.
    fn checked_selection(&self) -> TestSelection {
        self.strategy
            .tree()
            .checked()
            .flat_map(|node| self.node_tests(node))
            .collect()
    }

    fn run_selection(&self) -> TestSelection {
        if self.settings.show_check_boxes {
            return self.checked_selection();
        }
        match self.strategy.tree().selected() {
            Some(node) => self.node_tests(node).into_iter().collect(),
            None => TestSelection::new(),
        }
    }

    fn active_item(&self, node: DisplayNodeId) -> ActiveTestItem {
        match self.strategy.tree().node(node).kind() {
            DisplayNodeKind::Test { id, .. } => ActiveTestItem::Test(id.clone()),
            DisplayNodeKind::Group { name } => ActiveTestItem::Group {
                name: name.clone(),
                tests: self.node_tests(node).into_iter().collect(),
            },
        }
    }

    fn can_run(&self) -> bool {
        self.session == SessionState::Loaded { running: false }
            && self
                .model
                .loaded_tests()
                .is_some_and(|tests| tests.test_count() > 0)
    }

    fn update_commands(&mut self) {
        let run = if self.can_run() {
            CommandState::ENABLED
        } else {
            CommandState::DISABLED
        };
        self.view.set_command(TreeCommand::Run, run);
        self.view.set_command(TreeCommand::Debug, run);
        self.view.set_command(
            TreeCommand::TestProperties,
            CommandState {
                enabled: self.strategy.tree().selected().is_some(),
                visible: self.settings.layout == GuiLayout::Mini,
                checked: false,
            },
        );
        self.view.set_command(
            TreeCommand::ShowCheckBoxes,
            CommandState {
                checked: self.settings.show_check_boxes,
                ..CommandState::ENABLED
            },
        );
    }

    fn refresh_filter_controls(&mut self) {
        let categories = self.model.available_categories();
        debug!("available categories: {}", categories.iter().join(", "));
        self.view.set_filter_controls(&categories, &self.filter);
    }

    // ---
    // Reloading
    // ---

    fn request_reload(&mut self) {
        if !self.pending_reload {
            debug!("reload requested");
        }
        self.pending_reload = true;
    }

    fn flush_reload(&mut self) {
        if std::mem::take(&mut self.pending_reload) && self.is_loaded() {
            self.reload(true);
        }
    }

    fn reload(&mut self, preserve_state: bool) {
        let state = preserve_state.then(|| self.strategy.capture_state());
        self.reload_with_state(state.as_ref());
    }

    fn reload_with_state(&mut self, state: Option<&TreeState>) {
        if self.reloading {
            debug!("reload already in progress, deferring");
            self.pending_reload = true;
            return;
        }
        let Some(tests) = self.model.loaded_tests() else {
            debug!("no tests loaded, nothing to reload");
            return;
        };

        self.reloading = true;
        self.verdict = self.filter.evaluate(tests, &self.results);
        let ctx = StrategyContext {
            tests,
            results: &self.results,
            verdict: &self.verdict,
            settings: &self.settings,
        };
        self.strategy.reload_with_state(&ctx, state);
        self.view.load_tree(self.strategy.tree());
        self.reloading = false;
    }

    // ---
    // Visual state
    // ---

    /// Captures the current visual state.
    pub fn visual_state(&self) -> VisualState {
        let mut state = VisualState::new();
        state.display_strategy = Some(self.strategy.id());
        match self.strategy.id() {
            StrategyId::NUnitTree => {}
            StrategyId::FixtureList => state.fixture_list_group_by = self.strategy.grouping(),
            StrategyId::TestList => state.test_list_group_by = self.strategy.grouping(),
        }
        state.show_check_boxes = self.settings.show_check_boxes;
        state.show_test_duration = self.settings.show_test_duration;

        let category = self.filter.category_filter();
        state.selected_categories = category.categories().clone();
        state.exclude_categories = category.is_exclude();
        state.outcome_filter = self.filter.outcome_filter().buckets().clone();
        state.text_filter = self.filter.text_filter().text().to_owned();

        state.set_tree_state(self.strategy.capture_state());
        state
    }

    fn load_visual_state(&self) -> Option<VisualState> {
        let path = visual_state_file_name(self.model.test_file()?);
        match VisualState::load(&path) {
            Ok(state) => state,
            Err(error) => {
                warn!(
                    "{}, using default visual state",
                    DisplayErrorChain::new(error)
                );
                None
            }
        }
    }

    /// Saves visual state next to the test file. Failures are logged and otherwise ignored.
    fn save_visual_state(&self) {
        if !self.is_loaded() {
            return;
        }
        let Some(test_file) = self.model.test_file() else {
            debug!("no test file, not saving visual state");
            return;
        };
        if !self.model.saves_visual_state() {
            debug!("model reads visual state only, not saving for {test_file}");
            return;
        }
        let path = visual_state_file_name(test_file);
        if let Err(error) = self.visual_state().save(&path) {
            warn!("{}", DisplayErrorChain::new(error));
        }
    }
}
