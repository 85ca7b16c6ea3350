// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line parsing and command routing.

use crate::{
    errors::{ExpectedError, Result, TestTreeExitCode},
    file_model::FileModel,
    output::{OutputContext, OutputOpts, OutputWriter},
    text_view::TextView,
};
use camino::Utf8PathBuf;
use clap::{Args, Subcommand, ValueEnum};
use testcentric_filtering::{CategoryFilter, OutcomeBucket, OutcomeFilter};
use testcentric_tree::{
    FilterEdit, Grouping, ModelEvent, SettingChange, SortDirection, SortKey, StrategyId,
    TreeSettings, TreeSort, TreeViewPresenter, ViewEvent,
    visual_state::visual_state_file_name,
};
use tracing::{info, warn};

/// Shows the test tree for an NUnit-style result document.
#[derive(Debug, clap::Parser)]
#[command(
    name = "testtree",
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct TestTreeApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(subcommand)]
    command: Command,
}

impl TestTreeApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Show(opts) => opts.exec(output, output_writer),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the tree for a result document.
    ///
    /// Results in the document are replayed as a test run, so the tree shows the same status
    /// images, groups and filters a live run would.
    Show(ShowOpts),
}

#[derive(Debug, Args)]
struct ShowOpts {
    /// The result or explore document to show.
    #[arg(value_name = "DOCUMENT")]
    document: Utf8PathBuf,

    /// Settings file, layered over the built-in settings.
    #[arg(long, value_name = "PATH")]
    settings: Option<Utf8PathBuf>,

    #[clap(flatten)]
    display: DisplayOpts,

    #[clap(flatten)]
    filter: FilterOpts,

    /// Write the visual state next to the document after showing the tree.
    #[arg(long)]
    save_state: bool,
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Display options")]
struct DisplayOpts {
    /// Display format: nunit_tree, fixture_list or test_list [default: from settings].
    #[arg(long, value_name = "FORMAT")]
    format: Option<StrategyId>,

    /// Grouping for the list formats: assembly, category, outcome or duration.
    #[arg(long, value_name = "GROUPING")]
    group_by: Option<Grouping>,

    /// Sort order for test nodes.
    #[arg(long, value_enum, value_name = "ORDER")]
    sort: Option<SortOpt>,

    /// Append durations to nodes with results.
    #[arg(long)]
    show_duration: bool,
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Filter options")]
struct FilterOpts {
    /// Show only tests with these outcomes: passed, failed, warning, not-run.
    #[arg(long, value_name = "OUTCOME", value_delimiter = ',')]
    outcome: Vec<OutcomeBucket>,

    /// Show only tests whose name or full name contains this text.
    #[arg(long, value_name = "TEXT")]
    text: Option<String>,

    /// Show only tests in these categories. Use "No Category" for uncategorized tests.
    #[arg(long, value_name = "CATEGORY")]
    category: Vec<String>,

    /// Hide the tests in the --category categories instead.
    #[arg(long, requires = "category")]
    exclude_categories: bool,
}

impl FilterOpts {
    fn edits(&self) -> Vec<FilterEdit> {
        let mut edits = Vec::new();
        if !self.outcome.is_empty() {
            edits.push(FilterEdit::Outcome(OutcomeFilter::new(
                self.outcome.iter().copied(),
            )));
        }
        if let Some(text) = &self.text {
            edits.push(FilterEdit::Text(text.clone()));
        }
        if !self.category.is_empty() {
            edits.push(FilterEdit::Category(CategoryFilter::new(
                self.category.iter().cloned(),
                self.exclude_categories,
            )));
        }
        edits
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum SortOpt {
    /// By name, A to Z.
    Name,
    /// By name, Z to A.
    NameDesc,
    /// Fastest first.
    Duration,
    /// Slowest first.
    DurationDesc,
}

impl SortOpt {
    fn to_sort(self) -> TreeSort {
        let (key, direction) = match self {
            Self::Name => (SortKey::Name, SortDirection::Ascending),
            Self::NameDesc => (SortKey::Name, SortDirection::Descending),
            Self::Duration => (SortKey::Duration, SortDirection::Ascending),
            Self::DurationDesc => (SortKey::Duration, SortDirection::Descending),
        };
        TreeSort { key, direction }
    }
}

impl ShowOpts {
    fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let settings = match &self.settings {
            Some(path) => TreeSettings::from_path(path)?,
            None => TreeSettings::from_embedded(),
        };
        let model = FileModel::load(&self.document)?;
        let has_results = model.has_results();

        let mut presenter = TreeViewPresenter::new(model, TextView::default(), settings);
        let handle = presenter.handle();
        handle.post(ModelEvent::TestLoaded);

        // Options given on the command line win over both the settings and the visual state,
        // so they are posted after the load.
        if let Some(format) = self.display.format {
            handle.post(SettingChange::DisplayFormat(format));
        }
        if let Some(grouping) = self.display.group_by {
            handle.post(ViewEvent::GroupByChanged(grouping));
        }
        if self.display.show_duration {
            handle.post(SettingChange::ShowTestDuration(true));
        }
        let edits = self.filter.edits();
        if !edits.is_empty() {
            handle.post(ViewEvent::FilterEdited(edits));
        }
        presenter.process_pending();

        if let Some(grouping) = self.display.group_by
            && presenter.strategy().grouping().is_none()
        {
            warn!(
                "--group-by {grouping} ignored: {} does not group",
                presenter.strategy().id()
            );
        }

        let replayed = presenter.model().replay(&handle);
        if let Some(sort) = self.display.sort {
            handle.post(ViewEvent::SortChanged(sort.to_sort()));
        }
        presenter.process_pending();

        if self.save_state {
            // The presenter's own save only logs failures, so save here to report them.
            let path = visual_state_file_name(&self.document);
            presenter
                .visual_state()
                .save(&path)
                .map_err(|err| ExpectedError::VisualStateSave {
                    path: path.clone(),
                    err,
                })?;
            info!("visual state written to {path}");
        }

        let tree = presenter.tree();
        let styles = output.tree_styles();
        presenter
            .view()
            .write_tree(tree, &styles, output_writer.stdout_writer())
            .map_err(|err| ExpectedError::WriteTree { err })?;

        if tree.is_empty() {
            info!("no tests match the current filter");
        }
        if output.verbose {
            info!(
                "{}: {} results replayed, {} incremental view updates, {} full loads",
                presenter.strategy().id(),
                replayed,
                presenter.view().updates(),
                presenter.view().loads(),
            );
        } else if !has_results {
            info!("{} contains no results", self.document);
        }

        Ok(TestTreeExitCode::OK)
    }
}
