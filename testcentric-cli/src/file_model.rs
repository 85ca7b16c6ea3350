// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::{ExpectedError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use testcentric_model::{ResultNode, TestNode};
use testcentric_tree::{ActiveTestItem, ModelEvent, PresenterHandle, TestModel, TestSelection};
use tracing::{debug, info};

/// A test model backed by a result document on disk.
///
/// There is no engine behind it: run and debug requests are logged, and results come from the
/// document itself through [`FileModel::replay`]. Visual state next to the document is read but
/// only written on request.
#[derive(Debug)]
pub(crate) struct FileModel {
    path: Utf8PathBuf,
    tests: TestNode,
    results: Option<ResultNode>,
}

impl FileModel {
    pub(crate) fn load(path: &Utf8Path) -> Result<Self> {
        let document = std::fs::read_to_string(path).map_err(|err| ExpectedError::DocumentRead {
            path: path.to_owned(),
            err,
        })?;
        let parse_error = |err| ExpectedError::DocumentParse {
            path: path.to_owned(),
            err,
        };
        let tests = TestNode::parse(&document).map_err(parse_error)?;
        let results = ResultNode::parse(&document).map_err(parse_error)?;
        debug!(
            "loaded {} tests from {path} ({})",
            tests.test_count(),
            if results.is_some() {
                "with results"
            } else {
                "no results"
            }
        );

        Ok(Self {
            path: path.to_owned(),
            tests,
            results,
        })
    }

    /// Returns true if the document carries results.
    pub(crate) fn has_results(&self) -> bool {
        self.results.is_some()
    }

    /// Posts the document's results as a run: a start event, every result with children before
    /// their parents, then a finish event.
    ///
    /// Returns the number of results posted.
    pub(crate) fn replay(&self, handle: &PresenterHandle) -> usize {
        let Some(results) = &self.results else {
            return 0;
        };

        let mut finished = Vec::new();
        post_order(results, &mut finished);

        handle.post(ModelEvent::RunStarting);
        for result in &finished {
            let event = if result.is_suite() {
                ModelEvent::SuiteFinished((*result).clone())
            } else {
                ModelEvent::TestFinished((*result).clone())
            };
            handle.post(event);
        }
        handle.post(ModelEvent::RunFinished);
        finished.len()
    }
}

fn post_order<'a>(result: &'a ResultNode, out: &mut Vec<&'a ResultNode>) {
    for child in result.children() {
        post_order(child, out);
    }
    out.push(result);
}

impl TestModel for FileModel {
    fn loaded_tests(&self) -> Option<&TestNode> {
        Some(&self.tests)
    }

    fn test_file(&self) -> Option<&Utf8Path> {
        Some(&self.path)
    }

    fn saves_visual_state(&self) -> bool {
        false
    }

    fn set_selected_tests(&mut self, selection: TestSelection) {
        debug!("{} tests selected", selection.len());
    }

    fn set_active_test_item(&mut self, item: Option<ActiveTestItem>) {
        match item {
            Some(ActiveTestItem::Test(id)) => debug!("active test: {id}"),
            Some(ActiveTestItem::Group { name, tests }) => {
                debug!("active group: {name} ({} tests)", tests.len());
            }
            None => debug!("no active test"),
        }
    }

    fn run_tests(&mut self, selection: &TestSelection) {
        info!(
            "{} tests would run, but {} has no test engine attached",
            selection.len(),
            self.path
        );
    }

    fn debug_tests(&mut self, selection: &TestSelection) {
        info!(
            "{} tests would be debugged, but {} has no test engine attached",
            selection.len(),
            self.path
        );
    }
}
