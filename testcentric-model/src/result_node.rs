// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::MalformedResultError,
    test_node::{TEST_ELEMENTS, TestId, TestType, required_id, test_type},
    xml::Element,
};
use smol_str::SmolStr;
use std::{collections::HashMap, fmt};

/// The primary status of a test result.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum TestStatus {
    /// The test produced no definitive result.
    Inconclusive,
    /// The test was not run.
    Skipped,
    /// The test passed.
    Passed,
    /// The test passed with warnings.
    Warning,
    /// The test failed, errored or was cancelled.
    Failed,
}

impl TestStatus {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "Inconclusive" => Some(Self::Inconclusive),
            "Skipped" => Some(Self::Skipped),
            "Passed" => Some(Self::Passed),
            "Warning" => Some(Self::Warning),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns the name of this status as it appears in a result document.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inconclusive => "Inconclusive",
            Self::Skipped => "Skipped",
            Self::Passed => "Passed",
            Self::Warning => "Warning",
            Self::Failed => "Failed",
        }
    }
}

/// Worst-case ordering of outcomes, used to aggregate results up a tree.
///
/// `Failed > Warning > Skipped > Inconclusive > Passed`. Errors and cancellations are failures;
/// ignored tests are skipped.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum Severity {
    /// The test passed.
    Passed,
    /// The test was inconclusive.
    Inconclusive,
    /// The test was skipped or ignored.
    Skipped,
    /// The test produced a warning.
    Warning,
    /// The test failed, errored or was cancelled.
    Failed,
}

/// The outcome of a test: a status plus an optional label refining it.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Outcome {
    /// The primary status.
    pub status: TestStatus,
    /// A label such as `Error`, `Cancelled`, `Ignored` or `Invalid`.
    pub label: Option<SmolStr>,
}

impl Outcome {
    /// A plain pass.
    pub const PASSED: Self = Self::new(TestStatus::Passed);
    /// A plain failure.
    pub const FAILED: Self = Self::new(TestStatus::Failed);
    /// A plain warning.
    pub const WARNING: Self = Self::new(TestStatus::Warning);
    /// A plain skip.
    pub const SKIPPED: Self = Self::new(TestStatus::Skipped);
    /// An inconclusive result.
    pub const INCONCLUSIVE: Self = Self::new(TestStatus::Inconclusive);

    /// Creates an outcome without a label.
    pub const fn new(status: TestStatus) -> Self {
        Self {
            status,
            label: None,
        }
    }

    /// Creates an outcome with a label.
    pub fn with_label(status: TestStatus, label: &str) -> Self {
        Self {
            status,
            label: Some(SmolStr::new(label)),
        }
    }

    /// Returns the label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns true for a skipped test that was explicitly ignored.
    pub fn is_ignored(&self) -> bool {
        self.status == TestStatus::Skipped && self.label() == Some("Ignored")
    }

    /// Returns the severity of this outcome.
    pub fn severity(&self) -> Severity {
        match self.status {
            TestStatus::Passed => Severity::Passed,
            TestStatus::Inconclusive => Severity::Inconclusive,
            TestStatus::Skipped => Severity::Skipped,
            TestStatus::Warning => Severity::Warning,
            TestStatus::Failed => Severity::Failed,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{}:{label}", self.status.as_str()),
            None => f.write_str(self.status.as_str()),
        }
    }
}

/// The outcome of running a [`TestNode`](crate::TestNode).
///
/// Composite results mirror the shape of the test graph.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultNode {
    id: TestId,
    test_type: TestType,
    name: String,
    full_name: String,
    outcome: Outcome,
    duration: Option<f64>,
    assert_count: u32,
    message: Option<String>,
    stack_trace: Option<String>,
    output: Option<String>,
    children: Vec<ResultNode>,
}

impl ResultNode {
    /// Parses the first test element of a result document.
    ///
    /// Returns `Ok(None)` if the document has no `result` attribute on its root test element,
    /// which is the case for documents produced by exploring rather than running tests.
    pub fn parse(document: &str) -> Result<Option<Self>, MalformedResultError> {
        let document = Element::parse(document)?;
        let root = document
            .find_first(TEST_ELEMENTS)
            .ok_or(MalformedResultError::NoTests)?;
        if root.attr("result").is_none() {
            return Ok(None);
        }
        Self::from_element(root).map(Some)
    }

    fn from_element(element: &Element) -> Result<Self, MalformedResultError> {
        let id = required_id(element)?;
        let test_type = test_type(element, &id)?;
        let status = element
            .attr("result")
            .and_then(TestStatus::parse)
            .ok_or_else(|| MalformedResultError::MissingAttribute {
                element: element.name.clone(),
                attribute: "result",
                id: Some(id.to_string()),
            })?;
        let outcome = Outcome {
            status,
            label: element.attr("label").map(SmolStr::new),
        };

        let duration = element
            .attr("duration")
            .map(|value| {
                value
                    .parse::<f64>()
                    .map_err(|error| MalformedResultError::InvalidDuration {
                        id: id.to_string(),
                        value: value.to_owned(),
                        error,
                    })
            })
            .transpose()?;
        let assert_count = element
            .attr("asserts")
            .map(|value| {
                value
                    .parse::<u32>()
                    .map_err(|error| MalformedResultError::InvalidInteger {
                        id: id.to_string(),
                        attribute: "asserts",
                        value: value.to_owned(),
                        error,
                    })
            })
            .transpose()?
            .unwrap_or(0);

        // Failures carry a message and a stack trace; skips carry a reason.
        let (message, stack_trace) = match element.child("failure") {
            Some(failure) => (
                failure.child_text("message"),
                failure.child_text("stack-trace"),
            ),
            None => (
                element
                    .child("reason")
                    .and_then(|reason| reason.child_text("message")),
                None,
            ),
        };

        let children = element
            .children
            .iter()
            .filter(|child| TEST_ELEMENTS.contains(&child.name.as_str()))
            .filter(|child| child.attr("result").is_some())
            .map(ResultNode::from_element)
            .collect::<Result<Vec<_>, _>>()?;

        let name = element.attr("name").unwrap_or_default().to_owned();
        Ok(Self {
            full_name: element
                .attr("fullname")
                .map(str::to_owned)
                .unwrap_or_else(|| name.clone()),
            name,
            id,
            test_type,
            outcome,
            duration,
            assert_count,
            message,
            stack_trace,
            output: element.child_text("output"),
            children,
        })
    }

    /// Creates a leaf result. Mostly useful for tests and for replaying events.
    pub fn new(id: impl AsRef<str>, outcome: Outcome) -> Self {
        Self {
            id: TestId::new(id),
            test_type: TestType::TestCase,
            name: String::new(),
            full_name: String::new(),
            outcome,
            duration: None,
            assert_count: 0,
            message: None,
            stack_trace: None,
            output: None,
            children: Vec::new(),
        }
    }

    /// Sets the test type, returning `self` for chaining.
    pub fn with_type(mut self, test_type: TestType) -> Self {
        self.test_type = test_type;
        self
    }

    /// Sets the duration in seconds, returning `self` for chaining.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Sets the message, returning `self` for chaining.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the child results, returning `self` for chaining.
    pub fn with_children(mut self, children: Vec<ResultNode>) -> Self {
        self.children = children;
        self
    }

    /// Returns the id of the test this result belongs to.
    pub fn id(&self) -> &TestId {
        &self.id
    }

    /// Returns the type of the test.
    pub fn test_type(&self) -> &TestType {
        &self.test_type
    }

    /// Returns the short name of the test.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the full name of the test.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Returns true if this is the result of a suite rather than a single test case.
    pub fn is_suite(&self) -> bool {
        self.test_type != TestType::TestCase
    }

    /// Returns the outcome recorded for this node.
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Returns the duration in seconds, if recorded.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Returns the number of asserts executed.
    pub fn assert_count(&self) -> u32 {
        self.assert_count
    }

    /// Returns the failure or skip message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the failure stack trace.
    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }

    /// Returns captured output.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Returns the child results.
    pub fn children(&self) -> &[ResultNode] {
        &self.children
    }

    /// Returns the worst-case severity of this result and all of its descendants.
    pub fn aggregate_severity(&self) -> Severity {
        self.children
            .iter()
            .map(ResultNode::aggregate_severity)
            .fold(self.outcome.severity(), Ord::max)
    }

    /// Iterates over this result and all of its descendants in pre-order.
    pub fn walk(&self) -> impl Iterator<Item = &ResultNode> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// Looks up the result for a test by id.
pub trait ResultLookup {
    /// Returns the most recent result for `id`, if any.
    fn result(&self, id: &TestId) -> Option<&ResultNode>;
}

impl ResultLookup for HashMap<TestId, ResultNode> {
    fn result(&self, id: &TestId) -> Option<&ResultNode> {
        self.get(id)
    }
}

/// A lookup that never has a result, for trees shown before any run.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoResults;

impl ResultLookup for NoResults {
    fn result(&self, _id: &TestId) -> Option<&ResultNode> {
        None
    }
}

/// An id-indexed store of the latest result for each test.
#[derive(Clone, Debug, Default)]
pub struct ResultStore {
    results: HashMap<TestId, ResultNode>,
}

impl ResultStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a result, replacing any earlier result for the same test.
    pub fn insert(&mut self, result: ResultNode) -> Option<ResultNode> {
        self.results.insert(result.id.clone(), result)
    }

    /// Records a result and every descendant result it carries.
    pub fn insert_recursive(&mut self, result: &ResultNode) {
        for node in result.walk() {
            self.results.insert(node.id.clone(), node.clone());
        }
    }

    /// Forgets all results, as happens when a new run starts.
    pub fn clear(&mut self) {
        self.results.clear();
    }

    /// Returns the number of stored results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if no results are stored.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl ResultLookup for ResultStore {
    fn result(&self, id: &TestId) -> Option<&ResultNode> {
        self.results.get(id)
    }
}

impl<T: ResultLookup + ?Sized> ResultLookup for &T {
    fn result(&self, id: &TestId) -> Option<&ResultNode> {
        (**self).result(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use proptest::prelude::*;
    use test_strategy::proptest;

    static RESULTS: &str = indoc! {r#"
        <test-run id="0" result="Failed" testcasecount="3">
          <test-suite type="TestFixture" id="1" name="Fixture" fullname="Ns.Fixture" result="Failed" duration="1.5">
            <test-case id="2" name="A" fullname="Ns.Fixture.A" result="Passed" duration="0.25" asserts="3" />
            <test-case id="3" name="B" fullname="Ns.Fixture.B" result="Failed" label="Error" duration="1.25">
              <failure>
                <message><![CDATA[System.Exception : boom]]></message>
                <stack-trace><![CDATA[at Ns.Fixture.B()]]></stack-trace>
              </failure>
              <output><![CDATA[hello]]></output>
            </test-case>
            <test-case id="4" name="C" fullname="Ns.Fixture.C" result="Skipped" label="Ignored">
              <reason><message><![CDATA[not today]]></message></reason>
            </test-case>
          </test-suite>
        </test-run>
    "#};

    #[test]
    fn parse_results() {
        let run = ResultNode::parse(RESULTS).unwrap().expect("document has results");
        assert_eq!(run.outcome(), &Outcome::FAILED);
        let fixture = &run.children()[0];
        assert_eq!(fixture.duration(), Some(1.5));

        let a = &fixture.children()[0];
        assert_eq!(a.outcome(), &Outcome::PASSED);
        assert_eq!(a.assert_count(), 3);
        assert!(!a.is_suite());

        let b = &fixture.children()[1];
        assert_eq!(b.outcome().to_string(), "Failed:Error");
        assert_eq!(b.message(), Some("System.Exception : boom"));
        assert_eq!(b.stack_trace(), Some("at Ns.Fixture.B()"));
        assert_eq!(b.output(), Some("hello"));

        let c = &fixture.children()[2];
        assert!(c.outcome().is_ignored());
        assert_eq!(c.message(), Some("not today"));
    }

    #[test]
    fn explore_document_has_no_results() {
        let parsed = ResultNode::parse(r#"<test-suite type="Assembly" id="1" />"#).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn invalid_duration_is_malformed() {
        let err = ResultNode::parse(r#"<test-case id="1" result="Passed" duration="fast" />"#)
            .unwrap_err();
        assert!(matches!(err, MalformedResultError::InvalidDuration { .. }), "{err:?}");
    }

    #[test]
    fn store_replaces_reruns() {
        let run = ResultNode::parse(RESULTS).unwrap().unwrap();
        let mut store = ResultStore::new();
        store.insert_recursive(&run);
        assert_eq!(store.len(), 5);

        let rerun = ResultNode::new("3", Outcome::PASSED);
        let previous = store.insert(rerun).expect("earlier result existed");
        assert_eq!(previous.outcome().status, TestStatus::Failed);
        assert_eq!(store.result(&TestId::new("3")).unwrap().outcome(), &Outcome::PASSED);

        store.clear();
        assert!(store.is_empty());
    }

    fn leaf(index: usize, status: TestStatus) -> ResultNode {
        ResultNode::new(index.to_string(), Outcome::new(status))
    }

    #[proptest]
    fn aggregate_is_max_child_severity(
        #[strategy(proptest::collection::vec(any::<TestStatus>(), 1..12))] statuses: Vec<TestStatus>,
    ) {
        let children: Vec<_> = statuses
            .iter()
            .enumerate()
            .map(|(index, status)| leaf(index, *status))
            .collect();
        let expected = children
            .iter()
            .map(|child| child.outcome().severity())
            .max()
            .unwrap();
        // A passing parent never masks its children.
        let suite = ResultNode::new("suite", Outcome::PASSED)
            .with_type(TestType::TestFixture)
            .with_children(children);
        prop_assert_eq!(suite.aggregate_severity(), expected.max(Severity::Passed));
    }

    #[test]
    fn severity_order() {
        assert!(Severity::Failed > Severity::Warning);
        assert!(Severity::Warning > Severity::Skipped);
        assert!(Severity::Skipped > Severity::Inconclusive);
        assert!(Severity::Inconclusive > Severity::Passed);
        assert_eq!(
            Outcome::with_label(TestStatus::Failed, "Cancelled").severity(),
            Severity::Failed
        );
    }
}
