// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{errors::MalformedResultError, xml::Element};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{borrow::Borrow, fmt};

/// The property name under which NUnit records categories.
pub const CATEGORY_PROPERTY: &str = "Category";

/// The property name under which NUnit records descriptions.
pub const DESCRIPTION_PROPERTY: &str = "Description";

/// The element names that introduce a test in a result document.
pub(crate) const TEST_ELEMENTS: &[&str] = &["test-run", "test-suite", "test-case"];

/// The unique identifier of a test within one loaded run.
///
/// Ids are stable across reloads of the same test file, which is what allows expansion,
/// selection and checked state to survive a reload.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(SmolStr);

impl TestId {
    /// Creates a new `TestId`.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    /// Returns the id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl Borrow<str> for TestId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The kind of a test item.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum TestType {
    /// The root of a run spanning one or more assemblies.
    TestRun,
    /// A project grouping several assemblies.
    Project,
    /// A test assembly.
    Assembly,
    /// A namespace suite.
    TestSuite,
    /// A test fixture.
    TestFixture,
    /// A setup fixture wrapping a namespace.
    SetUpFixture,
    /// A fixture instantiated with arguments.
    ParameterizedFixture,
    /// A generic fixture.
    GenericFixture,
    /// A test method expanded into several cases.
    ParameterizedMethod,
    /// A theory.
    Theory,
    /// A single test case.
    TestCase,
    /// Any other suite type.
    Other(SmolStr),
}

impl TestType {
    /// Parses a `type` attribute value.
    pub fn parse(s: &str) -> Self {
        match s {
            "TestRun" => Self::TestRun,
            "Project" => Self::Project,
            "Assembly" => Self::Assembly,
            "TestSuite" => Self::TestSuite,
            "TestFixture" => Self::TestFixture,
            "SetUpFixture" => Self::SetUpFixture,
            "ParameterizedFixture" => Self::ParameterizedFixture,
            "GenericFixture" => Self::GenericFixture,
            "ParameterizedMethod" => Self::ParameterizedMethod,
            "Theory" => Self::Theory,
            "TestCase" | "TestMethod" => Self::TestCase,
            other => Self::Other(SmolStr::new(other)),
        }
    }

    /// Returns the name of this type as it appears in a result document.
    pub fn as_str(&self) -> &str {
        match self {
            Self::TestRun => "TestRun",
            Self::Project => "Project",
            Self::Assembly => "Assembly",
            Self::TestSuite => "TestSuite",
            Self::TestFixture => "TestFixture",
            Self::SetUpFixture => "SetUpFixture",
            Self::ParameterizedFixture => "ParameterizedFixture",
            Self::GenericFixture => "GenericFixture",
            Self::ParameterizedMethod => "ParameterizedMethod",
            Self::Theory => "Theory",
            Self::TestCase => "TestCase",
            Self::Other(other) => other,
        }
    }

    /// Returns true if this type is a fixture of some kind.
    pub fn is_fixture(&self) -> bool {
        matches!(
            self,
            Self::TestFixture | Self::ParameterizedFixture | Self::GenericFixture
        )
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a test can be run.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum RunState {
    /// The test can be run.
    #[default]
    Runnable,
    /// The test is invalid and cannot be run.
    NotRunnable,
    /// The test is ignored.
    Ignored,
    /// The test only runs when selected explicitly.
    Explicit,
    /// The test is skipped.
    Skipped,
}

impl RunState {
    fn parse(s: &str) -> Self {
        match s {
            "NotRunnable" => Self::NotRunnable,
            "Ignored" => Self::Ignored,
            "Explicit" => Self::Explicit,
            "Skipped" => Self::Skipped,
            _ => Self::Runnable,
        }
    }
}

/// A named property attached to a test.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Property {
    /// The property name.
    pub name: String,
    /// The property value.
    pub value: String,
}

impl Property {
    /// Returns true if this is an internal property, hidden unless explicitly requested.
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('_')
    }
}

/// A test item in the loaded hierarchy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestNode {
    id: TestId,
    test_type: TestType,
    name: String,
    full_name: String,
    run_state: RunState,
    test_count: usize,
    class_name: Option<String>,
    method_name: Option<String>,
    properties: Vec<Property>,
    children: Vec<TestNode>,
}

impl TestNode {
    /// Parses the first test element of a result document into a node graph.
    pub fn parse(document: &str) -> Result<Self, MalformedResultError> {
        let document = Element::parse(document)?;
        let root = document
            .find_first(TEST_ELEMENTS)
            .ok_or(MalformedResultError::NoTests)?;
        Self::from_element(root)
    }

    pub(crate) fn from_element(element: &Element) -> Result<Self, MalformedResultError> {
        let id = required_id(element)?;
        let test_type = test_type(element, &id)?;
        let name = element.attr("name").unwrap_or_default().to_owned();
        let full_name = element
            .attr("fullname")
            .map(str::to_owned)
            .unwrap_or_else(|| name.clone());

        let properties = element
            .child("properties")
            .map(|props| {
                props
                    .children_named("property")
                    .map(|prop| Property {
                        name: prop.attr("name").unwrap_or_default().to_owned(),
                        value: prop.attr("value").unwrap_or_default().to_owned(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let children = element
            .children
            .iter()
            .filter(|child| TEST_ELEMENTS.contains(&child.name.as_str()))
            .map(TestNode::from_element)
            .collect::<Result<Vec<_>, _>>()?;

        let test_count = match element.attr("testcasecount") {
            Some(count) => {
                count
                    .parse()
                    .map_err(|error| MalformedResultError::InvalidInteger {
                        id: id.to_string(),
                        attribute: "testcasecount",
                        value: count.to_owned(),
                        error,
                    })?
            }
            None if children.is_empty() && test_type == TestType::TestCase => 1,
            None => children.iter().map(|child| child.test_count).sum(),
        };

        Ok(Self {
            id,
            test_type,
            name,
            full_name,
            run_state: element.attr("runstate").map(RunState::parse).unwrap_or_default(),
            test_count,
            class_name: element.attr("classname").map(str::to_owned),
            method_name: element.attr("methodname").map(str::to_owned),
            properties,
            children,
        })
    }

    /// Creates a test case node. Mostly useful for building trees in code.
    pub fn test_case(id: impl AsRef<str>, full_name: impl Into<String>) -> Self {
        let full_name = full_name.into();
        let name = short_name(&full_name).to_owned();
        Self {
            id: TestId::new(id),
            test_type: TestType::TestCase,
            name,
            full_name,
            run_state: RunState::Runnable,
            test_count: 1,
            class_name: None,
            method_name: None,
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates a suite node with the given children.
    pub fn suite(
        id: impl AsRef<str>,
        test_type: TestType,
        full_name: impl Into<String>,
        children: Vec<TestNode>,
    ) -> Self {
        let full_name = full_name.into();
        let name = suite_name(&test_type, &full_name).to_owned();
        let test_count = children.iter().map(|child| child.test_count).sum();
        Self {
            id: TestId::new(id),
            test_type,
            name,
            full_name,
            run_state: RunState::Runnable,
            test_count,
            class_name: None,
            method_name: None,
            properties: Vec::new(),
            children,
        }
    }

    /// Adds a property, returning `self` for chaining.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push(Property {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a category, returning `self` for chaining.
    pub fn with_category(self, category: impl Into<String>) -> Self {
        self.with_property(CATEGORY_PROPERTY, category)
    }

    /// Returns the id of this test.
    pub fn id(&self) -> &TestId {
        &self.id
    }

    /// Returns the type of this test.
    pub fn test_type(&self) -> &TestType {
        &self.test_type
    }

    /// Returns the short name of this test.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fully qualified name of this test.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Returns the run state of this test.
    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Returns the number of test cases at or below this node.
    pub fn test_count(&self) -> usize {
        self.test_count
    }

    /// Returns the class name for test cases, if recorded.
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Returns the method name for test cases, if recorded.
    pub fn method_name(&self) -> Option<&str> {
        self.method_name.as_deref()
    }

    /// Returns true if this node is a suite (anything other than a single test case).
    pub fn is_suite(&self) -> bool {
        self.test_type != TestType::TestCase
    }

    /// Returns the children of this node in declaration order.
    pub fn children(&self) -> &[TestNode] {
        &self.children
    }

    /// Returns the properties of this node.
    ///
    /// Properties whose names start with `_` are internal and only returned if
    /// `display_hidden` is true.
    pub fn properties(&self, display_hidden: bool) -> impl Iterator<Item = &Property> + '_ {
        self.properties
            .iter()
            .filter(move |prop| display_hidden || !prop.is_hidden())
    }

    /// Returns the first value of the named property.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|prop| prop.name == name)
            .map(|prop| prop.value.as_str())
    }

    /// Returns the description of this test, if any.
    pub fn description(&self) -> Option<&str> {
        self.property(DESCRIPTION_PROPERTY)
    }

    /// Returns the categories declared directly on this node.
    pub fn categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.properties
            .iter()
            .filter(|prop| prop.name == CATEGORY_PROPERTY)
            .map(|prop| prop.value.as_str())
    }

    /// Iterates over this node and all its descendants in pre-order.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Finds the node with the given id at or below this node.
    pub fn find(&self, id: &TestId) -> Option<&TestNode> {
        self.walk().find(|node| node.id() == id)
    }

    /// Returns every category used at or below this node, sorted and deduplicated.
    pub fn all_categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .walk()
            .flat_map(|node| node.categories())
            .map(str::to_owned)
            .collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }
}

/// A pre-order iterator over a test node graph.
///
/// Returned by [`TestNode::walk`].
#[derive(Clone, Debug)]
pub struct Walk<'a> {
    stack: Vec<&'a TestNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a TestNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Returns the last `.`-separated component of a full name, ignoring dots inside argument
/// lists.
fn short_name(full_name: &str) -> &str {
    let head = full_name.split('(').next().unwrap_or(full_name);
    match head.rfind('.') {
        Some(index) => &full_name[index + 1..],
        None => full_name,
    }
}

/// Runs, projects and assemblies are named after a file, the others after a dotted path.
fn suite_name<'a>(test_type: &TestType, full_name: &'a str) -> &'a str {
    match test_type {
        TestType::TestRun | TestType::Project | TestType::Assembly => {
            Utf8Path::new(full_name).file_name().unwrap_or(full_name)
        }
        _ => short_name(full_name),
    }
}

pub(crate) fn required_id(element: &Element) -> Result<TestId, MalformedResultError> {
    element
        .attr("id")
        .map(TestId::new)
        .ok_or_else(|| MalformedResultError::MissingAttribute {
            element: element.name.clone(),
            attribute: "id",
            id: None,
        })
}

pub(crate) fn test_type(element: &Element, id: &TestId) -> Result<TestType, MalformedResultError> {
    match element.name.as_str() {
        "test-case" => Ok(element
            .attr("type")
            .map(TestType::parse)
            .unwrap_or(TestType::TestCase)),
        "test-run" => Ok(TestType::TestRun),
        _ => element
            .attr("type")
            .map(TestType::parse)
            .ok_or_else(|| MalformedResultError::MissingAttribute {
                element: element.name.clone(),
                attribute: "type",
                id: Some(id.to_string()),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use test_case::test_case;

    static DOCUMENT: &str = indoc! {r#"
        <test-run id="0" testcasecount="3">
          <test-suite type="Assembly" id="1-1" name="mock.dll" fullname="/tmp/mock.dll">
            <properties>
              <property name="_PID" value="1234" />
              <property name="Category" value="Slow" />
            </properties>
            <test-suite type="TestFixture" id="1-2" name="Fixture" fullname="Ns.Fixture">
              <test-case id="1-3" name="A" fullname="Ns.Fixture.A" runstate="Runnable" />
              <test-case id="1-4" name="B" fullname="Ns.Fixture.B" runstate="Ignored">
                <properties>
                  <property name="Category" value="Fast" />
                  <property name="Category" value="Db" />
                  <property name="Description" value="does B" />
                </properties>
              </test-case>
              <test-case id="1-5" name="C(&quot;x.y&quot;)" fullname="Ns.Fixture.C(&quot;x.y&quot;)" />
            </test-suite>
          </test-suite>
        </test-run>
    "#};

    #[test]
    fn parse_builds_hierarchy() {
        let root = TestNode::parse(DOCUMENT).unwrap();
        assert_eq!(root.test_type(), &TestType::TestRun);
        assert_eq!(root.test_count(), 3);

        let assembly = &root.children()[0];
        assert_eq!(assembly.id().as_str(), "1-1");
        assert_eq!(assembly.test_type(), &TestType::Assembly);
        assert_eq!(assembly.test_count(), 3, "computed from children");

        let fixture = &assembly.children()[0];
        assert!(fixture.test_type().is_fixture());
        let ids: Vec<_> = fixture.children().iter().map(|c| c.id().as_str()).collect();
        assert_eq!(ids, ["1-3", "1-4", "1-5"]);

        let b = &fixture.children()[1];
        assert!(!b.is_suite());
        assert_eq!(b.run_state(), RunState::Ignored);
        assert_eq!(b.categories().collect::<Vec<_>>(), ["Fast", "Db"]);
        assert_eq!(b.description(), Some("does B"));
    }

    #[test]
    fn hidden_properties_need_opt_in() {
        let root = TestNode::parse(DOCUMENT).unwrap();
        let assembly = &root.children()[0];
        let visible: Vec<_> = assembly.properties(false).map(|p| &p.name).collect();
        assert_eq!(visible, ["Category"]);
        let all: Vec<_> = assembly.properties(true).map(|p| &p.name).collect();
        assert_eq!(all, ["_PID", "Category"]);
    }

    #[test]
    fn walk_is_pre_order() {
        let root = TestNode::parse(DOCUMENT).unwrap();
        let ids: Vec<_> = root.walk().map(|node| node.id().as_str()).collect();
        assert_eq!(ids, ["0", "1-1", "1-2", "1-3", "1-4", "1-5"]);
        assert_eq!(root.all_categories(), ["Db", "Fast", "Slow"]);
        assert!(root.find(&TestId::new("1-4")).is_some());
        assert!(root.find(&TestId::new("missing")).is_none());
    }

    #[test_case(r#"<test-suite type="TestFixture" name="x" />"#, "id"; "missing id")]
    #[test_case(r#"<test-suite id="1" name="x" />"#, "type"; "missing suite type")]
    #[test_case(r#"<test-run id="0"><test-case name="x" /></test-run>"#, "id"; "missing nested id")]
    fn missing_required_attributes(document: &str, expected: &str) {
        match TestNode::parse(document) {
            Err(MalformedResultError::MissingAttribute { attribute, .. }) => {
                assert_eq!(attribute, expected)
            }
            other => panic!("expected missing attribute error, got {other:?}"),
        }
    }

    #[test]
    fn document_without_tests_is_malformed() {
        let err = TestNode::parse("<filter><cat>x</cat></filter>").unwrap_err();
        assert!(matches!(err, MalformedResultError::NoTests));
    }

    #[test_case("Ns.Fixture.A", "A")]
    #[test_case("Ns.Fixture.C(\"x.y\")", "C(\"x.y\")")]
    #[test_case("Plain", "Plain")]
    fn short_names(full_name: &str, expected: &str) {
        assert_eq!(short_name(full_name), expected);
    }

    #[test_case(TestType::Assembly, "mock.dll", "mock.dll")]
    #[test_case(TestType::Assembly, "/work/bin/mock-assembly.dll", "mock-assembly.dll")]
    #[test_case(TestType::Project, "all.nunit", "all.nunit")]
    #[test_case(TestType::TestSuite, "NUnit.Tests", "Tests")]
    #[test_case(TestType::TestFixture, "NUnit.Tests.MockTestFixture", "MockTestFixture")]
    fn suite_names(test_type: TestType, full_name: &str, expected: &str) {
        let suite = TestNode::suite("1", test_type, full_name, Vec::new());
        assert_eq!(suite.name(), expected);
        assert_eq!(suite.full_name(), full_name);
    }
}
