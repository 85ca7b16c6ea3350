// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::outcome::OutcomeBucket;
use bitflags::bitflags;
use std::collections::{BTreeSet, HashMap, HashSet};
use testcentric_model::{ResultLookup, ResultNode, Severity, TestId, TestNode};
use tracing::debug;

/// The pseudo-category matching tests that carry no category at all.
pub const NO_CATEGORY: &str = "No Category";

bitflags! {
    /// The filter dimensions touched by an update.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct FilterDimensions: u8 {
        /// The outcome filter changed.
        const OUTCOME = 1 << 0;
        /// The text filter changed.
        const TEXT = 1 << 1;
        /// The category filter changed.
        const CATEGORY = 1 << 2;
    }
}

/// Record of one committed filter update.
///
/// Exactly one of these is produced per [`FilterUpdate::commit`], however many dimensions the
/// update touched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub struct FilterChanged {
    /// The dimensions whose value actually changed.
    pub dimensions: FilterDimensions,
}

/// Accepts tests whose outcome falls in one of a set of buckets.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OutcomeFilter {
    accepted: BTreeSet<OutcomeBucket>,
}

impl OutcomeFilter {
    /// Creates a filter accepting the given buckets. An empty set accepts everything.
    pub fn new(accepted: impl IntoIterator<Item = OutcomeBucket>) -> Self {
        Self {
            accepted: accepted.into_iter().collect(),
        }
    }

    /// Returns true if this filter accepts everything.
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Returns the accepted buckets.
    pub fn buckets(&self) -> &BTreeSet<OutcomeBucket> {
        &self.accepted
    }

    /// Returns true if a test with the given severity is accepted.
    pub fn accepts(&self, severity: Option<Severity>) -> bool {
        self.is_empty() || self.accepted.contains(&OutcomeBucket::from_severity(severity))
    }
}

/// Case-insensitive substring match against test names.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TextFilter {
    text: String,
    lowered: String,
}

impl TextFilter {
    /// Creates a new text filter. Surrounding whitespace is ignored.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into().trim().to_owned();
        let lowered = text.to_lowercase();
        Self { text, lowered }
    }

    /// Returns the text as entered.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns true if this filter accepts everything.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns true if the node's name or full name contains the filter text.
    pub fn accepts(&self, node: &TestNode) -> bool {
        self.is_empty()
            || node.full_name().to_lowercase().contains(&self.lowered)
            || node.name().to_lowercase().contains(&self.lowered)
    }
}

/// Accepts (or, when excluding, rejects) tests in any of a set of categories.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CategoryFilter {
    categories: BTreeSet<String>,
    exclude: bool,
}

impl CategoryFilter {
    /// Creates a new category filter.
    ///
    /// [`NO_CATEGORY`] may be used to select uncategorized tests.
    pub fn new(categories: impl IntoIterator<Item = impl Into<String>>, exclude: bool) -> Self {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            exclude,
        }
    }

    /// Returns the selected categories.
    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    /// Returns true if the selected categories are excluded rather than included.
    pub fn is_exclude(&self) -> bool {
        self.exclude
    }

    /// Returns true if this filter accepts everything.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Returns true if a test with the given effective categories is accepted.
    pub fn accepts(&self, effective: &[&str]) -> bool {
        if self.is_empty() {
            return true;
        }
        let member = if effective.is_empty() {
            self.categories.contains(NO_CATEGORY)
        } else {
            effective
                .iter()
                .any(|category| self.categories.contains(*category))
        };
        member != self.exclude
    }
}

/// The composed outcome, text and category filter applied to the test tree.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TestFilter {
    outcome: OutcomeFilter,
    text: TextFilter,
    category: CategoryFilter,
}

impl TestFilter {
    /// Creates a filter that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the outcome dimension.
    pub fn outcome_filter(&self) -> &OutcomeFilter {
        &self.outcome
    }

    /// Returns the text dimension.
    pub fn text_filter(&self) -> &TextFilter {
        &self.text
    }

    /// Returns the category dimension.
    pub fn category_filter(&self) -> &CategoryFilter {
        &self.category
    }

    /// Returns true if no dimension is set, in which case every test is visible.
    pub fn is_empty(&self) -> bool {
        self.outcome.is_empty() && self.text.is_empty() && self.category.is_empty()
    }

    /// Starts a batched update. Nothing changes until [`FilterUpdate::commit`] is called.
    pub fn update(&mut self) -> FilterUpdate<'_> {
        FilterUpdate {
            filter: self,
            outcome: None,
            text: None,
            category: None,
        }
    }

    /// Replaces the outcome dimension.
    pub fn set_outcome_filter(&mut self, outcome: OutcomeFilter) -> Option<FilterChanged> {
        self.update().outcome(outcome).commit()
    }

    /// Replaces the text dimension.
    pub fn set_text_filter(&mut self, text: impl Into<String>) -> Option<FilterChanged> {
        self.update().text(text).commit()
    }

    /// Replaces the category dimension.
    pub fn set_category_filter(&mut self, category: CategoryFilter) -> Option<FilterChanged> {
        self.update().category(category).commit()
    }

    /// Resets all three dimensions.
    pub fn clear(&mut self) -> Option<FilterChanged> {
        self.update().clear().commit()
    }

    /// Returns true if the node itself passes every dimension.
    ///
    /// `effective_categories` are the node's own categories plus those of its ancestors, and
    /// `severity` is the worst-case result at or below the node (`None` if nothing ran).
    pub fn matches_self(
        &self,
        node: &TestNode,
        effective_categories: &[&str],
        severity: Option<Severity>,
    ) -> bool {
        self.outcome.accepts(severity)
            && self.text.accepts(node)
            && self.category.accepts(effective_categories)
    }

    /// Returns true if `node` should remain visible given its result.
    ///
    /// A composite node is visible if it matches itself or any descendant matches. Descendant
    /// results are taken from the children of `result`.
    pub fn matches(&self, node: &TestNode, result: Option<&ResultNode>) -> bool {
        if self.is_empty() {
            return true;
        }
        let lookup = ResultTree::new(result);
        self.evaluate(node, &lookup).is_visible(node.id())
    }

    /// Evaluates the filter over a whole test graph.
    pub fn evaluate<R: ResultLookup + ?Sized>(&self, root: &TestNode, results: &R) -> FilterVerdict {
        if self.is_empty() {
            return FilterVerdict { visible: None };
        }
        let mut visible = HashSet::new();
        let mut inherited = Vec::new();
        self.visit(root, &mut inherited, results, &mut visible);
        FilterVerdict {
            visible: Some(visible),
        }
    }

    fn visit<'n, R: ResultLookup + ?Sized>(
        &self,
        node: &'n TestNode,
        inherited: &mut Vec<&'n str>,
        results: &R,
        visible: &mut HashSet<TestId>,
    ) -> (Option<Severity>, bool) {
        let depth = inherited.len();
        inherited.extend(node.categories());

        let mut severity = results
            .result(node.id())
            .map(ResultNode::aggregate_severity);
        let mut child_visible = false;
        for child in node.children() {
            let (child_severity, is_visible) = self.visit(child, inherited, results, visible);
            severity = severity.max(child_severity);
            child_visible |= is_visible;
        }

        let mut effective: Vec<&str> = inherited.clone();
        effective.sort_unstable();
        effective.dedup();
        let is_visible = child_visible || self.matches_self(node, &effective, severity);
        inherited.truncate(depth);

        if is_visible {
            visible.insert(node.id().clone());
        }
        (severity, is_visible)
    }
}

/// The set of visible tests computed by [`TestFilter::evaluate`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FilterVerdict {
    // None means the filter was empty and everything is visible.
    visible: Option<HashSet<TestId>>,
}

impl FilterVerdict {
    /// A verdict under which every test is visible.
    pub fn all() -> Self {
        Self { visible: None }
    }

    /// Returns true if the test with this id is visible.
    pub fn is_visible(&self, id: &TestId) -> bool {
        self.visible.as_ref().is_none_or(|visible| visible.contains(id))
    }

    /// Returns the number of visible tests, or `None` if everything is visible.
    pub fn visible_count(&self) -> Option<usize> {
        self.visible.as_ref().map(HashSet::len)
    }
}

/// A batched filter update, created by [`TestFilter::update`].
#[must_use = "filter updates do nothing until committed"]
#[derive(Debug)]
pub struct FilterUpdate<'a> {
    filter: &'a mut TestFilter,
    outcome: Option<OutcomeFilter>,
    text: Option<TextFilter>,
    category: Option<CategoryFilter>,
}

impl FilterUpdate<'_> {
    /// Sets the outcome dimension.
    pub fn outcome(mut self, outcome: OutcomeFilter) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Sets the text dimension.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(TextFilter::new(text));
        self
    }

    /// Sets the category dimension.
    pub fn category(mut self, category: CategoryFilter) -> Self {
        self.category = Some(category);
        self
    }

    /// Resets every dimension.
    pub fn clear(self) -> Self {
        self.outcome(OutcomeFilter::default())
            .text("")
            .category(CategoryFilter::default())
    }

    /// Applies the update, returning a change record if any dimension actually changed.
    pub fn commit(self) -> Option<FilterChanged> {
        let mut dimensions = FilterDimensions::empty();
        if let Some(outcome) = self.outcome
            && outcome != self.filter.outcome
        {
            self.filter.outcome = outcome;
            dimensions |= FilterDimensions::OUTCOME;
        }
        if let Some(text) = self.text
            && text != self.filter.text
        {
            self.filter.text = text;
            dimensions |= FilterDimensions::TEXT;
        }
        if let Some(category) = self.category
            && category != self.filter.category
        {
            self.filter.category = category;
            dimensions |= FilterDimensions::CATEGORY;
        }

        if dimensions.is_empty() {
            None
        } else {
            debug!("test filter changed: {dimensions:?}");
            Some(FilterChanged { dimensions })
        }
    }
}

/// Exposes a single result graph through [`ResultLookup`].
struct ResultTree<'a> {
    by_id: HashMap<TestId, &'a ResultNode>,
}

impl<'a> ResultTree<'a> {
    fn new(root: Option<&'a ResultNode>) -> Self {
        let by_id = root
            .into_iter()
            .flat_map(ResultNode::walk)
            .map(|node| (node.id().clone(), node))
            .collect();
        Self { by_id }
    }
}

impl ResultLookup for ResultTree<'_> {
    fn result(&self, id: &TestId) -> Option<&ResultNode> {
        self.by_id.get(id).copied()
    }
}
