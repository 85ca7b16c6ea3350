// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for unit tests.

use std::sync::LazyLock;
use testcentric_model::{ResultNode, ResultStore, TestNode};

pub(crate) static MOCK_ASSEMBLY: LazyLock<TestNode> = LazyLock::new(|| {
    static FIXTURE_XML: &str = include_str!("../../fixtures/mock-assembly.xml");
    TestNode::parse(FIXTURE_XML).expect("fixture is a valid test document")
});

pub(crate) static MOCK_ASSEMBLY_RESULTS: LazyLock<ResultNode> = LazyLock::new(|| {
    static FIXTURE_XML: &str = include_str!("../../fixtures/mock-assembly-results.xml");
    ResultNode::parse(FIXTURE_XML)
        .expect("fixture is a valid result document")
        .expect("fixture has results")
});

/// Returns the explored mock assembly: 7 test cases under one assembly.
pub(crate) fn mock_assembly() -> TestNode {
    MOCK_ASSEMBLY.clone()
}

/// Returns a store holding every result from a full run of the mock assembly.
pub(crate) fn mock_results() -> ResultStore {
    let mut store = ResultStore::new();
    store.insert_recursive(&MOCK_ASSEMBLY_RESULTS);
    store
}
