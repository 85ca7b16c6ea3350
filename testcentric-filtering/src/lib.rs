// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Filters that decide which tests stay visible in the test tree.
//!
//! A [`TestFilter`] composes three independent dimensions (outcome, free text and category)
//! with a logical AND. Any dimension left unset accepts everything. Filters are changed
//! through [`TestFilter::update`], which batches edits to several dimensions into a single
//! [`FilterChanged`] record so that callers rebuild the tree at most once per edit.

mod filter;
mod outcome;

pub use filter::*;
pub use outcome::*;
