// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `testtree` shows the TestCentric test tree for an NUnit-style result document.
//!
//! The document is loaded into a [`TreeViewPresenter`](testcentric_tree::TreeViewPresenter)
//! with a text view, any results it carries are replayed as a test run, and the resulting tree
//! is printed.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod file_model;
mod output;
mod text_view;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
