// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Value objects describing a loaded test hierarchy and the results of running it.
//!
//! Both [`TestNode`] and [`ResultNode`] graphs are produced from a single NUnit-style XML
//! document: an explore result carries only structure, while a run result also carries
//! `result` attributes. Graphs are immutable for the lifetime of one load and are replaced
//! wholesale on reload.

mod errors;
mod result_node;
mod test_node;
mod xml;

pub use errors::*;
pub use result_node::*;
pub use test_node::*;
