// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! The test tree presentation engine.
//!
//! A [`TreeViewPresenter`] projects a loaded [`TestNode`](testcentric_model::TestNode) graph
//! into a [`DisplayTree`] using one of three [`DisplayStrategy`] shapes, keeps that tree in step
//! with results as they arrive, and mirrors every change onto a [`TestTreeView`].
//!
//! All external events (model life-cycle, view gestures and settings changes) go through a
//! single queue. Post them from any thread with a [`PresenterHandle`] and drain them on the UI
//! thread with [`TreeViewPresenter::process_pending`].

pub mod display;
pub mod errors;
mod model;
mod presenter;
pub mod settings;
pub mod strategy;
#[cfg(test)]
mod test_helpers;
mod view;
pub mod visual_state;

pub use display::{
    DisplayNode, DisplayNodeId, DisplayNodeKind, DisplayTree, SortDirection, SortKey, TestImage,
    TreeChange, TreeSort, VisualNodeKey,
};
pub use model::*;
pub use presenter::*;
pub use settings::{Grouping, GuiLayout, SettingChange, StrategyId, TreeSettings};
pub use strategy::{DisplayStrategy, TreeState};
pub use view::*;
pub use visual_state::VisualState;
