// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

/// An error that occurs while reading a test or result document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MalformedResultError {
    /// The document is not well-formed XML.
    #[error("result document is not well-formed XML")]
    Xml(#[from] quick_xml::Error),

    /// The document contains no test element.
    #[error("result document contains no `test-run`, `test-suite` or `test-case` element")]
    NoTests,

    /// A required attribute is missing from an element.
    #[error("`{element}` element is missing required attribute `{attribute}`{}", DisplayId(.id))]
    MissingAttribute {
        /// The element name.
        element: String,

        /// The attribute that was missing.
        attribute: &'static str,

        /// The id of the element, if known.
        id: Option<String>,
    },

    /// An integer attribute could not be parsed.
    #[error("attribute `{attribute}` on test `{id}` is not a valid integer: `{value}`")]
    InvalidInteger {
        /// The id of the element.
        id: String,

        /// The attribute name.
        attribute: &'static str,

        /// The value that failed to parse.
        value: String,

        /// The underlying error.
        #[source]
        error: ParseIntError,
    },

    /// A duration attribute could not be parsed.
    #[error("attribute `duration` on test `{id}` is not a valid number: `{value}`")]
    InvalidDuration {
        /// The id of the element.
        id: String,

        /// The value that failed to parse.
        value: String,

        /// The underlying error.
        #[source]
        error: ParseFloatError,
    },
}

struct DisplayId<'a>(&'a Option<String>);

impl std::fmt::Display for DisplayId<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(id) => write!(f, " (id `{id}`)"),
            None => Ok(()),
        }
    }
}
