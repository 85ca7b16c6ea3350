// Copyright (c) The TestCentric Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal element tree over `quick-xml` events.

use crate::errors::MalformedResultError;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};

/// An XML element with its attributes, text content and child elements.
#[derive(Clone, Debug, Default)]
pub(crate) struct Element {
    pub(crate) name: String,
    attributes: Vec<(String, String)>,
    pub(crate) text: String,
    pub(crate) children: Vec<Element>,
}

impl Element {
    pub(crate) fn parse(input: &str) -> Result<Element, MalformedResultError> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        // The synthetic document element collects top-level elements.
        let mut stack = vec![Element::default()];
        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(Element::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Element::from_start(&start)?;
                    push_child(&mut stack, element);
                }
                Event::End(_) => {
                    // quick-xml checks that end tags match their start tags.
                    if stack.len() > 1
                        && let Some(element) = stack.pop()
                    {
                        push_child(&mut stack, element);
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    append_text(&mut stack, &text);
                }
                Event::CData(data) => {
                    let data = data.into_inner();
                    append_text(&mut stack, &String::from_utf8_lossy(&data));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        // Fold anything left open at end of input into its parent.
        while stack.len() > 1 {
            if let Some(element) = stack.pop() {
                push_child(&mut stack, element);
            }
        }
        Ok(stack.pop().unwrap_or_default())
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Element, MalformedResultError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Element {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }

    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub(crate) fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Returns the text of `<self><name>text</name></self>`, if non-empty.
    pub(crate) fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(|child| child.text.clone())
            .filter(|text| !text.is_empty())
    }

    /// Finds the first element (depth-first, including `self`) with one of the given names.
    pub(crate) fn find_first(&self, names: &[&str]) -> Option<&Element> {
        if names.contains(&self.name.as_str()) {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_first(names))
    }
}

fn push_child(stack: &mut [Element], element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    }
}

fn append_text(stack: &mut [Element], text: &str) {
    if let Some(current) = stack.last_mut() {
        current.text.push_str(text);
    }
}
