//! Forward-only tag cursor over icon pack XML documents
//!
//! Icon pack documents are only ever consumed tag by tag, never as a tree, so
//! this wraps `quick_xml::Reader` into a stream of start/end tag events with
//! owned attribute lists. Self-closing tags produce a start event followed by
//! an end event.

use crate::error::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// A start tag with its attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    attributes: Vec<(String, String)>,
}

impl Tag {
    fn from_bytes(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let attributes = start
            .attributes()
            .filter_map(|a| a.ok())
            .map(|attr| {
                // Namespace prefixes (android:) are irrelevant to pack documents
                let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                let value = match attr.unescape_value() {
                    Ok(value) => value.into_owned(),
                    Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
                };
                (key, value)
            })
            .collect();
        Self { name, attributes }
    }

    /// Local tag name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value by local name
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Integer attribute, `default` when absent or malformed
    pub fn int_attr(&self, key: &str, default: i32) -> i32 {
        self.attr(key)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }

    /// All attributes in document order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Event produced by `TagReader`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEvent {
    /// Opening (or self-closing) tag
    Start(Tag),
    /// Closing tag, by local name
    End(String),
}

/// Streaming tag reader
pub struct TagReader<'a> {
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
    pending_end: Option<String>,
    depth: usize,
}

impl<'a> TagReader<'a> {
    /// Reader over a whole document
    pub fn new(document: &'a str) -> Self {
        let mut reader = Reader::from_str(document);
        reader.trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            pending_end: None,
            depth: 0,
        }
    }

    /// Nesting depth of the last event; top-level tags are at depth 1
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Next tag event, `None` at end of document
    ///
    /// Text, comments and processing instructions are skipped.
    pub fn next_event(&mut self) -> Result<Option<TagEvent>> {
        if let Some(name) = self.pending_end.take() {
            self.depth = self.depth.saturating_sub(1);
            return Ok(Some(TagEvent::End(name)));
        }
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(ref e) => {
                    self.depth += 1;
                    return Ok(Some(TagEvent::Start(Tag::from_bytes(e))));
                }
                Event::Empty(ref e) => {
                    self.depth += 1;
                    let tag = Tag::from_bytes(e);
                    self.pending_end = Some(tag.name.clone());
                    return Ok(Some(TagEvent::Start(tag)));
                }
                Event::End(ref e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    self.depth = self.depth.saturating_sub(1);
                    return Ok(Some(TagEvent::End(name)));
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    /// Next start tag, skipping end events
    pub fn next_start(&mut self) -> Result<Option<Tag>> {
        while let Some(event) = self.next_event()? {
            if let TagEvent::Start(tag) = event {
                return Ok(Some(tag));
            }
        }
        Ok(None)
    }
}
