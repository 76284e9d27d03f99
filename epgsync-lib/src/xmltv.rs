use std::{fs, path::Path, str};

use quick_xml::{events::BytesStart, events::Event, Reader};

use crate::error::{Error, Result};

pub const CHANNEL: &str = "channel";
pub const PROGRAMME: &str = "programme";

/// A single element directly below the document root.
///
/// Only the tag name and attributes are decoded; everything between the start
/// and end tag is kept verbatim, still escaped exactly as it appeared in the
/// source. The merge never needs to look inside an element, so opaque
/// programme content round-trips byte-for-byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    /// Decoded attributes in document order.
    pub attrs: Vec<(String, String)>,
    /// Raw inner markup.
    pub inner: String,
}

impl Element {
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute value, replacing any existing value for `name` in place.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(attr) => attr.1 = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }
}

/// An XMLTV guide document: the root element and its direct children.
///
/// Channel and programme elements are expected to be siblings directly below
/// the root. Programmes reference their channel through a `channel` attribute
/// matching a channel's `id`; nothing in the tree enforces that link, the
/// merge just depends on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub root_name: String,
    pub root_attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Document {
    pub fn with_path(fpath: &Path) -> Result<Document> {
        let text = fs::read_to_string(fpath)?;
        Document::parse(&text)
    }

    /// Parse a document from its XML text.
    ///
    /// Top-level comments, processing instructions, and doctype declarations
    /// are dropped; markup inside child elements is preserved verbatim.
    ///
    /// # Errors
    /// If the text is not well-formed XML or contains no root element.
    pub fn parse(text: &str) -> Result<Document> {
        let mut reader = Reader::from_str(text);

        // Scan ahead to the root element
        let mut doc = loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    break Document {
                        root_name: decode_name(&start)?,
                        root_attrs: decode_attrs(&start)?,
                        children: Vec::default(),
                    };
                }
                Event::Empty(start) => {
                    return Ok(Document {
                        root_name: decode_name(&start)?,
                        root_attrs: decode_attrs(&start)?,
                        children: Vec::default(),
                    });
                }
                Event::Eof => {
                    return Err(Error::MalformedDocument("no root element".to_string()));
                }
                _ => {}
            }
        };

        // Collect the root's direct children; their content is captured as-is
        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let name = decode_name(&start)?;
                    let attrs = decode_attrs(&start)?;
                    let span = reader.read_to_end(start.name())?;
                    doc.children.push(Element {
                        name,
                        attrs,
                        inner: text[span.start as usize..span.end as usize].to_string(),
                    });
                }
                Event::Empty(start) => {
                    doc.children.push(Element {
                        name: decode_name(&start)?,
                        attrs: decode_attrs(&start)?,
                        inner: String::default(),
                    });
                }
                // The root's end tag; anything after it is not ours
                Event::End(_) => break,
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(doc)
    }

    /// Ids of all channel elements, in document order.
    ///
    /// Channels without an `id` attribute are skipped.
    #[must_use]
    pub fn channel_ids(&self) -> Vec<String> {
        self.children
            .iter()
            .filter(|e| e.name == CHANNEL)
            .filter_map(|e| e.attr("id"))
            .map(String::from)
            .collect()
    }

    /// All programme elements, in document order.
    pub fn programmes(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter(|e| e.name == PROGRAMME)
    }

    /// Remove every programme assigned to `channel_id`, returning how many
    /// were removed.
    pub fn remove_programmes(&mut self, channel_id: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|e| !(e.name == PROGRAMME && e.attr("channel") == Some(channel_id)));
        before - self.children.len()
    }
}

fn decode_name(start: &BytesStart) -> Result<String> {
    Ok(str::from_utf8(start.name().as_ref())?.to_string())
}

fn decode_attrs(start: &BytesStart) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::default();
    for attr in start.attributes() {
        let attr = attr?;
        let key = str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}
