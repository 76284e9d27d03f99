use std::{io::Write, path::Path};

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    error::Result,
    xmltv::{Document, Element},
};

/// Serialize a document to XML text with a standard declaration.
///
/// Attributes are re-escaped from their decoded values; inner markup is
/// written back verbatim.
pub fn to_xml(doc: &Document) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new(doc.root_name.as_str());
    for (name, value) in &doc.root_attrs {
        root.push_attribute((name.as_str(), value.as_str()));
    }
    if doc.children.is_empty() {
        writer.write_event(Event::Empty(root))?;
    } else {
        writer.write_event(Event::Start(root))?;
        for child in &doc.children {
            write_element(&mut writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(doc.root_name.as_str())))?;
    }

    Ok(String::from_utf8(writer.into_inner()).expect("serialized XML is valid UTF-8"))
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (name, value) in &element.attrs {
        start.push_attribute((name.as_str(), value.as_str()));
    }
    if element.inner.is_empty() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        // Already-escaped source markup, written through untouched
        writer.write_event(Event::Text(BytesText::from_escaped(element.inner.as_str())))?;
        writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    }
    Ok(())
}

/// Write the guide document to `dest`, replacing any existing file.
///
/// The document is written to a sibling temp file first and renamed into
/// place, so an interrupted run leaves the original guide intact.
pub fn write_guide(doc: &Document, dest: &Path) -> Result<()> {
    let content = to_xml(doc)?;

    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    debug!("renaming {:?} to {dest:?}", tmp.path());
    tmp.persist(dest).map_err(|err| err.error)?;

    Ok(())
}
