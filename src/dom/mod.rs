//! Owned XML document tree: parsing and serialization.
//!
//! Documents are parsed into a fully owned recursive tree so that alterations
//! can detach and reorder nodes freely, then serialized back to text with
//! local escaping helpers. The tree keeps elements, attributes, and text;
//! comments, processing instructions, and doctypes are dropped because the
//! comparison model never inspects them.

mod node;

pub use node::{Attribute, Element, XmlNode};

use std::fmt::Write as _;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// Parse a document from XML text.
    ///
    /// Adjacent text runs (including resolved entity and character
    /// references) are merged into single text nodes, then trimmed;
    /// whitespace-only runs are dropped, so documents that differ only in
    /// indentation parse to identical trees.
    pub fn parse(xml: &str) -> Result<Document> {
        let mut reader = Reader::from_str(xml);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => stack.push(read_element(&e)?),
                Ok(Event::Empty(e)) => {
                    let el = read_element(&e)?;
                    attach(el, &mut stack, &mut root)?;
                }
                Ok(Event::End(_)) => {
                    let el = stack.pop().ok_or_else(|| {
                        Error::InvalidXml("unexpected closing tag".to_string())
                    })?;
                    attach(el, &mut stack, &mut root)?;
                }
                Ok(Event::Text(t)) => {
                    let raw = String::from_utf8_lossy(t.as_ref()).into_owned();
                    push_text(&mut stack, &unescape(&raw)?)?;
                }
                Ok(Event::CData(t)) => {
                    let text = String::from_utf8_lossy(&t).into_owned();
                    push_text(&mut stack, &text)?;
                }
                Ok(Event::GeneralRef(e)) => {
                    let entity = String::from_utf8_lossy(e.as_ref()).into_owned();
                    let resolved = resolve_entity(&entity).ok_or_else(|| {
                        Error::InvalidXml(format!("unresolvable entity reference '&{entity};'"))
                    })?;
                    push_text(&mut stack, &resolved)?;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {} // declaration, comments, PIs, doctype
                Err(e) => return Err(Error::Xml(e)),
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::InvalidXml(format!("unclosed element <{}>", open.name)));
        }

        root.map(|root| Document { root })
            .ok_or_else(|| Error::InvalidXml("no document element".to_string()))
    }

    /// Serialize the whole document back to XML text.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>");
        write_element(&self.root, &mut out);
        out
    }
}

impl Element {
    /// Serialize this element and its subtree as an XML fragment.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

fn read_element(e: &BytesStart) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut el = Element::new(&name);
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        el.attributes.push(Attribute {
            name: key,
            value: unescape(&raw)?,
        });
    }
    Ok(el)
}

/// Append a text run to the innermost open element, merging with a preceding
/// text run so entity boundaries don't fragment the content.
fn push_text(stack: &mut Vec<Element>, text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            if let Some(XmlNode::Text(last)) = parent.children.last_mut() {
                last.push_str(text);
            } else {
                parent.children.push(XmlNode::Text(text.to_string()));
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(Error::InvalidXml(format!(
            "text outside the document element: '{}'",
            text.trim()
        ))),
    }
}

/// A completed element joins its parent (or becomes the document element).
/// Its merged text runs are trimmed here; whitespace-only runs are dropped.
fn attach(el: Element, stack: &mut Vec<Element>, root: &mut Option<Element>) -> Result<()> {
    let el = finish_element(el);
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(el)),
        None => {
            if root.is_some() {
                return Err(Error::InvalidXml(format!(
                    "second document element <{}>",
                    el.name
                )));
            }
            *root = Some(el);
        }
    }
    Ok(())
}

fn finish_element(mut el: Element) -> Element {
    let mut children = Vec::with_capacity(el.children.len());
    for child in el.children {
        match child {
            XmlNode::Text(t) => {
                let trimmed = t.trim();
                if !trimmed.is_empty() {
                    children.push(XmlNode::Text(trimmed.to_string()));
                }
            }
            other => children.push(other),
        }
    }
    el.children = children;
    el
}

fn unescape(raw: &str) -> Result<String> {
    quick_xml::escape::unescape(raw)
        .map(|s| s.into_owned())
        .map_err(|e| Error::InvalidXml(format!("bad entity reference: {e}")))
}

/// Resolve a general reference name (the text between `&` and `;`):
/// the five predefined entities plus decimal and hex character references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#') {
        if let Ok(code) = dec.parse::<u32>()
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    }

    None
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for attr in &el.attributes {
        let _ = write!(out, " {}=\"{}\"", attr.name, escape_attr(&attr.value));
    }
    if el.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &el.children {
        match child {
            XmlNode::Element(e) => write_element(e, out),
            XmlNode::Text(t) => out.push_str(&escape_text(t)),
        }
    }
    let _ = write!(out, "</{}>", el.name);
}

/// Escape XML special characters for text content.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape XML special characters for a double-quoted attribute value.
pub fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_document() {
        let doc = Document::parse("<Root><Child>text</Child></Root>").unwrap();
        assert_eq!(doc.root.name, "Root");
        assert_eq!(doc.root.children.len(), 1);
        let child = doc.root.child_elements().next().unwrap();
        assert_eq!(child.name, "Child");
        assert_eq!(child.direct_text(), "text");
    }

    #[test]
    fn test_parse_attributes() {
        let doc = Document::parse(r#"<Root><Node Name="a" Id="1"/></Root>"#).unwrap();
        let node = doc.root.child_elements().next().unwrap();
        assert_eq!(node.attr("Name"), Some("a"));
        assert_eq!(node.attr("Id"), Some("1"));
    }

    #[test]
    fn test_parse_unescapes_entities() {
        let doc = Document::parse("<Root attr=\"a &amp; b\">1 &lt; 2</Root>").unwrap();
        assert_eq!(doc.root.attr("attr"), Some("a & b"));
        assert_eq!(doc.root.direct_text(), "1 < 2");
        // the entity must not fragment the text into separate nodes
        assert_eq!(doc.root.children.len(), 1);
    }

    #[test]
    fn test_parse_character_references() {
        let doc = Document::parse("<Root>&#65;&#x42;</Root>").unwrap();
        assert_eq!(doc.root.direct_text(), "AB");
    }

    #[test]
    fn test_unknown_entity_is_error() {
        assert!(Document::parse("<Root>&nope;</Root>").is_err());
    }

    #[test]
    fn test_cdata_is_text() {
        let doc = Document::parse("<Root><![CDATA[1 < 2]]></Root>").unwrap();
        assert_eq!(doc.root.direct_text(), "1 < 2");
    }

    #[test]
    fn test_roundtrip_preserves_structure() {
        let doc = Document::parse(
            r#"<Root><A Name="x &amp; y">1 &lt; 2</A><B/><C>text</C></Root>"#,
        )
        .unwrap();
        let reparsed = Document::parse(&doc.to_xml()).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn test_whitespace_between_elements_ignored() {
        let pretty = Document::parse("<Root>\n  <A>x</A>\n  <B>y</B>\n</Root>").unwrap();
        let compact = Document::parse("<Root><A>x</A><B>y</B></Root>").unwrap();
        assert_eq!(pretty, compact);
    }

    #[test]
    fn test_declaration_and_comments_dropped() {
        let doc = Document::parse(
            "<?xml version='1.0' encoding='utf-8'?><!-- note --><Root><A/></Root>",
        )
        .unwrap();
        assert_eq!(doc.root.children.len(), 1);
    }

    #[test]
    fn test_mismatched_tag_is_error() {
        assert!(Document::parse("<Root><A></B></Root>").is_err());
    }

    #[test]
    fn test_unclosed_element_is_error() {
        assert!(Document::parse("<Root><A>").is_err());
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(Document::parse("").is_err());
    }

    #[test]
    fn test_second_root_is_error() {
        assert!(Document::parse("<A/><B/>").is_err());
    }
}
