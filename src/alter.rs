//! Document alterations applied before comparison.
//!
//! An alteration is a deterministic, total rewrite of one document that
//! normalizes away an expected divergence between the two upstream systems.
//! Three kinds exist: structural removal by selector, whole-document literal
//! text substitution, and alphabetical reordering of sibling groups. Each is
//! a no-op on documents with nothing to match; none may produce a
//! non-well-formed document.

use memchr::memmem;

use crate::dom::{Document, Element, XmlNode};
use crate::error::Result;
use crate::selector::{Hit, Selector};

/// A single named document rewrite. `apply` consumes the document and returns
/// the transformed one; callers must use the returned value.
#[derive(Debug, Clone)]
pub enum Alteration {
    /// Remove every node or attribute matched by the selector.
    RemoveMatches { selector: Selector },
    /// Serialize the document, replace every literal occurrence of `from`
    /// with `to`, and re-parse. The optional note is carried into the report
    /// description.
    ReplaceText {
        from: String,
        to: String,
        note: Option<String>,
    },
    /// For each container matched by `container`, detach the children matched
    /// by `child` and re-append them in ascending order of their text
    /// content, after the unmatched children.
    SortChildren { container: Selector, child: Selector },
}

impl Alteration {
    /// Removal of every match of a selector expression.
    pub fn remove(selector: &str) -> Result<Alteration> {
        Ok(Alteration::RemoveMatches {
            selector: Selector::parse(selector)?,
        })
    }

    /// Literal whole-document text substitution.
    pub fn replace(from: &str, to: &str) -> Alteration {
        Alteration::ReplaceText {
            from: from.to_string(),
            to: to.to_string(),
            note: None,
        }
    }

    /// Literal substitution with an explanatory note for the report.
    pub fn replace_with_note(from: &str, to: &str, note: &str) -> Alteration {
        Alteration::ReplaceText {
            from: from.to_string(),
            to: to.to_string(),
            note: Some(note.to_string()),
        }
    }

    /// Alphabetical reorder of the children of every matched container.
    ///
    /// The child selector must be a single relative step (a tag name or `*`,
    /// optionally with predicates); only direct children are sorted.
    pub fn sort(container: &str, child: &str) -> Result<Alteration> {
        let container = Selector::parse(container)?;
        let child = Selector::parse(child)?;
        if child.child_step().is_none() {
            return Err(crate::error::Error::MalformedSelector(format!(
                "'{child}': reorder child selector must be a single relative step"
            )));
        }
        Ok(Alteration::SortChildren { container, child })
    }

    /// Apply this alteration to a document.
    pub fn apply(&self, doc: Document) -> Result<Document> {
        match self {
            Alteration::RemoveMatches { selector } => Ok(remove_matches(selector, doc)),
            Alteration::ReplaceText { from, to, .. } => replace_text(from, to, doc),
            Alteration::SortChildren { container, child } => {
                Ok(sort_children(container, child, doc))
            }
        }
    }

    /// Human-readable description for the report.
    pub fn describe(&self) -> String {
        match self {
            Alteration::RemoveMatches { selector } => {
                format!("Removed all nodes matching '{selector}'")
            }
            Alteration::ReplaceText { from, to, note } => {
                let addendum = note
                    .as_deref()
                    .map(|n| format!(" - {n}"))
                    .unwrap_or_default();
                format!("Replaced '{from}' with '{to}' in the whole document{addendum}")
            }
            Alteration::SortChildren { container, child } => {
                format!("Sorted '{child}' children of '{container}' alphabetically")
            }
        }
    }
}

/// Detach every matched node or attribute. The match set is materialized
/// before any mutation and processed in reverse document order, so earlier
/// match locations stay valid while later ones are removed.
fn remove_matches(selector: &Selector, mut doc: Document) -> Document {
    let hits = selector.find(&doc);
    for hit in hits.iter().rev() {
        match hit {
            Hit::Attribute(path, name) => {
                if let Some(el) = element_at_mut(&mut doc.root, path) {
                    el.remove_attr(name);
                }
            }
            Hit::Node(path) => {
                // The document element itself is never detached.
                let Some((&last, parent_path)) = path.split_last() else {
                    continue;
                };
                if let Some(parent) = element_at_mut(&mut doc.root, parent_path) {
                    if last < parent.children.len() {
                        parent.children.remove(last);
                    }
                }
            }
        }
    }
    doc
}

fn replace_text(from: &str, to: &str, doc: Document) -> Result<Document> {
    if from.is_empty() {
        return Ok(doc);
    }
    let xml = doc.to_xml();
    let mut out = String::with_capacity(xml.len());
    let mut last = 0;
    for pos in memmem::find_iter(xml.as_bytes(), from.as_bytes()) {
        out.push_str(&xml[last..pos]);
        out.push_str(to);
        last = pos + from.len();
    }
    out.push_str(&xml[last..]);
    Document::parse(&out)
}

/// Containers are matched once, up front; nested containers are handled
/// deepest-first so ancestor reordering cannot invalidate pending paths.
fn sort_children(container: &Selector, child: &Selector, mut doc: Document) -> Document {
    let Some(step) = child.child_step() else {
        return doc; // enforced at construction
    };
    let hits = container.find(&doc);
    for hit in hits.iter().rev() {
        let Hit::Node(path) = hit else { continue };
        let Some(el) = element_at_mut(&mut doc.root, path) else {
            continue;
        };
        let matched: Vec<usize> = step.filter_children(el).into_iter().map(|(i, _)| i).collect();
        let mut group: Vec<XmlNode> = Vec::with_capacity(matched.len());
        for &i in matched.iter().rev() {
            group.push(el.children.remove(i));
        }
        group.reverse();
        group.sort_by_key(XmlNode::text_content);
        el.children.extend(group);
    }
    doc
}

fn element_at_mut<'a>(root: &'a mut Element, path: &[usize]) -> Option<&'a mut Element> {
    let mut el = root;
    for &idx in path {
        match el.children.get_mut(idx) {
            Some(XmlNode::Element(e)) => el = e,
            _ => return None,
        }
    }
    Some(el)
}
