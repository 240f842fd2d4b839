//! Structural difference records and the diff engine seam.
//!
//! The engine contract is deliberately small: compare two documents, emit a
//! finite, single-pass sequence of [`RawDifference`] records in document
//! traversal order. The built-in [`TreeDiff`] engine walks both trees in
//! lockstep, pairing child elements by tag name and occurrence; anything
//! smarter (move detection, similarity matching) can be supplied behind the
//! same trait.

use std::fmt;

use crate::dom::{Document, Element};

/// Category of a structural difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    /// Text content of paired elements differs.
    TextValue,
    /// Value of a shared attribute differs.
    AttributeValue,
    /// Paired elements have different child counts.
    ChildListLength,
    /// A paired child sits at a different position on each side.
    ChildSequence,
    /// A node or attribute exists on one side only.
    ChildLookup,
    /// Paired elements have different names.
    ElementName,
}

impl DiffKind {
    fn label(self) -> &'static str {
        match self {
            DiffKind::TextValue => "text value",
            DiffKind::AttributeValue => "attribute value",
            DiffKind::ChildListLength => "child list length",
            DiffKind::ChildSequence => "child sequence",
            DiffKind::ChildLookup => "child lookup",
            DiffKind::ElementName => "element name",
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One raw difference between a control and a target document.
///
/// Locations are indexed XPath-like strings (`/Deal[1]/Leg[2]`); fragments
/// are the differing values or serialized nodes, where available. The
/// `Display` impl is the engine's default textual description, used for
/// difference kinds that have no fragment-combining rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDifference {
    pub kind: DiffKind,
    pub control_location: Option<String>,
    pub target_location: Option<String>,
    pub control_fragment: Option<String>,
    pub target_fragment: Option<String>,
}

impl fmt::Display for RawDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let control = self.control_fragment.as_deref().unwrap_or("<absent>");
        let target = self.target_fragment.as_deref().unwrap_or("<absent>");
        let location = self
            .control_location
            .as_deref()
            .or(self.target_location.as_deref())
            .unwrap_or("<unknown>");
        write!(
            f,
            "{}: expected '{control}' but was '{target}' at {location}",
            self.kind
        )
    }
}

/// Compares one processed control/target pair.
pub trait DiffEngine {
    /// Emit every difference between the two documents, in document
    /// traversal order. The sequence is finite and single-pass.
    fn compare(&self, control: &Document, target: &Document)
    -> Box<dyn Iterator<Item = RawDifference>>;
}

/// The built-in structural diff: recursive lockstep walk pairing child
/// elements by tag name and occurrence index.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeDiff;

impl DiffEngine for TreeDiff {
    fn compare(
        &self,
        control: &Document,
        target: &Document,
    ) -> Box<dyn Iterator<Item = RawDifference>> {
        let mut out = Vec::new();
        let cpath = format!("/{}[1]", control.root.name);
        let tpath = format!("/{}[1]", target.root.name);
        compare_elements(&control.root, &target.root, &cpath, &tpath, &mut out);
        Box::new(out.into_iter())
    }
}

fn compare_elements(
    control: &Element,
    target: &Element,
    cpath: &str,
    tpath: &str,
    out: &mut Vec<RawDifference>,
) {
    if control.name != target.name {
        out.push(RawDifference {
            kind: DiffKind::ElementName,
            control_location: Some(cpath.to_string()),
            target_location: Some(tpath.to_string()),
            control_fragment: Some(control.name.clone()),
            target_fragment: Some(target.name.clone()),
        });
        return;
    }

    compare_attributes(control, target, cpath, tpath, out);

    let ctext = control.direct_text();
    let ttext = target.direct_text();
    if ctext != ttext {
        out.push(RawDifference {
            kind: DiffKind::TextValue,
            control_location: Some(format!("{cpath}/text()")),
            target_location: Some(format!("{tpath}/text()")),
            control_fragment: Some(ctext),
            target_fragment: Some(ttext),
        });
    }

    compare_children(control, target, cpath, tpath, out);
}

fn compare_attributes(
    control: &Element,
    target: &Element,
    cpath: &str,
    tpath: &str,
    out: &mut Vec<RawDifference>,
) {
    for attr in &control.attributes {
        match target.attr(&attr.name) {
            Some(value) if value == attr.value => {}
            Some(value) => out.push(RawDifference {
                kind: DiffKind::AttributeValue,
                control_location: Some(format!("{cpath}/@{}", attr.name)),
                target_location: Some(format!("{tpath}/@{}", attr.name)),
                control_fragment: Some(attr.value.clone()),
                target_fragment: Some(value.to_string()),
            }),
            None => out.push(RawDifference {
                kind: DiffKind::ChildLookup,
                control_location: Some(format!("{cpath}/@{}", attr.name)),
                target_location: None,
                control_fragment: Some(format!("{}=\"{}\"", attr.name, attr.value)),
                target_fragment: None,
            }),
        }
    }
    for attr in &target.attributes {
        if control.attr(&attr.name).is_none() {
            out.push(RawDifference {
                kind: DiffKind::ChildLookup,
                control_location: None,
                target_location: Some(format!("{tpath}/@{}", attr.name)),
                control_fragment: None,
                target_fragment: Some(format!("{}=\"{}\"", attr.name, attr.value)),
            });
        }
    }
}

fn compare_children(
    control: &Element,
    target: &Element,
    cpath: &str,
    tpath: &str,
    out: &mut Vec<RawDifference>,
) {
    let cchildren: Vec<&Element> = control.child_elements().collect();
    let tchildren: Vec<&Element> = target.child_elements().collect();

    if cchildren.len() != tchildren.len() {
        out.push(RawDifference {
            kind: DiffKind::ChildListLength,
            control_location: Some(cpath.to_string()),
            target_location: Some(tpath.to_string()),
            control_fragment: Some(cchildren.len().to_string()),
            target_fragment: Some(tchildren.len().to_string()),
        });
    }

    // Pair children by (name, occurrence index among same-named siblings).
    let coccs = occurrences(&cchildren);
    let toccs = occurrences(&tchildren);
    let mut tmatched = vec![false; tchildren.len()];

    for (ci, child) in cchildren.iter().enumerate() {
        let occ = coccs[ci];
        let child_cpath = format!("{cpath}/{}[{occ}]", child.name);
        let pair = tchildren
            .iter()
            .enumerate()
            .position(|(ti, t)| t.name == child.name && toccs[ti] == occ);
        match pair {
            Some(ti) => {
                tmatched[ti] = true;
                let child_tpath = format!("{tpath}/{}[{occ}]", child.name);
                if ci != ti {
                    out.push(RawDifference {
                        kind: DiffKind::ChildSequence,
                        control_location: Some(child_cpath.clone()),
                        target_location: Some(child_tpath.clone()),
                        control_fragment: Some((ci + 1).to_string()),
                        target_fragment: Some((ti + 1).to_string()),
                    });
                }
                compare_elements(child, tchildren[ti], &child_cpath, &child_tpath, out);
            }
            None => out.push(RawDifference {
                kind: DiffKind::ChildLookup,
                control_location: Some(child_cpath),
                target_location: None,
                control_fragment: Some(child.to_xml()),
                target_fragment: None,
            }),
        }
    }

    for (ti, child) in tchildren.iter().enumerate() {
        if !tmatched[ti] {
            out.push(RawDifference {
                kind: DiffKind::ChildLookup,
                control_location: None,
                target_location: Some(format!("{tpath}/{}[{}]", child.name, toccs[ti])),
                control_fragment: None,
                target_fragment: Some(child.to_xml()),
            });
        }
    }
}

/// 1-based occurrence index of each element among same-named siblings.
fn occurrences(children: &[&Element]) -> Vec<usize> {
    let mut occs = Vec::with_capacity(children.len());
    for (i, child) in children.iter().enumerate() {
        let occ = children[..i].iter().filter(|c| c.name == child.name).count() + 1;
        occs.push(occ);
    }
    occs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn diffs(control: &str, target: &str) -> Vec<RawDifference> {
        let control = Document::parse(control).unwrap();
        let target = Document::parse(target).unwrap();
        TreeDiff.compare(&control, &target).collect()
    }

    #[test]
    fn test_identical_documents_have_no_differences() {
        let xml = r#"<Deal Id="1"><Leg>a</Leg><Leg>b</Leg></Deal>"#;
        assert!(diffs(xml, xml).is_empty());
    }

    #[test]
    fn test_text_value_difference() {
        let found = diffs("<A><B>x</B></A>", "<A><B>y</B></A>");
        assert_eq!(found.len(), 1);
        let d = &found[0];
        assert_eq!(d.kind, DiffKind::TextValue);
        assert_eq!(d.control_fragment.as_deref(), Some("x"));
        assert_eq!(d.target_fragment.as_deref(), Some("y"));
        assert_eq!(d.control_location.as_deref(), Some("/A[1]/B[1]/text()"));
    }

    #[test]
    fn test_attribute_value_difference() {
        let found = diffs(r#"<A Name="x"/>"#, r#"<A Name="y"/>"#);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DiffKind::AttributeValue);
        assert_eq!(found[0].control_location.as_deref(), Some("/A[1]/@Name"));
    }

    #[test]
    fn test_attribute_missing_on_target() {
        let found = diffs(r#"<A Name="x"/>"#, "<A/>");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DiffKind::ChildLookup);
        assert_eq!(found[0].control_fragment.as_deref(), Some(r#"Name="x""#));
        assert!(found[0].target_fragment.is_none());
    }

    #[test]
    fn test_missing_child_reports_length_and_lookup() {
        let found = diffs("<A><B>x</B></A>", "<A/>");
        let kinds: Vec<DiffKind> = found.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiffKind::ChildListLength, DiffKind::ChildLookup]);
        assert_eq!(found[1].control_fragment.as_deref(), Some("<B>x</B>"));
    }

    #[test]
    fn test_extra_target_child() {
        let found = diffs("<A/>", "<A><B>x</B></A>");
        let kinds: Vec<DiffKind> = found.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiffKind::ChildListLength, DiffKind::ChildLookup]);
        assert_eq!(found[1].target_location.as_deref(), Some("/A[1]/B[1]"));
    }

    #[test]
    fn test_reordered_children_report_sequence_only() {
        let found = diffs("<A><B>x</B><C>y</C></A>", "<A><C>y</C><B>x</B></A>");
        let kinds: Vec<DiffKind> = found.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiffKind::ChildSequence, DiffKind::ChildSequence]);
    }

    #[test]
    fn test_same_name_siblings_pair_by_occurrence() {
        let found = diffs(
            "<Deal><Leg>a</Leg><Leg>b</Leg></Deal>",
            "<Deal><Leg>a</Leg><Leg>c</Leg></Deal>",
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DiffKind::TextValue);
        assert_eq!(found[0].control_location.as_deref(), Some("/Deal[1]/Leg[2]/text()"));
    }

    #[test]
    fn test_nested_differences_in_document_order() {
        let found = diffs(
            r#"<Deal Id="1"><Leg><Rate>1</Rate></Leg></Deal>"#,
            r#"<Deal Id="2"><Leg><Rate>9</Rate></Leg></Deal>"#,
        );
        let kinds: Vec<DiffKind> = found.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiffKind::AttributeValue, DiffKind::TextValue]);
        assert_eq!(
            found[1].control_location.as_deref(),
            Some("/Deal[1]/Leg[1]/Rate[1]/text()")
        );
    }

    #[test]
    fn test_root_name_mismatch_stops_descent() {
        let found = diffs("<A><B>x</B></A>", "<Z><B>y</B></Z>");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DiffKind::ElementName);
    }

    #[test]
    fn test_default_description() {
        let d = RawDifference {
            kind: DiffKind::AttributeValue,
            control_location: Some("/A[1]/@Name".to_string()),
            target_location: Some("/A[1]/@Name".to_string()),
            control_fragment: Some("x".to_string()),
            target_fragment: Some("y".to_string()),
        };
        assert_eq!(
            d.to_string(),
            "attribute value: expected 'x' but was 'y' at /A[1]/@Name"
        );
    }
}
