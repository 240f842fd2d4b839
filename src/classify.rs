//! Difference suppression and normalization.
//!
//! Raw differences from the engine pass through here before counting. Two
//! whole kinds are dropped as structural noise (child-list length and child
//! sequence — the alteration pipeline is expected to have normalized genuine
//! ordering problems away already), as are differences whose fragments match
//! ignoring case: the upstream systems are known to disagree only in casing
//! in benign cases. What survives is keyed as a single report-ready string.

use crate::diff::{DiffKind, RawDifference};

/// A difference reduced to its comparable string key, with both locations
/// carried through for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDifference {
    pub key: String,
    pub control_location: Option<String>,
    pub target_location: Option<String>,
}

impl NormalizedDifference {
    /// A synthetic difference with no location, for conditions that are not
    /// node-level differences (missing documents, failed alterations).
    pub fn message(text: &str) -> Self {
        NormalizedDifference {
            key: flatten_commas(text),
            control_location: None,
            target_location: None,
        }
    }
}

/// Evaluate one raw difference. `None` means suppressed: the difference is
/// structurally uninteresting and must not be counted anywhere.
pub fn normalize(diff: &RawDifference) -> Option<NormalizedDifference> {
    if matches!(diff.kind, DiffKind::ChildListLength | DiffKind::ChildSequence) {
        return None;
    }

    if let (Some(control), Some(target)) = (&diff.control_fragment, &diff.target_fragment) {
        if control.eq_ignore_ascii_case(target) {
            return None;
        }
    }

    let text = match diff.kind {
        DiffKind::TextValue | DiffKind::ChildLookup => format!(
            "CONTROL {} || TARGET: {}",
            diff.control_fragment.as_deref().unwrap_or_default(),
            diff.target_fragment.as_deref().unwrap_or_default(),
        ),
        _ => diff.to_string(),
    };

    let key = flatten_commas(&text);
    if key.is_empty() {
        return None;
    }

    Some(NormalizedDifference {
        key,
        control_location: diff.control_location.clone(),
        target_location: diff.target_location.clone(),
    })
}

/// The report is comma-delimited; a literal comma in a difference would shift
/// its columns. Deliberately lossy, not a CSV-escaping scheme.
fn flatten_commas(text: &str) -> String {
    text.replace(',', " comma ")
}
