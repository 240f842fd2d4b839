//! Batch-wide difference counting and the hierarchical path rollup.
//!
//! The aggregator is a plain value owned by the batch loop — no process-wide
//! state — so independent batches count independently. Count tables are
//! linear-scan vectors keeping first-seen order, which the report relies on
//! for deterministic output; batch sizes are small enough that lookup cost is
//! irrelevant next to the XML work.

use crate::classify::NormalizedDifference;
use crate::error::Side;

/// A cataloged, accepted kind of divergence, tracked by count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownDifference {
    pub difference: String,
    pub reason: String,
    pub count: u64,
}

impl KnownDifference {
    pub fn new(difference: &str, reason: &str) -> Self {
        KnownDifference {
            difference: difference.to_string(),
            reason: reason.to_string(),
            count: 0,
        }
    }
}

/// An unknown difference and how often it occurred across the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifferenceCount {
    pub difference: String,
    pub count: u64,
}

/// One rollup entry: a predicate-stripped path prefix and its count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCount {
    pub path: String,
    pub count: u64,
}

/// One recorded difference on a record, with its classification.
#[derive(Debug, Clone)]
pub struct RecordDetail {
    pub difference: NormalizedDifference,
    pub known: bool,
}

/// Everything observed for a single record identifier.
#[derive(Debug, Clone)]
pub struct RecordSummary {
    pub id: String,
    pub details: Vec<RecordDetail>,
    pub missing_control: bool,
    pub missing_target: bool,
}

/// Running known/unknown counts and per-record detail for one batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    known: Vec<KnownDifference>,
    unknown: Vec<DifferenceCount>,
    records: Vec<RecordSummary>,
}

impl BatchSummary {
    /// Start a batch with the supplied known-difference catalog. The catalog
    /// key-set never changes; only counts do.
    pub fn new(catalog: Vec<KnownDifference>) -> Self {
        BatchSummary {
            known: catalog,
            unknown: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Open a record entry; returns its index for subsequent calls.
    pub fn open_record(&mut self, id: &str) -> usize {
        self.records.push(RecordSummary {
            id: id.to_string(),
            details: Vec::new(),
            missing_control: false,
            missing_target: false,
        });
        self.records.len() - 1
    }

    /// Classify and count one normalized difference against the catalog, and
    /// attach it to the record's detail.
    pub fn record(&mut self, record: usize, difference: NormalizedDifference) {
        let known = match self.known.iter_mut().find(|k| k.difference == difference.key) {
            Some(entry) => {
                entry.count += 1;
                true
            }
            None => {
                match self.unknown.iter_mut().find(|u| u.difference == difference.key) {
                    Some(entry) => entry.count += 1,
                    None => self.unknown.push(DifferenceCount {
                        difference: difference.key.clone(),
                        count: 1,
                    }),
                }
                false
            }
        };
        if let Some(entry) = self.records.get_mut(record) {
            entry.details.push(RecordDetail { difference, known });
        }
    }

    /// Record that one side produced no document for this record.
    pub fn record_missing(&mut self, record: usize, side: Side) {
        let message = format!("Cannot compare - no {side} document");
        self.record(record, NormalizedDifference::message(&message));
        if let Some(entry) = self.records.get_mut(record) {
            match side {
                Side::Control => entry.missing_control = true,
                Side::Target => entry.missing_target = true,
            }
        }
    }

    pub fn known(&self) -> &[KnownDifference] {
        &self.known
    }

    pub fn unknown(&self) -> &[DifferenceCount] {
        &self.unknown
    }

    pub fn records(&self) -> &[RecordSummary] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Total occurrences of unknown differences.
    pub fn unknown_total(&self) -> u64 {
        self.unknown.iter().map(|u| u.count).sum()
    }

    /// Total occurrences of cataloged differences.
    pub fn known_total(&self) -> u64 {
        self.known.iter().map(|k| k.count).sum()
    }

    /// Hierarchical rollup of unknown differences by structural path prefix.
    /// Prefers the control-side location, falls back to target-side, skips
    /// differences with neither.
    pub fn path_rollup(&self) -> Vec<PathCount> {
        let paths = self
            .records
            .iter()
            .flat_map(|r| r.details.iter())
            .filter(|d| !d.known)
            .filter_map(|d| {
                d.difference
                    .control_location
                    .as_deref()
                    .or(d.difference.target_location.as_deref())
            });
        count_paths(paths)
    }
}

/// Count every path and each of its truncated prefixes.
///
/// Each path is first stripped of bracketed predicates and residual
/// digit/hyphen characters, so positional variants (`/Deal/Leg[2]/Rate`,
/// `/Deal/Leg[5]/Rate`) collapse into one structural path; it then
/// contributes one count at every prefix produced by repeatedly cutting at
/// the last `/` until nothing remains.
pub fn count_paths<I, S>(paths: I) -> Vec<PathCount>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: Vec<PathCount> = Vec::new();
    for path in paths {
        let mut current = strip_predicates(path.as_ref());
        while !current.is_empty() {
            match counts.iter_mut().find(|p| p.path == current) {
                Some(entry) => entry.count += 1,
                None => counts.push(PathCount {
                    path: current.clone(),
                    count: 1,
                }),
            }
            current = match current.rfind('/') {
                Some(i) => current[..i].to_string(),
                None => String::new(),
            };
        }
    }
    counts
}

/// Drop `[...]` predicate expressions and any remaining digits or hyphens.
fn strip_predicates(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut depth = 0usize;
    for ch in path.chars() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            c if c.is_ascii_digit() || c == '-' => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn counts_map(counts: &[PathCount]) -> Vec<(&str, u64)> {
        counts.iter().map(|p| (p.path.as_str(), p.count)).collect()
    }

    #[test]
    fn test_single_path_counts_every_prefix() {
        let counts = count_paths(["/A/B/C"]);
        assert_eq!(
            counts_map(&counts),
            vec![("/A/B/C", 1), ("/A/B", 1), ("/A", 1)]
        );
    }

    #[test]
    fn test_predicates_merge_positional_variants() {
        let counts = count_paths(["/A/B[2]/C", "/A/B[5]/C"]);
        assert_eq!(
            counts_map(&counts),
            vec![("/A/B/C", 2), ("/A/B", 2), ("/A", 2)]
        );
    }

    #[test]
    fn test_attribute_predicates_are_stripped_whole() {
        let counts = count_paths(["/A/B[@Name='x']/C"]);
        assert_eq!(
            counts_map(&counts),
            vec![("/A/B/C", 1), ("/A/B", 1), ("/A", 1)]
        );
    }

    #[test]
    fn test_path_without_separator_contributes_itself() {
        let counts = count_paths(["Standalone"]);
        assert_eq!(counts_map(&counts), vec![("Standalone", 1)]);
    }

    #[test]
    fn test_empty_path_contributes_nothing() {
        assert!(count_paths([""]).is_empty());
        assert!(count_paths(["[1]"]).is_empty());
    }

    #[test]
    fn test_shared_prefixes_accumulate() {
        let counts = count_paths(["/Deal/Legs/Leg[1]", "/Deal/Legs/Leg[2]", "/Deal/Id"]);
        assert_eq!(
            counts_map(&counts),
            vec![
                ("/Deal/Legs/Leg", 2),
                ("/Deal/Legs", 2),
                ("/Deal", 3),
                ("/Deal/Id", 1),
            ]
        );
    }

    #[test]
    fn test_known_difference_increments_catalog_only() {
        let catalog = vec![KnownDifference::new("CONTROL x || TARGET: y", "timezones")];
        let mut summary = BatchSummary::new(catalog);
        let record = summary.open_record("r1");
        summary.record(
            record,
            NormalizedDifference {
                key: "CONTROL x || TARGET: y".to_string(),
                control_location: Some("/A[1]/B[1]".to_string()),
                target_location: None,
            },
        );
        assert_eq!(summary.known()[0].count, 1);
        assert!(summary.unknown().is_empty());
        assert!(summary.records()[0].details[0].known);
    }

    #[test]
    fn test_unknown_difference_counts_up() {
        let mut summary = BatchSummary::new(Vec::new());
        let record = summary.open_record("r1");
        let diff = NormalizedDifference {
            key: "CONTROL a || TARGET: b".to_string(),
            control_location: None,
            target_location: None,
        };
        summary.record(record, diff.clone());
        summary.record(record, diff);
        assert_eq!(summary.unknown().len(), 1);
        assert_eq!(summary.unknown()[0].count, 2);
        assert_eq!(summary.unknown_total(), 2);
    }

    #[test]
    fn test_rollup_skips_known_differences() {
        let catalog = vec![KnownDifference::new("known", "accepted")];
        let mut summary = BatchSummary::new(catalog);
        let record = summary.open_record("r1");
        summary.record(
            record,
            NormalizedDifference {
                key: "known".to_string(),
                control_location: Some("/A/B".to_string()),
                target_location: None,
            },
        );
        summary.record(
            record,
            NormalizedDifference {
                key: "unknown".to_string(),
                control_location: Some("/A/C".to_string()),
                target_location: None,
            },
        );
        assert_eq!(
            counts_map(&summary.path_rollup()),
            vec![("/A/C", 1), ("/A", 1)]
        );
    }

    #[test]
    fn test_rollup_falls_back_to_target_location() {
        let mut summary = BatchSummary::new(Vec::new());
        let record = summary.open_record("r1");
        summary.record(
            record,
            NormalizedDifference {
                key: "only target".to_string(),
                control_location: None,
                target_location: Some("/A/B".to_string()),
            },
        );
        summary.record(record, NormalizedDifference::message("no location at all"));
        assert_eq!(
            counts_map(&summary.path_rollup()),
            vec![("/A/B", 1), ("/A", 1)]
        );
    }

    #[test]
    fn test_record_missing_target() {
        let mut summary = BatchSummary::new(Vec::new());
        let record = summary.open_record("r1");
        summary.record_missing(record, Side::Target);
        assert!(summary.records()[0].missing_target);
        assert!(!summary.records()[0].missing_control);
        assert_eq!(
            summary.unknown()[0].difference,
            "Cannot compare - no target document"
        );
    }

    proptest! {
        #[test]
        fn prop_rollup_of_one_simple_path_has_one_entry_per_segment(
            segments in prop::collection::vec("[A-Za-z]{1,8}", 1..6)
        ) {
            let path = format!("/{}", segments.join("/"));
            let counts = count_paths([path.as_str()]);
            prop_assert_eq!(counts.len(), segments.len());
            prop_assert!(counts.iter().all(|p| p.count == 1));
        }

        #[test]
        fn prop_strip_predicates_is_idempotent(path in "[A-Za-z0-9/@\\[\\]'=-]{0,40}") {
            let once = strip_predicates(&path);
            let twice = strip_predicates(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
