//! The batch runner: fetch, alter, diff, classify, aggregate.
//!
//! One record is fully processed before the next begins. Per-record failures
//! (a missing document, an alteration that broke well-formedness) are
//! recorded in the summary and processing continues; configuration-level
//! failures propagate and abort the run.

use crate::aggregate::{BatchSummary, KnownDifference};
use crate::classify::{self, NormalizedDifference};
use crate::diff::DiffEngine;
use crate::error::{Error, Result};
use crate::pipeline::AlterationPipeline;
use crate::source::DocumentSource;

/// Drives the reconciliation loop over a batch of record identifiers.
pub struct Reconciler<S, D> {
    source: S,
    engine: D,
    pipeline: AlterationPipeline,
}

impl<S: DocumentSource, D: DiffEngine> Reconciler<S, D> {
    pub fn new(source: S, engine: D, pipeline: AlterationPipeline) -> Self {
        Reconciler {
            source,
            engine,
            pipeline,
        }
    }

    /// The pipeline, with its accumulated processed documents.
    pub fn pipeline(&self) -> &AlterationPipeline {
        &self.pipeline
    }

    /// Process every identifier and return the finished summary.
    ///
    /// The catalog seeds the known-difference table. Identifiers whose
    /// documents cannot be fetched or altered are recorded and skipped;
    /// anything else is an error of the run itself.
    pub fn run<'a, I>(&mut self, ids: I, catalog: Vec<KnownDifference>) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut summary = BatchSummary::new(catalog);
        for id in ids {
            let record = summary.open_record(id);
            match self.pipeline.process(&self.source, id) {
                Ok(index) => {
                    let Some((control, target)) = self.pipeline.pair(index) else {
                        continue;
                    };
                    for raw in self.engine.compare(control, target) {
                        if let Some(normalized) = classify::normalize(&raw) {
                            summary.record(record, normalized);
                        }
                    }
                }
                Err(Error::SourceUnavailable { side, .. }) => {
                    summary.record_missing(record, side);
                }
                Err(Error::AlterationFailed {
                    description, cause, ..
                }) => {
                    let message =
                        format!("Cannot compare - alteration '{description}' failed: {cause}");
                    summary.record(record, NormalizedDifference::message(&message));
                }
                Err(other) => return Err(other),
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::alter::Alteration;
    use crate::diff::TreeDiff;
    use crate::dom::Document;
    use crate::error::Side;

    struct MapSource {
        docs: HashMap<String, (Option<String>, Option<String>)>,
    }

    impl MapSource {
        fn new(entries: &[(&str, Option<&str>, Option<&str>)]) -> Self {
            let docs = entries
                .iter()
                .map(|(id, c, t)| {
                    (
                        id.to_string(),
                        (c.map(str::to_string), t.map(str::to_string)),
                    )
                })
                .collect();
            MapSource { docs }
        }
    }

    impl DocumentSource for MapSource {
        fn fetch(&self, id: &str) -> Result<(Document, Document)> {
            let missing = |side| Error::SourceUnavailable {
                id: id.to_string(),
                side,
            };
            let (c, t) = self.docs.get(id).ok_or_else(|| missing(Side::Control))?;
            let c = c.as_deref().ok_or_else(|| missing(Side::Control))?;
            let t = t.as_deref().ok_or_else(|| missing(Side::Target))?;
            Ok((Document::parse(c)?, Document::parse(t)?))
        }
    }

    #[test]
    fn test_clean_batch_has_no_differences() {
        let xml = "<Deal><Id>1</Id></Deal>";
        let source = MapSource::new(&[("r1", Some(xml), Some(xml))]);
        let mut reconciler = Reconciler::new(source, TreeDiff, AlterationPipeline::new());
        let summary = reconciler.run(["r1"], Vec::new()).unwrap();
        assert_eq!(summary.record_count(), 1);
        assert_eq!(summary.unknown_total(), 0);
    }

    #[test]
    fn test_unknown_difference_is_counted() {
        let source = MapSource::new(&[(
            "r1",
            Some("<Deal><Rate>1.5</Rate></Deal>"),
            Some("<Deal><Rate>2.5</Rate></Deal>"),
        )]);
        let mut reconciler = Reconciler::new(source, TreeDiff, AlterationPipeline::new());
        let summary = reconciler.run(["r1"], Vec::new()).unwrap();
        assert_eq!(summary.unknown().len(), 1);
        assert_eq!(summary.unknown()[0].difference, "CONTROL 1.5 || TARGET: 2.5");
    }

    #[test]
    fn test_known_difference_matches_catalog() {
        let source = MapSource::new(&[(
            "r1",
            Some("<Deal><Rate>1.5</Rate></Deal>"),
            Some("<Deal><Rate>2.5</Rate></Deal>"),
        )]);
        let catalog = vec![KnownDifference::new(
            "CONTROL 1.5 || TARGET: 2.5",
            "rate source changed",
        )];
        let mut reconciler = Reconciler::new(source, TreeDiff, AlterationPipeline::new());
        let summary = reconciler.run(["r1"], catalog).unwrap();
        assert_eq!(summary.known()[0].count, 1);
        assert!(summary.unknown().is_empty());
    }

    #[test]
    fn test_joint_removal_suppresses_expected_difference() {
        let source = MapSource::new(&[(
            "r1",
            Some("<Deal><Stamp>111</Stamp><Id>1</Id></Deal>"),
            Some("<Deal><Stamp>222</Stamp><Id>1</Id></Deal>"),
        )]);
        let pipeline =
            AlterationPipeline::new().with_joint(Alteration::remove("//Stamp").unwrap());
        let mut reconciler = Reconciler::new(source, TreeDiff, pipeline);
        let summary = reconciler.run(["r1"], Vec::new()).unwrap();
        assert_eq!(summary.unknown_total(), 0);
    }

    #[test]
    fn test_missing_target_recorded_and_batch_continues() {
        let xml = "<Deal><Id>1</Id></Deal>";
        let source = MapSource::new(&[
            ("r1", Some(xml), None),
            ("r2", Some(xml), Some(xml)),
        ]);
        let mut reconciler = Reconciler::new(source, TreeDiff, AlterationPipeline::new());
        let summary = reconciler.run(["r1", "r2"], Vec::new()).unwrap();
        assert_eq!(summary.record_count(), 2);
        assert!(summary.records()[0].missing_target);
        assert!(!summary.records()[1].missing_target);
        assert_eq!(
            summary.unknown()[0].difference,
            "Cannot compare - no target document"
        );
    }

    #[test]
    fn test_alteration_failure_recorded_and_batch_continues() {
        let xml = "<Deal><Id>1</Id></Deal>";
        let source = MapSource::new(&[
            ("r1", Some(xml), Some(xml)),
            ("r2", Some("<Deal><Id>2</Id></Deal>"), Some("<Deal><Id>2</Id></Deal>")),
        ]);
        // matches only r1, and breaks its tag balance
        let pipeline =
            AlterationPipeline::new().with_joint(Alteration::replace("<Id>1</Id>", "<Id>1"));
        let mut reconciler = Reconciler::new(source, TreeDiff, pipeline);
        let summary = reconciler.run(["r1", "r2"], Vec::new()).unwrap();
        assert_eq!(summary.record_count(), 2);
        assert!(summary.records()[0].details[0]
            .difference
            .key
            .starts_with("Cannot compare - alteration"));
        assert!(summary.records()[1].details.is_empty());
    }

    #[test]
    fn test_case_only_differences_never_surface() {
        let source = MapSource::new(&[(
            "r1",
            Some("<Deal><Flag>True</Flag></Deal>"),
            Some("<Deal><Flag>TRUE</Flag></Deal>"),
        )]);
        let mut reconciler = Reconciler::new(source, TreeDiff, AlterationPipeline::new());
        let summary = reconciler.run(["r1"], Vec::new()).unwrap();
        assert_eq!(summary.unknown_total(), 0);
        assert_eq!(summary.known_total(), 0);
    }
}
