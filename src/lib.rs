//! # xmlrecon
//!
//! Reconciles pairs of XML documents — a "control" and a "target" version of
//! the same logical record produced by two upstream systems — so that known,
//! expected divergences can be filtered out and only genuinely unexpected
//! differences are surfaced for review.
//!
//! ## Features
//!
//! - Alteration pipeline: scoped (joint / control-only / target-only)
//!   document rewriting before comparison — structural removal by selector,
//!   literal text substitution, alphabetical sibling reordering
//! - Structural diffing behind a swappable [`DiffEngine`] seam, with a
//!   built-in tree differ
//! - Difference classification against a known-difference catalog, with
//!   noise suppression and case-insensitive value matching
//! - Hierarchical rollup of unknown differences by structural path prefix
//! - Comma-delimited batch report
//!
//! ## Quick Start
//!
//! ```no_run
//! use xmlrecon::{
//!     Alteration, AlterationPipeline, DirPairSource, Reconciler, ReportInputs, TreeDiff,
//!     write_report,
//! };
//!
//! let pipeline = AlterationPipeline::new()
//!     .with_joint(Alteration::remove("//GenerationTimestamp")?)
//!     .with_joint(Alteration::replace_with_note("RH1", "RH2", "system rename"));
//!
//! let source = DirPairSource::new("control-messages", "target-messages");
//! let mut reconciler = Reconciler::new(source, TreeDiff, pipeline);
//! let summary = reconciler.run(["deal-1001", "deal-1002"], Vec::new())?;
//!
//! let mut report = Vec::new();
//! write_report(&mut report, &summary, &ReportInputs::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aggregate;
pub mod alter;
pub mod batch;
pub mod classify;
pub mod diff;
pub mod dom;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod selector;
pub mod source;

pub use aggregate::{
    BatchSummary, DifferenceCount, KnownDifference, PathCount, RecordDetail, RecordSummary,
    count_paths,
};
pub use alter::Alteration;
pub use batch::Reconciler;
pub use classify::{NormalizedDifference, normalize};
pub use diff::{DiffEngine, DiffKind, RawDifference, TreeDiff};
pub use dom::{Attribute, Document, Element, XmlNode};
pub use error::{Error, Result, Side};
pub use pipeline::AlterationPipeline;
pub use report::{ReportInputs, write_report};
pub use selector::Selector;
pub use source::{DirPairSource, DocumentSource};
