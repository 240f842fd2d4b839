//! The alteration pipeline: scoped, ordered document rewriting.
//!
//! A pipeline holds three ordered alteration lists — joint (applied to both
//! sides), control-only, and target-only — and applies them to each fetched
//! document pair: joint alterations first, in registration order, then the
//! side's own list. Processed pairs accumulate in index-aligned result lists
//! across calls.

use crate::alter::Alteration;
use crate::dom::Document;
use crate::error::{Error, Result};
use crate::source::DocumentSource;

/// Applies registered alterations to control/target document pairs and
/// accumulates the results.
#[derive(Debug, Default)]
pub struct AlterationPipeline {
    joint: Vec<Alteration>,
    control_only: Vec<Alteration>,
    target_only: Vec<Alteration>,
    control_results: Vec<Document>,
    target_results: Vec<Document>,
}

impl AlterationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an alteration applied to both sides.
    pub fn with_joint(mut self, alteration: Alteration) -> Self {
        self.joint.push(alteration);
        self
    }

    /// Register an alteration applied to the control document only.
    pub fn with_control(mut self, alteration: Alteration) -> Self {
        self.control_only.push(alteration);
        self
    }

    /// Register an alteration applied to the target document only.
    pub fn with_target(mut self, alteration: Alteration) -> Self {
        self.target_only.push(alteration);
        self
    }

    /// All registered alterations: joint, then control-only, then
    /// target-only, each in registration order.
    pub fn alterations(&self) -> impl Iterator<Item = &Alteration> {
        self.joint
            .iter()
            .chain(self.control_only.iter())
            .chain(self.target_only.iter())
    }

    /// Fetch the pair for `id`, apply the alterations to each side, and
    /// append the processed documents to the accumulated result lists.
    /// Returns the index of the appended pair.
    ///
    /// A fetch failure propagates immediately with nothing appended. An
    /// alteration failure surfaces as [`Error::AlterationFailed`] and leaves
    /// results accumulated for earlier identifiers intact.
    pub fn process<S: DocumentSource>(&mut self, source: &S, id: &str) -> Result<usize> {
        let (control, target) = source.fetch(id)?;
        let control = apply_chain(control, self.joint.iter().chain(&self.control_only), id)?;
        let target = apply_chain(target, self.joint.iter().chain(&self.target_only), id)?;
        self.control_results.push(control);
        self.target_results.push(target);
        Ok(self.control_results.len() - 1)
    }

    /// The processed pair at the given index, if present.
    pub fn pair(&self, index: usize) -> Option<(&Document, &Document)> {
        Some((self.control_results.get(index)?, self.target_results.get(index)?))
    }

    /// Processed control documents, in processing order.
    pub fn control_documents(&self) -> &[Document] {
        &self.control_results
    }

    /// Processed target documents, in processing order.
    pub fn target_documents(&self) -> &[Document] {
        &self.target_results
    }
}

fn apply_chain<'a, I>(mut doc: Document, alterations: I, id: &str) -> Result<Document>
where
    I: Iterator<Item = &'a Alteration>,
{
    for alteration in alterations {
        doc = alteration.apply(doc).map_err(|e| Error::AlterationFailed {
            id: id.to_string(),
            description: alteration.describe(),
            cause: Box::new(e),
        })?;
    }
    Ok(doc)
}
