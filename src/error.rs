//! Error types for reconciliation operations.

use std::fmt;

use thiserror::Error;

/// Which side of a comparison pair a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Control,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Control => write!(f, "control"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// Errors that can occur while fetching, altering, or comparing documents.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    #[error("Malformed selector: {0}")]
    MalformedSelector(String),

    /// A document could not be fetched for the given record. Recoverable at
    /// the batch boundary: the record is reported and processing continues.
    #[error("No {side} document for '{id}'")]
    SourceUnavailable { id: String, side: Side },

    /// An alteration produced a non-well-formed document. Fatal to that
    /// record's processing only.
    #[error("Alteration '{description}' failed for '{id}': {cause}")]
    AlterationFailed {
        id: String,
        description: String,
        #[source]
        cause: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
