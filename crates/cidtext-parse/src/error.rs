//! Error types for the parsing and interpreter layers.
//!
//! Uses [`thiserror`] for ergonomic error derivation. Provides [`BackendError`]
//! and its conversion to [`PdfError`].

use cidtext_core::PdfError;
use thiserror::Error;

use crate::object::ObjectRef;

/// Error type for object graph, page tree and interpreter operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// Bytes that cannot form a token (unterminated string, stray delimiter, bad hex digit).
    #[error("malformed token at offset {offset}: {reason}")]
    MalformedToken { offset: usize, reason: String },

    /// A reference to an object the graph does not contain.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(ObjectRef),

    /// Reference resolution exceeded the configured hop limit.
    #[error("reference cycle starting at {0}")]
    ReferenceCycle(ObjectRef),

    /// A page tree node was reached twice.
    #[error("cyclic page tree at {0}")]
    CyclicPageTree(ObjectRef),

    /// A stream filter outside the supported set.
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// A supported filter failed on its input.
    #[error("decode error: {0}")]
    Decode(String),

    /// Error from PDF parsing (structure, syntax, object layout).
    #[error("PDF parse error: {0}")]
    Parse(String),

    /// Error during content stream interpretation.
    #[error("interpreter error: {0}")]
    Interpreter(String),

    /// A core library error.
    #[error(transparent)]
    Core(#[from] PdfError),
}

impl From<BackendError> for PdfError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::MalformedToken { offset, reason } => {
                PdfError::MalformedToken { offset, reason }
            }
            BackendError::UnresolvedReference(r) => PdfError::UnresolvedReference {
                id: r.id,
                generation: r.generation,
            },
            BackendError::ReferenceCycle(r) => PdfError::ReferenceCycle {
                id: r.id,
                generation: r.generation,
            },
            BackendError::CyclicPageTree(r) => PdfError::CyclicPageTree {
                id: r.id,
                generation: r.generation,
            },
            BackendError::UnsupportedFilter(name) => PdfError::UnsupportedFilter(name),
            BackendError::Decode(msg) | BackendError::Parse(msg) => PdfError::ParseError(msg),
            BackendError::Interpreter(msg) => PdfError::InterpreterError(msg),
            BackendError::Core(e) => e,
        }
    }
}
