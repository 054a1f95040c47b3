//! cidtext-core: Backend-independent data types and algorithms.
//!
//! This crate provides the error and warning types, extraction options,
//! matrix geometry, the [`TextRun`] and [`PageText`] records, and the text
//! assembler that orders runs into reading-order lines. It depends on no
//! PDF parsing code; `serde` support is optional.

pub mod error;
pub mod geometry;
pub mod layout;
pub mod text;

pub use error::{ExtractOptions, ExtractResult, ExtractWarning, ExtractWarningCode, PdfError};
pub use geometry::{BBox, Ctm, Point};
pub use layout::{
    RunLine, TextOptions, assemble, assemble_page, clip_to_page, cluster_runs_into_lines,
    runs_to_text,
};
pub use text::{PageText, TextRun};
