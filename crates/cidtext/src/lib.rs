//! cidtext: Extract reading-order text from PDFs that use CID fonts.
//!
//! This is the public API facade. It re-exports the cidtext-core types and
//! uses cidtext-parse to read the object graph, resolve fonts and interpret
//! content streams.
//!
//! # Architecture
//!
//! - **cidtext-core**: errors, options, geometry, text runs and the line assembler
//! - **cidtext-parse**: object graph reader, page tree, CMaps and the interpreter
//! - **cidtext** (this crate): [`Document`] and per-page extraction
//!
//! # Example
//!
//! ```ignore
//! let pages = cidtext::extract_text(&bytes, &TextOptions::default())?;
//! for page in pages {
//!     println!("{}", page?.text());
//! }
//! ```

mod document;
mod page;

pub use cidtext_core;
pub use cidtext_core::{
    BBox, Ctm, ExtractOptions, ExtractResult, ExtractWarning, ExtractWarningCode, PageText,
    PdfError, Point, TextOptions, TextRun,
};
pub use cidtext_parse;
pub use document::{Document, PagesIter};
pub use page::Page;

/// Open `bytes` with default [`ExtractOptions`] and extract every page.
///
/// # Errors
///
/// Fails only when the document itself cannot be opened; page failures are
/// returned per page.
pub fn extract_text(
    bytes: &[u8],
    options: &TextOptions,
) -> Result<Vec<Result<PageText, PdfError>>, PdfError> {
    Ok(Document::open(bytes, None)?.extract_pages(options))
}
