//! cidtext-parse: PDF object graph reader and content stream interpreter.
//!
//! Reads a PDF byte buffer into an immutable [`ObjectGraph`], walks the
//! page tree into [`Page`]s with inherited attributes, resolves each page's
//! fonts and ToUnicode CMaps, and interprets content streams into
//! [`TextRun`](cidtext_core::TextRun)s. Depends on cidtext-core for the
//! shared data types.

pub mod cmap;
pub mod content;
pub mod document;
pub mod error;
pub mod filters;
pub mod font;
pub mod handler;
pub mod interpreter;
pub mod interpreter_state;
pub mod lexer;
pub mod object;
pub mod page_tree;
pub mod parser;
pub mod text_state;

#[cfg(test)]
mod test_util;

pub use cidtext_core;
pub use cmap::{CidCMap, Codespace, ToUnicodeCMap};
pub use content::{Operation, TextElement, parse_operations};
pub use document::ObjectGraph;
pub use error::BackendError;
pub use font::{FontKind, FontTable, PageFont, resolve_fonts};
pub use handler::{ContentHandler, RunCollector};
pub use interpreter::{interpret_page, page_content, run};
pub use object::{Dictionary, ObjectRef, PdfStream, PdfValue};
pub use page_tree::{Page, collect_pages};
