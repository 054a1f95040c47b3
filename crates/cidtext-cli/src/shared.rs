use std::io::{self, IsTerminal, Write};
use std::path::Path;

use cidtext::{Document, ExtractWarning};

use crate::page_range::parse_page_range;

/// Open a PDF file with user-friendly error messages.
///
/// Returns `Err(1)` with a message printed to stderr if the file is not found
/// or its object graph cannot be read.
pub fn open_document(file: &Path) -> Result<Document, i32> {
    if !file.exists() {
        eprintln!("Error: file not found: {}", file.display());
        return Err(1);
    }

    Document::open_file(file, None).map_err(|e| {
        eprintln!("Error: failed to open PDF: {e}");
        1
    })
}

/// Resolve an optional page range string into 0-indexed page indices.
///
/// If `pages` is `None`, returns all pages (0..page_count).
pub fn resolve_pages(pages: Option<&str>, page_count: usize) -> Result<Vec<usize>, i32> {
    match pages {
        Some(range) => parse_page_range(range, page_count).map_err(|e| {
            eprintln!("Error: {e}");
            1
        }),
        None => Ok((0..page_count).collect()),
    }
}

/// Print warnings to stderr, one per line.
pub fn report_warnings(warnings: &[ExtractWarning]) {
    for warning in warnings {
        eprintln!("Warning: {warning}");
    }
}

/// Serialize one output record as a single JSON line.
pub fn print_json_line(value: &serde_json::Value) -> Result<(), i32> {
    let line = serde_json::to_string(value).map_err(|e| {
        eprintln!("Error: failed to serialize JSON: {e}");
        1
    })?;
    println!("{line}");
    Ok(())
}

/// A progress reporter that prints "Processing page N/M..." to stderr,
/// but only when stderr is connected to a TTY (terminal).
pub struct ProgressReporter {
    total: usize,
    is_tty: bool,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            is_tty: io::stderr().is_terminal(),
        }
    }

    /// Report progress for page `current` (1-indexed).
    pub fn report(&self, current: usize) {
        if self.is_tty {
            eprint!("\rProcessing page {}/{}...", current, self.total);
            let _ = io::stderr().flush();
        }
    }

    /// Clear the progress line (if TTY).
    pub fn finish(&self) {
        if self.is_tty {
            eprint!("\r{}\r", " ".repeat(40));
            let _ = io::stderr().flush();
        }
    }
}
