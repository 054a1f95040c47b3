//! Top-level PDF document type for opening and extracting text.

use cidtext_core::{ExtractOptions, ExtractWarning, PageText, PdfError, TextOptions, TextRun};
use cidtext_parse::{ContentHandler, ObjectGraph, collect_pages, interpret_page, resolve_fonts};
use tracing::{debug, warn};

use crate::Page;

/// Iterator over the pages of a document, interpreting each on demand.
///
/// Created by [`Document::pages_iter()`].
pub struct PagesIter<'a> {
    doc: &'a Document,
    current: usize,
    count: usize,
}

impl Iterator for PagesIter<'_> {
    type Item = Result<Page, PdfError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.count {
            return None;
        }
        let result = self.doc.page(self.current);
        self.current += 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.current;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PagesIter<'_> {}

/// A PDF document opened for text extraction.
///
/// Opening reads the whole object graph and walks the page tree; failures
/// there fail [`open`](Document::open). Each page is interpreted only when
/// asked for, and a failing page does not affect the others.
///
/// # Example
///
/// ```ignore
/// let doc = Document::open(&bytes, None)?;
/// for page in doc.extract_pages(&TextOptions::default()) {
///     match page {
///         Ok(text) => println!("{}", text.text()),
///         Err(e) => eprintln!("{e}"),
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Document {
    graph: ObjectGraph,
    pages: Vec<cidtext_parse::Page>,
    options: ExtractOptions,
}

/// Collects runs and warnings for one page, tagging warnings with the page.
struct CollectingHandler {
    runs: Vec<TextRun>,
    warnings: Vec<ExtractWarning>,
    page_index: usize,
    collect_warnings: bool,
}

impl CollectingHandler {
    fn new(page_index: usize, collect_warnings: bool) -> Self {
        Self {
            runs: Vec::new(),
            warnings: Vec::new(),
            page_index,
            collect_warnings,
        }
    }
}

impl ContentHandler for CollectingHandler {
    fn on_text_run(&mut self, run: TextRun) {
        self.runs.push(run);
    }

    fn on_warning(&mut self, mut warning: ExtractWarning) {
        if self.collect_warnings {
            if warning.page.is_none() {
                warning = warning.on_page(self.page_index);
            }
            self.warnings.push(warning);
        }
    }
}

impl Document {
    /// Open a PDF document from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::IoError`] if the file cannot be read, otherwise
    /// the same errors as [`Document::open`].
    pub fn open_file(
        path: impl AsRef<std::path::Path>,
        options: Option<ExtractOptions>,
    ) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::open(&bytes, options)
    }

    /// Open a PDF document from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] when the trailer, the cross-reference data or
    /// the page tree cannot be read.
    pub fn open(bytes: &[u8], options: Option<ExtractOptions>) -> Result<Self, PdfError> {
        let options = options.unwrap_or_default();
        let graph = ObjectGraph::load_with_options(bytes, options.clone())?;
        let pages = collect_pages(&graph)?;
        debug!(pages = pages.len(), objects = graph.len(), "document opened");
        Ok(Self {
            graph,
            pages,
            options,
        })
    }

    /// Number of pages in document order.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// The object graph the document was read into.
    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    /// Interpret the page at `index` (0-based).
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] if the index is out of range or the page's
    /// content cannot be decoded or tokenized.
    pub fn page(&self, index: usize) -> Result<Page, PdfError> {
        let leaf = self.pages.get(index).ok_or_else(|| {
            PdfError::Other(format!(
                "page index {index} out of range (document has {} pages)",
                self.pages.len()
            ))
        })?;

        let fonts = resolve_fonts(&self.graph, leaf);
        let mut handler = CollectingHandler::new(index, self.options.collect_warnings);
        for warning in fonts.warnings {
            handler.on_warning(warning);
        }
        interpret_page(&self.graph, leaf, &fonts.value, &mut handler, &self.options)?;

        Ok(Page::new(
            index,
            leaf.visible_box(),
            leaf.rotate,
            handler.runs,
            handler.warnings,
        ))
    }

    /// Iterate over pages, interpreting each as it is yielded.
    pub fn pages_iter(&self) -> PagesIter<'_> {
        PagesIter {
            doc: self,
            current: 0,
            count: self.page_count(),
        }
    }

    /// Runs of one page in emission order.
    pub fn page_runs(&self, index: usize) -> Result<Vec<TextRun>, PdfError> {
        self.page(index).map(|p| p.runs().to_vec())
    }

    /// Reading-order text of one page.
    pub fn extract_page(&self, index: usize, options: &TextOptions) -> Result<PageText, PdfError> {
        self.page(index).map(|p| p.to_page_text(options))
    }

    /// Text of every page in page order. A failing page is reported as its
    /// own `Err` and extraction continues with the next page.
    pub fn extract_pages(&self, options: &TextOptions) -> Vec<Result<PageText, PdfError>> {
        (0..self.page_count())
            .map(|i| self.extract_page_logged(i, options))
            .collect()
    }

    /// [`extract_pages`](Document::extract_pages) on rayon's thread pool.
    /// Results are in page order.
    #[cfg(feature = "parallel")]
    pub fn extract_pages_parallel(
        &self,
        options: &TextOptions,
    ) -> Vec<Result<PageText, PdfError>> {
        use rayon::prelude::*;

        (0..self.page_count())
            .into_par_iter()
            .map(|i| self.extract_page_logged(i, options))
            .collect()
    }

    fn extract_page_logged(
        &self,
        index: usize,
        options: &TextOptions,
    ) -> Result<PageText, PdfError> {
        let result = self.extract_page(index, options);
        if let Err(e) = &result {
            warn!(page = index, error = %e, "page extraction failed");
        }
        result
    }
}
