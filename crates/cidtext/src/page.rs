//! Page type for accessing the text extracted from one PDF page.

use cidtext_core::{
    BBox, ExtractWarning, PageText, TextOptions, TextRun, assemble_page, clip_to_page,
};

/// A single interpreted page.
///
/// Holds the page's text runs in emission order together with the warnings
/// raised while resolving its fonts and interpreting its content.
/// Constructed by [`Document::page`](crate::Document::page).
#[derive(Debug, Clone)]
pub struct Page {
    /// Page index (0-based).
    index: usize,
    /// CropBox, or MediaBox when there is no CropBox.
    visible_box: Option<BBox>,
    /// Rotation in degrees (0, 90, 180 or 270).
    rotate: i64,
    runs: Vec<TextRun>,
    warnings: Vec<ExtractWarning>,
}

impl Page {
    pub fn new(
        index: usize,
        visible_box: Option<BBox>,
        rotate: i64,
        runs: Vec<TextRun>,
        warnings: Vec<ExtractWarning>,
    ) -> Self {
        Self {
            index,
            visible_box,
            rotate,
            runs,
            warnings,
        }
    }

    /// Returns the page index (0-based).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn visible_box(&self) -> Option<BBox> {
        self.visible_box
    }

    /// Inherited `/Rotate` in degrees, normalized to `0..360`.
    ///
    /// Informational only: runs, lines and clipping all use unrotated user
    /// space coordinates.
    pub fn rotate(&self) -> i64 {
        self.rotate
    }

    /// Text runs in the order the content stream showed them.
    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    pub fn warnings(&self) -> &[ExtractWarning] {
        &self.warnings
    }

    /// Reading-order lines, top to bottom.
    ///
    /// With [`TextOptions::clip_to_page`], runs whose origin lies outside the
    /// visible box are dropped first.
    pub fn extract_lines(&self, options: &TextOptions) -> Vec<String> {
        match (options.clip_to_page, self.visible_box) {
            (true, Some(visible)) => {
                let clipped = clip_to_page(self.runs.clone(), &visible);
                assemble_page(self.index, &clipped, options)
            }
            _ => assemble_page(self.index, &self.runs, options),
        }
    }

    /// Lines joined with `\n`.
    pub fn extract_text(&self, options: &TextOptions) -> String {
        self.extract_lines(options).join("\n")
    }

    /// The page's lines and warnings as a [`PageText`].
    pub fn to_page_text(&self, options: &TextOptions) -> PageText {
        PageText {
            index: self.index,
            lines: self.extract_lines(options),
            warnings: self.warnings.clone(),
        }
    }
}
