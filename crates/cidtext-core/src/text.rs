use crate::error::ExtractWarning;

/// A piece of decoded text shown by one `Tj`, `'`, `"` or `TJ` operator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextRun {
    /// Decoded Unicode text.
    pub text: String,
    /// Origin x in user space (text matrix translation mapped through the CTM).
    pub x: f64,
    /// Origin y in user space.
    pub y: f64,
    /// Font resource name active when the text was shown (e.g. `C2_0`).
    pub font_name: String,
    /// Effective font size: `Tf` size scaled by the text rendering matrix.
    pub font_size: f64,
    /// 0-based index of the page the run belongs to.
    pub page_index: usize,
}

/// Reading-order text of one page.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageText {
    /// 0-based page index.
    pub index: usize,
    /// Lines from top to bottom.
    pub lines: Vec<String>,
    /// Non-fatal issues found while extracting this page.
    pub warnings: Vec<ExtractWarning>,
}

impl PageText {
    pub fn new(index: usize, lines: Vec<String>) -> Self {
        Self {
            index,
            lines,
            warnings: Vec::new(),
        }
    }

    /// Lines joined with a single newline.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
