//! Error and warning types for cidtext.
//!
//! Provides [`PdfError`] for fatal errors that stop processing of a document
//! or a page, [`ExtractWarning`] for non-fatal issues that allow best-effort
//! continuation, [`ExtractResult`] for pairing a value with collected warnings,
//! and [`ExtractOptions`] for configuring resource limits and warning behavior.

use std::fmt;

/// Fatal error types for PDF processing.
///
/// Errors raised while building the object graph or walking the page tree
/// abort the whole document. Errors raised while interpreting a single page
/// are reported for that page only.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfError {
    /// Error parsing PDF structure or syntax.
    ParseError(String),
    /// A byte sequence could not be read as a PDF token.
    MalformedToken {
        /// Byte offset where the bad token starts.
        offset: usize,
        /// What was wrong with it.
        reason: String,
    },
    /// An indirect reference points to an object absent from the graph.
    UnresolvedReference {
        /// Object number.
        id: u32,
        /// Generation number.
        generation: u16,
    },
    /// Following a chain of references did not terminate within the depth limit.
    ReferenceCycle {
        /// Object number where resolution started.
        id: u32,
        /// Generation number where resolution started.
        generation: u16,
    },
    /// The page tree visits the same node twice.
    CyclicPageTree {
        /// Object number of the revisited node.
        id: u32,
        /// Generation number of the revisited node.
        generation: u16,
    },
    /// A stream uses a decode filter this crate does not implement.
    UnsupportedFilter(String),
    /// I/O error reading PDF data.
    IoError(String),
    /// Error resolving font or encoding information.
    FontError(String),
    /// Error during content stream interpretation.
    InterpreterError(String),
    /// A configured resource limit was exceeded.
    ResourceLimitExceeded {
        /// Name of the limit that was exceeded (e.g., "max_stream_bytes").
        limit_name: String,
        /// The configured limit value.
        limit_value: usize,
        /// The actual value that exceeded the limit.
        actual_value: usize,
    },
    /// Any other error not covered by specific variants.
    Other(String),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::ParseError(msg) => write!(f, "parse error: {msg}"),
            PdfError::MalformedToken { offset, reason } => {
                write!(f, "malformed token at offset {offset}: {reason}")
            }
            PdfError::UnresolvedReference { id, generation } => {
                write!(f, "unresolved reference: {id} {generation} R")
            }
            PdfError::ReferenceCycle { id, generation } => {
                write!(f, "reference cycle starting at {id} {generation} R")
            }
            PdfError::CyclicPageTree { id, generation } => {
                write!(f, "cyclic page tree at {id} {generation} R")
            }
            PdfError::UnsupportedFilter(name) => write!(f, "unsupported filter: {name}"),
            PdfError::IoError(msg) => write!(f, "I/O error: {msg}"),
            PdfError::FontError(msg) => write!(f, "font error: {msg}"),
            PdfError::InterpreterError(msg) => write!(f, "interpreter error: {msg}"),
            PdfError::ResourceLimitExceeded {
                limit_name,
                limit_value,
                actual_value,
            } => write!(
                f,
                "resource limit exceeded: {limit_name} (limit: {limit_value}, actual: {actual_value})"
            ),
            PdfError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PdfError {}

impl From<std::io::Error> for PdfError {
    fn from(err: std::io::Error) -> Self {
        PdfError::IoError(err.to_string())
    }
}

/// Machine-readable warning code for categorizing extraction issues.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "detail")
)]
pub enum ExtractWarningCode {
    /// A font is not a Type0 font with a ToUnicode CMap; raw codes are emitted.
    UnsupportedFont,
    /// A referenced font was not found in page resources.
    MissingFont,
    /// Character codes had no entry in the font's ToUnicode CMap.
    UnmappedCode,
    /// A PDF object is malformed or has unexpected structure.
    MalformedObject,
    /// Any other warning not covered by specific variants.
    Other(String),
}

impl ExtractWarningCode {
    /// Returns the string tag for this warning code.
    pub fn as_str(&self) -> &str {
        match self {
            ExtractWarningCode::UnsupportedFont => "UNSUPPORTED_FONT",
            ExtractWarningCode::MissingFont => "MISSING_FONT",
            ExtractWarningCode::UnmappedCode => "UNMAPPED_CODE",
            ExtractWarningCode::MalformedObject => "MALFORMED_OBJECT",
            ExtractWarningCode::Other(_) => "OTHER",
        }
    }
}

impl fmt::Display for ExtractWarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal warning encountered during extraction.
///
/// Warnings carry a structured [`code`](ExtractWarning::code), a
/// human-readable description, and optional context: the page index
/// (0-based), the font resource name, and the operator index in the
/// content stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractWarning {
    /// Machine-readable warning code.
    pub code: ExtractWarningCode,
    /// Human-readable description of the warning.
    pub description: String,
    /// Page number where the warning occurred (0-indexed), if applicable.
    pub page: Option<usize>,
    /// Index of the operator in the content stream where the warning occurred.
    pub operator_index: Option<usize>,
    /// Font resource name associated with the warning, if applicable.
    pub font_name: Option<String>,
}

impl ExtractWarning {
    /// Create a warning with just a description.
    ///
    /// Uses [`ExtractWarningCode::Other`] as the default code.
    pub fn new(description: impl Into<String>) -> Self {
        let desc = description.into();
        Self {
            code: ExtractWarningCode::Other(desc.clone()),
            description: desc,
            page: None,
            operator_index: None,
            font_name: None,
        }
    }

    /// Create a warning with a specific code and description.
    pub fn with_code(code: ExtractWarningCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            page: None,
            operator_index: None,
            font_name: None,
        }
    }

    /// Create a warning for a font resource on a page.
    pub fn for_font(
        code: ExtractWarningCode,
        description: impl Into<String>,
        page: usize,
        font_name: impl Into<String>,
    ) -> Self {
        Self {
            code,
            description: description.into(),
            page: Some(page),
            operator_index: None,
            font_name: Some(font_name.into()),
        }
    }

    /// Attach a page index, returning the modified warning.
    pub fn on_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Attach an operator index, returning the modified warning.
    pub fn at_operator(mut self, operator_index: usize) -> Self {
        self.operator_index = Some(operator_index);
        self
    }
}

impl fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)?;
        if let Some(page) = self.page {
            write!(f, " (page {page})")?;
        }
        if let Some(ref font_name) = self.font_name {
            write!(f, " [font {font_name}]")?;
        }
        if let Some(index) = self.operator_index {
            write!(f, " [operator #{index}]")?;
        }
        Ok(())
    }
}

/// Result wrapper that pairs a value with collected warnings.
///
/// Used when extraction can partially succeed with non-fatal issues.
#[derive(Debug, Clone)]
pub struct ExtractResult<T> {
    /// The extracted value.
    pub value: T,
    /// Warnings collected during extraction.
    pub warnings: Vec<ExtractWarning>,
}

impl<T> ExtractResult<T> {
    /// Create a result with no warnings.
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Create a result with warnings.
    pub fn with_warnings(value: T, warnings: Vec<ExtractWarning>) -> Self {
        Self { value, warnings }
    }

    /// Returns true if there are no warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Transform the value while preserving warnings.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractResult<U> {
        ExtractResult {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

/// Options controlling extraction behavior and resource limits.
///
/// Resource limits bound the work done on pathological documents.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Maximum number of reference hops when resolving a value (default: 32).
    pub max_reference_depth: usize,
    /// Maximum decoded size of a single stream in bytes (default: 100 MB).
    pub max_stream_bytes: usize,
    /// Maximum number of content stream operations interpreted per page (default: 1,000,000).
    pub max_operations_per_page: usize,
    /// Maximum number of pages to collect (default: None = no limit).
    pub max_pages: Option<usize>,
    /// Whether to collect warnings during extraction (default: true).
    pub collect_warnings: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_reference_depth: 32,
            max_stream_bytes: 100 * 1024 * 1024,
            max_operations_per_page: 1_000_000,
            max_pages: None,
            collect_warnings: true,
        }
    }
}
