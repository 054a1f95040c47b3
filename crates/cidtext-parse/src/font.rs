//! Per-page font resolution.
//!
//! Turns each `/Font` resource into a [`PageFont`] that knows how to split a
//! shown string into codes, map codes to text and look up advance widths.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use cidtext_core::{ExtractResult, ExtractWarning, ExtractWarningCode};
use tracing::{debug, warn};

use crate::cmap::{CidCMap, Code, Codespace, MAX_RANGE_CODES, ToUnicodeCMap};
use crate::document::ObjectGraph;
use crate::error::BackendError;
use crate::object::{Dictionary, PdfValue};
use crate::page_tree::Page;

/// Width used when a CID font has no `/DW`.
const DEFAULT_CID_WIDTH: f64 = 1000.0;

/// Code width for composite fonts without a codespace.
const DEFAULT_CODE_BYTES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    /// `/Subtype /Type0`.
    Composite,
    /// Every other subtype, and fonts missing from the resources.
    Simple,
}

/// Advance widths in glyph space (1/1000 em).
#[derive(Debug, Clone, PartialEq)]
enum GlyphWidths {
    Cid {
        default: f64,
        widths: HashMap<u32, f64>,
    },
    Simple {
        first_char: u32,
        widths: Vec<f64>,
        missing: f64,
    },
}

/// One character code of a shown string, decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub code: Code,
    /// `None` when the ToUnicode map has no entry for the code.
    pub text: Option<String>,
    /// Horizontal advance in glyph space.
    pub width: f64,
}

impl Glyph {
    /// Single-byte code 32, the only code word spacing applies to.
    pub fn is_word_space(&self) -> bool {
        self.code.len == 1 && self.code.value == 32
    }
}

/// A font resource ready for text decoding.
#[derive(Debug, Clone)]
pub struct PageFont {
    resource_name: String,
    base_font: Option<String>,
    kind: FontKind,
    to_unicode: Option<ToUnicodeCMap>,
    codespace: Codespace,
    cid_map: Option<CidCMap>,
    widths: GlyphWidths,
}

impl PageFont {
    /// Single-byte raw font used for names the page does not define.
    pub fn raw(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            base_font: None,
            kind: FontKind::Simple,
            to_unicode: None,
            codespace: Codespace::fixed(1),
            cid_map: None,
            widths: GlyphWidths::Simple {
                first_char: 0,
                widths: Vec::new(),
                missing: 0.0,
            },
        }
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn base_font(&self) -> Option<&str> {
        self.base_font.as_deref()
    }

    pub fn kind(&self) -> FontKind {
        self.kind
    }

    /// Raw mode: codes are rendered as the code point with the same value.
    pub fn is_raw(&self) -> bool {
        self.to_unicode.is_none()
    }

    pub fn codespace(&self) -> &Codespace {
        &self.codespace
    }

    /// Glyph-space advance of `code`.
    pub fn width(&self, code: u32) -> f64 {
        match &self.widths {
            GlyphWidths::Cid { default, widths } => {
                let cid = self
                    .cid_map
                    .as_ref()
                    .and_then(|m| m.lookup(code))
                    .unwrap_or(code);
                widths.get(&cid).copied().unwrap_or(*default)
            }
            GlyphWidths::Simple {
                first_char,
                widths,
                missing,
            } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize))
                .copied()
                .unwrap_or(*missing),
        }
    }

    /// Text for one code, `None` if unmapped.
    pub fn text_for(&self, code: u32) -> Option<String> {
        match &self.to_unicode {
            Some(cmap) => cmap.lookup(code).map(str::to_string),
            None => Some(
                char::from_u32(code)
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
                    .to_string(),
            ),
        }
    }

    /// Split and decode a string operand.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        self.codespace
            .split(bytes)
            .into_iter()
            .map(|code| Glyph {
                code,
                text: self.text_for(code.value),
                width: self.width(code.value),
            })
            .collect()
    }
}

/// The fonts of one page, keyed by resource name.
#[derive(Debug, Clone, Default)]
pub struct FontTable {
    fonts: BTreeMap<String, PageFont>,
    /// Names present in `/Font` whose dictionaries could not be resolved.
    missing: BTreeSet<String>,
}

impl FontTable {
    pub fn get(&self, name: &str) -> Option<&PageFont> {
        self.fonts.get(name)
    }

    /// Whether `name` was listed but failed to resolve.
    pub fn is_missing(&self, name: &str) -> bool {
        self.missing.contains(name)
    }

    pub fn insert(&mut self, font: PageFont) {
        self.fonts.insert(font.resource_name.clone(), font);
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageFont> {
        self.fonts.values()
    }
}

/// Load every font in the page's `/Font` resources.
///
/// Never fails: unreadable fonts degrade to raw mode or are left out, and
/// each degradation is reported as a warning.
pub fn resolve_fonts(graph: &ObjectGraph, page: &Page) -> ExtractResult<FontTable> {
    let mut table = FontTable::default();
    let mut warnings = Vec::new();
    let Some(font_dict) = page.fonts() else {
        return ExtractResult::ok(table);
    };

    for (name, value) in font_dict.iter() {
        match graph.resolve_dict(value) {
            Ok(dict) => {
                let mut loader = FontLoader {
                    graph,
                    name: name.as_str(),
                    page: page.index,
                    warnings: &mut warnings,
                };
                let font = loader.load(dict);
                debug!(
                    page = page.index,
                    font = %name,
                    kind = ?font.kind,
                    raw = font.is_raw(),
                    "font resolved"
                );
                table.insert(font);
            }
            Err(e) => {
                warn!(page = page.index, font = %name, error = %e, "font unresolvable");
                warnings.push(ExtractWarning::for_font(
                    ExtractWarningCode::MissingFont,
                    format!("font /{name} could not be resolved: {e}"),
                    page.index,
                    name.as_str(),
                ));
                table.missing.insert(name.clone());
            }
        }
    }

    ExtractResult::with_warnings(table, warnings)
}

struct FontLoader<'a> {
    graph: &'a ObjectGraph,
    name: &'a str,
    page: usize,
    warnings: &'a mut Vec<ExtractWarning>,
}

impl FontLoader<'_> {
    fn warn(&mut self, code: ExtractWarningCode, description: String) {
        warn!(page = self.page, font = %self.name, "{description}");
        self.warnings.push(ExtractWarning::for_font(
            code,
            description,
            self.page,
            self.name,
        ));
    }

    fn load(&mut self, dict: &Dictionary) -> PageFont {
        let subtype = name_entry(self.graph, dict, "Subtype")
            .unwrap_or("")
            .to_string();
        let base_font = name_entry(self.graph, dict, "BaseFont").map(str::to_string);
        if subtype == "Type0" {
            self.load_composite(dict, base_font)
        } else {
            self.warn(
                ExtractWarningCode::UnsupportedFont,
                format!("font subtype /{subtype} is not composite; codes rendered raw"),
            );
            let mut font = PageFont::raw(self.name);
            font.base_font = base_font;
            font.widths = self.simple_widths(dict);
            font
        }
    }

    fn load_composite(&mut self, dict: &Dictionary, base_font: Option<String>) -> PageFont {
        let cid_map = self.encoding_cmap(dict);
        let to_unicode = self.to_unicode(dict);

        let codespace = match (&cid_map, &to_unicode) {
            (Some(m), _) if !m.codespace(DEFAULT_CODE_BYTES).is_empty() => {
                m.codespace(DEFAULT_CODE_BYTES)
            }
            (_, Some(t)) if !t.codespace(DEFAULT_CODE_BYTES).is_empty() => {
                t.codespace(DEFAULT_CODE_BYTES)
            }
            _ => Codespace::fixed(DEFAULT_CODE_BYTES),
        };

        PageFont {
            resource_name: self.name.to_string(),
            base_font,
            kind: FontKind::Composite,
            to_unicode,
            codespace,
            cid_map,
            widths: self.cid_widths(dict),
        }
    }

    fn to_unicode(&mut self, dict: &Dictionary) -> Option<ToUnicodeCMap> {
        let graph = self.graph;
        let parsed = match graph.get_resolved(dict, "ToUnicode") {
            Ok(Some(PdfValue::Stream(stream))) => graph
                .decode_stream(stream)
                .and_then(|data| ToUnicodeCMap::parse(&data)),
            Ok(_) => {
                self.warn(
                    ExtractWarningCode::UnsupportedFont,
                    "composite font has no /ToUnicode stream; codes rendered raw".to_string(),
                );
                return None;
            }
            Err(e) => Err(e),
        };
        match parsed {
            Ok(cmap) => Some(cmap),
            Err(e) => {
                self.warn(
                    ExtractWarningCode::UnsupportedFont,
                    format!("/ToUnicode CMap unreadable ({e}); codes rendered raw"),
                );
                None
            }
        }
    }

    /// An embedded `/Encoding` CMap stream; predefined names yield `None`.
    fn encoding_cmap(&mut self, dict: &Dictionary) -> Option<CidCMap> {
        let graph = self.graph;
        let parsed = match graph.get_resolved(dict, "Encoding") {
            Ok(Some(PdfValue::Stream(stream))) => graph
                .decode_stream(stream)
                .and_then(|data| CidCMap::parse(&data)),
            Ok(_) => return None,
            Err(e) => Err(e),
        };
        if let Ok(cmap) = &parsed {
            debug!(
                font = self.name,
                cmap = cmap.name().unwrap_or("unnamed"),
                wmode = cmap.writing_mode(),
                "embedded encoding CMap"
            );
        }
        parsed
            .map_err(|e| {
                self.warn(
                    ExtractWarningCode::MalformedObject,
                    format!("embedded /Encoding CMap unreadable: {e}"),
                );
            })
            .ok()
    }

    fn cid_widths(&mut self, dict: &Dictionary) -> GlyphWidths {
        let graph = self.graph;
        let (default, widths) = match descendant(graph, dict) {
            Ok(Some(d)) => {
                let default = graph
                    .get_resolved(d, "DW")
                    .ok()
                    .flatten()
                    .and_then(PdfValue::as_f64)
                    .unwrap_or(DEFAULT_CID_WIDTH);
                let widths = match graph.get_resolved(d, "W") {
                    Ok(Some(PdfValue::Array(items))) => parse_w_array(graph, items),
                    _ => HashMap::new(),
                };
                (default, widths)
            }
            Ok(None) => (DEFAULT_CID_WIDTH, HashMap::new()),
            Err(e) => {
                self.warn(
                    ExtractWarningCode::MalformedObject,
                    format!("descendant font unreadable: {e}"),
                );
                (DEFAULT_CID_WIDTH, HashMap::new())
            }
        };
        GlyphWidths::Cid { default, widths }
    }

    fn simple_widths(&self, dict: &Dictionary) -> GlyphWidths {
        let graph = self.graph;
        let int = |key: &str| {
            graph
                .get_resolved(dict, key)
                .ok()
                .flatten()
                .and_then(PdfValue::as_i64)
        };
        let first_char = int("FirstChar")
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0);
        let widths = match graph.get_resolved(dict, "Widths") {
            Ok(Some(PdfValue::Array(items))) => items
                .iter()
                .map(|w| {
                    graph
                        .resolve(w)
                        .ok()
                        .and_then(PdfValue::as_f64)
                        .unwrap_or(0.0)
                })
                .collect(),
            _ => Vec::new(),
        };
        let missing = graph
            .get_resolved(dict, "FontDescriptor")
            .ok()
            .flatten()
            .and_then(PdfValue::as_dict)
            .and_then(|fd| graph.get_resolved(fd, "MissingWidth").ok().flatten())
            .and_then(PdfValue::as_f64)
            .unwrap_or(0.0);
        GlyphWidths::Simple {
            first_char,
            widths,
            missing,
        }
    }
}

fn name_entry<'g>(graph: &'g ObjectGraph, dict: &'g Dictionary, key: &str) -> Option<&'g str> {
    graph.get_resolved(dict, key).ok().flatten()?.as_name()
}

/// First entry of `/DescendantFonts`.
fn descendant<'g>(
    graph: &'g ObjectGraph,
    dict: &'g Dictionary,
) -> Result<Option<&'g Dictionary>, BackendError> {
    let Some(value) = graph.get_resolved(dict, "DescendantFonts")? else {
        return Ok(None);
    };
    let first = match value {
        PdfValue::Array(items) => match items.first() {
            Some(first) => first,
            None => return Ok(None),
        },
        other => other,
    };
    graph.resolve_dict(first).map(Some)
}

/// Parse a CID font `/W` array.
///
/// Two forms may be mixed: `c [w1 w2 …]` gives consecutive CIDs starting at
/// `c`, and `c_first c_last w` gives one width to a range.
pub fn parse_w_array(graph: &ObjectGraph, items: &[PdfValue]) -> HashMap<u32, f64> {
    let number = |v: &PdfValue| graph.resolve(v).ok().and_then(PdfValue::as_f64);
    let cid = |v: &PdfValue| {
        graph
            .resolve(v)
            .ok()
            .and_then(PdfValue::as_i64)
            .and_then(|n| u32::try_from(n).ok())
    };

    let mut widths = HashMap::new();
    let mut i = 0;
    while i < items.len() {
        let Some(start) = cid(&items[i]) else {
            i += 1;
            continue;
        };
        let Some(next) = items.get(i + 1) else {
            break;
        };
        match graph.resolve(next) {
            Ok(PdfValue::Array(list)) => {
                for (j, w) in list.iter().enumerate() {
                    if let Some(w) = number(w) {
                        widths.insert(start.saturating_add(j as u32), w);
                    }
                }
                i += 2;
            }
            _ => {
                let end = cid(next);
                let w = items.get(i + 2).and_then(number);
                if let (Some(end), Some(w)) = (end, w) {
                    let end = end.min(start.saturating_add(MAX_RANGE_CODES - 1));
                    for c in start..=end {
                        widths.insert(c, w);
                    }
                }
                i += 3;
            }
        }
    }
    widths
}
