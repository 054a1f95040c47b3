//! CMap programs: ToUnicode maps and embedded `/Encoding` CMaps.
//!
//! Both kinds are read with the shared [`Lexer`]; only the section
//! operators matter, the PostScript boilerplate around them is skipped.

use std::collections::HashMap;

use tracing::warn;

use crate::error::BackendError;
use crate::lexer::{Lexer, Token};

/// Widest range a single `bfrange`/`cidrange` entry may cover.
pub const MAX_RANGE_CODES: u32 = 65_536;

/// One `begincodespacerange` entry. Bounds are compared byte by byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodespaceRange {
    pub low: Vec<u8>,
    pub high: Vec<u8>,
}

impl CodespaceRange {
    fn matches(&self, bytes: &[u8]) -> bool {
        let n = self.low.len();
        bytes.len() >= n
            && bytes[..n]
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(b, (lo, hi))| lo <= b && b <= hi)
    }
}

/// A character code split out of a shown string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
    pub value: u32,
    /// Number of bytes the code occupied.
    pub len: usize,
}

/// The code byte widths of a font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codespace {
    /// Sorted by byte length, shortest first.
    ranges: Vec<CodespaceRange>,
    default_width: usize,
}

impl Codespace {
    /// No ranges: every code is `width` bytes.
    pub fn fixed(width: usize) -> Self {
        Self {
            ranges: Vec::new(),
            default_width: width.clamp(1, 4),
        }
    }

    fn from_ranges(mut ranges: Vec<CodespaceRange>, default_width: usize) -> Self {
        ranges.sort_by_key(|r| r.low.len());
        Self {
            ranges,
            default_width: default_width.clamp(1, 4),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[CodespaceRange] {
        &self.ranges
    }

    pub fn default_width(&self) -> usize {
        self.default_width
    }

    /// Split a string operand into character codes.
    pub fn split(&self, bytes: &[u8]) -> Vec<Code> {
        let mut codes = Vec::new();
        let mut rest = bytes;
        while !rest.is_empty() {
            let len = self
                .ranges
                .iter()
                .find(|r| r.matches(rest))
                .map_or(self.default_width, |r| r.low.len())
                .min(rest.len());
            codes.push(Code {
                value: be_code(&rest[..len]),
                len,
            });
            rest = &rest[len..];
        }
        codes
    }
}

/// A parsed `/ToUnicode` CMap.
#[derive(Debug, Clone, Default)]
pub struct ToUnicodeCMap {
    mappings: HashMap<u32, String>,
    codespace: Vec<CodespaceRange>,
}

impl ToUnicodeCMap {
    /// Parse a decoded ToUnicode stream.
    pub fn parse(data: &[u8]) -> Result<Self, BackendError> {
        let mut cmap = Self::default();
        let mut lexer = Lexer::new(data);
        while let Some(token) = lexer.next_token()? {
            let Token::Keyword(kw) = token else {
                continue;
            };
            match kw.as_str() {
                "begincodespacerange" => {
                    cmap.codespace.extend(read_codespace(&mut lexer)?);
                }
                "beginbfchar" => {
                    let entries = read_section(&mut lexer, "endbfchar")?;
                    for pair in entries.chunks_exact(2) {
                        if let (Some(src), Some(dst)) = (hex(&pair[0]), hex(&pair[1])) {
                            cmap.mappings.insert(be_code(src), utf16_text(dst));
                        }
                    }
                }
                "beginbfrange" => {
                    let entries = read_section(&mut lexer, "endbfrange")?;
                    cmap.apply_bfrange(&entries);
                }
                _ => {}
            }
        }
        Ok(cmap)
    }

    fn apply_bfrange(&mut self, entries: &[SectionItem]) {
        for triple in entries.chunks_exact(3) {
            let (Some(lo), Some(hi)) = (hex(&triple[0]), hex(&triple[1])) else {
                continue;
            };
            let Some((low, count)) = range_bounds(lo, hi) else {
                continue;
            };
            match &triple[2] {
                SectionItem::Token(Token::HexString(dst)) => {
                    let units = utf16_units(dst);
                    for k in 0..count {
                        let mut shifted = units.clone();
                        if let Some(last) = shifted.last_mut() {
                            *last = last.wrapping_add(k as u16);
                        }
                        self.mappings
                            .insert(low + k, String::from_utf16_lossy(&shifted));
                    }
                }
                SectionItem::Array(items) => {
                    for (k, item) in items.iter().take(count as usize).enumerate() {
                        if let Token::HexString(dst) = item {
                            self.mappings.insert(low + k as u32, utf16_text(dst));
                        }
                    }
                }
                SectionItem::Token(_) => {}
            }
        }
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(String::as_str)
    }

    /// Mapped text, or U+FFFD.
    pub fn lookup_or_replacement(&self, code: u32) -> String {
        self.lookup(code)
            .map_or_else(|| char::REPLACEMENT_CHARACTER.to_string(), str::to_string)
    }

    /// Codespace declared by the CMap; empty when it declares none.
    pub fn codespace(&self, default_width: usize) -> Codespace {
        Codespace::from_ranges(self.codespace.clone(), default_width)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// An embedded `/Encoding` CMap: character code → CID.
#[derive(Debug, Clone, Default)]
pub struct CidCMap {
    cid_mappings: HashMap<u32, u32>,
    codespace: Vec<CodespaceRange>,
    name: Option<String>,
    writing_mode: i64,
}

impl CidCMap {
    pub fn parse(data: &[u8]) -> Result<Self, BackendError> {
        let mut cmap = Self::default();
        let mut lexer = Lexer::new(data);
        while let Some(token) = lexer.next_token()? {
            match token {
                Token::Name(n) if n == "CMapName" => {
                    if let Some(Token::Name(value)) = lexer.peek_token()? {
                        cmap.name = Some(value);
                        lexer.next_token()?;
                    }
                }
                Token::Name(n) if n == "WMode" => {
                    if let Some(Token::Integer(mode)) = lexer.peek_token()? {
                        cmap.writing_mode = mode;
                        lexer.next_token()?;
                    }
                }
                Token::Keyword(kw) => match kw.as_str() {
                    "begincodespacerange" => {
                        cmap.codespace.extend(read_codespace(&mut lexer)?);
                    }
                    "begincidchar" => {
                        let entries = read_section(&mut lexer, "endcidchar")?;
                        for pair in entries.chunks_exact(2) {
                            if let (Some(src), Some(cid)) = (hex(&pair[0]), integer(&pair[1])) {
                                cmap.cid_mappings.insert(be_code(src), cid);
                            }
                        }
                    }
                    "begincidrange" => {
                        let entries = read_section(&mut lexer, "endcidrange")?;
                        for triple in entries.chunks_exact(3) {
                            let (Some(lo), Some(hi), Some(cid)) =
                                (hex(&triple[0]), hex(&triple[1]), integer(&triple[2]))
                            else {
                                continue;
                            };
                            if let Some((low, count)) = range_bounds(lo, hi) {
                                for k in 0..count {
                                    cmap.cid_mappings.insert(low + k, cid.saturating_add(k));
                                }
                            }
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
        Ok(cmap)
    }

    pub fn lookup(&self, code: u32) -> Option<u32> {
        self.cid_mappings.get(&code).copied()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// 0 for horizontal, 1 for vertical.
    pub fn writing_mode(&self) -> i64 {
        self.writing_mode
    }

    pub fn codespace(&self, default_width: usize) -> Codespace {
        Codespace::from_ranges(self.codespace.clone(), default_width)
    }
}

/// A token inside a `begin…`/`end…` section; arrays are kept whole.
#[derive(Debug)]
enum SectionItem {
    Token(Token),
    Array(Vec<Token>),
}

fn read_section(lexer: &mut Lexer<'_>, end: &str) -> Result<Vec<SectionItem>, BackendError> {
    let mut items = Vec::new();
    while let Some(token) = lexer.next_token()? {
        match token {
            Token::Keyword(ref kw) if kw == end => return Ok(items),
            Token::ArrayStart => {
                let mut inner = Vec::new();
                while let Some(t) = lexer.next_token()? {
                    if t == Token::ArrayEnd {
                        break;
                    }
                    inner.push(t);
                }
                items.push(SectionItem::Array(inner));
            }
            other => items.push(SectionItem::Token(other)),
        }
    }
    warn!(section = end, "CMap section not terminated");
    Ok(items)
}

fn read_codespace(lexer: &mut Lexer<'_>) -> Result<Vec<CodespaceRange>, BackendError> {
    let entries = read_section(lexer, "endcodespacerange")?;
    Ok(entries
        .chunks_exact(2)
        .filter_map(|pair| {
            let (lo, hi) = (hex(&pair[0])?, hex(&pair[1])?);
            (!lo.is_empty() && lo.len() == hi.len() && lo.len() <= 4).then(|| CodespaceRange {
                low: lo.to_vec(),
                high: hi.to_vec(),
            })
        })
        .collect())
}

fn hex(item: &SectionItem) -> Option<&[u8]> {
    match item {
        SectionItem::Token(Token::HexString(bytes)) => Some(bytes.as_slice()),
        _ => None,
    }
}

fn integer(item: &SectionItem) -> Option<u32> {
    match item {
        SectionItem::Token(Token::Integer(n)) => u32::try_from(*n).ok(),
        _ => None,
    }
}

/// Start code and clamped length of an inclusive range.
fn range_bounds(lo: &[u8], hi: &[u8]) -> Option<(u32, u32)> {
    let (low, high) = (be_code(lo), be_code(hi));
    if high < low {
        warn!(low, high, "CMap range with high < low skipped");
        return None;
    }
    let span = high - low;
    if span >= MAX_RANGE_CODES {
        warn!(low, high, "CMap range clamped to {MAX_RANGE_CODES} codes");
        return Some((low, MAX_RANGE_CODES));
    }
    Some((low, span + 1))
}

/// Big-endian value of up to four code bytes.
fn be_code(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    let padded;
    let bytes = if bytes.len() % 2 == 1 {
        padded = [&[0u8][..], bytes].concat();
        &padded[..]
    } else {
        bytes
    };
    bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect()
}

fn utf16_text(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bfchar_single_mapping() {
        let data = b"\
beginbfchar\n\
<0041> <0041>\n\
endbfchar\n";
        let cmap = ToUnicodeCMap::parse(data).unwrap();
        assert_eq!(cmap.lookup(0x0041), Some("A"));
        assert_eq!(cmap.len(), 1);
    }

    #[test]
    fn bfchar_surrogate_pair() {
        let data = b"\
1 beginbfchar\n\
<0001> <D83DDE00>\n\
endbfchar\n";
        let cmap = ToUnicodeCMap::parse(data).unwrap();
        assert_eq!(cmap.lookup(1), Some("\u{1F600}"));
    }

    #[test]
    fn bfchar_cjk_and_ligature() {
        let data = b"\
2 beginbfchar\n\
<0010> <4E2D>\n\
<0011> <00660069>\n\
endbfchar\n";
        let cmap = ToUnicodeCMap::parse(data).unwrap();
        assert_eq!(cmap.lookup(0x10), Some("中"));
        assert_eq!(cmap.lookup(0x11), Some("fi"));
    }

    #[test]
    fn bfrange_increments_last_unit() {
        let data = b"\
1 beginbfrange\n\
<0001> <0004> <0041>\n\
endbfrange\n";
        let cmap = ToUnicodeCMap::parse(data).unwrap();
        assert_eq!(cmap.lookup(1), Some("A"));
        assert_eq!(cmap.lookup(4), Some("D"));
        assert_eq!(cmap.lookup(5), None);
    }

    #[test]
    fn bfrange_array_destinations() {
        let data = b"\
1 beginbfrange\n\
<0005> <0007> [<0058> <0059> <005A>]\n\
endbfrange\n";
        let cmap = ToUnicodeCMap::parse(data).unwrap();
        assert_eq!(cmap.lookup(5), Some("X"));
        assert_eq!(cmap.lookup(6), Some("Y"));
        assert_eq!(cmap.lookup(7), Some("Z"));
    }

    #[test]
    fn bfrange_short_array_maps_prefix() {
        let data = b"beginbfrange <01> <03> [<0061>] endbfrange";
        let cmap = ToUnicodeCMap::parse(data).unwrap();
        assert_eq!(cmap.lookup(1), Some("a"));
        assert_eq!(cmap.lookup(2), None);
    }

    #[test]
    fn huge_range_is_clamped() {
        let data = b"beginbfrange <00000000> <FFFFFFFF> <0041> endbfrange";
        let cmap = ToUnicodeCMap::parse(data).unwrap();
        assert_eq!(cmap.len(), MAX_RANGE_CODES as usize);
        assert!(cmap.lookup(MAX_RANGE_CODES).is_none());
    }

    #[test]
    fn inverted_range_is_skipped() {
        let data = b"beginbfrange <0005> <0001> <0041> endbfrange";
        let cmap = ToUnicodeCMap::parse(data).unwrap();
        assert!(cmap.is_empty());
    }

    #[test]
    fn later_entries_win() {
        let data = b"\
beginbfrange <0001> <0002> <0061> endbfrange\n\
beginbfchar <0002> <0042> endbfchar\n";
        let cmap = ToUnicodeCMap::parse(data).unwrap();
        assert_eq!(cmap.lookup(1), Some("a"));
        assert_eq!(cmap.lookup(2), Some("B"));
    }

    #[test]
    fn full_program_with_boilerplate() {
        let data = b"\
/CIDInit /ProcSet findresource begin\r\n\
12 dict begin\r\n\
begincmap\r\n\
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\r\n\
/CMapName /Adobe-Identity-UCS def\r\n\
/CMapType 2 def\r\n\
1 begincodespacerange\r\n\
<0000> <FFFF>\r\n\
endcodespacerange\r\n\
2 beginbfchar\r\n\
<0003> <0020>\r\n\
<0024> <0041>\r\n\
endbfchar\r\n\
endcmap\r\n\
CMapName currentdict /CMap defineresource pop\r\n\
end\r\n\
end\r\n";
        let cmap = ToUnicodeCMap::parse(data).unwrap();
        assert_eq!(cmap.lookup(3), Some(" "));
        assert_eq!(cmap.lookup(0x24), Some("A"));
        let cs = cmap.codespace(2);
        assert_eq!(cs.ranges().len(), 1);
        assert_eq!(cs.ranges()[0].low, vec![0, 0]);
    }

    #[test]
    fn lookup_or_replacement_for_missing_code() {
        let cmap = ToUnicodeCMap::parse(b"").unwrap();
        assert_eq!(cmap.lookup_or_replacement(9), "\u{FFFD}");
    }

    #[test]
    fn malformed_program_is_an_error() {
        assert!(ToUnicodeCMap::parse(b"beginbfchar <0041> (unterminated").is_err());
    }

    #[test]
    fn codespace_shortest_match_first() {
        let data = b"\
2 begincodespacerange\n\
<00> <80>\n\
<8140> <FEFE>\n\
endcodespacerange\n";
        let cs = ToUnicodeCMap::parse(data).unwrap().codespace(2);
        let codes = cs.split(&[0x41, 0x81, 0x40, 0x42]);
        assert_eq!(
            codes,
            vec![
                Code { value: 0x41, len: 1 },
                Code { value: 0x8140, len: 2 },
                Code { value: 0x42, len: 1 },
            ]
        );
    }

    #[test]
    fn unmatched_bytes_use_default_width() {
        let data = b"begincodespacerange <00> <7F> endcodespacerange";
        let cs = ToUnicodeCMap::parse(data).unwrap().codespace(2);
        let codes = cs.split(&[0xF0, 0x01, 0x41]);
        assert_eq!(codes[0], Code { value: 0xF001, len: 2 });
        assert_eq!(codes[1], Code { value: 0x41, len: 1 });
    }

    #[test]
    fn fixed_width_truncates_trailing_byte() {
        let codes = Codespace::fixed(2).split(&[0x00, 0x41, 0x07]);
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0].value, 0x41);
        assert_eq!(codes[1], Code { value: 7, len: 1 });
    }

    #[test]
    fn cid_cmap_sections() {
        let data = b"\
/CMapName /Custom-H def\n\
/WMode 1 def\n\
1 begincodespacerange <0000> <FFFF> endcodespacerange\n\
1 begincidchar <0020> 1 endcidchar\n\
1 begincidrange <0100> <0102> 500 endcidrange\n";
        let cmap = CidCMap::parse(data).unwrap();
        assert_eq!(cmap.name(), Some("Custom-H"));
        assert_eq!(cmap.writing_mode(), 1);
        assert_eq!(cmap.lookup(0x20), Some(1));
        assert_eq!(cmap.lookup(0x0102), Some(502));
        assert_eq!(cmap.lookup(0x0103), None);
        assert!(!cmap.codespace(2).is_empty());
    }
}
