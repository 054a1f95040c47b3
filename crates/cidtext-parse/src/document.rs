//! Object graph reader.
//!
//! Reads the cross-reference chain and trailer, then parses every in-use
//! object eagerly into an immutable [`ObjectGraph`].

use std::collections::{BTreeMap, HashMap, HashSet};

use cidtext_core::ExtractOptions;
use tracing::{debug, warn};

use crate::error::BackendError;
use crate::filters::{self, Filter};
use crate::lexer::{Lexer, Token};
use crate::object::{Dictionary, ObjectRef, PdfStream, PdfValue};
use crate::parser::{find_bytes, parse_indirect_object, parse_value, rfind_bytes};

/// Where an object lives according to the cross-reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XrefEntry {
    Free,
    /// Byte offset of `n g obj`.
    Offset { offset: usize, generation: u16 },
    /// Stored inside the object stream `stream_id`.
    Compressed { stream_id: u32 },
}

/// Merged cross-reference data: newest entry per object number wins.
#[derive(Debug, Default)]
struct XrefTable {
    entries: BTreeMap<u32, XrefEntry>,
    trailer: Dictionary,
}

impl XrefTable {
    fn add_entry(&mut self, id: u32, entry: XrefEntry) {
        self.entries.entry(id).or_insert(entry);
    }

    fn merge_trailer(&mut self, trailer: &Dictionary) {
        for (key, value) in trailer.iter() {
            if !self.trailer.contains_key(key) {
                self.trailer.insert(key.clone(), value.clone());
            }
        }
    }
}

/// All indirect objects of a document, keyed by reference.
///
/// Built eagerly by [`ObjectGraph::load`] and immutable afterwards. An object
/// whose bytes failed to parse keeps its error, which is returned each time
/// it is resolved.
#[derive(Debug)]
pub struct ObjectGraph {
    objects: HashMap<ObjectRef, Result<PdfValue, BackendError>>,
    trailer: Dictionary,
    options: ExtractOptions,
}

impl ObjectGraph {
    /// Load with default [`ExtractOptions`].
    pub fn load(data: &[u8]) -> Result<Self, BackendError> {
        Self::load_with_options(data, ExtractOptions::default())
    }

    pub fn load_with_options(data: &[u8], options: ExtractOptions) -> Result<Self, BackendError> {
        if !has_pdf_header(data) {
            warn!("no %PDF- header in the first 1024 bytes; reading anyway");
        }
        let xref = read_xref_chain(data, &options)?;
        if !xref.trailer.contains_key("Root") {
            return Err(BackendError::Parse("trailer has no /Root".to_string()));
        }

        let mut objects: HashMap<ObjectRef, Result<PdfValue, BackendError>> = HashMap::new();
        let resolve_length = |r: ObjectRef| -> Option<i64> {
            match xref.entries.get(&r.id) {
                Some(XrefEntry::Offset { offset, .. }) => {
                    parse_indirect_object(data, *offset, &no_length)
                        .ok()
                        .and_then(|(_, v)| v.as_i64())
                }
                _ => None,
            }
        };

        for (&id, entry) in &xref.entries {
            if let XrefEntry::Offset { offset, generation } = *entry {
                let key = ObjectRef::new(id, generation);
                let parsed = parse_indirect_object(data, offset, &resolve_length).and_then(
                    |(found, value)| {
                        if found.id == id {
                            Ok(value)
                        } else {
                            Err(BackendError::Parse(format!(
                                "xref points {key} at offset {offset}, found {found}"
                            )))
                        }
                    },
                );
                objects.insert(key, parsed);
            }
        }

        expand_object_streams(&xref, &mut objects, &options);

        debug!(
            objects = objects.len(),
            failed = objects.values().filter(|v| v.is_err()).count(),
            "object graph loaded"
        );

        Ok(Self {
            objects,
            trailer: xref.trailer,
            options,
        })
    }

    /// The merged trailer dictionary.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Number of objects held by the graph, including failed ones.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Look up an indirect object.
    pub fn get(&self, r: ObjectRef) -> Result<&PdfValue, BackendError> {
        match self.objects.get(&r) {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(e.clone()),
            None => Err(BackendError::UnresolvedReference(r)),
        }
    }

    /// Follow references until a direct value is reached.
    pub fn resolve<'a>(&'a self, value: &'a PdfValue) -> Result<&'a PdfValue, BackendError> {
        let PdfValue::Reference(start) = value else {
            return Ok(value);
        };
        let mut current = value;
        let mut hops = 0;
        while let PdfValue::Reference(r) = current {
            if hops >= self.options.max_reference_depth {
                return Err(BackendError::ReferenceCycle(*start));
            }
            hops += 1;
            current = self.get(*r)?;
        }
        Ok(current)
    }

    /// Resolve a value that must be a dictionary (or a stream's dictionary).
    pub fn resolve_dict<'a>(&'a self, value: &'a PdfValue) -> Result<&'a Dictionary, BackendError> {
        let resolved = self.resolve(value)?;
        resolved.as_dict().ok_or_else(|| {
            BackendError::Parse(format!("expected dictionary, found {}", resolved.kind()))
        })
    }

    /// Resolve `dict[key]`; a missing key is `Ok(None)`.
    pub fn get_resolved<'a>(
        &'a self,
        dict: &'a Dictionary,
        key: &str,
    ) -> Result<Option<&'a PdfValue>, BackendError> {
        dict.get(key).map(|v| self.resolve(v)).transpose()
    }

    /// The document catalog (`/Root`).
    pub fn catalog(&self) -> Result<&Dictionary, BackendError> {
        let root = self
            .trailer
            .get("Root")
            .ok_or_else(|| BackendError::Parse("trailer has no /Root".to_string()))?;
        self.resolve_dict(root)
    }

    /// Apply the stream's `/Filter` chain.
    pub fn decode_stream(&self, stream: &PdfStream) -> Result<Vec<u8>, BackendError> {
        let chain = self.filter_chain(&stream.dict)?;
        filters::decode(&stream.data, &chain, self.options.max_stream_bytes)
    }

    fn filter_chain<'a>(
        &'a self,
        dict: &'a Dictionary,
    ) -> Result<Vec<(Filter, Option<&'a Dictionary>)>, BackendError> {
        let names: Vec<&str> = match self.get_resolved(dict, "Filter")? {
            None => return Ok(Vec::new()),
            Some(PdfValue::Name(n)) => vec![n.as_str()],
            Some(PdfValue::Array(items)) => items
                .iter()
                .map(|item| {
                    self.resolve(item)?.as_name().ok_or_else(|| {
                        BackendError::Parse("non-name entry in /Filter array".to_string())
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(BackendError::Parse(format!(
                    "/Filter must be a name or array, found {}",
                    other.kind()
                )));
            }
        };

        let parms: Vec<Option<&Dictionary>> = match self.get_resolved(dict, "DecodeParms")? {
            Some(PdfValue::Array(items)) => items
                .iter()
                .map(|item| Ok(self.resolve(item)?.as_dict()))
                .collect::<Result<_, BackendError>>()?,
            Some(other) => vec![other.as_dict()],
            None => Vec::new(),
        };

        names
            .iter()
            .enumerate()
            .map(|(i, name)| Ok((Filter::from_name(name)?, parms.get(i).copied().flatten())))
            .collect()
    }
}

/// Walk the xref chain from `startxref`, falling back to the last trailer.
fn read_xref_chain(data: &[u8], options: &ExtractOptions) -> Result<XrefTable, BackendError> {
    let mut table = XrefTable::default();

    let start = match find_startxref(data) {
        Some(offset) => match read_section(data, offset, options, &mut table) {
            Ok(()) => Some(offset),
            Err(e) => {
                warn!(offset, error = %e, "startxref does not lead to an xref section");
                None
            }
        },
        None => None,
    };
    let start = match start {
        Some(offset) => offset,
        None => {
            let offset = find_last_xref_keyword(data).ok_or_else(|| {
                BackendError::Parse("no usable startxref and no trailer found".to_string())
            })?;
            warn!(offset, "reading the xref section before the last trailer");
            table = XrefTable::default();
            read_section(data, offset, options, &mut table)?;
            offset
        }
    };

    let mut visited = HashSet::from([start]);
    let mut next = prev_offset(&table.trailer);
    while let Some(offset) = next {
        if !visited.insert(offset) {
            warn!(offset, "xref /Prev chain loops, stopping");
            break;
        }
        let mut older = XrefTable::default();
        if let Err(e) = read_section(data, offset, options, &mut older) {
            warn!(offset, error = %e, "skipping unreadable xref section");
            break;
        }
        for (&id, &entry) in &older.entries {
            table.add_entry(id, entry);
        }
        table.merge_trailer(&older.trailer);
        next = prev_offset(&older.trailer);
    }

    if table.trailer.is_empty() {
        return Err(BackendError::Parse("no trailer found".to_string()));
    }
    Ok(table)
}

fn prev_offset(trailer: &Dictionary) -> Option<usize> {
    trailer
        .get("Prev")
        .and_then(PdfValue::as_i64)
        .and_then(|p| usize::try_from(p).ok())
}

fn no_length(_: ObjectRef) -> Option<i64> {
    None
}

/// Offset named after the last `startxref` keyword.
fn find_startxref(data: &[u8]) -> Option<usize> {
    let pos = rfind_bytes(data, b"startxref")?;
    let mut lexer = Lexer::at(data, pos + b"startxref".len());
    match lexer.next_token() {
        Ok(Some(Token::Integer(n))) => usize::try_from(n).ok(),
        _ => None,
    }
}

/// Start of the `xref` keyword preceding the last `trailer`.
fn find_last_xref_keyword(data: &[u8]) -> Option<usize> {
    let trailer = rfind_bytes(data, b"trailer")?;
    let mut pos = rfind_bytes(&data[..trailer], b"xref")?;
    // skip "startxref" matches
    while pos >= 5 && &data[pos - 5..pos] == b"start" {
        pos = rfind_bytes(&data[..pos], b"xref")?;
    }
    Some(pos)
}

/// Read one section (classic table or xref stream) into `table`.
///
/// Entries already present in `table` are kept; a hybrid file's `/XRefStm`
/// is read right after its table.
fn read_section(
    data: &[u8],
    offset: usize,
    options: &ExtractOptions,
    table: &mut XrefTable,
) -> Result<(), BackendError> {
    if offset >= data.len() {
        return Err(BackendError::Parse(format!(
            "xref offset {offset} beyond end of file"
        )));
    }
    let mut lexer = Lexer::at(data, offset);
    lexer.skip_whitespace();
    if data[lexer.position()..].starts_with(b"xref") {
        lexer.set_position(lexer.position() + 4);
        let trailer = read_classic_table(&mut lexer, table)?;
        debug!(offset, entries = table.entries.len(), "read xref table");
        if let Some(stm) = trailer
            .get("XRefStm")
            .and_then(PdfValue::as_i64)
            .and_then(|v| usize::try_from(v).ok())
        {
            let mut hybrid = XrefTable::default();
            match read_xref_stream(data, stm, options, &mut hybrid) {
                Ok(()) => {
                    for (&id, &entry) in &hybrid.entries {
                        table.add_entry(id, entry);
                    }
                }
                Err(e) => warn!(offset = stm, error = %e, "skipping unreadable /XRefStm"),
            }
        }
        table.merge_trailer(&trailer);
        Ok(())
    } else {
        read_xref_stream(data, offset, options, table)
    }
}

fn read_classic_table(
    lexer: &mut Lexer<'_>,
    table: &mut XrefTable,
) -> Result<Dictionary, BackendError> {
    loop {
        match lexer.next_token()? {
            Some(Token::Keyword(kw)) if kw == "trailer" => break,
            Some(Token::Integer(first)) => {
                let count = match lexer.next_token()? {
                    Some(Token::Integer(n)) if n >= 0 => n,
                    other => {
                        return Err(BackendError::Parse(format!(
                            "bad xref subsection header: {other:?}"
                        )));
                    }
                };
                let first = u32::try_from(first)
                    .map_err(|_| BackendError::Parse(format!("bad xref start {first}")))?;
                for i in 0..count {
                    let offset = lexer.next_token()?;
                    let generation = lexer.next_token()?;
                    let kind = lexer.next_token()?;
                    let (
                        Some(Token::Integer(offset)),
                        Some(Token::Integer(generation)),
                        Some(Token::Keyword(kind)),
                    ) = (offset, generation, kind)
                    else {
                        return Err(BackendError::Parse("truncated xref entry".to_string()));
                    };
                    let id = first.saturating_add(i as u32);
                    let entry = match kind.as_str() {
                        "n" => XrefEntry::Offset {
                            offset: usize::try_from(offset).map_err(|_| {
                                BackendError::Parse(format!("negative offset for object {id}"))
                            })?,
                            generation: u16::try_from(generation).unwrap_or(u16::MAX),
                        },
                        "f" => XrefEntry::Free,
                        other => {
                            return Err(BackendError::Parse(format!(
                                "bad xref entry type '{other}'"
                            )));
                        }
                    };
                    table.add_entry(id, entry);
                }
            }
            other => {
                return Err(BackendError::Parse(format!(
                    "unexpected token in xref table: {other:?}"
                )));
            }
        }
    }
    match parse_value(lexer)? {
        PdfValue::Dictionary(d) => Ok(d),
        other => Err(BackendError::Parse(format!(
            "trailer is a {}, not a dictionary",
            other.kind()
        ))),
    }
}

fn read_xref_stream(
    data: &[u8],
    offset: usize,
    options: &ExtractOptions,
    table: &mut XrefTable,
) -> Result<(), BackendError> {
    let (_, value) = parse_indirect_object(data, offset, &no_length)?;
    let PdfValue::Stream(stream) = value else {
        return Err(BackendError::Parse(format!(
            "no xref table or stream at offset {offset}"
        )));
    };
    if stream.dict.type_name() != Some("XRef") {
        return Err(BackendError::Parse(format!(
            "stream at offset {offset} is not /Type /XRef"
        )));
    }

    let widths: Vec<usize> = stream
        .dict
        .get("W")
        .and_then(PdfValue::as_array)
        .map(|w| {
            w.iter()
                .map(|v| v.as_i64().and_then(|n| usize::try_from(n).ok()).unwrap_or(0))
                .collect()
        })
        .unwrap_or_default();
    if widths.len() != 3 || widths.iter().any(|&w| w > 8) {
        return Err(BackendError::Parse("xref stream has invalid /W".to_string()));
    }
    let size = stream
        .dict
        .get("Size")
        .and_then(PdfValue::as_i64)
        .unwrap_or(0);
    let index: Vec<i64> = match stream.dict.get("Index").and_then(PdfValue::as_array) {
        Some(items) => items.iter().filter_map(PdfValue::as_i64).collect(),
        None => vec![0, size],
    };

    let decoded = decode_direct(&stream, options)?;
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(BackendError::Parse("xref stream has zero-width rows".to_string()));
    }
    let mut rows = decoded.chunks_exact(row_len);

    for pair in index.chunks(2) {
        let &[first, count] = pair else {
            break;
        };
        for i in 0..count.max(0) {
            let Some(row) = rows.next() else {
                warn!(offset, "xref stream shorter than its /Index");
                break;
            };
            let (f1, rest) = row.split_at(widths[0]);
            let (f2, f3) = rest.split_at(widths[1]);
            let kind = if widths[0] == 0 { 1 } else { be_int(f1) };
            let Ok(id) = u32::try_from(first + i) else {
                continue;
            };
            let entry = match kind {
                0 => XrefEntry::Free,
                1 => XrefEntry::Offset {
                    offset: be_int(f2) as usize,
                    generation: u16::try_from(be_int(f3)).unwrap_or(u16::MAX),
                },
                2 => XrefEntry::Compressed {
                    stream_id: be_int(f2) as u32,
                },
                // unknown entry types are treated as null references
                _ => XrefEntry::Free,
            };
            table.add_entry(id, entry);
        }
    }
    debug!(offset, entries = table.entries.len(), "read xref stream");
    table.merge_trailer(&stream.dict);
    Ok(())
}

fn be_int(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Decode a stream whose filter entries are direct objects.
fn decode_direct(stream: &PdfStream, options: &ExtractOptions) -> Result<Vec<u8>, BackendError> {
    let names: Vec<&str> = match stream.dict.get("Filter") {
        None => Vec::new(),
        Some(PdfValue::Name(n)) => vec![n.as_str()],
        Some(PdfValue::Array(items)) => items.iter().filter_map(PdfValue::as_name).collect(),
        Some(other) => {
            return Err(BackendError::Parse(format!(
                "/Filter must be a name or array, found {}",
                other.kind()
            )));
        }
    };
    let parms: Vec<Option<&Dictionary>> = match stream.dict.get("DecodeParms") {
        Some(PdfValue::Array(items)) => items.iter().map(PdfValue::as_dict).collect(),
        Some(other) => vec![other.as_dict()],
        None => Vec::new(),
    };
    let chain = names
        .iter()
        .enumerate()
        .map(|(i, n)| Ok((Filter::from_name(n)?, parms.get(i).copied().flatten())))
        .collect::<Result<Vec<_>, BackendError>>()?;
    filters::decode(&stream.data, &chain, options.max_stream_bytes)
}

/// Materialize objects stored inside `/Type /ObjStm` streams.
fn expand_object_streams(
    xref: &XrefTable,
    objects: &mut HashMap<ObjectRef, Result<PdfValue, BackendError>>,
    options: &ExtractOptions,
) {
    let mut members: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for (&id, entry) in &xref.entries {
        if let XrefEntry::Compressed { stream_id } = *entry {
            members.entry(stream_id).or_default().push(id);
        }
    }

    for (stream_id, ids) in members {
        let stream_ref = ObjectRef::new(stream_id, 0);
        let parsed = match objects.get(&stream_ref) {
            Some(Ok(PdfValue::Stream(stream))) => read_object_stream(stream, options),
            Some(Ok(other)) => Err(BackendError::Parse(format!(
                "object stream {stream_ref} is a {}",
                other.kind()
            ))),
            Some(Err(e)) => Err(e.clone()),
            None => Err(BackendError::UnresolvedReference(stream_ref)),
        };
        match parsed {
            Ok(mut contained) => {
                for id in ids {
                    let value = contained.remove(&id).unwrap_or_else(|| {
                        Err(BackendError::Parse(format!(
                            "object {id} missing from object stream {stream_id}"
                        )))
                    });
                    objects.insert(ObjectRef::new(id, 0), value);
                }
            }
            Err(e) => {
                warn!(stream = %stream_ref, error = %e, "object stream unreadable");
                for id in ids {
                    objects.insert(ObjectRef::new(id, 0), Err(e.clone()));
                }
            }
        }
    }
}

/// Parse every member of an object stream: `/N` pairs of `id offset`, values from `/First`.
fn read_object_stream(
    stream: &PdfStream,
    options: &ExtractOptions,
) -> Result<HashMap<u32, Result<PdfValue, BackendError>>, BackendError> {
    let decoded = decode_direct(stream, options)?;
    let n = stream.dict.get("N").and_then(PdfValue::as_i64).unwrap_or(0);
    let first = stream
        .dict
        .get("First")
        .and_then(PdfValue::as_i64)
        .and_then(|f| usize::try_from(f).ok())
        .ok_or_else(|| BackendError::Parse("object stream without /First".to_string()))?;
    if first > decoded.len() {
        return Err(BackendError::Parse("object stream /First past its data".to_string()));
    }

    let mut header = Lexer::new(&decoded[..first]);
    let mut out = HashMap::new();
    for _ in 0..n.max(0) {
        let (Some(Token::Integer(id)), Some(Token::Integer(rel))) =
            (header.next_token()?, header.next_token()?)
        else {
            return Err(BackendError::Parse("truncated object stream header".to_string()));
        };
        let (Ok(id), Ok(rel)) = (u32::try_from(id), usize::try_from(rel)) else {
            continue;
        };
        let mut body = Lexer::at(&decoded, first.saturating_add(rel));
        out.insert(id, parse_value(&mut body));
    }
    Ok(out)
}

/// True when `data` begins like a PDF file.
fn has_pdf_header(data: &[u8]) -> bool {
    find_bytes(&data[..data.len().min(1024)], b"%PDF-").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::build_pdf;

    fn simple_doc() -> Vec<u8> {
        build_pdf(
            &[
                "<< /Type /Catalog /Pages 2 0 R >>",
                "<< /Type /Pages /Kids [] /Count 0 >>",
                "<< /Length 4 0 R >>\nstream\nBT ET\nendstream",
                "5",
            ],
            "",
        )
    }

    #[test]
    fn loads_classic_xref() {
        let graph = ObjectGraph::load(&simple_doc()).unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.catalog().unwrap().type_name(), Some("Catalog"));
    }

    #[test]
    fn indirect_length_resolved_before_use() {
        let graph = ObjectGraph::load(&simple_doc()).unwrap();
        let stream = graph.get(ObjectRef::new(3, 0)).unwrap().as_stream().unwrap();
        assert_eq!(stream.data, b"BT ET");
        assert_eq!(graph.decode_stream(stream).unwrap(), b"BT ET");
    }

    #[test]
    fn missing_object_is_unresolved() {
        let graph = ObjectGraph::load(&simple_doc()).unwrap();
        assert_eq!(
            graph.get(ObjectRef::new(42, 0)),
            Err(BackendError::UnresolvedReference(ObjectRef::new(42, 0)))
        );
        let dangling = PdfValue::Reference(ObjectRef::new(42, 0));
        assert!(matches!(
            graph.resolve(&dangling),
            Err(BackendError::UnresolvedReference(_))
        ));
    }

    #[test]
    fn resolve_passes_direct_values_through() {
        let graph = ObjectGraph::load(&simple_doc()).unwrap();
        let v = PdfValue::Integer(3);
        assert_eq!(graph.resolve(&v).unwrap(), &PdfValue::Integer(3));
    }

    #[test]
    fn reference_chain_cycle_detected() {
        let data = build_pdf(
            &[
                "<< /Type /Catalog /Pages 2 0 R >>",
                "3 0 R",
                "2 0 R",
            ],
            "",
        );
        let graph = ObjectGraph::load(&data).unwrap();
        let start = PdfValue::Reference(ObjectRef::new(2, 0));
        assert_eq!(
            graph.resolve(&start),
            Err(BackendError::ReferenceCycle(ObjectRef::new(2, 0)))
        );
    }

    #[test]
    fn unparseable_object_keeps_its_error() {
        let data = build_pdf(
            &["<< /Type /Catalog /Pages 2 0 R >>", "<< /Broken ( >>"],
            "",
        );
        let graph = ObjectGraph::load(&data).unwrap();
        assert!(graph.get(ObjectRef::new(2, 0)).is_err());
        assert!(graph.get(ObjectRef::new(1, 0)).is_ok());
    }

    #[test]
    fn trailer_without_root_fails() {
        let mut data = simple_doc();
        let text = String::from_utf8(data.clone()).unwrap();
        data = text.replace("/Root 1 0 R", "           ").into_bytes();
        assert!(matches!(
            ObjectGraph::load(&data),
            Err(BackendError::Parse(msg)) if msg.contains("/Root")
        ));
    }

    #[test]
    fn no_trailer_fails() {
        assert!(ObjectGraph::load(b"%PDF-1.4\n1 0 obj\n1\nendobj\n").is_err());
    }

    #[test]
    fn bad_startxref_falls_back_to_last_trailer() {
        let text = String::from_utf8(simple_doc()).unwrap();
        let idx = text.rfind("startxref\n").unwrap();
        let broken = format!("{}startxref\n7\n%%EOF\n", &text[..idx]);
        let graph = ObjectGraph::load(broken.as_bytes()).unwrap();
        assert_eq!(graph.catalog().unwrap().type_name(), Some("Catalog"));
    }

    #[test]
    fn prev_chain_newer_entries_win() {
        // revision 1 defines object 2 as 10; revision 2 redefines it as 20
        let mut out = b"%PDF-1.7\n".to_vec();
        let o1 = out.len();
        out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        let o2 = out.len();
        out.extend_from_slice(b"2 0 obj\n10\nendobj\n");
        let x1 = out.len();
        out.extend_from_slice(
            format!(
                "xref\n0 3\n0000000000 65535 f \n{o1:010} 00000 n \n{o2:010} 00000 n \ntrailer\n<< /Size 3 /Root 1 0 R >>\n"
            )
            .as_bytes(),
        );
        let o2b = out.len();
        out.extend_from_slice(b"2 0 obj\n20\nendobj\n");
        let x2 = out.len();
        out.extend_from_slice(
            format!(
                "xref\n2 1\n{o2b:010} 00000 n \ntrailer\n<< /Size 3 /Prev {x1} >>\nstartxref\n{x2}\n%%EOF\n"
            )
            .as_bytes(),
        );
        let graph = ObjectGraph::load(&out).unwrap();
        assert_eq!(graph.get(ObjectRef::new(2, 0)).unwrap(), &PdfValue::Integer(20));
        // /Root comes from the older trailer
        assert_eq!(graph.catalog().unwrap().type_name(), Some("Catalog"));
    }

    #[test]
    fn prev_loop_terminates() {
        let text = String::from_utf8(simple_doc()).unwrap();
        let xref_at = text.find("xref\n").unwrap();
        let looped = text.replace("/Root 1 0 R", &format!("/Root 1 0 R /Prev {xref_at}"));
        let graph = ObjectGraph::load(looped.as_bytes()).unwrap();
        assert_eq!(graph.len(), 4);
    }

    /// Object 1: catalog (plain), object 2: object stream declaring `n`
    /// members, object 5: xref stream listing 3 and 4 as members of 2.
    fn object_stream_doc(n: usize, header: &str, members: &str) -> Vec<u8> {
        let mut out = b"%PDF-1.7\n".to_vec();
        let o1 = out.len();
        out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 3 0 R >>\nendobj\n");
        let objstm = format!("{header}{members}");
        let o2 = out.len();
        out.extend_from_slice(
            format!(
                "2 0 obj\n<< /Type /ObjStm /N {n} /First {} /Length {} >>\nstream\n{}\nendstream\nendobj\n",
                header.len(),
                objstm.len(),
                objstm
            )
            .as_bytes(),
        );
        let o5 = out.len();
        // W [1 2 1]: type, field2 (offset / stream id), field3 (gen / index)
        let mut rows: Vec<u8> = Vec::new();
        rows.extend_from_slice(&[0, 0, 0, 0xFF]);
        rows.extend_from_slice(&[1, (o1 >> 8) as u8, o1 as u8, 0]);
        rows.extend_from_slice(&[1, (o2 >> 8) as u8, o2 as u8, 0]);
        rows.extend_from_slice(&[2, 0, 2, 0]);
        rows.extend_from_slice(&[2, 0, 2, 1]);
        rows.extend_from_slice(&[1, (o5 >> 8) as u8, o5 as u8, 0]);
        out.extend_from_slice(
            format!(
                "5 0 obj\n<< /Type /XRef /Size 6 /W [1 2 1] /Root 1 0 R /Length {} >>\nstream\n",
                rows.len()
            )
            .as_bytes(),
        );
        out.extend_from_slice(&rows);
        out.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{o5}\n%%EOF\n").as_bytes());
        out
    }

    const PAGES_BODY: &str = "<< /Type /Pages /Kids [] /Count 0 >>";

    #[test]
    fn xref_stream_and_object_stream() {
        assert_eq!(PAGES_BODY.len(), 36);
        let graph =
            ObjectGraph::load(&object_stream_doc(2, "3 0 4 36 ", &format!("{PAGES_BODY}(four)")))
                .unwrap();
        let catalog = graph.catalog().unwrap();
        let pages = graph.resolve_dict(catalog.get("Pages").unwrap()).unwrap();
        assert_eq!(pages.type_name(), Some("Pages"));
        assert_eq!(
            graph.get(ObjectRef::new(4, 0)).unwrap(),
            &PdfValue::String(b"four".to_vec())
        );
    }

    #[test]
    fn object_stream_member_absent_from_header() {
        // xref places object 4 in stream 2, but /N lists only object 3
        let graph = ObjectGraph::load(&object_stream_doc(1, "3 0 ", PAGES_BODY)).unwrap();
        let pages = graph.get(ObjectRef::new(3, 0)).unwrap();
        assert_eq!(pages.as_dict().unwrap().type_name(), Some("Pages"));
        let err = graph.get(ObjectRef::new(4, 0)).unwrap_err();
        assert!(matches!(err, BackendError::Parse(msg) if msg.contains("missing from object stream")));
    }

    #[test]
    fn unreadable_object_stream_fails_only_its_members() {
        let mut data = object_stream_doc(2, "3 0 4 36 ", &format!("{PAGES_BODY}(four)"));
        let at = data.windows(6).position(|w| w == b"/First").unwrap();
        data[at..at + 6].copy_from_slice(b"/Frist");
        let graph = ObjectGraph::load(&data).unwrap();
        assert!(graph.catalog().is_ok());
        assert!(matches!(graph.get(ObjectRef::new(3, 0)), Err(BackendError::Parse(_))));
        assert!(matches!(graph.get(ObjectRef::new(4, 0)), Err(BackendError::Parse(_))));
    }

    #[test]
    fn unsupported_filter_is_an_error() {
        let data = build_pdf(
            &[
                "<< /Type /Catalog >>",
                "<< /Length 3 /Filter /DCTDecode >>\nstream\nabc\nendstream",
            ],
            "",
        );
        let graph = ObjectGraph::load(&data).unwrap();
        let stream = graph.get(ObjectRef::new(2, 0)).unwrap().as_stream().unwrap();
        assert_eq!(
            graph.decode_stream(stream),
            Err(BackendError::UnsupportedFilter("DCTDecode".to_string()))
        );
    }

    #[test]
    fn header_detection() {
        assert!(has_pdf_header(b"%PDF-1.4\n"));
        assert!(!has_pdf_header(b"hello"));
    }
}
