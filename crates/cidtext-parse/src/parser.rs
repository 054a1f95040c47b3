//! Object parser on top of the shared lexer.
//!
//! Builds [`PdfValue`]s from tokens, including the `n g R` reference form,
//! and reads complete indirect objects (`n g obj … endobj`) with stream
//! payloads.

use tracing::warn;

use crate::error::BackendError;
use crate::lexer::{Lexer, Token, is_whitespace, next_token};
use crate::object::{Dictionary, ObjectRef, PdfStream, PdfValue};

/// Deepest array/dictionary nesting accepted before parsing gives up.
pub const MAX_NESTING: usize = 256;

/// Parse one value at the lexer's cursor.
pub fn parse_value(lexer: &mut Lexer<'_>) -> Result<PdfValue, BackendError> {
    parse_nested(lexer, 0)
}

fn parse_nested(lexer: &mut Lexer<'_>, depth: usize) -> Result<PdfValue, BackendError> {
    let offset = lexer.position();
    match lexer.next_token()? {
        Some(token) => nested_from_token(token, lexer, offset, depth),
        None => Err(BackendError::Parse(format!(
            "unexpected end of input at offset {offset}"
        ))),
    }
}

/// Continue parsing a value whose first token has already been read.
pub fn value_from_token(
    token: Token,
    lexer: &mut Lexer<'_>,
    offset: usize,
) -> Result<PdfValue, BackendError> {
    nested_from_token(token, lexer, offset, 0)
}

fn nested_from_token(
    token: Token,
    lexer: &mut Lexer<'_>,
    offset: usize,
    depth: usize,
) -> Result<PdfValue, BackendError> {
    if matches!(token, Token::ArrayStart | Token::DictStart) && depth >= MAX_NESTING {
        return Err(BackendError::Parse(format!(
            "nesting deeper than {MAX_NESTING} at offset {offset}"
        )));
    }
    match token {
        Token::Integer(n) => Ok(try_reference(n, lexer).unwrap_or(PdfValue::Integer(n))),
        Token::Real(r) => Ok(PdfValue::Real(r)),
        Token::LiteralString(s) | Token::HexString(s) => Ok(PdfValue::String(s)),
        Token::Name(n) => Ok(PdfValue::Name(n)),
        Token::ArrayStart => parse_array_body(lexer, depth + 1),
        Token::DictStart => dict_body(lexer, depth + 1).map(PdfValue::Dictionary),
        Token::Keyword(kw) => match kw.as_str() {
            "true" => Ok(PdfValue::Boolean(true)),
            "false" => Ok(PdfValue::Boolean(false)),
            "null" => Ok(PdfValue::Null),
            _ => Err(BackendError::Parse(format!(
                "unexpected keyword '{kw}' at offset {offset}"
            ))),
        },
        Token::ArrayEnd | Token::DictEnd => Err(BackendError::Parse(format!(
            "unexpected closing delimiter at offset {offset}"
        ))),
    }
}

/// `n g R` lookahead after reading the integer `n`.
///
/// Consumes the two extra tokens only when they complete a reference.
fn try_reference(id: i64, lexer: &mut Lexer<'_>) -> Option<PdfValue> {
    let input = lexer.input();
    let (second, after_second) = next_token(input, lexer.position()).ok()??;
    let Token::Integer(generation) = second else {
        return None;
    };
    let (third, after_third) = next_token(input, after_second).ok()??;
    if !third.is_keyword("R") {
        return None;
    }
    let id = u32::try_from(id).ok()?;
    let generation = u16::try_from(generation).ok()?;
    lexer.set_position(after_third);
    Some(PdfValue::Reference(ObjectRef::new(id, generation)))
}

fn parse_array_body(lexer: &mut Lexer<'_>, depth: usize) -> Result<PdfValue, BackendError> {
    let mut items = Vec::new();
    loop {
        let offset = lexer.position();
        match lexer.next_token()? {
            Some(Token::ArrayEnd) => return Ok(PdfValue::Array(items)),
            Some(token) => items.push(nested_from_token(token, lexer, offset, depth)?),
            None => return Err(BackendError::Parse("unterminated array".to_string())),
        }
    }
}

/// Parse dictionary entries after `<<` up to and including `>>`.
fn dict_body(lexer: &mut Lexer<'_>, depth: usize) -> Result<Dictionary, BackendError> {
    let mut dict = Dictionary::new();
    loop {
        let offset = lexer.position();
        match lexer.next_token()? {
            Some(Token::DictEnd) => return Ok(dict),
            Some(Token::Name(key)) => {
                let value = parse_nested(lexer, depth)?;
                // a null value is equivalent to an absent key
                if !value.is_null() {
                    dict.insert(key, value);
                }
            }
            Some(other) => {
                return Err(BackendError::Parse(format!(
                    "expected name key in dictionary at offset {offset}, found {other:?}"
                )));
            }
            None => return Err(BackendError::Parse("unterminated dictionary".to_string())),
        }
    }
}

/// Parse the indirect object whose header starts at `offset`.
///
/// `resolve_length` is asked for the value of an indirect `/Length`; it
/// returns `None` when the length object cannot be read, in which case the
/// payload is delimited by scanning for `endstream`.
pub fn parse_indirect_object(
    data: &[u8],
    offset: usize,
    resolve_length: &dyn Fn(ObjectRef) -> Option<i64>,
) -> Result<(ObjectRef, PdfValue), BackendError> {
    if offset >= data.len() {
        return Err(BackendError::Parse(format!(
            "object offset {offset} beyond end of file"
        )));
    }
    let mut lexer = Lexer::at(data, offset);
    let id = expect_integer(&mut lexer, "object number")?;
    let generation = expect_integer(&mut lexer, "generation number")?;
    match lexer.next_token()? {
        Some(t) if t.is_keyword("obj") => {}
        other => {
            return Err(BackendError::Parse(format!(
                "expected 'obj' at offset {offset}, found {other:?}"
            )));
        }
    }
    let obj_ref = ObjectRef::new(
        u32::try_from(id)
            .map_err(|_| BackendError::Parse(format!("invalid object number {id}")))?,
        u16::try_from(generation)
            .map_err(|_| BackendError::Parse(format!("invalid generation {generation}")))?,
    );

    let value = parse_value(&mut lexer)?;
    let value = match value {
        PdfValue::Dictionary(dict) if lexer.peek_token()?.is_some_and(|t| t.is_keyword("stream")) => {
            lexer.next_token()?;
            let declared = match dict.get("Length") {
                Some(PdfValue::Reference(r)) => resolve_length(*r),
                Some(v) => v.as_i64(),
                None => None,
            };
            let payload = read_stream_payload(data, lexer.position(), declared)?;
            PdfValue::Stream(PdfStream {
                dict,
                data: payload,
            })
        }
        other => other,
    };
    Ok((obj_ref, value))
}

fn expect_integer(lexer: &mut Lexer<'_>, what: &str) -> Result<i64, BackendError> {
    let offset = lexer.position();
    match lexer.next_token()? {
        Some(Token::Integer(n)) => Ok(n),
        other => Err(BackendError::Parse(format!(
            "expected {what} at offset {offset}, found {other:?}"
        ))),
    }
}

/// Read stream bytes following the `stream` keyword at `after_keyword`.
///
/// The declared length is trusted only when it stays inside the buffer and
/// is followed by `endstream`; otherwise the payload ends at the next
/// `endstream` keyword.
pub fn read_stream_payload(
    data: &[u8],
    after_keyword: usize,
    declared: Option<i64>,
) -> Result<Vec<u8>, BackendError> {
    let mut start = after_keyword;
    // the keyword is followed by CRLF or LF (a lone CR is tolerated)
    if data.get(start) == Some(&b'\r') {
        start += 1;
    }
    if data.get(start) == Some(&b'\n') {
        start += 1;
    }

    if let Some(len) = declared.and_then(|l| usize::try_from(l).ok()) {
        if let Some(end) = start.checked_add(len).filter(|&e| e <= data.len()) {
            let mut after = end;
            while after < data.len() && is_whitespace(data[after]) {
                after += 1;
            }
            if data[after..].starts_with(b"endstream") {
                return Ok(data[start..end].to_vec());
            }
        }
        warn!(
            declared = len,
            offset = start,
            "stream /Length does not match payload, scanning for endstream"
        );
    }

    let Some(found) = find_bytes(&data[start..], b"endstream") else {
        return Err(BackendError::Parse(format!(
            "stream at offset {start} has no endstream"
        )));
    };
    let mut end = start + found;
    if end > start && data[end - 1] == b'\n' {
        end -= 1;
    }
    if end > start && data[end - 1] == b'\r' {
        end -= 1;
    }
    Ok(data[start..end].to_vec())
}

/// Position of the first occurrence of `needle` in `haystack`.
pub fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Position of the last occurrence of `needle` in `haystack`.
pub fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
