//! Shared PDF lexer.
//!
//! Turns raw bytes into primitive tokens. The same lexer feeds the object
//! parser, the ToUnicode CMap parser and the content stream tokenizer.

use crate::error::BackendError;

/// A primitive PDF token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Integer(i64),
    Real(f64),
    /// Literal string `( … )`, escapes decoded.
    LiteralString(Vec<u8>),
    /// Hex string `< … >`, decoded to bytes.
    HexString(Vec<u8>),
    /// Name without the leading `/`.
    Name(String),
    DictStart,
    DictEnd,
    ArrayStart,
    ArrayEnd,
    /// Any other run of regular characters: `obj`, `R`, `true`, `Tj`, `T*`, `'`, …
    Keyword(String),
}

impl Token {
    pub fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Token::Keyword(k) if k == kw)
    }
}

/// Returns `true` if `b` is a PDF whitespace character.
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

/// Returns `true` if `b` is a PDF delimiter character.
pub fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Skip whitespace and comments.
pub fn skip_whitespace_and_comments(input: &[u8], pos: &mut usize) {
    while *pos < input.len() {
        if is_whitespace(input[*pos]) {
            *pos += 1;
        } else if input[*pos] == b'%' {
            while *pos < input.len() && input[*pos] != b'\n' && input[*pos] != b'\r' {
                *pos += 1;
            }
        } else {
            break;
        }
    }
}

/// Read the token starting at or after `pos`.
///
/// Returns the token and the cursor just past it, or `None` at end of input.
pub fn next_token(input: &[u8], pos: usize) -> Result<Option<(Token, usize)>, BackendError> {
    let mut pos = pos;
    skip_whitespace_and_comments(input, &mut pos);
    if pos >= input.len() {
        return Ok(None);
    }

    let start = pos;
    let token = match input[pos] {
        b'(' => Token::LiteralString(read_literal_string(input, &mut pos)?),
        b'<' if input.get(pos + 1) == Some(&b'<') => {
            pos += 2;
            Token::DictStart
        }
        b'<' => Token::HexString(read_hex_string(input, &mut pos)?),
        b'>' if input.get(pos + 1) == Some(&b'>') => {
            pos += 2;
            Token::DictEnd
        }
        b'>' => return Err(malformed(start, "stray '>'")),
        b')' => return Err(malformed(start, "stray ')'")),
        b'[' => {
            pos += 1;
            Token::ArrayStart
        }
        b']' => {
            pos += 1;
            Token::ArrayEnd
        }
        b'{' | b'}' => {
            pos += 1;
            Token::Keyword((input[start] as char).to_string())
        }
        b'/' => Token::Name(read_name(input, &mut pos)),
        _ => {
            let raw = read_regular(input, &mut pos);
            classify_regular(raw)
        }
    };
    Ok(Some((token, pos)))
}

/// Cursor over a byte buffer.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    pub fn at(input: &'a [u8], pos: usize) -> Self {
        Self { input, pos }
    }

    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, BackendError> {
        match next_token(self.input, self.pos)? {
            Some((token, end)) => {
                self.pos = end;
                Ok(Some(token))
            }
            None => {
                self.pos = self.input.len();
                Ok(None)
            }
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&self) -> Result<Option<Token>, BackendError> {
        Ok(next_token(self.input, self.pos)?.map(|(t, _)| t))
    }

    pub fn skip_whitespace(&mut self) {
        skip_whitespace_and_comments(self.input, &mut self.pos);
    }
}

fn malformed(offset: usize, reason: &str) -> BackendError {
    BackendError::MalformedToken {
        offset,
        reason: reason.to_string(),
    }
}

fn read_regular<'a>(input: &'a [u8], pos: &mut usize) -> &'a [u8] {
    let start = *pos;
    while *pos < input.len() && !is_whitespace(input[*pos]) && !is_delimiter(input[*pos]) {
        *pos += 1;
    }
    &input[start..*pos]
}

/// Numbers become Integer/Real; everything else is a keyword.
fn classify_regular(raw: &[u8]) -> Token {
    let text = String::from_utf8_lossy(raw);
    let looks_numeric = raw
        .first()
        .is_some_and(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.'))
        && raw
            .iter()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.'));
    if looks_numeric {
        if !raw.contains(&b'.') {
            if let Ok(n) = text.parse::<i64>() {
                return Token::Integer(n);
            }
        }
        if let Ok(r) = text.parse::<f64>() {
            return Token::Real(r);
        }
    }
    Token::Keyword(text.into_owned())
}

/// Parse a literal string `(...)` with balanced parentheses and escape sequences.
fn read_literal_string(input: &[u8], pos: &mut usize) -> Result<Vec<u8>, BackendError> {
    let start = *pos;
    *pos += 1;

    let mut result = Vec::new();
    let mut depth = 1u32;

    while *pos < input.len() {
        let b = input[*pos];
        match b {
            b'(' => {
                depth += 1;
                result.push(b'(');
                *pos += 1;
            }
            b')' => {
                depth -= 1;
                *pos += 1;
                if depth == 0 {
                    return Ok(result);
                }
                result.push(b')');
            }
            b'\r' => {
                // an unescaped EOL inside a string reads as a single LF
                result.push(b'\n');
                *pos += 1;
                if input.get(*pos) == Some(&b'\n') {
                    *pos += 1;
                }
            }
            b'\\' => {
                *pos += 1;
                let Some(&escaped) = input.get(*pos) else {
                    break;
                };
                match escaped {
                    b'n' => result.push(b'\n'),
                    b'r' => result.push(b'\r'),
                    b't' => result.push(b'\t'),
                    b'b' => result.push(0x08),
                    b'f' => result.push(0x0C),
                    b'(' | b')' | b'\\' => result.push(escaped),
                    b'\r' => {
                        *pos += 1;
                        if input.get(*pos) == Some(&b'\n') {
                            *pos += 1;
                        }
                        continue;
                    }
                    b'\n' => {
                        *pos += 1;
                        continue;
                    }
                    b'0'..=b'7' => {
                        let mut val = u16::from(escaped - b'0');
                        for _ in 0..2 {
                            match input.get(*pos + 1) {
                                Some(&d @ b'0'..=b'7') => {
                                    *pos += 1;
                                    val = val * 8 + u16::from(d - b'0');
                                }
                                _ => break,
                            }
                        }
                        // high-order overflow is ignored
                        result.push((val & 0xFF) as u8);
                    }
                    _ => result.push(escaped),
                }
                *pos += 1;
            }
            _ => {
                result.push(b);
                *pos += 1;
            }
        }
    }

    Err(malformed(start, "unterminated literal string"))
}

/// Parse a hex string `<...>`.
fn read_hex_string(input: &[u8], pos: &mut usize) -> Result<Vec<u8>, BackendError> {
    let start = *pos;
    *pos += 1;

    let mut nibbles = Vec::new();
    loop {
        let Some(&b) = input.get(*pos) else {
            return Err(malformed(start, "unterminated hex string"));
        };
        *pos += 1;
        if b == b'>' {
            break;
        }
        if is_whitespace(b) {
            continue;
        }
        match hex_value(b) {
            Some(v) => nibbles.push(v),
            None => {
                return Err(malformed(
                    *pos - 1,
                    &format!("invalid hex digit {:?}", b as char),
                ));
            }
        }
    }

    if nibbles.len() % 2 != 0 {
        nibbles.push(0);
    }
    Ok(nibbles.chunks(2).map(|c| (c[0] << 4) | c[1]).collect())
}

/// Value of an ASCII hex digit.
pub fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Parse a `/Name` token. Assumes current byte is `/`.
fn read_name(input: &[u8], pos: &mut usize) -> String {
    *pos += 1;
    let raw = read_regular(input, pos);

    let mut name = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            if let (Some(hi), Some(lo)) = (hex_value(raw[i + 1]), hex_value(raw[i + 2])) {
                name.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        name.push(raw[i]);
        i += 1;
    }

    String::from_utf8_lossy(&name).into_owned()
}
