//! Content stream tokenizer.
//!
//! Parses content stream bytes into [`Operation`]s. Operands are collected
//! on a stack by the shared lexer and cleared at every operator; the text
//! operators become typed variants and everything else is kept by name as
//! [`Operation::Ignored`].

use cidtext_core::{Ctm, PdfError};
use tracing::debug;

use crate::error::BackendError;
use crate::lexer::{Lexer, Token, is_delimiter, is_whitespace};
use crate::object::PdfValue;
use crate::parser::value_from_token;

/// One element of a `TJ` array.
#[derive(Debug, Clone, PartialEq)]
pub enum TextElement {
    Text(Vec<u8>),
    /// Adjustment in thousandths of text space; positive moves left.
    Adjust(f64),
}

/// A content stream operator with its operands, type checked.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// `BT`
    BeginText,
    /// `ET`
    EndText,
    /// `Tf`
    SetFont { name: String, size: f64 },
    /// `Td`
    MoveText { tx: f64, ty: f64 },
    /// `TD`
    MoveTextSetLeading { tx: f64, ty: f64 },
    /// `Tm`
    SetTextMatrix(Ctm),
    /// `T*`
    NextLine,
    /// `TL`
    SetLeading(f64),
    /// `Tc`
    SetCharSpacing(f64),
    /// `Tw`
    SetWordSpacing(f64),
    /// `Tz`
    SetHorizontalScaling(f64),
    /// `Tj`
    ShowText(Vec<u8>),
    /// `'`
    NextLineShowText(Vec<u8>),
    /// `"`
    NextLineShowTextSpaced {
        word_spacing: f64,
        char_spacing: f64,
        text: Vec<u8>,
    },
    /// `TJ`
    ShowTextArray(Vec<TextElement>),
    /// `cm`
    ConcatMatrix(Ctm),
    /// `q`
    SaveState,
    /// `Q`
    RestoreState,
    /// Any other operator, or a known one with unusable operands.
    Ignored(String),
}

impl Operation {
    /// Build the operation for `name` from its operand stack.
    pub fn from_operator(name: &str, operands: &[PdfValue]) -> Self {
        let op = match name {
            "BT" => Some(Self::BeginText),
            "ET" => Some(Self::EndText),
            "T*" => Some(Self::NextLine),
            "q" => Some(Self::SaveState),
            "Q" => Some(Self::RestoreState),
            "Tf" => match operands {
                [PdfValue::Name(font), size] => size.as_f64().map(|size| Self::SetFont {
                    name: font.clone(),
                    size,
                }),
                _ => None,
            },
            "Td" => numbers::<2>(operands).map(|[tx, ty]| Self::MoveText { tx, ty }),
            "TD" => numbers::<2>(operands).map(|[tx, ty]| Self::MoveTextSetLeading { tx, ty }),
            "Tm" => numbers::<6>(operands).map(|m| Self::SetTextMatrix(matrix(m))),
            "cm" => numbers::<6>(operands).map(|m| Self::ConcatMatrix(matrix(m))),
            "TL" => numbers::<1>(operands).map(|[v]| Self::SetLeading(v)),
            "Tc" => numbers::<1>(operands).map(|[v]| Self::SetCharSpacing(v)),
            "Tw" => numbers::<1>(operands).map(|[v]| Self::SetWordSpacing(v)),
            "Tz" => numbers::<1>(operands).map(|[v]| Self::SetHorizontalScaling(v)),
            "Tj" => match operands {
                [PdfValue::String(s)] => Some(Self::ShowText(s.clone())),
                _ => None,
            },
            "'" => match operands {
                [PdfValue::String(s)] => Some(Self::NextLineShowText(s.clone())),
                _ => None,
            },
            "\"" => match operands {
                [aw, ac, PdfValue::String(s)] => match (aw.as_f64(), ac.as_f64()) {
                    (Some(word_spacing), Some(char_spacing)) => {
                        Some(Self::NextLineShowTextSpaced {
                            word_spacing,
                            char_spacing,
                            text: s.clone(),
                        })
                    }
                    _ => None,
                },
                _ => None,
            },
            "TJ" => match operands {
                [PdfValue::Array(items)] => text_elements(items).map(Self::ShowTextArray),
                _ => None,
            },
            _ => return Self::Ignored(name.to_string()),
        };
        op.unwrap_or_else(|| {
            debug!(
                operator = name,
                operands = operands.len(),
                "operator with unusable operands ignored"
            );
            Self::Ignored(name.to_string())
        })
    }

}

fn numbers<const N: usize>(operands: &[PdfValue]) -> Option<[f64; N]> {
    if operands.len() != N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, value) in out.iter_mut().zip(operands) {
        *slot = value.as_f64()?;
    }
    Some(out)
}

fn matrix([a, b, c, d, e, f]: [f64; 6]) -> Ctm {
    Ctm::new(a, b, c, d, e, f)
}

fn text_elements(items: &[PdfValue]) -> Option<Vec<TextElement>> {
    items
        .iter()
        .map(|item| match item {
            PdfValue::String(s) => Some(TextElement::Text(s.clone())),
            other => other.as_f64().map(TextElement::Adjust),
        })
        .collect()
}

/// Tokenize a content stream into operations, stopping as soon as more
/// than `max_operations` have been read.
///
/// # Errors
///
/// Returns [`BackendError::MalformedToken`] for bytes the lexer cannot
/// read, [`BackendError::Parse`] for unbalanced delimiters and
/// [`PdfError::ResourceLimitExceeded`] once the operation count passes
/// `max_operations`.
pub fn parse_operations(
    input: &[u8],
    max_operations: usize,
) -> Result<Vec<Operation>, BackendError> {
    let mut lexer = Lexer::new(input);
    let mut ops = Vec::new();
    let mut operands: Vec<PdfValue> = Vec::new();

    loop {
        let offset = lexer.position();
        let Some(token) = lexer.next_token()? else {
            break;
        };
        match token {
            Token::Keyword(kw) => match kw.as_str() {
                "true" => operands.push(PdfValue::Boolean(true)),
                "false" => operands.push(PdfValue::Boolean(false)),
                "null" => operands.push(PdfValue::Null),
                "BI" => {
                    skip_inline_image(&mut lexer)?;
                    operands.clear();
                    ops.push(Operation::Ignored("BI".to_string()));
                }
                _ => {
                    ops.push(Operation::from_operator(&kw, &operands));
                    operands.clear();
                }
            },
            other => operands.push(value_from_token(other, &mut lexer, offset)?),
        }
        if ops.len() > max_operations {
            return Err(BackendError::Core(PdfError::ResourceLimitExceeded {
                limit_name: "max_operations_per_page".to_string(),
                limit_value: max_operations,
                actual_value: ops.len(),
            }));
        }
    }

    if !operands.is_empty() {
        debug!(count = operands.len(), "trailing operands without operator");
    }
    Ok(ops)
}

/// Skip `… ID <data> EI` after a `BI` keyword.
fn skip_inline_image(lexer: &mut Lexer<'_>) -> Result<(), BackendError> {
    loop {
        match lexer.next_token()? {
            Some(Token::Keyword(kw)) if kw == "ID" => break,
            Some(_) => {}
            None => {
                return Err(BackendError::Parse(
                    "unterminated inline image (missing ID)".to_string(),
                ));
            }
        }
    }

    let input = lexer.input();
    // a single whitespace byte separates ID from the data
    let data_start = (lexer.position() + 1).min(input.len());
    let mut pos = data_start;
    while pos + 2 <= input.len() {
        let preceded = pos == data_start || is_whitespace(input[pos - 1]);
        let followed = input
            .get(pos + 2)
            .is_none_or(|&b| is_whitespace(b) || is_delimiter(b));
        if preceded && followed && &input[pos..pos + 2] == b"EI" {
            lexer.set_position(pos + 2);
            return Ok(());
        }
        pos += 1;
    }
    Err(BackendError::Parse(
        "unterminated inline image (missing EI)".to_string(),
    ))
}
