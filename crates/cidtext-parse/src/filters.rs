//! Stream decode filters.
//!
//! Supports `FlateDecode` (with PNG and TIFF predictors), `ASCIIHexDecode`
//! and `ASCII85Decode`. Any other filter is rejected.

use std::io::Read;

use cidtext_core::PdfError;
use flate2::read::ZlibDecoder;

use crate::error::BackendError;
use crate::lexer::{hex_value, is_whitespace};
use crate::object::{Dictionary, PdfValue};

/// A filter this crate can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Flate,
    AsciiHex,
    Ascii85,
}

impl Filter {
    /// Map a `/Filter` name, including the abbreviated inline-image forms.
    pub fn from_name(name: &str) -> Result<Self, BackendError> {
        match name {
            "FlateDecode" | "Fl" => Ok(Filter::Flate),
            "ASCIIHexDecode" | "AHx" => Ok(Filter::AsciiHex),
            "ASCII85Decode" | "A85" => Ok(Filter::Ascii85),
            other => Err(BackendError::UnsupportedFilter(other.to_string())),
        }
    }
}

/// Apply a filter chain in order, each filter with its own `/DecodeParms`.
pub fn decode(
    data: &[u8],
    filters: &[(Filter, Option<&Dictionary>)],
    max_bytes: usize,
) -> Result<Vec<u8>, BackendError> {
    let mut current = data.to_vec();
    for (filter, parms) in filters {
        current = match filter {
            Filter::Flate => {
                let inflated = flate_decode(&current, max_bytes)?;
                apply_predictor(inflated, *parms)?
            }
            Filter::AsciiHex => ascii_hex_decode(&current)?,
            Filter::Ascii85 => ascii85_decode(&current)?,
        };
        check_limit(current.len(), max_bytes)?;
    }
    Ok(current)
}

fn check_limit(len: usize, max_bytes: usize) -> Result<(), BackendError> {
    if len > max_bytes {
        return Err(BackendError::Core(PdfError::ResourceLimitExceeded {
            limit_name: "max_stream_bytes".to_string(),
            limit_value: max_bytes,
            actual_value: len,
        }));
    }
    Ok(())
}

fn flate_decode(data: &[u8], max_bytes: usize) -> Result<Vec<u8>, BackendError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = decoder
            .read(&mut buf)
            .map_err(|e| BackendError::Decode(format!("FlateDecode error: {e}")))?;
        if n == 0 {
            break;
        }
        check_limit(out.len().saturating_add(n), max_bytes)?;
        out.extend_from_slice(&buf[..n]);
    }
    Ok(out)
}

fn parm(parms: Option<&Dictionary>, key: &str, default: i64) -> i64 {
    parms
        .and_then(|p| p.get(key))
        .and_then(PdfValue::as_i64)
        .unwrap_or(default)
}

fn apply_predictor(data: Vec<u8>, parms: Option<&Dictionary>) -> Result<Vec<u8>, BackendError> {
    let predictor = parm(parms, "Predictor", 1);
    if predictor == 1 || data.is_empty() {
        return Ok(data);
    }
    let layout = RowLayout::from_parms(parms, data.len())?;
    match predictor {
        2 => Ok(apply_tiff_predictor(&data, layout)),
        10..=15 => apply_png_predictor(&data, layout),
        other => Err(BackendError::Decode(format!("unknown predictor {other}"))),
    }
}

/// Row geometry from `/Colors`, `/Columns` and `/BitsPerComponent`.
#[derive(Debug, Clone, Copy)]
struct RowLayout {
    /// Bytes per row, excluding any PNG filter byte.
    row_bytes: usize,
    /// Bytes per pixel, at least 1.
    bpp: usize,
    bits: usize,
}

impl RowLayout {
    /// A row can never be wider than the data it describes.
    fn from_parms(parms: Option<&Dictionary>, data_len: usize) -> Result<Self, BackendError> {
        let positive = |key: &str, default: i64| {
            usize::try_from(parm(parms, key, default).max(1))
                .map_err(|_| BackendError::Decode(format!("predictor /{key} out of range")))
        };
        let colors = positive("Colors", 1)?;
        let bits = positive("BitsPerComponent", 8)?;
        let columns = positive("Columns", 1)?;

        let pixel_bits = colors
            .checked_mul(bits)
            .ok_or_else(|| BackendError::Decode("predictor pixel size overflows".to_string()))?;
        let row_bits = pixel_bits
            .checked_mul(columns)
            .ok_or_else(|| BackendError::Decode("predictor row size overflows".to_string()))?;
        let row_bytes = row_bits.div_ceil(8);
        if row_bytes > data_len {
            return Err(BackendError::Decode(format!(
                "predictor row of {row_bytes} bytes exceeds {data_len} bytes of data"
            )));
        }
        Ok(RowLayout {
            row_bytes,
            bpp: (pixel_bits / 8).max(1),
            bits,
        })
    }
}

/// TIFF predictor 2 (horizontal differencing). Only 8-bit components are undone.
fn apply_tiff_predictor(data: &[u8], layout: RowLayout) -> Vec<u8> {
    if layout.bits != 8 {
        return data.to_vec();
    }
    let bpp = layout.bpp;
    let mut out = Vec::with_capacity(data.len());
    for row in data.chunks(layout.row_bytes) {
        let start = out.len();
        for (i, &b) in row.iter().enumerate() {
            let v = if i >= bpp {
                b.wrapping_add(out[start + i - bpp])
            } else {
                b
            };
            out.push(v);
        }
    }
    out
}

/// PNG predictors: each row carries its own filter type byte.
fn apply_png_predictor(data: &[u8], layout: RowLayout) -> Result<Vec<u8>, BackendError> {
    let RowLayout { row_bytes, bpp, .. } = layout;
    let row_size = row_bytes + 1;

    let mut result = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_bytes];

    for row in data.chunks(row_size) {
        if row.len() < row_size {
            break;
        }
        let filter_type = row[0];
        let raw = &row[1..];
        let mut current = vec![0u8; row_bytes];

        match filter_type {
            0 => current.copy_from_slice(raw),
            1 => {
                for i in 0..row_bytes {
                    let left = if i >= bpp { current[i - bpp] } else { 0 };
                    current[i] = raw[i].wrapping_add(left);
                }
            }
            2 => {
                for i in 0..row_bytes {
                    current[i] = raw[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                for i in 0..row_bytes {
                    let left = if i >= bpp { u16::from(current[i - bpp]) } else { 0 };
                    let above = u16::from(prev_row[i]);
                    current[i] = raw[i].wrapping_add(((left + above) / 2) as u8);
                }
            }
            4 => {
                for i in 0..row_bytes {
                    let left = if i >= bpp { current[i - bpp] } else { 0 };
                    let upper_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
                    current[i] = raw[i].wrapping_add(paeth(left, prev_row[i], upper_left));
                }
            }
            other => {
                return Err(BackendError::Decode(format!(
                    "invalid PNG row filter {other}"
                )));
            }
        }

        result.extend_from_slice(&current);
        prev_row = current;
    }

    Ok(result)
}

const fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i32 + b as i32 - c as i32;
    let pa = (p - a as i32).abs();
    let pb = (p - b as i32).abs();
    let pc = (p - c as i32).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>, BackendError> {
    let mut nibbles = Vec::with_capacity(data.len());
    for &b in data {
        if b == b'>' {
            break;
        }
        if is_whitespace(b) {
            continue;
        }
        let v = hex_value(b).ok_or_else(|| {
            BackendError::Decode(format!("ASCIIHexDecode: invalid digit {:?}", b as char))
        })?;
        nibbles.push(v);
    }
    if nibbles.len() % 2 != 0 {
        nibbles.push(0);
    }
    Ok(nibbles.chunks(2).map(|c| (c[0] << 4) | c[1]).collect())
}

fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>, BackendError> {
    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut n = 0;

    let mut bytes = data;
    if bytes.starts_with(b"<~") {
        bytes = &bytes[2..];
    }

    for &b in bytes {
        match b {
            b'~' => break,
            b'z' if n == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[n] = b - b'!';
                n += 1;
                if n == 5 {
                    out.extend_from_slice(&ascii85_group(&group)?);
                    n = 0;
                }
            }
            _ if is_whitespace(b) => {}
            _ => {
                return Err(BackendError::Decode(format!(
                    "ASCII85Decode: invalid byte 0x{b:02X}"
                )));
            }
        }
    }

    if n == 1 {
        return Err(BackendError::Decode(
            "ASCII85Decode: truncated final group".to_string(),
        ));
    }
    if n > 1 {
        // pad with 'u' and keep n-1 bytes
        for slot in group.iter_mut().skip(n) {
            *slot = b'u' - b'!';
        }
        let decoded = ascii85_group(&group)?;
        out.extend_from_slice(&decoded[..n - 1]);
    }
    Ok(out)
}

fn ascii85_group(group: &[u8; 5]) -> Result<[u8; 4], BackendError> {
    let value = group
        .iter()
        .fold(0u64, |acc, &digit| acc * 85 + u64::from(digit));
    let value = u32::try_from(value)
        .map_err(|_| BackendError::Decode("ASCII85Decode: group overflow".to_string()))?;
    Ok(value.to_be_bytes())
}
