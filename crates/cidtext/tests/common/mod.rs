//! Fixture writer for integration tests.
//!
//! Builds PDFs byte by byte with a correct cross-reference table. Fonts are
//! Type0 with Identity-H encoding and a ToUnicode CMap that maps codes
//! `0x0001..=0x005F` to U+0020..=U+007E, so printable ASCII text can be
//! shown with [`hex`].

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;

/// ToUnicode program for the fixture font.
pub const ASCII_TO_UNICODE: &str = "\
/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Fixture-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
<0001> <005F> <0020>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// Hex string operand showing `text` with the fixture font.
pub fn hex(text: &str) -> String {
    let mut out = String::from("<");
    for ch in text.chars() {
        let code = u32::from(ch).saturating_sub(0x1F);
        out.push_str(&format!("{code:04X}"));
    }
    out.push('>');
    out
}

#[derive(Debug, Default)]
pub struct PdfBuilder {
    objects: Vec<Option<Vec<u8>>>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an object number to fill later with [`set`](Self::set).
    pub fn reserve(&mut self) -> u32 {
        self.objects.push(None);
        self.objects.len() as u32
    }

    pub fn set(&mut self, id: u32, body: impl Into<Vec<u8>>) {
        self.objects[id as usize - 1] = Some(body.into());
    }

    pub fn add(&mut self, body: impl Into<Vec<u8>>) -> u32 {
        let id = self.reserve();
        self.set(id, body);
        id
    }

    pub fn stream(&mut self, dict_extra: &str, data: &[u8]) -> u32 {
        let mut body = format!("<< /Length {} {dict_extra} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.add(body)
    }

    pub fn flate_stream(&mut self, data: &[u8]) -> u32 {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();
        self.stream("/Filter /FlateDecode", &compressed)
    }

    /// Type0 font with the fixture ToUnicode map; returns the font object.
    pub fn type0_font(&mut self, base_font: &str) -> u32 {
        let to_unicode = self.stream("", ASCII_TO_UNICODE.as_bytes());
        let descendant = self.add(format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{base_font} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> /DW 500 >>"
        ));
        self.add(format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{base_font} /Encoding /Identity-H \
             /DescendantFonts [{descendant} 0 R] /ToUnicode {to_unicode} 0 R >>"
        ))
    }

    /// Serialize with object `root` as the catalog.
    pub fn finish(&self, root: u32) -> Vec<u8> {
        let mut out = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in self.objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body.as_deref().unwrap_or(b"null"));
            out.extend_from_slice(b"\nendobj\n");
        }
        let xref = out.len();
        out.extend_from_slice(
            format!("xref\n0 {}\n0000000000 65535 f \n", self.objects.len() + 1).as_bytes(),
        );
        for off in offsets {
            out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root {root} 0 R >>\nstartxref\n{xref}\n%%EOF\n",
                self.objects.len() + 1
            )
            .as_bytes(),
        );
        out
    }
}

/// A flat document: one Type0 font `/F1` on the root Pages node, one page
/// per content string.
pub fn document(contents: &[&str]) -> Vec<u8> {
    let mut b = PdfBuilder::new();
    let catalog = b.reserve();
    let pages = b.reserve();
    let font = b.type0_font("Fixture");
    let mut kids = Vec::new();
    for content in contents {
        let stream = b.stream("", content.as_bytes());
        kids.push(b.add(format!(
            "<< /Type /Page /Parent {pages} 0 R /Contents {stream} 0 R >>"
        )));
    }
    let kid_refs: Vec<String> = kids.iter().map(|k| format!("{k} 0 R")).collect();
    b.set(
        pages,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 {font} 0 R >> >> >>",
            kid_refs.join(" "),
            kids.len()
        ),
    );
    b.set(catalog, format!("<< /Type /Catalog /Pages {pages} 0 R >>"));
    b.finish(catalog)
}

/// A text object showing `text` at `(x, y)` with `/F1` at 12pt.
pub fn show_at(x: f64, y: f64, text: &str) -> String {
    format!("BT /F1 12 Tf 1 0 0 1 {x} {y} Tm {} Tj ET", hex(text))
}
