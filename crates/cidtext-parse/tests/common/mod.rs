//! Byte-level PDF writer for pipeline tests.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;

#[derive(Debug, Default)]
pub struct PdfBuilder {
    objects: Vec<Option<Vec<u8>>>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

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
        self.stream("/Filter /FlateDecode", &encoder.finish().unwrap())
    }

    /// Type0 font whose ToUnicode stream is `cmap` and whose descendant has
    /// `/DW 600`.
    pub fn type0_font(&mut self, cmap: &str) -> u32 {
        let to_unicode = self.stream("", cmap.as_bytes());
        let descendant = self.add(
            "<< /Type /Font /Subtype /CIDFontType0 /BaseFont /Fixture \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> /DW 600 >>",
        );
        self.add(format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /Fixture /Encoding /Identity-H \
             /DescendantFonts [{descendant} 0 R] /ToUnicode {to_unicode} 0 R >>"
        ))
    }

    pub fn finish(&self, root: u32) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in self.objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body.as_deref().unwrap_or(b"null"));
            out.extend_from_slice(b"\nendobj\n");
        }
        let xref = out.len();
        let size = self.objects.len() + 1;
        out.extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());
        for off in offsets {
            out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!("trailer\n<< /Size {size} /Root {root} 0 R >>\nstartxref\n{xref}\n%%EOF\n")
                .as_bytes(),
        );
        out
    }
}

/// Wrap bfchar/bfrange sections in the usual CMap boilerplate.
pub fn to_unicode(body: &str) -> String {
    format!(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n\
         {body}\nendcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n"
    )
}

/// ASCII through codes `0x0001..=0x005E` starting at space.
pub fn ascii_cmap() -> String {
    to_unicode("1 beginbfrange\n<0001> <005E> <0020>\nendbfrange")
}

/// Hex operand for `text` under [`ascii_cmap`].
pub fn encode(text: &str) -> String {
    let codes: String = text
        .chars()
        .map(|c| format!("{:04X}", u32::from(c).saturating_sub(0x1F)))
        .collect();
    format!("<{codes}>")
}

/// One-page document with `/F1` bound to a Type0 font using `cmap`.
pub fn one_page(content: &[u8], cmap: &str) -> Vec<u8> {
    let mut b = PdfBuilder::new();
    let catalog = b.reserve();
    let pages = b.reserve();
    let font = b.type0_font(cmap);
    let stream = b.stream("", content);
    let page = b.add(format!(
        "<< /Type /Page /Parent {pages} 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 {font} 0 R >> >> /Contents {stream} 0 R >>"
    ));
    b.set(
        pages,
        format!("<< /Type /Pages /Kids [{page} 0 R] /Count 1 >>"),
    );
    b.set(catalog, format!("<< /Type /Catalog /Pages {pages} 0 R >>"));
    b.finish(catalog)
}
