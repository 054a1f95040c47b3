//! PDF fixtures written byte by byte for the CLI tests.

#![allow(dead_code)]

use std::io::Write;

const TO_UNICODE: &str = "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n\
1 beginbfrange\n<0001> <005F> <0020>\nendbfrange\n\
endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n";

/// Hex operand for printable ASCII under the fixture CMap.
pub fn hex(text: &str) -> String {
    let codes: String = text
        .chars()
        .map(|c| format!("{:04X}", u32::from(c).saturating_sub(0x1F)))
        .collect();
    format!("<{codes}>")
}

/// Text object placing `text` at `(x, y)` in 12pt `/F1`.
pub fn show_at(x: f64, y: f64, text: &str) -> String {
    format!("BT /F1 12 Tf {x} {y} Td {} Tj ET", hex(text))
}

/// Page content, or a dangling `/Contents` reference.
pub enum PageSpec<'a> {
    Content(&'a str),
    Dangling,
}

/// Serialize a document whose pages share one Type0 font `/F1`. With
/// `simple_font`, `/F1` is a Type1 font instead and codes come out raw.
pub fn build(pages: &[PageSpec<'_>], simple_font: bool) -> Vec<u8> {
    let mut bodies: Vec<Vec<u8>> = Vec::new();
    // 1 catalog, 2 pages root, 3 font, 4 descendant, 5 ToUnicode
    bodies.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    bodies.push(Vec::new());
    if simple_font {
        bodies.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec());
    } else {
        bodies.push(
            b"<< /Type /Font /Subtype /Type0 /BaseFont /Fixture /Encoding /Identity-H \
              /DescendantFonts [4 0 R] /ToUnicode 5 0 R >>"
                .to_vec(),
        );
    }
    bodies.push(
        b"<< /Type /Font /Subtype /CIDFontType2 /BaseFont /Fixture \
          /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> >>"
            .to_vec(),
    );
    bodies.push(stream(TO_UNICODE.as_bytes()));

    let mut kids = Vec::new();
    for spec in pages {
        let contents = match spec {
            PageSpec::Content(content) => {
                bodies.push(stream(content.as_bytes()));
                format!("{} 0 R", bodies.len())
            }
            PageSpec::Dangling => "999 0 R".to_string(),
        };
        bodies.push(
            format!("<< /Type /Page /Parent 2 0 R /Contents {contents} >>").into_bytes(),
        );
        kids.push(format!("{} 0 R", bodies.len()));
    }
    bodies[1] = format!(
        "<< /Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 3 0 R >> >> >>",
        kids.join(" "),
        kids.len()
    )
    .into_bytes();

    let mut out = b"%PDF-1.7\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in bodies.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }
    let xref = out.len();
    let size = bodies.len() + 1;
    out.extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!("trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n").as_bytes(),
    );
    out
}

/// One page per content string with the Type0 fixture font.
pub fn pdf_with_pages(contents: &[&str]) -> Vec<u8> {
    let specs: Vec<PageSpec<'_>> = contents.iter().map(|c| PageSpec::Content(c)).collect();
    build(&specs, false)
}

fn stream(data: &[u8]) -> Vec<u8> {
    let mut body = format!("<< /Length {} >>\nstream\n", data.len()).into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
}

pub fn write_temp_pdf(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    f.write_all(bytes).unwrap();
    f.flush().unwrap();
    f
}
