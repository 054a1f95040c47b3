//! Helpers shared by unit tests.

/// Assemble a PDF from object bodies; objects are numbered from 1 and the
/// trailer's `/Root` is object 1.
pub fn build_pdf(bodies: &[&str], trailer_extra: &str) -> Vec<u8> {
    let mut out = b"%PDF-1.7\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in bodies.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = out.len();
    out.extend_from_slice(
        format!("xref\n0 {}\n0000000000 65535 f \n", bodies.len() + 1).as_bytes(),
    );
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R {} >>\nstartxref\n{}\n%%EOF\n",
            bodies.len() + 1,
            trailer_extra,
            xref_at
        )
        .as_bytes(),
    );
    out
}

/// A stream object body with a correct `/Length`.
pub fn stream_body(dict_extra: &str, content: &str) -> String {
    format!(
        "<< /Length {} {} >>\nstream\n{}\nendstream",
        content.len(),
        dict_extra,
        content
    )
}
