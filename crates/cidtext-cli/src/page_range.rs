/// Parse a page range string like "1,3-5" into sorted, deduplicated
/// 0-indexed page numbers.
///
/// Input is 1-indexed (user-facing). Page 0, pages past `page_count`,
/// reversed ranges and non-numeric parts are errors.
pub fn parse_page_range(input: &str, page_count: usize) -> Result<Vec<usize>, String> {
    let mut pages = Vec::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start = page_number(start, page_count)?;
                let end = page_number(end, page_count)?;
                if start > end {
                    return Err(format!("reversed page range: '{part}'"));
                }
                pages.extend(start - 1..end);
            }
            None => pages.push(page_number(part, page_count)? - 1),
        }
    }

    if pages.is_empty() {
        return Err(format!("no pages selected by '{input}'"));
    }
    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

/// A single 1-indexed page number, validated against `page_count`.
fn page_number(text: &str, page_count: usize) -> Result<usize, String> {
    let text = text.trim();
    let page: usize = text
        .parse()
        .map_err(|_| format!("invalid page number: '{text}'"))?;
    if page == 0 {
        return Err("page 0 is invalid (pages start at 1)".to_string());
    }
    if page > page_count {
        return Err(format!(
            "page {page} exceeds document page count ({page_count})"
        ));
    }
    Ok(page)
}
