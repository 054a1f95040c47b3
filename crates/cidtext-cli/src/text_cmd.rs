use std::path::Path;

use cidtext::TextOptions;

use crate::cli::OutputFormat;
use crate::shared::{
    ProgressReporter, open_document, print_json_line, report_warnings, resolve_pages,
};

pub struct TextArgs<'a> {
    pub file: &'a Path,
    pub pages: Option<&'a str>,
    pub format: &'a OutputFormat,
    pub y_tolerance: f64,
    pub clip: bool,
    pub page_marker: bool,
}

pub fn run(args: &TextArgs<'_>) -> Result<(), i32> {
    let doc = open_document(args.file)?;
    let page_indices = resolve_pages(args.pages, doc.page_count())?;
    let progress = ProgressReporter::new(page_indices.len());

    let text_options = TextOptions {
        y_tolerance: args.y_tolerance,
        clip_to_page: args.clip,
    };

    for (i, &idx) in page_indices.iter().enumerate() {
        progress.report(i + 1);

        let page = match doc.extract_page(idx, &text_options) {
            Ok(page) => page,
            Err(e) => {
                eprintln!("Error on page {}: {e}", idx + 1);
                continue;
            }
        };

        match args.format {
            OutputFormat::Text => {
                report_warnings(&page.warnings);
                if args.page_marker {
                    println!("--- Page {} ---", idx + 1);
                }
                println!("{}", page.text());
            }
            OutputFormat::Json => {
                let warnings = serde_json::to_value(&page.warnings).map_err(|e| {
                    eprintln!("Error: failed to serialize warnings: {e}");
                    1
                })?;
                print_json_line(&serde_json::json!({
                    "page": idx + 1,
                    "text": page.text(),
                    "warnings": warnings,
                }))?;
            }
        }
    }

    progress.finish();
    Ok(())
}
