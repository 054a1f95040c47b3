use std::path::Path;

use cidtext::{Document, TextRun};

use crate::cli::OutputFormat;
use crate::shared::{
    ProgressReporter, open_document, print_json_line, report_warnings, resolve_pages,
};

pub fn run(file: &Path, pages: Option<&str>, format: &OutputFormat) -> Result<(), i32> {
    let doc = open_document(file)?;
    let page_indices = resolve_pages(pages, doc.page_count())?;
    let progress = ProgressReporter::new(page_indices.len());

    match format {
        OutputFormat::Text => write_text(&doc, &page_indices, &progress),
        OutputFormat::Json => write_json(&doc, &page_indices, &progress),
    }
}

fn write_text(
    doc: &Document,
    page_indices: &[usize],
    progress: &ProgressReporter,
) -> Result<(), i32> {
    println!("page\tx\ty\tfont\tsize\ttext");

    for (i, &idx) in page_indices.iter().enumerate() {
        progress.report(i + 1);

        let page = match doc.page(idx) {
            Ok(page) => page,
            Err(e) => {
                eprintln!("Error on page {}: {e}", idx + 1);
                continue;
            }
        };
        report_warnings(page.warnings());

        for run in page.runs() {
            println!(
                "{}\t{:.2}\t{:.2}\t{}\t{:.2}\t{}",
                idx + 1,
                run.x,
                run.y,
                run.font_name,
                run.font_size,
                run.text,
            );
        }
    }

    progress.finish();
    Ok(())
}

fn run_to_json(run: &TextRun, page_num: usize) -> serde_json::Value {
    serde_json::json!({
        "page": page_num,
        "text": run.text,
        "x": run.x,
        "y": run.y,
        "font": run.font_name,
        "size": run.font_size,
    })
}

fn write_json(
    doc: &Document,
    page_indices: &[usize],
    progress: &ProgressReporter,
) -> Result<(), i32> {
    for (i, &idx) in page_indices.iter().enumerate() {
        progress.report(i + 1);

        let page = match doc.page(idx) {
            Ok(page) => page,
            Err(e) => {
                eprintln!("Error on page {}: {e}", idx + 1);
                continue;
            }
        };
        report_warnings(page.warnings());

        for run in page.runs() {
            print_json_line(&run_to_json(run, idx + 1))?;
        }
    }

    progress.finish();
    Ok(())
}
