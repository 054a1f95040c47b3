use std::collections::BTreeMap;

use crate::geometry::BBox;
use crate::text::{PageText, TextRun};

/// Options for ordering text runs into lines.
#[derive(Debug, Clone)]
pub struct TextOptions {
    /// Vertical tolerance for grouping runs into the same line (in points).
    pub y_tolerance: f64,
    /// If true, drop runs whose origin lies outside the page's CropBox
    /// (MediaBox when there is no CropBox).
    pub clip_to_page: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            y_tolerance: 3.0,
            clip_to_page: false,
        }
    }
}

/// A line of runs sharing a baseline, sorted left-to-right.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLine<'a> {
    /// y of the run that opened the line.
    pub y: f64,
    pub runs: Vec<&'a TextRun>,
}

impl RunLine<'_> {
    /// Run texts concatenated without separators.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Cluster runs into lines.
///
/// Runs are sorted by descending y (stable, so emission order breaks ties).
/// A run joins the current line while its y differs from the y of the run
/// that opened the line by less than `y_tolerance`; otherwise it opens a new
/// line. Runs within a line are then sorted by ascending x. Runs with empty
/// text are skipped.
pub fn cluster_runs_into_lines(runs: &[TextRun], y_tolerance: f64) -> Vec<RunLine<'_>> {
    let mut sorted: Vec<&TextRun> = runs.iter().filter(|r| !r.text.is_empty()).collect();
    sorted.sort_by(|a, b| b.y.total_cmp(&a.y));

    let mut lines: Vec<RunLine<'_>> = Vec::new();
    for run in sorted {
        match lines.last_mut() {
            Some(line) if (run.y - line.y).abs() < y_tolerance => line.runs.push(run),
            _ => lines.push(RunLine {
                y: run.y,
                runs: vec![run],
            }),
        }
    }

    for line in &mut lines {
        line.runs.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    lines
}

/// Order one page's runs into text lines, top to bottom.
///
/// `index` is only used to select runs; runs belonging to other pages are
/// ignored.
pub fn assemble_page(index: usize, runs: &[TextRun], options: &TextOptions) -> Vec<String> {
    let page_runs: Vec<TextRun> = runs
        .iter()
        .filter(|r| r.page_index == index)
        .cloned()
        .collect();
    cluster_runs_into_lines(&page_runs, options.y_tolerance)
        .iter()
        .map(RunLine::text)
        .collect()
}

/// Group runs by page index and assemble each page, in ascending page order.
///
/// Pages without any runs are not represented.
pub fn assemble(runs: &[TextRun], options: &TextOptions) -> Vec<PageText> {
    let mut by_page: BTreeMap<usize, Vec<TextRun>> = BTreeMap::new();
    for run in runs {
        by_page.entry(run.page_index).or_default().push(run.clone());
    }
    by_page
        .into_iter()
        .map(|(index, page_runs)| {
            let lines = cluster_runs_into_lines(&page_runs, options.y_tolerance)
                .iter()
                .map(RunLine::text)
                .collect();
            PageText::new(index, lines)
        })
        .collect()
}

/// Simple text extraction: lines joined with `\n`.
pub fn runs_to_text(runs: &[TextRun], y_tolerance: f64) -> String {
    cluster_runs_into_lines(runs, y_tolerance)
        .iter()
        .map(RunLine::text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep only runs whose origin lies inside `visible`.
pub fn clip_to_page(runs: Vec<TextRun>, visible: &BBox) -> Vec<TextRun> {
    runs.into_iter()
        .filter(|r| visible.contains(r.x, r.y))
        .collect()
}
