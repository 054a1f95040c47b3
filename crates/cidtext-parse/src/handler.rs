//! Callback trait between the content stream interpreter and its consumers.
//!
//! The interpreter reports each text run and each non-fatal problem as it
//! walks a page; [`RunCollector`] is the handler behind
//! [`run`](crate::interpreter::run).

use cidtext_core::{ExtractWarning, TextRun};

/// Receives interpretation events for one page.
///
/// Both methods default to no-ops so a handler can subscribe to only the
/// events it needs.
pub trait ContentHandler {
    /// Called once per showing operator that produced a run.
    fn on_text_run(&mut self, _run: TextRun) {}

    /// Called for each non-fatal problem; interpretation continues.
    fn on_warning(&mut self, _warning: ExtractWarning) {}
}

/// Collects runs and warnings in emission order.
#[derive(Debug, Default)]
pub struct RunCollector {
    pub runs: Vec<TextRun>,
    pub warnings: Vec<ExtractWarning>,
}

impl RunCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentHandler for RunCollector {
    fn on_text_run(&mut self, run: TextRun) {
        self.runs.push(run);
    }

    fn on_warning(&mut self, warning: ExtractWarning) {
        self.warnings.push(warning);
    }
}
