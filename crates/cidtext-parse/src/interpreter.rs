//! Content stream interpreter.
//!
//! Walks a page's operations, maintaining graphics and text state, and
//! reports one [`TextRun`] per showing operator to a [`ContentHandler`].

use std::collections::{BTreeMap, BTreeSet};

use cidtext_core::{ExtractOptions, ExtractResult, ExtractWarning, ExtractWarningCode, TextRun};
use tracing::{debug, trace};

use crate::content::{Operation, TextElement, parse_operations};
use crate::document::ObjectGraph;
use crate::error::BackendError;
use crate::font::{FontTable, PageFont};
use crate::handler::{ContentHandler, RunCollector};
use crate::interpreter_state::InterpreterState;
use crate::page_tree::Page;

/// Decode the page's content streams and join them in order, one space
/// between consecutive streams.
pub fn page_content(graph: &ObjectGraph, page: &Page) -> Result<Vec<u8>, BackendError> {
    let mut joined = Vec::new();
    for (i, entry) in page.contents.iter().enumerate() {
        let stream = graph.resolve(entry)?.as_stream().ok_or_else(|| {
            BackendError::Parse(format!("page {} /Contents[{i}] is not a stream", page.index))
        })?;
        let data = graph.decode_stream(stream)?;
        if i > 0 {
            joined.push(b' ');
        }
        joined.extend_from_slice(&data);
    }
    Ok(joined)
}

/// Interpret one page, streaming runs and warnings to `handler`.
///
/// # Errors
///
/// Content that cannot be decoded or tokenized, and pages over
/// [`ExtractOptions::max_operations_per_page`], fail the page.
pub fn interpret_page(
    graph: &ObjectGraph,
    page: &Page,
    fonts: &FontTable,
    handler: &mut dyn ContentHandler,
    options: &ExtractOptions,
) -> Result<(), BackendError> {
    let content = page_content(graph, page)?;
    let operations = parse_operations(&content, options.max_operations_per_page)?;
    debug!(page = page.index, operations = operations.len(), "interpreting page");

    let mut walker = PageWalker {
        page: page.index,
        fonts,
        handler,
        state: InterpreterState::new(),
        unmapped: BTreeMap::new(),
        warned_missing: BTreeSet::new(),
    };
    for (index, op) in operations.iter().enumerate() {
        walker.apply(index, op);
    }
    walker.finish();
    Ok(())
}

/// Interpret one page and collect its runs in emission order.
pub fn run(
    graph: &ObjectGraph,
    page: &Page,
    fonts: &FontTable,
) -> Result<ExtractResult<Vec<TextRun>>, BackendError> {
    let mut collector = RunCollector::new();
    interpret_page(graph, page, fonts, &mut collector, graph.options())?;
    Ok(ExtractResult::with_warnings(collector.runs, collector.warnings))
}

struct PageWalker<'a> {
    page: usize,
    fonts: &'a FontTable,
    handler: &'a mut dyn ContentHandler,
    state: InterpreterState,
    /// Unmapped code count per font resource name.
    unmapped: BTreeMap<String, usize>,
    warned_missing: BTreeSet<String>,
}

impl PageWalker<'_> {
    fn apply(&mut self, index: usize, op: &Operation) {
        match op {
            Operation::BeginText => self.state.text_mut().begin_text(),
            Operation::EndText => self.state.text_mut().end_text(),
            Operation::SetFont { name, size } => {
                self.check_font(index, name);
                self.state.text_mut().set_font(name.clone(), *size);
            }
            Operation::MoveText { tx, ty } => self.state.text_mut().move_text_position(*tx, *ty),
            Operation::MoveTextSetLeading { tx, ty } => self
                .state
                .text_mut()
                .move_text_position_and_set_leading(*tx, *ty),
            Operation::SetTextMatrix(m) => self.state.text_mut().set_text_matrix(*m),
            Operation::NextLine => self.state.text_mut().move_to_next_line(),
            Operation::SetLeading(v) => self.state.text_mut().leading = *v,
            Operation::SetCharSpacing(v) => self.state.text_mut().char_spacing = *v,
            Operation::SetWordSpacing(v) => self.state.text_mut().word_spacing = *v,
            Operation::SetHorizontalScaling(v) => self.state.text_mut().h_scaling = *v,
            Operation::ShowText(bytes) => self.show(&[TextElement::Text(bytes.clone())]),
            Operation::NextLineShowText(bytes) => {
                self.state.text_mut().move_to_next_line();
                self.show(&[TextElement::Text(bytes.clone())]);
            }
            Operation::NextLineShowTextSpaced {
                word_spacing,
                char_spacing,
                text,
            } => {
                let ts = self.state.text_mut();
                ts.word_spacing = *word_spacing;
                ts.char_spacing = *char_spacing;
                ts.move_to_next_line();
                self.show(&[TextElement::Text(text.clone())]);
            }
            Operation::ShowTextArray(elements) => self.show(elements),
            Operation::ConcatMatrix(m) => self.state.concat_matrix(m),
            Operation::SaveState => self.state.save_state(),
            Operation::RestoreState => {
                if !self.state.restore_state() {
                    debug!(page = self.page, operator = index, "unbalanced Q ignored");
                }
            }
            Operation::Ignored(name) => trace!(operator = %name, "ignored"),
        }
    }

    /// Report a `Tf` naming a font the page does not define.
    fn check_font(&mut self, index: usize, name: &str) {
        if self.fonts.get(name).is_some() || self.fonts.is_missing(name) {
            return;
        }
        if self.warned_missing.insert(name.to_string()) {
            self.handler.on_warning(
                ExtractWarning::for_font(
                    ExtractWarningCode::MissingFont,
                    format!("font /{name} is not in the page resources; codes rendered raw"),
                    self.page,
                    name,
                )
                .at_operator(index),
            );
        }
    }

    /// Show a sequence of strings and adjustments as one run.
    fn show(&mut self, elements: &[TextElement]) {
        let fonts = self.fonts;
        let font_name = self.state.text().font_name.clone();
        let fallback;
        let font = match fonts.get(&font_name) {
            Some(font) => font,
            None => {
                fallback = PageFont::raw(font_name.as_str());
                &fallback
            }
        };

        let ctm = *self.state.ctm();
        let origin = self.state.text().origin(&ctm);
        let font_size = self.state.text().effective_font_size(&ctm);
        let mut text = String::new();
        let mut misses = 0;

        for element in elements {
            match element {
                TextElement::Text(bytes) => {
                    for glyph in font.decode(bytes) {
                        match &glyph.text {
                            Some(t) => text.push_str(t),
                            None => {
                                text.push(char::REPLACEMENT_CHARACTER);
                                misses += 1;
                            }
                        }
                        let ts = self.state.text_mut();
                        let advance = ts.glyph_advance(glyph.width, glyph.is_word_space());
                        ts.advance_text_position(advance);
                    }
                }
                TextElement::Adjust(amount) => {
                    let ts = self.state.text_mut();
                    let advance = ts.adjustment_advance(*amount);
                    ts.advance_text_position(advance);
                }
            }
        }

        if misses > 0 {
            *self.unmapped.entry(font_name.clone()).or_default() += misses;
        }
        if text.is_empty() {
            return;
        }
        self.handler.on_text_run(TextRun {
            text,
            x: origin.x,
            y: origin.y,
            font_name,
            font_size,
            page_index: self.page,
        });
    }

    /// One summary warning per font with unmapped codes.
    fn finish(self) {
        for (font, count) in self.unmapped {
            self.handler.on_warning(ExtractWarning::for_font(
                ExtractWarningCode::UnmappedCode,
                format!("{count} code(s) without a ToUnicode mapping rendered as U+FFFD"),
                self.page,
                font,
            ));
        }
    }
}
