//! Text state machine for the content stream interpreter.
//!
//! Tracks the text object (BT/ET), font selection (Tf), the text and line
//! matrices, and the positioning operators (Td, TD, T*).

use cidtext_core::{Ctm, Point};

/// Text state parameters saved and restored by `q`/`Q`.
///
/// The text and line matrices are not part of it; they belong to the text
/// object.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStateSnapshot {
    pub char_spacing: f64,
    pub word_spacing: f64,
    pub h_scaling: f64,
    pub leading: f64,
    pub font_name: String,
    pub font_size: f64,
}

/// Text state parameters tracked during content stream interpretation.
///
/// The parameters set by Tc, Tw, Tz, TL and Tf persist across text objects.
#[derive(Debug, Clone, PartialEq)]
pub struct TextState {
    /// Character spacing (Tc), added after every glyph.
    pub char_spacing: f64,
    /// Word spacing (Tw), added after single-byte code 32.
    pub word_spacing: f64,
    /// Horizontal scaling (Tz) as a percentage; 100 is normal.
    pub h_scaling: f64,
    /// Leading (TL), the baseline distance used by T*.
    pub leading: f64,
    /// Resource name set by Tf.
    pub font_name: String,
    /// Size set by Tf.
    pub font_size: f64,
    in_text_object: bool,
    text_matrix: Ctm,
    line_matrix: Ctm,
}

impl Default for TextState {
    fn default() -> Self {
        Self::new()
    }
}

impl TextState {
    pub fn new() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scaling: 100.0,
            leading: 0.0,
            font_name: String::new(),
            font_size: 0.0,
            in_text_object: false,
            text_matrix: Ctm::identity(),
            line_matrix: Ctm::identity(),
        }
    }

    pub fn in_text_object(&self) -> bool {
        self.in_text_object
    }

    pub fn text_matrix(&self) -> &Ctm {
        &self.text_matrix
    }

    pub fn line_matrix(&self) -> &Ctm {
        &self.line_matrix
    }

    /// Horizontal scaling as a fraction (1.0 = 100%).
    pub fn h_scaling_normalized(&self) -> f64 {
        self.h_scaling / 100.0
    }

    /// `BT`: reset both matrices to identity.
    pub fn begin_text(&mut self) {
        self.text_matrix = Ctm::identity();
        self.line_matrix = Ctm::identity();
        self.in_text_object = true;
    }

    /// `ET`. The matrices are kept but no longer meaningful.
    pub fn end_text(&mut self) {
        self.in_text_object = false;
    }

    /// `Tf`.
    pub fn set_font(&mut self, font_name: String, font_size: f64) {
        self.font_name = font_name;
        self.font_size = font_size;
    }

    /// `Tm`: replace both matrices.
    pub fn set_text_matrix(&mut self, m: Ctm) {
        self.text_matrix = m;
        self.line_matrix = m;
    }

    /// `Td`: translate the line matrix and start a new line there.
    pub fn move_text_position(&mut self, tx: f64, ty: f64) {
        let translation = Ctm::new(1.0, 0.0, 0.0, 1.0, tx, ty);
        self.line_matrix = translation.concat(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// `TD`: `-ty TL` then `tx ty Td`.
    pub fn move_text_position_and_set_leading(&mut self, tx: f64, ty: f64) {
        self.leading = -ty;
        self.move_text_position(tx, ty);
    }

    /// `T*`: `0 -TL Td`.
    pub fn move_to_next_line(&mut self) {
        let leading = self.leading;
        self.move_text_position(0.0, -leading);
    }

    /// Translate the text matrix horizontally by `tx` text space units.
    pub fn advance_text_position(&mut self, tx: f64) {
        let translation = Ctm::new(1.0, 0.0, 0.0, 1.0, tx, 0.0);
        self.text_matrix = translation.concat(&self.text_matrix);
    }

    /// Horizontal displacement after showing one glyph of glyph-space
    /// width `width`.
    pub fn glyph_advance(&self, width: f64, word_space: bool) -> f64 {
        let spacing = if word_space {
            self.char_spacing + self.word_spacing
        } else {
            self.char_spacing
        };
        ((width / 1000.0) * self.font_size + spacing) * self.h_scaling_normalized()
    }

    /// Displacement for a number inside a `TJ` array.
    pub fn adjustment_advance(&self, amount: f64) -> f64 {
        -amount / 1000.0 * self.font_size * self.h_scaling_normalized()
    }

    /// Origin of the next glyph in user space.
    pub fn origin(&self, ctm: &Ctm) -> Point {
        ctm.transform_point(self.text_matrix.translation())
    }

    /// Font size as rendered: `Tfs` scaled by the text matrix and the CTM.
    pub fn effective_font_size(&self, ctm: &Ctm) -> f64 {
        self.font_size * self.text_matrix.concat(ctm).vertical_scale()
    }

    pub fn save_snapshot(&self) -> TextStateSnapshot {
        TextStateSnapshot {
            char_spacing: self.char_spacing,
            word_spacing: self.word_spacing,
            h_scaling: self.h_scaling,
            leading: self.leading,
            font_name: self.font_name.clone(),
            font_size: self.font_size,
        }
    }

    pub fn restore_snapshot(&mut self, snapshot: TextStateSnapshot) {
        self.char_spacing = snapshot.char_spacing;
        self.word_spacing = snapshot.word_spacing;
        self.h_scaling = snapshot.h_scaling;
        self.leading = snapshot.leading;
        self.font_name = snapshot.font_name;
        self.font_size = snapshot.font_size;
    }
}
