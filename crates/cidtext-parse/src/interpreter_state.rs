//! Graphics state stack for the content stream interpreter.
//!
//! `q` pushes the CTM together with the text state parameters, `Q` pops
//! them, and `cm` pre-concatenates onto the CTM.

use cidtext_core::Ctm;

use crate::text_state::{TextState, TextStateSnapshot};

/// Everything the interpreter tracks while walking one page.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterState {
    ctm: Ctm,
    text: TextState,
    stack: Vec<SavedState>,
}

/// What `q` saves.
#[derive(Debug, Clone, PartialEq)]
struct SavedState {
    ctm: Ctm,
    text: TextStateSnapshot,
}

impl Default for InterpreterState {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpreterState {
    /// Identity CTM, default text state, empty stack.
    pub fn new() -> Self {
        Self {
            ctm: Ctm::identity(),
            text: TextState::new(),
            stack: Vec::new(),
        }
    }

    pub fn ctm(&self) -> &Ctm {
        &self.ctm
    }

    pub fn text(&self) -> &TextState {
        &self.text
    }

    pub fn text_mut(&mut self) -> &mut TextState {
        &mut self.text
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// `q`.
    pub fn save_state(&mut self) {
        self.stack.push(SavedState {
            ctm: self.ctm,
            text: self.text.save_snapshot(),
        });
    }

    /// `Q`. Returns `false` on an unbalanced `Q`, leaving the state as is.
    pub fn restore_state(&mut self) -> bool {
        match self.stack.pop() {
            Some(saved) => {
                self.ctm = saved.ctm;
                self.text.restore_snapshot(saved.text);
                true
            }
            None => false,
        }
    }

    /// `cm`: CTM' = m × CTM.
    pub fn concat_matrix(&mut self, m: &Ctm) {
        self.ctm = m.concat(&self.ctm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_identity_ctm_and_empty_stack() {
        let state = InterpreterState::new();
        assert_eq!(*state.ctm(), Ctm::identity());
        assert_eq!(state.stack_depth(), 0);
        assert_eq!(state, InterpreterState::default());
    }

    #[test]
    fn test_save_restore_preserves_ctm() {
        let mut state = InterpreterState::new();
        state.save_state();
        state.concat_matrix(&Ctm::new(2.0, 0.0, 0.0, 2.0, 10.0, 20.0));
        assert_eq!(state.stack_depth(), 1);
        assert!(state.restore_state());
        assert_eq!(*state.ctm(), Ctm::identity());
        assert_eq!(state.stack_depth(), 0);
    }

    #[test]
    fn test_save_restore_preserves_text_params() {
        let mut state = InterpreterState::new();
        state.text_mut().set_font("F1".to_string(), 12.0);
        state.save_state();
        state.text_mut().set_font("F2".to_string(), 8.0);
        state.text_mut().char_spacing = 3.0;
        assert!(state.restore_state());
        assert_eq!(state.text().font_name, "F1");
        assert_eq!(state.text().char_spacing, 0.0);
    }

    #[test]
    fn test_restore_on_empty_stack_returns_false() {
        let mut state = InterpreterState::new();
        state.concat_matrix(&Ctm::new(1.0, 0.0, 0.0, 1.0, 5.0, 5.0));
        assert!(!state.restore_state());
        assert_eq!(state.ctm().e, 5.0);
    }

    #[test]
    fn test_cm_pre_concatenates() {
        let mut state = InterpreterState::new();
        state.concat_matrix(&Ctm::new(1.0, 0.0, 0.0, 1.0, 100.0, 0.0));
        state.concat_matrix(&Ctm::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0));
        // scale applies first, then the earlier translation
        assert_eq!(*state.ctm(), Ctm::new(2.0, 0.0, 0.0, 2.0, 100.0, 0.0));
    }
}
