use crossterm::event::KeyCode;

/// What the caller should do after a key was fed to a [`PatternInput`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputAction {
    Edited,
    Submit,
    Cancel,
    Ignored,
}

/// Single-line editor for the message start pattern. The cursor counts
/// chars, not bytes.
#[derive(Clone, Debug, Default)]
pub struct PatternInput {
    text: String,
    cursor: usize,
    committed: String,
    error: Option<String>,
}

impl PatternInput {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.chars().count(),
            committed: text.to_string(),
            error: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Remember the current text as the one in effect.
    pub fn commit(&mut self) {
        self.committed = self.text.clone();
    }

    /// Drop unsaved edits.
    pub fn revert(&mut self) {
        self.text = self.committed.clone();
        self.cursor = self.text.chars().count();
    }

    pub fn handle_key(&mut self, code: KeyCode) -> InputAction {
        match code {
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.len(),
            KeyCode::Char(c) => {
                let at = self.byte_index(self.cursor);
                self.text.insert(at, c);
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index(self.cursor);
                    self.text.remove(at);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.len() {
                    let at = self.byte_index(self.cursor);
                    self.text.remove(at);
                }
            }
            KeyCode::Enter => return InputAction::Submit,
            KeyCode::Esc => return InputAction::Cancel,
            _ => return InputAction::Ignored,
        }
        InputAction::Edited
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(input: &mut PatternInput, s: &str) {
        for c in s.chars() {
            input.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn test_editing_with_multibyte_chars() {
        let mut input = PatternInput::new("ä");
        type_str(&mut input, "b");
        input.handle_key(KeyCode::Home);
        type_str(&mut input, "^");
        assert_eq!(input.text(), "^äb");
        input.handle_key(KeyCode::Right);
        input.handle_key(KeyCode::Backspace);
        assert_eq!(input.text(), "^b");
        input.handle_key(KeyCode::Delete);
        assert_eq!(input.text(), "^");
        assert_eq!(input.cursor(), 1);
    }

    #[test]
    fn test_submit_cancel_and_revert() {
        let mut input = PatternInput::new(r"\d+");
        assert_eq!(input.handle_key(KeyCode::Char('x')), InputAction::Edited);
        assert_eq!(input.handle_key(KeyCode::Enter), InputAction::Submit);
        assert_eq!(input.handle_key(KeyCode::Esc), InputAction::Cancel);
        assert_eq!(input.handle_key(KeyCode::F(1)), InputAction::Ignored);
        input.revert();
        assert_eq!(input.text(), r"\d+");

        type_str(&mut input, "y");
        input.commit();
        type_str(&mut input, "z");
        input.revert();
        assert_eq!(input.text(), r"\d+y");
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut input = PatternInput::new("ab");
        input.handle_key(KeyCode::Right);
        assert_eq!(input.cursor(), 2);
        input.handle_key(KeyCode::Home);
        input.handle_key(KeyCode::Left);
        input.handle_key(KeyCode::Backspace);
        assert_eq!(input.cursor(), 0);
        assert_eq!(input.text(), "ab");
    }
}
