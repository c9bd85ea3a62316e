//! Form field component for user input

use ratatui::{
    layout::Rect,
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::dashboard::ui::Styles;
use crate::models::{FieldKind, FieldSpec};

/// Individual form field
#[derive(Debug, Clone)]
pub struct FormField {
    pub spec: FieldSpec,
    pub value: String,
    pub is_focused: bool,
    /// Cursor position in characters
    pub cursor_position: usize,
}

impl FormField {
    pub fn new(spec: FieldSpec) -> Self {
        Self {
            spec,
            value: String::new(),
            is_focused: false,
            cursor_position: 0,
        }
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self.cursor_position = self.value.chars().count();
        self
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn is_choice(&self) -> bool {
        matches!(self.spec.kind, FieldKind::Choice(_))
    }

    pub fn insert_char(&mut self, c: char) {
        if self.is_choice() {
            return; // Choices are cycled, not typed
        }
        let at = self.byte_index(self.cursor_position);
        self.value.insert(at, c);
        self.cursor_position += 1;
    }

    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 && !self.is_choice() {
            self.cursor_position -= 1;
            let at = self.byte_index(self.cursor_position);
            self.value.remove(at);
        }
    }

    pub fn delete_char_forward(&mut self) {
        if self.cursor_position < self.value.chars().count() && !self.is_choice() {
            let at = self.byte_index(self.cursor_position);
            self.value.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_position < self.value.chars().count() {
            self.cursor_position += 1;
        }
    }

    pub fn move_cursor_to_start(&mut self) {
        self.cursor_position = 0;
    }

    pub fn move_cursor_to_end(&mut self) {
        self.cursor_position = self.value.chars().count();
    }

    /// Step through the options of a choice field
    pub fn cycle(&mut self, forward: bool) {
        let options = match self.spec.kind {
            FieldKind::Choice(options) if !options.is_empty() => options,
            _ => return,
        };
        let next = match options.iter().position(|option| *option == self.value) {
            Some(idx) if forward => (idx + 1) % options.len(),
            Some(0) => options.len() - 1,
            Some(idx) => idx - 1,
            None => 0,
        };
        self.value = options[next].to_string();
        self.cursor_position = self.value.chars().count();
    }

    fn display_text(&self) -> String {
        match self.spec.kind {
            FieldKind::Secret => "•".repeat(self.value.chars().count()),
            FieldKind::Choice(_) if self.value.is_empty() => "(↑/↓ to choose)".to_string(),
            FieldKind::Choice(_) => format!("◂ {} ▸", self.value),
            FieldKind::Date if self.value.is_empty() => "YYYY-MM-DD".to_string(),
            _ => self.value.clone(),
        }
    }

    /// Render the form field
    pub fn render(&self, f: &mut Frame, area: Rect) {
        let border_style = if self.is_focused {
            Styles::active_border()
        } else {
            Styles::inactive_border()
        };

        let title = if self.spec.required {
            format!("{} *", self.spec.label)
        } else {
            self.spec.label.to_string()
        };

        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style);

        let text_style = if self.value.is_empty() {
            Styles::inactive()
        } else {
            Styles::default()
        };

        let paragraph = Paragraph::new(self.display_text())
            .style(text_style)
            .block(block);

        f.render_widget(paragraph, area);

        if self.is_focused && !self.is_choice() {
            let before: String = self.value.chars().take(self.cursor_position).collect();
            let offset = match self.spec.kind {
                FieldKind::Secret => self.cursor_position,
                _ => before.width(),
            };
            let cursor_x = area.x + 1 + offset as u16;
            let cursor_y = area.y + 1;
            if cursor_x < area.x + area.width.saturating_sub(1) {
                f.set_cursor(cursor_x, cursor_y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Resource, TextElement, User};

    #[test]
    fn test_editing_multibyte_text() {
        let mut field = FormField::new(TextElement::fields()[1]).with_value("Ñame");
        field.move_cursor_left();
        field.insert_char('x');
        assert_eq!(field.value, "Ñamxe");
        field.move_cursor_to_start();
        field.delete_char_forward();
        assert_eq!(field.value, "amxe");
        field.move_cursor_to_end();
        field.delete_char();
        assert_eq!(field.value, "amx");
    }

    #[test]
    fn test_choice_fields_cycle_instead_of_typing() {
        let mut field = FormField::new(TextElement::fields()[0]);
        field.insert_char('z');
        assert_eq!(field.value, "");
        field.cycle(true);
        assert_eq!(field.value, "title");
        field.cycle(false);
        assert_eq!(field.value, "ich_category");
    }

    #[test]
    fn test_secret_is_masked() {
        let field = FormField::new(User::fields()[3]).with_value("hunter2");
        assert_eq!(field.display_text(), "•••••••");
    }
}
