//! CRUD screen for one entity type: table, form popup, delete confirmation

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use tracing::debug;

use crate::crud::{DeleteDecision, EntityForm, EntityTable, Notification, SubmitOutcome};
use crate::dashboard::app::Screen;
use crate::dashboard::components::{EntityTableView, FormField};
use crate::dashboard::traits::{EntityScreen, ScreenAction};
use crate::dashboard::ui::{centered_rect, Styles};
use crate::live::CacheTarget;
use crate::models::{EntityKind, FieldKind, Resource};

/// Popup currently owning the keyboard
#[derive(Debug, Clone, PartialEq)]
enum Modal {
    None,
    Form,
    ConfirmDelete { label: String },
    Blocked { label: String, dependents: Vec<String> },
}

/// Screen state for one entity type
pub struct ResourceScreen<R: Resource> {
    table: EntityTable<R>,
    form: EntityForm<R>,
    fields: Vec<FormField>,
    focused: usize,
    modal: Modal,
    view: EntityTableView,
    loaded: bool,
}

impl<R: Resource> ResourceScreen<R> {
    pub fn new(table: EntityTable<R>) -> Self {
        Self {
            table,
            form: EntityForm::new(),
            fields: Vec::new(),
            focused: 0,
            modal: Modal::None,
            view: EntityTableView::new(),
            loaded: false,
        }
    }

    pub fn table(&self) -> &EntityTable<R> {
        &self.table
    }

    fn open_create(&mut self) {
        self.form.open_create();
        self.load_fields();
        self.modal = Modal::Form;
    }

    fn open_edit(&mut self) -> ScreenAction {
        let item = match self.table.selected() {
            Some(item) => item.clone(),
            None => return ScreenAction::Notify(Notification::info(format!("No {} selected", R::KIND.noun()))),
        };
        self.table.begin_edit(item.id().clone());
        self.form.open_edit(&item);
        self.load_fields();
        self.modal = Modal::Form;
        ScreenAction::None
    }

    /// Rebuild the input widgets from the form's draft
    fn load_fields(&mut self) {
        self.fields = R::fields()
            .iter()
            .map(|spec| FormField::new(*spec).with_value(self.form.draft().get(spec.name)))
            .collect();
        self.focused = 0;
        self.update_focus();
    }

    fn update_focus(&mut self) {
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.is_focused = i == self.focused;
        }
    }

    fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.focused = (self.focused + 1) % self.fields.len();
            self.update_focus();
        }
    }

    fn previous_field(&mut self) {
        if !self.fields.is_empty() {
            self.focused = if self.focused == 0 { self.fields.len() - 1 } else { self.focused - 1 };
            self.update_focus();
        }
    }

    fn close_form(&mut self) {
        self.form.close();
        self.table.cancel_pending();
        self.fields.clear();
        self.modal = Modal::None;
    }

    async fn submit_form(&mut self) -> ScreenAction {
        for field in &self.fields {
            self.form.set(field.name(), field.value.clone());
        }

        match self.form.submit(&mut self.table).await {
            SubmitOutcome::Saved(notification) => {
                self.fields.clear();
                self.modal = Modal::None;
                ScreenAction::Notify(notification)
            }
            SubmitOutcome::Rejected(messages) => {
                ScreenAction::Notify(Notification::warning(messages.join("; ")))
            }
            SubmitOutcome::Failed(message) => ScreenAction::Notify(Notification::error(message)),
        }
    }

    async fn start_delete(&mut self) -> ScreenAction {
        let id = match self.table.selected() {
            Some(item) => item.id().clone(),
            None => return ScreenAction::Notify(Notification::info(format!("No {} selected", R::KIND.noun()))),
        };

        match self.table.request_delete(&id).await {
            DeleteDecision::Confirm { label, .. } => {
                self.modal = Modal::ConfirmDelete { label };
                ScreenAction::None
            }
            DeleteDecision::Blocked { label, dependents } => {
                self.modal = Modal::Blocked { label, dependents };
                ScreenAction::None
            }
            DeleteDecision::Failed(notification) => ScreenAction::Notify(notification),
        }
    }

    async fn reload(&mut self) -> ScreenAction {
        match self.table.reload().await {
            Ok(count) => ScreenAction::Notify(Notification::info(format!(
                "Loaded {} {}",
                count,
                R::KIND.title().to_lowercase()
            ))),
            Err(e) => ScreenAction::Notify(Notification::error(format!(
                "Failed to load {}: {}",
                R::KIND.title().to_lowercase(),
                e.message()
            ))),
        }
    }

    async fn handle_table_key(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.table.select_previous();
                ScreenAction::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.table.select_next();
                ScreenAction::None
            }
            KeyCode::Char('n') => {
                self.open_create();
                ScreenAction::None
            }
            KeyCode::Char('e') | KeyCode::Enter => self.open_edit(),
            KeyCode::Char('d') | KeyCode::Delete => self.start_delete().await,
            KeyCode::Char('r') => self.reload().await,
            KeyCode::Char('i') if R::KIND == EntityKind::Package => ScreenAction::NavigateTo(Screen::Import),
            KeyCode::Esc => ScreenAction::NavigateBack,
            _ => ScreenAction::None,
        }
    }

    async fn handle_form_key(&mut self, key: KeyEvent) -> ScreenAction {
        let on_choice = self
            .fields
            .get(self.focused)
            .map(|field| matches!(field.spec.kind, FieldKind::Choice(_)))
            .unwrap_or(false);

        match key.code {
            KeyCode::Esc => self.close_form(),
            KeyCode::Enter => return self.submit_form().await,
            KeyCode::Tab => self.next_field(),
            KeyCode::BackTab => self.previous_field(),
            KeyCode::Up if on_choice => self.cycle_focused(false),
            KeyCode::Down if on_choice => self.cycle_focused(true),
            KeyCode::Up => self.previous_field(),
            KeyCode::Down => self.next_field(),
            _ => {
                if let Some(field) = self.fields.get_mut(self.focused) {
                    match key.code {
                        KeyCode::Char(c) => field.insert_char(c),
                        KeyCode::Backspace => field.delete_char(),
                        KeyCode::Delete => field.delete_char_forward(),
                        KeyCode::Left => field.move_cursor_left(),
                        KeyCode::Right => field.move_cursor_right(),
                        KeyCode::Home => field.move_cursor_to_start(),
                        KeyCode::End => field.move_cursor_to_end(),
                        _ => {}
                    }
                }
            }
        }
        ScreenAction::None
    }

    fn cycle_focused(&mut self, forward: bool) {
        if let Some(field) = self.fields.get_mut(self.focused) {
            field.cycle(forward);
        }
    }

    async fn handle_confirm_key(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.modal = Modal::None;
                ScreenAction::Notify(self.table.confirm_delete().await)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.table.cancel_pending();
                self.modal = Modal::None;
                ScreenAction::None
            }
            _ => ScreenAction::None,
        }
    }

    fn draw_form(&self, f: &mut Frame, area: Rect) {
        let height = (self.fields.len() as u16) * 3 + 5;
        let popup = centered_rect(60, 80, area);
        let popup = Rect {
            height: height.min(popup.height),
            ..popup
        };
        f.render_widget(Clear, popup);

        let block = Block::default()
            .title(self.form.title())
            .borders(Borders::ALL)
            .border_style(Styles::active_border());
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        let mut constraints: Vec<Constraint> = self.fields.iter().map(|_| Constraint::Length(3)).collect();
        constraints.push(Constraint::Min(1));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(inner);

        for (field, chunk) in self.fields.iter().zip(chunks.iter()) {
            field.render(f, *chunk);
        }

        let footer = match self.form.error() {
            Some(error) => Line::from(Span::styled(error.to_string(), Styles::error())),
            None => Line::from(Span::styled(
                "Enter: save | Tab: next field | Esc: cancel",
                Styles::inactive(),
            )),
        };
        if let Some(chunk) = chunks.last() {
            f.render_widget(Paragraph::new(footer).wrap(Wrap { trim: true }), *chunk);
        }
    }

    fn draw_confirm(&self, f: &mut Frame, area: Rect, label: &str) {
        let popup = centered_rect(50, 25, area);
        f.render_widget(Clear, popup);
        let text = vec![
            Line::from(format!("Delete {} '{}'?", R::KIND.noun(), label)),
            Line::from(""),
            Line::from(Span::styled("y: delete | n/Esc: cancel", Styles::inactive())),
        ];
        let paragraph = Paragraph::new(text).wrap(Wrap { trim: true }).block(
            Block::default()
                .title("Confirm deletion")
                .borders(Borders::ALL)
                .border_style(Styles::warning()),
        );
        f.render_widget(paragraph, popup);
    }

    fn draw_blocked(&self, f: &mut Frame, area: Rect, label: &str, dependents: &[String]) {
        let popup = centered_rect(60, 50, area);
        f.render_widget(Clear, popup);
        let mut text = vec![
            Line::from(format!(
                "Cannot delete {} '{}' while these items reference it:",
                R::KIND.noun(),
                label
            )),
            Line::from(""),
        ];
        text.extend(dependents.iter().map(|dependent| Line::from(format!("  • {}", dependent))));
        text.push(Line::from(""));
        text.push(Line::from(Span::styled("Esc/Enter: close", Styles::inactive())));

        let paragraph = Paragraph::new(text).wrap(Wrap { trim: false }).block(
            Block::default()
                .title("Deletion blocked")
                .borders(Borders::ALL)
                .border_style(Styles::error()),
        );
        f.render_widget(paragraph, popup);
    }
}

#[async_trait]
impl<R: Resource> EntityScreen for ResourceScreen<R> {
    fn kind(&self) -> EntityKind {
        R::KIND
    }

    fn draw(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(area);

        self.view.render(f, chunks[0], &self.table);

        let mut hints = "↑/↓: select | n: new | e: edit | d: delete | r: reload | Esc: back".to_string();
        if R::KIND == EntityKind::Package {
            hints.push_str(" | i: import");
        }
        f.render_widget(Paragraph::new(hints).style(Styles::inactive()), chunks[1]);

        match &self.modal {
            Modal::None => {}
            Modal::Form => self.draw_form(f, area),
            Modal::ConfirmDelete { label } => self.draw_confirm(f, area, label),
            Modal::Blocked { label, dependents } => self.draw_blocked(f, area, label, dependents),
        }
    }

    async fn handle_key_event(&mut self, key: KeyEvent) -> ScreenAction {
        match self.modal {
            Modal::Form => self.handle_form_key(key).await,
            Modal::ConfirmDelete { .. } => self.handle_confirm_key(key).await,
            Modal::Blocked { .. } => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                    self.modal = Modal::None;
                }
                ScreenAction::None
            }
            Modal::None => self.handle_table_key(key).await,
        }
    }

    async fn on_enter(&mut self) -> Option<Notification> {
        if self.loaded {
            return None;
        }
        self.loaded = true;
        debug!("Initial load of {}", R::KIND);
        match self.table.reload().await {
            Ok(_) => None,
            Err(e) => Some(Notification::error(format!(
                "Failed to load {}: {}",
                R::KIND.title().to_lowercase(),
                e.message()
            ))),
        }
    }

    fn captures_input(&self) -> bool {
        self.modal != Modal::None
    }

    fn cache(&mut self) -> &mut dyn CacheTarget {
        &mut self.table
    }
}
