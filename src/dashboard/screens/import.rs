//! Bulk package import from an Excel workbook

use std::path::PathBuf;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::ResourceApi;
use crate::crud::Notification;
use crate::dashboard::components::FormField;
use crate::dashboard::traits::ScreenAction;
use crate::dashboard::ui::Styles;
use crate::import::{import_workbook, ImportError, ImportSummary, MIN_NAME_LENGTH, PACKAGE_NAME_HEADER};
use crate::models::{FieldKind, FieldSpec, Package};

const PATH_FIELD: FieldSpec = FieldSpec {
    name: "path",
    label: "Excel file (.xlsx or .xls)",
    kind: FieldKind::Text,
    required: true,
};

/// Import screen state
pub struct ImportScreen {
    api: Arc<dyn ResourceApi<Package>>,
    path: FormField,
    running: Option<JoinHandle<Result<ImportSummary, ImportError>>>,
    last_summary: Option<ImportSummary>,
}

impl ImportScreen {
    pub fn new(api: Arc<dyn ResourceApi<Package>>) -> Self {
        let mut path = FormField::new(PATH_FIELD);
        path.is_focused = true;
        Self {
            api,
            path,
            running: None,
            last_summary: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn last_summary(&self) -> Option<&ImportSummary> {
        self.last_summary.as_ref()
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Esc => return ScreenAction::NavigateBack,
            KeyCode::Enter => return self.start(),
            KeyCode::Char(c) => self.path.insert_char(c),
            KeyCode::Backspace => self.path.delete_char(),
            KeyCode::Delete => self.path.delete_char_forward(),
            KeyCode::Left => self.path.move_cursor_left(),
            KeyCode::Right => self.path.move_cursor_right(),
            KeyCode::Home => self.path.move_cursor_to_start(),
            KeyCode::End => self.path.move_cursor_to_end(),
            _ => {}
        }
        ScreenAction::None
    }

    fn start(&mut self) -> ScreenAction {
        if self.running.is_some() {
            return ScreenAction::Notify(Notification::info("An import is already running"));
        }
        let path = self.path.value.trim();
        if path.is_empty() {
            return ScreenAction::Notify(Notification::warning("Enter the path of an Excel file"));
        }

        let path = PathBuf::from(path);
        info!("Starting package import from {}", path.display());
        self.last_summary = None;
        self.running = Some(tokio::spawn(import_workbook(self.api.clone(), path)));
        ScreenAction::Notify(Notification::info("Importing packages…"))
    }

    /// Collect the result of a finished import. `None` while still running or idle.
    pub async fn poll(&mut self) -> Option<Notification> {
        if !self.running.as_ref().is_some_and(|handle| handle.is_finished()) {
            return None;
        }
        let handle = self.running.take()?;

        let notification = match handle.await {
            Ok(Ok(summary)) => {
                let notification = summary.to_notification();
                self.last_summary = Some(summary);
                notification
            }
            Ok(Err(e)) => {
                error!("Package import failed: {}", e);
                Notification::error(e.to_string())
            }
            Err(e) => {
                error!("Package import task panicked: {}", e);
                Notification::error("The import stopped unexpectedly")
            }
        };
        Some(notification)
    }

    pub fn draw(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(area);

        let intro = vec![
            Line::from(format!(
                "Reads the \"{}\" column of the first sheet and creates one package per row.",
                PACKAGE_NAME_HEADER
            )),
            Line::from(format!(
                "Blank rows, names under {} characters and existing names are skipped.",
                MIN_NAME_LENGTH
            )),
            Line::from(Span::styled("Enter: import | Esc: back", Styles::inactive())),
        ];
        f.render_widget(
            Paragraph::new(intro).wrap(Wrap { trim: true }).block(
                Block::default()
                    .title("Import packages")
                    .borders(Borders::ALL)
                    .border_style(Styles::inactive_border()),
            ),
            chunks[0],
        );

        self.path.render(f, chunks[1]);

        let result: Vec<Line> = match (&self.running, &self.last_summary) {
            (Some(_), _) => vec![Line::from(Span::styled("Importing…", Styles::info()))],
            (None, Some(summary)) => {
                let mut lines = vec![
                    Line::from(Span::styled(
                        summary.to_string(),
                        Styles::severity(summary.to_notification().severity),
                    )),
                    Line::from(""),
                ];
                lines.extend(
                    summary
                        .error_messages
                        .iter()
                        .map(|message| Line::from(Span::styled(message.clone(), Styles::error()))),
                );
                lines
            }
            (None, None) => vec![Line::from(Span::styled("No import run yet", Styles::inactive()))],
        };
        f.render_widget(
            Paragraph::new(result).wrap(Wrap { trim: false }).block(
                Block::default()
                    .title("Result")
                    .borders(Borders::ALL)
                    .border_style(Styles::inactive_border()),
            ),
            chunks[2],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::memory::MemoryApi;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_empty_path_is_rejected() {
        let mut screen = ImportScreen::new(Arc::new(MemoryApi::<Package>::default()));
        match screen.handle_key_event(key(KeyCode::Enter)) {
            ScreenAction::Notify(notification) => {
                assert_eq!(notification.message, "Enter the path of an Excel file")
            }
            other => panic!("unexpected action: {:?}", other),
        }
        assert!(!screen.is_running());
    }

    #[tokio::test]
    async fn test_unsupported_file_reports_error() {
        let mut screen = ImportScreen::new(Arc::new(MemoryApi::<Package>::default()));
        for c in "names.csv".chars() {
            screen.handle_key_event(key(KeyCode::Char(c)));
        }
        screen.handle_key_event(key(KeyCode::Enter));
        assert!(screen.is_running());

        let notification = loop {
            if let Some(notification) = screen.poll().await {
                break notification;
            }
            tokio::task::yield_now().await;
        };
        assert!(notification.message.contains("Unsupported file"));
        assert!(!screen.is_running());
        assert!(screen.last_summary().is_none());
    }
}
