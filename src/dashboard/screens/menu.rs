//! Main menu listing every managed entity type

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::dashboard::app::Screen;
use crate::dashboard::traits::ScreenAction;
use crate::dashboard::ui::Styles;
use crate::models::EntityKind;

/// Main menu options
#[derive(Debug, Clone)]
pub struct MenuOption {
    pub title: String,
    pub description: String,
    pub shortcut: char,
    pub screen: Screen,
}

impl MenuOption {
    pub fn new(title: &str, description: &str, shortcut: char, screen: Screen) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            shortcut,
            screen,
        }
    }
}

/// Main menu screen state
pub struct MainMenuScreen {
    pub menu_state: ListState,
    pub menu_options: Vec<MenuOption>,
}

impl Default for MainMenuScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl MainMenuScreen {
    pub fn new() -> Self {
        let mut menu_options: Vec<MenuOption> = EntityKind::ALL
            .iter()
            .zip('1'..='9')
            .map(|(kind, shortcut)| {
                MenuOption::new(
                    kind.title(),
                    &format!("List, create, edit and delete {}", kind.title().to_lowercase()),
                    shortcut,
                    Screen::Entity(*kind),
                )
            })
            .collect();
        menu_options.push(MenuOption::new(
            "Import packages",
            "Create packages in bulk from an Excel sheet",
            'i',
            Screen::Import,
        ));

        let mut menu_state = ListState::default();
        menu_state.select(Some(0));

        Self {
            menu_state,
            menu_options,
        }
    }

    pub fn selected_screen(&self) -> Option<Screen> {
        self.menu_state
            .selected()
            .and_then(|i| self.menu_options.get(i))
            .map(|option| option.screen.clone())
    }

    /// Handle key events for the main menu
    pub fn handle_key_event(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                let selected = self.menu_state.selected().unwrap_or(0);
                let new_selected = if selected == 0 {
                    self.menu_options.len() - 1
                } else {
                    selected - 1
                };
                self.menu_state.select(Some(new_selected));
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let selected = self.menu_state.selected().unwrap_or(0);
                let new_selected = (selected + 1) % self.menu_options.len();
                self.menu_state.select(Some(new_selected));
            }
            KeyCode::Enter => {
                if let Some(screen) = self.selected_screen() {
                    return ScreenAction::NavigateTo(screen);
                }
            }
            KeyCode::Char(c) => {
                let lower = c.to_ascii_lowercase();
                if let Some(option) = self.menu_options.iter().find(|option| option.shortcut == lower) {
                    return ScreenAction::NavigateTo(option.screen.clone());
                }
            }
            _ => {}
        }
        ScreenAction::None
    }

    /// Draw the main menu screen
    pub fn draw(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Min(0),    // Menu
                Constraint::Length(5), // Instructions
            ])
            .split(area);

        self.draw_title(f, chunks[0]);
        self.draw_menu(f, chunks[1]);
        self.draw_instructions(f, chunks[2]);
    }

    fn draw_title(&self, f: &mut Frame, area: Rect) {
        let title = Paragraph::new("Study Administration")
            .style(Styles::title().add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, area);
    }

    fn draw_menu(&mut self, f: &mut Frame, area: Rect) {
        let selected = self.menu_state.selected();
        let items: Vec<ListItem> = self
            .menu_options
            .iter()
            .enumerate()
            .map(|(i, option)| {
                let style = if Some(i) == selected {
                    Styles::selected()
                } else {
                    Style::default()
                };

                let content = vec![
                    Line::from(vec![
                        Span::styled(format!("[{}] ", option.shortcut), Styles::info()),
                        Span::styled(option.title.clone(), style.add_modifier(Modifier::BOLD)),
                    ]),
                    Line::from(Span::styled(
                        format!("     {}", option.description),
                        if Some(i) == selected { style } else { Styles::inactive() },
                    )),
                ];

                ListItem::new(content)
            })
            .collect();

        let menu = List::new(items)
            .block(
                Block::default()
                    .title("Main Menu")
                    .borders(Borders::ALL)
                    .border_style(Styles::active_border()),
            )
            .highlight_style(Styles::selected());

        f.render_stateful_widget(menu, area, &mut self.menu_state);
    }

    fn draw_instructions(&self, f: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let instructions = vec![
            Line::from(vec![
                Span::styled("Navigation: ", Styles::info()),
                Span::raw("↑/↓ to move, "),
                Span::styled("Enter", bold),
                Span::raw(" to select"),
            ]),
            Line::from(vec![
                Span::styled("Shortcuts: ", Styles::info()),
                Span::styled("1-7", bold),
                Span::raw(" open a table, "),
                Span::styled("i", bold),
                Span::raw(" imports packages, "),
                Span::styled("q", bold),
                Span::raw(" quits, "),
                Span::styled("F1/?", bold),
                Span::raw(" for help"),
            ]),
        ];

        let paragraph = Paragraph::new(instructions).block(
            Block::default()
                .title("Instructions")
                .borders(Borders::ALL)
                .border_style(Styles::inactive_border()),
        );

        f.render_widget(paragraph, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_digit_shortcuts_open_entity_screens() {
        let mut menu = MainMenuScreen::new();
        match menu.handle_key_event(key(KeyCode::Char('3'))) {
            ScreenAction::NavigateTo(Screen::Entity(kind)) => assert_eq!(kind, EntityKind::ALL[2]),
            other => panic!("unexpected action: {:?}", other),
        }
        assert!(matches!(
            menu.handle_key_event(key(KeyCode::Char('I'))),
            ScreenAction::NavigateTo(Screen::Import)
        ));
    }

    #[test]
    fn test_navigation_wraps() {
        let mut menu = MainMenuScreen::new();
        menu.handle_key_event(key(KeyCode::Up));
        assert_eq!(menu.selected_screen(), Some(Screen::Import));
        menu.handle_key_event(key(KeyCode::Down));
        assert_eq!(menu.selected_screen(), Some(Screen::Entity(EntityKind::ALL[0])));
    }
}
