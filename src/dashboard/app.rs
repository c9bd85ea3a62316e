//! Main dashboard application state and event loop

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, info};

use super::components::render_status_bar;
use super::screens::{ImportScreen, MainMenuScreen, ResourceScreen};
use super::traits::{EntityScreen, ScreenAction};
use super::ui::{centered_rect, Styles};
use crate::api::{ApiClient, ResourceApi};
use crate::config::Config;
use crate::crud::{EntityTable, Notification, NotificationCenter, StudyReleaseGuard};
use crate::live::{apply_to, spawn_push_reader, ListenerAction, LiveUpdateListener};
use crate::models::{Acronym, Backup, DatabaseRelease, EntityKind, Package, Resource, Study, TextElement, User};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Application screens
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    MainMenu,
    Entity(EntityKind),
    Import,
}

impl Screen {
    fn title(&self) -> &'static str {
        match self {
            Screen::MainMenu => "Main Menu",
            Screen::Entity(kind) => kind.title(),
            Screen::Import => "Import packages",
        }
    }
}

fn boxed<R: Resource>(table: EntityTable<R>) -> Box<dyn EntityScreen> {
    Box::new(ResourceScreen::new(table))
}

/// Main dashboard state
pub struct App {
    pub current_screen: Screen,
    pub previous_screen: Option<Screen>,
    pub config: Config,

    pub main_menu: MainMenuScreen,
    entities: Vec<Box<dyn EntityScreen>>,
    pub import: ImportScreen,

    pub notifications: NotificationCenter,
    listener: LiveUpdateListener,
    push: Option<mpsc::Receiver<String>>,

    pub should_quit: bool,
    pub show_help_popup: bool,
}

impl App {
    /// Build every screen against the configured API
    pub fn new(config: Config) -> Result<Self> {
        let client = ApiClient::new(&config)?;
        let releases: Arc<dyn ResourceApi<DatabaseRelease>> = Arc::new(client.resource::<DatabaseRelease>());
        let packages: Arc<dyn ResourceApi<Package>> = Arc::new(client.resource::<Package>());

        let entities = vec![
            boxed(
                EntityTable::<Study>::new(Arc::new(client.resource()))
                    .with_guard(Arc::new(StudyReleaseGuard::new(releases.clone()))),
            ),
            boxed(EntityTable::new(releases)),
            boxed(EntityTable::new(packages.clone())),
            boxed(EntityTable::<TextElement>::new(Arc::new(client.resource()))),
            boxed(EntityTable::<Acronym>::new(Arc::new(client.resource()))),
            boxed(EntityTable::<Backup>::new(Arc::new(client.resource()))),
            boxed(EntityTable::<User>::new(Arc::new(client.resource()))),
        ];

        Ok(Self::from_parts(config, entities, ImportScreen::new(packages)))
    }

    pub fn from_parts(config: Config, entities: Vec<Box<dyn EntityScreen>>, import: ImportScreen) -> Self {
        let notifications = NotificationCenter::new().with_auto_clear(config.toast_timeout());
        Self {
            current_screen: Screen::MainMenu,
            previous_screen: None,
            config,
            main_menu: MainMenuScreen::new(),
            entities,
            import,
            notifications,
            listener: LiveUpdateListener::new(),
            push: None,
            should_quit: false,
            show_help_popup: false,
        }
    }

    /// Feed push messages from `rx` into the dashboard
    pub fn attach_push(&mut self, rx: mpsc::Receiver<String>) {
        self.push = Some(rx);
    }

    fn entity_mut(&mut self, kind: EntityKind) -> Option<&mut Box<dyn EntityScreen>> {
        self.entities.iter_mut().find(|screen| screen.kind() == kind)
    }

    /// Run the main application loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;

            if event::poll(POLL_INTERVAL)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key).await;
                    }
                }
            }

            self.drain_push().await;
            self.poll_import().await;
            self.notifications.tick();

            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    /// Handle keyboard input events
    pub async fn handle_key_event(&mut self, key: KeyEvent) {
        let captured = match self.current_screen.clone() {
            Screen::Entity(kind) => self
                .entity_mut(kind)
                .map(|screen| screen.captures_input())
                .unwrap_or(false),
            Screen::Import => true,
            Screen::MainMenu => false,
        };

        // Global shortcuts
        match key.code {
            KeyCode::F(1) => {
                self.show_help_popup = !self.show_help_popup;
                return;
            }
            KeyCode::Char('?') if !captured => {
                self.show_help_popup = !self.show_help_popup;
                return;
            }
            KeyCode::Esc if self.show_help_popup => {
                self.show_help_popup = false;
                return;
            }
            KeyCode::Char('q') if !captured => {
                self.should_quit = true;
                return;
            }
            _ => {}
        }
        if self.show_help_popup {
            return;
        }

        let action = match self.current_screen.clone() {
            Screen::MainMenu => self.main_menu.handle_key_event(key),
            Screen::Import => self.import.handle_key_event(key),
            Screen::Entity(kind) => match self.entity_mut(kind) {
                Some(screen) => screen.handle_key_event(key).await,
                None => ScreenAction::None,
            },
        };
        self.apply_action(action).await;
    }

    async fn apply_action(&mut self, action: ScreenAction) {
        match action {
            ScreenAction::NavigateTo(screen) => self.navigate_to_screen(screen).await,
            ScreenAction::NavigateBack => {
                let target = match self.current_screen {
                    Screen::Import => self.previous_screen.clone().unwrap_or(Screen::MainMenu),
                    _ => Screen::MainMenu,
                };
                self.navigate_to_screen(target).await;
            }
            ScreenAction::Notify(notification) => self.notifications.push(notification),
            ScreenAction::None => {}
        }
    }

    /// Navigate to a specific screen, loading entity lists on first visit
    pub async fn navigate_to_screen(&mut self, screen: Screen) {
        debug!("Navigating to {:?}", screen);
        self.previous_screen = Some(self.current_screen.clone());
        self.current_screen = screen.clone();

        if let Screen::Entity(kind) = screen {
            let failure = match self.entity_mut(kind) {
                Some(screen) => screen.on_enter().await,
                None => None,
            };
            if let Some(notification) = failure {
                self.notifications.push(notification);
            }
        }
    }

    /// Apply one raw push message
    pub async fn handle_push(&mut self, text: &str) {
        let action = match self.listener.handle(text) {
            Some(action) => action,
            None => return,
        };

        let notification = match action.kind() {
            Some(kind) => match self.entity_mut(kind) {
                Some(screen) => apply_to(action, screen.cache()).await,
                None => None,
            },
            None => match action {
                ListenerAction::Notify(notification) => Some(notification),
                _ => None,
            },
        };
        if let Some(notification) = notification {
            self.notifications.push(notification);
        }
    }

    async fn drain_push(&mut self) {
        let mut messages = Vec::new();
        let mut disconnected = false;
        if let Some(rx) = self.push.as_mut() {
            loop {
                match rx.try_recv() {
                    Ok(message) => messages.push(message),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }
        if disconnected {
            info!("Push channel closed, live updates stopped");
            self.push = None;
        }

        for message in messages {
            self.handle_push(&message).await;
        }
    }

    async fn poll_import(&mut self) {
        if let Some(notification) = self.import.poll().await {
            self.notifications.push(notification);
            let reloaded = match self.entity_mut(EntityKind::Package) {
                Some(screen) => screen.cache().reload().await.map(|_| ()),
                None => Ok(()),
            };
            if let Err(e) = reloaded {
                self.notifications
                    .push(Notification::error(format!("Failed to refresh packages: {}", e.message())));
            }
        }
    }

    /// Draw the UI
    pub fn draw(&mut self, f: &mut Frame) {
        let size = f.size();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        match self.current_screen.clone() {
            Screen::MainMenu => self.main_menu.draw(f, chunks[0]),
            Screen::Import => self.import.draw(f, chunks[0]),
            Screen::Entity(kind) => {
                if let Some(screen) = self.entity_mut(kind) {
                    screen.draw(f, chunks[0]);
                }
            }
        }

        let hint = format!(
            "Study Admin - {} | Esc: Back | q: Quit | F1/?: Help",
            self.current_screen.title()
        );
        render_status_bar(f, chunks[1], &self.notifications, &hint);

        if self.show_help_popup {
            self.draw_help_popup(f, size);
        }
    }

    fn draw_help_popup(&self, f: &mut Frame, area: Rect) {
        let popup_area = centered_rect(70, 70, area);
        f.render_widget(Clear, popup_area);

        let help = Paragraph::new(self.context_help())
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("Help - Context Shortcuts")
                    .borders(Borders::ALL)
                    .border_style(Styles::active_border()),
            );
        f.render_widget(help, popup_area);
    }

    fn context_help(&self) -> String {
        let global_help = "Global Shortcuts:\n\
            Esc - Go back\n\
            q - Quit (outside text input)\n\
            F1 / ? - Toggle this help\n\n";

        let screen_help = match self.current_screen {
            Screen::MainMenu => {
                "Main Menu:\n\
                ↑/↓ - Navigate menu\n\
                Enter - Select option\n\
                1-7 - Open a table directly\n\
                i - Import packages"
            }
            Screen::Entity(kind) => {
                if kind == EntityKind::Package {
                    "Table:\n\
                    ↑/↓ - Select row\n\
                    n - New | e/Enter - Edit | d - Delete | r - Reload\n\
                    i - Import packages from Excel\n\n\
                    Form:\n\
                    Tab/Shift+Tab - Move between fields\n\
                    ↑/↓ - Cycle choices\n\
                    Enter - Save | Esc - Cancel"
                } else {
                    "Table:\n\
                    ↑/↓ - Select row\n\
                    n - New | e/Enter - Edit | d - Delete | r - Reload\n\n\
                    Form:\n\
                    Tab/Shift+Tab - Move between fields\n\
                    ↑/↓ - Cycle choices\n\
                    Enter - Save | Esc - Cancel\n\n\
                    Delete confirmation:\n\
                    y - Delete | n/Esc - Cancel"
                }
            }
            Screen::Import => {
                "Import packages:\n\
                Type the path of an .xlsx or .xls file\n\
                Enter - Start import\n\
                Esc - Back"
            }
        };

        format!("{}{}", global_help, screen_help)
    }
}

/// Set up the terminal, run the dashboard until quit, then restore the terminal
pub async fn run_dashboard(config: Config) -> Result<()> {
    let mut app = App::new(config.clone())?;
    let (rx, reader) = spawn_push_reader(&config);
    app.attach_push(rx);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    // Dropping the app closes the channel; abort in case the reader is mid-reconnect
    drop(app);
    reader.abort();

    match &result {
        Ok(()) => info!("Dashboard exited"),
        Err(e) => error!("Dashboard failed: {}", e),
    }
    result
}
