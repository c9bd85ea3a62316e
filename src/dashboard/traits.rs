//! Core traits for the dashboard screens

use async_trait::async_trait;
use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::crud::Notification;
use crate::dashboard::app::Screen;
use crate::live::CacheTarget;
use crate::models::EntityKind;

/// Actions that can be returned from screen event handling
#[derive(Debug, Clone)]
pub enum ScreenAction {
    /// Navigate to a different screen
    NavigateTo(Screen),
    /// Go back to the main menu
    NavigateBack,
    /// Show a notification
    Notify(Notification),
    /// No action taken
    None,
}

/// One CRUD screen, type-erased so the app can hold every entity kind together
#[async_trait]
pub trait EntityScreen: Send {
    fn kind(&self) -> EntityKind;

    /// Draw the screen content
    fn draw(&mut self, f: &mut Frame, area: Rect);

    /// Handle keyboard input and return an action
    async fn handle_key_event(&mut self, key: KeyEvent) -> ScreenAction;

    /// Called when the screen becomes active; loads the list the first time
    async fn on_enter(&mut self) -> Option<Notification>;

    /// True while a popup owns the keyboard (global shortcuts are suspended)
    fn captures_input(&self) -> bool;

    /// The cache push events are applied to
    fn cache(&mut self) -> &mut dyn CacheTarget;
}
