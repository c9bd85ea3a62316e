//! Terminal dashboard for managing studies and their reference data

pub mod app;
pub mod components;
pub mod screens;
pub mod traits;
pub mod ui;

pub use app::{run_dashboard, App, Screen};
pub use traits::{EntityScreen, ScreenAction};
