//! Dashboard screens

pub mod import;
pub mod menu;
pub mod resource;

pub use import::ImportScreen;
pub use menu::MainMenuScreen;
pub use resource::ResourceScreen;
