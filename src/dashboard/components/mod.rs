//! Reusable UI components for the dashboard

pub mod entity_table;
pub mod form_field;
pub mod status_display;

pub use entity_table::EntityTableView;
pub use form_field::FormField;
pub use status_display::render_status_bar;
