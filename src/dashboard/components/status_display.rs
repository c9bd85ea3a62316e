//! Status bar showing the current notification or key hints

use ratatui::{
    layout::Rect,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::crud::NotificationCenter;
use crate::dashboard::ui::Styles;

/// Render the toast if one is showing, otherwise the hint line
pub fn render_status_bar(f: &mut Frame, area: Rect, center: &NotificationCenter, hint: &str) {
    let (content, style) = match center.current() {
        Some(notification) => (
            format!(
                "{} [{}] {}",
                notification.severity.symbol(),
                notification.timestamp.format("%H:%M:%S"),
                notification.message
            ),
            Styles::severity(notification.severity),
        ),
        None => (hint.to_string(), Styles::inactive()),
    };

    let paragraph = Paragraph::new(content).style(style).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Styles::inactive_border()),
    );
    f.render_widget(paragraph, area);
}
