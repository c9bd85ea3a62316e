//! Table widget for any `Resource`

use ratatui::{
    layout::{Constraint, Rect},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::crud::{EntityTable, TableState as LoadState};
use crate::dashboard::ui::{fit, Styles};
use crate::models::Resource;

/// Renders an `EntityTable`'s rows, or its empty/loading/error state
#[derive(Debug, Default)]
pub struct EntityTableView {
    state: TableState,
}

impl EntityTableView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render<R: Resource>(&mut self, f: &mut Frame, area: Rect, table: &EntityTable<R>) {
        let kind = R::KIND;
        let title = match table.state() {
            LoadState::Loading => format!("{} (loading…)", kind.title()),
            LoadState::Error(_) => format!("{} (refresh failed)", kind.title()),
            LoadState::Loaded => format!("{} ({})", kind.title(), table.items().len()),
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Styles::active_border());

        if table.is_empty() {
            let (text, style) = match table.state() {
                LoadState::Loading => ("Loading…".to_string(), Styles::inactive()),
                LoadState::Error(message) => (format!("Could not load {}: {}", kind.title().to_lowercase(), message), Styles::error()),
                LoadState::Loaded => (table.empty_message().to_string(), Styles::inactive()),
            };
            let paragraph = Paragraph::new(text)
                .style(style)
                .wrap(Wrap { trim: true })
                .block(block);
            f.render_widget(paragraph, area);
            return;
        }

        let columns = R::columns();
        let header = Row::new(
            columns
                .iter()
                .map(|column| Cell::from(column.header).style(Styles::title())),
        );
        let rows = table.items().iter().map(|item| {
            let cells = item
                .cells()
                .into_iter()
                .zip(columns.iter())
                .map(|(text, column)| Cell::from(fit(&text, column.width as usize)));
            Row::new(cells)
        });
        let widths: Vec<Constraint> = columns
            .iter()
            .map(|column| Constraint::Length(column.width))
            .collect();

        let widget = Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(2)
            .highlight_style(Styles::selected())
            .highlight_symbol("▶ ");

        self.state.select(table.selected_index());
        f.render_stateful_widget(widget, area, &mut self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ResourceApi;
    use crate::crud::memory::MemoryApi;
    use crate::models::{Acronym, Backup, DatabaseRelease, Package, Study, TextElement, User};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    async fn render_empty<R: Resource>() -> String {
        let api = Arc::new(MemoryApi::<R>::default());
        let mut table = EntityTable::new(api as Arc<dyn ResourceApi<R>>);
        table.reload().await.unwrap();

        let mut terminal = Terminal::new(TestBackend::new(120, 8)).unwrap();
        let mut view = EntityTableView::new();
        terminal
            .draw(|f| view.render(f, f.size(), &table))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    async fn assert_empty_state<R: Resource>() {
        let screen = render_empty::<R>().await;
        assert!(
            screen.contains(R::KIND.empty_message()),
            "{} table did not show its empty message",
            R::KIND
        );
    }

    #[tokio::test]
    async fn test_every_kind_renders_its_empty_message() {
        assert_empty_state::<Study>().await;
        assert_empty_state::<DatabaseRelease>().await;
        assert_empty_state::<Package>().await;
        assert_empty_state::<TextElement>().await;
        assert_empty_state::<Acronym>().await;
        assert_empty_state::<Backup>().await;
        assert_empty_state::<User>().await;
    }
}
