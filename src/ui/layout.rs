use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppLayout {
    pub status: Rect,
    pub notice: Rect,
    pub transcript: Rect,
    pub contract: Rect,
    pub tasks: Rect,
    pub input: Rect,
}

/// Vertical split: status line, notice line, live transcript, parsed-content
/// columns, single-row input prompt. `content_rows` may be 0 while nothing
/// has been uploaded yet.
pub fn split_app_layout(area: Rect, content_rows: u16) -> AppLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(content_rows),
            Constraint::Length(1),
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[3]);

    AppLayout {
        status: chunks[0],
        notice: chunks[1],
        transcript: chunks[2],
        contract: columns[0],
        tasks: columns[1],
        input: chunks[4],
    }
}
