use crate::state::line_is_flagged;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthChar;

// Flagged lines carry the analyzer's uncertainty marker; same orange the
// original viewer used.
const FLAG_BACKGROUND: Color = Color::Rgb(255, 140, 0);

/// Single-row prompt. File paths outgrow the pane quickly, so the buffer
/// scrolls horizontally to keep the cursor in view.
pub fn render_input(frame: &mut Frame<'_>, area: Rect, input: &str, cursor_byte: usize) {
    if area.height == 0 || area.width <= 2 {
        return;
    }

    let visible_cols = area.width.saturating_sub(2) as usize;
    let (window, cursor_col) = visible_window(input, cursor_byte, visible_cols);

    frame.render_widget(
        Paragraph::new(format!("> {window}")).style(Style::default().fg(Color::Gray)),
        area,
    );

    let cursor_x = area
        .x
        .saturating_add(2 + cursor_col as u16)
        .min(area.x.saturating_add(area.width.saturating_sub(1)));
    frame.set_cursor_position((cursor_x, area.y));
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let text = truncate_line(status, area.width as usize);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

/// The single message row under the status line: an error (red) takes
/// precedence over the busy indicator (dim).
pub fn render_notice_line(frame: &mut Frame<'_>, area: Rect, error: Option<&str>, busy: bool) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let (text, style) = match error {
        Some(message) => (
            truncate_line(message, area.width as usize),
            Style::default().fg(Color::Red),
        ),
        None if busy => (
            "Processing...".to_string(),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
        ),
        None => (String::new(), Style::default()),
    };

    frame.render_widget(Paragraph::new(text).style(style), area);
}

pub fn render_transcript(frame: &mut Frame<'_>, area: Rect, lines: &[String], scroll: usize) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let rendered: Vec<Line> = lines
        .iter()
        .map(|line| {
            if line_is_flagged(line) {
                Line::styled(
                    line.clone(),
                    Style::default().fg(Color::Black).bg(FLAG_BACKGROUND),
                )
            } else {
                Line::from(line.clone())
            }
        })
        .collect();

    let paragraph = Paragraph::new(rendered)
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false })
        .scroll((scroll as u16, 0));
    frame.render_widget(paragraph, area);
}

pub fn render_content_pane(
    frame: &mut Frame<'_>,
    area: Rect,
    title: &str,
    lines: Option<&[String]>,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let body = match lines {
        Some(lines) => lines.join("\n"),
        None => String::new(),
    };
    frame.render_widget(
        Paragraph::new(body)
            .style(Style::default().fg(Color::White))
            .wrap(Wrap { trim: false }),
        inner,
    );
}

/// The slice of the buffer that fits `width` display columns with the cursor
/// in view, plus the cursor's column inside that slice. The window ends at
/// the cursor when the buffer overflows, so typing always shows the tail.
fn visible_window(input: &str, cursor_byte: usize, width: usize) -> (String, usize) {
    let width = width.max(1);
    let mut cells = Vec::new();
    let mut columns = 0usize;
    let mut cursor_column = None;
    for (index, ch) in input.char_indices() {
        if index >= cursor_byte && cursor_column.is_none() {
            cursor_column = Some(columns);
        }
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        cells.push((columns, ch_width, ch));
        columns += ch_width;
    }
    let cursor_column = cursor_column.unwrap_or(columns);

    let start = cursor_column.saturating_sub(width.saturating_sub(1));
    let window = cells
        .iter()
        .filter(|(column, ch_width, _)| *column >= start && column + ch_width <= start + width)
        .map(|(_, _, ch)| *ch)
        .collect();
    (window, cursor_column - start)
}

fn truncate_line(text: &str, width: usize) -> String {
    let width = width.max(1);
    let total: usize = text
        .chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum();
    if total <= width {
        return text.to_string();
    }

    let keep = if width < 4 { width } else { width - 3 };
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > keep {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    if width >= 4 {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_window_passes_short_input_through() {
        let (window, cursor) = visible_window("docx a.docx", 4, 40);
        assert_eq!(window, "docx a.docx");
        assert_eq!(cursor, 4);
    }

    #[test]
    fn test_visible_window_scrolls_to_cursor_at_end() {
        let input = "docx /very/long/path.docx";
        let (window, cursor) = visible_window(input, input.len(), 10);
        assert_eq!(window, "path.docx");
        assert_eq!(cursor, 9);
    }

    #[test]
    fn test_visible_window_keeps_start_when_cursor_is_early() {
        let (window, cursor) = visible_window("abcdefghij", 0, 4);
        assert_eq!(window, "abcd");
        assert_eq!(cursor, 0);
    }

    #[test]
    fn test_visible_window_excludes_wide_char_that_straddles_the_edge() {
        // Both chars are double-width; only the first fits two columns.
        let (window, cursor) = visible_window("漢字", 0, 2);
        assert_eq!(window, "漢");
        assert_eq!(cursor, 0);
    }

    #[test]
    fn test_truncate_line_appends_ellipsis_only_when_needed() {
        assert_eq!(truncate_line("short", 10), "short");
        assert_eq!(truncate_line("abcdefghij", 8), "abcde...");
        assert_eq!(truncate_line("abcdefghij", 3), "abc");
    }
}
