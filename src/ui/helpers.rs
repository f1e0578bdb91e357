use std::path::{Path, PathBuf};

use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::layout::{PageKind, PageSlot};
use crate::models::Songbook;

/// Repeat a short ASCII motif until it fills the requested width.
pub(crate) fn repeat_pattern_row(row: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if row.is_empty() {
        return " ".repeat(width);
    }
    let mut repeated = row.repeat(width / row.len() + 2);
    repeated.truncate(width);
    repeated
}

/// Center `[ title ]` in a row of `width` columns, clipping long titles.
pub(crate) fn title_plate(title: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return " ".repeat(width);
    }
    let decorated: String = format!("[ {trimmed} ]").chars().take(width).collect();
    let used = decorated.chars().count();
    let left = (width - used) / 2;
    let right = width - used - left;
    format!("{}{decorated}{}", " ".repeat(left), " ".repeat(right))
}

/// Cover card for the shelf: a repeating motif with the title plate near the
/// bottom and a line saying whether the book is public.
pub(crate) fn build_cover_lines(
    songbook: &Songbook,
    pattern: &[&str],
    inner_width: u16,
    inner_height: u16,
    selected: bool,
) -> Vec<Line<'static>> {
    let width = inner_width as usize;
    let height = inner_height as usize;
    if width == 0 || height == 0 {
        return vec![Line::from("")];
    }

    let pattern_style = if selected {
        Style::default().fg(Color::Gray)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let filler = || Line::from(Span::styled(" ".repeat(width), pattern_style));

    let footer_lines = height.min(3);
    let mut lines = Vec::with_capacity(height);
    for row_idx in 0..height - footer_lines {
        let row = match pattern.get(row_idx % pattern.len().max(1)) {
            Some(base) => repeat_pattern_row(base, width),
            None => " ".repeat(width),
        };
        lines.push(Line::from(Span::styled(row, pattern_style)));
    }
    if footer_lines >= 3 {
        lines.push(filler());
    }

    let plate = title_plate(&songbook.title, width);
    if selected {
        lines.push(Line::from(Span::styled(
            plate,
            Style::default().add_modifier(Modifier::BOLD),
        )));
    } else {
        lines.push(Line::from(plate));
    }

    if footer_lines >= 2 {
        let marker = if songbook.is_public { "public" } else { "private" };
        lines.push(Line::from(Span::styled(
            title_plate(marker, width),
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines
}

/// Header for one page panel of the viewer.
pub(crate) fn slot_caption(slot: &PageSlot) -> String {
    match (slot.kind, slot.page_number) {
        (PageKind::Content, Some(number)) => format!("Page {number}"),
        (kind, _) => kind.label().to_string(),
    }
}

/// Page image paths are stored relative to the image root; absolute paths
/// are used as they are.
pub(crate) fn image_location(root: &Path, image: &str) -> PathBuf {
    let path = Path::new(image);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}
