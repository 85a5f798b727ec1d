//! Frame composition: title bar, current page, status bar, and the
//! composer overlay.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Page};
use crate::util::truncate_to_width;

use super::{discussion, index, status};

pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();
    if area.width < 10 || area.height < 5 {
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    render_title_bar(f, app, chunks[0]);

    match app.page {
        Page::Blank => {
            let welcome = Paragraph::new("palaver — connecting to the forum…")
                .style(app.theme.loading)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(welcome, chunks[1]);
        }
        Page::Index(_) => index::render(f, app, chunks[1]),
        Page::Discussion(_) => discussion::render(f, app, chunks[1]),
    }

    if app.composer.is_open() {
        render_composer(f, app, chunks[1]);
    }

    status::render(f, app, chunks[2]);
}

fn render_title_bar(f: &mut Frame, app: &App, area: Rect) {
    let path = app.location.path();
    let title_budget = (area.width as usize).saturating_sub(path.len() + 3);
    let marker = match app.page_marker {
        Some(_) => "● ",
        None => "  ",
    };

    let line = Line::from(vec![
        Span::raw(marker),
        Span::raw(truncate_to_width(&app.title, title_budget).into_owned()),
        Span::raw(" "),
        Span::styled(path.to_string(), app.theme.post_meta),
    ]);
    f.render_widget(Paragraph::new(line).style(app.theme.title_bar), area);
}

/// Bottom overlay with the reply draft.
fn render_composer(f: &mut Frame, app: &App, area: Rect) {
    let height = area.height.min(8);
    let overlay = Rect::new(
        area.x,
        area.y + area.height - height,
        area.width,
        height,
    );

    f.render_widget(Clear, overlay);
    let draft = format!("{}▏", app.composer.draft());
    let widget = Paragraph::new(draft)
        .style(app.theme.composer)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Reply")
                .border_style(app.theme.border_focused),
        );
    f.render_widget(widget, overlay);
}
