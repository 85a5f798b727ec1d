//! Discussion index page.
//!
//! Shows the full discussion list. On navigation into a discussion
//! the list view instance is parked in the app-wide view cache so the
//! sibling pane can present it without a reload; returning to the
//! index takes the same instance back, scroll position and all.

use ratatui::layout::Rect;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use tokio::sync::mpsc;

use crate::app::{App, AppEvent, Page};
use crate::store::StoreError;

use super::pane::DiscussionList;

pub struct IndexPage {
    /// The list view. None while the initial load is in flight.
    pub list: Option<DiscussionList>,
    fetch_generation: u64,
}

/// Navigation entry for the index route.
pub fn open(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    app.history.push("index");
    app.set_title("All Discussions");
    // The pane affordance belongs to discussion pages only.
    app.pane.disable();

    let mut page = IndexPage {
        list: None,
        fetch_generation: 0,
    };

    if let Some(mut list) = app.cache.discussion_list.take() {
        // Returning from a discussion: reuse the retained instance.
        list.set_active(None);
        page.list = Some(list);
        app.page = Page::Index(page);
        return;
    }

    page.fetch_generation = 1;
    let generation = page.fetch_generation;
    app.page = Page::Index(page);
    spawn_list_fetch(app, generation, tx);
}

/// Re-fetch the index (manual refresh or login).
pub fn refresh(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let Page::Index(page) = &mut app.page else {
        return;
    };
    page.list = None;
    page.fetch_generation = page.fetch_generation.wrapping_add(1);
    let generation = page.fetch_generation;
    spawn_list_fetch(app, generation, tx);
    app.needs_redraw = true;
}

fn spawn_list_fetch(app: &App, generation: u64, tx: &mpsc::Sender<AppEvent>) {
    let store = app.store.clone();
    let task_tx = tx.clone();
    tokio::spawn(async move {
        let result = store.list_discussions().await;
        if task_tx
            .send(AppEvent::IndexLoaded { generation, result })
            .await
            .is_err()
        {
            tracing::warn!("Index load result dropped (receiver gone)");
        }
    });
}

pub fn handle_loaded(
    app: &mut App,
    generation: u64,
    result: Result<Vec<crate::store::Discussion>, StoreError>,
) {
    {
        let Page::Index(page) = &app.page else {
            tracing::debug!("Dropping index load for an unmounted page");
            return;
        };
        if generation != page.fetch_generation {
            tracing::debug!(generation, "Dropping stale index load");
            return;
        }
    }

    match result {
        Ok(discussions) => {
            tracing::info!(count = discussions.len(), "Discussion index loaded");
            if let Page::Index(page) = &mut app.page {
                page.list = Some(DiscussionList::new(discussions));
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Index fetch failed");
            app.set_status(format!("Failed to load discussions: {}", e));
        }
    }
    app.needs_redraw = true;
}

/// Park the list view in the cache on the way out. Called by the
/// navigation pipeline before the next page opens.
pub fn unmount(app: &mut App) {
    let Page::Index(page) = &mut app.page else {
        return;
    };
    if let Some(list) = page.list.take() {
        app.cache.discussion_list = Some(list);
    }
}

pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    let Page::Index(page) = &mut app.page else {
        return;
    };

    let Some(list) = &mut page.list else {
        let loading = Paragraph::new("Loading discussions…")
            .style(app.theme.loading)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(loading, area);
        return;
    };

    if area.width < 4 || area.height < 3 {
        return;
    }
    let inner_rows = area.height.saturating_sub(2) as usize;
    let inner_width = area.width.saturating_sub(2);
    list.clamp_scroll(inner_rows);

    let mut lines = Vec::with_capacity(inner_rows);
    for idx in list.scroll_top..(list.scroll_top + inner_rows).min(list.discussions.len()) {
        let Some(mut line) = list.row_line(idx, inner_width, &app.theme) else {
            continue;
        };
        if idx == list.selected {
            line = line.patch_style(app.theme.list_row_selected);
        }
        lines.push(line);
    }

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Discussions")
            .border_style(app.theme.border),
    );
    f.render_widget(widget, area);
}
