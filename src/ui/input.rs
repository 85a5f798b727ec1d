//! Input handling for the TUI.
//!
//! Keyboard input dispatches on the current page; pointer input
//! drives the pane hover/hot-edge bindings and stream scrolling.
//! Stream scrolls only queue position events here — the loop applies
//! them through `discussion::pump_stream_events` before the next
//! frame.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers, MouseEvent, MouseEventKind};
use tokio::sync::mpsc;

use crate::app::{App, AppEvent, Page};
use crate::route::Route;

use super::{discussion, index, pane};
use super::Action;

/// Main input dispatch function.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    // The composer overlay captures all keys while open
    if app.composer.is_open() {
        handle_composer_input(app, code);
        return Ok(Action::Continue);
    }

    match code {
        KeyCode::Char('q') => return Ok(Action::Quit),
        KeyCode::Char('t') => {
            let name = app.cycle_theme();
            app.set_status(format!("Theme: {}", name));
            return Ok(Action::Continue);
        }
        _ => {}
    }

    match app.page {
        Page::Index(_) => handle_index_input(app, code, event_tx),
        Page::Discussion(_) => handle_discussion_input(app, code, modifiers, event_tx),
        Page::Blank => {}
    }
    Ok(Action::Continue)
}

fn handle_index_input(app: &mut App, code: KeyCode, event_tx: &mpsc::Sender<AppEvent>) {
    match code {
        KeyCode::Char('j') | KeyCode::Down => {
            if let Page::Index(page) = &mut app.page {
                if let Some(list) = &mut page.list {
                    list.select_next();
                }
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if let Page::Index(page) = &mut app.page {
                if let Some(list) = &mut page.list {
                    list.select_prev();
                }
            }
        }
        KeyCode::Enter => {
            let target = match &app.page {
                Page::Index(page) => page
                    .list
                    .as_ref()
                    .and_then(|l| l.selected_discussion())
                    .map(|d| (d.id, d.slug.clone())),
                _ => None,
            };
            if let Some((id, slug)) = target {
                app.navigate(
                    Route::Discussion {
                        id,
                        slug,
                        near: None,
                    },
                    event_tx,
                );
            }
        }
        KeyCode::Char('r') => index::refresh(app, event_tx),
        _ => {}
    }
}

fn handle_discussion_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    match code {
        KeyCode::Char('j') | KeyCode::Down => scroll_stream(app, 1),
        KeyCode::Char('k') | KeyCode::Up => scroll_stream(app, -1),
        KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => scroll_stream(app, 5),
        KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => scroll_stream(app, -5),
        KeyCode::PageDown => scroll_stream(app, 5),
        KeyCode::PageUp => scroll_stream(app, -5),

        // First/last post go through the navigation pipeline so the
        // same-discussion unmount cancellation handles the jump.
        KeyCode::Char('g') => navigate_within(app, Some(1), event_tx),
        KeyCode::Char('G') => {
            let last = loaded_discussion(app).map(|(_, _, last)| last);
            if let Some(last) = last {
                navigate_within(app, Some(last), event_tx);
            }
        }

        KeyCode::Char('r') => discussion::refresh(app, event_tx),

        KeyCode::Char('o') => open_in_browser(app),

        KeyCode::Char('c') => {
            let gate = match &app.page {
                Page::Discussion(page) => {
                    page.discussion.as_ref().map(|d| (d.id, d.can_reply))
                }
                _ => None,
            };
            match gate {
                Some((id, true)) => app.composer.open_for(id),
                Some((_, false)) => app.set_status("You do not have permission to reply"),
                None => {}
            }
        }

        KeyCode::Char('m') => mark_as_read(app, event_tx),

        KeyCode::Esc => app.navigate(Route::Index, event_tx),
        _ => {}
    }
}

fn handle_composer_input(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => {
            app.composer.minimize();
            if app.composer.has_draft() {
                app.set_status("Draft minimized — press c to resume");
            }
        }
        KeyCode::Enter => app.composer.push_char('\n'),
        KeyCode::Backspace => app.composer.pop_char(),
        KeyCode::Char(c) => app.composer.push_char(c),
        _ => {}
    }
}

/// Pointer input: hover/hot-edge pane activation and wheel scrolling.
pub(super) fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved => {
            if !app.pane.is_enabled() {
                return;
            }
            let was_shown = app.pane.is_shown();
            if pane::hot_edge(mouse.column, app.pane_hot_edge)
                || app.pane.contains(mouse.column, mouse.row)
            {
                app.pane.show();
            } else if was_shown {
                app.pane.on_mouse_leave();
            }
            if app.pane.is_shown() != was_shown {
                app.needs_redraw = true;
            }
        }
        MouseEventKind::ScrollDown => wheel_scroll(app, 1),
        MouseEventKind::ScrollUp => wheel_scroll(app, -1),
        _ => {}
    }
}

fn wheel_scroll(app: &mut App, delta: i64) {
    if matches!(app.page, Page::Discussion(_)) {
        scroll_stream(app, delta);
        return;
    }
    if let Page::Index(page) = &mut app.page {
        if let Some(list) = &mut page.list {
            if delta > 0 {
                list.select_next();
            } else {
                list.select_prev();
            }
            app.needs_redraw = true;
        }
    }
}

fn scroll_stream(app: &mut App, delta: i64) {
    if let Page::Discussion(page) = &mut app.page {
        if let Some(stream) = &mut page.stream {
            stream.scroll_by(delta);
            app.needs_redraw = true;
        }
    }
}

/// (id, slug, last_post_number) of the loaded discussion, if any.
fn loaded_discussion(app: &App) -> Option<(u64, Option<String>, u64)> {
    let Page::Discussion(page) = &app.page else {
        return None;
    };
    page.discussion
        .as_ref()
        .map(|d| (d.id, d.slug.clone(), d.last_post_number))
}

fn navigate_within(app: &mut App, near: Option<u64>, event_tx: &mpsc::Sender<AppEvent>) {
    if let Some((id, slug, _)) = loaded_discussion(app) {
        app.navigate(Route::Discussion { id, slug, near }, event_tx);
    }
}

fn open_in_browser(app: &mut App) {
    let Page::Discussion(page) = &app.page else {
        return;
    };
    let Some(path) = page.canonical_path() else {
        return;
    };
    let url = format!("{}{}", app.forum_url.trim_end_matches('/'), path);
    match open::that(&url) {
        Ok(()) => app.set_status(format!("Opened {}", url)),
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Failed to open browser");
            app.set_status("Failed to open browser");
        }
    }
}

fn mark_as_read(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    if app.session.user().is_none() {
        app.set_status("Log in to track read progress");
        return;
    }
    let Page::Discussion(page) = &mut app.page else {
        return;
    };
    let Some(discussion) = &mut page.discussion else {
        return;
    };
    let last = discussion.last_post_number;
    if discussion.read_number.unwrap_or(0) >= last {
        return;
    }
    discussion.read_number = Some(last);

    let store = app.store.clone();
    let task_tx = event_tx.clone();
    let discussion_id = discussion.id;
    tokio::spawn(async move {
        let result = store.save_read_number(discussion_id, last).await;
        let _ = task_tx
            .send(AppEvent::ReadNumberSaved {
                discussion_id,
                result,
            })
            .await;
    });
    app.set_status("Marked as read");
}
