//! Application event handling.
//!
//! Routes background task completions — discussion/index fetches,
//! session resolution, read-position saves — into the page
//! controllers' handlers.

use tokio::sync::mpsc;

use crate::app::{App, AppEvent, Page};

use super::{discussion, index};

pub fn handle_app_event(app: &mut App, event: AppEvent, event_tx: &mpsc::Sender<AppEvent>) {
    match event {
        AppEvent::DiscussionLoaded { generation, result } => {
            discussion::handle_loaded(app, generation, result);
        }
        AppEvent::IndexLoaded { generation, result } => {
            index::handle_loaded(app, generation, result);
        }
        AppEvent::SessionResolved { result } => match result {
            Ok(Some(user)) => {
                app.set_status(format!("Logged in as {}", user.display_name));
                // Emits the loggedIn event; subscribed pages re-fetch.
                app.session.log_in(user);
            }
            Ok(None) => {
                tracing::debug!("No authenticated session (browsing anonymously)");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session resolution failed");
                app.set_status("Login failed; browsing anonymously");
            }
        },
        AppEvent::RefreshRequested => match app.page {
            Page::Discussion(_) => discussion::refresh(app, event_tx),
            Page::Index(_) => index::refresh(app, event_tx),
            Page::Blank => {}
        },
        AppEvent::ReadNumberSaved {
            discussion_id,
            result,
        } => {
            discussion::handle_read_number_saved(app, discussion_id, result);
        }
    }
}
