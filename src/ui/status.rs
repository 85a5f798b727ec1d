use crate::app::{App, Page};
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

/// Render the status bar: transient messages win, then contextual
/// keybinding hints.
pub(super) fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if app.composer.is_open() {
        Cow::Borrowed("Reply draft | ESC minimize")
    } else if !app.composer.is_open() && app.composer.has_draft() {
        Cow::Borrowed("✎ draft minimized — [c]resume | [q]uit")
    } else {
        match app.page {
            Page::Index(_) => {
                Cow::Borrowed("[Enter]open [j/k]move [r]efresh [t]heme [q]uit")
            }
            Page::Discussion(_) => Cow::Borrowed(
                "[j/k]scroll [g/G]first/last [c]omment [o]pen [m]ark read [ESC]index [q]uit",
            ),
            Page::Blank => Cow::Borrowed("Connecting…"),
        }
    };

    f.render_widget(Paragraph::new(text).style(app.theme.status_bar), area);
}
