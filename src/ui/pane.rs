//! Sibling discussion-list pane.
//!
//! While a discussion is open, the discussion list survives as a
//! collapsed pane on the left edge of the screen. [`PaneState`] holds
//! the show/hide/enable state and the rect the pane occupied in the
//! last frame (for pointer enter/leave routing); [`DiscussionList`]
//! is the retained list view itself, with per-row cached render lines
//! ("subtrees") that survive diff redraws and are invalidated
//! explicitly.
//!
//! Hot-edge activation is a pure predicate over the pointer's column
//! so it can be tested without a terminal.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};

use crate::store::Discussion;
use crate::theme::Theme;
use crate::util::truncate_to_width;

/// True when the pointer column is inside the activation strip at the
/// left screen edge.
pub fn hot_edge(column: u16, threshold: u16) -> bool {
    column < threshold
}

// ============================================================================
// Pane state
// ============================================================================

/// Show/hide state of the collapsed discussion-list pane.
///
/// `enabled` gates the whole affordance: pointer bindings are only
/// honored while a discussion page keeps the pane enabled, and
/// disabling also hides it, so no binding can outlive the page that
/// installed it.
#[derive(Debug, Default)]
pub struct PaneState {
    enabled: bool,
    shown: bool,
    /// Pane area in the last rendered frame; None while hidden.
    pub last_rect: Option<Rect>,
    /// Set when the pane transitions to visible; the next render
    /// scrolls the active discussion row into view, once.
    needs_reveal: bool,
}

impl PaneState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.shown = false;
        self.last_rect = None;
    }

    pub fn show(&mut self) {
        if self.enabled && !self.shown {
            self.shown = true;
            self.needs_reveal = true;
        }
    }

    pub fn hide(&mut self) {
        self.shown = false;
        self.last_rect = None;
    }

    pub fn on_mouse_leave(&mut self) {
        self.hide();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_shown(&self) -> bool {
        self.enabled && self.shown
    }

    /// Consume the pending reveal request, if any.
    pub fn take_reveal(&mut self) -> bool {
        std::mem::take(&mut self.needs_reveal)
    }

    /// True when the pointer position is inside the last rendered
    /// pane rect.
    pub fn contains(&self, column: u16, row: u16) -> bool {
        self.last_rect
            .is_some_and(|r| column >= r.x && column < r.x + r.width && row >= r.y && row < r.y + r.height)
    }
}

// ============================================================================
// Retained discussion list view
// ============================================================================

/// A cached render of one list row. Built lazily at the width the
/// pane last rendered with; `invalidate` forces a rebuild.
#[derive(Debug, Default, Clone)]
pub struct Subtree {
    cached: Option<(u16, Line<'static>)>,
}

impl Subtree {
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }
}

/// The discussion list view, retained across navigations into
/// discussions. The index page owns it while the reader browses; the
/// view cache owns it while a discussion is open.
pub struct DiscussionList {
    pub discussions: Vec<Discussion>,
    pub selected: usize,
    pub scroll_top: usize,
    /// Discussion currently open in the main area, highlighted as the
    /// active row.
    active_id: Option<u64>,
    subtrees: Vec<Subtree>,
}

impl DiscussionList {
    pub fn new(discussions: Vec<Discussion>) -> Self {
        let subtrees = vec![Subtree::default(); discussions.len()];
        Self {
            discussions,
            selected: 0,
            scroll_top: 0,
            active_id: None,
            subtrees,
        }
    }

    pub fn active_id(&self) -> Option<u64> {
        self.active_id
    }

    /// Mark the active row, invalidating only the rows whose
    /// rendering changes.
    pub fn set_active(&mut self, id: Option<u64>) {
        if self.active_id == id {
            return;
        }
        let old = self.active_id;
        self.active_id = id;
        for (idx, d) in self.discussions.iter().enumerate() {
            if Some(d.id) == old || Some(d.id) == id {
                if let Some(subtree) = self.subtrees.get_mut(idx) {
                    subtree.invalidate();
                }
            }
        }
    }

    /// Throw away every cached row render. Used when arriving from a
    /// page that may have left the caches stale, and on theme change.
    pub fn invalidate_subtrees(&mut self) {
        for subtree in &mut self.subtrees {
            subtree.invalidate();
        }
    }

    pub fn subtree_cached(&self, idx: usize) -> bool {
        self.subtrees.get(idx).is_some_and(Subtree::is_cached)
    }

    pub fn select_next(&mut self) {
        if !self.discussions.is_empty() {
            self.selected = (self.selected + 1).min(self.discussions.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_discussion(&self) -> Option<&Discussion> {
        self.discussions.get(self.selected)
    }

    /// Keep the selected row inside a viewport of `rows`.
    pub fn clamp_scroll(&mut self, rows: usize) {
        if rows == 0 {
            return;
        }
        if self.selected < self.scroll_top {
            self.scroll_top = self.selected;
        } else if self.selected >= self.scroll_top + rows {
            self.scroll_top = self.selected + 1 - rows;
        }
    }

    /// Scroll so the active row is inside a viewport of `rows`, if it
    /// is not already. Called when the pane (re)attaches.
    pub fn reveal_active(&mut self, rows: usize) {
        let Some(active) = self.active_id else {
            return;
        };
        let Some(idx) = self.discussions.iter().position(|d| d.id == active) else {
            return;
        };
        if rows == 0 {
            return;
        }
        let visible = idx >= self.scroll_top && idx < self.scroll_top + rows;
        if !visible {
            self.scroll_top = idx.min(self.discussions.len().saturating_sub(1));
        }
    }

    /// The cached line for row `idx`, building it if missing or
    /// rendered at a different width. Selection highlighting is
    /// applied by the caller so the cache is selection-independent.
    pub fn row_line(&mut self, idx: usize, width: u16, theme: &Theme) -> Option<Line<'static>> {
        let discussion = self.discussions.get(idx)?;
        let subtree = self.subtrees.get_mut(idx)?;

        if let Some((cached_width, line)) = &subtree.cached {
            if *cached_width == width {
                return Some(line.clone());
            }
        }

        let is_active = Some(discussion.id) == self.active_id;
        let unread = discussion
            .last_post_number
            .saturating_sub(discussion.read_number.unwrap_or(0));

        let base_style = if is_active {
            theme.list_row_active
        } else {
            theme.list_row
        };

        let badge = if unread > 0 {
            format!(" ({})", unread)
        } else {
            String::new()
        };
        let title_width = (width as usize).saturating_sub(badge.len() + 2);
        let marker = if is_active { "▸ " } else { "  " };

        let mut spans = vec![Span::styled(
            format!(
                "{}{}",
                marker,
                truncate_to_width(&discussion.title, title_width)
            ),
            base_style,
        )];
        if unread > 0 {
            spans.push(Span::styled(badge, theme.list_unread_badge));
        }

        let line = Line::from(spans);
        subtree.cached = Some((width, line.clone()));
        Some(line)
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Render the collapsed list pane into `area`.
///
/// Honors the frame's redraw strategy: a `Full` pass throws away the
/// cached row subtrees first, a `Diff` pass reuses them. Also
/// performs the one-shot scroll-active-into-view when the pane has
/// just attached.
pub fn render_list_pane(f: &mut ratatui::Frame, app: &mut crate::app::App, area: Rect) {
    use ratatui::widgets::{Block, Borders, Paragraph};

    if area.width < 4 || area.height < 3 {
        return;
    }

    if app.redraw_strategy == crate::app::RedrawStrategy::Full {
        if let Some(list) = &mut app.cache.discussion_list {
            list.invalidate_subtrees();
        }
    }

    let Some(list) = &mut app.cache.discussion_list else {
        return;
    };

    app.pane.last_rect = Some(area);
    let inner_rows = area.height.saturating_sub(2) as usize;
    let inner_width = area.width.saturating_sub(2);

    if app.pane.take_reveal() {
        list.reveal_active(inner_rows);
    }
    list.clamp_scroll(inner_rows);

    let mut lines = Vec::with_capacity(inner_rows);
    for idx in list.scroll_top..(list.scroll_top + inner_rows).min(list.discussions.len()) {
        let Some(mut line) = list.row_line(idx, inner_width, &app.theme) else {
            continue;
        };
        if idx == list.selected {
            // Selection is frame state, applied over the cached line
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

#[cfg(test)]
mod tests {
    use super::*;

    fn test_discussion(id: u64, title: &str) -> Discussion {
        Discussion {
            id,
            title: title.to_string(),
            slug: None,
            comment_count: 3,
            last_post_number: 3,
            read_number: Some(1),
            can_reply: false,
        }
    }

    fn test_list(n: u64) -> DiscussionList {
        DiscussionList::new((1..=n).map(|i| test_discussion(i, &format!("Thread {}", i))).collect())
    }

    #[test]
    fn test_hot_edge_threshold() {
        assert!(hot_edge(0, 10));
        assert!(hot_edge(9, 10));
        assert!(!hot_edge(10, 10));
        assert!(!hot_edge(200, 10));
    }

    #[test]
    fn test_show_requires_enable() {
        let mut pane = PaneState::new();
        pane.show();
        assert!(!pane.is_shown());

        pane.enable();
        pane.show();
        assert!(pane.is_shown());
    }

    #[test]
    fn test_disable_hides() {
        let mut pane = PaneState::new();
        pane.enable();
        pane.show();
        pane.disable();
        assert!(!pane.is_shown());
        assert!(!pane.is_enabled());
    }

    #[test]
    fn test_reveal_requested_once_per_show() {
        let mut pane = PaneState::new();
        pane.enable();
        pane.show();
        assert!(pane.take_reveal());
        assert!(!pane.take_reveal());

        // Re-showing without an intervening hide changes nothing
        pane.show();
        assert!(!pane.take_reveal());

        pane.on_mouse_leave();
        pane.show();
        assert!(pane.take_reveal());
    }

    #[test]
    fn test_contains_uses_last_rect() {
        let mut pane = PaneState::new();
        assert!(!pane.contains(5, 5));
        pane.last_rect = Some(Rect::new(0, 1, 30, 20));
        assert!(pane.contains(0, 1));
        assert!(pane.contains(29, 20));
        assert!(!pane.contains(30, 5));
    }

    #[test]
    fn test_set_active_invalidates_only_affected_rows() {
        let mut list = test_list(4);
        let theme = Theme::dark();
        for idx in 0..4 {
            list.row_line(idx, 40, &theme);
        }
        assert!(list.subtree_cached(0) && list.subtree_cached(3));

        list.set_active(Some(2));
        assert!(list.subtree_cached(0));
        assert!(!list.subtree_cached(1)); // new active row rebuilt
        assert!(list.subtree_cached(3));

        list.row_line(1, 40, &theme);
        list.set_active(Some(4));
        assert!(!list.subtree_cached(1)); // old active invalidated
        assert!(!list.subtree_cached(3)); // new active invalidated
        assert!(list.subtree_cached(0));
    }

    #[test]
    fn test_row_line_recaches_on_width_change() {
        let mut list = test_list(1);
        let theme = Theme::dark();
        list.row_line(0, 40, &theme);
        assert!(list.subtree_cached(0));

        // Same width reuses the cache; a different width rebuilds
        let narrow = list.row_line(0, 10, &theme).unwrap();
        assert!(narrow.width() <= 10);
    }

    #[test]
    fn test_reveal_active_scrolls_when_outside_viewport() {
        let mut list = test_list(50);
        list.set_active(Some(40));
        list.reveal_active(10);
        assert_eq!(list.scroll_top, 39);

        // Already visible: no movement
        let before = list.scroll_top;
        list.reveal_active(10);
        assert_eq!(list.scroll_top, before);
    }

    #[test]
    fn test_clamp_scroll_follows_selection() {
        let mut list = test_list(30);
        list.selected = 25;
        list.clamp_scroll(10);
        assert_eq!(list.scroll_top, 16);

        list.selected = 3;
        list.clamp_scroll(10);
        assert_eq!(list.scroll_top, 3);
    }
}
