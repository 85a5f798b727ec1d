//! Discussion page controller.
//!
//! Orchestrates one open discussion: the fetch/refresh lifecycle, the
//! post stream and its position feedback into the location, the
//! retained sibling list pane, and teardown. This is deliberately a
//! state machine over `App` rather than a widget: rendering reads the
//! state, every transition happens in the handlers below.
//!
//! Lifecycle, in order:
//!
//! 1. [`open`] — navigation entry: pane coordination, history,
//!    session subscription, then [`refresh`].
//! 2. [`refresh`] — clears the loaded discussion and spawns the
//!    fetch; the result comes back as `AppEvent::DiscussionLoaded`.
//! 3. [`handle_loaded`] — guarded setup: materialize the discussion,
//!    seed the stream, position it at the `near` target.
//! 4. [`position_changed`] — outbound sync: scroll feedback rewrites
//!    the location passively and persists read progress.
//! 5. [`before_unmount`] / [`unmount`] — cancel-or-teardown when the
//!    route changes.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;
use tokio::sync::mpsc;

use crate::app::{App, AppEvent, Page, RedrawStrategy};
use crate::route::{discussion_path, Route};
use crate::session::SessionEvent;
use crate::store::{Discussion, FindParams, Post, Record, StoreError};
use crate::util::{html_to_text, ItemList, ListenerId, Listeners};

use super::pane;
use super::scrubber;
use super::stream::{PostStream, StreamEvent};

/// Notifications emitted by the page for external listeners
/// (breadcrumb/title consumers, tests).
#[derive(Debug, Clone)]
pub enum PageEvent {
    Loaded(Discussion),
}

/// Outcome of asking the page whether a route change may unmount it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unmount {
    /// Route still targets this discussion; stay mounted.
    Cancel,
    /// Genuinely different destination; tear down.
    Proceed,
}

/// Sidebar entry descriptors, assembled by [`DiscussionPage::sidebar_items`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarItem {
    /// Split-button control set from the discussion's available actions.
    Controls(Vec<ControlAction>),
    /// Position scrubber bound to the live stream.
    Scrubber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Reply,
    OpenInBrowser,
    MarkAsRead,
}

impl ControlAction {
    pub fn hint(self) -> &'static str {
        match self {
            ControlAction::Reply => "[c]omment",
            ControlAction::OpenInBrowser => "[o]pen",
            ControlAction::MarkAsRead => "[m]ark read",
        }
    }
}

// ============================================================================
// Page state
// ============================================================================

pub struct DiscussionPage {
    /// The loaded discussion; None while a fetch is in flight. The
    /// view renders a loading indicator in that window and must never
    /// show partially-loaded post data.
    pub discussion: Option<Discussion>,

    /// Last confirmed reading position. Written inbound from the
    /// route's near parameter at refresh, outbound from stream
    /// position events. None is the canceled-unmount sentinel: the
    /// reposition was already handled and the next position event
    /// will re-establish it.
    pub current_near: Option<u64>,

    /// Stream over the loaded posts; rebuilt by every setup.
    pub stream: Option<PostStream>,

    pub events: Listeners<PageEvent>,

    /// Session-bus subscription, kept only so teardown can remove it.
    logged_in_handler: Option<ListenerId>,

    /// Monotonic fetch counter. A resolved fetch carrying an older
    /// value is stale (the page refreshed again, or a late resolution
    /// arrived after this page already replaced its data) and must
    /// not touch state.
    fetch_generation: u64,

    mounted: bool,
}

impl DiscussionPage {
    fn new() -> Self {
        Self {
            discussion: None,
            current_near: None,
            stream: None,
            events: Listeners::new(),
            logged_in_handler: None,
            fetch_generation: 0,
            mounted: false,
        }
    }

    /// Ordered, keyed sidebar descriptors: the control set derived
    /// from the discussion's available actions, then the scrubber.
    pub fn sidebar_items(&self) -> ItemList<SidebarItem> {
        let mut items = ItemList::new();

        let mut controls = Vec::new();
        if let Some(discussion) = &self.discussion {
            if discussion.can_reply {
                controls.push(ControlAction::Reply);
            }
            controls.push(ControlAction::OpenInBrowser);
            if discussion.read_number.unwrap_or(0) < discussion.last_post_number {
                controls.push(ControlAction::MarkAsRead);
            }
        }
        items.add("controls", SidebarItem::Controls(controls));
        items.add("scrubber", SidebarItem::Scrubber);
        items
    }

    /// Canonical browser URL for the current position, for
    /// open-in-browser.
    pub fn canonical_path(&self) -> Option<String> {
        let discussion = self.discussion.as_ref()?;
        Some(discussion_path(
            discussion.id,
            discussion.slug.as_deref(),
            self.current_near.filter(|&n| n > 0),
        ))
    }
}

// ============================================================================
// §4.1 Construction & navigation entry
// ============================================================================

/// Navigation entry for a discussion route. The previous page is
/// still in `app.page` when this runs; it is replaced here.
pub fn open(app: &mut App, route: Route, tx: &mpsc::Sender<AppEvent>) {
    let arriving_from_discussion = app.page.is_discussion();

    if let Some(list) = &mut app.cache.discussion_list {
        if !arriving_from_discussion {
            // Coming from elsewhere: the cached rows may be stale
            // (read counts, ordering), force a full rebuild on next draw.
            list.invalidate_subtrees();
        } else {
            // Switching thread→thread: a full redraw would rebuild the
            // retained pane rows and fire a spurious hover transition,
            // so narrow this frame to a diff pass.
            app.redraw_strategy = RedrawStrategy::Diff;
        }
        list.set_active(route.discussion_id());
        app.pane.enable();
        app.pane.hide();
    }

    app.history.push("discussion");

    let mut page = DiscussionPage::new();

    // Re-fetch on login so permission-gated fields appear. The
    // subscriber runs outside the page borrow, so it forwards a
    // message instead of calling refresh directly.
    let refresh_tx = tx.clone();
    page.logged_in_handler = Some(app.session.on(move |event| {
        if matches!(event, SessionEvent::LoggedIn(_)) {
            if let Err(e) = refresh_tx.try_send(AppEvent::RefreshRequested) {
                tracing::warn!(error = %e, "Dropped login-triggered refresh request");
            }
        }
    }));

    app.page = Page::Discussion(page);
    refresh(app, tx);
}

// ============================================================================
// §4.2 Refresh / fetch
// ============================================================================

/// (Re)load discussion + posts for the current route. Reads the live
/// location so a canceled unmount that only changed the near
/// parameter is picked up on the next refresh.
pub fn refresh(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let Some(Route::Discussion { id, near, .. }) = Route::parse(app.location.path()) else {
        tracing::warn!(path = %app.location.path(), "Refresh outside a discussion route");
        return;
    };
    let Page::Discussion(page) = &mut app.page else {
        return;
    };

    page.current_near = Some(near.unwrap_or(0));
    page.discussion = None;
    page.stream = None;
    page.fetch_generation = page.fetch_generation.wrapping_add(1);
    let generation = page.fetch_generation;

    let store = app.store.clone();
    let task_tx = tx.clone();
    tokio::spawn(async move {
        let result = store.find_discussion(id, FindParams::near(near.unwrap_or(0))).await;
        if task_tx
            .send(AppEvent::DiscussionLoaded { generation, result })
            .await
            .is_err()
        {
            tracing::warn!("Discussion load result dropped (receiver gone)");
        }
    });

    // Explicit redraw signal: refreshes triggered outside a
    // navigation (login event) still need a frame for the loading state.
    app.needs_redraw = true;
}

// ============================================================================
// §4.3 Setup on data resolved
// ============================================================================

/// Extract the stream-worthy included posts: everything of type post
/// that is either not a comment or has server-rendered content,
/// sorted ascending by numeric id for deterministic seeding.
pub fn included_posts(included: &[Record]) -> Vec<Post> {
    let mut posts: Vec<Post> = included
        .iter()
        .filter_map(Record::as_post)
        .filter(|p| !p.is_comment() || p.content_html.is_some())
        .cloned()
        .collect();
    posts.sort_by_key(|p| p.id);
    posts
}

pub fn handle_loaded(
    app: &mut App,
    generation: u64,
    result: Result<crate::store::DiscussionBundle, StoreError>,
) {
    // Liveness guard: the page may have been torn down or refreshed
    // again while this fetch was in flight.
    {
        let Page::Discussion(page) = &app.page else {
            tracing::debug!("Dropping discussion load for an unmounted page");
            return;
        };
        if generation != page.fetch_generation {
            tracing::debug!(
                generation,
                current = page.fetch_generation,
                "Dropping stale discussion load"
            );
            return;
        }
    }

    let bundle = match result {
        Ok(bundle) => bundle,
        Err(e) => {
            // The view stays in its loading state; the status line is
            // the host-level surface for the failure.
            tracing::error!(error = %e, "Discussion fetch failed");
            app.set_status(format!("Failed to load discussion: {}", e));
            return;
        }
    };

    let near_param = Route::parse(app.location.path()).and_then(|r| r.near());

    app.set_title(bundle.discussion.title.clone());

    let posts = included_posts(&bundle.included);
    let mut stream = PostStream::new(&bundle.discussion, posts);
    // Initial placement, not reader movement: instantaneous jump.
    stream.go_to_number(near_param.unwrap_or(1), true);

    let Page::Discussion(page) = &mut app.page else {
        return;
    };
    page.stream = Some(stream);
    page.discussion = Some(bundle.discussion.clone());
    page.events.emit(&PageEvent::Loaded(bundle.discussion));
    app.needs_redraw = true;
}

// ============================================================================
// §4.4 Mount / unmount
// ============================================================================

/// First-render mount hook: applies the page marker that teardown
/// removes.
fn ensure_mounted(app: &mut App) {
    let Page::Discussion(page) = &mut app.page else {
        return;
    };
    if !page.mounted {
        page.mounted = true;
        app.page_marker = Some("discussion-page");
    }
}

/// Decide whether a route change may unmount this page.
///
/// Routing to the same discussion cancels the unmount; if the near
/// parameter actually changed, the stream is told to navigate there
/// (animated — this is a reader-visible move, unlike initial
/// placement). `current_near` is cleared as the handled sentinel
/// either way.
pub fn before_unmount(app: &mut App, next: &Route) -> Unmount {
    let Page::Discussion(page) = &mut app.page else {
        return Unmount::Proceed;
    };
    let Some(discussion) = &page.discussion else {
        // Nothing loaded yet; a route change proceeds normally.
        return Unmount::Proceed;
    };

    if next.discussion_id() != Some(discussion.id) {
        return Unmount::Proceed;
    }

    if Some(next.near().unwrap_or(0)) != page.current_near {
        if let Some(stream) = &mut page.stream {
            stream.go_to_number(next.near().unwrap_or(1), false);
        }
    }
    page.current_near = None;
    Unmount::Cancel
}

/// Full teardown: disable the pane, minimize any open composer,
/// remove the login subscription, drop the page marker.
pub fn unmount(app: &mut App) {
    app.pane.disable();
    app.composer.minimize();
    app.page_marker = None;

    let Page::Discussion(page) = &mut app.page else {
        return;
    };
    page.mounted = false;
    if let Some(handler) = page.logged_in_handler.take() {
        if !app.session.off(handler) {
            tracing::warn!("Login handler was already unsubscribed");
        }
    }
}

// ============================================================================
// §4.5 Position feedback (stream → location)
// ============================================================================

/// Drain stream events and apply them. Called once per loop turn by
/// the shell, after input handling and ticks.
pub fn pump_stream_events(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let events = {
        let Page::Discussion(page) = &mut app.page else {
            return;
        };
        match &mut page.stream {
            Some(stream) => stream.take_events(),
            None => return,
        }
    };
    for event in events {
        match event {
            StreamEvent::PositionChanged { start, end } => position_changed(app, start, end, tx),
        }
    }
}

/// Propagate an in-stream position change into the location and the
/// reader's persisted read progress.
pub fn position_changed(app: &mut App, start: u64, end: u64, tx: &mpsc::Sender<AppEvent>) {
    let logged_in = app.session.user().is_some();

    let Page::Discussion(page) = &mut app.page else {
        return;
    };
    let Some(discussion) = &mut page.discussion else {
        return;
    };

    page.current_near = Some(start);

    // Passive replace: must not re-enter navigate/refresh — the data
    // on screen is already correct, only the address is behind.
    let path = discussion_path(discussion.id, discussion.slug.as_deref(), Some(start));
    app.location.replace(path);
    app.history.push("discussion");

    if logged_in && end > discussion.read_number.unwrap_or(0) {
        discussion.read_number = Some(end);

        let store = app.store.clone();
        let task_tx = tx.clone();
        let discussion_id = discussion.id;
        tokio::spawn(async move {
            let result = store.save_read_number(discussion_id, end).await;
            if task_tx
                .send(AppEvent::ReadNumberSaved {
                    discussion_id,
                    result,
                })
                .await
                .is_err()
            {
                tracing::warn!("Read-position result dropped (receiver gone)");
            }
        });
        app.needs_redraw = true;
    }
}

/// Server confirmation (or failure) of a read-position save.
pub fn handle_read_number_saved(
    app: &mut App,
    discussion_id: u64,
    result: Result<Discussion, StoreError>,
) {
    match result {
        Ok(updated) => {
            let Page::Discussion(page) = &mut app.page else {
                return;
            };
            if let Some(discussion) = &mut page.discussion {
                if discussion.id == discussion_id {
                    // Keep the larger of local and confirmed values: the
                    // reader may have scrolled further while the save was
                    // in flight.
                    if updated.read_number > discussion.read_number {
                        discussion.read_number = updated.read_number;
                    }
                }
            }
        }
        Err(e) => {
            tracing::warn!(discussion = discussion_id, error = %e, "Failed to save read position");
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

const LOADING_MESSAGE: &str = "Loading discussion…";

/// Render the discussion page: optional list pane on the left, then
/// hero, control hints, and the post stream (or the loading state).
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    ensure_mounted(app);

    let pane_visible = app.pane.is_shown() && app.cache.discussion_list.is_some();
    let main_area = if pane_visible {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(32), Constraint::Min(20)])
            .split(area);
        pane::render_list_pane(f, app, chunks[0]);
        chunks[1]
    } else {
        area
    };

    let Page::Discussion(page) = &mut app.page else {
        return;
    };

    let Some(discussion) = &page.discussion else {
        let loading = Paragraph::new(LOADING_MESSAGE)
            .style(app.theme.loading)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(loading, main_area);
        return;
    };

    // Hero + control hints + stream
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Min(3),
        ])
        .split(main_area);

    let hero = vec![
        Line::from(Span::styled(discussion.title.clone(), app.theme.hero_title)),
        Line::from(Span::styled(
            format!(
                "{} comments · last post #{}",
                discussion.comment_count, discussion.last_post_number
            ),
            app.theme.post_meta,
        )),
    ];
    f.render_widget(Paragraph::new(hero), chunks[0]);

    let items = page.sidebar_items();
    let mut hints: Vec<String> = Vec::new();
    let mut show_scrubber = false;
    for (key, item) in items.iter() {
        match item {
            SidebarItem::Controls(controls) => {
                hints.extend(controls.iter().map(|c| c.hint().to_string()));
            }
            SidebarItem::Scrubber => show_scrubber = true,
        }
        tracing::trace!(key, "Sidebar item assembled");
    }
    f.render_widget(
        Paragraph::new(hints.join("  ")).style(app.theme.post_meta),
        chunks[1],
    );

    // Stream area, with a scrubber gutter on the right when present
    let (stream_area, scrubber_area) = if show_scrubber {
        let split = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(8)])
            .split(chunks[2]);
        (split[0], Some(split[1]))
    } else {
        (chunks[2], None)
    };

    if let Some(stream) = &mut page.stream {
        render_stream(f, stream, &app.store, &app.theme, stream_area);
        if let Some(scrubber_area) = scrubber_area {
            scrubber::render(f, stream, &app.theme, scrubber_area);
        }
    }
}

/// Render the visible slice of the stream and feed measured layout
/// back into it.
fn render_stream(
    f: &mut Frame,
    stream: &mut super::stream::PostStream,
    store: &crate::store::Store,
    theme: &crate::theme::Theme,
    area: Rect,
) {
    if area.width < 3 || area.height < 3 {
        return;
    }
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_rows = area.height.saturating_sub(2) as usize;

    // Measure every post at the current width; the stream needs the
    // heights to know what a viewport of posts is.
    let mut heights: Vec<u16> = Vec::with_capacity(stream.posts().len());
    let mut blocks: Vec<Vec<Line>> = Vec::with_capacity(stream.posts().len());
    for post in stream.posts() {
        let lines = post_lines(post, store, theme, inner_width);
        heights.push(lines.len() as u16);
        blocks.push(lines);
    }
    stream.set_layout(inner_rows, heights);

    let mut lines: Vec<Line> = Vec::new();
    for block in blocks.into_iter().skip(stream.top_index()) {
        if lines.len() >= inner_rows {
            break;
        }
        lines.extend(block);
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

/// Lines for a single post: author/meta header, body, separator.
fn post_lines(
    post: &Post,
    store: &crate::store::Store,
    theme: &crate::theme::Theme,
    width: usize,
) -> Vec<Line<'static>> {
    let author = post
        .user_id
        .and_then(|id| store.user_by_id(id))
        .map(|u| u.display_name)
        .unwrap_or_else(|| "[deleted]".to_string());

    let time = post
        .created_at
        .map(|t| t.format(" · %Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    let mut lines = vec![Line::from(vec![
        Span::styled(format!("#{} ", post.number), theme.post_meta),
        Span::styled(author, theme.post_author),
        Span::styled(time, theme.post_meta),
    ])];

    if post.is_comment() {
        let body = post.content_html.as_deref().map(html_to_text).unwrap_or_default();
        for raw in body.lines() {
            // Hard-wrap to the measured width so heights match what
            // the terminal will show.
            let mut rest = raw;
            loop {
                let cut = wrap_point(rest, width.max(1));
                let (head, tail) = rest.split_at(cut);
                lines.push(Line::styled(head.to_string(), theme.post_body));
                rest = tail.trim_start();
                if rest.is_empty() {
                    break;
                }
            }
        }
    } else {
        lines.push(Line::styled(
            format!("— {} —", post.content_type),
            theme.post_event,
        ));
    }

    lines.push(Line::from(""));
    lines
}

/// Byte index to split `s` at so the head fits in `width` columns,
/// preferring the last space before the limit.
fn wrap_point(s: &str, width: usize) -> usize {
    use unicode_width::UnicodeWidthChar;

    let mut used = 0;
    let mut last_space = None;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            return match last_space {
                Some(space) if space > 0 => space,
                // No break opportunity: cut at the current char
                // boundary, or after the first char if nothing fits.
                _ if idx > 0 => idx,
                _ => c.len_utf8(),
            };
        }
        if c == ' ' {
            last_space = Some(idx);
        }
        used += w;
    }
    s.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: u64, number: u64, html: Option<&str>) -> Record {
        Record::Post(Post {
            id,
            number,
            content_type: "comment".to_string(),
            content_html: html.map(str::to_string),
            created_at: None,
            user_id: None,
        })
    }

    fn event_post(id: u64, number: u64) -> Record {
        Record::Post(Post {
            id,
            number,
            content_type: "discussionRenamed".to_string(),
            content_html: None,
            created_at: None,
            user_id: None,
        })
    }

    #[test]
    fn test_included_posts_excludes_unrendered_comments() {
        let included = vec![
            comment(1, 1, Some("<p>rendered</p>")),
            comment(2, 2, None),
            event_post(3, 3),
        ];
        let posts = included_posts(&included);
        let ids: Vec<u64> = posts.iter().map(|p| p.id).collect();
        // The unrendered comment is dropped; the event post has no
        // HTML but is not a comment, so it stays.
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_included_posts_sorted_numerically() {
        let included = vec![
            comment(100, 3, Some("x")),
            comment(9, 1, Some("x")),
            comment(21, 2, Some("x")),
        ];
        let posts = included_posts(&included);
        let ids: Vec<u64> = posts.iter().map(|p| p.id).collect();
        // Numeric order, not the lexical "100" < "21" < "9"
        assert_eq!(ids, vec![9, 21, 100]);
    }

    #[test]
    fn test_included_posts_ignores_non_posts() {
        let included = vec![
            Record::User(crate::store::User {
                id: 1,
                username: "u".into(),
                display_name: "U".into(),
            }),
            comment(2, 1, Some("x")),
        ];
        assert_eq!(included_posts(&included).len(), 1);
    }

    #[test]
    fn test_sidebar_items_keys_and_order() {
        let mut page = DiscussionPage::new();
        page.discussion = Some(Discussion {
            id: 1,
            title: "T".into(),
            slug: None,
            comment_count: 5,
            last_post_number: 5,
            read_number: Some(2),
            can_reply: true,
        });

        let items = page.sidebar_items();
        let keys: Vec<&str> = items.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["controls", "scrubber"]);

        match items.get("controls").unwrap() {
            SidebarItem::Controls(controls) => {
                assert_eq!(
                    controls,
                    &vec![
                        ControlAction::Reply,
                        ControlAction::OpenInBrowser,
                        ControlAction::MarkAsRead
                    ]
                );
            }
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn test_sidebar_controls_respect_permissions() {
        let mut page = DiscussionPage::new();
        page.discussion = Some(Discussion {
            id: 1,
            title: "T".into(),
            slug: None,
            comment_count: 5,
            last_post_number: 5,
            read_number: Some(5),
            can_reply: false,
        });

        match page.sidebar_items().get("controls").unwrap() {
            SidebarItem::Controls(controls) => {
                assert_eq!(controls, &vec![ControlAction::OpenInBrowser]);
            }
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn test_canonical_path_includes_position() {
        let mut page = DiscussionPage::new();
        page.discussion = Some(Discussion {
            id: 7,
            title: "T".into(),
            slug: Some("t".into()),
            comment_count: 5,
            last_post_number: 5,
            read_number: None,
            can_reply: false,
        });
        page.current_near = Some(4);
        assert_eq!(page.canonical_path().as_deref(), Some("/d/7-t/4"));

        page.current_near = None;
        assert_eq!(page.canonical_path().as_deref(), Some("/d/7-t"));
    }

    #[test]
    fn test_wrap_point_prefers_spaces() {
        let s = "hello brave new world";
        let cut = wrap_point(s, 12);
        assert_eq!(&s[..cut], "hello brave");
    }

    #[test]
    fn test_wrap_point_hard_breaks_long_words() {
        let s = "abcdefghij";
        let cut = wrap_point(s, 4);
        assert_eq!(cut, 4);
    }
}
