use std::borrow::Cow;

use reqwest::redirect::Policy;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::route::{History, Location, Route};
use crate::session::Session;
use crate::store::{Discussion, DiscussionBundle, Store, StoreError, User};
use crate::theme::{Theme, ThemeVariant};
use crate::ui::discussion::{self, DiscussionPage, Unmount};
use crate::ui::index::{self, IndexPage};
use crate::ui::pane::{DiscussionList, PaneState};

/// How long a status message stays on screen.
const STATUS_TTL_SECS: u64 = 4;

// ============================================================================
// HTTP Client Configuration
// ============================================================================

/// Create a custom redirect policy with loop detection and limited
/// hops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Build the shared HTTP client: pooled connections, keepalive, a
/// default timeout, and the bounded redirect policy.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(std::time::Duration::from_secs(30))
        .tcp_keepalive(std::time::Duration::from_secs(60))
        .timeout(std::time::Duration::from_secs(30))
        .build()
}

// ============================================================================
// Events from background tasks
// ============================================================================

pub enum AppEvent {
    /// A discussion fetch resolved.
    ///
    /// `generation` is the value of the page's fetch counter when the
    /// task was spawned; mismatching results are stale and dropped.
    DiscussionLoaded {
        generation: u64,
        result: Result<DiscussionBundle, StoreError>,
    },
    /// The discussion index finished loading.
    IndexLoaded {
        generation: u64,
        result: Result<Vec<Discussion>, StoreError>,
    },
    /// Startup auth resolution finished.
    SessionResolved {
        result: Result<Option<User>, StoreError>,
    },
    /// A session subscriber asked the current page to re-fetch
    /// (e.g. login picked up permission-gated fields).
    RefreshRequested,
    /// A read-position persistence task finished.
    ReadNumberSaved {
        discussion_id: u64,
        result: Result<Discussion, StoreError>,
    },
}

// ============================================================================
// Pages
// ============================================================================

/// The currently mounted page controller.
pub enum Page {
    /// Start state, before the first navigation resolves.
    Blank,
    Index(IndexPage),
    Discussion(DiscussionPage),
}

impl Page {
    pub fn is_discussion(&self) -> bool {
        matches!(self, Page::Discussion(_))
    }
}

/// Redraw strategy for the next frame.
///
/// `Full` rebuilds every cached render subtree; `Diff` reuses them.
/// Navigation resets to `Full`, and the discussion page narrows it
/// back to `Diff` when switching discussion→discussion so the
/// retained list pane is not rebuilt (and no spurious pane hover
/// transitions fire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawStrategy {
    Full,
    Diff,
}

// ============================================================================
// Retained view cache
// ============================================================================

/// Process-wide cache of retained sibling views.
///
/// Holds at most one discussion list instance, parked here when the
/// reader enters a discussion so the pane can show it without a
/// reload and the index can take it back on return. Explicitly owned
/// by `App` and passed around — never ambient global state.
#[derive(Default)]
pub struct ViewCache {
    pub discussion_list: Option<DiscussionList>,
}

// ============================================================================
// Reply composer
// ============================================================================

/// Minimal reply composer: a draft bound to one discussion, either
/// open as an overlay or minimized to the status line. The draft
/// survives minimize so switching threads does not eat a half-written
/// reply.
#[derive(Debug, Default)]
pub struct Composer {
    discussion_id: Option<u64>,
    draft: String,
    open: bool,
}

impl Composer {
    pub fn open_for(&mut self, discussion_id: u64) {
        if self.discussion_id != Some(discussion_id) {
            self.draft.clear();
        }
        self.discussion_id = Some(discussion_id);
        self.open = true;
    }

    pub fn minimize(&mut self) {
        if self.open {
            tracing::debug!("Composer minimized");
        }
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn has_draft(&self) -> bool {
        !self.draft.is_empty()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn push_char(&mut self, c: char) {
        self.draft.push(c);
    }

    pub fn pop_char(&mut self) {
        self.draft.pop();
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state.
pub struct App {
    pub store: Store,
    /// Forum root URL, for composing browser-openable links.
    pub forum_url: String,
    pub session: Session,
    pub history: History,
    pub location: Location,
    pub cache: ViewCache,
    pub pane: PaneState,
    pub composer: Composer,
    pub page: Page,

    /// Terminal-title / header text for the current page.
    pub title: String,
    /// Marker applied while a page that wants one is mounted
    /// (the body-class equivalent of the web client).
    pub page_marker: Option<&'static str>,

    pub theme_variant: ThemeVariant,
    pub theme: Theme,

    /// Columns from the left edge that count as the pane hot edge.
    pub pane_hot_edge: u16,

    pub needs_redraw: bool,
    pub redraw_strategy: RedrawStrategy,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
}

impl App {
    pub fn new(
        store: Store,
        forum_url: String,
        theme_variant: ThemeVariant,
        pane_hot_edge: u16,
    ) -> Self {
        Self {
            store,
            forum_url,
            session: Session::new(),
            history: History::new(),
            location: Location::new(),
            cache: ViewCache::default(),
            pane: PaneState::new(),
            composer: Composer::default(),
            page: Page::Blank,
            title: String::new(),
            page_marker: None,
            theme_variant,
            theme: theme_variant.styles(),
            pane_hot_edge,
            needs_redraw: true,
            redraw_strategy: RedrawStrategy::Full,
            status_message: None,
        }
    }

    /// Run the navigation pipeline for `route`.
    ///
    /// The current page may cancel its own teardown (route still
    /// targets the same discussion); otherwise it is unmounted and the
    /// new page controller takes over. Passive location updates from
    /// position feedback never come through here.
    pub fn navigate(&mut self, route: Route, tx: &mpsc::Sender<AppEvent>) {
        tracing::info!(path = %route.to_path(), "Navigating");

        match self.page {
            Page::Discussion(_) => match discussion::before_unmount(self, &route) {
                Unmount::Cancel => {
                    self.location.set(route.to_path());
                    self.needs_redraw = true;
                    return;
                }
                Unmount::Proceed => discussion::unmount(self),
            },
            // The index parks its list view for the sibling pane.
            Page::Index(_) => index::unmount(self),
            Page::Blank => {}
        }

        self.redraw_strategy = RedrawStrategy::Full;
        self.location.set(route.to_path());

        match route {
            Route::Index => index::open(self, tx),
            Route::Discussion { .. } => discussion::open(self, route, tx),
        }
        self.needs_redraw = true;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.needs_redraw = true;
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
        self.needs_redraw = true;
    }

    /// Drop an expired status message. Returns true if one was
    /// cleared so the caller can request a redraw.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, since)) = &self.status_message {
            if since.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    /// Switch theme variant and force a full rebuild of cached
    /// renders, which all bake in the old palette.
    pub fn cycle_theme(&mut self) -> &'static str {
        self.theme_variant = self.theme_variant.next();
        self.theme = self.theme_variant.styles();
        if let Some(list) = &mut self.cache.discussion_list {
            list.invalidate_subtrees();
        }
        self.redraw_strategy = RedrawStrategy::Full;
        self.needs_redraw = true;
        self.theme_variant.name()
    }
}
