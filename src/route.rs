//! Route parsing/formatting, the navigable location, and the
//! breadcrumb history registry.
//!
//! Paths follow the forum's canonical URL scheme:
//!
//! - `/` — the discussion index
//! - `/d/{id}[-{slug}][/{near}]` — a discussion, optionally centered
//!   on post number `near`
//!
//! [`Location`] holds the current path and supports a *passive*
//! replace: updating the stored path without running the navigation
//! pipeline. Scroll-position feedback uses this so that writing the
//! reader's position back into the location can never re-enter the
//! fetch/teardown machinery.

/// A parsed navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Index,
    Discussion {
        id: u64,
        slug: Option<String>,
        near: Option<u64>,
    },
}

impl Route {
    /// Parse a path into a route. Returns None for paths outside the
    /// client's URL space.
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return Some(Route::Index);
        }

        let mut segments = path.split('/');
        match segments.next() {
            Some("d") => {}
            _ => return None,
        }

        let id_slug = segments.next()?;
        let (id_part, slug) = match id_slug.split_once('-') {
            Some((id, slug)) if !slug.is_empty() => (id, Some(slug.to_string())),
            Some((id, _)) => (id, None),
            None => (id_slug, None),
        };
        let id: u64 = id_part.parse().ok()?;

        let near = match segments.next() {
            Some(seg) => Some(seg.parse::<u64>().ok()?),
            None => None,
        };

        if segments.next().is_some() {
            return None;
        }

        Some(Route::Discussion { id, slug, near })
    }

    /// Format this route as a canonical path.
    pub fn to_path(&self) -> String {
        match self {
            Route::Index => "/".to_string(),
            Route::Discussion { id, slug, near } => {
                discussion_path(*id, slug.as_deref(), *near)
            }
        }
    }

    /// The discussion id this route targets, if any.
    pub fn discussion_id(&self) -> Option<u64> {
        match self {
            Route::Discussion { id, .. } => Some(*id),
            Route::Index => None,
        }
    }

    /// The `near` parameter, if present.
    pub fn near(&self) -> Option<u64> {
        match self {
            Route::Discussion { near, .. } => *near,
            Route::Index => None,
        }
    }
}

/// Canonical path for a discussion, optionally with slug and near
/// parameter.
pub fn discussion_path(id: u64, slug: Option<&str>, near: Option<u64>) -> String {
    let mut path = format!("/d/{}", id);
    if let Some(slug) = slug.filter(|s| !s.is_empty()) {
        path.push('-');
        path.push_str(slug);
    }
    if let Some(near) = near {
        path.push('/');
        path.push_str(&near.to_string());
    }
    path
}

// ============================================================================
// Location
// ============================================================================

/// The app-local navigable location.
///
/// `replace` is passive: it rewrites the stored path without any
/// navigation side effects. Route changes that should run the full
/// pipeline go through `app::navigate`, which calls `set` after the
/// page transition has been resolved.
#[derive(Debug)]
pub struct Location {
    path: String,
    replace_count: u64,
}

impl Location {
    pub fn new() -> Self {
        Self {
            path: "/".to_string(),
            replace_count: 0,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Passive replace — no navigation pipeline runs.
    pub fn replace(&mut self, path: String) {
        tracing::trace!(path = %path, "Location replaced");
        self.path = path;
        self.replace_count += 1;
    }

    /// Record the path of a completed navigation.
    pub fn set(&mut self, path: String) {
        self.path = path;
    }

    /// Number of passive replaces performed. Lets tests distinguish a
    /// passive update from a full navigation.
    pub fn replace_count(&self) -> u64 {
        self.replace_count
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// History
// ============================================================================

/// Breadcrumb registry of navigation destination kinds.
///
/// Tracks what *kind* of place the reader is at ("index",
/// "discussion") rather than exact routes; consecutive pushes of the
/// same kind collapse into one entry.
#[derive(Debug, Default)]
pub struct History {
    stack: Vec<&'static str>,
}

impl History {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn push(&mut self, kind: &'static str) {
        if self.stack.last() != Some(&kind) {
            self.stack.push(kind);
        }
    }

    pub fn top(&self) -> Option<&'static str> {
        self.stack.last().copied()
    }

    /// Pop the current kind and return what lies beneath it.
    pub fn back(&mut self) -> Option<&'static str> {
        self.stack.pop();
        self.top()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
