//! Typed record store over the forum API.
//!
//! The store is the data layer the page controllers talk to: it
//! materializes `Discussion`/`Post`/`User` records out of raw
//! JSON:API resources, keeps a bounded by-id cache of everything it
//! has seen, and exposes the handful of operations the client needs
//! (`find_discussion`, `list_discussions`, `current_user`,
//! `save_read_number`). Network failures surface as `Err`; callers
//! decide what a failed load means for their view. Transient-error
//! retry already happened inside the API client by the time a result
//! reaches this layer.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use lru::LruCache;
use thiserror::Error;

use crate::api::{ApiClient, ApiError, Resource};
use crate::util::strip_control_chars;

/// Records cached per type. Generous for a reading session; the point
/// is a bound, not an eviction strategy.
const RECORD_CACHE_CAPACITY: usize = 4096;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The server answered but the payload was missing required
    /// fields for the record type.
    #[error("Malformed {kind} record (id {id})")]
    MalformedRecord { kind: &'static str, id: String },
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discussion {
    pub id: u64,
    pub title: String,
    pub slug: Option<String>,
    pub comment_count: u64,
    /// Highest post number in the discussion; drives the scrubber.
    pub last_post_number: u64,
    /// The reader's persisted read position, when authenticated.
    pub read_number: Option<u64>,
    pub can_reply: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: u64,
    pub number: u64,
    /// "comment" for regular posts; other values are event posts
    /// (renamed, stickied, ...).
    pub content_type: String,
    /// Server-rendered HTML. Comment posts without this have not been
    /// prepared for display and must not be seeded into a stream.
    pub content_html: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub user_id: Option<u64>,
}

impl Post {
    pub fn is_comment(&self) -> bool {
        self.content_type == "comment"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub display_name: String,
}

/// Any record the store can materialize from an included resource.
#[derive(Debug, Clone)]
pub enum Record {
    Discussion(Discussion),
    Post(Post),
    User(User),
}

impl Record {
    pub fn as_post(&self) -> Option<&Post> {
        match self {
            Record::Post(p) => Some(p),
            _ => None,
        }
    }

    /// Materialize a typed record from a raw resource. Unknown types
    /// yield None and are skipped by callers.
    fn from_resource(resource: &Resource) -> Option<Record> {
        match resource.kind.as_str() {
            "discussions" => Discussion::from_resource(resource).map(Record::Discussion),
            "posts" => Post::from_resource(resource).map(Record::Post),
            "users" => User::from_resource(resource).map(Record::User),
            other => {
                tracing::debug!(kind = other, id = %resource.id, "Skipping unknown record type");
                None
            }
        }
    }
}

impl Discussion {
    fn from_resource(resource: &Resource) -> Option<Discussion> {
        Some(Discussion {
            id: resource.numeric_id()?,
            title: strip_control_chars(resource.attr_str("title")?).into_owned(),
            slug: resource.attr_str("slug").map(str::to_string),
            comment_count: resource.attr_u64("commentCount").unwrap_or(0),
            last_post_number: resource.attr_u64("lastPostNumber").unwrap_or(0),
            read_number: resource.attr_u64("readNumber"),
            can_reply: resource.attr_bool("canReply").unwrap_or(false),
        })
    }
}

impl Post {
    fn from_resource(resource: &Resource) -> Option<Post> {
        let created_at = resource
            .attr_str("time")
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc));

        Some(Post {
            id: resource.numeric_id()?,
            number: resource.attr_u64("number")?,
            content_type: resource
                .attr_str("contentType")
                .unwrap_or("comment")
                .to_string(),
            content_html: resource.attr_str("contentHtml").map(str::to_string),
            created_at,
            user_id: resource
                .rel_one("user")
                .and_then(|ident| ident.id.parse().ok()),
        })
    }
}

impl User {
    fn from_resource(resource: &Resource) -> Option<User> {
        let username = strip_control_chars(resource.attr_str("username")?).into_owned();
        let display_name = resource
            .attr_str("displayName")
            .map(|n| strip_control_chars(n).into_owned())
            .unwrap_or_else(|| username.clone());
        Some(User {
            id: resource.numeric_id()?,
            username,
            display_name,
        })
    }
}

// ============================================================================
// Find results
// ============================================================================

/// Parameters for [`Store::find_discussion`].
#[derive(Debug, Clone)]
pub struct FindParams {
    /// Target post number the response should be centered on.
    pub near: u64,
    /// Relation paths to include in the response.
    pub include: Vec<&'static str>,
}

impl FindParams {
    pub fn near(near: u64) -> Self {
        Self {
            near,
            include: vec!["posts", "posts.user"],
        }
    }
}

/// A resolved discussion plus every included record from the same
/// response, in server order. Consumers filter and sort the included
/// set themselves — which records are stream-worthy is view policy,
/// not store policy.
#[derive(Debug, Clone)]
pub struct DiscussionBundle {
    pub discussion: Discussion,
    pub included: Vec<Record>,
}

// ============================================================================
// Store
// ============================================================================

struct RecordCache {
    discussions: LruCache<u64, Discussion>,
    posts: LruCache<u64, Post>,
    users: LruCache<u64, User>,
}

impl RecordCache {
    fn new() -> Self {
        let cap = NonZeroUsize::new(RECORD_CACHE_CAPACITY).expect("nonzero capacity");
        Self {
            discussions: LruCache::new(cap),
            posts: LruCache::new(cap),
            users: LruCache::new(cap),
        }
    }

    fn absorb(&mut self, record: &Record) {
        match record {
            Record::Discussion(d) => {
                self.discussions.put(d.id, d.clone());
            }
            Record::Post(p) => {
                self.posts.put(p.id, p.clone());
            }
            Record::User(u) => {
                self.users.put(u.id, u.clone());
            }
        }
    }
}

/// Shared handle to the record store. Cheap to clone; spawned tasks
/// take their own handle.
#[derive(Clone)]
pub struct Store {
    client: Arc<ApiClient>,
    cache: Arc<Mutex<RecordCache>>,
}

impl Store {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client: Arc::new(client),
            cache: Arc::new(Mutex::new(RecordCache::new())),
        }
    }

    /// Fetch a discussion with its included relations, centered near
    /// the given post number.
    pub async fn find_discussion(
        &self,
        id: u64,
        params: FindParams,
    ) -> Result<DiscussionBundle, StoreError> {
        let include = params.include.join(",");
        let path = format!(
            "discussions/{}?page[near]={}&include={}",
            id, params.near, include
        );
        tracing::debug!(discussion = id, near = params.near, "Fetching discussion");

        let doc = self.client.get_document(&path).await?;

        let discussion = Discussion::from_resource(&doc.data).ok_or_else(|| {
            StoreError::MalformedRecord {
                kind: "discussions",
                id: doc.data.id.clone(),
            }
        })?;

        let included: Vec<Record> = doc
            .included
            .iter()
            .filter_map(Record::from_resource)
            .collect();

        let mut cache = self.cache.lock().expect("record cache poisoned");
        cache.absorb(&Record::Discussion(discussion.clone()));
        for record in &included {
            cache.absorb(record);
        }
        drop(cache);

        Ok(DiscussionBundle {
            discussion,
            included,
        })
    }

    /// Fetch the discussion index, newest activity first.
    pub async fn list_discussions(&self) -> Result<Vec<Discussion>, StoreError> {
        let doc = self
            .client
            .get_list("discussions?sort=-lastPostedAt")
            .await?;

        let discussions: Vec<Discussion> = doc
            .data
            .iter()
            .filter_map(Discussion::from_resource)
            .collect();

        let mut cache = self.cache.lock().expect("record cache poisoned");
        for d in &discussions {
            cache.absorb(&Record::Discussion(d.clone()));
        }
        drop(cache);

        tracing::debug!(count = discussions.len(), "Fetched discussion index");
        Ok(discussions)
    }

    /// Resolve the authenticated user for the configured token.
    /// 401/404 mean "not logged in", not an error.
    pub async fn current_user(&self) -> Result<Option<User>, StoreError> {
        match self.client.get_document("users/me").await {
            Ok(doc) => Ok(User::from_resource(&doc.data)),
            Err(ApiError::HttpStatus(401)) | Err(ApiError::HttpStatus(404)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the reader's new read position on a discussion.
    /// Returns the updated record as confirmed by the server.
    pub async fn save_read_number(
        &self,
        discussion_id: u64,
        number: u64,
    ) -> Result<Discussion, StoreError> {
        let body = serde_json::json!({
            "data": {
                "type": "discussions",
                "id": discussion_id.to_string(),
                "attributes": { "readNumber": number }
            }
        });

        let doc = self
            .client
            .patch_document(&format!("discussions/{}", discussion_id), &body)
            .await?;

        let discussion = Discussion::from_resource(&doc.data).ok_or_else(|| {
            StoreError::MalformedRecord {
                kind: "discussions",
                id: doc.data.id.clone(),
            }
        })?;

        self.cache
            .lock()
            .expect("record cache poisoned")
            .absorb(&Record::Discussion(discussion.clone()));

        Ok(discussion)
    }

    /// Cached post lookup by id.
    pub fn post_by_id(&self, id: u64) -> Option<Post> {
        self.cache
            .lock()
            .expect("record cache poisoned")
            .posts
            .get(&id)
            .cloned()
    }

    /// Cached discussion lookup by id.
    pub fn discussion_by_id(&self, id: u64) -> Option<Discussion> {
        self.cache
            .lock()
            .expect("record cache poisoned")
            .discussions
            .get(&id)
            .cloned()
    }

    /// Cached user lookup by id.
    pub fn user_by_id(&self, id: u64) -> Option<User> {
        self.cache
            .lock()
            .expect("record cache poisoned")
            .users
            .get(&id)
            .cloned()
    }
}
