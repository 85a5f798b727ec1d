//! Flarum JSON:API transport layer.
//!
//! `client` owns the HTTP concerns (auth header, timeouts, retry on
//! transient failures, response size caps); `document` owns the
//! JSON:API payload shapes (`data` + `included` resource objects).
//! Typed record materialization lives one layer up, in `crate::store`.

mod client;
mod document;

pub use client::{ApiClient, ApiError};
pub use document::{Document, ListDocument, Resource};
