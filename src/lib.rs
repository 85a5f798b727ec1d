//! palaver — a terminal client for Flarum-style discussion forums.
//!
//! The library surface exists for the binary and the integration
//! tests; the crate is not a published API.

pub mod api;
pub mod app;
pub mod config;
pub mod route;
pub mod session;
pub mod store;
pub mod theme;
pub mod ui;
pub mod util;
