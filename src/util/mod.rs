//! Utility functions shared across the client.
//!
//! This module provides:
//!
//! - **Text processing**: HTML-to-text conversion for post bodies and
//!   Unicode-aware truncation for terminal rendering
//! - **ItemList**: a keyed, ordered collection of UI descriptors
//! - **Listeners**: an explicit event-subscriber list with
//!   `on`/`off`/`emit` semantics

mod items;
mod listeners;
mod text;

pub use items::ItemList;
pub use listeners::{ListenerId, Listeners};
pub use text::{html_to_text, strip_control_chars, truncate_to_width};
