//! Post stream controller.
//!
//! Owns the loaded posts of one discussion and the scroll state over
//! them, and reports position changes to its owner through an event
//! outbox. The stream distinguishes two kinds of movement:
//!
//! - **Inbound** (`go_to_number`, animation ticks): route-driven
//!   placement. Never emits a position event — the location already
//!   reflects the target, and echoing it back would start a
//!   route⇄scroll feedback cycle.
//! - **Outbound** (`scroll_by`): user-driven movement. Emits
//!   `PositionChanged` whenever the visible window actually changed.
//!
//! The owner drains events with `take_events` once per loop turn.

use std::collections::VecDeque;

use crate::store::{Discussion, Post};

/// Fallback height (rows) for posts that have not been measured by a
/// render pass yet.
const DEFAULT_POST_HEIGHT: u16 = 6;

/// Events emitted by the stream, drained by the owning page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    /// The visible window moved; numbers are the first and last post
    /// numbers in view.
    PositionChanged { start: u64, end: u64 },
}

pub struct PostStream {
    pub discussion_id: u64,
    /// Highest post number in the discussion, for scrubber geometry.
    last_number: u64,
    posts: Vec<Post>,
    /// Index of the first visible post.
    top: usize,
    /// Rows available to the stream, updated by the render pass.
    viewport_rows: usize,
    /// Measured row heights per post, parallel to `posts`. Entries
    /// start at a fallback estimate and are refined by render passes.
    heights: Vec<u16>,
    /// First and last visible post numbers.
    visible: Option<(u64, u64)>,
    /// Target index of an in-flight animated jump.
    animating_to: Option<usize>,
    outbox: VecDeque<StreamEvent>,
}

impl PostStream {
    /// Build a stream seeded with the pre-hydrated posts included in
    /// a discussion response. Callers are responsible for ordering;
    /// the stream renders `posts` as given.
    pub fn new(discussion: &Discussion, posts: Vec<Post>) -> Self {
        let heights = vec![DEFAULT_POST_HEIGHT; posts.len()];
        Self {
            discussion_id: discussion.id,
            last_number: discussion.last_post_number,
            posts,
            top: 0,
            viewport_rows: 0,
            heights,
            visible: None,
            animating_to: None,
            outbox: VecDeque::new(),
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn top_index(&self) -> usize {
        self.top
    }

    pub fn last_number(&self) -> u64 {
        self.last_number
    }

    pub fn visible_range(&self) -> Option<(u64, u64)> {
        self.visible
    }

    pub fn is_animating(&self) -> bool {
        self.animating_to.is_some()
    }

    /// Jump the stream to the post with the given number.
    ///
    /// `immediate` places the window instantly (initial positioning);
    /// otherwise the jump animates over upcoming ticks. Neither form
    /// emits a position event.
    pub fn go_to_number(&mut self, number: u64, immediate: bool) {
        let Some(target) = self.index_of_number(number) else {
            return;
        };
        if immediate {
            self.animating_to = None;
            self.top = target;
            self.update_visible(false);
        } else {
            self.animating_to = Some(target);
        }
    }

    /// User scroll by a signed number of posts. Cancels any running
    /// animation and emits a position event if the window moved.
    pub fn scroll_by(&mut self, delta: i64) {
        if self.posts.is_empty() {
            return;
        }
        self.animating_to = None;
        let max_top = self.posts.len() - 1;
        let new_top = if delta.is_negative() {
            self.top.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            (self.top + delta as usize).min(max_top)
        };
        self.top = new_top;
        self.update_visible(true);
    }

    /// Advance a pending animated jump by one tick. Returns true if
    /// the window moved (so the caller can request a redraw).
    pub fn tick(&mut self) -> bool {
        let Some(target) = self.animating_to else {
            return false;
        };
        if target == self.top {
            self.animating_to = None;
            return false;
        }
        // Ease toward the target: a quarter of the remaining distance
        // per tick, at least one post.
        let distance = target.abs_diff(self.top);
        let step = (distance / 4).max(1);
        self.top = if target > self.top {
            self.top + step
        } else {
            self.top - step
        };
        if self.top == target {
            self.animating_to = None;
        }
        self.update_visible(false);
        true
    }

    /// Record the viewport geometry measured by a render pass.
    /// Recomputes the visible window without emitting — layout changes
    /// are not reader movement.
    pub fn set_layout(&mut self, viewport_rows: usize, heights: Vec<u16>) {
        self.viewport_rows = viewport_rows;
        if heights.len() == self.posts.len() {
            self.heights = heights;
        }
        self.update_visible(false);
    }

    /// Drain pending events in emission order.
    pub fn take_events(&mut self) -> Vec<StreamEvent> {
        self.outbox.drain(..).collect()
    }

    /// Index of the first post with `number >= wanted`, or the last
    /// post when every number is smaller.
    fn index_of_number(&self, wanted: u64) -> Option<usize> {
        if self.posts.is_empty() {
            return None;
        }
        Some(
            self.posts
                .iter()
                .position(|p| p.number >= wanted)
                .unwrap_or(self.posts.len() - 1),
        )
    }

    fn update_visible(&mut self, emit: bool) {
        let Some(window) = self.compute_window() else {
            return;
        };
        if self.visible == Some(window) {
            return;
        }
        self.visible = Some(window);
        if emit {
            let (start, end) = window;
            self.outbox
                .push_back(StreamEvent::PositionChanged { start, end });
        }
    }

    /// Walk down from `top`, accumulating post heights until the
    /// viewport is filled. At least one post is always visible.
    fn compute_window(&self) -> Option<(u64, u64)> {
        let first = self.posts.get(self.top)?;
        let mut used = 0usize;
        let mut last = first.number;
        for (post, height) in self.posts[self.top..].iter().zip(&self.heights[self.top..]) {
            used += *height as usize;
            last = post.number;
            if used >= self.viewport_rows.max(1) {
                break;
            }
        }
        Some((first.number, last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_discussion() -> Discussion {
        Discussion {
            id: 5,
            title: "Hello".to_string(),
            slug: Some("hello".to_string()),
            comment_count: 20,
            last_post_number: 20,
            read_number: None,
            can_reply: true,
        }
    }

    fn test_posts(numbers: &[u64]) -> Vec<Post> {
        numbers
            .iter()
            .map(|&n| Post {
                id: 100 + n,
                number: n,
                content_type: "comment".to_string(),
                content_html: Some(format!("<p>post {}</p>", n)),
                created_at: None,
                user_id: None,
            })
            .collect()
    }

    fn stream_with(numbers: &[u64]) -> PostStream {
        let mut stream = PostStream::new(&test_discussion(), test_posts(numbers));
        // Two posts per viewport at the default height estimate
        stream.set_layout(2 * DEFAULT_POST_HEIGHT as usize, vec![]);
        stream
    }

    #[test]
    fn test_immediate_jump_does_not_emit() {
        let mut stream = stream_with(&[1, 2, 3, 4, 5]);
        stream.go_to_number(3, true);
        assert_eq!(stream.visible_range(), Some((3, 4)));
        assert!(stream.take_events().is_empty());
    }

    #[test]
    fn test_jump_to_missing_number_lands_on_next() {
        let mut stream = stream_with(&[1, 4, 9]);
        stream.go_to_number(5, true);
        assert_eq!(stream.top_index(), 2);
    }

    #[test]
    fn test_jump_beyond_last_clamps_to_last() {
        let mut stream = stream_with(&[1, 2, 3]);
        stream.go_to_number(50, true);
        assert_eq!(stream.top_index(), 2);
    }

    #[test]
    fn test_scroll_emits_position_change() {
        let mut stream = stream_with(&[1, 2, 3, 4, 5]);
        stream.go_to_number(1, true);
        stream.take_events();

        stream.scroll_by(2);
        assert_eq!(
            stream.take_events(),
            vec![StreamEvent::PositionChanged { start: 3, end: 4 }]
        );
    }

    #[test]
    fn test_scroll_without_movement_does_not_emit() {
        let mut stream = stream_with(&[1, 2, 3]);
        stream.go_to_number(1, true);
        stream.take_events();

        // Already at the top; scrolling up cannot move the window
        stream.scroll_by(-1);
        assert!(stream.take_events().is_empty());
    }

    #[test]
    fn test_animated_jump_progresses_on_tick_without_emitting() {
        let mut stream = stream_with(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        stream.go_to_number(1, true);
        stream.take_events();

        stream.go_to_number(10, false);
        assert!(stream.is_animating());
        assert_eq!(stream.top_index(), 0); // nothing moved yet

        let mut guard = 0;
        while stream.is_animating() {
            assert!(stream.tick());
            guard += 1;
            assert!(guard < 50, "animation never converged");
        }
        assert_eq!(stream.top_index(), 9);
        assert!(stream.take_events().is_empty());
    }

    #[test]
    fn test_user_scroll_cancels_animation() {
        let mut stream = stream_with(&[1, 2, 3, 4, 5, 6, 7, 8]);
        stream.go_to_number(8, false);
        assert!(stream.is_animating());

        stream.scroll_by(1);
        assert!(!stream.is_animating());
    }

    #[test]
    fn test_layout_change_does_not_emit() {
        let mut stream = stream_with(&[1, 2, 3, 4]);
        stream.go_to_number(1, true);
        stream.take_events();

        // Taller viewport reveals more posts, but it is not reader movement
        stream.set_layout(4 * DEFAULT_POST_HEIGHT as usize, vec![]);
        assert_eq!(stream.visible_range(), Some((1, 4)));
        assert!(stream.take_events().is_empty());
    }

    #[test]
    fn test_empty_stream_is_inert() {
        let mut stream = PostStream::new(&test_discussion(), Vec::new());
        stream.go_to_number(1, true);
        stream.scroll_by(5);
        assert!(stream.take_events().is_empty());
        assert_eq!(stream.visible_range(), None);
    }
}
