//! Post scrubber widget.
//!
//! A vertical position indicator bound to the live stream: shows the
//! visible post-number window against the discussion's full extent,
//! with a proportional thumb. The geometry is a pure function so the
//! proportions are testable without a terminal.

use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::theme::Theme;

use super::stream::PostStream;

/// Thumb placement within a track of `track_rows` rows, for a window
/// `[start, end]` over posts `1..=total`. Returns (offset, length) in
/// rows; length is at least one row whenever there is anything to
/// show.
pub fn thumb_geometry(
    start: u64,
    end: u64,
    total: u64,
    track_rows: usize,
) -> Option<(usize, usize)> {
    if track_rows == 0 || start == 0 || end < start {
        return None;
    }
    // A stale total smaller than what is on screen would divide wrong
    let total = total.max(end);
    let total = total as f64;
    let span = (end - start + 1) as f64;
    let len = ((span / total) * track_rows as f64).ceil() as usize;
    let len = len.clamp(1, track_rows);
    let offset = (((start - 1) as f64 / total) * track_rows as f64).floor() as usize;
    let offset = offset.min(track_rows - len);
    Some((offset, len))
}

/// Render the scrubber gutter: "start-end / total" header and the
/// track below it.
pub fn render(f: &mut Frame, stream: &PostStream, theme: &Theme, area: Rect) {
    if area.width < 3 || area.height < 4 {
        return;
    }

    let total = stream.last_number();
    let Some((start, end)) = stream.visible_range() else {
        return;
    };

    let track_rows = area.height.saturating_sub(1) as usize;
    let mut lines: Vec<Line> = Vec::with_capacity(track_rows + 1);
    lines.push(Line::styled(
        format!("{}-{}/{}", start, end, total),
        theme.post_meta,
    ));

    if let Some((offset, len)) = thumb_geometry(start, end, total, track_rows) {
        for row in 0..track_rows {
            let in_thumb = row >= offset && row < offset + len;
            let (glyph, style) = if in_thumb {
                (" █", theme.scrubber_thumb)
            } else {
                (" │", theme.scrubber_track)
            };
            lines.push(Line::styled(glyph, style));
        }
    }

    f.render_widget(Paragraph::new(lines), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_window_fills_track() {
        assert_eq!(thumb_geometry(1, 10, 10, 8), Some((0, 8)));
    }

    #[test]
    fn test_window_at_top() {
        let (offset, len) = thumb_geometry(1, 2, 20, 10).unwrap();
        assert_eq!(offset, 0);
        assert_eq!(len, 1);
    }

    #[test]
    fn test_window_at_bottom_stays_in_track() {
        let (offset, len) = thumb_geometry(19, 20, 20, 10).unwrap();
        assert!(offset + len <= 10);
        assert!(offset >= 8);
    }

    #[test]
    fn test_thumb_never_empty() {
        let (_, len) = thumb_geometry(5, 5, 10_000, 10).unwrap();
        assert_eq!(len, 1);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(thumb_geometry(0, 5, 10, 10), None);
        assert_eq!(thumb_geometry(5, 4, 10, 10), None);
        assert_eq!(thumb_geometry(1, 1, 0, 10), Some((0, 10)));
        assert_eq!(thumb_geometry(1, 1, 10, 0), None);
    }
}
