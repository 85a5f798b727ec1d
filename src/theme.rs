//! Theme system for the TUI.
//!
//! Semantic style roles mapped to ratatui `Style` values, with Dark
//! and Light palettes selectable at runtime.

use ratatui::style::{Color, Modifier, Style};

/// Available theme variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeVariant {
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name from the config file (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    /// Cycle to the next variant: Dark → Light → Dark.
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }

    pub fn styles(self) -> Theme {
        match self {
            Self::Dark => Theme::dark(),
            Self::Light => Theme::light(),
        }
    }
}

/// Resolved styles for every semantic UI role.
#[derive(Debug, Clone)]
pub struct Theme {
    // -- Chrome --
    pub title_bar: Style,
    pub status_bar: Style,
    pub border: Style,
    pub border_focused: Style,

    // -- Discussion list / pane --
    pub list_row: Style,
    pub list_row_selected: Style,
    pub list_row_active: Style,
    pub list_unread_badge: Style,

    // -- Post stream --
    pub post_author: Style,
    pub post_meta: Style,
    pub post_body: Style,
    pub post_event: Style,

    // -- Widgets --
    pub hero_title: Style,
    pub scrubber_track: Style,
    pub scrubber_thumb: Style,
    pub loading: Style,
    pub error: Style,
    pub composer: Style,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            title_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            status_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            border: Style::default().fg(Color::DarkGray),
            border_focused: Style::default().fg(Color::Cyan),
            list_row: Style::default().fg(Color::Gray),
            list_row_selected: Style::default().bg(Color::DarkGray).fg(Color::White),
            list_row_active: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            list_unread_badge: Style::default().fg(Color::Yellow),
            post_author: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            post_meta: Style::default().fg(Color::DarkGray),
            post_body: Style::default().fg(Color::Gray),
            post_event: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            hero_title: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            scrubber_track: Style::default().fg(Color::DarkGray),
            scrubber_thumb: Style::default().fg(Color::Cyan),
            loading: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),
            composer: Style::default().bg(Color::Black).fg(Color::White),
        }
    }

    pub fn light() -> Self {
        Self {
            title_bar: Style::default().bg(Color::Gray).fg(Color::Black),
            status_bar: Style::default().bg(Color::Gray).fg(Color::Black),
            border: Style::default().fg(Color::Gray),
            border_focused: Style::default().fg(Color::Blue),
            list_row: Style::default().fg(Color::Black),
            list_row_selected: Style::default().bg(Color::Gray).fg(Color::Black),
            list_row_active: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            list_unread_badge: Style::default().fg(Color::Magenta),
            post_author: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            post_meta: Style::default().fg(Color::Gray),
            post_body: Style::default().fg(Color::Black),
            post_event: Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
            hero_title: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            scrubber_track: Style::default().fg(Color::Gray),
            scrubber_thumb: Style::default().fg(Color::Blue),
            loading: Style::default().fg(Color::Magenta),
            error: Style::default().fg(Color::Red),
            composer: Style::default().bg(Color::White).fg(Color::Black),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_parsing() {
        assert_eq!(ThemeVariant::from_str_name("dark"), Some(ThemeVariant::Dark));
        assert_eq!(ThemeVariant::from_str_name("LIGHT"), Some(ThemeVariant::Light));
        assert_eq!(ThemeVariant::from_str_name("solarized"), None);
    }

    #[test]
    fn test_cycle_returns_to_start() {
        let start = ThemeVariant::Dark;
        assert_eq!(start.next().next(), start);
    }
}
