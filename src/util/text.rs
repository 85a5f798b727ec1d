use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Ellipsis appended when text is cut to fit a column budget.
const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncates a string to fit within `max_width` terminal columns.
///
/// Width calculation is Unicode-aware (CJK and emoji count as two
/// columns), and "..." is appended when anything was cut. Returns
/// `Cow::Borrowed` when the input already fits, so the common case in
/// render loops does not allocate.
///
/// Widths of 3 or less are too narrow for "char + ellipsis"; those
/// return as many whole characters as fit, without an ellipsis.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    if UnicodeWidthStr::width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let budget = if max_width <= ELLIPSIS_WIDTH {
        max_width
    } else {
        max_width - ELLIPSIS_WIDTH
    };

    let mut byte_end = 0;
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        byte_end = idx + c.len_utf8();
    }

    if max_width <= ELLIPSIS_WIDTH {
        Cow::Owned(s[..byte_end].to_string())
    } else {
        Cow::Owned(format!("{}{}", &s[..byte_end], ELLIPSIS))
    }
}

/// Removes control characters that would corrupt terminal output.
///
/// Server-supplied titles and usernames are untrusted; a stray ESC
/// sequence in one of them could move the cursor or clear the screen.
/// Tabs are replaced with a single space, newlines survive as spaces
/// too since callers render single-line fields.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(|c| c.is_control()) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect(),
    )
}

/// Converts server-rendered post HTML to plain paragraphs of text.
///
/// Flarum serves post bodies as a small, predictable HTML subset
/// (`<p>`, `<br>`, `<blockquote>`, inline formatting, links). This is
/// not a general HTML parser: tags are dropped, block-level tags
/// become paragraph breaks, and the five standard entities plus
/// numeric references are decoded. Anything pathological degrades to
/// text with the markup removed, which is an acceptable floor for a
/// terminal view.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut chars = html.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '<' => {
                // Consume through the closing '>', noting the tag name
                let rest = &html[idx + 1..];
                let end = rest.find('>');
                let tag_body = match end {
                    Some(e) => &rest[..e],
                    None => rest, // unterminated tag: drop the remainder
                };
                let name: String = tag_body
                    .trim_start_matches('/')
                    .chars()
                    .take_while(|ch| ch.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase();
                if matches!(name.as_str(), "p" | "br" | "div" | "li" | "blockquote")
                    && !out.ends_with('\n')
                    && !out.is_empty()
                {
                    out.push('\n');
                }
                match end {
                    Some(e) => {
                        // Skip the characters we just classified
                        while let Some(&(i, _)) = chars.peek() {
                            if i > idx + e + 1 {
                                break;
                            }
                            chars.next();
                        }
                    }
                    None => break,
                }
            }
            '&' => {
                let rest = &html[idx + 1..];
                let semi = rest.find(';').filter(|&e| e <= 10);
                match semi {
                    Some(e) => {
                        let entity = &rest[..e];
                        let decoded = decode_entity(entity);
                        match decoded {
                            Some(ch) => out.push(ch),
                            None => {
                                out.push('&');
                                continue; // unknown entity passes through verbatim
                            }
                        }
                        while let Some(&(i, _)) = chars.peek() {
                            if i > idx + e + 1 {
                                break;
                            }
                            chars.next();
                        }
                    }
                    None => out.push('&'),
                }
            }
            _ => out.push(c),
        }
    }

    // Collapse runs of blank lines left behind by adjacent block tags
    let mut cleaned = String::with_capacity(out.len());
    let mut blank_run = 0;
    for line in out.lines() {
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        cleaned.push_str(trimmed);
        cleaned.push('\n');
    }
    cleaned.truncate(cleaned.trim_end().len());
    cleaned
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = entity.strip_prefix("#x").map(|h| u32::from_str_radix(h, 16));
            let code = match code {
                Some(c) => c.ok(),
                None => entity.strip_prefix('#').and_then(|d| d.parse::<u32>().ok()),
            };
            code.and_then(char::from_u32)
        }
    }
}
