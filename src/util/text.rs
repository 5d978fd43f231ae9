use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Lower-cases `s` and strips punctuation, keeping word characters and
/// single spaces between words.
///
/// "Word character" follows the usual regex `\w` meaning: alphanumerics and
/// underscore. Runs of whitespace collapse to one space and the result is
/// trimmed, so `"  SpaceX -- Launches!  "` becomes `"spacex launches"`.
///
/// # Examples
///
/// ```
/// use bytes_feed::util::normalize_words;
///
/// assert_eq!(normalize_words("SpaceX Launches..."), "spacex launches");
/// assert_eq!(normalize_words("The  Verge"), "the verge");
/// ```
pub fn normalize_words(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;

    for c in s.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else if c.is_whitespace() {
            pending_space = true;
        }
        // Punctuation is dropped without introducing a word break, so
        // "Apple's" and "Apples" normalise identically.
    }

    out
}

/// Calculates the display width of a string in terminal columns.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncates a string to fit within `max_width` terminal columns, appending
/// "..." when text was cut off.
///
/// Widths of 3 or less return as many characters as fit, without an ellipsis.
///
/// ```
/// use bytes_feed::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
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

/// Removes control characters (except newline and tab) from model output
/// before it is displayed.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect(),
    )
}
