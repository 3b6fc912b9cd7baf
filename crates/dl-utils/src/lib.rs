//! Shared text helpers for Daylog.

/// Number of whitespace-separated words in a text.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Number of characters in a text, counting scalar values rather than bytes.
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Estimated reading time in whole minutes at 200 words per minute.
///
/// Never returns zero; even an empty body reads as one minute.
pub fn reading_time_minutes(text: &str) -> usize {
    word_count(text).div_ceil(200).max(1)
}

/// Shorten a text to `max_chars` characters, marking the cut with an
/// ellipsis. Whitespace runs collapse to single spaces so the result
/// stays on one line.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if char_count(&flat) <= max_chars {
        return flat;
    }
    let mut shortened: String = flat.chars().take(max_chars).collect();
    shortened.push_str("...");
    shortened
}

/// Title as shown in lists: trimmed, with a placeholder when empty.
pub fn display_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        "Untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Line shown for an entry in lists: the title when present, otherwise
/// the body, shortened to 60 characters; "Untitled" when both are empty.
pub fn list_title(title: &str, body: &str) -> String {
    let source = if title.trim().is_empty() { body } else { title };
    let shown = preview(source, 60);
    if shown.is_empty() {
        "Untitled".to_string()
    } else {
        shown
    }
}
