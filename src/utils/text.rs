//! Text helpers for previews in tool output and tables.

/// Longest prefix of `text` holding at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// First `max_chars` characters of `text`, with `...` appended when cut
///
/// ```
/// use docsyte_mcp::utils::preview;
///
/// assert_eq!(preview("Hello World", 5), "Hello...");
/// assert_eq!(preview("Hi", 5), "Hi");
/// ```
pub fn preview(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() < text.len() {
        format!("{}...", cut)
    } else {
        cut.to_string()
    }
}
