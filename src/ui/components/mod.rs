pub mod chat_area;
pub mod debug_panel;
pub mod input_bar;
pub mod sidebar;
pub mod wallet_panel;

/// The first `max` characters of `text`, cut on a char boundary.
pub fn prefix(text: &str, max: usize) -> &str {
    text.char_indices()
        .nth(max)
        .map_or(text, |(end, _)| &text[..end])
}
