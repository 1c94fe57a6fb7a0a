use crate::span::Span;

/// Trims a span to its non-whitespace bounds.
///
/// Returns the byte range of `text` that remains after dropping leading and
/// trailing whitespace. Formatting wraps only this core text, never the blanks
/// around it. An all-whitespace input yields an empty span at `text.len()`.
pub fn trim_span_to_non_whitespace(text: &str) -> Span {
    let start = text.len() - text.trim_start().len();
    let end = start + text[start..].trim_end().len();
    Span::new(start, end)
}
