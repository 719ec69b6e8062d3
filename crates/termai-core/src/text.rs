//! Bounding captured text before it is stored or handed to another process.

use std::borrow::Cow;

/// `text` with NUL bytes removed, cut down to roughly its last `max_bytes`.
///
/// A cut starts on a line boundary when the kept tail has one, and is
/// marked with a leading `[... N bytes omitted ...]` line.
pub fn bounded_tail(text: &str, max_bytes: usize) -> Cow<'_, str> {
    if text.len() <= max_bytes && !text.contains('\0') {
        return Cow::Borrowed(text);
    }
    let cleaned = text.replace('\0', "");
    if cleaned.len() <= max_bytes {
        return Cow::Owned(cleaned);
    }

    let mut start = cleaned.len() - max_bytes;
    while !cleaned.is_char_boundary(start) {
        start += 1;
    }
    if let Some(newline) = cleaned[start..].find('\n') {
        start += newline + 1;
    }
    Cow::Owned(format!(
        "[... {} bytes omitted ...]\n{}",
        start,
        &cleaned[start..]
    ))
}
