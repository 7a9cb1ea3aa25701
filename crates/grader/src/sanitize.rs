//! Helpers for keeping log lines and span fields short and free of
//! candidate-identifying paths.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Media usually lives under a directory named after the candidate or
/// upload session; span fields only carry the file name.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Cuts `text` to at most `max_chars` characters, marking the cut.
///
/// Counts chars, not bytes, so multi-byte text never splits mid-character.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}... (truncated)", &text[..byte_index]),
        None => text.to_string(),
    }
}
