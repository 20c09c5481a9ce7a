//! Fixed-size document chunking.
//!
//! Documents are split into consecutive, non-overlapping segments of at
//! most `size` characters; the last segment may be shorter. The split is
//! purely positional, with no sentence or paragraph awareness, which keeps it
//! deterministic, and determinism is what makes chunk vector ids stable
//! across re-ingestions (see [`crate::stores::vector_id`]).
//!
//! Upgrading to boundary-aware splitting is possible, but any replacement
//! must stay deterministic and keep the `size` contract, otherwise the
//! whole remove-then-ingest id scheme needs revisiting with it.

/// Splits `text` into chunks of at most `size` characters.
///
/// Counts Unicode scalar values, not bytes, so multi-byte characters are
/// never split. Empty input yields an empty vector. Concatenating the
/// returned chunks reproduces `text` exactly.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for ch in text.chars() {
        current.push(ch);
        current_len += 1;
        if current_len == size {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
