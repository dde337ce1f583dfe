use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `text`
pub(crate) fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// First `chars` hex digits of the SHA-256, for file names
pub(crate) fn short_digest(text: &str, chars: usize) -> String {
    let digest = sha256_hex(text);
    let end = chars.min(digest.len());
    digest[..end].to_string()
}

/// Truncate to at most `max_chars` characters, appending an ellipsis when cut
pub(crate) fn snippet(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push('…');
    out
}
