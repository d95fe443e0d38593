//! Content hashing for versions and components.
//!
//! Hashes are computed over the exact bytes of the content. Unlike a
//! deduplication key, no normalization is applied: a whitespace edit is a
//! real revision of a prompt.

use sha2::{Digest, Sha256};

/// Length of the abbreviated hash shown in listings.
pub const SHORT_HASH_LEN: usize = 12;

/// SHA-256 content hasher.
///
/// # Example
///
/// ```rust
/// use promptvc::services::ContentHasher;
///
/// let hash = ContentHasher::hash("A\nB\nC");
/// assert_eq!(hash.len(), 64);
/// assert_ne!(hash, ContentHasher::hash("A\nB\nC\n"));
/// ```
pub struct ContentHasher;

impl ContentHasher {
    /// Computes the lowercase hex-encoded SHA-256 of `content`.
    #[must_use]
    pub fn hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns the abbreviated form of a hash.
    ///
    /// Uses the full hash if it is shorter than [`SHORT_HASH_LEN`].
    #[must_use]
    pub fn short(hash: &str) -> &str {
        hash.get(..SHORT_HASH_LEN).unwrap_or(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_known_value() {
        assert_eq!(
            ContentHasher::hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_is_exact() {
        assert_ne!(ContentHasher::hash("A B"), ContentHasher::hash("A  B"));
        assert_eq!(ContentHasher::hash("same"), ContentHasher::hash("same"));
    }

    #[test]
    fn test_short() {
        let hash = ContentHasher::hash("demo");
        assert_eq!(ContentHasher::short(&hash).len(), SHORT_HASH_LEN);
        assert_eq!(ContentHasher::short("abc"), "abc");
    }
}
