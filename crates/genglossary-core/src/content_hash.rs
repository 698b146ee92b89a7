//! Deterministic content hashing for documents.
//!
//! Produces a SHA-256 hex digest over a document's raw bytes so that two
//! uploads of the same text always produce the same `documents.content_hash`,
//! independent of which path or timestamp they arrived under.

use sha2::{Digest, Sha256};

/// Computes the SHA-256 hex digest of document content.
pub fn compute_content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = compute_content_hash("hello world");
        let b = compute_content_hash("hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn differs_on_change() {
        let a = compute_content_hash("hello world");
        let b = compute_content_hash("hello world!");
        assert_ne!(a, b);
    }
}
