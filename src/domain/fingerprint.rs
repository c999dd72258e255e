use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Width of a fingerprint in hex characters (64 bits of SHA-256).
pub const FINGERPRINT_LEN: usize = 16;

/// Stable dedup key for an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive the fingerprint of an identity seed.
    pub fn of(seed: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        let mut hex = hex::encode(hasher.finalize());
        hex.truncate(FINGERPRINT_LEN);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seed for sources whose key is suffixed by the tag (`<key><TAG>`).
pub fn suffixed_seed(key: &str, tag: &str) -> String {
    format!("{key}{tag}")
}

/// Seed for sources whose key is prefixed by the tag (`<TAG>:<key>`).
pub fn prefixed_seed(tag: &str, key: &str) -> String {
    format!("{tag}:{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = Fingerprint::of("https://huggingface.co/blog/post HF");
        let b = Fingerprint::of("https://huggingface.co/blog/post HF");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_is_truncated_hex() {
        let fp = Fingerprint::of("CIVITAI:12345");
        assert_eq!(fp.as_str().len(), FINGERPRINT_LEN);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_matches_sha256_prefix() {
        // sha256("") = e3b0c44298fc1c149afbf4c8996fb924...
        assert_eq!(Fingerprint::of("").as_str(), "e3b0c44298fc1c14");
    }

    #[test]
    fn test_same_key_different_sources_differ() {
        let hf = Fingerprint::of(&suffixed_seed("/news/launch", "HF"));
        let ea = Fingerprint::of(&suffixed_seed("/news/launch", "EA"));
        let fut = Fingerprint::of(&prefixed_seed("FUTGG", "/news/launch"));
        assert_ne!(hf, ea);
        assert_ne!(hf, fut);
        assert_ne!(ea, fut);
    }

    #[test]
    fn test_distinct_keys_do_not_collide() {
        let mut seen = std::collections::HashSet::new();
        for i in 0..5_000 {
            assert!(seen.insert(Fingerprint::of(&prefixed_seed("CIVITAI", &i.to_string()))));
        }
    }
}
