//! Checksum utilities for source file fingerprints
//!
//! Every file report records the SHA-256 of the exact bytes that were
//! validated, so two reports can be compared without re-reading inputs.

use sha2::{Digest, Sha256};
use serde::Serialize;
use std::fmt;

/// SHA256 checksum of validated content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let content = b"id|age\n1|30\n";
        assert_eq!(Checksum::from_bytes(content), Checksum::from_bytes(content));
    }

    #[test]
    fn test_checksum_different_content() {
        let checksum1 = Checksum::from_bytes(b"id|age\n1|30\n");
        let checksum2 = Checksum::from_bytes(b"id|age\n1|31\n");
        assert_ne!(checksum1, checksum2);
    }

    #[test]
    fn test_checksum_known_digest() {
        let checksum = Checksum::from_bytes(b"");
        assert_eq!(
            checksum.to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            serde_json::to_string(&checksum).unwrap(),
            "\"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\""
        );
    }
}
