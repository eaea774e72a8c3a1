//! Archive checksums.
//!
//! The index records the SHA-256 of every `.crate` archive as lowercase hex
//! in its `cksum` field. Archives are checked against it before they enter
//! the mirror and again by `verify`.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{MirrorError, Result};

/// A SHA-256 digest, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum(String);

impl Checksum {
    pub fn compute(data: &[u8]) -> Self {
        Checksum(hex_encode(&Sha256::digest(data)))
    }

    /// Hash a file without loading it whole.
    pub fn compute_file(path: &Path) -> Result<Self> {
        let mut file = std::fs::File::open(path)
            .map_err(|e| MirrorError::fs(path, "opening archive", e))?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file
                .read(&mut buf)
                .map_err(|e| MirrorError::fs(path, "reading archive", e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Checksum(hex_encode(&hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against an index `cksum`, ignoring case.
    pub fn matches(&self, expected: &str) -> bool {
        self.0.eq_ignore_ascii_case(expected.trim())
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Check archive bytes against the checksum recorded in the index.
///
/// An empty `expected` (records built without one) accepts anything.
pub fn verify_archive(name: &str, version: &str, expected: &str, data: &[u8]) -> Result<()> {
    if expected.is_empty() {
        return Ok(());
    }
    let actual = Checksum::compute(data);
    if actual.matches(expected) {
        Ok(())
    } else {
        Err(MirrorError::ChecksumMismatch {
            name: name.to_string(),
            version: version.to_string(),
            expected: expected.to_string(),
            actual: actual.0,
        })
    }
}
