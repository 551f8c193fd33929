//! Content fingerprinting: document bytes → [`ContentAddress`].
//!
//! The address is the SHA-256 digest of the entire file, hex-encoded. It is
//! the primary key in the catalog, the artifact name in the store and the
//! public task id handed to pollers, so it must be stable across processes
//! and releases.

use crate::error::PdfCacheError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a hex-encoded SHA-256 digest.
pub const ADDRESS_LEN: usize = 64;

/// A 64-character lowercase hex SHA-256 digest of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentAddress(String);

impl ContentAddress {
    /// Validate an address received from outside the process (e.g. a task id).
    ///
    /// Uppercase hex is accepted and normalised to lowercase.
    pub fn parse(input: &str) -> Result<Self, PdfCacheError> {
        let trimmed = input.trim();
        if trimmed.len() != ADDRESS_LEN || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PdfCacheError::InvalidAddress {
                input: input.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blob name under which the rendered pages of this document are stored.
    pub fn artifact_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentAddress {
    type Error = PdfCacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentAddress> for String {
    fn from(value: ContentAddress) -> Self {
        value.0
    }
}

/// Compute the content address of a document.
pub fn fingerprint(bytes: &[u8]) -> ContentAddress {
    let digest = Sha256::digest(bytes);
    ContentAddress(hex::encode(digest))
}
