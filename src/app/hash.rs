//! Content digests for completeness checks
//!
//! A local file is hashed once, in a single streaming pass, producing both an
//! MD5 and a SHA-256 digest. Either may be compared against a server entity
//! tag, since hosts differ in which digest (if any) they publish as the ETag.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::constants::files::DOWNLOAD_CHUNK_SIZE;

/// MD5 digest stored as its raw 16 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Md5Hash([u8; 16]);

impl Md5Hash {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Md5Hash(bytes)
    }

    /// Lowercase 32-character hex representation
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }

    /// Raw byte array
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Md5Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// MD5 and SHA-256 digests of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDigests {
    /// MD5 digest
    pub md5: Md5Hash,
    /// SHA-256 digest, lowercase hex
    pub sha256: String,
}

impl ContentDigests {
    /// Digest an in-memory buffer
    pub fn of_bytes(data: &[u8]) -> Self {
        Self {
            md5: Md5Hash::from_bytes(md5::compute(data).0),
            sha256: to_hex(&Sha256::digest(data)),
        }
    }

    /// Stream a file through both hashers
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while opening or reading the file.
    pub async fn of_file(path: &Path) -> std::io::Result<Self> {
        let mut file = File::open(path).await?;
        let mut md5_ctx = md5::Context::new();
        let mut sha = Sha256::new();
        let mut buffer = vec![0u8; DOWNLOAD_CHUNK_SIZE];

        loop {
            let read = file.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            md5_ctx.consume(&buffer[..read]);
            sha.update(&buffer[..read]);
        }

        Ok(Self {
            md5: Md5Hash::from_bytes(md5_ctx.compute().0),
            sha256: to_hex(&sha.finalize()),
        })
    }

    /// Whether a normalized entity tag equals either digest
    pub fn matches_tag(&self, tag: &str) -> bool {
        tag.eq_ignore_ascii_case(&self.md5.to_hex()) || tag.eq_ignore_ascii_case(&self.sha256)
    }
}

/// Extract a content digest from a raw ETag header value
///
/// Only strong tags shaped like an MD5 (32 hex digits) or SHA-256 (64 hex
/// digits) digest identify the content. Weak validators (`W/"..."`) and
/// opaque server tags such as `"65f1a2b3-14"` yield `None`, leaving the
/// decision to the size checks.
pub fn digest_etag(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.starts_with("W/") || raw.starts_with("w/") {
        return None;
    }
    let tag = raw.trim_matches('"').trim();
    let digest_shaped =
        matches!(tag.len(), 32 | 64) && tag.bytes().all(|b| b.is_ascii_hexdigit());
    digest_shaped.then(|| tag.to_ascii_lowercase())
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
            let _ = write!(&mut acc, "{:02x}", b);
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_known_digests() {
        let digests = ContentDigests::of_bytes(b"hello world");
        assert_eq!(digests.md5.to_hex(), "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(
            digests.sha256,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(digests.md5.as_bytes().len(), 16);
    }

    #[test]
    fn test_tag_matching_is_case_insensitive() {
        let digests = ContentDigests::of_bytes(b"hello world");
        assert!(digests.matches_tag("5EB63BBBE01EEED093CB22BB8F5ACDC3"));
        assert!(digests
            .matches_tag("B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9"));
        assert!(!digests.matches_tag("deadbeef"));
    }

    #[test]
    fn test_digest_etag_shapes() {
        let md5 = "5eb63bbbe01eeed093cb22bb8f5acdc3";
        assert_eq!(digest_etag(&format!("\"{}\"", md5)), Some(md5.to_string()));
        assert_eq!(
            digest_etag("\"5EB63BBBE01EEED093CB22BB8F5ACDC3\""),
            Some(md5.to_string())
        );
        assert_eq!(digest_etag(md5), Some(md5.to_string()));
        let sha = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
        assert_eq!(digest_etag(&format!("\"{}\"", sha)), Some(sha.to_string()));

        assert_eq!(digest_etag(&format!("W/\"{}\"", md5)), None);
        assert_eq!(digest_etag("\"\""), None);
        assert_eq!(digest_etag("\"abc123\""), None);
        // nginx-style mtime-size tag
        assert_eq!(digest_etag("\"65f1a2b3-14\""), None);
        assert_eq!(digest_etag("\"5eb63bbbe01eeed093cb22bb8f5acdcz\""), None);
    }

    #[tokio::test]
    async fn test_streaming_matches_in_memory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("episode.m4a");

        // Larger than one chunk so the loop runs several times
        let data: Vec<u8> = (0..DOWNLOAD_CHUNK_SIZE * 3 + 17)
            .map(|i| (i % 251) as u8)
            .collect();
        tokio::fs::write(&path, &data).await.unwrap();

        let streamed = ContentDigests::of_file(&path).await.unwrap();
        assert_eq!(streamed, ContentDigests::of_bytes(&data));
    }
}
