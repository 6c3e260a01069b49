#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Checksums for fetched sources and content ids for packages
//!
//! Source archives carry a SHA-256 checksum (MD5 for a few legacy recipes,
//! BLAKE3 where upstream publishes one). Package ids are BLAKE3 digests of
//! a canonical description of the binary configuration.

use cpkg_errors::{BuildError, Error};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Size of chunks for streaming hash computation
const CHUNK_SIZE: usize = 64 * 1024;

/// Supported checksum algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Sha256,
    Md5,
    Blake3,
}

impl ChecksumAlgorithm {
    /// Hex length of a digest
    #[must_use]
    pub fn hex_len(self) -> usize {
        match self {
            Self::Sha256 | Self::Blake3 => 64,
            Self::Md5 => 32,
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Md5 => write!(f, "md5"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

/// An expected digest of a file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    pub value: String,
}

impl Checksum {
    #[must_use]
    pub fn sha256(value: &str) -> Self {
        Self::new(ChecksumAlgorithm::Sha256, value)
    }

    #[must_use]
    pub fn md5(value: &str) -> Self {
        Self::new(ChecksumAlgorithm::Md5, value)
    }

    #[must_use]
    pub fn blake3(value: &str) -> Self {
        Self::new(ChecksumAlgorithm::Blake3, value)
    }

    #[must_use]
    pub fn new(algorithm: ChecksumAlgorithm, value: &str) -> Self {
        Self {
            algorithm,
            value: value.trim().to_ascii_lowercase(),
        }
    }

    /// Whether the digest has the right length and only hex digits
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.value.len() == self.algorithm.hex_len()
            && self.value.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.value)
    }
}

/// Incremental hasher over any supported algorithm
enum StreamHasher {
    Sha256(Sha256),
    Md5(Md5),
    Blake3(Box<blake3::Hasher>),
}

impl StreamHasher {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            ChecksumAlgorithm::Md5 => Self::Md5(Md5::new()),
            ChecksumAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Md5(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Md5(h) => hex::encode(h.finalize()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Hex digest of a byte slice
#[must_use]
pub fn hash_bytes(algorithm: ChecksumAlgorithm, data: &[u8]) -> String {
    let mut hasher = StreamHasher::new(algorithm);
    hasher.update(data);
    hasher.finalize_hex()
}

/// Hex digest of a file, streamed in chunks
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub async fn hash_file(path: &Path, algorithm: ChecksumAlgorithm) -> Result<String, Error> {
    let mut file = File::open(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;

    let mut hasher = StreamHasher::new(algorithm);
    let mut buffer = vec![0; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize_hex())
}

/// Verify a file against an expected checksum
///
/// # Errors
/// Returns `BuildError::HashMismatch` if the digest differs, or an I/O error
/// if the file cannot be read.
pub async fn verify_file(path: &Path, expected: &Checksum) -> Result<(), Error> {
    let actual = hash_file(path, expected.algorithm).await?;
    if actual == expected.value {
        Ok(())
    } else {
        Err(BuildError::HashMismatch {
            file: path.display().to_string(),
            expected: expected.value.clone(),
            actual,
        }
        .into())
    }
}

/// BLAKE3 content id of arbitrary bytes
#[must_use]
pub fn content_id(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_known_digests() {
        let data = b"hello world";
        assert_eq!(
            hash_bytes(ChecksumAlgorithm::Sha256, data),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(
            hash_bytes(ChecksumAlgorithm::Md5, data),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
        assert_eq!(
            hash_bytes(ChecksumAlgorithm::Blake3, data),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
        assert_eq!(content_id(data), hash_bytes(ChecksumAlgorithm::Blake3, data));
    }

    #[test]
    fn test_checksum_normalization() {
        let checksum = Checksum::sha256("  B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9 ");
        assert!(checksum.is_well_formed());
        assert!(checksum.value.starts_with("b94d"));
        assert!(!Checksum::md5("abc").is_well_formed());
    }

    #[tokio::test]
    async fn test_verify_file() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"hello world").unwrap();

        let good = Checksum::md5("5eb63bbbe01eeed093cb22bb8f5acdc3");
        verify_file(temp.path(), &good).await.unwrap();

        let bad = Checksum::md5("00000000000000000000000000000000");
        let err = verify_file(temp.path(), &bad).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Build(BuildError::HashMismatch { ref actual, .. }) if actual == &good.value
        ));
    }

    #[tokio::test]
    async fn test_missing_file_reports_path() {
        let err = hash_file(Path::new("/nonexistent/archive.tgz"), ChecksumAlgorithm::Sha256)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { path: Some(_), .. }));
    }
}
