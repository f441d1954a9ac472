//! Streaming hash computation for evidence files
//!
//! Two digests are produced per analysis: MD5 (legacy, still standard in
//! evidence workflows) and SHA-256 (NIST approved). Both run incrementally
//! over the chunk stream carrying true internal algorithm state between
//! updates, so the output is invariant to how the input was chunked.

use md5::Md5;
use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, DigestError};

// =============================================================================
// Hash Algorithm Enum
// =============================================================================

/// Supported hash algorithms
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha256,
}

impl HashAlgorithm {
    /// Parse algorithm name from string (case-insensitive)
    pub fn from_str(algorithm: &str) -> Result<Self, AnalysisError> {
        match algorithm.trim().to_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            _ => Err(AnalysisError::UnsupportedAlgorithm(algorithm.to_string())),
        }
    }

    /// Get the canonical algorithm name
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "MD5",
            HashAlgorithm::Sha256 => "SHA-256",
        }
    }

    /// Expected digest length in hex characters
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 32,
            HashAlgorithm::Sha256 => 64,
        }
    }
}

// =============================================================================
// Incremental Digest
// =============================================================================

enum DigestState {
    Md5(Md5),
    Sha256(Sha256),
}

/// One-pass streaming digest for a single file
///
/// Carries the algorithm's internal state (not its output) across updates.
/// Re-hashing a previous digest concatenated with the next chunk yields a
/// value that is NOT the hash of the file; this type never does that.
///
/// The instance is spent after `finalize`: further updates and a second
/// finalize are rejected with a `DigestError`.
pub struct IncrementalDigest {
    algorithm: HashAlgorithm,
    state: Option<DigestState>,
    bytes_processed: u64,
}

impl IncrementalDigest {
    /// Create a fresh digest in the algorithm's initial state
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Md5 => DigestState::Md5(Md5::new()),
            HashAlgorithm::Sha256 => DigestState::Sha256(Sha256::new()),
        };
        Self {
            algorithm,
            state: Some(state),
            bytes_processed: 0,
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Total bytes absorbed so far
    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    /// Absorb more data into the running state
    pub fn update(&mut self, data: &[u8]) -> Result<(), DigestError> {
        match self.state.as_mut() {
            Some(DigestState::Md5(h)) => Digest::update(h, data),
            Some(DigestState::Sha256(h)) => Digest::update(h, data),
            None => return Err(DigestError::UpdateAfterFinalize),
        }
        self.bytes_processed += data.len() as u64;
        Ok(())
    }

    /// Apply final padding/length encoding and return the raw digest bytes
    ///
    /// Valid exactly once; a second call is an error, never a stale value.
    pub fn finalize(&mut self) -> Result<Vec<u8>, DigestError> {
        match self.state.take() {
            Some(DigestState::Md5(h)) => Ok(h.finalize().to_vec()),
            Some(DigestState::Sha256(h)) => Ok(h.finalize().to_vec()),
            None => Err(DigestError::AlreadyFinalized),
        }
    }

    /// Finalize and encode as fixed-width lowercase hex
    pub fn finalize_hex(&mut self) -> Result<String, DigestError> {
        Ok(hex::encode(self.finalize()?))
    }
}

// =============================================================================
// One-shot Hash Computation
// =============================================================================

/// Compute hash of data using specified algorithm (one-shot, for small data)
pub fn compute_hash(data: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Md5 => {
            let mut hasher = Md5::new();
            hasher.update(data);
            hex::encode(hasher.finalize())
        }
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(data);
            hex::encode(hasher.finalize())
        }
    }
}

// =============================================================================
// Hash Result
// =============================================================================

/// The two content hashes of one analyzed file, lowercase hex
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashResult {
    /// 32 hex chars
    pub md5: String,
    /// 64 hex chars
    pub sha256: String,
}

/// Validate that a string looks like a valid hash for the given algorithm
pub fn is_valid_hash(hash: &str, algorithm: HashAlgorithm) -> bool {
    hash.len() == algorithm.hex_len() && hash.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Published reference vectors (RFC 1321 / FIPS 180-4)
    const MD5_ABC: &str = "900150983cd24fb0d6963f7d28e17f72";
    const SHA256_ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
    const MD5_EMPTY: &str = "d41d8cd98f00b204e9800998ecf8427e";
    const SHA256_EMPTY: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!(HashAlgorithm::from_str("md5").unwrap(), HashAlgorithm::Md5);
        assert_eq!(HashAlgorithm::from_str("MD5").unwrap(), HashAlgorithm::Md5);
        assert_eq!(
            HashAlgorithm::from_str("SHA-256").unwrap(),
            HashAlgorithm::Sha256
        );
        assert!(HashAlgorithm::from_str("sha1").is_err());
        assert!(HashAlgorithm::from_str("invalid").is_err());
    }

    #[test]
    fn test_unknown_algorithm_error_variant() {
        match HashAlgorithm::from_str("sha1") {
            Err(AnalysisError::UnsupportedAlgorithm(name)) => assert_eq!(name, "sha1"),
            other => panic!("expected UnsupportedAlgorithm, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_vectors() {
        assert_eq!(compute_hash(b"abc", HashAlgorithm::Md5), MD5_ABC);
        assert_eq!(compute_hash(b"abc", HashAlgorithm::Sha256), SHA256_ABC);
    }

    #[test]
    fn test_empty_input_vectors() {
        assert_eq!(compute_hash(b"", HashAlgorithm::Md5), MD5_EMPTY);
        assert_eq!(compute_hash(b"", HashAlgorithm::Sha256), SHA256_EMPTY);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut digest = IncrementalDigest::new(HashAlgorithm::Md5);
        digest.update(b"a").unwrap();
        digest.update(b"b").unwrap();
        digest.update(b"c").unwrap();
        assert_eq!(digest.bytes_processed(), 3);
        assert_eq!(digest.finalize_hex().unwrap(), MD5_ABC);
    }

    #[test]
    fn test_chunk_invariance() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();
        let expected = compute_hash(&data, HashAlgorithm::Sha256);

        for chunk_size in [1usize, 7, 64, 333, 4096, data.len()] {
            let mut digest = IncrementalDigest::new(HashAlgorithm::Sha256);
            for chunk in data.chunks(chunk_size) {
                digest.update(chunk).unwrap();
            }
            assert_eq!(digest.finalize_hex().unwrap(), expected, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_finalize_twice_rejected() {
        let mut digest = IncrementalDigest::new(HashAlgorithm::Md5);
        digest.update(b"abc").unwrap();
        digest.finalize().unwrap();
        assert_eq!(digest.finalize(), Err(DigestError::AlreadyFinalized));
    }

    #[test]
    fn test_update_after_finalize_rejected() {
        let mut digest = IncrementalDigest::new(HashAlgorithm::Sha256);
        digest.finalize().unwrap();
        assert_eq!(digest.update(b"late"), Err(DigestError::UpdateAfterFinalize));
    }

    #[test]
    fn test_hash_validation() {
        assert!(is_valid_hash(MD5_ABC, HashAlgorithm::Md5));
        assert!(is_valid_hash(SHA256_ABC, HashAlgorithm::Sha256));
        assert!(!is_valid_hash(MD5_ABC, HashAlgorithm::Sha256));
        assert!(!is_valid_hash("not-a-hash", HashAlgorithm::Md5));
    }
}
