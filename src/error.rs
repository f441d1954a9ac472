//! Error types for the analysis pipeline

use std::fmt;
use std::io;

/// Result type alias for pipeline operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors that abort a whole analysis
///
/// Signature mismatches and metadata parse failures are NOT errors: they
/// degrade into verdict states or omitted fields and still produce a record.
#[derive(Debug)]
pub enum AnalysisError {
    /// I/O failure while streaming chunks (fatal, surfaced unmodified)
    Read(io::Error),
    /// Requested hash algorithm is not available
    UnsupportedAlgorithm(String),
    /// Digest state machine violation (update/finalize after finalize)
    Digest(DigestError),
    /// Analysis was cancelled at a chunk boundary
    Cancelled,
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Read(e) => write!(f, "Read error: {}", e),
            AnalysisError::UnsupportedAlgorithm(a) => {
                write!(f, "Unsupported hash algorithm: {}", a)
            }
            AnalysisError::Digest(e) => write!(f, "Digest error: {}", e),
            AnalysisError::Cancelled => write!(f, "Analysis cancelled"),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Read(e) => Some(e),
            AnalysisError::Digest(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for AnalysisError {
    fn from(e: io::Error) -> Self {
        AnalysisError::Read(e)
    }
}

impl From<DigestError> for AnalysisError {
    fn from(e: DigestError) -> Self {
        AnalysisError::Digest(e)
    }
}

/// Violations of the one-shot digest lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestError {
    /// finalize() was already called on this instance
    AlreadyFinalized,
    /// update() after finalize() is rejected, never silently absorbed
    UpdateAfterFinalize,
}

impl fmt::Display for DigestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestError::AlreadyFinalized => write!(f, "digest already finalized"),
            DigestError::UpdateAfterFinalize => write!(f, "update after finalize"),
        }
    }
}

impl std::error::Error for DigestError {}
