//! EVID-CORE: streaming file-integrity and metadata-extraction pipeline
//!
//! Ingests the bytes of an arbitrary file and produces a verifiable
//! evidentiary record: MD5 and SHA-256 content hashes computed in one
//! streaming pass, a declared-type vs magic-number signature verdict, and
//! type-specific structured metadata (image/document/audio/video).
//!
//! ```no_run
//! use evid_core::analyze_file;
//!
//! let record = analyze_file("photo.jpg".as_ref(), "image/jpeg")?;
//! println!("{}", serde_json::to_string_pretty(&record)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Each analysis is a pure function of (byte source, declared attributes):
//! the pipeline holds no state between invocations, and distinct analyses
//! may run concurrently with no synchronization. Storage, retrieval and
//! rendering of records belong to external collaborators.

pub mod analysis;
pub mod chunk;
pub mod digest;
pub mod error;
pub mod logging;
pub mod magic;
pub mod metadata;

pub use analysis::{analyze, analyze_file, analyze_with_cancel, AnalysisRecord, CancelToken, FileAttributes};
pub use chunk::{ByteChunk, ChunkSource, FileChunkSource, MemoryChunkSource, CHUNK_SIZE};
pub use digest::{HashAlgorithm, HashResult, IncrementalDigest};
pub use error::{AnalysisError, AnalysisResult, DigestError};
pub use magic::{FileCategory, SignatureVerdict, VerdictReason};
pub use metadata::FileMetadata;
