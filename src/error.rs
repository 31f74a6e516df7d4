//! Error types for the notereflow library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ReflowError`] — **Fatal**: the operation cannot proceed at all
//!   (store cannot be opened, rule table does not compile, input is not a
//!   PDF, no text could be extracted). Returned as `Err(ReflowError)` from
//!   the batch and ingestion entry points.
//!
//! * [`NoteError`] — **Non-fatal**: a single note failed (the write was
//!   rejected, a worker task died) while every other note in the batch is
//!   fine. Stored inside [`crate::output::NoteReport`] and counted in the
//!   batch summary.
//!
//! The normalizer itself has no error type. Undecodable input is recovered
//! locally (see [`crate::pipeline::encoding::decode_bytes`]) and the worst
//! case result is an empty string.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the notereflow library.
///
/// Note-level failures use [`NoteError`] and are stored in
/// [`crate::output::NoteReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ReflowError {
    // ── Store errors ──────────────────────────────────────────────────────
    /// The SQLite layer reported an error.
    #[error("Note store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The store refused a write for a single record.
    #[error("Note #{id} could not be written: {reason}")]
    PersistRejected { id: i64, reason: String },

    /// An id filter matched no PDF note with extracted text.
    #[error("No PDF note found with ID: {id}")]
    NoteNotFound { id: i64 },

    // ── Rule table errors ─────────────────────────────────────────────────
    /// A rule pattern failed to compile.
    #[error("Rule #{index} ('{name}') has an invalid pattern: {source}")]
    InvalidRule {
        index: usize,
        name: String,
        #[source]
        source: regex::Error,
    },

    /// A rule table file could not be parsed.
    #[error("Rule table '{path}' is not valid JSON: {source}")]
    RuleTableParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The external OCR service is not reachable.
    #[error("PDF processing service is not available at '{url}'")]
    OcrUnavailable { url: String },

    /// The external OCR service answered but reported a failure.
    #[error("OCR service failed: {detail}")]
    OcrFailed { detail: String },

    /// Local pdfium extraction failed.
    #[error("Local text extraction failed for '{path}': {detail}")]
    ExtractionFailed { path: PathBuf, detail: String },

    /// Extraction succeeded but nothing readable survived normalization.
    #[error(
        "No readable text found in '{path}'.\n\
The PDF might contain only images or be encrypted."
    )]
    NoReadableText { path: PathBuf },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single note.
///
/// Stored alongside [`crate::output::NoteReport`] when a note fails.
/// The batch continues with the remaining notes.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum NoteError {
    /// The normalized text could not be written back.
    #[error("Note #{id}: failed to persist normalized text: {detail}")]
    PersistFailed { id: i64, detail: String },

    /// The worker running this note panicked or was cancelled.
    #[error("Note #{id}: worker task failed: {detail}")]
    TaskFailed { id: i64, detail: String },
}

impl NoteError {
    /// Id of the note this error belongs to.
    pub fn note_id(&self) -> i64 {
        match self {
            NoteError::PersistFailed { id, .. } | NoteError::TaskFailed { id, .. } => *id,
        }
    }
}
