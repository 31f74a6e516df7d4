//! # notereflow
//!
//! Reflow and clean the text that comes out of PDF extraction.
//!
//! ## Why this crate?
//!
//! Text pulled from a PDF text layer or an OCR service is rarely usable as
//! is: Windows line endings, `â€™` where an apostrophe should be, five
//! different bullet glyphs, and sometimes no line breaks at all. This crate
//! turns that into plain ASCII paragraphs separated by one blank line, and
//! does it idempotently so stored notes can be re-normalized at any time.
//!
//! ## Pipeline Overview
//!
//! ```text
//! raw text
//!  │
//!  ├─ 1. Decode      UTF-8, else Windows-1252
//!  ├─ 2. Characters  line endings, controls, mojibake, bullets, ASCII clamp
//!  ├─ 3. Layout      paragraphs, list/punctuation spacing, header isolation
//!  ├─ 4. Rules       only for flat text: re-insert paragraph breaks
//!  └─ 5. Layout      again, so rule output is canonical
//! ```
//!
//! Around the normalizer sit two collaborators: [`reprocess_notes`] re-runs
//! it over stored notes, and [`ingest_pdf`] extracts a new PDF (OCR service
//! first, pdfium as fallback) and stores the normalized text.
//!
//! ## Quick Start
//!
//! ```rust
//! use notereflow::{normalize_with, ReflowConfig};
//!
//! let config = ReflowConfig::default();
//! let text = normalize_with("\u{2022}First point\r\n\u{25CF}Second point", &config);
//! assert_eq!(text, "* First point\n* Second point");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `notereflow` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! notereflow = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod reflow;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{reprocess_notes, reprocess_notes_sync};
pub use config::{
    IngestConfig, ReflowConfig, ReflowConfigBuilder, ReprocessOptions, DEFAULT_BULLET,
    DEFAULT_OCR_URL,
};
pub use error::{NoteError, ReflowError};
pub use ingest::{ingest_pdf, ingest_pdf_sync};
pub use output::{
    ExtractionMethod, IngestOutcome, NoteReport, ReflowOutput, ReprocessSummary, TextStats,
};
pub use pipeline::encoding::{decode_bytes, SourceEncoding};
pub use pipeline::ocr::{OcrClient, ServiceStatus};
pub use pipeline::rules::{RuleSpec, RuleTable};
pub use progress::{NoopProgressCallback, ReprocessProgressCallback};
pub use reflow::{normalize, normalize_bytes, normalize_with, reflow, write_text};
pub use store::{MemoryNoteStore, NewNote, Note, NoteFilter, NoteStore, SqliteNoteStore};
