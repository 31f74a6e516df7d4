//! Pipeline stages for text reflow and PDF ingestion.
//!
//! Each submodule implements one step; [`crate::reflow`] and
//! [`crate::ingest`] wire them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ ocr / extract ──▶ encoding ──▶ layout ──▶ rules ──▶ layout
//! (path/URL) (service/pdfium)  (chars)     (lines)    (flat)
//! ```
//!
//! 1. [`input`]    — canonicalise a path or URL to a local PDF
//! 2. [`ocr`]      — external OCR service client (network I/O)
//! 3. [`extract`]  — local pdfium text extraction; runs in `spawn_blocking`
//! 4. [`encoding`] — byte decoding, mojibake repair, bullet unification,
//!    charset clamp
//! 5. [`layout`]   — paragraphs, list and punctuation spacing, headers
//! 6. [`rules`]    — structural rewrites for text that lost its line breaks

pub mod encoding;
pub mod extract;
pub mod input;
pub mod layout;
pub mod ocr;
pub mod rules;
