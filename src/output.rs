//! Result types returned by the library entry points.

use crate::error::NoteError;
use crate::pipeline::encoding::SourceEncoding;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters kept in a [`TextStats::preview`].
pub const PREVIEW_CHARS: usize = 200;

/// Size and a short preview of one version of a text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    /// Character count.
    pub chars: usize,
    /// Number of `\n` characters.
    pub newlines: usize,
    /// First [`PREVIEW_CHARS`] characters, with newlines shown as `\n`.
    pub preview: String,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        Self {
            chars: text.chars().count(),
            newlines: text.matches('\n').count(),
            preview: text.replace('\n', "\\n").chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

/// Output of a single normalization with before/after statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflowOutput {
    pub text: String,
    /// How the input bytes were decoded.
    pub encoding: SourceEncoding,
    /// Whether flat-text restructuring ran.
    pub restructured: bool,
    pub before: TextStats,
    pub after: TextStats,
}

/// Outcome for one note in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteReport {
    pub id: i64,
    pub title: String,
    pub before: TextStats,
    pub after: TextStats,
    /// Normalized text differs from the stored text.
    pub changed: bool,
    /// The normalized text was written back.
    pub persisted: bool,
    /// `None` on success.
    pub error: Option<NoteError>,
}

/// Aggregate result of [`crate::batch::reprocess_notes`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReprocessSummary {
    /// Notes normalized without error (changed or not).
    pub processed: usize,
    /// Of `processed`, notes whose text was already normalized.
    pub unchanged: usize,
    /// Notes whose write failed.
    pub failed: usize,
    pub dry_run: bool,
    /// Per-note reports, ordered by note id.
    pub reports: Vec<NoteReport>,
}

impl ReprocessSummary {
    /// Notes whose normalized text was actually written.
    pub fn persisted(&self) -> usize {
        self.reports.iter().filter(|r| r.persisted).count()
    }
}

/// Where the text of an ingested PDF came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMethod {
    /// The external OCR service; `method` is the engine it reported.
    OcrService { method: String },
    /// Local pdfium text layer extraction.
    LocalPdfium,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::OcrService { method } => write!(f, "ocr-service ({method})"),
            ExtractionMethod::LocalPdfium => f.write_str("local-pdfium"),
        }
    }
}

/// Result of [`crate::ingest::ingest_pdf`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub note_id: i64,
    pub method: ExtractionMethod,
    /// Statistics of the text as extracted.
    pub raw_stats: TextStats,
    /// Statistics of the stored, normalized text.
    pub stats: TextStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_escape_newlines_in_preview() {
        let s = TextStats::of("a\nb\n\nc");
        assert_eq!(s.chars, 6);
        assert_eq!(s.newlines, 3);
        assert_eq!(s.preview, "a\\nb\\n\\nc");
    }

    #[test]
    fn stats_preview_truncates() {
        let s = TextStats::of(&"x".repeat(500));
        assert_eq!(s.chars, 500);
        assert_eq!(s.preview.len(), PREVIEW_CHARS);
    }

    #[test]
    fn summary_counts_persisted() {
        let report = |id, persisted| NoteReport {
            id,
            title: String::new(),
            before: TextStats::default(),
            after: TextStats::default(),
            changed: persisted,
            persisted,
            error: None,
        };
        let summary = ReprocessSummary {
            processed: 2,
            reports: vec![report(1, true), report(2, false)],
            ..Default::default()
        };
        assert_eq!(summary.persisted(), 1);
    }

    #[test]
    fn method_display() {
        assert_eq!(ExtractionMethod::LocalPdfium.to_string(), "local-pdfium");
        let m = ExtractionMethod::OcrService { method: "tesseract".into() };
        assert_eq!(m.to_string(), "ocr-service (tesseract)");
    }
}
