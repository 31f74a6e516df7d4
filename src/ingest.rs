//! PDF ingestion: extract, normalize once, store as a new note.
//!
//! ```text
//! path / URL ─▶ resolve ─▶ OCR service ──ok──▶ normalize ─▶ insert note
//!                              │                  ▲
//!                              └─fail─▶ pdfium ───┘
//! ```

use crate::config::IngestConfig;
use crate::error::ReflowError;
use crate::output::{ExtractionMethod, IngestOutcome, TextStats};
use crate::pipeline::{extract, input, ocr::OcrClient};
use crate::reflow::normalize_with;
use crate::store::{NewNote, NoteStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Normalized text must be longer than this many bytes to be stored.
pub const MIN_READABLE_BYTES: usize = 10;

/// Extract text from a PDF and store it as a new PDF note.
///
/// # Arguments
/// * `input` — local file path or HTTP/HTTPS URL
/// * `title` — title of the new note
///
/// # Errors
/// - the input cannot be resolved or is not a PDF
/// - both the OCR service and local extraction failed
/// - nothing readable remained after normalization
/// - the store rejected the insert
pub async fn ingest_pdf(
    input_str: impl AsRef<str>,
    title: impl Into<String>,
    store: Arc<dyn NoteStore>,
    config: &IngestConfig,
) -> Result<IngestOutcome, ReflowError> {
    let start = Instant::now();
    let input_str = input_str.as_ref();
    let title = title.into();
    info!("Ingesting PDF: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Extract text ─────────────────────────────────────────────
    let (raw, method) = extract_raw_text(&pdf_path, config).await?;

    // ── Step 3: Normalize ────────────────────────────────────────────────
    let raw_stats = TextStats::of(&raw);
    let reflow_config = config.reflow.clone();
    let normalized = tokio::task::spawn_blocking(move || normalize_with(&raw, &reflow_config))
        .await
        .map_err(|e| ReflowError::Internal(format!("Normalize task failed: {e}")))?;
    if normalized.len() <= MIN_READABLE_BYTES {
        warn!("No meaningful text extracted from {}", pdf_path.display());
        return Err(ReflowError::NoReadableText { path: pdf_path });
    }

    // ── Step 4: Store ────────────────────────────────────────────────────
    let stats = TextStats::of(&normalized);
    let note = NewNote {
        title,
        extracted_text: normalized,
    };
    let note_id = tokio::task::spawn_blocking(move || store.insert_pdf_note(&note))
        .await
        .map_err(|e| ReflowError::Internal(format!("Insert task failed: {e}")))??;

    info!(
        "Stored note #{} via {} ({} chars) in {}ms",
        note_id,
        method,
        stats.chars,
        start.elapsed().as_millis()
    );

    Ok(IngestOutcome {
        note_id,
        method,
        raw_stats,
        stats,
    })
}

/// Try the OCR service, then fall back to local extraction.
async fn extract_raw_text(
    pdf_path: &Path,
    config: &IngestConfig,
) -> Result<(String, ExtractionMethod), ReflowError> {
    if config.use_external_service {
        let client = OcrClient::from_config(config)?;
        match client.extract_text(pdf_path).await {
            Ok(extraction) => {
                info!(
                    "OCR service extracted {} words using {}",
                    extraction.word_count, extraction.method
                );
                return Ok((
                    extraction.text,
                    ExtractionMethod::OcrService {
                        method: extraction.method,
                    },
                ));
            }
            Err(e) => warn!("OCR service failed, falling back to local extraction: {}", e),
        }
    }

    let text = extract::extract_text(pdf_path).await?;
    Ok((text, ExtractionMethod::LocalPdfium))
}

/// Synchronous wrapper around [`ingest_pdf`].
///
/// Creates a temporary tokio runtime internally.
pub fn ingest_pdf_sync(
    input_str: impl AsRef<str>,
    title: impl Into<String>,
    store: Arc<dyn NoteStore>,
    config: &IngestConfig,
) -> Result<IngestOutcome, ReflowError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReflowError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(ingest_pdf(input_str, title, store, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryNoteStore;

    #[tokio::test]
    async fn rejects_non_pdf_before_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text").unwrap();

        let store = Arc::new(MemoryNoteStore::new());
        let err = ingest_pdf(
            path.to_str().unwrap(),
            "Notes",
            store.clone(),
            &IngestConfig::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ReflowError::NotAPdf { .. }));
        assert_eq!(store.write_count(), 0);
    }
}
