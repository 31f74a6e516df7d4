//! Batch reprocessing of stored PDF notes.
//!
//! Re-runs the normalizer over every PDF note (or one note) and writes back
//! text that changed. Each note is independent: a rejected write is
//! recorded in that note's [`NoteReport`] and the rest of the batch carries
//! on.
//!
//! Normalization is CPU-bound and store access is blocking, so each note
//! runs on tokio's blocking pool with at most
//! [`ReprocessOptions::concurrency`] notes in flight.

use crate::config::{ReflowConfig, ReprocessOptions};
use crate::error::{NoteError, ReflowError};
use crate::output::{NoteReport, ReprocessSummary, TextStats};
use crate::pipeline::encoding::SourceEncoding;
use crate::reflow::normalize_with;
use crate::store::{Note, NoteFilter, NoteStore};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Normalize stored PDF notes and persist the ones that change.
///
/// # Errors
/// Returns `Err(ReflowError)` only for fatal errors:
/// - the store cannot be queried
/// - `options.note_id` names no PDF note with extracted text
///
/// Per-note write failures are reported in the summary instead.
pub async fn reprocess_notes(
    store: Arc<dyn NoteStore>,
    options: &ReprocessOptions,
    config: &ReflowConfig,
) -> Result<ReprocessSummary, ReflowError> {
    let start = Instant::now();
    let filter = options.note_id.map_or_else(NoteFilter::all, NoteFilter::id);

    let notes = {
        let store = Arc::clone(&store);
        tokio::task::spawn_blocking(move || store.pdf_notes(filter))
            .await
            .map_err(|e| ReflowError::Internal(format!("note query task failed: {e}")))??
    };

    if notes.is_empty() {
        if let Some(id) = options.note_id {
            return Err(ReflowError::NoteNotFound { id });
        }
        info!("No PDF notes found to process");
        return Ok(ReprocessSummary {
            dry_run: options.dry_run,
            ..Default::default()
        });
    }

    let total = notes.len();
    info!(
        "Found {} PDF note(s) to process{}",
        total,
        if options.dry_run { " (dry run)" } else { "" }
    );
    if let Some(ref cb) = options.progress_callback {
        cb.on_batch_start(total);
    }

    let mut reports: Vec<NoteReport> = stream::iter(notes.into_iter().map(|note| {
        let store = Arc::clone(&store);
        let config = config.clone();
        let callback = options.progress_callback.clone();
        let dry_run = options.dry_run;
        async move {
            let (id, title) = (note.id, note.title.clone());
            if let Some(ref cb) = callback {
                cb.on_note_start(id, &title);
            }

            let report = tokio::task::spawn_blocking(move || {
                process_note(store.as_ref(), note, &config, dry_run)
            })
            .await
            .unwrap_or_else(|e| failed_task_report(id, title, e.to_string()));

            if let Some(ref cb) = callback {
                match &report.error {
                    None => cb.on_note_complete(id, report.changed),
                    Some(e) => cb.on_note_error(id, &e.to_string()),
                }
            }
            report
        }
    }))
    .buffer_unordered(options.concurrency.max(1))
    .collect()
    .await;

    reports.sort_by_key(|r| r.id);

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    let processed = reports.len() - failed;
    let unchanged = reports
        .iter()
        .filter(|r| r.error.is_none() && !r.changed)
        .count();

    info!(
        "Processed {} note(s), {} unchanged, {} failed in {}ms",
        processed,
        unchanged,
        failed,
        start.elapsed().as_millis()
    );
    if let Some(ref cb) = options.progress_callback {
        cb.on_batch_complete(processed, failed);
    }

    Ok(ReprocessSummary {
        processed,
        unchanged,
        failed,
        dry_run: options.dry_run,
        reports,
    })
}

/// Synchronous wrapper around [`reprocess_notes`].
///
/// Creates a temporary tokio runtime internally.
pub fn reprocess_notes_sync(
    store: Arc<dyn NoteStore>,
    options: &ReprocessOptions,
    config: &ReflowConfig,
) -> Result<ReprocessSummary, ReflowError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReflowError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(reprocess_notes(store, options, config))
}

fn process_note(
    store: &dyn NoteStore,
    note: Note,
    config: &ReflowConfig,
    dry_run: bool,
) -> NoteReport {
    // A row decoded from Windows-1252 is rewritten even when the text is
    // already normalized, so the stored bytes become UTF-8.
    let legacy_bytes = note.source_encoding == SourceEncoding::Windows1252;
    let original = note.extracted_text.unwrap_or_default();
    let normalized = normalize_with(&original, config);
    let changed = normalized != original || legacy_bytes;

    let mut report = NoteReport {
        id: note.id,
        title: note.title,
        before: TextStats::of(&original),
        after: TextStats::of(&normalized),
        changed,
        persisted: false,
        error: None,
    };

    if !changed {
        debug!("Note #{} is already normalized", report.id);
        return report;
    }
    if dry_run {
        debug!("Note #{} would change (dry run)", report.id);
        return report;
    }

    match store.update_extracted_text(report.id, &normalized) {
        Ok(()) => {
            debug!("Updated note #{}", report.id);
            report.persisted = true;
        }
        Err(e) => {
            warn!("Failed to update note #{}: {}", report.id, e);
            report.error = Some(NoteError::PersistFailed {
                id: report.id,
                detail: e.to_string(),
            });
        }
    }
    report
}

fn failed_task_report(id: i64, title: String, detail: String) -> NoteReport {
    warn!("Worker for note #{} failed: {}", id, detail);
    NoteReport {
        id,
        title,
        before: TextStats::default(),
        after: TextStats::default(),
        changed: false,
        persisted: false,
        error: Some(NoteError::TaskFailed { id, detail }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryNoteStore;

    fn note(id: i64, text: &str) -> Note {
        Note {
            id,
            title: format!("Note {id}"),
            is_pdf_note: true,
            extracted_text: Some(text.to_string()),
            source_encoding: SourceEncoding::Utf8,
        }
    }

    #[test]
    fn process_note_skips_write_when_unchanged() {
        let store = MemoryNoteStore::with_notes([note(1, "Already clean.")]);
        let report = process_note(&store, note(1, "Already clean."), &ReflowConfig::default(), false);
        assert!(!report.changed);
        assert!(!report.persisted);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn process_note_dry_run_never_writes() {
        let store = MemoryNoteStore::with_notes([note(1, "messy   text\r\n")]);
        let report = process_note(&store, note(1, "messy   text\r\n"), &ReflowConfig::default(), true);
        assert!(report.changed);
        assert!(!report.persisted);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn process_note_rewrites_legacy_encoded_text() {
        let config = ReflowConfig::builder().bullet('\u{2022}').build().unwrap();
        let mut legacy = note(1, "\u{2022} item");
        legacy.source_encoding = SourceEncoding::Windows1252;
        let store = MemoryNoteStore::with_notes([legacy.clone()]);

        let report = process_note(&store, legacy, &config, false);
        assert!(report.changed);
        assert!(report.persisted);
        assert_eq!(store.write_count(), 1);
        assert_eq!(
            store.find(1).unwrap().unwrap().source_encoding,
            SourceEncoding::Utf8
        );
    }

    #[test]
    fn process_note_records_persist_failure() {
        let store = MemoryNoteStore::with_notes([note(1, "messy   text")]);
        store.reject_updates_for(1);
        let report = process_note(&store, note(1, "messy   text"), &ReflowConfig::default(), false);
        assert!(matches!(report.error, Some(NoteError::PersistFailed { id: 1, .. })));
    }

    #[tokio::test]
    async fn unknown_note_id_is_fatal() {
        let store: Arc<dyn NoteStore> = Arc::new(MemoryNoteStore::with_notes([note(1, "x")]));
        let options = ReprocessOptions::default().note_id(42);
        let err = reprocess_notes(store, &options, &ReflowConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReflowError::NoteNotFound { id: 42 }));
    }

    #[tokio::test]
    async fn empty_store_gives_empty_summary() {
        let store: Arc<dyn NoteStore> = Arc::new(MemoryNoteStore::new());
        let summary = reprocess_notes(store, &ReprocessOptions::default(), &ReflowConfig::default())
            .await
            .unwrap();
        assert_eq!(summary.processed, 0);
        assert!(summary.reports.is_empty());
    }
}
