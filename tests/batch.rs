//! Batch reprocessing against the in-memory and SQLite stores.

use notereflow::{
    reprocess_notes, reprocess_notes_sync, MemoryNoteStore, NewNote, Note, NoteError, NoteFilter,
    NoteStore, ReflowConfig, ReflowError, ReprocessOptions, ReprocessProgressCallback,
    SourceEncoding, SqliteNoteStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn pdf_note(id: i64, text: &str) -> Note {
    Note {
        id,
        title: format!("Lecture {id}"),
        is_pdf_note: true,
        extracted_text: Some(text.to_string()),
        source_encoding: SourceEncoding::Utf8,
    }
}

fn mixed_store() -> MemoryNoteStore {
    MemoryNoteStore::with_notes([
        pdf_note(1, "Already clean."),
        pdf_note(2, "itâ€™s messy\r\n\u{2022}point one"),
        pdf_note(3, "Too    many     spaces here."),
        Note {
            id: 4,
            title: "Typed note".into(),
            is_pdf_note: false,
            extracted_text: Some("not   a   pdf".into()),
            source_encoding: SourceEncoding::Utf8,
        },
    ])
}

#[derive(Default)]
struct CountingCallback {
    started: AtomicUsize,
    notes: AtomicUsize,
    completed: AtomicUsize,
    errors: AtomicUsize,
    batch_done: AtomicUsize,
}

impl ReprocessProgressCallback for CountingCallback {
    fn on_batch_start(&self, total_notes: usize) {
        self.started.store(total_notes, Ordering::SeqCst);
    }

    fn on_note_start(&self, _id: i64, _title: &str) {
        self.notes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_note_complete(&self, _id: i64, _changed: bool) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_note_error(&self, _id: i64, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_batch_complete(&self, _processed: usize, _failed: usize) {
        self.batch_done.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn only_changed_notes_are_written() {
    let store = Arc::new(mixed_store());
    let summary = reprocess_notes(
        store.clone(),
        &ReprocessOptions::default(),
        &ReflowConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.persisted(), 2);
    assert_eq!(store.write_count(), 2);

    let ids: Vec<i64> = summary.reports.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let two = store.find(2).unwrap().unwrap();
    assert_eq!(two.extracted_text.as_deref(), Some("it's messy\n* point one"));
    let typed = store.find(4).unwrap().unwrap();
    assert_eq!(typed.extracted_text.as_deref(), Some("not   a   pdf"));
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
    let store = Arc::new(mixed_store());
    let options = ReprocessOptions::default().dry_run(true);
    let summary = reprocess_notes(store.clone(), &options, &ReflowConfig::default())
        .await
        .unwrap();

    assert!(summary.dry_run);
    assert_eq!(store.write_count(), 0);
    assert_eq!(summary.persisted(), 0);
    let changed = summary.reports.iter().filter(|r| r.changed).count();
    assert_eq!(changed, 2);

    let three = summary.reports.iter().find(|r| r.id == 3).unwrap();
    assert_eq!(three.after.preview, "Too many spaces here.");
    assert_eq!(
        store.find(3).unwrap().unwrap().extracted_text.as_deref(),
        Some("Too    many     spaces here.")
    );
}

#[tokio::test]
async fn second_run_changes_nothing() {
    let store = Arc::new(mixed_store());
    let config = ReflowConfig::default();
    reprocess_notes(store.clone(), &ReprocessOptions::default(), &config)
        .await
        .unwrap();
    let writes = store.write_count();

    let again = reprocess_notes(store.clone(), &ReprocessOptions::default(), &config)
        .await
        .unwrap();
    assert_eq!(again.unchanged, 3);
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn note_id_filter_limits_the_batch() {
    let store = Arc::new(mixed_store());
    let options = ReprocessOptions::default().note_id(3);
    let summary = reprocess_notes(store.clone(), &options, &ReflowConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].id, 3);
    assert_eq!(store.write_count(), 1);
    assert_eq!(
        store.find(2).unwrap().unwrap().extracted_text.as_deref(),
        Some("itâ€™s messy\r\n\u{2022}point one")
    );
}

#[tokio::test]
async fn filter_on_non_pdf_note_is_not_found() {
    let store = Arc::new(mixed_store());
    let options = ReprocessOptions::default().note_id(4);
    let err = reprocess_notes(store, &options, &ReflowConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ReflowError::NoteNotFound { id: 4 }));
}

#[tokio::test]
async fn rejected_write_does_not_stop_the_batch() {
    let store = Arc::new(mixed_store());
    store.reject_updates_for(2);
    let callback = Arc::new(CountingCallback::default());
    let options = ReprocessOptions::default()
        .concurrency(2)
        .progress_callback(callback.clone());

    let summary = reprocess_notes(store.clone(), &options, &ReflowConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.persisted(), 1);
    let failed = summary.reports.iter().find(|r| r.id == 2).unwrap();
    match &failed.error {
        Some(err @ NoteError::PersistFailed { .. }) => assert_eq!(err.note_id(), 2),
        other => panic!("expected PersistFailed, got {other:?}"),
    }
    assert_eq!(
        store.find(3).unwrap().unwrap().extracted_text.as_deref(),
        Some("Too many spaces here.")
    );

    assert_eq!(callback.started.load(Ordering::SeqCst), 3);
    assert_eq!(callback.notes.load(Ordering::SeqCst), 3);
    assert_eq!(callback.completed.load(Ordering::SeqCst), 2);
    assert_eq!(callback.errors.load(Ordering::SeqCst), 1);
    assert_eq!(callback.batch_done.load(Ordering::SeqCst), 1);
}

#[test]
fn sync_wrapper_runs_outside_a_runtime() {
    let store = Arc::new(mixed_store());
    let summary = reprocess_notes_sync(
        store.clone(),
        &ReprocessOptions::default(),
        &ReflowConfig::default(),
    )
    .unwrap();
    assert_eq!(summary.persisted(), 2);
}

#[tokio::test]
async fn sqlite_store_repairs_legacy_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("notes.db");

    {
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE notes (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                is_pdf_note INTEGER NOT NULL DEFAULT 0,
                extracted_text TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            );",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO notes (id, title, is_pdf_note, extracted_text) VALUES (1, 'Legacy', 1, ?1)",
            rusqlite::params![b"\x93Quoted\x94 text\r\n\x95 item".to_vec()],
        )
        .unwrap();
    }

    let store = Arc::new(SqliteNoteStore::open(&db).unwrap());
    let fresh = store
        .insert_pdf_note(&NewNote {
            title: "Fresh".into(),
            extracted_text: "Already clean.".into(),
        })
        .unwrap();

    let summary = reprocess_notes(
        store.clone(),
        &ReprocessOptions::default(),
        &ReflowConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.persisted(), 1);
    assert!(!summary.reports.iter().find(|r| r.id == fresh).unwrap().changed);

    let notes = store.pdf_notes(NoteFilter::id(1)).unwrap();
    assert_eq!(
        notes[0].extracted_text.as_deref(),
        Some("\"Quoted\" text\n* item")
    );
}

#[tokio::test]
async fn legacy_row_is_rewritten_as_utf8_even_when_already_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("notes.db");
    let store = Arc::new(SqliteNoteStore::open(&db).unwrap());

    {
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute(
            "INSERT INTO notes (id, title, is_pdf_note, extracted_text) VALUES (1, 'Legacy', 1, ?1)",
            rusqlite::params![b"\x95 item".to_vec()],
        )
        .unwrap();
    }

    let config = ReflowConfig::builder().bullet('\u{2022}').build().unwrap();
    let summary = reprocess_notes(store.clone(), &ReprocessOptions::default(), &config)
        .await
        .unwrap();

    assert_eq!(summary.persisted(), 1);
    assert_eq!(summary.reports[0].after.preview, "\u{2022} item");

    let conn = rusqlite::Connection::open(&db).unwrap();
    let stored: String = conn
        .query_row("SELECT extracted_text FROM notes WHERE id = 1", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(stored, "\u{2022} item");
    assert_eq!(
        store.find(1).unwrap().unwrap().source_encoding,
        SourceEncoding::Utf8
    );

    let again = reprocess_notes(store, &ReprocessOptions::default(), &config)
        .await
        .unwrap();
    assert_eq!(again.unchanged, 1);
}
