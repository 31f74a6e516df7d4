//! Persistence for study notes.
//!
//! The batch reprocessor and the ingestion pipeline only talk to the
//! [`NoteStore`] trait. [`SqliteNoteStore`] keeps notes in a `notes` table;
//! [`MemoryNoteStore`] keeps them in a map and can be told to reject writes.

use crate::error::ReflowError;
use crate::pipeline::encoding::{decode_bytes, SourceEncoding};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// A stored note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub is_pdf_note: bool,
    /// Text extracted from the uploaded PDF, if any.
    pub extracted_text: Option<String>,
    /// How the stored `extracted_text` bytes were decoded. `Windows1252`
    /// marks a legacy row that is not valid UTF-8 on disk.
    #[serde(default)]
    pub source_encoding: SourceEncoding,
}

/// A PDF note about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub extracted_text: String,
}

/// Selects which PDF notes [`NoteStore::pdf_notes`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub id: Option<i64>,
}

impl NoteFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn id(id: i64) -> Self {
        Self { id: Some(id) }
    }

    fn matches(&self, note: &Note) -> bool {
        note.is_pdf_note
            && note.extracted_text.is_some()
            && self.id.map_or(true, |id| id == note.id)
    }
}

/// Per-record access to stored notes.
pub trait NoteStore: Send + Sync {
    /// PDF notes that have extracted text, ordered by id.
    fn pdf_notes(&self, filter: NoteFilter) -> Result<Vec<Note>, ReflowError>;

    fn find(&self, id: i64) -> Result<Option<Note>, ReflowError>;

    /// Replace the extracted text of one note.
    fn update_extracted_text(&self, id: i64, text: &str) -> Result<(), ReflowError>;

    /// Insert a PDF note and return its id.
    fn insert_pdf_note(&self, note: &NewNote) -> Result<i64, ReflowError>;
}

// ── SQLite ───────────────────────────────────────────────────────────────────

/// Notes in an SQLite database.
///
/// Text columns are read as raw bytes and decoded with the normalizer's
/// UTF-8/Windows-1252 fallback, so rows written by legacy code still load.
pub struct SqliteNoteStore {
    conn: Mutex<Connection>,
}

impl SqliteNoteStore {
    /// Open (or create) a database file and make sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReflowError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        init_schema(&conn)?;
        info!("Opened note store: {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, ReflowError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ReflowError> {
        self.conn
            .lock()
            .map_err(|_| ReflowError::Internal("note store mutex poisoned".into()))
    }
}

fn init_schema(conn: &Connection) -> Result<(), ReflowError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            is_pdf_note INTEGER NOT NULL DEFAULT 0,
            extracted_text TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_notes_pdf ON notes(is_pdf_note);
        "#,
    )?;
    Ok(())
}

fn decode_column(value: ValueRef<'_>) -> Option<(String, SourceEncoding)> {
    match value {
        ValueRef::Null => None,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            let (text, encoding) = decode_bytes(bytes);
            Some((text.into_owned(), encoding))
        }
        ValueRef::Integer(i) => Some((i.to_string(), SourceEncoding::Utf8)),
        ValueRef::Real(f) => Some((f.to_string(), SourceEncoding::Utf8)),
    }
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let (extracted_text, source_encoding) = match decode_column(row.get_ref(3)?) {
        Some((text, encoding)) => (Some(text), encoding),
        None => (None, SourceEncoding::Utf8),
    };
    Ok(Note {
        id: row.get(0)?,
        title: decode_column(row.get_ref(1)?)
            .map(|(title, _)| title)
            .unwrap_or_default(),
        is_pdf_note: row.get::<_, i64>(2)? != 0,
        extracted_text,
        source_encoding,
    })
}

const SELECT_NOTE: &str = "SELECT id, title, is_pdf_note, extracted_text FROM notes";

impl NoteStore for SqliteNoteStore {
    fn pdf_notes(&self, filter: NoteFilter) -> Result<Vec<Note>, ReflowError> {
        let conn = self.lock()?;
        let where_pdf = "WHERE is_pdf_note = 1 AND extracted_text IS NOT NULL";
        let notes = match filter.id {
            Some(id) => {
                let mut stmt =
                    conn.prepare_cached(&format!("{SELECT_NOTE} {where_pdf} AND id = ?1"))?;
                let rows = stmt.query_map(params![id], note_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare_cached(&format!("{SELECT_NOTE} {where_pdf} ORDER BY id"))?;
                let rows = stmt.query_map([], note_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        debug!("Selected {} PDF notes", notes.len());
        Ok(notes)
    }

    fn find(&self, id: i64) -> Result<Option<Note>, ReflowError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!("{SELECT_NOTE} WHERE id = ?1"))?;
        Ok(stmt.query_row(params![id], note_from_row).optional()?)
    }

    fn update_extracted_text(&self, id: i64, text: &str) -> Result<(), ReflowError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE notes SET extracted_text = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![text, id],
        )?;
        if updated == 0 {
            return Err(ReflowError::PersistRejected {
                id,
                reason: "note no longer exists".into(),
            });
        }
        Ok(())
    }

    fn insert_pdf_note(&self, note: &NewNote) -> Result<i64, ReflowError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notes (title, is_pdf_note, extracted_text) VALUES (?1, 1, ?2)",
            params![note.title, note.extracted_text],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

// ── In-memory ────────────────────────────────────────────────────────────────

/// Notes in a map; used by tests and embedders without a database.
#[derive(Default)]
pub struct MemoryNoteStore {
    notes: Mutex<BTreeMap<i64, Note>>,
    rejected: Mutex<HashSet<i64>>,
    writes: AtomicUsize,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.notes.lock() {
            map.extend(notes.into_iter().map(|n| (n.id, n)));
        }
        store
    }

    /// Make every later update of `id` fail.
    pub fn reject_updates_for(&self, id: i64) {
        if let Ok(mut rejected) = self.rejected.lock() {
            rejected.insert(id);
        }
    }

    /// Number of successful writes (updates and inserts).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn notes(&self) -> Result<MutexGuard<'_, BTreeMap<i64, Note>>, ReflowError> {
        self.notes
            .lock()
            .map_err(|_| ReflowError::Internal("note map mutex poisoned".into()))
    }
}

impl NoteStore for MemoryNoteStore {
    fn pdf_notes(&self, filter: NoteFilter) -> Result<Vec<Note>, ReflowError> {
        Ok(self
            .notes()?
            .values()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect())
    }

    fn find(&self, id: i64) -> Result<Option<Note>, ReflowError> {
        Ok(self.notes()?.get(&id).cloned())
    }

    fn update_extracted_text(&self, id: i64, text: &str) -> Result<(), ReflowError> {
        let rejected = self
            .rejected
            .lock()
            .map(|r| r.contains(&id))
            .unwrap_or(false);
        if rejected {
            return Err(ReflowError::PersistRejected {
                id,
                reason: "write rejected by store".into(),
            });
        }
        let mut notes = self.notes()?;
        let note = notes.get_mut(&id).ok_or_else(|| ReflowError::PersistRejected {
            id,
            reason: "note no longer exists".into(),
        })?;
        note.extracted_text = Some(text.to_string());
        note.source_encoding = SourceEncoding::Utf8;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn insert_pdf_note(&self, note: &NewNote) -> Result<i64, ReflowError> {
        let mut notes = self.notes()?;
        let id = notes.keys().next_back().map_or(1, |last| last + 1);
        notes.insert(
            id,
            Note {
                id,
                title: note.title.clone(),
                is_pdf_note: true,
                extracted_text: Some(note.extracted_text.clone()),
                source_encoding: SourceEncoding::Utf8,
            },
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }
}
