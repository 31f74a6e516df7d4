//! Progress-callback trait for batch reprocessing events.
//!
//! Inject an [`Arc<dyn ReprocessProgressCallback>`] via
//! [`crate::config::ReprocessOptions::progress_callback`] to receive events
//! as notes are normalized and written back.
//!
//! # Example
//!
//! ```rust
//! use notereflow::{ReprocessOptions, ReprocessProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl ReprocessProgressCallback for CountingCallback {
//!     fn on_note_complete(&self, id: i64, changed: bool) {
//!         if changed {
//!             self.written.fetch_add(1, Ordering::SeqCst);
//!         }
//!         eprintln!("note #{id} done");
//!     }
//! }
//!
//! let options = ReprocessOptions::default()
//!     .progress_callback(Arc::new(CountingCallback { written: AtomicUsize::new(0) }));
//! ```

use std::sync::Arc;

/// Called by the batch reprocessor as it works through notes.
///
/// Notes run concurrently, so `on_note_start`, `on_note_complete` and
/// `on_note_error` may fire from different threads in any order.
/// All methods default to no-ops.
pub trait ReprocessProgressCallback: Send + Sync {
    /// Called once, after notes are selected and before any is normalized.
    fn on_batch_start(&self, total_notes: usize) {
        let _ = total_notes;
    }

    /// Called when a note is handed to a worker.
    fn on_note_start(&self, id: i64, title: &str) {
        let _ = (id, title);
    }

    /// Called when a note finished without error.
    ///
    /// # Arguments
    /// * `id`      — note id
    /// * `changed` — whether normalization altered the stored text
    fn on_note_complete(&self, id: i64, changed: bool) {
        let _ = (id, changed);
    }

    /// Called when a note failed; the batch continues.
    fn on_note_error(&self, id: i64, error: &str) {
        let _ = (id, error);
    }

    /// Called once after every note has been attempted.
    fn on_batch_complete(&self, processed: usize, failed: usize) {
        let _ = (processed, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReprocessProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReprocessOptions`].
pub type ProgressCallback = Arc<dyn ReprocessProgressCallback>;
