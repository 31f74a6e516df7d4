//! Configuration types for normalization, batch reprocessing and ingestion.
//!
//! Normalizer behaviour is controlled through [`ReflowConfig`], built via
//! [`ReflowConfigBuilder`]. The builder compiles the rule table for the
//! chosen canonical bullet, so a built config is always internally
//! consistent and cheap to clone across worker tasks.

use crate::error::ReflowError;
use crate::pipeline::encoding::is_valid_bullet;
use crate::pipeline::rules::{self, RuleSpec, RuleTable};
use crate::progress::ReprocessProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Bullet every list-marker glyph is rewritten to unless configured otherwise.
pub const DEFAULT_BULLET: char = '*';

/// Default base URL of the external OCR service.
pub const DEFAULT_OCR_URL: &str = "http://localhost:5000";

/// Configuration for the text reflow normalizer.
///
/// Built via [`ReflowConfig::builder()`] or using [`ReflowConfig::default()`].
///
/// # Example
/// ```rust
/// use notereflow::ReflowConfig;
///
/// let config = ReflowConfig::builder()
///     .bullet('-')
///     .generic_rules()
///     .build()
///     .unwrap();
/// assert_eq!(config.bullet(), '-');
/// ```
#[derive(Clone)]
pub struct ReflowConfig {
    bullet: char,

    /// Text with fewer newlines than this (after layout) may be flat. Default: 20.
    flat_max_newlines: usize,

    /// Text must be longer than this many bytes to count as flat. Default: 500.
    flat_min_bytes: usize,

    rules: Arc<RuleTable>,
}

impl Default for ReflowConfig {
    fn default() -> Self {
        Self {
            bullet: DEFAULT_BULLET,
            flat_max_newlines: 20,
            flat_min_bytes: 500,
            rules: rules::default_table(),
        }
    }
}

impl fmt::Debug for ReflowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflowConfig")
            .field("bullet", &self.bullet)
            .field("flat_max_newlines", &self.flat_max_newlines)
            .field("flat_min_bytes", &self.flat_min_bytes)
            .field("rules", &format_args!("<{} rules>", self.rules.len()))
            .finish()
    }
}

impl ReflowConfig {
    /// Create a new builder for `ReflowConfig`.
    pub fn builder() -> ReflowConfigBuilder {
        ReflowConfigBuilder::default()
    }

    /// The canonical bullet glyph.
    pub fn bullet(&self) -> char {
        self.bullet
    }

    pub fn flat_max_newlines(&self) -> usize {
        self.flat_max_newlines
    }

    pub fn flat_min_bytes(&self) -> usize {
        self.flat_min_bytes
    }

    /// The compiled structural rule table.
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// `true` when laid-out text has lost its line structure.
    pub fn is_flat(&self, text: &str) -> bool {
        text.len() > self.flat_min_bytes
            && text.bytes().filter(|&b| b == b'\n').count() < self.flat_max_newlines
    }
}

/// Where the builder gets its rule table from.
#[derive(Debug, Clone, Default)]
enum RuleSource {
    #[default]
    Academic,
    Generic,
    Empty,
    Specs(Vec<RuleSpec>),
    File(PathBuf),
}

/// Builder for [`ReflowConfig`].
#[derive(Debug, Clone)]
pub struct ReflowConfigBuilder {
    bullet: char,
    flat_max_newlines: usize,
    flat_min_bytes: usize,
    rules: RuleSource,
}

impl Default for ReflowConfigBuilder {
    fn default() -> Self {
        Self {
            bullet: DEFAULT_BULLET,
            flat_max_newlines: 20,
            flat_min_bytes: 500,
            rules: RuleSource::default(),
        }
    }
}

impl ReflowConfigBuilder {
    pub fn bullet(mut self, bullet: char) -> Self {
        self.bullet = bullet;
        self
    }

    pub fn flat_max_newlines(mut self, n: usize) -> Self {
        self.flat_max_newlines = n;
        self
    }

    pub fn flat_min_bytes(mut self, n: usize) -> Self {
        self.flat_min_bytes = n;
        self
    }

    /// Use the built-in academic rule table (the default).
    pub fn academic_rules(mut self) -> Self {
        self.rules = RuleSource::Academic;
        self
    }

    /// Use only the vocabulary-free built-in rules.
    pub fn generic_rules(mut self) -> Self {
        self.rules = RuleSource::Generic;
        self
    }

    /// Never restructure flat text.
    pub fn no_rules(mut self) -> Self {
        self.rules = RuleSource::Empty;
        self
    }

    pub fn rules(mut self, specs: Vec<RuleSpec>) -> Self {
        self.rules = RuleSource::Specs(specs);
        self
    }

    /// Load the rule table from a JSON file when building.
    pub fn rules_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules = RuleSource::File(path.into());
        self
    }

    /// Build the configuration, validating the bullet and compiling rules.
    pub fn build(self) -> Result<ReflowConfig, ReflowError> {
        if !is_valid_bullet(self.bullet) {
            return Err(ReflowError::InvalidConfig(format!(
                "Bullet must be '*', '-', '+' or a known bullet glyph, got {:?}",
                self.bullet
            )));
        }
        if self.flat_max_newlines == 0 {
            return Err(ReflowError::InvalidConfig(
                "Flat-text newline threshold must be ≥ 1".into(),
            ));
        }

        let table = match self.rules {
            RuleSource::Academic if self.bullet == DEFAULT_BULLET => rules::default_table(),
            RuleSource::Academic => {
                Arc::new(RuleTable::compile(rules::academic_rules(), self.bullet)?)
            }
            RuleSource::Generic => {
                Arc::new(RuleTable::compile(rules::generic_rules(), self.bullet)?)
            }
            RuleSource::Empty => Arc::new(RuleTable::empty()),
            RuleSource::Specs(specs) => Arc::new(RuleTable::compile(specs, self.bullet)?),
            RuleSource::File(path) => Arc::new(RuleTable::from_json_file(&path, self.bullet)?),
        };

        Ok(ReflowConfig {
            bullet: self.bullet,
            flat_max_newlines: self.flat_max_newlines,
            flat_min_bytes: self.flat_min_bytes,
            rules: table,
        })
    }
}

// ── Batch reprocessing ───────────────────────────────────────────────────────

/// Options for [`crate::batch::reprocess_notes`].
#[derive(Clone)]
pub struct ReprocessOptions {
    /// Only reprocess this note. An id that matches no PDF note is fatal.
    pub note_id: Option<i64>,

    /// Compute and report, but never write. Default: false.
    pub dry_run: bool,

    /// Notes normalized at once on the blocking pool. Default: 4.
    pub concurrency: usize,

    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ReprocessProgressCallback>>,
}

impl Default for ReprocessOptions {
    fn default() -> Self {
        Self {
            note_id: None,
            dry_run: false,
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReprocessOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReprocessOptions")
            .field("note_id", &self.note_id)
            .field("dry_run", &self.dry_run)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ReprocessProgressCallback>"),
            )
            .finish()
    }
}

impl ReprocessOptions {
    pub fn note_id(mut self, id: i64) -> Self {
        self.note_id = Some(id);
        self
    }

    pub fn dry_run(mut self, v: bool) -> Self {
        self.dry_run = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn ReprocessProgressCallback>) -> Self {
        self.progress_callback = Some(cb);
        self
    }
}

// ── Ingestion ────────────────────────────────────────────────────────────────

/// Configuration for [`crate::ingest::ingest_pdf`].
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Base URL of the OCR service. Default: `http://localhost:5000`.
    pub ocr_url: String,

    /// Timeout for the extraction request, in seconds. Default: 30.
    pub ocr_timeout_secs: u64,

    /// Timeout for the service health check, in seconds. Default: 3.
    pub health_timeout_secs: u64,

    /// Download timeout for URL inputs, in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Try the OCR service before local extraction. Default: true.
    pub use_external_service: bool,

    /// Normalizer settings applied to the extracted text.
    pub reflow: ReflowConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            ocr_url: DEFAULT_OCR_URL.to_string(),
            ocr_timeout_secs: 30,
            health_timeout_secs: 3,
            download_timeout_secs: 120,
            use_external_service: true,
            reflow: ReflowConfig::default(),
        }
    }
}

impl IngestConfig {
    pub fn ocr_url(mut self, url: impl Into<String>) -> Self {
        self.ocr_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.ocr_timeout_secs = secs.max(1);
        self
    }

    pub fn health_timeout_secs(mut self, secs: u64) -> Self {
        self.health_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.download_timeout_secs = secs.max(1);
        self
    }

    pub fn use_external_service(mut self, v: bool) -> Self {
        self.use_external_service = v;
        self
    }

    pub fn reflow(mut self, config: ReflowConfig) -> Self {
        self.reflow = config;
        self
    }
}
