//! The text reflow normalizer.
//!
//! ```text
//! raw text ─▶ characters ─▶ layout ─▶ flat? ──no──▶ normalized
//!             (encoding)    (layout)    │
//!                                       └─yes─▶ rules ─▶ layout ─▶ normalized
//! ```
//!
//! Flatness is decided on laid-out text, never on the raw input. Running the
//! normalizer on its own output therefore takes the same branch and produces
//! the same string.

use crate::config::ReflowConfig;
use crate::error::ReflowError;
use crate::output::{ReflowOutput, TextStats};
use crate::pipeline::encoding::{self, SourceEncoding};
use crate::pipeline::layout;
use std::path::Path;
use tracing::debug;

/// Normalize `text` with the default configuration.
///
/// # Example
/// ```rust
/// assert_eq!(notereflow::normalize("it\u{2019}s\r\n\r\n\r\nok"), "it's\n\nok");
/// ```
pub fn normalize(text: &str) -> String {
    normalize_with(text, &ReflowConfig::default())
}

/// Normalize `text` with an explicit configuration.
pub fn normalize_with(text: &str, config: &ReflowConfig) -> String {
    run(text, config).0
}

/// Decode `bytes` (UTF-8, else Windows-1252) and normalize the result.
pub fn normalize_bytes(bytes: &[u8], config: &ReflowConfig) -> ReflowOutput {
    let (decoded, encoding) = encoding::decode_bytes(bytes);
    reflow_decoded(&decoded, encoding, config)
}

/// Normalize `text` and report before/after statistics.
pub fn reflow(text: &str, config: &ReflowConfig) -> ReflowOutput {
    reflow_decoded(text, SourceEncoding::Utf8, config)
}

/// Write normalized text to `path`, creating parent directories.
///
/// The text goes to a sibling `.tmp` file first and is renamed into place.
pub fn write_text(path: &Path, text: &str) -> Result<(), ReflowError> {
    let failed = |source: std::io::Error| ReflowError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(failed)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, text).map_err(failed)?;
    std::fs::rename(&tmp_path, path).map_err(failed)?;
    debug!("Wrote {} bytes to {}", text.len(), path.display());
    Ok(())
}

fn reflow_decoded(text: &str, encoding: SourceEncoding, config: &ReflowConfig) -> ReflowOutput {
    let (normalized, restructured) = run(text, config);
    ReflowOutput {
        before: TextStats::of(text),
        after: TextStats::of(&normalized),
        text: normalized,
        encoding,
        restructured,
    }
}

fn run(text: &str, config: &ReflowConfig) -> (String, bool) {
    let cleaned = encoding::clean_characters(text, config.bullet());
    let laid_out = layout::layout(&cleaned);

    if !config.is_flat(&laid_out) || config.rules().is_empty() {
        return (laid_out, false);
    }

    debug!(
        "Detected flat text ({} bytes), applying {} structure rules",
        laid_out.len(),
        config.rules().len()
    );
    let restructured = config.rules().apply(&laid_out);
    (layout::layout(&restructured), true)
}
