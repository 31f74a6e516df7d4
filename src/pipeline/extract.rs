//! Local text extraction via pdfium.
//!
//! Used when the OCR service is disabled or fails. pdfium only reads the
//! embedded text layer, so scanned PDFs produce little or nothing here.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is synchronous and
//! keeps thread-local state. Extraction runs on tokio's blocking pool so
//! the async workers never stall on a large document.

use crate::error::ReflowError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the pdfium shared library (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Extract the text layer of every page, with page header lines.
pub async fn extract_text(pdf_path: &Path) -> Result<String, ReflowError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_text_blocking(&path))
        .await
        .map_err(|e| ReflowError::Internal(format!("Extraction task panicked: {}", e)))?
}

fn bind_pdfium(pdf_path: &Path) -> Result<Pdfium, ReflowError> {
    let bindings = match std::env::var_os(PDFIUM_LIB_PATH_ENV) {
        Some(lib) => {
            let lib = PathBuf::from(lib);
            let lib = if lib.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&lib)
            } else {
                lib
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_system_library(),
    };
    bindings
        .map(Pdfium::new)
        .map_err(|e| ReflowError::ExtractionFailed {
            path: pdf_path.to_path_buf(),
            detail: format!("pdfium library unavailable ({e:?}); set {PDFIUM_LIB_PATH_ENV}"),
        })
}

fn extract_text_blocking(pdf_path: &Path) -> Result<String, ReflowError> {
    let pdfium = bind_pdfium(pdf_path)?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| ReflowError::ExtractionFailed {
            path: pdf_path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let mut pages = Vec::new();
    for page in document.pages().iter() {
        let text = page.text().map_err(|e| ReflowError::ExtractionFailed {
            path: pdf_path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;
        pages.push(text.all());
    }
    info!("Extracted text layer from {} pages", pages.len());
    Ok(join_pages(&pages))
}

/// Join page texts, each under a `--- Page N ---` header; empty pages are
/// skipped but keep their number.
pub fn join_pages(pages: &[String]) -> String {
    let mut out = String::new();
    for (idx, text) in pages.iter().enumerate() {
        if text.trim().is_empty() {
            continue;
        }
        if idx == 0 {
            out.push_str("--- Page 1 ---\n");
        } else {
            out.push_str(&format!("\n\n--- Page {} ---\n\n", idx + 1));
        }
        out.push_str(text);
    }
    out
}
