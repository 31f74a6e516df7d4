//! Client for the external PDF OCR service.
//!
//! The service is a small HTTP app with two endpoints we rely on:
//!
//! | Request | Purpose |
//! |---------|---------|
//! | `GET {url}` | liveness; any 2xx means up |
//! | `POST {url}/extract-text` | multipart upload (field `file`), JSON reply |
//!
//! Every failure (down, timeout, non-2xx, `success: false`) comes back as a
//! [`ReflowError`] so the ingestion pipeline can log it and fall back to
//! local extraction.

use crate::config::IngestConfig;
use crate::error::ReflowError;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// JSON body returned by `POST /extract-text`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractTextResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub char_count: Option<u64>,
    #[serde(default)]
    pub word_count: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Text returned by a successful service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrExtraction {
    pub text: String,
    /// Engine name reported by the service.
    pub method: String,
    pub char_count: u64,
    pub word_count: u64,
}

/// What the extraction path can do right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub text_extraction: bool,
    pub ocr_images: bool,
    pub advanced_formatting: bool,
}

/// Service status as shown to users before an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Uploads work at all. Always true: local extraction is the fallback.
    pub available: bool,
    /// The OCR service answered its health check.
    pub external_service: bool,
    pub method: String,
    pub message: String,
    pub capabilities: Capabilities,
}

impl ServiceStatus {
    fn from_health(external: bool) -> Self {
        let (method, message) = if external {
            (
                "External OCR Service",
                "PDF OCR service is available with full OCR capabilities.",
            )
        } else {
            (
                "Local text extraction",
                "PDF upload is available using basic text extraction. \
                 For better OCR results, start the OCR service.",
            )
        };
        Self {
            available: true,
            external_service: external,
            method: method.to_string(),
            message: message.to_string(),
            capabilities: Capabilities {
                text_extraction: true,
                ocr_images: external,
                advanced_formatting: external,
            },
        }
    }
}

/// HTTP client for the OCR service.
#[derive(Debug, Clone)]
pub struct OcrClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    health_timeout: Duration,
}

impl OcrClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout_secs: u64,
        health_timeout_secs: u64,
    ) -> Result<Self, ReflowError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ReflowError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout: Duration::from_secs(timeout_secs),
            health_timeout: Duration::from_secs(health_timeout_secs),
        })
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self, ReflowError> {
        Self::new(
            config.ocr_url.clone(),
            config.ocr_timeout_secs,
            config.health_timeout_secs,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `true` when `GET {url}` answers 2xx within the health timeout.
    pub async fn is_available(&self) -> bool {
        match self
            .client
            .get(&self.base_url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("OCR service health check failed: {}", e);
                false
            }
        }
    }

    pub async fn status(&self) -> ServiceStatus {
        ServiceStatus::from_health(self.is_available().await)
    }

    /// Upload `pdf_path` to the service and return the text it extracted.
    pub async fn extract_text(&self, pdf_path: &Path) -> Result<OcrExtraction, ReflowError> {
        if !self.is_available().await {
            warn!("OCR service is not available at {}", self.base_url);
            return Err(ReflowError::OcrUnavailable {
                url: self.base_url.clone(),
            });
        }

        let bytes = tokio::fs::read(pdf_path)
            .await
            .map_err(|e| ReflowError::Internal(format!("reading {}: {e}", pdf_path.display())))?;
        let filename = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        info!(
            "Sending {} ({} bytes) to {}/extract-text",
            filename,
            bytes.len(),
            self.base_url
        );

        let part = Part::bytes(bytes)
            .file_name(filename)
            .mime_str("application/pdf")
            .map_err(|e| ReflowError::Internal(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/extract-text", self.base_url))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ReflowError::OcrFailed {
                detail: if e.is_timeout() {
                    format!("request timed out after {}s", self.timeout.as_secs())
                } else {
                    format!("failed to process PDF with external service: {e}")
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReflowError::OcrFailed {
                detail: format!(
                    "failed to communicate with PDF processing service (HTTP {}): {}",
                    status.as_u16(),
                    body.chars().take(200).collect::<String>()
                ),
            });
        }

        let reply: ExtractTextResponse =
            response.json().await.map_err(|e| ReflowError::OcrFailed {
                detail: format!("invalid JSON reply: {e}"),
            })?;
        into_extraction(reply)
    }
}

fn into_extraction(reply: ExtractTextResponse) -> Result<OcrExtraction, ReflowError> {
    if !reply.success {
        return Err(ReflowError::OcrFailed {
            detail: reply
                .error
                .unwrap_or_else(|| "Unknown error occurred".to_string()),
        });
    }
    let text = reply.text.unwrap_or_default();
    Ok(OcrExtraction {
        char_count: reply.char_count.unwrap_or(text.chars().count() as u64),
        word_count: reply
            .word_count
            .unwrap_or(text.split_whitespace().count() as u64),
        method: reply
            .method
            .unwrap_or_else(|| "External OCR Service".to_string()),
        text,
    })
}
