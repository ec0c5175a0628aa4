//! Input resolution: turn a user-supplied path or URL into a [`Document`].
//!
//! The whole payload is held in memory. pdfium can load from a byte slice,
//! and the size gate keeps that bounded. The kind is decided from the file
//! extension first and the `%PDF` magic bytes second, so a PDF served from
//! an extension-less URL is still recognised.

use crate::error::NarrationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Declared kind of a document payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Text,
    Pdf,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Text => "text",
            DocumentKind::Pdf => "pdf",
        }
    }

    /// Detect the kind from the filename, falling back to the magic bytes.
    ///
    /// Returns `None` for anything that is neither `.txt` nor a PDF.
    pub fn detect(filename: &str, bytes: &[u8]) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => Some(DocumentKind::Pdf),
            Some("txt") => Some(DocumentKind::Text),
            _ if bytes.starts_with(b"%PDF") => Some(DocumentKind::Pdf),
            _ => None,
        }
    }
}

/// Raw payload of one document. Immutable once built.
#[derive(Clone)]
pub struct Document {
    bytes: Vec<u8>,
    kind: DocumentKind,
    filename: String,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("filename", &self.filename)
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Document {
    pub fn new(bytes: Vec<u8>, kind: DocumentKind, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            kind,
            filename: filename.into(),
        }
    }

    /// Build a document, detecting the kind from `filename` and content.
    pub fn detect(bytes: Vec<u8>, filename: impl Into<String>) -> Result<Self, NarrationError> {
        let filename = filename.into();
        let kind = DocumentKind::detect(&filename, &bytes).ok_or_else(|| {
            NarrationError::UnsupportedDocument {
                name: filename.clone(),
            }
        })?;
        Ok(Self::new(bytes, kind, filename))
    }

    pub fn text(content: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::new(content.into().into_bytes(), DocumentKind::Text, filename)
    }

    pub fn pdf(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self::new(bytes, DocumentKind::Pdf, filename)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reject documents above `limit` bytes.
    pub fn check_size(&self, limit: usize) -> Result<(), NarrationError> {
        if self.bytes.len() > limit {
            return Err(NarrationError::DocumentTooLarge {
                name: self.filename.clone(),
                size: self.bytes.len(),
                limit,
            });
        }
        Ok(())
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a document from a local path or an HTTP(S) URL.
pub async fn load_document(
    input: &str,
    max_bytes: usize,
    timeout_secs: u64,
) -> Result<Document, NarrationError> {
    let document = if is_url(input) {
        download_url(input, max_bytes, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    document.check_size(max_bytes)?;
    debug!(
        "Loaded '{}' ({} bytes, {})",
        document.filename(),
        document.len(),
        document.kind().as_str()
    );
    Ok(document)
}

async fn read_local(path_str: &str) -> Result<Document, NarrationError> {
    let path = PathBuf::from(path_str);
    if !path.exists() {
        return Err(NarrationError::FileNotFound { path });
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(NarrationError::PermissionDenied { path });
        }
        Err(_) => return Err(NarrationError::FileNotFound { path }),
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());
    Document::detect(bytes, filename)
}

async fn download_url(
    url: &str,
    max_bytes: usize,
    timeout_secs: u64,
) -> Result<Document, NarrationError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| NarrationError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            NarrationError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            NarrationError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(NarrationError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = filename_from_url(url);

    if let Some(len) = response.content_length() {
        if len as usize > max_bytes {
            return Err(NarrationError::DocumentTooLarge {
                name: filename,
                size: len as usize,
                limit: max_bytes,
            });
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| NarrationError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    Document::detect(bytes.to_vec(), filename)
}

/// Last path segment of the URL when it looks like a filename.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded".to_string()
}
