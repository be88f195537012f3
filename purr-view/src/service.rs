//! Ports to the clipboard-capture collaborator
//!
//! The engine never talks to the OS clipboard or the history database; it goes
//! through these traits. Implementations decide transport and persistence.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use futures::stream::BoxStream;

use crate::interface::HistoryError;
use crate::models::Entry;

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait::async_trait]
pub trait ClipboardService: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Push stream of captures, in arrival order. Ends when the collaborator
    /// shuts down.
    fn subscribe_captures(&self) -> BoxStream<'static, Entry>;

    /// Current history, newest first
    async fn fetch_history(&self) -> Result<Vec<Entry>, HistoryError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────────

    /// Persist a favorite flip. Returns the collaborator's new value.
    async fn toggle_favorite(&self, id: &str) -> Result<bool, HistoryError>;

    async fn delete(&self, id: &str) -> Result<(), HistoryError>;

    async fn clear_all(&self) -> Result<(), HistoryError>;

    /// Write `content` back to the system clipboard
    async fn copy_to_clipboard(&self, content: &str) -> Result<(), HistoryError>;

    /// Write the entry back and paste it into the frontmost app
    async fn paste_entry(&self, entry: &Entry) -> Result<(), HistoryError>;
}

/// Resolves a stored image reference into something a view can load.
#[async_trait::async_trait]
pub trait ImageResolver: Send + Sync {
    async fn resolve_image_url(&self, file_path: &str) -> Result<String, HistoryError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// FILE-BACKED IMAGE RESOLVER
// ═══════════════════════════════════════════════════════════════════════════════

/// Reads images from disk and inlines them as `data:` URLs.
///
/// Relative paths (the collaborator stores them as `imgs/<name>`) are
/// resolved against `root`; absolute paths are used as-is.
#[derive(Debug, Clone)]
pub struct FileImageResolver {
    root: PathBuf,
}

impl FileImageResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute_path(&self, file_path: &str) -> PathBuf {
        let path = Path::new(file_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// MIME type from the extension, falling back to magic bytes for unknown
/// extensions. Unrecognised data is reported as PNG.
pub fn sniff_mime_type(path: &Path, data: &[u8]) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => sniff_magic_bytes(data),
    }
}

fn sniff_magic_bytes(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "image/png"
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if data.starts_with(b"GIF8") {
        "image/gif"
    } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/png"
    }
}

#[async_trait::async_trait]
impl ImageResolver for FileImageResolver {
    async fn resolve_image_url(&self, file_path: &str) -> Result<String, HistoryError> {
        let path = self.absolute_path(file_path);
        let data = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                HistoryError::Image(format!("File not found: {}", path.display()))
            }
            _ => HistoryError::Io(e),
        })?;

        let mime_type = sniff_mime_type(&path, &data);
        tracing::debug!(path = %path.display(), mime_type, bytes = data.len(), "Resolved image");
        let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
        Ok(format!("data:{};base64,{}", mime_type, encoded))
    }
}
