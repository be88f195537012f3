//! purr-view public interface
//!
//! Shared enums, records and the error type handed to the presentation layer.
//! Everything here is plain data; behaviour lives in the modules that own it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Coarse content category reported by the capture collaborator.
///
/// The collaborator sends this as a free-form string that has historically
/// appeared in mixed case ("Image", "TEXT"), so parsing is case-insensitive
/// and anything unrecognised becomes `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Image,
    File,
    Unknown,
}

impl ContentType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => ContentType::Text,
            "image" => ContentType::Image,
            "file" => ContentType::File,
            _ => ContentType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::File => "file",
            ContentType::Unknown => "unknown",
        }
    }
}

/// Fine-grained classification of text-like content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSubtype {
    PlainText,
    Url,
    IpAddress,
    Email,
    Color,
    Code,
    Command,
    Timestamp,
    Json,
    Markdown,
}

impl ContentSubtype {
    pub const ALL: [ContentSubtype; 10] = [
        ContentSubtype::PlainText,
        ContentSubtype::Url,
        ContentSubtype::IpAddress,
        ContentSubtype::Email,
        ContentSubtype::Color,
        ContentSubtype::Code,
        ContentSubtype::Command,
        ContentSubtype::Timestamp,
        ContentSubtype::Json,
        ContentSubtype::Markdown,
    ];

    /// Parse a known subtype label. Returns `None` for labels outside the
    /// known set so callers can decide how to degrade.
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|s| s.as_str() == lower)
    }

    /// Resolve an optional raw label, defaulting to `PlainText`.
    pub fn from_label(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or(ContentSubtype::PlainText)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSubtype::PlainText => "plain_text",
            ContentSubtype::Url => "url",
            ContentSubtype::IpAddress => "ip_address",
            ContentSubtype::Email => "email",
            ContentSubtype::Color => "color",
            ContentSubtype::Code => "code",
            ContentSubtype::Command => "command",
            ContentSubtype::Timestamp => "timestamp",
            ContentSubtype::Json => "json",
            ContentSubtype::Markdown => "markdown",
        }
    }
}

/// Data-free discriminant of the presentation strategy picked for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    Image,
    File,
    Url,
    IpAddress,
    Email,
    Color,
    Timestamp,
    Text,
}

impl RendererKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RendererKind::Image => "image",
            RendererKind::File => "file",
            RendererKind::Url => "url",
            RendererKind::IpAddress => "ip_address",
            RendererKind::Email => "email",
            RendererKind::Color => "color",
            RendererKind::Timestamp => "timestamp",
            RendererKind::Text => "text",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// Half-open `[start, end)` interval of indices into the derived view that
/// are currently rendered in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

impl VisibleRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

/// Result of merging one capture event into the canonical collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// First sighting of this content; inserted at the front.
    Inserted { id: String },
    /// Known content seen again; counted and moved to the front.
    Promoted { id: String, copy_count: u32 },
}

impl CaptureOutcome {
    pub fn id(&self) -> &str {
        match self {
            CaptureOutcome::Inserted { id } => id,
            CaptureOutcome::Promoted { id, .. } => id,
        }
    }
}

/// Copy count per source application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUsage {
    pub app_name: String,
    pub count: u64,
}

/// Aggregate numbers over the canonical collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_entries: u64,
    pub total_copies: u64,
    pub most_copied: Vec<crate::models::Entry>,
    pub recent_apps: Vec<AppUsage>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR TYPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Error type for purr-view operations.
///
/// Only transport-level and setup failures surface here. Missing entries,
/// malformed metadata and unknown subtypes are handled locally and never
/// produce an error.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Entry not found: {0}")]
    NotFound(String),
    #[error("Image error: {0}")]
    Image(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for HistoryError {
    fn from(e: serde_json::Error) -> Self {
        HistoryError::Config(e.to_string())
    }
}
