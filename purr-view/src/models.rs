//! Core data model for purr-view
//!
//! `Entry` mirrors the record the capture collaborator emits, field for field,
//! so payloads deserialize directly. Optional fields default to `None` and a
//! missing `copy_count` defaults to 1.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::interface::{ContentSubtype, ContentType};

fn default_copy_count() -> u32 {
    1
}

/// One clipboard capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub content_hash: String,
    pub content_type: String,
    #[serde(default)]
    pub content_subtype: Option<String>,
    #[serde(default)]
    pub content_data: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    /// Opaque JSON document; see `metadata::EntryMetadata` for parsing
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub source_app: Option<String>,
    #[serde(default)]
    pub app_bundle_id: Option<String>,
    /// Unix milliseconds
    pub created_at: i64,
    #[serde(default = "default_copy_count")]
    pub copy_count: u32,
    #[serde(default)]
    pub is_favorite: bool,
}

impl Entry {
    /// Create a fresh entry with a random id, `copy_count = 1` and the
    /// current time as capture timestamp.
    pub fn new(
        content_type: ContentType,
        content_data: Option<String>,
        content_hash: String,
        source_app: Option<String>,
        file_path: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content_hash,
            content_type: content_type.as_str().to_string(),
            content_subtype: None,
            content_data,
            file_path,
            metadata: None,
            source_app,
            app_bundle_id: None,
            created_at: chrono::Utc::now().timestamp_millis(),
            copy_count: 1,
            is_favorite: false,
        }
    }

    /// Create a text entry whose hash is derived from the text itself
    pub fn new_text(text: impl Into<String>, source_app: Option<String>) -> Self {
        let text = text.into();
        let content_hash = Self::hash_string(&text);
        Self::new(ContentType::Text, Some(text), content_hash, source_app, None)
    }

    /// Create an image entry referencing a stored file
    pub fn new_image(file_path: impl Into<String>, source_app: Option<String>) -> Self {
        let file_path = file_path.into();
        let content_hash = Self::hash_string(&format!("image:{}", file_path));
        Self::new(
            ContentType::Image,
            Some(file_path.clone()),
            content_hash,
            source_app,
            Some(file_path),
        )
    }

    pub fn with_subtype(mut self, subtype: ContentSubtype) -> Self {
        self.content_subtype = Some(subtype.as_str().to_string());
        self
    }

    pub fn with_subtype_label(mut self, label: impl Into<String>) -> Self {
        self.content_subtype = Some(label.into());
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn with_bundle_id(mut self, bundle_id: impl Into<String>) -> Self {
        self.app_bundle_id = Some(bundle_id.into());
        self
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Parsed coarse type (case-insensitive)
    pub fn content_type(&self) -> ContentType {
        ContentType::parse(&self.content_type)
    }

    /// Parsed subtype; absent or unknown labels resolve to `PlainText`
    pub fn subtype(&self) -> ContentSubtype {
        ContentSubtype::from_label(self.content_subtype.as_deref())
    }

    /// Text shown for the entry and written back on copy
    pub fn text_content(&self) -> &str {
        self.content_data
            .as_deref()
            .or(self.file_path.as_deref())
            .unwrap_or("")
    }

    /// Hash a string using Rust's default hasher
    pub fn hash_string(s: &str) -> String {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish().to_string()
    }
}
