//! Structured entry metadata
//!
//! The collaborator attaches an opaque JSON document whose shape depends on
//! the entry's subtype. Parsing is lenient at every level: each top-level
//! field is read on its own, and inside a field each value is read on its own,
//! so one corrupt value never hides a sibling. A document that is not JSON at
//! all is treated as absent.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::interface::{ContentSubtype, ContentType};

type Object = Map<String, Value>;

fn string_field(obj: &Object, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => {
            tracing::debug!(field = key, value = %other, "Ignoring non-string metadata value");
            None
        }
    }
}

fn u64_field(obj: &Object, key: &str) -> Option<u64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn i64_field(obj: &Object, key: &str) -> Option<i64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PER-FIELD SHAPES
// ─────────────────────────────────────────────────────────────────────────────

/// Dimensions and size of a captured image
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ImageMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub file_size: Option<u64>,
    pub format: Option<String>,
}

impl ImageMetadata {
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let parsed = Self {
            width: u64_field(obj, "width").and_then(|w| u32::try_from(w).ok()),
            height: u64_field(obj, "height").and_then(|h| u32::try_from(h).ok()),
            file_size: u64_field(obj, "file_size"),
            format: string_field(obj, "format"),
        };
        (parsed != Self::default()).then_some(parsed)
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }
}

/// Decomposed URL
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UrlParts {
    pub protocol: String,
    pub host: String,
    pub path: String,
    pub query_params: Vec<(String, String)>,
}

impl UrlParts {
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        // Host is the one part a URL view cannot do without.
        let host = string_field(obj, "host")?;
        let query_params = match obj.get("query_params") {
            Some(Value::Array(items)) => items.iter().filter_map(query_pair).collect(),
            _ => Vec::new(),
        };
        Some(Self {
            protocol: string_field(obj, "protocol").unwrap_or_default(),
            host,
            path: string_field(obj, "path").unwrap_or_default(),
            query_params,
        })
    }
}

/// Accepts `["k", "v"]` and `{"key": "k", "value": "v"}`
fn query_pair(value: &Value) -> Option<(String, String)> {
    match value {
        Value::Array(pair) if pair.len() == 2 => {
            Some((pair[0].as_str()?.to_string(), pair[1].as_str()?.to_string()))
        }
        Value::Object(obj) => Some((string_field(obj, "key")?, string_field(obj, "value")?)),
        _ => None,
    }
}

/// Alternative notations of one color
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ColorFormats {
    pub hex: Option<String>,
    pub rgb: Option<String>,
    pub rgba: Option<String>,
    pub hsl: Option<String>,
}

impl ColorFormats {
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let parsed = Self {
            hex: string_field(obj, "hex"),
            rgb: string_field(obj, "rgb"),
            rgba: string_field(obj, "rgba"),
            hsl: string_field(obj, "hsl"),
        };
        (!parsed.is_empty()).then_some(parsed)
    }

    pub fn is_empty(&self) -> bool {
        self.hex.is_none() && self.rgb.is_none() && self.rgba.is_none() && self.hsl.is_none()
    }

    /// Fill every missing notation from `other`, keeping present ones.
    pub fn fill_from(&mut self, other: ColorFormats) {
        self.hex = self.hex.take().or(other.hex);
        self.rgb = self.rgb.take().or(other.rgb);
        self.rgba = self.rgba.take().or(other.rgba);
        self.hsl = self.hsl.take().or(other.hsl);
    }
}

/// Alternative notations of one point in time
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TimestampFormats {
    pub unix_ms: Option<i64>,
    pub iso8601: Option<String>,
    pub date_string: Option<String>,
}

impl TimestampFormats {
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let parsed = Self {
            unix_ms: i64_field(obj, "unix_ms"),
            iso8601: string_field(obj, "iso8601"),
            date_string: string_field(obj, "date_string"),
        };
        (!parsed.is_empty()).then_some(parsed)
    }

    pub fn is_empty(&self) -> bool {
        self.unix_ms.is_none() && self.iso8601.is_none() && self.date_string.is_none()
    }

    pub fn fill_from(&mut self, other: TimestampFormats) {
        self.unix_ms = self.unix_ms.or(other.unix_ms);
        self.iso8601 = self.iso8601.take().or(other.iso8601);
        self.date_string = self.date_string.take().or(other.date_string);
    }
}

/// Size estimate for base64 payloads
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Base64Metadata {
    pub estimated_original_size: Option<u64>,
    pub encoded_size: Option<u64>,
    pub content_hint: Option<String>,
}

impl Base64Metadata {
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let parsed = Self {
            estimated_original_size: u64_field(obj, "estimated_original_size"),
            encoded_size: u64_field(obj, "encoded_size"),
            content_hint: string_field(obj, "content_hint"),
        };
        (parsed != Self::default()).then_some(parsed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DOCUMENT
// ─────────────────────────────────────────────────────────────────────────────

/// Every structured field the collaborator may attach, each independently
/// optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EntryMetadata {
    pub image: Option<ImageMetadata>,
    pub url_parts: Option<UrlParts>,
    pub color_formats: Option<ColorFormats>,
    pub timestamp_formats: Option<TimestampFormats>,
    pub detected_language: Option<String>,
    pub base64: Option<Base64Metadata>,
}

impl EntryMetadata {
    /// Parse the raw metadata document. Never fails; anything unreadable is
    /// logged and dropped.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };

        let doc = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(obj)) => obj,
            Ok(other) => {
                tracing::debug!(kind = json_kind(&other), "Metadata is not a JSON object, ignoring");
                return Self::default();
            }
            Err(e) => {
                tracing::debug!(error = %e, "Metadata is not valid JSON, ignoring");
                return Self::default();
            }
        };

        Self {
            image: doc.get("image_metadata").and_then(ImageMetadata::from_value),
            url_parts: doc.get("url_parts").and_then(UrlParts::from_value),
            color_formats: doc.get("color_formats").and_then(ColorFormats::from_value),
            timestamp_formats: doc.get("timestamp_formats").and_then(TimestampFormats::from_value),
            detected_language: string_field(&doc, "detected_language"),
            base64: doc.get("base64_metadata").and_then(Base64Metadata::from_value),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Narrow to the one variant relevant for an entry of this type/subtype.
    pub fn into_subtype(self, content_type: ContentType, subtype: ContentSubtype) -> SubtypeMetadata {
        let picked = match (content_type, subtype) {
            (ContentType::Image, _) => self.image.map(SubtypeMetadata::Image),
            (ContentType::File, _) => None,
            (_, ContentSubtype::Url) => self.url_parts.map(SubtypeMetadata::Url),
            (_, ContentSubtype::Color) => self.color_formats.map(SubtypeMetadata::Color),
            (_, ContentSubtype::Timestamp) => self.timestamp_formats.map(SubtypeMetadata::Timestamp),
            (_, ContentSubtype::Code) => self
                .detected_language
                .map(|language| SubtypeMetadata::Code { language }),
            _ => self.base64.map(SubtypeMetadata::Base64),
        };
        picked.unwrap_or(SubtypeMetadata::None)
    }
}

/// Metadata as a tagged union keyed by subtype.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub enum SubtypeMetadata {
    Image(ImageMetadata),
    Url(UrlParts),
    Color(ColorFormats),
    Timestamp(TimestampFormats),
    Code { language: String },
    Base64(Base64Metadata),
    #[default]
    None,
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
