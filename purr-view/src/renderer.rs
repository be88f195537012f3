//! Renderer dispatch
//!
//! `select_renderer` maps an entry to exactly one presentation strategy.
//! Precedence: image type, then file type, then the text subtype. Each
//! structured strategy prefers the collaborator's pre-computed metadata and
//! fills whatever is missing from `content_data`. Nothing here can fail: an
//! unknown subtype or unreadable metadata lands on the generic text view.

use std::net::IpAddr;

use serde::Serialize;

use crate::content_detection;
use crate::interface::{ContentSubtype, ContentType, RendererKind};
use crate::metadata::{
    Base64Metadata, ColorFormats, EntryMetadata, ImageMetadata, SubtypeMetadata, TimestampFormats, UrlParts,
};
use crate::models::Entry;

/// Where a structured view's fields came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Metadata,
    Derived,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagePreview {
    pub file_path: Option<String>,
    pub metadata: Option<ImageMetadata>,
}

impl ImagePreview {
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.metadata.as_ref()?.dimensions()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilePreview {
    pub path: Option<String>,
    pub data: Option<String>,
}

impl FilePreview {
    /// Path if known, otherwise the raw payload
    pub fn display(&self) -> &str {
        self.path.as_deref().or(self.data.as_deref()).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlView {
    pub url: String,
    pub parts: Option<UrlParts>,
    pub source: FieldSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IpVersion {
    V4,
    V6,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpView {
    pub address: String,
    pub version: Option<IpVersion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailView {
    pub address: String,
    pub local_part: Option<String>,
    pub domain: Option<String>,
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorView {
    pub value: String,
    pub formats: Option<ColorFormats>,
    /// 0xRRGGBBAA swatch, when the value parses
    pub rgba: Option<u32>,
    pub source: FieldSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimestampView {
    pub value: String,
    pub formats: Option<TimestampFormats>,
    pub source: FieldSource,
}

/// Generic text body with a formatting hint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextView {
    pub hint: ContentSubtype,
    /// Raw subtype label as sent by the collaborator, kept for unknown labels
    pub label: Option<String>,
    pub language: Option<String>,
    /// Size estimate when the body is a base64 payload
    pub base64: Option<Base64Metadata>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Renderer {
    Image(ImagePreview),
    File(FilePreview),
    Url(UrlView),
    IpAddress(IpView),
    Email(EmailView),
    Color(ColorView),
    Timestamp(TimestampView),
    Text(TextView),
}

impl Renderer {
    pub fn kind(&self) -> RendererKind {
        match self {
            Renderer::Image(_) => RendererKind::Image,
            Renderer::File(_) => RendererKind::File,
            Renderer::Url(_) => RendererKind::Url,
            Renderer::IpAddress(_) => RendererKind::IpAddress,
            Renderer::Email(_) => RendererKind::Email,
            Renderer::Color(_) => RendererKind::Color,
            Renderer::Timestamp(_) => RendererKind::Timestamp,
            Renderer::Text(_) => RendererKind::Text,
        }
    }
}

/// Pick the presentation strategy for one entry
pub fn select_renderer(entry: &Entry) -> Renderer {
    let content_type = entry.content_type();
    let subtype = entry.subtype();
    let structured =
        EntryMetadata::parse(entry.metadata.as_deref()).into_subtype(content_type, subtype);
    let data = entry.content_data.clone().unwrap_or_default();

    match content_type {
        ContentType::Image => {
            let metadata = match structured {
                SubtypeMetadata::Image(image) => Some(image),
                _ => None,
            };
            return Renderer::Image(ImagePreview {
                file_path: entry.file_path.clone().or_else(|| entry.content_data.clone()),
                metadata,
            });
        }
        ContentType::File => {
            return Renderer::File(FilePreview {
                path: entry.file_path.clone(),
                data: entry.content_data.clone(),
            })
        }
        ContentType::Text | ContentType::Unknown => {}
    }

    match (subtype, structured) {
        (ContentSubtype::Url, SubtypeMetadata::Url(parts)) => Renderer::Url(url_view(data, Some(parts))),
        (ContentSubtype::Url, _) => Renderer::Url(url_view(data, None)),
        (ContentSubtype::IpAddress, _) => Renderer::IpAddress(ip_view(data)),
        (ContentSubtype::Email, _) => Renderer::Email(email_view(data)),
        (ContentSubtype::Color, SubtypeMetadata::Color(formats)) => {
            Renderer::Color(color_view(data, Some(formats)))
        }
        (ContentSubtype::Color, _) => Renderer::Color(color_view(data, None)),
        (ContentSubtype::Timestamp, SubtypeMetadata::Timestamp(formats)) => {
            Renderer::Timestamp(timestamp_view(data, Some(formats)))
        }
        (ContentSubtype::Timestamp, _) => Renderer::Timestamp(timestamp_view(data, None)),
        (
            hint @ (ContentSubtype::PlainText
            | ContentSubtype::Code
            | ContentSubtype::Command
            | ContentSubtype::Json
            | ContentSubtype::Markdown),
            structured,
        ) => {
            let (language, base64) = match structured {
                SubtypeMetadata::Code { language } => (Some(language), None),
                SubtypeMetadata::Base64(base64) => (None, Some(base64)),
                _ => (None, None),
            };
            Renderer::Text(TextView {
                hint,
                label: entry.content_subtype.clone(),
                language,
                base64,
                body: data,
            })
        }
    }
}

fn url_view(url: String, parts: Option<UrlParts>) -> UrlView {
    let (parts, source) = match parts {
        Some(parts) => (Some(parts), FieldSource::Metadata),
        None => match content_detection::derive_url_parts(&url) {
            Some(parts) => (Some(parts), FieldSource::Derived),
            None => (None, FieldSource::Unavailable),
        },
    };
    UrlView { url, parts, source }
}

fn ip_view(address: String) -> IpView {
    let version = content_detection::parse_ip(&address).map(|ip| match ip {
        IpAddr::V4(_) => IpVersion::V4,
        IpAddr::V6(_) => IpVersion::V6,
    });
    IpView { address, version }
}

fn email_view(address: String) -> EmailView {
    match content_detection::split_email(&address) {
        Some((local, domain)) => {
            let is_valid = content_detection::is_email(&format!("{}@{}", local, domain));
            EmailView { address, local_part: Some(local), domain: Some(domain), is_valid }
        }
        None => EmailView { address, local_part: None, domain: None, is_valid: false },
    }
}

fn color_view(value: String, from_metadata: Option<ColorFormats>) -> ColorView {
    let derived = content_detection::derive_color_formats(&value);
    let (formats, source) = match (from_metadata, derived) {
        (Some(mut formats), Some(derived)) => {
            formats.fill_from(derived);
            (Some(formats), FieldSource::Metadata)
        }
        (Some(formats), None) => (Some(formats), FieldSource::Metadata),
        (None, Some(derived)) => (Some(derived), FieldSource::Derived),
        (None, None) => (None, FieldSource::Unavailable),
    };

    // Swatch follows the raw value first, then any notation we ended up with.
    let rgba = content_detection::parse_color_to_rgba(&value).or_else(|| {
        let formats = formats.as_ref()?;
        [&formats.hex, &formats.rgba, &formats.rgb, &formats.hsl]
            .into_iter()
            .flatten()
            .find_map(|s| content_detection::parse_color_to_rgba(s))
    });

    ColorView { value, formats, rgba, source }
}

fn timestamp_view(value: String, from_metadata: Option<TimestampFormats>) -> TimestampView {
    let derived = content_detection::derive_timestamp_formats(&value);
    let (formats, source) = match (from_metadata, derived) {
        (Some(mut formats), derived) => {
            if let Some(derived) = derived {
                formats.fill_from(derived);
            }
            if formats.iso8601.is_none() {
                formats.iso8601 = formats.unix_ms.and_then(content_detection::iso8601_from_millis);
            }
            (Some(formats), FieldSource::Metadata)
        }
        (None, Some(derived)) => (Some(derived), FieldSource::Derived),
        (None, None) => (None, FieldSource::Unavailable),
    };
    TimestampView { value, formats, source }
}
