//! Fallback field derivation from raw content
//!
//! Used by the renderers when the collaborator's pre-computed metadata is
//! absent or unreadable. Every function here is total: unrecognised input
//! yields `None`, never an error.

use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::metadata::{ColorFormats, TimestampFormats, UrlParts};

/// `YYYY-MM-DD` or `YYYY/MM/DD`, optionally followed by `HH:MM[:SS]`
static DATE_STRING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})[-/](\d{2})[-/](\d{2})(?:\s+(\d{2}):(\d{2})(?::(\d{2}))?)?$").unwrap()
});

/// Bare domain such as `example.com/path`
static BARE_DOMAIN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]{0,61}[a-zA-Z0-9]?(\.[a-zA-Z0-9-]+)*\.[a-zA-Z]{2,}(/\S*)?$").unwrap()
});

/// Unix seconds accepted as timestamps (2000-01-01 .. 2100-01-01)
const UNIX_SECONDS_RANGE: std::ops::Range<i64> = 946_684_800..4_102_444_800;

/// Unix milliseconds accepted as timestamps (2000-01-01 .. 2200-01-01)
const UNIX_MILLIS_RANGE: std::ops::Range<i64> = 946_684_800_000..7_258_118_400_000;

// ─────────────────────────────────────────────────────────────────────────────
// COLORS
// ─────────────────────────────────────────────────────────────────────────────

/// Only explicit notations count as colors, not arbitrary words like "red"
fn looks_like_color(trimmed: &str) -> bool {
    let lower = trimmed.to_lowercase();
    trimmed.starts_with('#') || lower.starts_with("rgb") || lower.starts_with("hsl")
}

/// Parse a color string to RGBA u32 (0xRRGGBBAA format)
/// Returns None if the string is not a valid color
pub fn parse_color_to_rgba(text: &str) -> Option<u32> {
    let [r, g, b, a] = parse_color_channels(text)?;
    Some(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | (a as u32))
}

fn parse_color_channels(text: &str) -> Option<[u8; 4]> {
    let trimmed = text.trim();
    if !looks_like_color(trimmed) {
        return None;
    }
    let color = csscolorparser::parse(trimmed).ok()?;
    Some(color.to_rgba8())
}

/// Derive hex / rgb / rgba / hsl notations from any supported color string
pub fn derive_color_formats(text: &str) -> Option<ColorFormats> {
    let [r, g, b, a] = parse_color_channels(text)?;
    let alpha = a as f64 / 255.0;
    let (h, s, l) = rgb_to_hsl(r, g, b);

    let hex = if a == 255 {
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    } else {
        format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    };

    Some(ColorFormats {
        hex: Some(hex),
        rgb: Some(format!("rgb({}, {}, {})", r, g, b)),
        rgba: Some(format!("rgba({}, {}, {}, {})", r, g, b, trim_float(alpha))),
        hsl: Some(format!("hsl({}, {}%, {}%)", h, s, l)),
    })
}

/// Integer HSL (degrees, percent, percent)
fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (u32, u32, u32) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let delta = max - min;

    if delta == 0.0 {
        return (0, 0, (l * 100.0).round() as u32);
    }

    let s = delta / (1.0 - (2.0 * l - 1.0).abs());
    let h = if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    (
        (h.round() as u32) % 360,
        (s * 100.0).round() as u32,
        (l * 100.0).round() as u32,
    )
}

/// `1.0` -> "1", `0.5` -> "0.5", two decimals at most
fn trim_float(value: f64) -> String {
    let s = format!("{:.2}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// URLS
// ─────────────────────────────────────────────────────────────────────────────

/// Decompose a URL. Bare domains ("example.com/docs") are read as https.
pub fn derive_url_parts(text: &str) -> Option<UrlParts> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return None;
    }

    let parsed = match url::Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) if BARE_DOMAIN_REGEX.is_match(trimmed) => {
            url::Url::parse(&format!("https://{}", trimmed)).ok()?
        }
        Err(_) => return None,
    };

    let host = parsed.host_str()?.to_string();
    Some(UrlParts {
        protocol: parsed.scheme().to_string(),
        host,
        path: parsed.path().to_string(),
        query_params: parsed
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// TIMESTAMPS
// ─────────────────────────────────────────────────────────────────────────────

/// Derive all timestamp notations from unix seconds/millis, RFC 3339 or a
/// plain date string. Naive times are taken as UTC.
pub fn derive_timestamp_formats(text: &str) -> Option<TimestampFormats> {
    let trimmed = text.trim();
    let instant = parse_instant(trimmed)?;
    Some(TimestampFormats {
        unix_ms: Some(instant.timestamp_millis()),
        iso8601: Some(instant.to_rfc3339_opts(SecondsFormat::Millis, true)),
        date_string: Some(instant.format("%Y-%m-%d %H:%M:%S").to_string()),
    })
}

fn parse_instant(trimmed: &str) -> Option<DateTime<Utc>> {
    if let Ok(num) = trimmed.parse::<i64>() {
        let millis = if UNIX_SECONDS_RANGE.contains(&num) {
            num * 1000
        } else if UNIX_MILLIS_RANGE.contains(&num) {
            num
        } else {
            return None;
        };
        return DateTime::from_timestamp_millis(millis);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    let caps = DATE_STRING_REGEX.captures(trimmed)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let date = NaiveDate::from_ymd_opt(num(1)? as i32, num(2)?, num(3)?)?;
    let time = date.and_hms_opt(num(4).unwrap_or(0), num(5).unwrap_or(0), num(6).unwrap_or(0))?;
    Some(Utc.from_utc_datetime(&time))
}

/// Render a unix-millisecond value as RFC 3339, used when metadata only
/// carries the numeric form.
pub fn iso8601_from_millis(unix_ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(unix_ms).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

// ─────────────────────────────────────────────────────────────────────────────
// ADDRESSES
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_ip(text: &str) -> Option<IpAddr> {
    text.trim().parse().ok()
}

/// Check if a string is an email address
pub fn is_email(text: &str) -> bool {
    validator::validate_email(text.trim())
}

/// Split `local@domain`, tolerating a `mailto:` prefix
pub fn split_email(text: &str) -> Option<(String, String)> {
    let trimmed = text.trim();
    let address = trimmed
        .get(..7)
        .filter(|p| p.eq_ignore_ascii_case("mailto:"))
        .map(|_| &trimmed[7..])
        .unwrap_or(trimmed);
    let address = address.split('?').next().unwrap_or(address);
    let (local, domain) = address.rsplit_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some((local.to_string(), domain.to_string()))
}
