//! Shared demo captures for the replay tool, tests and benchmarks.

pub struct DemoCapture {
    pub content: &'static str,
    /// "text", "image" or "file", in whatever case the collaborator sent
    pub content_type: &'static str,
    pub subtype: Option<&'static str>,
    pub metadata: Option<&'static str>,
    pub source_app: &'static str,
    pub bundle_id: &'static str,
    /// Relative offset in seconds from "now" (negative means in the past)
    pub offset: i64,
}

pub const DEMO_CAPTURES: &[DemoCapture] = &[
    // --- Older items ---
    DemoCapture {
        content: "Apartment walkthrough notes: 437 Riverside Dr #12, hardwood floors, south-facing windows, in-unit washer/dryer, $2850/mo",
        content_type: "text",
        subtype: Some("plain_text"),
        metadata: None,
        source_app: "Notes",
        bundle_id: "com.apple.Notes",
        offset: -180 * 24 * 60 * 60, // 180 days ago
    },
    DemoCapture {
        content: "https://github.com/rust-lang/rust/issues?q=is%3Aopen&label=A-diagnostics",
        content_type: "text",
        subtype: Some("url"),
        metadata: Some(r#"{"url_parts":{"protocol":"https","host":"github.com","path":"/rust-lang/rust/issues","query_params":[["q","is:open"],["label","A-diagnostics"]]}}"#),
        source_app: "Safari",
        bundle_id: "com.apple.Safari",
        offset: -7200,
    },
    DemoCapture {
        content: "docs.rs/tokio/latest/tokio/macro.select.html",
        content_type: "text",
        subtype: Some("url"),
        metadata: None,
        source_app: "Safari",
        bundle_id: "com.apple.Safari",
        offset: -7000,
    },
    DemoCapture {
        content: "192.168.1.42",
        content_type: "text",
        subtype: Some("ip_address"),
        metadata: None,
        source_app: "Terminal",
        bundle_id: "com.apple.Terminal",
        offset: -5400,
    },
    DemoCapture {
        content: "2001:db8::ff00:42:8329",
        content_type: "text",
        subtype: Some("ip_address"),
        metadata: None,
        source_app: "Terminal",
        bundle_id: "com.apple.Terminal",
        offset: -5300,
    },
    DemoCapture {
        content: "marcus@riverside-realty.com",
        content_type: "text",
        subtype: Some("email"),
        metadata: None,
        source_app: "Mail",
        bundle_id: "com.apple.mail",
        offset: -4000,
    },
    DemoCapture {
        content: "#FF5733",
        content_type: "text",
        subtype: Some("color"),
        metadata: Some(r##"{"color_formats":{"hex":"#FF5733","rgb":"rgb(255, 87, 51)"}}"##),
        source_app: "Figma",
        bundle_id: "com.figma.Desktop",
        offset: -3600,
    },
    DemoCapture {
        content: "rgba(0, 122, 255, 0.5)",
        content_type: "text",
        subtype: Some("color"),
        metadata: Some("not json"),
        source_app: "Figma",
        bundle_id: "com.figma.Desktop",
        offset: -3500,
    },
    DemoCapture {
        content: "1700000000",
        content_type: "text",
        subtype: Some("timestamp"),
        metadata: None,
        source_app: "Terminal",
        bundle_id: "com.apple.Terminal",
        offset: -3000,
    },
    DemoCapture {
        content: "2024-03-15 09:30:00",
        content_type: "text",
        subtype: Some("timestamp"),
        metadata: Some(r#"{"timestamp_formats":{"unix_ms":"oops"}}"#),
        source_app: "Calendar",
        bundle_id: "com.apple.iCal",
        offset: -2900,
    },
    // --- Recent work ---
    DemoCapture {
        content: "fn derive_key(salt: &[u8], iterations: u32) -> [u8; 32] { todo!() }",
        content_type: "text",
        subtype: Some("code"),
        metadata: Some(r#"{"detected_language":"rust"}"#),
        source_app: "Zed",
        bundle_id: "dev.zed.Zed",
        offset: -1800,
    },
    DemoCapture {
        content: "cargo bench --bench view_benchmark -- --save-baseline main",
        content_type: "text",
        subtype: Some("command"),
        metadata: None,
        source_app: "Terminal",
        bundle_id: "com.apple.Terminal",
        offset: -1700,
    },
    DemoCapture {
        content: r#"{"name": "purr", "version": "0.1.0", "private": true}"#,
        content_type: "text",
        subtype: Some("json"),
        metadata: None,
        source_app: "Zed",
        bundle_id: "dev.zed.Zed",
        offset: -1600,
    },
    DemoCapture {
        content: "## Release notes\n\n- Faster history view\n- Quick-jump digits",
        content_type: "text",
        subtype: Some("markdown"),
        metadata: None,
        source_app: "Notes",
        bundle_id: "com.apple.Notes",
        offset: -1200,
    },
    DemoCapture {
        content: "aGVsbG8gd29ybGQ=",
        content_type: "text",
        subtype: Some("base64"),
        metadata: Some(r#"{"base64_metadata":{"estimated_original_size":11,"encoded_size":16,"content_hint":"text"}}"#),
        source_app: "Terminal",
        bundle_id: "com.apple.Terminal",
        offset: -900,
    },
    DemoCapture {
        content: "imgs/riverside_floorplan.png",
        content_type: "Image",
        subtype: None,
        metadata: Some(r#"{"image_metadata":{"width":1920,"height":1080,"file_size":482113,"format":"png"}}"#),
        source_app: "Preview",
        bundle_id: "com.apple.Preview",
        offset: -600,
    },
    DemoCapture {
        content: "/Users/demo/Documents/lease_agreement.pdf",
        content_type: "file",
        subtype: None,
        metadata: None,
        source_app: "Finder",
        bundle_id: "com.apple.finder",
        offset: -300,
    },
    DemoCapture {
        content: "Riverside Park picnic: Saturday 11am by the 91st St garden",
        content_type: "TEXT",
        subtype: None,
        metadata: None,
        source_app: "Messages",
        bundle_id: "com.apple.MobileSMS",
        offset: -60,
    },
];
