//! Replay a capture log through the engine and print the resulting list.
//!
//! Each line of the capture file is one JSON entry as emitted by the clipboard
//! monitor. Lines that don't parse are skipped with a warning.
//!
//! Usage:
//!     cargo run --bin replay -- --captures captures.jsonl [--filter text:url] [--search foo]
//!
//! Set `RUST_LOG=purr_view=debug` to see merge and metadata diagnostics.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::BoxStream;
use futures::StreamExt;
use purr_view::{
    ClipboardService, EngineConfig, Entry, HistoryEngine, HistoryError, Renderer, VisibleRow,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "replay", about = "Replay clipboard captures through the history engine")]
struct Args {
    /// JSON-lines file of captured entries, oldest first
    #[arg(long)]
    captures: PathBuf,

    /// Type filter: all, text, image, file, or type:subtype
    #[arg(long, default_value = "all")]
    filter: String,

    #[arg(long, default_value = "")]
    search: String,

    /// Scroll offset in pixels
    #[arg(long, default_value_t = 0.0)]
    scroll_top: f64,

    /// Viewport height in pixels (defaults to the configured initial height)
    #[arg(long)]
    height: Option<f64>,

    /// Show quick-jump digits as if the modifier key were held
    #[arg(long)]
    quick_jump: bool,

    /// Print history statistics as JSON after the list
    #[arg(long)]
    stats: bool,

    /// Engine configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Serves a fixed capture log; commands only log what they would do.
struct ReplayService {
    captures: Vec<Entry>,
}

impl ReplayService {
    fn from_jsonl(content: &str) -> Self {
        let captures = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(number, line)| match serde_json::from_str::<Entry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(line = number + 1, error = %e, "Skipping malformed capture");
                    None
                }
            })
            .collect();
        Self { captures }
    }
}

#[async_trait::async_trait]
impl ClipboardService for ReplayService {
    fn subscribe_captures(&self) -> BoxStream<'static, Entry> {
        futures::stream::iter(self.captures.clone()).boxed()
    }

    async fn fetch_history(&self) -> Result<Vec<Entry>, HistoryError> {
        Ok(Vec::new())
    }

    async fn toggle_favorite(&self, id: &str) -> Result<bool, HistoryError> {
        tracing::info!(id, "toggle_favorite");
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<(), HistoryError> {
        tracing::info!(id, "delete");
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), HistoryError> {
        tracing::info!("clear_all");
        Ok(())
    }

    async fn copy_to_clipboard(&self, content: &str) -> Result<(), HistoryError> {
        tracing::info!(bytes = content.len(), "copy_to_clipboard");
        Ok(())
    }

    async fn paste_entry(&self, entry: &Entry) -> Result<(), HistoryError> {
        tracing::info!(id = %entry.id, "paste_entry");
        Ok(())
    }
}

fn summary(renderer: &Renderer) -> String {
    match renderer {
        Renderer::Image(preview) => match preview.dimensions() {
            Some((w, h)) => format!("{} ({}x{})", preview.file_path.as_deref().unwrap_or("?"), w, h),
            None => preview.file_path.clone().unwrap_or_default(),
        },
        Renderer::File(preview) => preview.display().to_string(),
        Renderer::Url(view) => match &view.parts {
            Some(parts) => format!("{} [{}]", view.url, parts.host),
            None => view.url.clone(),
        },
        Renderer::IpAddress(view) => format!("{} {:?}", view.address, view.version),
        Renderer::Email(view) => format!("{} valid={}", view.address, view.is_valid),
        Renderer::Color(view) => match view.formats.as_ref().and_then(|f| f.hex.clone()) {
            Some(hex) => format!("{} {}", view.value, hex),
            None => view.value.clone(),
        },
        Renderer::Timestamp(view) => match view.formats.as_ref().and_then(|f| f.iso8601.clone()) {
            Some(iso) => format!("{} -> {}", view.value, iso),
            None => view.value.clone(),
        },
        Renderer::Text(view) => view.body.lines().next().unwrap_or("").chars().take(60).collect(),
    }
}

fn print_row(row: &VisibleRow) {
    let marker = if row.selected { '>' } else { ' ' };
    let digit = row
        .quick_jump_digit
        .map(|d| d.to_string())
        .unwrap_or_else(|| " ".to_string());
    println!(
        "{} {} {:>4} {:<10} x{:<3} {}",
        marker,
        digit,
        row.index,
        row.renderer.kind().as_str(),
        row.entry.copy_count,
        summary(&row.renderer)
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let content = std::fs::read_to_string(&args.captures)
        .with_context(|| format!("Failed to read {}", args.captures.display()))?;
    let service = Arc::new(ReplayService::from_jsonl(&content));

    let mut engine = HistoryEngine::new(config, service);
    engine.refresh().await?;
    let applied = engine.run_captures(CancellationToken::new()).await?;

    engine.set_type_filter(&args.filter);
    engine.set_search_term(args.search.clone());
    if let Some(height) = args.height {
        engine.on_resize(height);
    }
    engine.on_scroll(args.scroll_top);
    let range = engine.settle_viewport();
    engine.set_modifier_held(args.quick_jump);

    let view_len = engine.view().len();
    println!(
        "{} captures, {} entries, {} in view ({}), rows {}..{}",
        applied,
        engine.store().len(),
        view_len,
        engine.type_filter(),
        range.start,
        range.end
    );
    for row in engine.visible_rows() {
        print_row(&row);
    }

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&engine.statistics())?);
    }
    Ok(())
}
