//! live-preview - Render inline fields and inline queries the way a live
//! preview editor shows them.
//!
//! # Usage
//!
//! ```bash
//! live-preview note.md
//! live-preview --cursor 120 note.md
//! live-preview --index pages.json --annotate note.md
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;

use live_preview::config::{
    FieldDisplayMode, Settings, clear_settings, global_config_path, load_layered_settings,
    local_override_path, parse_flag_tokens, save_settings,
};
use live_preview::editor::EditorBuffer;
use live_preview::perf;
use live_preview::preview::{LivePreview, ViewState};
use live_preview::query::{MemoryIndex, Page};
use live_preview::ui::paint;

/// Selection-aware preview of inline fields and inline queries
#[derive(Parser, Debug)]
#[command(name = "live-preview", version, about, long_about = None)]
struct Cli {
    /// Markdown file to preview
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Byte offset of the caret (defaults to the end of the file)
    #[arg(long, value_name = "OFFSET")]
    cursor: Option<usize>,

    /// JSON page index: {"path": {"field": value}}
    #[arg(long, value_name = "PATH")]
    index: Option<PathBuf>,

    /// Number of visible lines
    #[arg(long, default_value_t = 200)]
    height: usize,

    /// Prefix marking inline code as an expression query
    #[arg(long, value_name = "PREFIX")]
    query_prefix: Option<String>,

    /// Prefix marking inline code as a script query
    #[arg(long, value_name = "PREFIX")]
    js_query_prefix: Option<String>,

    /// Do not evaluate expression queries
    #[arg(long)]
    no_inline_queries: bool,

    /// Evaluate script queries
    #[arg(long)]
    inline_js: bool,

    /// Layout class for field widgets
    #[arg(long, value_enum)]
    field_mode: Option<FieldDisplayMode>,

    /// Show the file as in source mode (styling marks only)
    #[arg(long)]
    source_mode: bool,

    /// Enable performance logging
    #[arg(long)]
    perf: bool,

    /// Write reconciliation events to a file
    #[arg(long, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Save the effective settings as the global defaults
    #[arg(long)]
    save: bool,

    /// Clear saved global settings
    #[arg(long)]
    clear: bool,

    /// Mark widgets and styled text in the output
    #[arg(long)]
    annotate: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let overrides = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_settings(&global_path)?;
    }
    let loaded = if cli.clear {
        Settings::default()
    } else {
        load_layered_settings(&global_path, &local_path)?
    };
    let settings = overrides.apply(&loaded);
    if cli.save {
        save_settings(&global_path, &settings)?;
    }

    perf::set_enabled(overrides.perf);
    let render_debug_log_path = overrides
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os("LIVE_PREVIEW_RENDER_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        tracing::warn!(
            path = %render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            %err,
            "failed to initialize render debug log"
        );
    }

    let text = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("File not found: {}", cli.file.display()))?;

    let mut buffer = EditorBuffer::from_text(&text)
        .with_file_path(cli.file.clone())
        .with_viewport_height(cli.height)
        .with_live_preview(!overrides.source_mode);
    buffer.move_to(cli.cursor.unwrap_or(text.len()));

    let mut index = match &cli.index {
        Some(path) => MemoryIndex::load(path)?,
        None => MemoryIndex::new(),
    };
    index.insert(Page::from_document(
        cli.file.clone(),
        buffer.document(),
        buffer.syntax(),
    ));
    index.mark_initialized();

    let mut preview = LivePreview::new(Rc::new(index)).with_settings(settings);
    let view = ViewState::of(&buffer);
    let delta = preview.build(&view);
    preview.run_pending_tasks();
    tracing::debug!(%delta, "initial build");

    let lines = paint(
        buffer.document(),
        &view.visible,
        &[preview.fields(), preview.queries()],
    );
    let mut out = std::io::stdout().lock();
    for line in lines {
        let rendered = if cli.annotate {
            line.annotated()
        } else {
            line.text()
        };
        writeln!(out, "{rendered}").context("Failed to write output")?;
    }

    if perf::is_enabled() {
        for timing in perf::summary() {
            eprintln!(
                "[perf] {:<20} calls={:<4} total={:.3}ms max={:.3}ms",
                timing.name, timing.calls, timing.total_ms, timing.max_ms
            );
        }
    }
    Ok(())
}
