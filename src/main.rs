// SPDX-License-Identifier: MIT
//
// n-chg — show what changed between two versions of a file.
//
// Wires the n-changes library into a one-shot command:
//
//   A (writable) ─┐
//                 ├→ compare → tracker + overlays on A → rotate ×N → print
//   B (read-only)─┘
//
// Output is A's text with its change overlays painted in (ANSI colours on a
// terminal, bracket markup otherwise), or a list of the changed regions.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use n_changes::buffer::Buffer;
use n_changes::category::{Category, CategoryTable};
use n_changes::config::ChangesConfig;
use n_changes::diff::Granularity;
use n_changes::document::Document;
use n_changes::overlay::{Overlay, OverlayTag};
use n_changes::position::Span;
use n_changes::store::ChangeRegion;

// ─── Command line ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Parser)]
#[command(
    name = "n-chg",
    version,
    about = "Highlight the changes in A relative to B"
)]
struct Cli {
    /// The file whose changes are shown.
    a: PathBuf,

    /// The file A is compared against (never modified).
    b: PathBuf,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Compare character by character instead of line by line.
    #[arg(long)]
    chars: bool,

    /// Keep whole changed lines instead of narrowing them to the changed chars.
    #[arg(long)]
    no_refine: bool,

    /// Print the changed regions instead of the text.
    #[arg(short, long)]
    list: bool,

    /// When to use ANSI colours.
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Age the changes this many times before printing.
    #[arg(long, default_value_t = 0)]
    rotate: usize,
}

// ─── Painting ───────────────────────────────────────────────────────────────

const RESET: &str = "\x1b[0m";

/// SGR colours for `Aged(1)`, `Aged(2)`, …; older slots reuse the last one.
const AGED_SGR: [&str; 6] = [
    "\x1b[33m", "\x1b[35m", "\x1b[34m", "\x1b[31m", "\x1b[32m", "\x1b[36m",
];

fn sgr_for(category: Category) -> &'static str {
    match category {
        Category::New => "\x1b[1;7m",
        Category::Deleted => "\x1b[4;31m",
        Category::Aged(n) => AGED_SGR[n.saturating_sub(1).min(AGED_SGR.len() - 1)],
    }
}

fn brackets_for(category: Category) -> (String, String) {
    match category {
        Category::New => ("{+".into(), "+}".into()),
        Category::Deleted => ("[-".into(), "-]".into()),
        Category::Aged(n) => (format!("{{{n}:"), "}".into()),
    }
}

/// A's text with every change overlay wrapped in markup.
fn paint(buffer: &Buffer, overlays: &[Overlay], ansi: bool) -> String {
    let mut out = String::with_capacity(buffer.len_chars() * 2);
    let mut pos = 0;
    for overlay in overlays {
        let OverlayTag::Change(category) = overlay.tag else {
            continue;
        };
        let span = overlay.span.clamp_to(buffer.len_chars());
        if span.start < pos || span.is_empty() {
            continue;
        }
        out.push_str(&buffer.text(Span::new(pos, span.start)).unwrap_or_default());
        let body = buffer.text(span).unwrap_or_default();
        if ansi {
            // Keep line breaks outside the escape so colour never bleeds.
            let trimmed = body.strip_suffix('\n');
            out.push_str(sgr_for(category));
            out.push_str(trimmed.unwrap_or(&body));
            out.push_str(RESET);
            if trimmed.is_some() {
                out.push('\n');
            }
        } else {
            let (open, close) = brackets_for(category);
            out.push_str(&open);
            out.push_str(&body);
            out.push_str(&close);
        }
        pos = span.end;
    }
    out.push_str(
        &buffer
            .text(Span::new(pos, buffer.len_chars()))
            .unwrap_or_default(),
    );
    out
}

/// One `line:col-line:col  category  style` row per region, 1-based.
fn region_list(buffer: &Buffer, regions: &[ChangeRegion], table: &CategoryTable) -> String {
    let mut out = String::new();
    for region in regions {
        let (Some(start), Some(end)) = (
            buffer.char_idx_to_pos(region.span.start),
            buffer.char_idx_to_pos(region.span.end),
        ) else {
            continue;
        };
        let style = table
            .style_for(region.category)
            .map_or("-", |style| style.as_str());
        let _ = writeln!(
            out,
            "{}:{}-{}:{}  {}  {}",
            start.line + 1,
            start.col + 1,
            end.line + 1,
            end.col + 1,
            region.category,
            style,
        );
    }
    out
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn load_config(cli: &Cli) -> Result<ChangesConfig> {
    let mut config = match &cli.config {
        Some(path) => ChangesConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ChangesConfig::default(),
    };
    if cli.chars {
        config.compare.granularity = Granularity::Chars;
    }
    if cli.no_refine {
        config.compare.refine = false;
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let settings = Arc::new(config.settings());

    let mut doc = Document::open(&cli.a, Arc::clone(&settings))
        .with_context(|| format!("failed to open {}", cli.a.display()))?;
    let summary = doc
        .compare_with_file(&cli.b)
        .with_context(|| format!("failed to compare against {}", cli.b.display()))?;
    eprintln!("{summary}");

    for _ in 0..cli.rotate {
        doc.rotate().context("failed to age changes")?;
    }
    debug!(regions = doc.tracker().store().len(), "comparison done");

    let output = if cli.list {
        region_list(doc.buffer(), doc.tracker().store().regions(), &settings.table)
    } else {
        let ansi = match cli.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stdout().is_terminal(),
        };
        paint(doc.buffer(), &doc.overlays().snapshot(), ansi)
    };

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .and_then(|()| stdout.flush())
        .context("failed to write output")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
