use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use docx_engine::options::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_PARAGRAPH_CHARS};
use docx_engine::{ConvertOptions, Engine};
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Compact,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Rendered HTML document to convert.
    #[arg(long, env = "DOCX_ENGINE_HTML_FILE")]
    html_file: PathBuf,

    /// Output .docx path.
    #[arg(long, env = "DOCX_ENGINE_OUT")]
    out: PathBuf,

    /// Document title written to the package's core properties.
    #[arg(long)]
    title: Option<String>,

    /// Page width hint in pixels (forwarded to the renderer only).
    #[arg(long, env = "DOCX_ENGINE_PAGE_WIDTH")]
    page_width: Option<u32>,

    /// Longest paragraph the plain-text fallback emits, in characters.
    #[arg(long, env = "DOCX_ENGINE_MAX_PARAGRAPH_CHARS", default_value_t = DEFAULT_MAX_PARAGRAPH_CHARS)]
    max_paragraph_chars: usize,

    /// Deepest element nesting the converter descends into.
    #[arg(long, env = "DOCX_ENGINE_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Skip pandoc / LibreOffice even when installed.
    #[arg(long, env = "DOCX_ENGINE_NO_EXTERNAL")]
    no_external: bool,

    #[arg(long, env = "DOCX_ENGINE_LOG_LEVEL", default_value = "info")]
    log_level: LevelFilter,

    #[arg(long, env = "DOCX_ENGINE_LOG_FORMAT", value_enum, default_value = "compact")]
    log_format: LogFormat,
}

fn init_tracing(level: LevelFilter, format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("install tracing subscriber")
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level, args.log_format)?;

    let mut html = String::new();
    File::open(&args.html_file)
        .with_context(|| format!("open {}", args.html_file.display()))?
        .read_to_string(&mut html)
        .with_context(|| format!("read {}", args.html_file.display()))?;

    let options = ConvertOptions {
        page_width_px: args.page_width,
        max_paragraph_chars: args.max_paragraph_chars,
        max_depth: args.max_depth,
        title: args.title,
    };
    let engine = if args.no_external {
        Engine::new(options)
    } else {
        Engine::with_detected_converters(options)
    };

    let conversion = engine
        .convert(&html)
        .with_context(|| format!("convert {}", args.html_file.display()))?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let mut f = File::create(&args.out).with_context(|| format!("create {}", args.out.display()))?;
    f.write_all(&conversion.bytes)
        .with_context(|| format!("write {}", args.out.display()))?;

    tracing::info!(
        out = %args.out.display(),
        strategy = %conversion.strategy,
        "wrote document"
    );
    Ok(())
}
