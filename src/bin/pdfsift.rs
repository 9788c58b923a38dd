//! CLI binary for pdfsift.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, wires up logging, and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdfsift::{
    BatchReport, ExtractionProgressCallback, Orchestrator, PageWritePolicy, PipelineConfig,
    ProgressCallback, TextFileLayout,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar for the batch, one log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} documents  \
                 ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_documents} documents…"))
        ));
    }

    fn on_document_start(&self, filename: &str, _index: usize, _total: usize) {
        self.bar.set_message(filename.to_string());
    }

    fn on_document_complete(&self, filename: &str, selectable_pages: usize, ocr_pages: usize) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            filename,
            dim(&format!("{selectable_pages} text pages, {ocr_pages} OCR pages")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, filename: &str, error: &str) {
        // First line only; pdfium and store errors carry multi-line hints.
        let first = error.lines().next().unwrap_or(error);
        self.bar
            .println(format!("  {} {}  {}", red("✗"), filename, red(first)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process every PDF in ./input
  pdfsift run

  # Process specific files under another root
  pdfsift --root /srv/pdfsift run a.pdf b.pdf

  # Show metadata and text-layer coverage of one file
  pdfsift inspect report.pdf

  # Serve the HTTP API
  pdfsift serve --port 5000

DIRECTORY LAYOUT (under --root):
  input/                     documents to process, uploads
  output/selectable_text/    <name>.txt, text layer with "-- Page N --" banners
  output/ocr_text/           <name>.txt, OCR text (UTF-8)
  output/metadata/           <name>_metadata.json
  output/documents.db        SQLite store
  logs/                      pdfsift.log.YYYY-MM-DD

ENVIRONMENT VARIABLES:
  PDFSIFT_ROOT            Root directory (default: .)
  PDFSIFT_DB              SQLite database path
  PDFSIFT_DPI             OCR rendering DPI
  PDFSIFT_OCR_LANG        Tesseract language(s), e.g. eng+deu
  PDFSIFT_PAGE_POLICY     replace | append
  PDFIUM_LIB_PATH         Directory containing libpdfium
  RUST_LOG                Override console log filter
"#;

/// Extract selectable text, OCR text and metadata from PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsift",
    version,
    about = "Extract selectable text, OCR text and metadata from PDFs into files and SQLite",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Root directory holding input/, output/ and logs/.
    #[arg(long, global = true, env = "PDFSIFT_ROOT", default_value = ".")]
    root: PathBuf,

    /// SQLite database file (default: <root>/output/documents.db).
    #[arg(long, global = true, env = "PDFSIFT_DB")]
    db: Option<PathBuf>,

    /// Directory containing libpdfium.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_dir: Option<PathBuf>,

    /// Rendering DPI for OCR (72–600).
    #[arg(long, global = true, env = "PDFSIFT_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Tesseract language code(s).
    #[arg(long, global = true, env = "PDFSIFT_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// How re-runs treat existing page rows.
    #[arg(long, global = true, env = "PDFSIFT_PAGE_POLICY", value_enum, default_value = "replace")]
    page_policy: PolicyArg,

    /// One text file per document or per page.
    #[arg(long, global = true, env = "PDFSIFT_LAYOUT", value_enum, default_value = "per-document")]
    layout: LayoutArg,

    /// Do not write selectable/OCR text files.
    #[arg(long, global = true)]
    no_text_files: bool,

    /// Do not write metadata JSON files.
    #[arg(long, global = true)]
    no_metadata_json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDFSIFT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFSIFT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFSIFT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process the given PDFs, or every PDF in <root>/input.
    Run {
        paths: Vec<PathBuf>,

        /// Print the batch report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print metadata and page statistics for one PDF without storing anything.
    Inspect {
        pdf: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Serve the HTTP API.
    Serve {
        #[arg(long, env = "PDFSIFT_HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, env = "PDFSIFT_PORT", default_value_t = 5000)]
        port: u16,

        /// Maximum upload size in MiB.
        #[arg(long, env = "PDFSIFT_MAX_UPLOAD_MB", default_value_t = 64)]
        max_upload_mb: usize,
    },
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PolicyArg {
    Replace,
    Append,
}

impl From<PolicyArg> for PageWritePolicy {
    fn from(v: PolicyArg) -> Self {
        match v {
            PolicyArg::Replace => PageWritePolicy::Replace,
            PolicyArg::Append => PageWritePolicy::Append,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LayoutArg {
    PerDocument,
    PerPage,
}

impl From<LayoutArg> for TextFileLayout {
    fn from(v: LayoutArg) -> Self {
        match v {
            LayoutArg::PerDocument => TextFileLayout::PerDocument,
            LayoutArg::PerPage => TextFileLayout::PerPage,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let show_progress = !cli.quiet
        && !cli.no_progress
        && matches!(cli.command, Command::Run { json: false, .. });
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    config
        .ensure_directories()
        .context("Failed to create the pdfsift directory layout")?;
    let _log_guard = init_logging(&cli, &config.log_dir, show_progress)?;

    match cli.command {
        Command::Run { ref paths, json } => {
            let report = tokio::task::block_in_place(|| -> Result<BatchReport> {
                Orchestrator::check_ocr_engine(&config);
                let orchestrator =
                    Orchestrator::from_config(config).context("Failed to start the pipeline")?;
                let report = if paths.is_empty() {
                    orchestrator.run()
                } else {
                    orchestrator.process_batch(paths)
                };
                report.context("Extraction failed")
            })?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                );
            } else if !cli.quiet {
                print_summary(&report);
            }

            if report.processed.is_empty() && !report.failed.is_empty() {
                anyhow::bail!("All {} documents failed", report.failed.len());
            }
        }

        Command::Inspect { ref pdf, json } => {
            let info = tokio::task::block_in_place(|| {
                Orchestrator::from_config(config)
                    .context("Failed to start the pipeline")?
                    .inspect(pdf)
                    .with_context(|| format!("Failed to inspect {}", pdf.display()))
            })?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&info).context("Failed to serialise metadata")?
                );
            } else {
                let m = &info.metadata;
                println!("File:          {}", m.filename);
                println!("Title:         {}", m.title);
                println!("Author:        {}", m.author);
                println!("Subject:       {}", m.subject);
                println!("Keywords:      {}", m.keywords);
                println!("Created:       {}", m.creation_date);
                println!("Modified:      {}", m.modification_date);
                println!("Producer:      {}", m.producer);
                println!("Pages:         {}", info.page_count);
                println!("Text layer:    {} pages", info.text_pages);
                println!("Scanned:       {} pages", info.scanned_pages());
                println!("Size:          {} bytes", info.file_size_bytes);
            }
        }

        Command::Serve {
            ref host,
            port,
            max_upload_mb,
        } => {
            let mut config = config;
            config.max_upload_bytes = max_upload_mb.max(1) * 1024 * 1024;
            if !cli.quiet {
                eprintln!(
                    "{} Serving {} on {}",
                    cyan("◆"),
                    bold(&config.input_dir.display().to_string()),
                    bold(&format!("http://{host}:{port}"))
                );
            }
            pdfsift::serve(config, host, port)
                .await
                .context("HTTP server failed")?;
        }
    }

    Ok(())
}

/// Console layer on stderr plus a daily-rotated plain-text file layer.
///
/// The returned guard flushes the file writer on drop and must outlive `main`'s work.
fn init_logging(cli: &Cli, log_dir: &Path, show_progress: bool) -> Result<WorkerGuard> {
    // The progress bar carries per-document feedback; keep the console quiet under it.
    let console_level = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    let file_level = if cli.verbose { "debug" } else { "info" };

    let file_appender = tracing_appender::rolling::daily(log_dir, "pdfsift.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console = fmt::layer().with_writer(io::stderr).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_level)),
    );
    let file = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_filter(EnvFilter::new(file_level));

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to initialise logging")?;
    Ok(guard)
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .root(&cli.root)
        .dpi(cli.dpi)
        .ocr_language(cli.ocr_lang.clone())
        .page_policy(cli.page_policy.clone().into())
        .text_layout(cli.layout.clone().into())
        .write_text_files(!cli.no_text_files)
        .write_metadata_json(!cli.no_metadata_json);

    if let Some(ref db) = cli.db {
        builder = builder.db_path(db.clone());
    }
    if let Some(ref dir) = cli.pdfium_lib_dir {
        builder = builder.pdfium_lib_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &BatchReport) {
    let pages: usize = report
        .processed
        .iter()
        .map(|d| d.selectable_pages + d.ocr_pages)
        .sum();

    if report.failed.is_empty() {
        eprintln!(
            "{} {} documents processed, {} pages stored  {}",
            green("✓"),
            bold(&report.processed.len().to_string()),
            pages,
            dim(&format!("{}ms", report.total_duration_ms)),
        );
    } else {
        eprintln!(
            "{} {}/{} documents processed  ({} failed)  {}",
            red("✗"),
            bold(&report.processed.len().to_string()),
            report.total(),
            red(&report.failed.len().to_string()),
            dim(&format!("{}ms", report.total_duration_ms)),
        );
        for failure in &report.failed {
            let first = failure.error.lines().next().unwrap_or(&failure.error);
            eprintln!("  {} {}  {}", red("✗"), failure.filename, dim(first));
        }
    }
}
