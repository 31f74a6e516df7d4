//! CLI binary for notereflow.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ReflowConfig` / `ReprocessOptions` / `IngestConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use notereflow::{
    ingest_pdf, normalize_bytes, reprocess_notes, write_text, IngestConfig, NoteReport,
    OcrClient, ReflowConfig, ReprocessOptions, ReprocessProgressCallback, ReprocessSummary,
    RuleTable, SqliteNoteStore, TextStats, DEFAULT_BULLET, DEFAULT_OCR_URL,
};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar for batch reprocessing. Notes finish out of order,
/// so the bar only counts; per-note details are printed after the batch.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Selecting notes…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ReprocessProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_notes: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} notes  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_notes as u64);
        self.bar.set_prefix("Reflowing");
    }

    fn on_note_start(&self, id: i64, _title: &str) {
        self.bar.set_message(format!("note #{id}"));
    }

    fn on_note_complete(&self, _id: i64, _changed: bool) {
        self.bar.inc(1);
    }

    fn on_note_error(&self, id: i64, error: &str) {
        self.bar
            .println(format!("  {} Note #{id}  {}", red("✗"), red(error)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _processed: usize, _failed: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Normalize a text file to stdout
  notereflow reflow extracted.txt

  # Normalize stdin, show before/after statistics
  pdftotext notes.pdf - | notereflow reflow --stats

  # Preview what reprocessing would change
  notereflow reprocess --db notes.sqlite --dry-run

  # Reprocess a single note
  notereflow reprocess --db notes.sqlite --note-id 42

  # Ingest a PDF (OCR service first, local extraction as fallback)
  notereflow ingest --db notes.sqlite --title "Week 3" week3.pdf

  # Dump the built-in rule table, edit it, use it
  notereflow rules > rules.json
  notereflow reprocess --db notes.sqlite --rules rules.json

ENVIRONMENT VARIABLES:
  NOTEREFLOW_DB            Default note database path
  NOTEREFLOW_RULES         Default rule table (JSON)
  NOTEREFLOW_CONCURRENCY   Notes normalized in parallel
  PDF_OCR_SERVICE_URL      OCR service base URL (default http://localhost:5000)
  PDF_OCR_SERVICE_TIMEOUT  OCR request timeout in seconds (default 30)
  PDFIUM_LIB_PATH          Path to libpdfium for local extraction
  RUST_LOG                 Override log filter
"#;

/// Reflow and clean text extracted from PDF study notes.
#[derive(Parser, Debug)]
#[command(
    name = "notereflow",
    version,
    about = "Reflow and clean text extracted from PDF study notes",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "NOTEREFLOW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "NOTEREFLOW_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "NOTEREFLOW_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize a text file (or stdin) and print the result.
    Reflow {
        /// Input text file; stdin when omitted.
        file: Option<PathBuf>,

        /// Write the result to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        reflow: ReflowArgs,

        /// Print before/after statistics to stderr.
        #[arg(long)]
        stats: bool,
    },

    /// Re-run the normalizer over stored PDF notes.
    Reprocess {
        /// SQLite note database.
        #[arg(long, env = "NOTEREFLOW_DB")]
        db: PathBuf,

        /// Process only this note.
        #[arg(long)]
        note_id: Option<i64>,

        /// Show what would change without writing.
        #[arg(long)]
        dry_run: bool,

        /// Notes normalized in parallel.
        #[arg(short, long, env = "NOTEREFLOW_CONCURRENCY", default_value_t = 4)]
        concurrency: usize,

        #[command(flatten)]
        reflow: ReflowArgs,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Extract a PDF and store its normalized text as a new note.
    Ingest {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// SQLite note database.
        #[arg(long, env = "NOTEREFLOW_DB")]
        db: PathBuf,

        /// Title of the new note.
        #[arg(long)]
        title: String,

        #[command(flatten)]
        ocr: OcrArgs,

        /// Skip the OCR service and extract locally.
        #[arg(long)]
        no_external: bool,

        /// HTTP download timeout in seconds.
        #[arg(long, default_value_t = 120)]
        download_timeout: u64,

        #[command(flatten)]
        reflow: ReflowArgs,
    },

    /// Show whether the OCR service is reachable.
    OcrStatus {
        #[command(flatten)]
        ocr: OcrArgs,
    },

    /// Print a built-in rule table as JSON.
    Rules {
        /// Print the vocabulary-free table instead of the academic one.
        #[arg(long)]
        generic: bool,
    },
}

#[derive(Args, Debug)]
struct ReflowArgs {
    /// JSON rule table replacing the built-in one.
    #[arg(long, env = "NOTEREFLOW_RULES")]
    rules: Option<PathBuf>,

    /// Canonical bullet glyph.
    #[arg(long, default_value_t = DEFAULT_BULLET)]
    bullet: char,
}

impl ReflowArgs {
    fn build(&self) -> Result<ReflowConfig> {
        let mut builder = ReflowConfig::builder().bullet(self.bullet);
        if let Some(ref path) = self.rules {
            builder = builder.rules_file(path);
        }
        builder.build().context("Invalid reflow configuration")
    }
}

#[derive(Args, Debug)]
struct OcrArgs {
    /// OCR service base URL.
    #[arg(long, env = "PDF_OCR_SERVICE_URL", default_value = DEFAULT_OCR_URL)]
    ocr_url: String,

    /// OCR request timeout in seconds.
    #[arg(long, env = "PDF_OCR_SERVICE_TIMEOUT", default_value_t = 30)]
    ocr_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs during batch runs.
    let batch_bar = matches!(cli.command, Command::Reprocess { json: false, .. });
    let show_progress = !cli.quiet && !cli.no_progress && batch_bar;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Reflow {
            file,
            output,
            reflow,
            stats,
        } => run_reflow(file, output, &reflow, stats && !cli.quiet),
        Command::Reprocess {
            db,
            note_id,
            dry_run,
            concurrency,
            reflow,
            json,
        } => {
            let config = reflow.build()?;
            let mut options = ReprocessOptions::default()
                .dry_run(dry_run)
                .concurrency(concurrency);
            if let Some(id) = note_id {
                options = options.note_id(id);
            }
            if show_progress {
                options = options.progress_callback(CliProgressCallback::new());
            }
            run_reprocess(db, &options, &config, json, cli.quiet).await
        }
        Command::Ingest {
            input,
            db,
            title,
            ocr,
            no_external,
            download_timeout,
            reflow,
        } => {
            let config = IngestConfig::default()
                .ocr_url(ocr.ocr_url)
                .ocr_timeout_secs(ocr.ocr_timeout)
                .download_timeout_secs(download_timeout)
                .use_external_service(!no_external)
                .reflow(reflow.build()?);
            run_ingest(&input, db, title, &config, cli.quiet).await
        }
        Command::OcrStatus { ocr } => {
            let client = OcrClient::new(ocr.ocr_url, ocr.ocr_timeout, 3)
                .context("Failed to create OCR client")?;
            let status = client.status().await;
            println!(
                "{}",
                serde_json::to_string_pretty(&status).context("Failed to serialize status")?
            );
            Ok(())
        }
        Command::Rules { generic } => {
            let table = if generic {
                RuleTable::generic(DEFAULT_BULLET)
            } else {
                RuleTable::academic(DEFAULT_BULLET)
            }
            .context("Built-in rule table failed to compile")?;
            println!(
                "{}",
                table.to_json().context("Failed to serialize rule table")?
            );
            Ok(())
        }
    }
}

// ── Subcommands ──────────────────────────────────────────────────────────────

fn run_reflow(
    file: Option<PathBuf>,
    output: Option<PathBuf>,
    args: &ReflowArgs,
    stats: bool,
) -> Result<()> {
    let config = args.build()?;

    let bytes = match file {
        Some(ref path) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let result = normalize_bytes(&bytes, &config);

    match output {
        Some(ref path) => write_text(path, &result.text)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(result.text.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    if stats {
        eprintln!("{}", dim(&format!("Decoded as {:?}", result.encoding)));
        if result.restructured {
            eprintln!("{}", dim("Detected flat text, applied structure rules"));
        }
        print_stats("Before", &result.before);
        print_stats("After", &result.after);
    }
    Ok(())
}

async fn run_reprocess(
    db: PathBuf,
    options: &ReprocessOptions,
    config: &ReflowConfig,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let store = SqliteNoteStore::open(&db)
        .with_context(|| format!("Failed to open note database {}", db.display()))?;

    let summary = reprocess_notes(Arc::new(store), options, config)
        .await
        .context("Reprocessing failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
    } else if !quiet {
        print_summary(&summary);
    }

    if summary.failed > 0 {
        anyhow::bail!("{} note(s) could not be written", summary.failed);
    }
    Ok(())
}

async fn run_ingest(
    input: &str,
    db: PathBuf,
    title: String,
    config: &IngestConfig,
    quiet: bool,
) -> Result<()> {
    let store = SqliteNoteStore::open(&db)
        .with_context(|| format!("Failed to open note database {}", db.display()))?;

    let outcome = ingest_pdf(input, title, Arc::new(store), config)
        .await
        .with_context(|| format!("Failed to ingest {input}"))?;

    if !quiet {
        eprintln!(
            "{} Stored note #{} via {}",
            green("✔"),
            bold(&outcome.note_id.to_string()),
            outcome.method
        );
        print_stats("Extracted", &outcome.raw_stats);
        print_stats("Stored", &outcome.stats);
    }
    Ok(())
}

// ── Output helpers ───────────────────────────────────────────────────────────

fn print_stats(label: &str, stats: &TextStats) {
    eprintln!(
        "  {:<9} {} chars, {} line breaks",
        format!("{label}:"),
        stats.chars,
        stats.newlines
    );
}

fn print_report(report: &NoteReport, dry_run: bool) {
    eprintln!(
        "{} Note #{} {}",
        cyan("◆"),
        report.id,
        bold(&report.title)
    );
    print_stats("Before", &report.before);
    print_stats("After", &report.after);
    eprintln!("  {}", dim(&format!("Preview: {}...", report.after.preview)));

    let status = match (&report.error, report.changed, dry_run) {
        (Some(e), _, _) => red(&format!("✗ {e}")),
        (None, false, _) => dim("unchanged"),
        (None, true, true) => cyan("would update (dry run)"),
        (None, true, false) => green("✓ updated"),
    };
    eprintln!("  {status}");
}

fn print_summary(summary: &ReprocessSummary) {
    if summary.reports.is_empty() {
        eprintln!("No PDF notes found to process.");
        return;
    }
    for report in &summary.reports {
        print_report(report, summary.dry_run);
    }
    eprintln!();
    let verb = if summary.dry_run { "would update" } else { "updated" };
    let changed = summary.processed - summary.unchanged;
    if summary.failed == 0 {
        eprintln!(
            "{} {} note(s) processed, {} {}",
            green("✔"),
            bold(&summary.processed.to_string()),
            changed,
            verb
        );
    } else {
        eprintln!(
            "{} {} note(s) processed, {} {}  ({} failed)",
            cyan("⚠"),
            bold(&summary.processed.to_string()),
            changed,
            verb,
            red(&summary.failed.to_string())
        );
    }
    if summary.dry_run {
        eprintln!("{}", dim("Dry run: no changes were written."));
    }
}
