//! CLI binary for local-pdf2md.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, renders run events on the terminal and maps the
//! outcome to an exit code: 0 success, 1 error, 130 interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use local_pdf2md::{
    check_environment, convert_to_file, Accelerator, ConversionConfig, ConversionProgressCallback,
    ConversionReport, EngineStatus, FetchOutcome, PageSelection, PageSeparator, ProgressCallback,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once, OnceLock};
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

const RULE_WIDTH: usize = 60;
const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal renderer for run events. Status lines go to stderr; the page bar
/// and the engine download bar are only drawn when `bars` is set.
struct CliProgressCallback {
    bars: bool,
    /// Page bar, created once the document is open.
    pages: OnceLock<ProgressBar>,
    /// Engine download bar, created on the first download chunk.
    download: OnceLock<ProgressBar>,
    engine_notice: Once,
    page_errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(bars: bool) -> Arc<Self> {
        Arc::new(Self {
            bars,
            pages: OnceLock::new(),
            download: OnceLock::new(),
            engine_notice: Once::new(),
            page_errors: AtomicUsize::new(0),
        })
    }

    /// Print a full line above any live bar.
    fn say(&self, line: impl AsRef<str>) {
        match self.pages.get() {
            Some(bar) if !bar.is_finished() => bar.println(line),
            _ => eprintln!("{}", line.as_ref()),
        }
    }

    fn page_bar(total: usize) -> ProgressBar {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }

    fn download_bar() -> ProgressBar {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar.set_prefix("PDF engine");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_paths_resolved(&self, input: &Path, output: &Path) {
        eprintln!("\n{}", rule());
        eprintln!("Input file: {}", input.display());
        eprintln!("Output file: {}", output.display());
        eprintln!("{}\n", rule());
    }

    fn on_device_selected(&self, accelerator: Accelerator) {
        eprintln!("{} Using {}", green("✓"), accelerator.label());
    }

    fn on_prefetch_start(&self, _total_models: usize) {
        eprintln!("⏳ Checking and downloading models...");
        eprintln!("   (on first run, download may take a few minutes)\n");
    }

    fn on_model_start(&self, repo_id: &str) {
        eprint!("   📦 {repo_id}... ");
        io::stderr().flush().ok();
    }

    fn on_model_finished(&self, _repo_id: &str, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Downloaded(_) => eprintln!("{}", green("✓")),
            FetchOutcome::Skipped { .. } => eprintln!("{}", dim("skipped")),
            FetchOutcome::Failed { .. } => eprintln!("{}", red("⚠ error")),
        }
    }

    fn on_prefetch_complete(&self, downloaded: usize) {
        eprintln!("\n{} Models downloaded: {}\n", green("✓"), downloaded);
    }

    fn on_engine_download(&self, downloaded: u64, total: Option<u64>) {
        self.engine_notice
            .call_once(|| eprintln!("⏳ Downloading PDF engine (first run only)..."));
        if !self.bars {
            return;
        }

        let bar = self.download.get_or_init(Self::download_bar);
        if let Some(t) = total {
            if bar.length() != Some(t) {
                bar.set_length(t);
            }
        }
        bar.set_position(downloaded);
        if total == Some(downloaded) {
            bar.finish_with_message("ready ✓");
        }
    }

    fn on_conversion_start(&self) {
        if let Some(bar) = self.download.get() {
            if !bar.is_finished() {
                bar.finish_with_message("ready ✓");
            }
        }
        eprintln!("⏳ Starting PDF processing...");
        eprintln!("   This may take some time depending on document size...\n");
    }

    fn on_document_opened(&self, total_pages: usize) {
        if self.bars {
            let _ = self.pages.set(Self::page_bar(total_pages));
        }
        self.say(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {total_pages} pages…"))
        ));
    }

    fn on_page_extracted(&self, page_num: usize, total_pages: usize, text_runs: usize) {
        if let Some(bar) = self.pages.get() {
            bar.println(format!(
                "  {} Page {:>3}/{:<3}  {}",
                green("✓"),
                page_num,
                total_pages,
                dim(&format!("{text_runs:>5} runs")),
            ));
            bar.inc(1);
        }
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        self.page_errors.fetch_add(1, Ordering::SeqCst);

        // Keep the log tidy.
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['\u{2026}']).collect()
        } else {
            error.to_string()
        };

        self.say(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg),
        ));
        if let Some(bar) = self.pages.get() {
            bar.inc(1);
        }
    }

    fn on_conversion_complete(&self, elapsed: Duration) {
        if let Some(bar) = self.pages.get() {
            bar.finish_and_clear();
        }
        let failed = self.page_errors.load(Ordering::SeqCst);
        if failed > 0 {
            eprintln!("{} {} page(s) could not be read", cyan("⚠"), red(&failed.to_string()));
        }
        eprintln!(
            "\n{} PDF processed in {:.1} seconds",
            green("✓"),
            elapsed.as_secs_f64()
        );
    }

    fn on_export_start(&self) {
        eprintln!("⏳ Exporting to Markdown...");
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  pdf2md document.pdf
  pdf2md document.pdf -o output.md
  pdf2md /path/to/document.pdf -o /path/to/output.md

  # Specific pages, page markers, YAML front matter
  pdf2md --pages 3-15 --separator comment --metadata report.pdf

  # Offline run: skip the model cache warm-up
  pdf2md --no-prefetch document.pdf

  # Machine-readable statistics
  pdf2md --json document.pdf > stats.json

  # Check the PDF engine and the accelerator
  pdf2md --check-deps

SUPPORTED FEATURES:
  - Headings, paragraphs and lists from the PDF text layer
  - Tables rebuilt from aligned text columns
  - Any script the PDF embeds text for (Latin, Cyrillic, …)
  - Accelerator report for Apple M-series (Metal) and NVIDIA (CUDA) builds

ENVIRONMENT VARIABLES:
  HF_HOME                       Model cache root for pre-fetch
  HF_HUB_DISABLE_PROGRESS_BARS  Hide per-file model download bars
  PDFIUM_LIB_PATH               Path to an existing libpdfium; skips auto-download
  PDF2MD_CACHE_DIR              Override the PDFium cache directory
  RUST_LOG                      Log filter (e.g. local_pdf2md=debug)

SETUP:
  PDFium (~30 MB) is downloaded automatically on first run and cached in
  ~/.cache/local-pdf2md/pdfium-7690/. No manual library setup is required.
"#;

/// Convert PDF files to Markdown locally.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md",
    version,
    disable_version_flag = true,
    about = "Convert PDF files to Markdown locally",
    long_about = "Convert PDF documents to Markdown on this machine. PDFium reads the text \
layer; headings, lists and tables are rebuilt from the page layout. Document models are \
pre-fetched into the Hugging Face cache so later runs work offline.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to input PDF file.
    #[arg(value_name = "INPUT_PDF", required_unless_present = "check_deps")]
    input: Option<PathBuf>,

    /// Path to output MD file (default: input file name with .md extension).
    #[arg(short, long, env = "PDF2MD_OUTPUT")]
    output: Option<PathBuf>,

    /// Print version.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Skip the model pre-fetch step.
    #[arg(long, env = "PDF2MD_NO_PREFETCH")]
    no_prefetch: bool,

    /// Hub cache directory (default: $HF_HOME/hub, i.e. ~/.cache/huggingface/hub).
    #[arg(long, env = "PDF2MD_MODEL_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Hide per-file model download progress bars.
    #[arg(long, env = "HF_HUB_DISABLE_PROGRESS_BARS")]
    no_download_progress: bool,

    /// Do not rebuild tables; aligned columns stay as text.
    #[arg(long, env = "PDF2MD_NO_TABLES")]
    no_tables: bool,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2MD_PAGES", default_value = "all")]
    pages: String,

    /// Page separator: none, hr, comment, or custom string.
    #[arg(long, env = "PDF2MD_SEPARATOR", default_value = "none")]
    separator: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2MD_PASSWORD")]
    password: Option<String>,

    /// Prepend YAML front-matter with document metadata.
    #[arg(long, env = "PDF2MD_METADATA")]
    metadata: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "PDF2MD_JSON")]
    json: bool,

    /// Check the PDF engine and the accelerator, then exit.
    #[arg(long)]
    check_deps: bool,

    /// Disable progress bars.
    #[arg(long, env = "PDF2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(long, env = "PDF2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2MD_QUIET")]
    quiet: bool,
}

impl Cli {
    fn show_status(&self) -> bool {
        !self.quiet && !self.json
    }

    fn show_bars(&self) -> bool {
        self.show_status() && !self.no_progress
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    if cli.check_deps {
        return check_deps(cli.json);
    }

    tokio::select! {
        result = run(&cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("\n{} {}", red("✗ Error:"), error_report(&e));
                ExitCode::FAILURE
            }
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            eprintln!("\n\n{} Interrupted by user (Ctrl+C)", cyan("⚠"));
            eprintln!("If model loading was interrupted, it will resume on next run.");
            // Blocking downloads cannot be cancelled; leave without waiting for them.
            std::process::exit(130);
        }
    }
}

/// The error and its causes on one line, skipping causes that the message
/// above them already spells out.
fn error_report(err: &anyhow::Error) -> String {
    let mut report = err.to_string();
    for cause in err.chain().skip(1) {
        let cause = cause.to_string();
        if !report.contains(&cause) {
            report.push_str(": ");
            report.push_str(&cause);
        }
    }
    report
}

/// Logs go to stderr. The progress UI replaces INFO logs unless `--verbose`.
fn init_logging(cli: &Cli) {
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.show_status() {
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
}

async fn run(cli: &Cli) -> Result<()> {
    let input = cli
        .input
        .as_deref()
        .context("An input PDF path is required")?;

    let progress: Option<ProgressCallback> = if cli.show_status() {
        Some(CliProgressCallback::new(cli.show_bars()) as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(cli, progress)?;

    let report = convert_to_file(input, cli.output.as_deref(), &config).await?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &ConversionReport) {
    let stats = &report.stats;
    eprintln!("\n{}", rule());
    eprintln!("{}", green(&bold("✓ COMPLETED SUCCESSFULLY!")));
    eprintln!("{}", rule());
    eprintln!("Result saved to: {}", report.output.display());
    eprintln!("\nStatistics:");
    eprintln!("  - Output file size: {:.2} KB", report.output_kib());
    eprintln!("  - Character count: {}", stats.char_count);
    eprintln!("  - Conversion time: {:.1} sec", report.conversion_secs());
    eprintln!("  - Export time: {:.1} sec", report.export_secs());
    eprintln!("  - Total time: {:.1} sec", report.total_secs());
    if stats.pages_failed > 0 {
        eprintln!("  - Pages failed: {}", red(&stats.pages_failed.to_string()));
    }
    if stats.empty_pages > 0 {
        eprintln!(
            "  - Pages without text: {} {}",
            stats.empty_pages,
            dim("(scanned images are not OCR'd)")
        );
    }
    eprintln!("{}\n", rule());
}

/// `--check-deps`: exit 0 when a conversion can start without provisioning.
fn check_deps(json: bool) -> ExitCode {
    let report = check_environment();

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("{} {e}", red("✗ Error:"));
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("Checking dependencies...\n");
        match &report.engine {
            EngineStatus::Ready { path, source } => println!(
                "{} PDFium engine is installed {}",
                green("✓"),
                dim(&format!("({}, {})", path.display(), source))
            ),
            EngineStatus::Broken { path, reason } => println!(
                "{} PDFium engine at {} cannot be loaded: {}",
                red("✗"),
                path.display(),
                reason
            ),
            EngineStatus::Missing => println!("{} PDFium engine is not installed", red("✗")),
        }
        println!();

        if report.is_ready() {
            println!("{} All dependencies are installed!", green("✓"));
            match report.accelerator {
                Accelerator::Metal => println!(
                    "{} Apple Silicon GPU (MPS) support is available",
                    green("✓")
                ),
                Accelerator::Cuda => {
                    println!("{} NVIDIA GPU (CUDA) support is available", green("✓"))
                }
                Accelerator::Cpu => println!("{} CPU will be used", green("✓")),
            }
        } else {
            println!("{} Some dependencies are not installed.", red("✗"));
            println!("\nInstall them using:");
            println!("  pdf2md <file.pdf>            (downloads PDFium on first run)");
            println!("  PDFIUM_LIB_PATH=/path/to/libpdfium pdf2md <file.pdf>");
        }
    }

    if report.is_ready() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages = parse_pages(&cli.pages)?;
    let separator = parse_separator(&cli.separator);

    let mut builder = ConversionConfig::builder()
        .pages(pages)
        .page_separator(separator)
        .include_metadata(cli.metadata)
        .detect_tables(!cli.no_tables)
        .prefetch_models(!cli.no_prefetch)
        .download_progress(cli.show_bars() && !cli.no_download_progress);

    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref dir) = cli.cache_dir {
        builder = builder.model_cache_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}
