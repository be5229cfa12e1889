//! CLI binary for edgequake-pdftext.
//!
//! A thin shim over the library crate that maps flags and environment
//! variables to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdftext::cloud::aws::{load_sdk_config, TextractProvider};
use edgequake_pdftext::cloud::poll::CloudJobPoller;
use edgequake_pdftext::{
    status_path, Backends, BlobDestination, ExtractionConfig, ExtractionResult, Extractor,
    OcrProvider, RETRY_AFTER_SECS,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Text layer first, tesseract for scans
  pdftext extract scan.pdf

  # Queue scans on AWS Textract instead
  pdftext extract --provider cloud --bucket my-ocr-bucket scan.pdf

  # Never fall back to local OCR
  pdftext extract --provider cloud --cloud-only --bucket my-ocr-bucket scan.pdf

  # Check on a queued job, waiting until it finishes
  pdftext status 8f2c0e4b5d... --wait

  # Machine-readable output
  pdftext extract --json report.pdf > report.json

ENVIRONMENT VARIABLES:
  OCR_PROVIDER            local | cloud (also PDFTEXT_OCR_PROVIDER)
  CLOUD_OCR_ONLY          Fail instead of falling back to local OCR
  AWS_S3_BUCKET_NAME      Bucket cloud OCR uploads go to
  AWS_REGION              Region for S3 and Textract (default us-east-1)
  PDFTEXT_DPI             Rasterisation DPI for local OCR
  PDFTEXT_LANGUAGES       Tesseract languages, e.g. eng+fra
  PDFIUM_LIB_PATH         Directory containing libpdfium
  RUST_LOG                Overrides --verbose / --quiet

A .env file in the working directory is loaded before flags are parsed.
"#;

/// Extract page text from PDFs: text layer first, OCR when needed.
#[derive(Parser, Debug)]
#[command(
    name = "pdftext",
    version,
    about = "Extract page-indexed text from PDFs, falling back to local or cloud OCR",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFTEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFTEXT_QUIET")]
    quiet: bool,

    /// Print the result as JSON.
    #[arg(long, global = true, env = "PDFTEXT_JSON")]
    json: bool,

    /// AWS region for S3 and Textract.
    #[arg(long, global = true, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract text from a PDF file.
    Extract(ExtractArgs),
    /// Query a queued cloud OCR job.
    Status(StatusArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// PDF file to read.
    file: PathBuf,

    /// OCR provider used when the text layer is insufficient: local or cloud.
    #[arg(long, env = "OCR_PROVIDER", default_value = "local")]
    provider: OcrProvider,

    /// Fail instead of falling back to local OCR when a cloud job cannot start.
    #[arg(long, env = "CLOUD_OCR_ONLY")]
    cloud_only: bool,

    /// Bucket for cloud OCR uploads.
    #[arg(long, env = "AWS_S3_BUCKET_NAME")]
    bucket: Option<String>,

    /// Key prefix for cloud OCR uploads.
    #[arg(long, env = "PDFTEXT_BLOB_PREFIX", default_value = "uploads/ocr")]
    prefix: String,

    /// Rendering DPI for local OCR (72–400).
    #[arg(long, env = "PDFTEXT_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Tesseract language set, e.g. eng or eng+fra.
    #[arg(long, env = "PDFTEXT_LANGUAGES", default_value = "eng")]
    languages: String,

    /// Embedded text must be longer than this to skip OCR.
    #[arg(long, env = "PDFTEXT_MIN_TEXT_CHARS", default_value_t = 20)]
    min_text_chars: usize,

    /// Reject PDFs larger than this many MiB.
    #[arg(long, env = "PDFTEXT_MAX_SIZE_MB", default_value_t = 50)]
    max_size_mb: usize,

    /// Stop local OCR after this many seconds and return the pages done so far.
    #[arg(long, env = "PDFTEXT_OCR_TIMEOUT")]
    ocr_timeout: Option<u64>,

    /// Tesseract executable.
    #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
    tesseract: String,

    /// Directory containing libpdfium (system library when unset).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct StatusArgs {
    /// Job id printed by `pdftext extract --provider cloud`.
    job_id: String,

    /// Keep polling until the job leaves IN_PROGRESS.
    #[arg(long)]
    wait: bool,

    /// Results requested per provider call (1–1000).
    #[arg(long, env = "PDFTEXT_POLL_PAGE_SIZE", default_value_t = 1000,
          value_parser = clap::value_parser!(i32).range(1..=1000))]
    page_size: i32,

    /// Upper bound on provider calls per poll.
    #[arg(long, env = "PDFTEXT_POLL_MAX_ITERATIONS", default_value_t = 1000)]
    max_iterations: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
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

    match &cli.command {
        Command::Extract(args) => run_extract(&cli, args).await,
        Command::Status(args) => run_status(&cli, args).await,
    }
}

async fn run_extract(cli: &Cli, args: &ExtractArgs) -> Result<()> {
    let config = build_config(cli, args)?;
    let backends = match config.provider {
        OcrProvider::Cloud => Backends::aws(&config).await,
        OcrProvider::Local => Backends::local(&config),
    }
    .context("Failed to initialise extraction backends")?;
    let extractor = Extractor::new(config, backends)?;

    let result = extractor
        .extract_file(&args.file)
        .await
        .with_context(|| format!("Extraction failed for {}", args.file.display()))?;

    print_result(cli, &result)?;
    if !cli.quiet && extractor.cloud_fallbacks() > 0 {
        eprintln!("{} cloud OCR unavailable, used local OCR", cyan("⚠"));
    }
    Ok(())
}

async fn run_status(cli: &Cli, args: &StatusArgs) -> Result<()> {
    let sdk_config = load_sdk_config(Some(&cli.region)).await;
    let poller = CloudJobPoller::new(
        Arc::new(TextractProvider::new(&sdk_config)),
        args.page_size,
        args.max_iterations,
        None,
    );

    let spinner = (args.wait && !cli.quiet).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Job");
        bar.set_message(args.job_id.clone());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = loop {
        let result = poller
            .poll_result(&args.job_id)
            .await
            .with_context(|| format!("Failed to query job {}", args.job_id))?;
        if !(args.wait && result.is_pending()) {
            break result;
        }
        tokio::time::sleep(Duration::from_secs(RETRY_AFTER_SECS)).await;
    };
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    print_result(cli, &result)
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, args: &ExtractArgs) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .provider(args.provider)
        .cloud_only(args.cloud_only)
        .dpi(args.dpi)
        .languages(args.languages.clone())
        .min_text_chars(args.min_text_chars)
        .max_input_bytes(args.max_size_mb.saturating_mul(1024 * 1024))
        .tesseract_command(args.tesseract.clone())
        .aws_region(cli.region.clone());

    if let Some(ref bucket) = args.bucket {
        let destination = BlobDestination::new(bucket.clone()).with_prefix(&args.prefix);
        builder = builder.blob_destination(destination);
    }
    if let Some(secs) = args.ocr_timeout {
        builder = builder.local_ocr_timeout_secs(secs);
    }
    if let Some(ref dir) = args.pdfium_lib_path {
        builder = builder.pdfium_lib_path(dir);
    }

    Ok(builder.build()?)
}

fn print_result(cli: &Cli, result: &ExtractionResult) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(result).context("Failed to serialise result")?;
        println!("{json}");
        return Ok(());
    }

    if result.queued || result.is_pending() {
        if let Some(ref job_id) = result.job_id {
            if !cli.quiet {
                eprintln!(
                    "{} OCR job {} is processing; poll {} (retry after {}s)",
                    cyan("◆"),
                    job_id,
                    dim(&status_path(job_id)),
                    RETRY_AFTER_SECS
                );
            }
            println!("{job_id}");
        }
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for page in &result.pages {
        writeln!(handle, "--- page {} ---", page.page).context("Failed to write to stdout")?;
        writeln!(handle, "{}", page.text).context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        let failed = result.failed_pages();
        eprintln!(
            "{}  {}  {}/{} pages{}",
            if !result.success {
                red("✘")
            } else if failed > 0 {
                cyan("⚠")
            } else {
                green("✔")
            },
            result.method,
            result.pages.len(),
            result.total_pages,
            if failed > 0 {
                format!("  ({} failed)", red(&failed.to_string()))
            } else {
                String::new()
            }
        );
    }
    Ok(())
}
