//! # edgequake-pdftext
//!
//! Page-indexed text extraction from PDFs, choosing the cheapest strategy
//! that works.
//!
//! ## Why tiers?
//!
//! Most born-digital PDFs carry an embedded text layer that can be read in
//! milliseconds. Scans do not, and OCR costs seconds per page. This crate
//! always reads the text layer first and only pays for OCR when the layer is
//! missing or too thin to be real text. OCR then runs either locally
//! (pdfium rasterisation + tesseract) or as an asynchronous cloud job
//! (S3 + AWS Textract) whose result is collected by polling.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Validate     size ceiling and content type
//!  ├─ 2. Direct       embedded text layer via pdfium (spawn_blocking)
//!  ├─ 3. Cloud        upload + start Textract job ─▶ queued result
//!  │                  (falls back to 4 unless cloud-only)
//!  └─ 4. Local OCR    render page ─▶ tesseract ─▶ delete, page by page
//!
//! job id ─▶ Poll     follow result pagination ─▶ final / partial / pending
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdftext::{Backends, ExtractionConfig, Extractor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let extractor = Extractor::new(config.clone(), Backends::local(&config)?)?;
//!     let result = extractor.extract_file("scan.pdf").await?;
//!     for page in &result.pages {
//!         println!("--- page {} ---\n{}", page.page, page.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `aws`   | on      | S3 blob store + Textract provider ([`cloud::aws`]) |
//! | `cli`   | on      | Enables the `pdftext` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable both when embedding the library with your own backends:
//! ```toml
//! edgequake-pdftext = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cloud;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BlobDestination, ExtractionConfig, ExtractionConfigBuilder, OcrProvider};
pub use error::{Fallthrough, PageError, PdfTextError};
pub use extract::{extract_sync, Backends, Extractor};
pub use output::{
    status_path, ExtractionMethod, ExtractionResult, JobStatus, PageText, OCR_FAILED_SENTINEL,
    RETRY_AFTER_SECS,
};
pub use pipeline::validate::Upload;
