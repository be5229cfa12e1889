//! Configuration types for tiered PDF text extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The config is an explicit value handed
//! to [`crate::Extractor`] at construction; the library never consults the
//! process environment, so two extractors with different providers can live
//! side by side in one process (and in one test binary).
//!
//! # Design choice: builder over constructor
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::PdfTextError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default upload ceiling: 50 MiB.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 50 * 1024 * 1024;

/// Configuration for a PDF text extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdftext::{ExtractionConfig, OcrProvider};
///
/// let config = ExtractionConfig::builder()
///     .provider(OcrProvider::Cloud)
///     .blob_bucket("my-ocr-bucket")
///     .dpi(200)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Largest accepted PDF, in bytes. Default: 50 MiB.
    pub max_input_bytes: usize,

    /// Combined embedded text must be *longer* than this many characters for
    /// direct extraction to win. Default: 20.
    ///
    /// Scanned PDFs often carry a handful of stray glyphs (a page number, a
    /// scanner watermark). A small threshold rejects that noise without
    /// sending genuinely short text documents to OCR.
    pub min_text_chars: usize,

    /// Which OCR branch to take when the text layer is insufficient.
    pub provider: OcrProvider,

    /// Forbid the local-OCR fallback when a cloud launch fails. Default: false.
    pub cloud_only: bool,

    /// Recogniser language set, tesseract style (`"eng"`, `"eng+deu"`).
    pub languages: String,

    /// Rasterisation DPI for local OCR. Range: 72–400. Default: 150.
    ///
    /// 150 DPI keeps body text legible to tesseract while a letter page stays
    /// around 1275 × 1650 px.
    pub dpi: u32,

    /// Cap on either rendered dimension in pixels. Default: 4000.
    ///
    /// Guards against posters and engineering drawings whose physical size
    /// would otherwise produce enormous bitmaps at the configured DPI.
    pub max_rendered_pixels: u32,

    /// Where the cloud path uploads the PDF. Required for [`OcrProvider::Cloud`].
    pub blob_destination: Option<BlobDestination>,

    /// AWS region for the cloud clients. `None` uses the SDK default chain.
    pub aws_region: Option<String>,

    /// `MaxResults` per provider page while polling. Range: 1–1000. Default: 1000.
    pub poll_page_size: i32,

    /// Safety bound on provider calls per poll. Default: 1000.
    pub poll_max_iterations: usize,

    /// Optional deadline for the local OCR page loop, in seconds.
    pub local_ocr_timeout_secs: Option<u64>,

    /// Optional deadline for one poll's pagination loop, in seconds.
    pub poll_timeout_secs: Option<u64>,

    /// Parent directory for scratch files. `None` uses the OS temp dir.
    pub temp_dir: Option<PathBuf>,

    /// Executable used by [`crate::pipeline::recognise::TesseractCli`].
    pub tesseract_command: String,

    /// Directory containing libpdfium. `None` binds the system library.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            min_text_chars: 20,
            provider: OcrProvider::default(),
            cloud_only: false,
            languages: "eng".to_string(),
            dpi: 150,
            max_rendered_pixels: 4000,
            blob_destination: None,
            aws_region: None,
            poll_page_size: 1000,
            poll_max_iterations: 1000,
            local_ocr_timeout_secs: None,
            poll_timeout_secs: None,
            temp_dir: None,
            tesseract_command: "tesseract".to_string(),
            pdfium_lib_path: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("max_input_bytes", &self.max_input_bytes)
            .field("min_text_chars", &self.min_text_chars)
            .field("provider", &self.provider)
            .field("cloud_only", &self.cloud_only)
            .field("languages", &self.languages)
            .field("dpi", &self.dpi)
            .field("blob_destination", &self.blob_destination)
            .field("poll_page_size", &self.poll_page_size)
            .field("poll_max_iterations", &self.poll_max_iterations)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn local_ocr_timeout(&self) -> Option<Duration> {
        self.local_ocr_timeout_secs.map(Duration::from_secs)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_secs.map(Duration::from_secs)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn max_input_bytes(mut self, bytes: usize) -> Self {
        self.config.max_input_bytes = bytes;
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn provider(mut self, provider: OcrProvider) -> Self {
        self.config.provider = provider;
        self
    }

    pub fn cloud_only(mut self, v: bool) -> Self {
        self.config.cloud_only = v;
        self
    }

    pub fn languages(mut self, langs: impl Into<String>) -> Self {
        self.config.languages = langs.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn blob_destination(mut self, destination: BlobDestination) -> Self {
        self.config.blob_destination = Some(destination);
        self
    }

    /// Shorthand for a destination in `bucket` under the default prefix.
    pub fn blob_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.blob_destination = Some(BlobDestination::new(bucket));
        self
    }

    pub fn aws_region(mut self, region: impl Into<String>) -> Self {
        self.config.aws_region = Some(region.into());
        self
    }

    pub fn poll_page_size(mut self, n: i32) -> Self {
        self.config.poll_page_size = n;
        self
    }

    pub fn poll_max_iterations(mut self, n: usize) -> Self {
        self.config.poll_max_iterations = n;
        self
    }

    pub fn local_ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.local_ocr_timeout_secs = Some(secs);
        self
    }

    pub fn poll_timeout_secs(mut self, secs: u64) -> Self {
        self.config.poll_timeout_secs = Some(secs);
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn tesseract_command(mut self, cmd: impl Into<String>) -> Self {
        self.config.tesseract_command = cmd.into();
        self
    }

    pub fn pdfium_lib_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, PdfTextError> {
        let c = &self.config;
        if !(1..=1000).contains(&c.poll_page_size) {
            return Err(PdfTextError::InvalidConfig(format!(
                "Poll page size must be 1–1000, got {}",
                c.poll_page_size
            )));
        }
        if c.poll_max_iterations == 0 {
            return Err(PdfTextError::InvalidConfig(
                "Poll iteration bound must be ≥ 1".into(),
            ));
        }
        if c.languages.trim().is_empty() {
            return Err(PdfTextError::InvalidConfig(
                "OCR language set must not be empty".into(),
            ));
        }
        if let Some(ref dest) = c.blob_destination {
            if dest.bucket.trim().is_empty() {
                return Err(PdfTextError::InvalidConfig(
                    "Blob destination bucket must not be empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which OCR branch runs once direct extraction comes up short.
///
/// | Provider | Behaviour |
/// |----------|-----------|
/// | `Local`  | Rasterise + tesseract in-process, blocking until done (default) |
/// | `Cloud`  | Upload to the blob store, start an async job, return queued |
///
/// Cloud is the right choice for managed deployments: local OCR is CPU- and
/// memory-heavy and does not fit short-lived serverless workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrProvider {
    #[default]
    Local,
    Cloud,
}

impl FromStr for OcrProvider {
    type Err = PdfTextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "local" | "tesseract" => Ok(OcrProvider::Local),
            "cloud" | "aws-textract" | "textract" => Ok(OcrProvider::Cloud),
            other => Err(PdfTextError::InvalidConfig(format!(
                "Unknown OCR provider '{other}' (expected 'local' or 'cloud')"
            ))),
        }
    }
}

impl fmt::Display for OcrProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrProvider::Local => f.write_str("local"),
            OcrProvider::Cloud => f.write_str("cloud"),
        }
    }
}

/// Blob-store bucket and key prefix for cloud uploads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobDestination {
    pub bucket: String,
    /// Key prefix without a trailing slash. Default: `uploads/ocr`.
    pub prefix: String,
}

impl BlobDestination {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: "uploads/ocr".to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ExtractionConfig::default();
        assert_eq!(c.max_input_bytes, 50 * 1024 * 1024);
        assert_eq!(c.min_text_chars, 20);
        assert_eq!(c.provider, OcrProvider::Local);
        assert!(!c.cloud_only);
        assert_eq!(c.languages, "eng");
        assert_eq!(c.dpi, 150);
        assert_eq!(c.poll_max_iterations, 1000);
        assert!(c.blob_destination.is_none());
    }

    #[test]
    fn builder_clamps_dpi() {
        let c = ExtractionConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, 72);
        let c = ExtractionConfig::builder().dpi(9000).build().unwrap();
        assert_eq!(c.dpi, 400);
    }

    #[test]
    fn builder_rejects_zero_iteration_bound() {
        let err = ExtractionConfig::builder()
            .poll_max_iterations(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, PdfTextError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_oversized_page_size() {
        assert!(ExtractionConfig::builder()
            .poll_page_size(5000)
            .build()
            .is_err());
    }

    #[test]
    fn builder_rejects_blank_bucket() {
        assert!(ExtractionConfig::builder().blob_bucket("  ").build().is_err());
    }

    #[test]
    fn provider_parses_aliases() {
        assert_eq!("cloud".parse::<OcrProvider>().unwrap(), OcrProvider::Cloud);
        assert_eq!(
            "AWS-Textract".parse::<OcrProvider>().unwrap(),
            OcrProvider::Cloud
        );
        assert_eq!("".parse::<OcrProvider>().unwrap(), OcrProvider::Local);
        assert_eq!("local".parse::<OcrProvider>().unwrap(), OcrProvider::Local);
        assert!("azure".parse::<OcrProvider>().is_err());
    }

    #[test]
    fn destination_prefix_drops_trailing_slash() {
        let d = BlobDestination::new("b").with_prefix("scans/");
        assert_eq!(d.prefix, "scans");
        assert_eq!(BlobDestination::new("b").prefix, "uploads/ocr");
    }
}
