//! Error types for the edgequake-pdftext library.
//!
//! Three distinct types reflect three distinct outcomes:
//!
//! * [`PdfTextError`]: **Fatal**: the request cannot be served at all
//!   (oversized upload, no blob destination, cloud-only launch failure).
//!   Returned as `Err(PdfTextError)` from [`crate::Extractor`].
//!
//! * [`PageError`]: **Non-fatal**: a single page failed to render or be
//!   recognised. It is logged and the page is stored with the
//!   [`crate::output::OCR_FAILED_SENTINEL`] text so the rest of the document
//!   survives.
//!
//! * [`Fallthrough`]: **Not an error**: a strategy declined the document
//!   (too little embedded text, unreadable text layer, cloud launch failed in
//!   fallback mode). The orchestrator logs it and tries the next strategy.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdftext library.
#[derive(Debug, Error)]
pub enum PdfTextError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The upload carried no PDF body, or declared a non-PDF content type.
    #[error("Expected a PDF byte buffer, got {found}")]
    InvalidInputType { found: String },

    /// The buffer exceeds the configured size ceiling.
    #[error(
        "PDF size ({}) exceeds maximum allowed size of {}",
        human_size(.actual),
        human_size(.max)
    )]
    PayloadTooLarge { actual: usize, max: usize },

    /// A status query was made without a job id.
    #[error("Missing job id for status query")]
    InvalidJobId,

    /// The file given to [`crate::Extractor::extract_file`] could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt or unreadable: {detail}")]
    CorruptPdf { detail: String },

    // ── Cloud errors ──────────────────────────────────────────────────────
    /// Cloud OCR was selected but no bucket was configured.
    #[error("No blob-store destination configured for cloud OCR.\nSet AWS_S3_BUCKET_NAME or pass --bucket.")]
    MissingBlobDestination,

    /// Uploading the PDF to the blob store failed.
    #[error("Failed to upload '{key}' to the blob store: {detail}")]
    BlobUploadFailed { key: String, detail: String },

    /// The provider refused to start the OCR job.
    #[error("Cloud OCR job failed to start: {detail}")]
    CloudLaunchFailed { detail: String },

    /// Fetching job results from the provider failed.
    #[error("Failed to fetch results for job '{job_id}': {detail}")]
    CloudPollFailed { job_id: String, detail: String },

    // ── Local resource errors ─────────────────────────────────────────────
    /// Creating or writing the per-request scratch directory failed.
    #[error("Scratch space error: {source}")]
    ScratchSpace {
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform, or set PDFIUM_LIB_PATH to the\n\
directory that contains it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfTextError {
    /// `true` when the caller sent something wrong (maps to a 4xx response),
    /// `false` when the failure is on the server side.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PdfTextError::InvalidInputType { .. }
                | PdfTextError::PayloadTooLarge { .. }
                | PdfTextError::InvalidJobId
        )
    }
}

/// A non-fatal error for a single page of local OCR.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The recogniser failed on the page image.
    #[error("Page {page}: recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },
}

/// Why a strategy handed the document on to the next one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Fallthrough {
    /// The embedded text layer is too thin to count as real text.
    #[error("embedded text too short ({chars} chars, need more than {threshold})")]
    InsufficientText { chars: usize, threshold: usize },

    /// The text layer could not be parsed at all.
    #[error("text layer unreadable: {detail}")]
    Unparseable { detail: String },

    /// Cloud launch failed and local fallback is allowed.
    #[error("cloud OCR unavailable: {detail}")]
    CloudUnavailable { detail: String },
}

/// Render a byte count as megabytes with two decimals, e.g. `"50.00 MB"`.
pub fn human_size(bytes: &usize) -> String {
    format!("{:.2} MB", *bytes as f64 / 1024.0 / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_too_large_display() {
        let e = PdfTextError::PayloadTooLarge {
            actual: 60 * 1024 * 1024,
            max: 50 * 1024 * 1024,
        };
        let msg = e.to_string();
        assert!(msg.contains("60.00 MB"), "got: {msg}");
        assert!(msg.contains("50.00 MB"), "got: {msg}");
    }

    #[test]
    fn human_size_rounds_to_two_decimals() {
        assert_eq!(human_size(&0), "0.00 MB");
        assert_eq!(human_size(&(1024 * 1024 + 512 * 1024)), "1.50 MB");
    }

    #[test]
    fn client_errors_are_classified() {
        assert!(PdfTextError::InvalidJobId.is_client_error());
        assert!(PdfTextError::InvalidInputType {
            found: "text/plain".into()
        }
        .is_client_error());
        assert!(!PdfTextError::MissingBlobDestination.is_client_error());
        assert!(!PdfTextError::CloudLaunchFailed {
            detail: "denied".into()
        }
        .is_client_error());
    }

    #[test]
    fn page_error_display() {
        let e = PageError::RecognitionFailed {
            page: 3,
            detail: "tesseract exited 1".into(),
        };
        assert!(e.to_string().contains("Page 3"));
        assert!(e.to_string().contains("tesseract exited 1"));
    }

    #[test]
    fn fallthrough_display_mentions_threshold() {
        let f = Fallthrough::InsufficientText {
            chars: 4,
            threshold: 20,
        };
        assert!(f.to_string().contains("4 chars"));
        assert!(f.to_string().contains("20"));
    }
}
