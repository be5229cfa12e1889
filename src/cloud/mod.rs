//! Asynchronous cloud OCR: blob upload, job launch, and result polling.
//!
//! Submission and completion are decoupled. [`launch::CloudJobLauncher`]
//! returns as soon as the provider *accepts* a job; every later status query
//! runs [`poll::CloudJobPoller`], which rebuilds the job's state from the
//! provider's paginated results. Nothing about a job is cached in process
//! memory; the provider is the durable store, so any number of server
//! instances can poll the same job concurrently.
//!
//! The two seams, [`BlobStore`] and [`CloudOcrProvider`], are traits so the
//! pipeline can be driven by in-memory fakes in tests; [`aws`] provides the
//! S3 + Textract implementations.

#[cfg(feature = "aws")]
pub mod aws;
pub mod launch;
pub mod poll;

use crate::error::PdfTextError;
use crate::output::JobStatus;
use async_trait::async_trait;

/// Bucket + key of an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    pub bucket: String,
    pub key: String,
}

/// Object metadata requested on upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: &'static str,
    /// Ask the store to encrypt the object at rest (AES-256).
    pub server_side_encryption: bool,
}

/// Object storage the OCR provider can read from.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_object(
        &self,
        location: &BlobLocation,
        body: &[u8],
        options: &PutOptions,
    ) -> Result<(), PdfTextError>;
}

/// One line of recognised text reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedLine {
    /// 1-indexed page; `None` when the provider omitted it.
    pub page: Option<usize>,
    pub text: String,
}

/// One page of a provider's paginated "get results" response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionPage {
    pub status: JobStatus,
    /// Page count of the source document, once the provider knows it.
    pub document_pages: Option<usize>,
    pub lines: Vec<DetectedLine>,
    pub next_token: Option<String>,
}

/// An asynchronous text-detection service.
#[async_trait]
pub trait CloudOcrProvider: Send + Sync {
    /// Start a job over an uploaded object, returning the provider's job id.
    async fn start_text_detection(&self, location: &BlobLocation) -> Result<String, PdfTextError>;

    /// Fetch one page of results for `job_id`.
    async fn get_text_detection(
        &self,
        job_id: &str,
        next_token: Option<&str>,
        max_results: i32,
    ) -> Result<DetectionPage, PdfTextError>;
}
