//! Cloud job launch: upload the PDF, start an async OCR job, return at once.
//!
//! [`CloudJobLauncher`] is the mechanism; [`CloudOcrStrategy`] is the policy
//! wrapper that slots it into the extraction chain and decides what a launch
//! failure means: fatal in cloud-only mode, a logged fallback to local OCR
//! otherwise.

use crate::cloud::{BlobLocation, BlobStore, CloudOcrProvider, PutOptions};
use crate::config::BlobDestination;
use crate::error::{Fallthrough, PdfTextError};
use crate::output::ExtractionResult;
use crate::pipeline::validate::{ValidatedPdf, PDF_CONTENT_TYPE};
use crate::pipeline::{Attempt, ExtractionStrategy};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// A job the provider accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedJob {
    pub job_id: String,
    pub blob_key: String,
}

/// Generate a fresh object key: `{prefix}/{unix_millis}-{random}.pdf`.
pub fn unique_blob_key(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}-{}.pdf",
        prefix.trim_end_matches('/'),
        Utc::now().timestamp_millis(),
        &suffix[..12]
    )
}

/// Uploads PDFs and starts provider jobs.
pub struct CloudJobLauncher {
    blob_store: Arc<dyn BlobStore>,
    provider: Arc<dyn CloudOcrProvider>,
    destination: Option<BlobDestination>,
}

impl CloudJobLauncher {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        provider: Arc<dyn CloudOcrProvider>,
        destination: Option<BlobDestination>,
    ) -> Self {
        Self {
            blob_store,
            provider,
            destination,
        }
    }

    /// Upload `pdf` and start a text-detection job over it.
    ///
    /// Returns once the job is accepted, not when it finishes.
    ///
    /// # Errors
    /// - [`PdfTextError::MissingBlobDestination`]: no bucket configured
    /// - [`PdfTextError::BlobUploadFailed`]: the upload was rejected
    /// - [`PdfTextError::CloudLaunchFailed`]: the provider refused the job
    pub async fn launch(&self, pdf: &ValidatedPdf) -> Result<LaunchedJob, PdfTextError> {
        let destination = self
            .destination
            .as_ref()
            .ok_or(PdfTextError::MissingBlobDestination)?;

        let location = BlobLocation {
            bucket: destination.bucket.clone(),
            key: unique_blob_key(&destination.prefix),
        };
        let options = PutOptions {
            content_type: PDF_CONTENT_TYPE,
            server_side_encryption: true,
        };

        self.blob_store
            .put_object(&location, pdf.bytes(), &options)
            .await?;
        info!(
            "Uploaded {} bytes to {}/{}",
            pdf.len(),
            location.bucket,
            location.key
        );

        let job_id = self.provider.start_text_detection(&location).await?;
        info!("Cloud OCR job {} started for {}", job_id, location.key);

        Ok(LaunchedJob {
            job_id,
            blob_key: location.key,
        })
    }
}

/// Chain tier that queues a cloud job.
pub struct CloudOcrStrategy {
    launcher: CloudJobLauncher,
    cloud_only: bool,
    fallbacks: Arc<AtomicU64>,
}

impl CloudOcrStrategy {
    /// `fallbacks` is bumped every time a failed launch is downgraded to a
    /// local-OCR fallback.
    pub fn new(launcher: CloudJobLauncher, cloud_only: bool, fallbacks: Arc<AtomicU64>) -> Self {
        Self {
            launcher,
            cloud_only,
            fallbacks,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for CloudOcrStrategy {
    fn name(&self) -> &'static str {
        "cloud-ocr"
    }

    async fn attempt(&self, pdf: &ValidatedPdf) -> Result<Attempt, PdfTextError> {
        match self.launcher.launch(pdf).await {
            Ok(job) => Ok(Attempt::Concluded(ExtractionResult::queued(
                job.job_id,
                job.blob_key,
            ))),
            Err(PdfTextError::MissingBlobDestination) => Err(PdfTextError::MissingBlobDestination),
            Err(e @ PdfTextError::CloudLaunchFailed { .. }) if self.cloud_only => Err(e),
            Err(e) if self.cloud_only => Err(PdfTextError::CloudLaunchFailed {
                detail: e.to_string(),
            }),
            Err(e) => {
                let total = self.fallbacks.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    target: "pdftext::fallback",
                    error = %e,
                    fallbacks = total,
                    "cloud OCR launch failed; falling back to local OCR"
                );
                Ok(Attempt::Declined(Fallthrough::CloudUnavailable {
                    detail: e.to_string(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::DetectionPage;
    use crate::output::ExtractionMethod;
    use crate::pipeline::validate::validate_bytes;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        puts: Mutex<Vec<(BlobLocation, usize, PutOptions)>>,
        fail: bool,
    }

    #[async_trait]
    impl BlobStore for RecordingStore {
        async fn put_object(
            &self,
            location: &BlobLocation,
            body: &[u8],
            options: &PutOptions,
        ) -> Result<(), PdfTextError> {
            if self.fail {
                return Err(PdfTextError::BlobUploadFailed {
                    key: location.key.clone(),
                    detail: "access denied".into(),
                });
            }
            self.puts
                .lock()
                .unwrap()
                .push((location.clone(), body.len(), options.clone()));
            Ok(())
        }
    }

    struct StartOnly {
        fail: bool,
    }

    #[async_trait]
    impl CloudOcrProvider for StartOnly {
        async fn start_text_detection(
            &self,
            location: &BlobLocation,
        ) -> Result<String, PdfTextError> {
            if self.fail {
                Err(PdfTextError::CloudLaunchFailed {
                    detail: "throttled".into(),
                })
            } else {
                Ok(format!("job-for-{}", location.bucket))
            }
        }

        async fn get_text_detection(
            &self,
            _job_id: &str,
            _next_token: Option<&str>,
            _max_results: i32,
        ) -> Result<DetectionPage, PdfTextError> {
            unreachable!("launch never polls")
        }
    }

    fn pdf() -> ValidatedPdf {
        validate_bytes(&[7u8; 32], 1024).unwrap()
    }

    fn strategy(
        store: Arc<RecordingStore>,
        fail_start: bool,
        cloud_only: bool,
    ) -> (CloudOcrStrategy, Arc<AtomicU64>) {
        let launcher = CloudJobLauncher::new(
            store,
            Arc::new(StartOnly { fail: fail_start }),
            Some(BlobDestination::new("ocr-bucket")),
        );
        let counter = Arc::new(AtomicU64::new(0));
        (CloudOcrStrategy::new(launcher, cloud_only, Arc::clone(&counter)), counter)
    }

    #[test]
    fn blob_keys_are_unique_and_prefixed() {
        let a = unique_blob_key("uploads/ocr/");
        let b = unique_blob_key("uploads/ocr");
        assert_ne!(a, b);
        assert!(a.starts_with("uploads/ocr/"));
        assert!(!a.contains("//"));
        assert!(a.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn launch_uploads_encrypted_pdf_then_starts_job() {
        let store = Arc::new(RecordingStore::default());
        let launcher = CloudJobLauncher::new(
            store.clone(),
            Arc::new(StartOnly { fail: false }),
            Some(BlobDestination::new("ocr-bucket")),
        );
        let job = launcher.launch(&pdf()).await.unwrap();
        assert_eq!(job.job_id, "job-for-ocr-bucket");

        let puts = store.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        let (location, len, options) = &puts[0];
        assert_eq!(location.bucket, "ocr-bucket");
        assert_eq!(location.key, job.blob_key);
        assert_eq!(*len, 32);
        assert_eq!(options.content_type, "application/pdf");
        assert!(options.server_side_encryption);
    }

    #[tokio::test]
    async fn launch_without_destination_is_fatal_config_error() {
        let launcher = CloudJobLauncher::new(
            Arc::new(RecordingStore::default()),
            Arc::new(StartOnly { fail: false }),
            None,
        );
        let err = launcher.launch(&pdf()).await.unwrap_err();
        assert!(matches!(err, PdfTextError::MissingBlobDestination));
    }

    #[tokio::test]
    async fn successful_launch_concludes_with_queued_result() {
        let (s, counter) = strategy(Arc::new(RecordingStore::default()), false, false);
        match s.attempt(&pdf()).await.unwrap() {
            Attempt::Concluded(r) => {
                assert!(!r.success);
                assert!(r.queued);
                assert_eq!(r.method, ExtractionMethod::CloudOcr);
                assert_eq!(r.job_id.as_deref(), Some("job-for-ocr-bucket"));
                assert!(r.blob_key.is_some());
                assert!(r.status.is_none());
            }
            other => panic!("expected queued result, got {other:?}"),
        }
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn failed_start_declines_and_counts_fallback() {
        let (s, counter) = strategy(Arc::new(RecordingStore::default()), true, false);
        let attempt = s.attempt(&pdf()).await.unwrap();
        assert!(matches!(
            attempt,
            Attempt::Declined(Fallthrough::CloudUnavailable { .. })
        ));
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn failed_upload_in_cloud_only_mode_is_fatal() {
        let store = Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        });
        let (s, counter) = strategy(store, false, true);
        let err = s.attempt(&pdf()).await.unwrap_err();
        assert!(matches!(err, PdfTextError::CloudLaunchFailed { .. }));
        assert!(err.to_string().contains("access denied"));
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }
}
