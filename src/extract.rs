//! The extraction orchestrator and its entry points.
//!
//! An [`Extractor`] owns an ordered chain of [`ExtractionStrategy`] tiers
//! built once from the config:
//!
//! ```text
//! provider = local              direct ─▶ local OCR
//! provider = cloud              direct ─▶ cloud launch ─▶ local OCR
//! provider = cloud, cloud_only  direct ─▶ cloud launch
//! ```
//!
//! [`Extractor::extract`] walks the chain until a tier concludes. Job status
//! queries bypass the chain and go straight to the [`CloudJobPoller`].

use crate::cloud::launch::{CloudJobLauncher, CloudOcrStrategy};
use crate::cloud::poll::CloudJobPoller;
use crate::cloud::{BlobStore, CloudOcrProvider};
use crate::config::{ExtractionConfig, OcrProvider};
use crate::error::PdfTextError;
use crate::output::ExtractionResult;
use crate::pipeline::direct::DirectTextExtractor;
use crate::pipeline::local_ocr::{LocalOcrSettings, LocalRasterOcr};
use crate::pipeline::recognise::{Recogniser, TesseractCli};
use crate::pipeline::render::{PdfiumEngine, Rasteriser, TextLayer};
use crate::pipeline::validate::{validate_bytes, validate_upload, Upload, ValidatedPdf};
use crate::pipeline::{Attempt, ExtractionStrategy};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The external engines an [`Extractor`] drives.
///
/// Every field is a trait object so tests and embedders can substitute their
/// own implementations.
#[derive(Clone)]
pub struct Backends {
    pub text_layer: Arc<dyn TextLayer>,
    pub rasteriser: Arc<dyn Rasteriser>,
    pub recogniser: Arc<dyn Recogniser>,
    pub blob_store: Option<Arc<dyn BlobStore>>,
    pub cloud: Option<Arc<dyn CloudOcrProvider>>,
}

impl Backends {
    /// pdfium for the text layer and rasterisation, the tesseract CLI for
    /// recognition. No cloud backends.
    pub fn local(config: &ExtractionConfig) -> Result<Self, PdfTextError> {
        let engine = Arc::new(PdfiumEngine::bind(
            config.pdfium_lib_path.as_deref(),
            config.max_rendered_pixels,
        )?);
        let tesseract = TesseractCli::new(config.tesseract_command.clone());
        if !tesseract.is_available() {
            warn!(
                "'{}' is not runnable; local OCR will mark every page as failed",
                config.tesseract_command
            );
        }

        Ok(Self {
            text_layer: engine.clone(),
            rasteriser: engine,
            recogniser: Arc::new(tesseract),
            blob_store: None,
            cloud: None,
        })
    }

    /// [`Backends::local`] plus S3 and Textract clients from the AWS default
    /// credential chain.
    #[cfg(feature = "aws")]
    pub async fn aws(config: &ExtractionConfig) -> Result<Self, PdfTextError> {
        use crate::cloud::aws::{load_sdk_config, S3BlobStore, TextractProvider};

        let sdk_config = load_sdk_config(config.aws_region.as_deref()).await;
        Ok(Self::local(config)?.with_cloud(
            Arc::new(S3BlobStore::new(&sdk_config)),
            Arc::new(TextractProvider::new(&sdk_config)),
        ))
    }

    /// Attach cloud backends.
    pub fn with_cloud(
        mut self,
        blob_store: Arc<dyn BlobStore>,
        cloud: Arc<dyn CloudOcrProvider>,
    ) -> Self {
        self.blob_store = Some(blob_store);
        self.cloud = Some(cloud);
        self
    }
}

/// Tiered PDF text extractor.
pub struct Extractor {
    config: ExtractionConfig,
    chain: Vec<Box<dyn ExtractionStrategy>>,
    poller: Option<CloudJobPoller>,
    fallbacks: Arc<AtomicU64>,
}

impl Extractor {
    /// Build the strategy chain for `config`.
    ///
    /// # Errors
    /// [`PdfTextError::InvalidConfig`] when the cloud provider is selected
    /// but `backends` carries no blob store or cloud provider.
    pub fn new(config: ExtractionConfig, backends: Backends) -> Result<Self, PdfTextError> {
        let fallbacks = Arc::new(AtomicU64::new(0));
        let mut chain: Vec<Box<dyn ExtractionStrategy>> = vec![Box::new(
            DirectTextExtractor::new(backends.text_layer, config.min_text_chars),
        )];

        if config.provider == OcrProvider::Cloud {
            let (Some(blob_store), Some(cloud)) = (backends.blob_store, backends.cloud.clone())
            else {
                return Err(PdfTextError::InvalidConfig(
                    "cloud OCR selected but no blob store / cloud provider was supplied".into(),
                ));
            };
            let launcher =
                CloudJobLauncher::new(blob_store, cloud, config.blob_destination.clone());
            chain.push(Box::new(CloudOcrStrategy::new(
                launcher,
                config.cloud_only,
                Arc::clone(&fallbacks),
            )));
        }

        if !(config.provider == OcrProvider::Cloud && config.cloud_only) {
            chain.push(Box::new(LocalRasterOcr::new(
                backends.rasteriser,
                backends.recogniser,
                LocalOcrSettings::from(&config),
            )));
        }

        let poller = backends.cloud.map(|provider| {
            CloudJobPoller::new(
                provider,
                config.poll_page_size,
                config.poll_max_iterations,
                config.poll_timeout(),
            )
        });

        debug!(
            "Extraction chain: {}",
            chain.iter().map(|s| s.name()).collect::<Vec<_>>().join(" -> ")
        );
        Ok(Self {
            config,
            chain,
            poller,
            fallbacks,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Number of cloud launches that failed and were served by local OCR.
    pub fn cloud_fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// Extract page text from an in-memory PDF.
    ///
    /// Returns `Ok` for every outcome the caller should render, including a
    /// queued cloud job (`queued == true`) and an unsuccessful local OCR run.
    ///
    /// # Errors
    /// - [`PdfTextError::PayloadTooLarge`]: over `max_input_bytes`
    /// - [`PdfTextError::MissingBlobDestination`]: cloud selected, no bucket
    /// - [`PdfTextError::CloudLaunchFailed`]: cloud-only mode and the job
    ///   could not be started
    pub async fn extract(&self, bytes: &[u8]) -> Result<ExtractionResult, PdfTextError> {
        let pdf = validate_bytes(bytes, self.config.max_input_bytes)?;
        self.run(&pdf).await
    }

    /// Like [`extract`](Self::extract), also checking the declared content type.
    pub async fn extract_upload(&self, upload: Upload) -> Result<ExtractionResult, PdfTextError> {
        let pdf = validate_upload(upload, self.config.max_input_bytes)?;
        self.run(&pdf).await
    }

    /// Read `path` and extract it.
    pub async fn extract_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ExtractionResult, PdfTextError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PdfTextError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        info!("Read {} ({} bytes)", path.display(), bytes.len());
        self.extract(&bytes).await
    }

    /// Current state of a cloud OCR job.
    ///
    /// # Errors
    /// - [`PdfTextError::InvalidJobId`]: empty id
    /// - [`PdfTextError::InvalidConfig`]: no cloud provider configured
    /// - [`PdfTextError::CloudPollFailed`]: the provider call failed
    pub async fn job_status(&self, job_id: &str) -> Result<ExtractionResult, PdfTextError> {
        if job_id.trim().is_empty() {
            return Err(PdfTextError::InvalidJobId);
        }
        let poller = self.poller.as_ref().ok_or_else(|| {
            PdfTextError::InvalidConfig("job status requires a cloud OCR provider".into())
        })?;
        poller.poll_result(job_id).await
    }

    async fn run(&self, pdf: &ValidatedPdf) -> Result<ExtractionResult, PdfTextError> {
        let start = Instant::now();
        info!("Extracting text from {} byte PDF", pdf.len());

        for strategy in &self.chain {
            match strategy.attempt(pdf).await? {
                Attempt::Concluded(result) => {
                    info!(
                        "{} concluded in {}ms: method={}, success={}, pages={}/{}{}",
                        strategy.name(),
                        start.elapsed().as_millis(),
                        result.method,
                        result.success,
                        result.pages.len(),
                        result.total_pages,
                        if result.queued { ", queued" } else { "" }
                    );
                    return Ok(result);
                }
                Attempt::Declined(reason) => {
                    info!("{} declined: {}", strategy.name(), reason);
                }
            }
        }

        Err(PdfTextError::Internal(
            "extraction chain ended without a concluding tier".into(),
        ))
    }
}

/// Synchronous wrapper around [`Extractor::extract`].
///
/// Creates a temporary tokio runtime internally; do not call from inside an
/// async context.
pub fn extract_sync(
    bytes: &[u8],
    config: ExtractionConfig,
    backends: Backends,
) -> Result<ExtractionResult, PdfTextError> {
    let extractor = Extractor::new(config, backends)?;
    tokio::runtime::Runtime::new()
        .map_err(|e| PdfTextError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extractor.extract(bytes))
}
