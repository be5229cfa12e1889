//! AWS backends: S3 as the [`BlobStore`], Textract as the [`CloudOcrProvider`].
//!
//! Credentials and region come from the standard AWS provider chain
//! (environment, profile, instance metadata). `ExtractionConfig::aws_region`
//! overrides the region when set.

use crate::cloud::{
    BlobLocation, BlobStore, CloudOcrProvider, DetectedLine, DetectionPage, PutOptions,
};
use crate::error::PdfTextError;
use crate::output::JobStatus;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ServerSideEncryption;
use aws_sdk_textract::types::{BlockType, DocumentLocation, S3Object};
use tracing::{debug, warn};

/// Load the shared SDK configuration, optionally pinning the region.
pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}

/// S3-backed blob store.
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
}

impl S3BlobStore {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_object(
        &self,
        location: &BlobLocation,
        body: &[u8],
        options: &PutOptions,
    ) -> Result<(), PdfTextError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .content_type(options.content_type)
            .body(ByteStream::from(body.to_vec()));
        if options.server_side_encryption {
            request = request.server_side_encryption(ServerSideEncryption::Aes256);
        }

        request
            .send()
            .await
            .map_err(|e| PdfTextError::BlobUploadFailed {
                key: location.key.clone(),
                detail: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}

/// Textract asynchronous document text detection.
#[derive(Clone)]
pub struct TextractProvider {
    client: aws_sdk_textract::Client,
}

impl TextractProvider {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_textract::Client::new(sdk_config),
        }
    }
}

fn map_job_status(status: Option<&aws_sdk_textract::types::JobStatus>) -> JobStatus {
    use aws_sdk_textract::types::JobStatus as Tx;
    match status {
        Some(Tx::InProgress) => JobStatus::InProgress,
        Some(Tx::Succeeded) => JobStatus::Succeeded,
        Some(Tx::PartialSuccess) => JobStatus::PartialSuccess,
        Some(Tx::Failed) => JobStatus::Failed,
        Some(other) => {
            warn!("Unrecognised Textract job status {:?}; treating as FAILED", other);
            JobStatus::Failed
        }
        None => JobStatus::InProgress,
    }
}

#[async_trait]
impl CloudOcrProvider for TextractProvider {
    async fn start_text_detection(&self, location: &BlobLocation) -> Result<String, PdfTextError> {
        let object = S3Object::builder()
            .bucket(&location.bucket)
            .name(&location.key)
            .build();
        let output = self
            .client
            .start_document_text_detection()
            .document_location(DocumentLocation::builder().s3_object(object).build())
            .send()
            .await
            .map_err(|e| PdfTextError::CloudLaunchFailed {
                detail: DisplayErrorContext(&e).to_string(),
            })?;

        output
            .job_id()
            .map(str::to_string)
            .ok_or_else(|| PdfTextError::CloudLaunchFailed {
                detail: "Textract accepted the request but returned no job id".into(),
            })
    }

    async fn get_text_detection(
        &self,
        job_id: &str,
        next_token: Option<&str>,
        max_results: i32,
    ) -> Result<DetectionPage, PdfTextError> {
        let output = self
            .client
            .get_document_text_detection()
            .job_id(job_id)
            .max_results(max_results)
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| PdfTextError::CloudPollFailed {
                job_id: job_id.to_string(),
                detail: DisplayErrorContext(&e).to_string(),
            })?;

        let lines: Vec<DetectedLine> = output
            .blocks()
            .iter()
            .filter(|b| b.block_type() == Some(&BlockType::Line))
            .map(|b| DetectedLine {
                page: b.page().and_then(|p| usize::try_from(p).ok()),
                text: b.text().unwrap_or_default().to_string(),
            })
            .collect();
        debug!("Textract job {}: {} LINE blocks", job_id, lines.len());

        Ok(DetectionPage {
            status: map_job_status(output.job_status()),
            document_pages: output
                .document_metadata()
                .and_then(|m| m.pages())
                .and_then(|p| usize::try_from(p).ok()),
            lines,
            next_token: output.next_token().map(str::to_string),
        })
    }
}
