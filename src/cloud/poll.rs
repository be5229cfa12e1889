//! Cloud job polling: rebuild a job's text from the provider's paginated results.
//!
//! Every call starts from an empty [`Job`] and walks the result pages from
//! the first token, so concurrent polls of the same job id never share state.

use crate::cloud::{CloudOcrProvider, DetectionPage};
use crate::error::PdfTextError;
use crate::output::{ExtractionMethod, ExtractionResult, JobStatus, PageText};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Job state re-derived from one pass over the provider's results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    /// Lines per page, in the order the provider returned them.
    pub collected_pages: BTreeMap<usize, Vec<String>>,
    /// Page count of the source document as reported by the provider.
    pub reported_pages: Option<usize>,
}

impl Job {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::InProgress,
            collected_pages: BTreeMap::new(),
            reported_pages: None,
        }
    }

    /// Fold one response page into the job. Lines without a page number, or
    /// numbered 0, are attributed to page 1.
    pub fn absorb(&mut self, page: DetectionPage) {
        self.status = page.status;
        if let Some(n) = page.document_pages {
            self.reported_pages = Some(n);
        }
        for line in page.lines {
            self.collected_pages
                .entry(line.page.filter(|&p| p > 0).unwrap_or(1))
                .or_default()
                .push(line.text);
        }
    }

    /// Assemble the caller-facing result.
    ///
    /// Only usable statuses carry text; an in-progress or failed job returns
    /// no pages and a zero page count alongside its status.
    pub fn into_result(self) -> ExtractionResult {
        let mut result = ExtractionResult::unextracted(ExtractionMethod::CloudOcr);
        result.status = Some(self.status);
        result.job_id = Some(self.job_id);

        if !self.status.is_usable() {
            return result;
        }

        let pages: Vec<PageText> = self
            .collected_pages
            .into_iter()
            .map(|(page, lines)| PageText::new(page, lines.join(" ").trim()))
            .collect();
        result.success = true;
        result.total_pages = self.reported_pages.unwrap_or(pages.len()).max(pages.len());
        result.pages = pages;
        result
    }
}

/// Walks a provider job's paginated results.
pub struct CloudJobPoller {
    provider: Arc<dyn CloudOcrProvider>,
    page_size: i32,
    max_iterations: usize,
    timeout: Option<Duration>,
}

impl CloudJobPoller {
    pub fn new(
        provider: Arc<dyn CloudOcrProvider>,
        page_size: i32,
        max_iterations: usize,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            page_size,
            max_iterations,
            timeout,
        }
    }

    /// Fetch the current state of `job_id`.
    ///
    /// Follows `next_token` until the provider stops returning one. Hitting
    /// the iteration bound or the deadline is not an error: whatever was
    /// collected so far is returned.
    ///
    /// # Errors
    /// - [`PdfTextError::InvalidJobId`] for an empty id
    /// - [`PdfTextError::CloudPollFailed`] when a provider call fails
    pub async fn poll(&self, job_id: &str) -> Result<Job, PdfTextError> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(PdfTextError::InvalidJobId);
        }

        let started = Instant::now();
        let mut job = Job::new(job_id);
        let mut next_token: Option<String> = None;
        let mut iterations = 0usize;

        loop {
            if iterations >= self.max_iterations {
                warn!(
                    job_id,
                    iterations,
                    "PollingExhausted: provider kept paginating; returning partial result"
                );
                break;
            }
            if self.timeout.is_some_and(|t| started.elapsed() >= t) {
                warn!(
                    job_id,
                    iterations,
                    "Poll deadline reached; returning partial result"
                );
                break;
            }

            let page = self
                .provider
                .get_text_detection(job_id, next_token.as_deref(), self.page_size)
                .await
                .map_err(|e| match e {
                    e @ PdfTextError::CloudPollFailed { .. } => e,
                    other => PdfTextError::CloudPollFailed {
                        job_id: job_id.to_string(),
                        detail: other.to_string(),
                    },
                })?;
            iterations += 1;

            next_token = page.next_token.clone();
            debug!(
                "Job {}: response {} with {} lines ({})",
                job_id,
                iterations,
                page.lines.len(),
                page.status
            );
            job.absorb(page);

            if next_token.is_none() {
                break;
            }
        }

        info!(
            "Job {} is {} ({} pages collected)",
            job_id,
            job.status,
            job.collected_pages.len()
        );
        Ok(job)
    }

    /// [`poll`](Self::poll) and convert straight to an [`ExtractionResult`].
    pub async fn poll_result(&self, job_id: &str) -> Result<ExtractionResult, PdfTextError> {
        Ok(self.poll(job_id).await?.into_result())
    }
}
