//! Result types returned by the extraction pipeline.
//!
//! [`ExtractionResult`] is the one shape every path produces (direct
//! extraction, local OCR, a queued cloud job, a polled cloud job), so an
//! HTTP layer can serialise it without caring which strategy ran. Field names
//! serialise in camelCase and the page list serialises as `text`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text stored for a page whose local OCR failed.
pub const OCR_FAILED_SENTINEL: &str = "[OCR failed]";

/// Suggested delay before the caller polls a pending job again.
pub const RETRY_AFTER_SECS: u64 = 2;

/// Path an HTTP layer can advertise as the poll location of a queued job.
pub fn status_path(job_id: &str) -> String {
    format!("/api/ocr/status/{job_id}")
}

/// Which strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMethod {
    DirectExtraction,
    #[serde(rename = "LocalOCR")]
    LocalOcr,
    #[serde(rename = "CloudOCR")]
    CloudOcr,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::DirectExtraction => f.write_str("DirectExtraction"),
            ExtractionMethod::LocalOcr => f.write_str("LocalOCR"),
            ExtractionMethod::CloudOcr => f.write_str("CloudOCR"),
        }
    }
}

/// Provider-side state of an asynchronous OCR job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    InProgress,
    Succeeded,
    PartialSuccess,
    Failed,
}

impl JobStatus {
    /// Terminal once the job has left `IN_PROGRESS`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }

    /// Full and partial success both yield usable text.
    pub fn is_usable(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::PartialSuccess)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::PartialSuccess => "PARTIAL_SUCCESS",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text of one page (1-indexed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub page: usize,
    pub text: String,
}

impl PageText {
    pub fn new(page: usize, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.text == OCR_FAILED_SENTINEL
    }
}

/// Outcome of an extraction request or a job-status query.
///
/// Invariants upheld by every constructor in this crate: `pages` is sorted
/// ascending by page number without duplicates, and
/// `total_pages >= pages.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub success: bool,
    pub method: ExtractionMethod,
    #[serde(rename = "text")]
    pub pages: Vec<PageText>,
    pub total_pages: usize,
    #[serde(rename = "requiresOCR")]
    pub requires_ocr: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub queued: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_key: Option<String>,
}

impl ExtractionResult {
    /// A successful direct text-layer extraction.
    pub fn direct(pages: Vec<PageText>, total_pages: usize) -> Self {
        Self {
            success: true,
            method: ExtractionMethod::DirectExtraction,
            total_pages: total_pages.max(pages.len()),
            pages,
            requires_ocr: false,
            status: None,
            queued: false,
            job_id: None,
            blob_key: None,
        }
    }

    /// A finished local OCR run. `success` is false when no page was produced.
    pub fn local_ocr(pages: Vec<PageText>, total_pages: usize) -> Self {
        Self {
            success: !pages.is_empty(),
            method: ExtractionMethod::LocalOcr,
            total_pages: total_pages.max(pages.len()),
            pages,
            requires_ocr: true,
            status: None,
            queued: false,
            job_id: None,
            blob_key: None,
        }
    }

    /// Local OCR could not even open the document.
    pub fn local_ocr_failed() -> Self {
        Self::local_ocr(Vec::new(), 0)
    }

    /// A cloud job accepted by the provider; poll `job_id` for the text.
    pub fn queued(job_id: impl Into<String>, blob_key: impl Into<String>) -> Self {
        Self {
            success: false,
            method: ExtractionMethod::CloudOcr,
            pages: Vec::new(),
            total_pages: 0,
            requires_ocr: true,
            status: None,
            queued: true,
            job_id: Some(job_id.into()),
            blob_key: Some(blob_key.into()),
        }
    }

    /// A result carrying no text yet.
    pub fn unextracted(method: ExtractionMethod) -> Self {
        Self {
            success: false,
            method,
            pages: Vec::new(),
            total_pages: 0,
            requires_ocr: true,
            status: None,
            queued: false,
            job_id: None,
            blob_key: None,
        }
    }

    /// `true` while the caller should come back later: a freshly queued job,
    /// or a polled job still `IN_PROGRESS`.
    pub fn is_pending(&self) -> bool {
        self.queued || self.status == Some(JobStatus::InProgress)
    }

    /// All page texts joined with blank lines, in page order.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Number of pages carrying the OCR failure sentinel.
    pub fn failed_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_failed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_result_serialises_to_wire_shape() {
        let r = ExtractionResult::direct(vec![PageText::new(1, "hello")], 1);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(
            v,
            json!({
                "success": true,
                "method": "DirectExtraction",
                "text": [{ "page": 1, "text": "hello" }],
                "totalPages": 1,
                "requiresOCR": false
            })
        );
    }

    #[test]
    fn queued_result_carries_job_handle() {
        let r = ExtractionResult::queued("job-1", "uploads/ocr/1-a.pdf");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["success"], json!(false));
        assert_eq!(v["queued"], json!(true));
        assert_eq!(v["jobId"], json!("job-1"));
        assert_eq!(v["method"], json!("CloudOCR"));
        assert!(v.get("status").is_none());
        assert!(r.is_pending());
    }

    #[test]
    fn job_status_wire_names() {
        assert_eq!(
            serde_json::to_value(JobStatus::PartialSuccess).unwrap(),
            json!("PARTIAL_SUCCESS")
        );
        assert_eq!(
            serde_json::from_value::<JobStatus>(json!("IN_PROGRESS")).unwrap(),
            JobStatus::InProgress
        );
    }

    #[test]
    fn job_status_classification() {
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::PartialSuccess.is_usable());
        assert!(!JobStatus::Failed.is_usable());
    }

    #[test]
    fn local_ocr_without_pages_is_unsuccessful() {
        let r = ExtractionResult::local_ocr_failed();
        assert!(!r.success);
        assert!(r.requires_ocr);
        assert_eq!(r.method, ExtractionMethod::LocalOcr);
    }

    #[test]
    fn failed_pages_counts_sentinels() {
        let r = ExtractionResult::local_ocr(
            vec![
                PageText::new(1, "ok"),
                PageText::new(2, OCR_FAILED_SENTINEL),
            ],
            2,
        );
        assert_eq!(r.failed_pages(), 1);
        assert_eq!(r.full_text(), format!("ok\n\n{OCR_FAILED_SENTINEL}"));
    }

    #[test]
    fn status_path_embeds_job_id() {
        assert_eq!(status_path("abc"), "/api/ocr/status/abc");
    }
}
