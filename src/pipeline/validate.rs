//! Input validation: the gate every buffer passes before any strategy runs.
//!
//! Validation is pure: no I/O, no logging side effects beyond a debug line.
//! A successful check yields a [`ValidatedPdf`], the only input type the
//! strategies accept, so an unchecked buffer cannot reach them.

use crate::error::PdfTextError;
use std::sync::Arc;
use tracing::debug;

/// The only content type accepted for uploads.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A PDF buffer that passed validation.
///
/// Cloning is cheap (shared `Arc<[u8]>`), which lets a strategy move the
/// bytes into a blocking task without copying 50 MB.
#[derive(Clone)]
pub struct ValidatedPdf {
    bytes: Arc<[u8]>,
}

impl ValidatedPdf {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn shared(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for ValidatedPdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedPdf")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// An upload as it arrives from a transport layer: maybe a body, maybe a
/// declared content type.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub bytes: Option<Vec<u8>>,
    pub content_type: Option<String>,
}

impl Upload {
    pub fn pdf(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
            content_type: Some(PDF_CONTENT_TYPE.to_string()),
        }
    }
}

/// Enforce the size ceiling on a byte buffer.
pub fn validate_bytes(bytes: &[u8], max_bytes: usize) -> Result<ValidatedPdf, PdfTextError> {
    if bytes.len() > max_bytes {
        return Err(PdfTextError::PayloadTooLarge {
            actual: bytes.len(),
            max: max_bytes,
        });
    }
    debug!("Validated input: {} bytes (limit {})", bytes.len(), max_bytes);
    Ok(ValidatedPdf {
        bytes: Arc::from(bytes),
    })
}

/// Validate an upload: it must carry a body, any declared content type must
/// be `application/pdf`, and the body must fit the size ceiling.
pub fn validate_upload(upload: Upload, max_bytes: usize) -> Result<ValidatedPdf, PdfTextError> {
    if let Some(ref ct) = upload.content_type {
        let essence = ct.split(';').next().unwrap_or_default().trim();
        if !essence.eq_ignore_ascii_case(PDF_CONTENT_TYPE) {
            return Err(PdfTextError::InvalidInputType {
                found: format!("content type '{}'", ct),
            });
        }
    }

    let bytes = upload.bytes.ok_or_else(|| PdfTextError::InvalidInputType {
        found: "no file body".to_string(),
    })?;

    if bytes.len() > max_bytes {
        return Err(PdfTextError::PayloadTooLarge {
            actual: bytes.len(),
            max: max_bytes,
        });
    }
    Ok(ValidatedPdf {
        bytes: Arc::from(bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn accepts_buffer_at_limit() {
        let buf = vec![0u8; 64];
        let pdf = assert_ok!(validate_bytes(&buf, 64));
        assert_eq!(pdf.len(), 64);
    }

    #[test]
    fn rejects_buffer_over_limit_with_sizes() {
        let buf = vec![0u8; 65];
        match validate_bytes(&buf, 64) {
            Err(PdfTextError::PayloadTooLarge { actual, max }) => {
                assert_eq!(actual, 65);
                assert_eq!(max, 64);
            }
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn upload_without_body_is_invalid_type() {
        let upload = Upload {
            bytes: None,
            content_type: None,
        };
        let err = assert_err!(validate_upload(upload, 1024));
        assert!(matches!(err, PdfTextError::InvalidInputType { .. }));
    }

    #[test]
    fn upload_with_wrong_content_type_is_invalid_type() {
        let upload = Upload {
            bytes: Some(b"%PDF-1.7".to_vec()),
            content_type: Some("text/plain".into()),
        };
        let err = assert_err!(validate_upload(upload, 1024));
        assert!(err.to_string().contains("text/plain"));
    }

    #[test]
    fn upload_content_type_parameters_are_ignored() {
        let upload = Upload {
            bytes: Some(b"%PDF-1.7".to_vec()),
            content_type: Some("Application/PDF; charset=binary".into()),
        };
        assert_ok!(validate_upload(upload, 1024));
    }

    #[test]
    fn upload_over_limit_is_too_large() {
        let err = assert_err!(validate_upload(Upload::pdf(vec![1u8; 10]), 9));
        assert!(matches!(err, PdfTextError::PayloadTooLarge { .. }));
    }

    #[test]
    fn validated_pdf_shares_bytes() {
        let pdf = validate_bytes(b"%PDF", 10).unwrap();
        let a = pdf.shared();
        let b = pdf.clone().shared();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
