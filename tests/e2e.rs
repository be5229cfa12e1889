//! End-to-end tests for edgequake-pdftext against the real engines.
//!
//! These bind libpdfium, spawn tesseract, and (for the cloud test) talk to
//! AWS. They are gated behind the `E2E_ENABLED` environment variable so they
//! do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/opt/pdfium/lib cargo test --test e2e -- --nocapture
//!
//! Scanned fixtures are read from `./test_cases/`; tests whose fixture is
//! missing are skipped.

use edgequake_pdftext::{
    Backends, ExtractionConfig, ExtractionMethod, Extractor, OCR_FAILED_SENTINEL,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

macro_rules! e2e_skip_unless_fixture {
    ($path:expr) => {{
        e2e_skip_unless_enabled!();
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: fixture not found: {}", p.display());
            return;
        }
        p
    }};
}

fn config() -> ExtractionConfig {
    let mut builder = ExtractionConfig::builder();
    if let Ok(dir) = std::env::var("PDFIUM_LIB_PATH") {
        builder = builder.pdfium_lib_path(dir);
    }
    builder.build().unwrap()
}

/// Build a small born-digital PDF with one line of Helvetica text per page.
fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let n = pages.len();
    let font_id = 3 + 2 * n;
    let mut objects: Vec<String> = Vec::new();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".into());
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        n
    ));
    for (i, text) in pages.iter().enumerate() {
        let content_id = 4 + 2 * i;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 {font_id} 0 R >> >> /Contents {content_id} 0 R >>"
        ));
        let stream = format!("BT /F1 14 Tf 72 700 Td ({text}) Tj ET");
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".into());

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = out.len();
    let xref_header = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    out.extend_from_slice(xref_header.as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

// ── Direct extraction ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_direct_extraction_of_generated_pdf() {
    e2e_skip_unless_enabled!();

    let pdf = text_pdf(&[
        "The quick brown fox jumps over the lazy dog",
        "Pack my box with five dozen liquor jugs",
        "Sphinx of black quartz, judge my vow",
    ]);
    let config = config();
    let extractor = Extractor::new(config.clone(), Backends::local(&config).unwrap()).unwrap();
    let result = extractor.extract(&pdf).await.expect("extract() should succeed");

    assert!(result.success);
    assert_eq!(result.method, ExtractionMethod::DirectExtraction);
    assert!(!result.requires_ocr);
    assert_eq!(result.total_pages, 3);
    assert!(result.pages[0].text.contains("quick brown fox"));
    assert!(result.pages[2].text.contains("black quartz"));
    println!("{}", serde_json::to_string_pretty(&result).unwrap());
}

#[tokio::test]
async fn test_garbage_bytes_yield_unsuccessful_local_ocr() {
    e2e_skip_unless_enabled!();

    let config = config();
    let extractor = Extractor::new(config.clone(), Backends::local(&config).unwrap()).unwrap();
    let result = extractor
        .extract(b"This is not a PDF file")
        .await
        .expect("garbage is a result, not an error");

    assert!(!result.success);
    assert!(result.requires_ocr);
    assert_eq!(result.method, ExtractionMethod::LocalOcr);
}

// ── Local OCR ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_local_ocr_of_scanned_fixture() {
    let path = e2e_skip_unless_fixture!(test_cases_dir().join("scanned_letter.pdf"));

    let config = config();
    let extractor = Extractor::new(config.clone(), Backends::local(&config).unwrap()).unwrap();
    let result = extractor.extract_file(&path).await.expect("extract_file()");

    assert_eq!(result.method, ExtractionMethod::LocalOcr);
    assert!(result.requires_ocr);
    assert_eq!(result.pages.len(), result.total_pages);
    assert!(
        result.pages.iter().any(|p| p.text != OCR_FAILED_SENTINEL && !p.text.is_empty()),
        "at least one page should be recognised"
    );
    for (i, page) in result.pages.iter().enumerate() {
        assert_eq!(page.page, i + 1);
    }
}

// ── Cloud OCR ────────────────────────────────────────────────────────────────

/// Requires `E2E_ENABLED=1`, AWS credentials, and `AWS_S3_BUCKET_NAME`.
#[cfg(feature = "aws")]
#[tokio::test]
async fn test_cloud_job_round_trip() {
    let path = e2e_skip_unless_fixture!(test_cases_dir().join("scanned_letter.pdf"));
    let Ok(bucket) = std::env::var("AWS_S3_BUCKET_NAME") else {
        println!("SKIP: set AWS_S3_BUCKET_NAME to run the cloud e2e test");
        return;
    };

    let mut config = config();
    config.provider = edgequake_pdftext::OcrProvider::Cloud;
    config.cloud_only = true;
    config.blob_destination = Some(edgequake_pdftext::BlobDestination::new(bucket));
    config.aws_region = std::env::var("AWS_REGION").ok();
    let extractor = Extractor::new(config.clone(), Backends::aws(&config).await.unwrap()).unwrap();

    let queued = extractor.extract_file(&path).await.expect("launch");
    assert!(queued.queued);
    let job_id = queued.job_id.expect("queued result carries a job id");

    let mut result = extractor.job_status(&job_id).await.expect("poll");
    for _ in 0..90 {
        if !result.is_pending() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_secs(
            edgequake_pdftext::RETRY_AFTER_SECS,
        ))
        .await;
        result = extractor.job_status(&job_id).await.expect("poll");
    }

    assert!(result.success, "job ended as {:?}", result.status);
    assert_eq!(result.method, ExtractionMethod::CloudOcr);
    assert!(!result.pages.is_empty());
}
