//! Local OCR: rasterise each page and run the recogniser on it.
//!
//! ## Page loop
//!
//! The page count is known as soon as the document opens, so pages are
//! processed incrementally: render page N to PNG, recognise it, delete the
//! PNG, move on. Peak disk and memory use is one page image, not the whole
//! document.
//!
//! ## Failure isolation
//!
//! OCR is inherently unreliable. A render or recognition failure on one
//! page, panics included, is logged and recorded as [`OCR_FAILED_SENTINEL`];
//! the other pages keep their text and `pages.len()` still equals the page count. Only a failure to
//! open the document at all produces an unsuccessful result, and even that is
//! a structured result rather than an error.

use crate::config::ExtractionConfig;
use crate::error::{PageError, PdfTextError};
use crate::output::{ExtractionResult, PageText, OCR_FAILED_SENTINEL};
use crate::pipeline::recognise::Recogniser;
use crate::pipeline::render::{PageSource, Rasteriser};
use crate::pipeline::scratch::{ScratchFile, ScratchSpace};
use crate::pipeline::validate::ValidatedPdf;
use crate::pipeline::{Attempt, ExtractionStrategy};
use async_trait::async_trait;
use chrono::Utc;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Settings the page loop needs, copied out of [`ExtractionConfig`].
#[derive(Debug, Clone)]
pub struct LocalOcrSettings {
    pub dpi: u32,
    pub languages: String,
    pub temp_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl From<&ExtractionConfig> for LocalOcrSettings {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            dpi: config.dpi,
            languages: config.languages.clone(),
            temp_dir: config.temp_dir.clone(),
            timeout: config.local_ocr_timeout(),
        }
    }
}

/// The last tier of the chain: always concludes.
pub struct LocalRasterOcr {
    rasteriser: Arc<dyn Rasteriser>,
    recogniser: Arc<dyn Recogniser>,
    settings: LocalOcrSettings,
}

impl LocalRasterOcr {
    pub fn new(
        rasteriser: Arc<dyn Rasteriser>,
        recogniser: Arc<dyn Recogniser>,
        settings: LocalOcrSettings,
    ) -> Self {
        Self {
            rasteriser,
            recogniser,
            settings,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for LocalRasterOcr {
    fn name(&self) -> &'static str {
        "local-ocr"
    }

    async fn attempt(&self, pdf: &ValidatedPdf) -> Result<Attempt, PdfTextError> {
        let rasteriser = Arc::clone(&self.rasteriser);
        let recogniser = Arc::clone(&self.recogniser);
        let settings = self.settings.clone();
        let bytes = pdf.shared();

        let result = tokio::task::spawn_blocking(move || {
            run_local_ocr(&bytes, rasteriser.as_ref(), recogniser.as_ref(), &settings)
        })
        .await
        .unwrap_or_else(|e| {
            error!("Local OCR task panicked: {}", e);
            ExtractionResult::local_ocr_failed()
        });

        Ok(Attempt::Concluded(result))
    }
}

/// Blocking implementation of local OCR.
///
/// Document-level failures (scratch space, unreadable PDF) are downgraded to
/// an unsuccessful [`ExtractionResult`]; the scratch directory is removed on
/// every path out of this function.
pub fn run_local_ocr(
    pdf: &[u8],
    rasteriser: &dyn Rasteriser,
    recogniser: &dyn Recogniser,
    settings: &LocalOcrSettings,
) -> ExtractionResult {
    let deadline = settings.timeout.map(|t| Instant::now() + t);

    let scratch = match ScratchSpace::create(settings.temp_dir.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            error!("OCR failed: {}", e);
            return ExtractionResult::local_ocr_failed();
        }
    };

    let result = match ocr_document(pdf, &scratch, rasteriser, recogniser, settings, deadline) {
        Ok(result) => result,
        Err(e) => {
            error!("OCR failed: {}", e);
            ExtractionResult::local_ocr_failed()
        }
    };

    scratch.close();
    result
}

fn ocr_document(
    pdf: &[u8],
    scratch: &ScratchSpace,
    rasteriser: &dyn Rasteriser,
    recogniser: &dyn Recogniser,
    settings: &LocalOcrSettings,
    deadline: Option<Instant>,
) -> Result<ExtractionResult, PdfTextError> {
    let source = scratch.write_source(
        &format!("ocr-temp-{}.pdf", Utc::now().timestamp_millis()),
        pdf,
    )?;
    let document = rasteriser.open(&source)?;
    let total_pages = document.page_count();
    info!("Local OCR: {} pages at {} DPI", total_pages, settings.dpi);

    let mut pages = Vec::with_capacity(total_pages);
    for index in 0..total_pages {
        let page_num = index + 1;
        if deadline.is_some_and(|d| Instant::now() >= d) {
            warn!(
                "Local OCR deadline reached after {}/{} pages; returning partial text",
                index, total_pages
            );
            break;
        }

        let image = scratch.page_image(page_num);
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            recognise_page(document.as_ref(), recogniser, &image, index, settings)
        }));
        let text = match attempt {
            Ok(Ok(text)) => text.trim().to_string(),
            Ok(Err(e)) => {
                warn!("OCR failed on page {}: {}", page_num, e);
                OCR_FAILED_SENTINEL.to_string()
            }
            Err(payload) => {
                warn!(
                    "OCR panicked on page {}: {}",
                    page_num,
                    panic_message(payload.as_ref())
                );
                OCR_FAILED_SENTINEL.to_string()
            }
        };
        drop(image);
        pages.push(PageText::new(page_num, text));
    }

    let failed = pages.iter().filter(|p| p.is_failed()).count();
    debug!("Local OCR finished: {} pages, {} failed", pages.len(), failed);
    Ok(ExtractionResult::local_ocr(pages, total_pages))
}

fn recognise_page(
    document: &dyn PageSource,
    recogniser: &dyn Recogniser,
    image: &ScratchFile,
    index: usize,
    settings: &LocalOcrSettings,
) -> Result<String, PageError> {
    document.render_png(index, settings.dpi, image.path())?;
    recogniser.recognise(image.path(), index + 1, &settings.languages)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
