//! Pipeline stages for tiered PDF text extraction.
//!
//! Each submodule implements exactly one step. Strategies share a common
//! contract, [`ExtractionStrategy`], so the orchestrator is a short-circuiting
//! walk over an ordered list rather than a nest of conditionals.
//!
//! ## Data Flow
//!
//! ```text
//! bytes ──▶ validate ──▶ direct ──▶ (cloud launch) ──▶ local_ocr
//!                        │ text       │ queued           │ final
//!                        └─▶ done     └─▶ done           └─▶ done
//! ```
//!
//! 1. [`validate`]:  size / type gate, yields a [`validate::ValidatedPdf`]
//! 2. [`direct`]:    read the embedded text layer; declines on thin text
//! 3. [`crate::cloud::launch`]: upload + start an async job; declines on
//!    launch failure unless cloud-only
//! 4. [`local_ocr`]: rasterise + recognise page by page; always concludes
//!
//! Supporting modules: [`render`] (pdfium engine), [`recognise`] (tesseract),
//! [`scratch`] (scoped temp files).

pub mod direct;
pub mod local_ocr;
pub mod recognise;
pub mod render;
pub mod scratch;
pub mod validate;

use crate::error::{Fallthrough, PdfTextError};
use crate::output::ExtractionResult;
use async_trait::async_trait;
use validate::ValidatedPdf;

/// What a strategy made of the document.
#[derive(Debug)]
pub enum Attempt {
    /// The strategy produced the answer (final text or a queued job).
    Concluded(ExtractionResult),
    /// The strategy declined; the next one should try.
    Declined(Fallthrough),
}

/// One tier of the extraction chain.
///
/// Returning `Err` aborts the whole request; declining hands the document to
/// the next tier.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn attempt(&self, pdf: &ValidatedPdf) -> Result<Attempt, PdfTextError>;
}
