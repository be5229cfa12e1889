//! Direct extraction: read the PDF's embedded text layer.
//!
//! Always tried first. Reading the text layer costs milliseconds, OCR costs
//! seconds per page, and most born-digital PDFs carry a usable layer. When the
//! layer is missing (scans) or the parser chokes, the strategy declines rather
//! than failing, and the chain moves on to OCR.

use crate::error::{Fallthrough, PdfTextError};
use crate::output::{ExtractionResult, PageText};
use crate::pipeline::render::TextLayer;
use crate::pipeline::validate::ValidatedPdf;
use crate::pipeline::{Attempt, ExtractionStrategy};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Strategy wrapping a [`TextLayer`] with the "is this real text?" check.
pub struct DirectTextExtractor {
    text_layer: Arc<dyn TextLayer>,
    min_text_chars: usize,
}

impl DirectTextExtractor {
    pub fn new(text_layer: Arc<dyn TextLayer>, min_text_chars: usize) -> Self {
        Self {
            text_layer,
            min_text_chars,
        }
    }
}

/// Decide whether per-page texts count as a real text layer.
///
/// Pages are joined with single spaces and trimmed; the result must be
/// strictly longer than `threshold` characters.
pub fn judge_text_layer(texts: Vec<String>, threshold: usize) -> Attempt {
    let combined_chars = texts.join(" ").trim().chars().count();
    if combined_chars <= threshold {
        return Attempt::Declined(Fallthrough::InsufficientText {
            chars: combined_chars,
            threshold,
        });
    }

    let total = texts.len();
    let pages = texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageText::new(i + 1, text.trim()))
        .collect();
    Attempt::Concluded(ExtractionResult::direct(pages, total))
}

#[async_trait]
impl ExtractionStrategy for DirectTextExtractor {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn attempt(&self, pdf: &ValidatedPdf) -> Result<Attempt, PdfTextError> {
        let layer = Arc::clone(&self.text_layer);
        let bytes = pdf.shared();
        let threshold = self.min_text_chars;

        let read = match tokio::task::spawn_blocking(move || layer.page_texts(&bytes)).await {
            Ok(read) => read,
            Err(e) => {
                warn!("Text-layer task panicked: {}", e);
                return Ok(Attempt::Declined(Fallthrough::Unparseable {
                    detail: format!("text layer panicked: {}", e),
                }));
            }
        };

        match read {
            Ok(texts) => {
                debug!("Text layer yielded {} pages", texts.len());
                let attempt = judge_text_layer(texts, threshold);
                if let Attempt::Concluded(ref r) = attempt {
                    info!("Direct extraction succeeded: {} pages", r.total_pages);
                }
                Ok(attempt)
            }
            Err(e) => {
                warn!("Direct text extraction failed: {}", e);
                Ok(Attempt::Declined(Fallthrough::Unparseable {
                    detail: e.to_string(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ExtractionMethod;
    use crate::pipeline::validate::validate_bytes;

    struct FixedLayer(Result<Vec<String>, String>);

    impl TextLayer for FixedLayer {
        fn page_texts(&self, _pdf: &[u8]) -> Result<Vec<String>, PdfTextError> {
            self.0
                .clone()
                .map_err(|detail| PdfTextError::CorruptPdf { detail })
        }
    }

    struct PanickingLayer;

    impl TextLayer for PanickingLayer {
        fn page_texts(&self, _pdf: &[u8]) -> Result<Vec<String>, PdfTextError> {
            panic!("malformed xref table")
        }
    }

    fn strategy(layer: FixedLayer) -> DirectTextExtractor {
        DirectTextExtractor::new(Arc::new(layer), 20)
    }

    fn pdf() -> ValidatedPdf {
        validate_bytes(b"%PDF-1.4 stub", 1024).unwrap()
    }

    #[tokio::test]
    async fn rich_text_layer_concludes() {
        let pages: Vec<String> = (1..=5).map(|i| format!("{:0>100}", i)).collect();
        let s = strategy(FixedLayer(Ok(pages)));
        match s.attempt(&pdf()).await.unwrap() {
            Attempt::Concluded(r) => {
                assert!(r.success);
                assert_eq!(r.method, ExtractionMethod::DirectExtraction);
                assert!(!r.requires_ocr);
                assert_eq!(r.total_pages, 5);
                assert_eq!(r.pages.len(), 5);
                assert_eq!(
                    r.pages.iter().map(|p| p.page).collect::<Vec<_>>(),
                    vec![1, 2, 3, 4, 5]
                );
            }
            other => panic!("expected conclusion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn thin_text_layer_declines() {
        let s = strategy(FixedLayer(Ok(vec!["  7 ".into(), "".into()])));
        match s.attempt(&pdf()).await.unwrap() {
            Attempt::Declined(Fallthrough::InsufficientText { chars, threshold }) => {
                assert_eq!(chars, 1);
                assert_eq!(threshold, 20);
            }
            other => panic!("expected decline, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn parser_error_declines_instead_of_failing() {
        let s = strategy(FixedLayer(Err("no trailer".into())));
        match s.attempt(&pdf()).await.unwrap() {
            Attempt::Declined(Fallthrough::Unparseable { detail }) => {
                assert!(detail.contains("no trailer"));
            }
            other => panic!("expected decline, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn parser_panic_declines_instead_of_failing() {
        let s = DirectTextExtractor::new(Arc::new(PanickingLayer), 20);
        match s.attempt(&pdf()).await.unwrap() {
            Attempt::Declined(Fallthrough::Unparseable { detail }) => {
                assert!(detail.contains("panicked"));
            }
            other => panic!("expected decline, got {other:?}"),
        }
    }

    #[test]
    fn threshold_is_strict() {
        let exactly = vec!["a".repeat(20)];
        assert!(matches!(
            judge_text_layer(exactly, 20),
            Attempt::Declined(_)
        ));
        let above = vec!["a".repeat(21)];
        assert!(matches!(judge_text_layer(above, 20), Attempt::Concluded(_)));
    }

    #[test]
    fn threshold_counts_across_pages() {
        let texts = vec!["a".repeat(10), "b".repeat(10)];
        // 10 + separator + 10 = 21 chars
        assert!(matches!(judge_text_layer(texts, 20), Attempt::Concluded(_)));
    }
}
