//! Optical character recognition of rendered page images.
//!
//! The default recogniser runs the `tesseract` executable once per page and
//! reads the text from its stdout.

use crate::error::PageError;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Turns one page image into text.
pub trait Recogniser: Send + Sync {
    /// Recognise `image` (page `page_num`, 1-indexed) with a tesseract-style
    /// language set such as `"eng"` or `"eng+fra"`.
    fn recognise(&self, image: &Path, page_num: usize, languages: &str)
        -> Result<String, PageError>;
}

/// [`Recogniser`] backed by the tesseract command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    command: String,
}

impl TesseractCli {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// `true` when the executable can be spawned.
    pub fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl Recogniser for TesseractCli {
    fn recognise(
        &self,
        image: &Path,
        page_num: usize,
        languages: &str,
    ) -> Result<String, PageError> {
        let output = Command::new(&self.command)
            .arg(image)
            .arg("stdout")
            .args(["-l", languages])
            .output()
            .map_err(|e| PageError::RecognitionFailed {
                page: page_num,
                detail: format!("failed to run {}: {}", self.command, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PageError::RecognitionFailed {
                page: page_num,
                detail: format!(
                    "{} exited with {}: {}",
                    self.command,
                    output.status,
                    stderr.trim()
                ),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Page {}: recognised {} chars", page_num, text.len());
        Ok(text)
    }
}
