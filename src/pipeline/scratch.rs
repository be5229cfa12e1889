//! Scoped temporary files for local OCR.
//!
//! Every request gets its own [`ScratchSpace`]: a uniquely named directory
//! holding the source PDF and, one at a time, the rendered page images.
//! Release is tied to `Drop`, so the directory disappears on success, on a
//! per-page failure, on an early `?` return, and on panic unwind alike.
//! Page images are additionally removed as soon as their page is recognised
//! ([`ScratchFile`]), so a 300-page scan never holds 300 PNGs on disk.

use crate::error::PdfTextError;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

static RE_SAFE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap());

/// Reduce `candidate` to a bare file name made only of ASCII alphanumerics,
/// `.`, `-` and `_`; anything else is replaced by a generated name.
pub fn sanitize_file_name(candidate: &str) -> String {
    Path::new(candidate)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| RE_SAFE_NAME.is_match(n))
        .map(str::to_string)
        .unwrap_or_else(|| format!("tmp-{}.pdf", Utc::now().timestamp_millis()))
}

/// A per-request scratch directory, deleted on drop.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Create a fresh directory under `parent` (or the OS temp dir).
    pub fn create(parent: Option<&Path>) -> Result<Self, PdfTextError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pdftext-ocr-");
        let dir = match parent {
            Some(p) => builder.tempdir_in(p),
            None => builder.tempdir(),
        }
        .map_err(|source| PdfTextError::ScratchSpace { source })?;
        debug!("Scratch space at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `bytes` under a sanitised version of `name`.
    pub fn write_source(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, PdfTextError> {
        let path = self.dir.path().join(sanitize_file_name(name));
        std::fs::write(&path, bytes).map_err(|source| PdfTextError::ScratchSpace { source })?;
        Ok(path)
    }

    /// Reserve the image path for a 1-indexed page; the file (if any gets
    /// written) is removed when the returned guard drops.
    pub fn page_image(&self, page_num: usize) -> ScratchFile {
        ScratchFile {
            path: self.dir.path().join(format!("ocr-image.{page_num}.png")),
        }
    }

    /// Delete the directory now, logging instead of failing on error.
    pub fn close(self) {
        let shown = self.dir.path().display().to_string();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove scratch space {}: {}", shown, e);
        }
    }
}

/// A single scratch file removed on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}
