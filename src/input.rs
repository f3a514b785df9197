//! Input validation and output path derivation.
//!
//! Checks run in a fixed order so the error a user sees is predictable:
//! existence first, then the `.pdf` extension, then readability. File
//! contents are left to the engine.

use crate::error::Pdf2MdError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate the user-supplied input path.
pub fn validate_input(path: impl AsRef<Path>) -> Result<PathBuf, Pdf2MdError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(Pdf2MdError::FileNotFound { path });
    }

    if !has_pdf_extension(&path) {
        return Err(Pdf2MdError::NotPdfExtension { path });
    }

    if path.is_file() {
        if let Err(e) = std::fs::File::open(&path) {
            return Err(match e.kind() {
                std::io::ErrorKind::PermissionDenied => Pdf2MdError::PermissionDenied { path },
                _ => Pdf2MdError::FileNotFound { path },
            });
        }
    }

    debug!("Validated input PDF: {}", path.display());
    Ok(path)
}

/// `true` when the extension is `pdf`, ignoring case.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Explicit output wins; otherwise the input with its extension replaced by `.md`.
pub fn derive_output_path(input: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(p) => p.to_path_buf(),
        None => input.with_extension("md"),
    }
}

/// Absolute form of `path` for display; falls back to the path as given.
pub fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
