//! Error types for the local-pdf2md library.
//!
//! * [`Pdf2MdError`] is **fatal**: the run stops (bad input path, unreadable
//!   PDF, engine unavailable, output not writable).
//!
//! * [`PageError`] is **non-fatal**: one page could not be read, the rest of
//!   the document is still converted. Collected in
//!   [`crate::engine::ConversionResult::page_errors`].
//!
//! Model pre-fetch failures are neither: they are reported per model through
//! [`pdf2md_prefetch::FetchOutcome`] and never stop a conversion.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the local-pdf2md library.
#[derive(Debug, Error)]
pub enum Pdf2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Input exists but does not carry a `.pdf` extension.
    #[error("File must have .pdf extension: '{path}'")]
    NotPdfExtension { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The engine could not parse the document.
    #[error("PDF '{path}' is corrupt or unsupported: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched none of the document's pages.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Every selected page failed to extract.
    #[error("All {total} selected pages failed.\nFirst error: {first_error}")]
    NoPagesConverted { total: usize, first_error: String },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The PDFium engine could not be downloaded or loaded.
    #[error(
        "PDF engine unavailable: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    EngineUnavailable(#[from] pdf2md_prefetch::PrefetchError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
pub enum PageError {
    /// The engine could not load the page.
    #[error("Page {page}: could not be loaded: {detail}")]
    LoadFailed { page: usize, detail: String },

    /// The page loaded but its text layer could not be read.
    #[error("Page {page}: text extraction failed: {detail}")]
    TextFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number the error refers to.
    pub fn page(&self) -> usize {
        match self {
            PageError::LoadFailed { page, .. } | PageError::TextFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_mentions_path() {
        let e = Pdf2MdError::FileNotFound {
            path: PathBuf::from("missing.pdf"),
        };
        assert!(e.to_string().contains("missing.pdf"));
    }

    #[test]
    fn extension_error_mentions_pdf() {
        let e = Pdf2MdError::NotPdfExtension {
            path: PathBuf::from("notes.txt"),
        };
        let msg = e.to_string();
        assert!(msg.contains(".pdf"), "got: {msg}");
        assert!(msg.contains("notes.txt"), "got: {msg}");
    }

    #[test]
    fn engine_error_wraps_prefetch_error() {
        let inner = pdf2md_prefetch::PrefetchError::Download("HTTP 503".into());
        let e: Pdf2MdError = inner.into();
        assert!(e.to_string().contains("HTTP 503"));
        assert!(e.to_string().contains("PDFIUM_LIB_PATH"));
    }

    #[test]
    fn page_error_reports_page() {
        let e = PageError::TextFailed {
            page: 7,
            detail: "bad font".into(),
        };
        assert_eq!(e.page(), 7);
        assert!(e.to_string().starts_with("Page 7"));
    }
}
