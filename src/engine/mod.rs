//! Document conversion engines.
//!
//! [`DocumentConverter`] is the seam between the run pipeline and whatever
//! turns a PDF into a [`Document`]. The shipped implementation is
//! [`pdfium::PdfiumConverter`]: PDFium reads the text layer and
//! [`layout`] turns positioned text into headings, paragraphs, lists and
//! tables. Tests inject their own converters through
//! [`crate::config::ConversionConfigBuilder::converter`].

pub mod layout;
pub mod pdfium;

use crate::document::Document;
use crate::error::{PageError, Pdf2MdError};
use crate::progress::ConversionProgressCallback;
use std::path::Path;

pub use self::pdfium::PdfiumConverter;

/// Converts one PDF file into a structured [`Document`].
///
/// Implementations are blocking; the pipeline calls them from
/// `spawn_blocking`.
pub trait DocumentConverter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Convert `pdf_path`, reporting per-page events to `progress`.
    fn convert(
        &self,
        pdf_path: &Path,
        progress: Option<&dyn ConversionProgressCallback>,
    ) -> Result<ConversionResult, Pdf2MdError>;
}

/// What a converter hands back.
#[derive(Debug, Clone, Default)]
pub struct ConversionResult {
    pub document: Document,
    /// Pages that could not be read. The run continues past them.
    pub page_errors: Vec<PageError>,
    /// 1-indexed pages that were read but produced no text, typically
    /// scanned images without a text layer.
    pub empty_pages: Vec<usize>,
}
