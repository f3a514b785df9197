//! PDFium-backed converter.
//!
//! Two passes over the selected pages: first read every page's text layer
//! into positioned runs (firing a progress event per page), then measure the
//! document's body-text height and lay each page out into blocks.

use super::layout::{analyze_page, body_height, normalise_run_text, LayoutOptions, TextRun};
use super::{ConversionResult, DocumentConverter};
use crate::config::{ConversionConfig, PageSelection};
use crate::document::{Document, DocumentMetadata, Page};
use crate::error::{PageError, Pdf2MdError};
use crate::progress::ConversionProgressCallback;
use pdf2md_prefetch::bind_engine;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Fallback body height when no page carries any text.
const DEFAULT_BODY_HEIGHT: f32 = 10.0;

/// Converter that reads PDF text layers through a PDFium shared library.
#[derive(Debug, Clone)]
pub struct PdfiumConverter {
    library: PathBuf,
    password: Option<String>,
    pages: PageSelection,
    layout: LayoutOptions,
}

impl PdfiumConverter {
    /// `library` is the PDFium shared library to bind, usually from
    /// [`pdf2md_prefetch::ensure_engine`].
    pub fn new(library: impl Into<PathBuf>, config: &ConversionConfig) -> Self {
        Self {
            library: library.into(),
            password: config.password.clone(),
            pages: config.pages.clone(),
            layout: LayoutOptions {
                detect_tables: config.detect_tables,
                ..LayoutOptions::default()
            },
        }
    }
}

impl DocumentConverter for PdfiumConverter {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn convert(
        &self,
        pdf_path: &Path,
        progress: Option<&dyn ConversionProgressCallback>,
    ) -> Result<ConversionResult, Pdf2MdError> {
        let pdfium = bind_engine(&self.library)?;
        let password = self.password.as_deref();

        let document = pdfium
            .load_pdf_from_file(pdf_path, password)
            .map_err(|e| open_error(pdf_path, password.is_some(), &e))?;

        let metadata = read_metadata(&document);
        let total = metadata.page_count;
        let indices = self.pages.to_indices(total);
        if indices.is_empty() {
            return Err(Pdf2MdError::PageOutOfRange {
                page: self.pages.first_page(),
                total,
            });
        }

        let selected = indices.len();
        info!("PDF loaded: {} pages, {} selected", total, selected);
        if let Some(cb) = progress {
            cb.on_document_opened(selected);
        }

        let mut extracted: Vec<(usize, Vec<TextRun>)> = Vec::with_capacity(selected);
        let mut page_errors = Vec::new();

        for &idx in &indices {
            let page_num = idx + 1;
            match extract_runs(document.pages(), idx) {
                Ok(runs) => {
                    debug!("Page {}: {} text runs", page_num, runs.len());
                    if let Some(cb) = progress {
                        cb.on_page_extracted(page_num, selected, runs.len());
                    }
                    extracted.push((page_num, runs));
                }
                Err(err) => {
                    warn!("{}", err);
                    if let Some(cb) = progress {
                        cb.on_page_error(page_num, selected, &err.to_string());
                    }
                    page_errors.push(err);
                }
            }
        }

        if extracted.is_empty() {
            return Err(Pdf2MdError::NoPagesConverted {
                total: selected,
                first_error: page_errors
                    .first()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            });
        }

        let body = body_height(extracted.iter().flat_map(|(_, runs)| runs.iter()))
            .unwrap_or(DEFAULT_BODY_HEIGHT);
        debug!("Body text height: {:.1}pt", body);

        let mut pages = Vec::with_capacity(extracted.len());
        let mut empty_pages = Vec::new();
        for (number, runs) in extracted {
            let blocks = analyze_page(&runs, body, &self.layout);
            if blocks.is_empty() {
                empty_pages.push(number);
            }
            pages.push(Page { number, blocks });
        }

        Ok(ConversionResult {
            document: Document { metadata, pages },
            page_errors,
            empty_pages,
        })
    }
}

fn open_error(path: &Path, had_password: bool, err: &PdfiumError) -> Pdf2MdError {
    let detail = format!("{:?}", err);
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            Pdf2MdError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            Pdf2MdError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        Pdf2MdError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

fn read_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}

/// Read one page's text segments, converted to top-left origin.
fn extract_runs(pages: &PdfPages<'_>, idx: usize) -> Result<Vec<TextRun>, PageError> {
    let page_num = idx + 1;
    let page = pages.get(idx as u16).map_err(|e| PageError::LoadFailed {
        page: page_num,
        detail: format!("{:?}", e),
    })?;
    let page_height = page.height().value;

    let text = page.text().map_err(|e| PageError::TextFailed {
        page: page_num,
        detail: format!("{:?}", e),
    })?;

    let mut runs = Vec::new();
    for segment in text.segments().iter() {
        let content = normalise_run_text(&segment.text());
        let content = content.trim();
        if content.is_empty() {
            continue;
        }

        let bounds = segment.bounds();
        let height = bounds.top().value - bounds.bottom().value;
        if height <= 0.0 {
            continue;
        }

        runs.push(TextRun {
            text: content.to_string(),
            x: bounds.left().value,
            y: page_height - bounds.top().value,
            width: bounds.right().value - bounds.left().value,
            height,
        });
    }

    Ok(runs)
}
