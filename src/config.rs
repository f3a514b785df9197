//! Configuration types for PDF-to-Markdown conversion.
//!
//! Everything a run can vary lives in [`ConversionConfig`], built through
//! [`ConversionConfigBuilder`]. The CLI maps its flags onto the builder; the
//! library never reads CLI state directly.

use crate::engine::DocumentConverter;
use crate::error::Pdf2MdError;
use crate::models::DEFAULT_MODELS;
use crate::progress::ProgressCallback;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a PDF-to-Markdown conversion.
///
/// # Example
/// ```rust
/// use local_pdf2md::{ConversionConfig, PageSelection};
///
/// let config = ConversionConfig::builder()
///     .pages(PageSelection::Range(1, 5))
///     .prefetch_models(false)
///     .build()
///     .unwrap();
/// assert!(config.detect_tables);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// Page separator in the exported Markdown. Default: none.
    pub page_separator: PageSeparator,

    /// Prepend YAML front matter with document metadata. Default: false.
    pub include_metadata: bool,

    /// Rebuild tables from aligned text columns. Default: true.
    pub detect_tables: bool,

    /// Run the model pre-fetch step before converting. Default: true.
    pub prefetch_models: bool,

    /// Hub repositories fetched by the pre-fetch step.
    /// Default: [`DEFAULT_MODELS`].
    pub models: Vec<String>,

    /// Hub cache directory, used as-is (no `hub/` is appended).
    /// `None` uses the hub default, `$HF_HOME/hub`.
    pub model_cache_dir: Option<PathBuf>,

    /// Show per-file hub download progress bars. Default: true.
    pub download_progress: bool,

    /// Pre-constructed converter. When `None` the PDFium engine is
    /// provisioned and used.
    pub converter: Option<Arc<dyn DocumentConverter>>,

    /// Receives run events (paths, device, pre-fetch, pages, export).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            password: None,
            pages: PageSelection::default(),
            page_separator: PageSeparator::default(),
            include_metadata: false,
            detect_tables: true,
            prefetch_models: true,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            model_cache_dir: None,
            download_progress: true,
            converter: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("page_separator", &self.page_separator)
            .field("include_metadata", &self.include_metadata)
            .field("detect_tables", &self.detect_tables)
            .field("prefetch_models", &self.prefetch_models)
            .field("models", &self.models)
            .field("model_cache_dir", &self.model_cache_dir)
            .field("download_progress", &self.download_progress)
            .field("converter", &self.converter.as_ref().map(|c| c.name()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn include_metadata(mut self, v: bool) -> Self {
        self.config.include_metadata = v;
        self
    }

    pub fn detect_tables(mut self, v: bool) -> Self {
        self.config.detect_tables = v;
        self
    }

    pub fn prefetch_models(mut self, v: bool) -> Self {
        self.config.prefetch_models = v;
        self
    }

    /// Replace the pre-fetch list.
    pub fn models<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.models = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn model_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.model_cache_dir = Some(dir.into());
        self
    }

    pub fn download_progress(mut self, v: bool) -> Self {
        self.config.download_progress = v;
        self
    }

    pub fn converter(mut self, converter: Arc<dyn DocumentConverter>) -> Self {
        self.config.converter = Some(converter);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2MdError> {
        let c = &self.config;
        if let Some(bad) = c.models.iter().find(|m| !is_repo_id(m)) {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "model id must look like 'owner/name', got '{bad}'"
            )));
        }
        match c.pages {
            PageSelection::Single(0) => {
                return Err(Pdf2MdError::InvalidConfig(
                    "pages are 1-indexed, got 0".into(),
                ))
            }
            PageSelection::Range(start, end) if start == 0 || start > end => {
                return Err(Pdf2MdError::InvalidConfig(format!(
                    "invalid page range {start}-{end}"
                )))
            }
            PageSelection::Set(ref pages) if pages.is_empty() || pages.contains(&0) => {
                return Err(Pdf2MdError::InvalidConfig(
                    "page set must be non-empty and 1-indexed".into(),
                ))
            }
            _ => {}
        }
        Ok(self.config)
    }
}

fn is_repo_id(id: &str) -> bool {
    match id.split_once('/') {
        Some((owner, name)) => !owner.is_empty() && !name.is_empty() && !name.contains('/'),
        None => false,
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// First requested page number, for error reporting.
    pub fn first_page(&self) -> usize {
        match self {
            PageSelection::All => 1,
            PageSelection::Single(p) | PageSelection::Range(p, _) => *p,
            PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(1),
        }
    }
}

/// How to separate pages in the exported Markdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum PageSeparator {
    /// No separator; pages joined with "\n\n". (default)
    #[default]
    None,
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator string placed before page `page_num` (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}
