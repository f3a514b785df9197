//! Progress-callback trait for run events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to be told
//! what the run is doing: resolved paths, the accelerator label, each model
//! fetched, engine download bytes, each page extracted, and the export.
//!
//! The library itself never prints; the `pdf2md` binary renders these events
//! on the terminal.
//!
//! # Example
//!
//! ```rust
//! use local_pdf2md::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl ConversionProgressCallback for PageCounter {
//!     fn on_page_extracted(&self, page_num: usize, total_pages: usize, text_runs: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}: {text_runs} text runs");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(PageCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::device::Accelerator;
use pdf2md_prefetch::FetchOutcome;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Called by the pipeline as the run progresses.
///
/// Page events are fired from the blocking thread that runs the converter,
/// hence `Send + Sync`. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Input validated and output path decided.
    fn on_paths_resolved(&self, input: &Path, output: &Path) {
        let _ = (input, output);
    }

    /// The accelerator label chosen for logging.
    fn on_device_selected(&self, accelerator: Accelerator) {
        let _ = accelerator;
    }

    /// Model pre-fetch is about to start.
    fn on_prefetch_start(&self, total_models: usize) {
        let _ = total_models;
    }

    /// One model fetch is starting.
    fn on_model_start(&self, repo_id: &str) {
        let _ = repo_id;
    }

    /// One model fetch finished, successfully or not.
    fn on_model_finished(&self, repo_id: &str, outcome: &FetchOutcome) {
        let _ = (repo_id, outcome);
    }

    /// Model pre-fetch finished.
    fn on_prefetch_complete(&self, downloaded: usize) {
        let _ = downloaded;
    }

    /// Engine library download progress (first run only).
    fn on_engine_download(&self, downloaded: u64, total: Option<u64>) {
        let _ = (downloaded, total);
    }

    /// The converter is about to be invoked.
    fn on_conversion_start(&self) {}

    /// The engine opened the document; `total_pages` is the selected count.
    fn on_document_opened(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// One page's text layer was read; `text_runs` positioned runs found.
    fn on_page_extracted(&self, page_num: usize, total_pages: usize, text_runs: usize) {
        let _ = (page_num, total_pages, text_runs);
    }

    /// One page failed; the run continues.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// The converter returned.
    fn on_conversion_complete(&self, elapsed: Duration) {
        let _ = elapsed;
    }

    /// Markdown export is about to start.
    fn on_export_start(&self) {}
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
