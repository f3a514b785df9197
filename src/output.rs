//! Output types returned by the conversion entry points.

use crate::device::Accelerator;
use crate::document::DocumentMetadata;
use crate::error::PageError;
use serde::Serialize;
use std::path::PathBuf;

/// In-memory result of [`crate::convert::convert`].
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Exported Markdown, already post-processed.
    pub markdown: String,
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
    pub page_errors: Vec<PageError>,
    /// 1-indexed pages with no extractable text.
    pub empty_pages: Vec<usize>,
}

/// Counters and timings for one conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionStats {
    pub accelerator: Accelerator,
    /// Models present in the hub cache after pre-fetch (0 when disabled).
    pub models_downloaded: usize,
    /// Pages in the file.
    pub total_pages: usize,
    /// Selected pages whose text layer was read.
    pub pages_converted: usize,
    pub pages_failed: usize,
    pub empty_pages: usize,
    /// Unicode scalar values in the exported Markdown.
    pub char_count: usize,
    pub conversion_duration_ms: u64,
    pub export_duration_ms: u64,
}

/// Final report of [`crate::convert::convert_to_file`]; printed by the CLI
/// as the statistics block or as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Bytes written to `output`.
    pub output_bytes: u64,
    #[serde(flatten)]
    pub stats: ConversionStats,
    /// From conversion start to the output file being in place.
    pub total_duration_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub page_errors: Vec<PageError>,
}

impl ConversionReport {
    pub fn output_kib(&self) -> f64 {
        self.output_bytes as f64 / 1024.0
    }

    pub fn conversion_secs(&self) -> f64 {
        self.stats.conversion_duration_ms as f64 / 1000.0
    }

    pub fn export_secs(&self) -> f64 {
        self.stats.export_duration_ms as f64 / 1000.0
    }

    pub fn total_secs(&self) -> f64 {
        self.total_duration_ms as f64 / 1000.0
    }
}
