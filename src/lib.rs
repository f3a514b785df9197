//! # local-pdf2md
//!
//! Convert PDF documents to Markdown locally, without sending anything to a
//! remote service.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate path (exists, .pdf) and derive the .md output path
//!  ├─ 2. Device    report the accelerator the tensor runtime can use
//!  ├─ 3. Prefetch  warm the Hugging Face cache with document models
//!  ├─ 4. Engine    locate or download PDFium, read text layers (spawn_blocking)
//!  ├─ 5. Layout    runs → headings, paragraphs, lists, tables
//!  ├─ 6. Export    Markdown + post-processing
//!  └─ 7. Output    atomic write + run statistics
//! ```
//!
//! Pre-fetch failures and single-page failures never stop a run; they are
//! reported through [`ConversionProgressCallback`] and the returned
//! [`ConversionReport`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use local_pdf2md::{convert_to_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let report = convert_to_file("document.pdf", None, &config).await?;
//!     eprintln!(
//!         "{} characters written to {}",
//!         report.stats.char_count,
//!         report.output.display()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `metal` | off     | Lets the accelerator probe report Apple Metal |
//! | `cuda`  | off     | Lets the accelerator probe report NVIDIA CUDA |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod device;
pub mod doctor;
pub mod document;
pub mod engine;
pub mod error;
pub mod input;
pub mod models;
pub mod output;
pub mod postprocess;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PageSelection, PageSeparator};
pub use convert::{convert, convert_to_file};
pub use device::Accelerator;
pub use doctor::{check_environment, EngineStatus, EnvironmentReport};
pub use document::{Block, Document, DocumentMetadata, ExportOptions, Page, Table};
pub use engine::{ConversionResult, DocumentConverter, PdfiumConverter};
pub use error::{PageError, Pdf2MdError};
pub use models::DEFAULT_MODELS;
pub use output::{ConversionOutput, ConversionReport, ConversionStats};
pub use pdf2md_prefetch::FetchOutcome;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
