//! # pdf2md-prefetch
//!
//! Pre-flight fetching of everything the local conversion pipeline needs
//! before it touches a document:
//!
//! * [`hub`]: snapshot downloads of Hugging Face model repositories into the
//!   shared hub cache, one repository at a time, with per-repository outcomes
//!   instead of a single pass/fail.
//! * [`engine`]: the PDFium shared library: located via `PDFIUM_LIB_PATH`,
//!   the local cache, or downloaded from
//!   [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries).
//!
//! Both halves are blocking. Call them from `spawn_blocking` (or a plain
//! thread) when running inside an async runtime.
//!
//! ```rust,no_run
//! use pdf2md_prefetch::{hub, engine};
//!
//! let fetcher = hub::HubFetcher::new(&hub::HubOptions::default()).unwrap();
//! let ids = vec!["PekingU/rtdetr_r50vd".to_string()];
//! let report = hub::prefetch_all(&fetcher, &ids, |_| {});
//! println!("downloaded {} model(s)", report.downloaded());
//!
//! let lib = engine::ensure_engine(None).unwrap();
//! let pdfium = engine::bind_engine(&lib.path).unwrap();
//! # drop(pdfium);
//! ```

use std::path::PathBuf;
use thiserror::Error;

pub mod engine;
pub mod hub;

pub use engine::{bind_engine, ensure_engine, locate_engine, EngineLibrary, EngineSource};
pub use hub::{
    prefetch_all, FetchOutcome, HubFetcher, HubOptions, ModelFetcher, PrefetchEvent,
    PrefetchReport, Snapshot,
};

/// Errors raised while fetching models or the engine library.
#[derive(Error, Debug)]
pub enum PrefetchError {
    /// A hub request for one repository failed.
    #[error("Hub request for '{repo_id}' failed: {reason}")]
    Hub { repo_id: String, reason: String },

    /// The hub client itself could not be constructed.
    #[error("Could not initialise the model hub client: {0}")]
    HubClient(String),

    /// No prebuilt PDFium exists for this OS/architecture.
    #[error("Unsupported platform for the PDFium engine: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// The engine cache directory could not be created or written.
    #[error("Engine cache directory error at '{path}': {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine archive could not be downloaded.
    #[error("Engine download failed: {0}")]
    Download(String),

    /// The engine archive was downloaded but the library could not be extracted.
    #[error("Engine archive extraction failed: {0}")]
    Extract(String),

    /// The library exists on disk but PDFium refused to load it.
    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}
