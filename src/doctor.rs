//! Environment check behind `pdf2md --check-deps`.
//!
//! Never downloads anything: it only reports what a conversion would find.

use crate::device::Accelerator;
use pdf2md_prefetch::{bind_engine, locate_engine, EngineSource};
use serde::Serialize;
use std::path::PathBuf;

/// State of the PDF engine library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineStatus {
    /// Found and loaded.
    Ready { path: PathBuf, source: String },
    /// Found but could not be loaded.
    Broken { path: PathBuf, reason: String },
    /// Not installed; the first conversion will download it.
    Missing,
}

/// Result of [`check_environment`].
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentReport {
    pub engine: EngineStatus,
    pub accelerator: Accelerator,
}

impl EnvironmentReport {
    /// `true` when a conversion can run without provisioning anything.
    pub fn is_ready(&self) -> bool {
        matches!(self.engine, EngineStatus::Ready { .. })
    }
}

/// Look for the engine, try to load it, and probe the accelerator.
pub fn check_environment() -> EnvironmentReport {
    let engine = match locate_engine() {
        None => EngineStatus::Missing,
        Some(lib) => match bind_engine(&lib.path) {
            Ok(_) => EngineStatus::Ready {
                source: source_label(lib.source).to_string(),
                path: lib.path,
            },
            Err(e) => EngineStatus::Broken {
                path: lib.path,
                reason: e.to_string(),
            },
        },
    };

    EnvironmentReport {
        engine,
        accelerator: Accelerator::probe(),
    }
}

fn source_label(source: EngineSource) -> &'static str {
    match source {
        EngineSource::EnvOverride => "PDFIUM_LIB_PATH",
        EngineSource::Cache => "cache",
        EngineSource::Downloaded => "download",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_follows_engine_status() {
        let ready = EnvironmentReport {
            engine: EngineStatus::Ready {
                path: PathBuf::from("/opt/libpdfium.so"),
                source: "cache".into(),
            },
            accelerator: Accelerator::Cpu,
        };
        assert!(ready.is_ready());

        let missing = EnvironmentReport {
            engine: EngineStatus::Missing,
            accelerator: Accelerator::Cpu,
        };
        assert!(!missing.is_ready());
    }

    #[test]
    fn status_serialises_with_tag() {
        let json = serde_json::to_value(EngineStatus::Broken {
            path: PathBuf::from("/x/libpdfium.so"),
            reason: "bad ELF".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "broken");
        assert_eq!(json["reason"], "bad ELF");
    }
}
