//! Model pre-fetch step.
//!
//! Warms the shared Hugging Face cache with the layout, table-structure and
//! detection models used by document-understanding pipelines, so the first
//! real conversion does not stall on downloads. Every failure is local to
//! its model: the step always completes and reports how many models are
//! ready.

use crate::config::ConversionConfig;
use crate::progress::ConversionProgressCallback;
use pdf2md_prefetch::{prefetch_all, HubFetcher, HubOptions, PrefetchEvent, PrefetchReport};
use tracing::{info, warn};

/// Repositories fetched by default, in fetch order.
pub const DEFAULT_MODELS: &[&str] = &[
    // core document models
    "ds4sd/docling-models",
    "docling-project/docling-models",
    // layout
    "docling-project/docling-layout-heron",
    "ds4sd/docling-ibm-granite-dense-layout-heron",
    // table structure
    "ds4sd/docling-tableformer",
    "docling-project/tableformer",
    // element detection
    "PekingU/rtdetr_r50vd",
];

/// Run the pre-fetch step synchronously.
///
/// Blocking: call from `spawn_blocking` inside an async context.
pub fn prefetch_models(
    config: &ConversionConfig,
    progress: Option<&dyn ConversionProgressCallback>,
) -> PrefetchReport {
    if let Some(cb) = progress {
        cb.on_prefetch_start(config.models.len());
    }

    let options = HubOptions {
        progress: config.download_progress,
        cache_dir: config.model_cache_dir.clone(),
    };

    let report = match HubFetcher::new(&options) {
        Ok(fetcher) => prefetch_all(&fetcher, &config.models, |event| {
            if let Some(cb) = progress {
                match event {
                    PrefetchEvent::Started { repo_id, .. } => cb.on_model_start(repo_id),
                    PrefetchEvent::Finished { repo_id, outcome } => {
                        cb.on_model_finished(repo_id, outcome)
                    }
                }
            }
        }),
        Err(e) => {
            warn!("Model pre-fetch disabled: {}", e);
            PrefetchReport::default()
        }
    };

    info!(
        "Models ready: {} (skipped {}, failed {})",
        report.downloaded(),
        report.skipped(),
        report.failed()
    );
    if let Some(cb) = progress {
        cb.on_prefetch_complete(report.downloaded());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_list_is_well_formed() {
        assert_eq!(DEFAULT_MODELS.len(), 7);
        assert!(DEFAULT_MODELS.iter().all(|m| m.split('/').count() == 2));
        assert_eq!(DEFAULT_MODELS.last(), Some(&"PekingU/rtdetr_r50vd"));
    }

    #[test]
    fn empty_list_reports_zero_without_network() {
        let config = ConversionConfig::builder()
            .models(Vec::<String>::new())
            .build()
            .unwrap();
        let report = prefetch_models(&config, None);
        assert_eq!(report.downloaded(), 0);
        assert!(report.outcomes.is_empty());
    }
}
