//! Hugging Face model snapshots.
//!
//! A "snapshot" here means every file of a repository's main revision,
//! fetched into the standard hub cache (`$HF_HOME/hub`, default
//! `~/.cache/huggingface/hub`). Files already in the cache are not
//! downloaded again, so a second run only costs one metadata request per
//! repository.
//!
//! Failures never abort the batch: [`prefetch_all`] records a
//! [`FetchOutcome`] per repository and moves on.

use crate::PrefetchError;
use hf_hub::api::sync::{Api, ApiBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options for the hub client.
#[derive(Debug, Clone)]
pub struct HubOptions {
    /// Show per-file download progress bars.
    pub progress: bool,
    /// Cache root override. `None` uses the hub default, which honours `HF_HOME`.
    pub cache_dir: Option<PathBuf>,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            progress: true,
            cache_dir: None,
        }
    }
}

/// A repository whose files are all present in the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub repo_id: String,
    /// Commit hash of the fetched revision.
    pub revision: String,
    /// Number of files in the snapshot.
    pub files: usize,
    /// Snapshot directory inside the cache, when at least one file was fetched.
    pub path: Option<PathBuf>,
}

/// Anything that can bring one repository into the local cache.
pub trait ModelFetcher: Send + Sync {
    fn fetch(&self, repo_id: &str) -> Result<Snapshot, PrefetchError>;
}

/// [`ModelFetcher`] backed by the `hf-hub` sync API.
pub struct HubFetcher {
    api: Api,
}

impl HubFetcher {
    pub fn new(options: &HubOptions) -> Result<Self, PrefetchError> {
        let mut builder = ApiBuilder::new().with_progress(options.progress);
        if let Some(ref dir) = options.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder
            .build()
            .map_err(|e| PrefetchError::HubClient(e.to_string()))?;
        Ok(Self { api })
    }
}

impl ModelFetcher for HubFetcher {
    fn fetch(&self, repo_id: &str) -> Result<Snapshot, PrefetchError> {
        let hub_err = |e: hf_hub::api::sync::ApiError| PrefetchError::Hub {
            repo_id: repo_id.to_string(),
            reason: e.to_string(),
        };

        let repo = self.api.model(repo_id.to_string());
        let info = repo.info().map_err(hub_err)?;
        debug!(
            "{} @ {}: {} file(s)",
            repo_id,
            info.sha,
            info.siblings.len()
        );

        let mut path = None;
        for sibling in &info.siblings {
            let local = repo.get(&sibling.rfilename).map_err(hub_err)?;
            if path.is_none() {
                path = snapshot_root(&local, &sibling.rfilename);
            }
        }

        Ok(Snapshot {
            repo_id: repo_id.to_string(),
            revision: info.sha,
            files: info.siblings.len(),
            path,
        })
    }
}

/// Walk up from a cached file to its snapshot directory.
///
/// `rfilename` may contain sub-directories (`onnx/model.onnx`), so the number
/// of levels to strip is its component count.
fn snapshot_root(file: &Path, rfilename: &str) -> Option<PathBuf> {
    let depth = Path::new(rfilename).components().count();
    file.ancestors().nth(depth).map(Path::to_path_buf)
}

// ── Batch prefetch ───────────────────────────────────────────────────────────

/// Result of fetching one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded(Snapshot),
    /// The repository does not exist or is not reachable anonymously.
    Skipped { reason: String },
    /// Any other failure (network, disk, malformed response).
    Failed { reason: String },
}

impl FetchOutcome {
    /// Sort an error into "skipped" (missing repository) or "failed".
    ///
    /// The hub reports missing or gated repositories as 404 or 401, and the
    /// message text is all the sync client exposes.
    pub fn from_error(err: &PrefetchError) -> Self {
        let reason = err.to_string();
        let lower = reason.to_lowercase();
        let missing = ["404", "401", "not found", "doesn't have"]
            .iter()
            .any(|needle| lower.contains(needle));
        if missing {
            FetchOutcome::Skipped { reason }
        } else {
            FetchOutcome::Failed { reason }
        }
    }

    pub fn is_downloaded(&self) -> bool {
        matches!(self, FetchOutcome::Downloaded(_))
    }
}

/// Events emitted by [`prefetch_all`] while it walks the list.
#[derive(Debug)]
pub enum PrefetchEvent<'a> {
    Started {
        repo_id: &'a str,
        index: usize,
        total: usize,
    },
    Finished {
        repo_id: &'a str,
        outcome: &'a FetchOutcome,
    },
}

/// Per-repository outcomes of a batch, in request order.
#[derive(Debug, Clone, Default)]
pub struct PrefetchReport {
    pub outcomes: Vec<(String, FetchOutcome)>,
}

impl PrefetchReport {
    pub fn downloaded(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_downloaded()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, FetchOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, FetchOutcome::Failed { .. }))
            .count()
    }
}

/// Fetch every repository in `repo_ids`, tolerating individual failures.
pub fn prefetch_all<F>(
    fetcher: &F,
    repo_ids: &[String],
    mut on_event: impl FnMut(PrefetchEvent<'_>),
) -> PrefetchReport
where
    F: ModelFetcher + ?Sized,
{
    let total = repo_ids.len();
    let mut report = PrefetchReport {
        outcomes: Vec::with_capacity(total),
    };

    for (index, repo_id) in repo_ids.iter().enumerate() {
        on_event(PrefetchEvent::Started {
            repo_id,
            index,
            total,
        });

        let outcome = match fetcher.fetch(repo_id) {
            Ok(snapshot) => {
                info!("Model ready: {} ({} files)", repo_id, snapshot.files);
                FetchOutcome::Downloaded(snapshot)
            }
            Err(e) => {
                let outcome = FetchOutcome::from_error(&e);
                match outcome {
                    FetchOutcome::Skipped { .. } => debug!("Model skipped: {}: {}", repo_id, e),
                    _ => warn!("Model fetch failed: {}: {}", repo_id, e),
                }
                outcome
            }
        };

        on_event(PrefetchEvent::Finished {
            repo_id,
            outcome: &outcome,
        });
        report.outcomes.push((repo_id.clone(), outcome));
    }

    report
}
