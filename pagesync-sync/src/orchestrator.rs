//! Batch orchestrator.
//!
//! Processes content files strictly one at a time:
//!
//! 1. Read the file and fingerprint its bytes.
//! 2. Skip unchanged files (change detection enabled only).
//! 3. Parse and validate.
//! 4. Upload assets and rewrite placeholders.
//! 5. Create or update the page.
//! 6. Commit the fingerprint on success.
//! 7. Pause before the next item if this one touched the store.
//!
//! A failing item is recorded and the batch moves on.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};

use pagesync_core::{
    validate, Action, BatchResult, BatchStats, Discovery, ItemKey, ItemOutcome, RawContentItem,
    UpdatePolicy,
};
use pagesync_store::ContentStore;

use crate::assets;
use crate::error::SyncError;
use crate::fingerprint::{fingerprint_bytes, FingerprintStore};
use crate::report::{append_publish_log, PublishLogEntry};
use crate::upsert::{upsert, UpsertOutcome};

pub const REASON_VALIDATION: &str = "validation_failed";
pub const REASON_UNCHANGED: &str = "unchanged";
pub const REASON_LOAD: &str = "load_error";
pub const REASON_PUBLISH: &str = "publish_error";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Cancellation shared between a run and whoever wants to stop it.
///
/// Checked between items; the item in progress always completes.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDetection {
    /// Skip items whose fingerprint matches; commit fingerprints on success.
    Enabled,
    /// Publish every item; the fingerprint store is neither read nor written.
    Bypassed,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub delay: Duration,
    pub change_detection: ChangeDetection,
    pub update_policy: UpdatePolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            change_detection: ChangeDetection::Enabled,
            update_policy: UpdatePolicy::Append,
        }
    }
}

/// One discover-run-flush pass.
///
/// Pages may already have been written when `flush` fails, so the batch
/// result is always kept.
#[derive(Debug)]
pub struct CycleOutcome {
    pub result: BatchResult,
    pub flush: Result<(), SyncError>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<S> {
    store: S,
    fingerprints: FingerprintStore,
    options: BatchOptions,
    publish_log: Option<PathBuf>,
}

impl<S: ContentStore> Orchestrator<S> {
    pub fn new(store: S, fingerprints: FingerprintStore, options: BatchOptions) -> Self {
        Self {
            store,
            fingerprints,
            options,
            publish_log: None,
        }
    }

    /// Append a JSONL line per attempted upsert to `path`.
    pub fn with_publish_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.publish_log = Some(path.into());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fingerprints(&self) -> &FingerprintStore {
        &self.fingerprints
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Process every file in `items`, in order.
    pub fn run_batch(&mut self, items: &[PathBuf]) -> BatchResult {
        self.run_batch_until(items, &StopFlag::new())
    }

    /// Like [`Orchestrator::run_batch`], but stops between items once `stop`
    /// is raised. Items not started are left out and the result is marked
    /// `interrupted`.
    pub fn run_batch_until(&mut self, items: &[PathBuf], stop: &StopFlag) -> BatchResult {
        let started_at = Utc::now();
        let mut stats = BatchStats {
            total: items.len(),
            ..Default::default()
        };
        let mut results = Vec::with_capacity(items.len());
        let mut interrupted = false;

        tracing::info!("processing {} content files", items.len());

        for (i, path) in items.iter().enumerate() {
            if stop.is_raised() {
                tracing::warn!(
                    "stop requested, leaving {} of {} items unprocessed",
                    items.len() - i,
                    items.len()
                );
                interrupted = true;
                break;
            }

            tracing::info!("[{}/{}] {}", i + 1, items.len(), path.display());
            let (outcome, touched_store) = self.process(path);
            stats.record(outcome.action);
            results.push(outcome);

            let is_last = i + 1 == items.len();
            if touched_store && !is_last && !self.options.delay.is_zero() && !stop.is_raised() {
                std::thread::sleep(self.options.delay);
            }
        }

        BatchResult {
            started_at,
            finished_at: Utc::now(),
            interrupted,
            stats,
            results,
        }
    }

    /// Discover files, run them, and flush fingerprints.
    ///
    /// Missing content roots are logged and skipped. Fingerprints are flushed
    /// even when `stop` cut the batch short. Only a discovery failure is an
    /// `Err`; once items have run, their result is returned alongside the
    /// flush outcome.
    pub fn run_cycle(
        &mut self,
        discovery: &Discovery,
        stop: &StopFlag,
    ) -> Result<CycleOutcome, SyncError> {
        for root in discovery.missing_roots() {
            tracing::warn!("content directory not found: {}", root.display());
        }
        let files = discovery.files()?;
        let result = self.run_batch_until(&files, stop);
        let flush = self.flush();
        if let Err(e) = &flush {
            tracing::error!("cannot save fingerprints: {e}");
        }
        Ok(CycleOutcome { result, flush })
    }

    /// Persist fingerprints. A no-op when change detection is bypassed.
    pub fn flush(&mut self) -> Result<(), SyncError> {
        if self.options.change_detection == ChangeDetection::Enabled {
            self.fingerprints.flush()?;
        }
        Ok(())
    }

    /// One item. Returns the outcome and whether the store was contacted.
    fn process(&mut self, path: &Path) -> (ItemOutcome, bool) {
        let key = ItemKey::from_path(path);
        let detect = self.options.change_detection == ChangeDetection::Enabled;

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!("cannot read {}: {e}", path.display());
                return (
                    ItemOutcome::failed(key, REASON_LOAD, vec![e.to_string()]),
                    false,
                );
            }
        };

        let hash = fingerprint_bytes(&bytes);
        if detect && !self.fingerprints.has_changed(&key, &hash) {
            tracing::debug!("unchanged: {}", path.display());
            return (ItemOutcome::skipped(key, REASON_UNCHANGED, vec![]), false);
        }

        let item = match RawContentItem::from_slice(&bytes)
            .map_err(|e| format!("invalid JSON: {e}"))
            .and_then(|raw| validate(&raw).map_err(|e| e.to_string()))
        {
            Ok(item) => item,
            Err(msg) => {
                tracing::warn!("skipping {}: {msg}", path.display());
                return (
                    ItemOutcome::skipped(key, REASON_VALIDATION, vec![msg]),
                    false,
                );
            }
        };

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let resolution = assets::resolve(&self.store, item, base_dir);
        let mut errors: Vec<String> = resolution.errors.iter().map(|e| e.to_string()).collect();
        let item = resolution.item;

        let mut outcome = match upsert(&self.store, &item, self.options.update_policy, Local::now())
        {
            Ok(done) => {
                if detect {
                    self.fingerprints.commit(&key, &hash);
                }
                let action = match done {
                    UpsertOutcome::Created(_) => Action::Created,
                    UpsertOutcome::Updated(_) => Action::Updated,
                };
                ItemOutcome {
                    item_key: key,
                    action,
                    title: None,
                    remote_id: Some(done.id()),
                    uploaded_asset_count: resolution.uploaded.len(),
                    errors,
                    reason: None,
                }
            }
            Err(e) => {
                tracing::error!("failed to publish '{}': {e}", item.title);
                errors.push(e.to_string());
                ItemOutcome {
                    uploaded_asset_count: resolution.uploaded.len(),
                    ..ItemOutcome::failed(key, REASON_PUBLISH, errors)
                }
            }
        };
        outcome.title = Some(item.title.clone());

        if let Some(log_path) = &self.publish_log {
            let entry = PublishLogEntry {
                timestamp: Local::now(),
                item_key: outcome.item_key.clone(),
                title: item.title.clone(),
                slug: item.slug.to_string(),
                action: outcome.action,
                remote_id: outcome.remote_id,
                errors: outcome.errors.clone(),
            };
            if let Err(e) = append_publish_log(log_path, &entry) {
                tracing::warn!("cannot append publish log: {e}");
            }
        }

        (outcome, true)
    }
}
