//! # pagesync-sync
//!
//! Change detection, asset resolution, upserts, and the batch orchestrator
//! that ties them together.
//!
//! Build an [`Orchestrator`] around any [`pagesync_store::ContentStore`] and
//! call [`Orchestrator::run_batch`] for a one-shot run or
//! [`Orchestrator::run_cycle`] for a discover-run-flush pass.

pub mod assets;
pub mod error;
pub mod fingerprint;
pub mod orchestrator;
pub mod report;
pub mod upsert;

pub use assets::{resolve, AssetResolution, UploadedAsset};
pub use error::{AssetError, SyncError, UpsertError};
pub use fingerprint::{fingerprint_bytes, fingerprint_file, FingerprintStore};
pub use orchestrator::{BatchOptions, ChangeDetection, CycleOutcome, Orchestrator, StopFlag};
pub use report::{append_publish_log, latest_report, load_report, save_report, PublishLogEntry};
pub use upsert::{change_note, upsert, UpsertOutcome};
