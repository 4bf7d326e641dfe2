//! Domain types for content items and batch results.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Content items deserialize from JSON; batch results serialize to the JSON
//! report sink.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The store's natural key for a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(pub String);

impl Slug {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Slug {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Slug {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identity of a content item across runs: its source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(pub String);

impl ItemKey {
    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ItemKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Remote page identifier assigned by the store.
pub type PageId = u64;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Publish state sent on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Draft,
    #[default]
    Publish,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Draft => "draft",
            PublishStatus::Publish => "publish",
        }
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an update treats the page's existing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpdatePolicy {
    /// Keep the existing content and add a change note before the new content.
    #[default]
    Append,
    /// Send the new content as-is.
    Replace,
}

/// What happened to one item during a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Updated,
    Skipped,
    Failed,
}

impl Action {
    pub fn is_success(&self) -> bool {
        matches!(self, Action::Created | Action::Updated)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Created => write!(f, "created"),
            Action::Updated => write!(f, "updated"),
            Action::Skipped => write!(f, "skipped"),
            Action::Failed => write!(f, "failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Content items
// ---------------------------------------------------------------------------

/// A local binary referenced by a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    #[serde(rename = "path", alias = "localPath", alias = "local_path")]
    pub local_path: PathBuf,
    /// Literal text in the body replaced by the uploaded location.
    pub placeholder: String,
    #[serde(default, alias = "altText", skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// A content item exactly as found on disk. Required fields may be absent;
/// [`crate::validate`] is the only place that inspects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawContentItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, rename = "content", alias = "body")]
    pub body: Option<String>,
    #[serde(default)]
    pub assets: Vec<AssetRef>,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl RawContentItem {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// A validated, publishable content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub title: String,
    pub slug: Slug,
    pub body: String,
    pub assets: Vec<AssetRef>,
    pub status: PublishStatus,
    pub format: Option<String>,
}

/// The store's representation of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePage {
    pub id: PageId,
    pub slug: String,
    pub rendered_content: String,
}

// ---------------------------------------------------------------------------
// Batch results
// ---------------------------------------------------------------------------

/// Per-item record in a [`BatchResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub item_key: ItemKey,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub remote_id: Option<PageId>,
    pub uploaded_asset_count: usize,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ItemOutcome {
    pub fn skipped(item_key: ItemKey, reason: &str, errors: Vec<String>) -> Self {
        Self {
            item_key,
            action: Action::Skipped,
            title: None,
            remote_id: None,
            uploaded_asset_count: 0,
            errors,
            reason: Some(reason.to_string()),
        }
    }

    pub fn failed(item_key: ItemKey, reason: &str, errors: Vec<String>) -> Self {
        Self {
            action: Action::Failed,
            ..Self::skipped(item_key, reason, errors)
        }
    }
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchStats {
    pub fn record(&mut self, action: Action) {
        match action {
            Action::Created | Action::Updated => self.succeeded += 1,
            Action::Failed => self.failed += 1,
            Action::Skipped => self.skipped += 1,
        }
    }
}

/// Immutable report of one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Set when cancellation stopped the run before every item was visited.
    #[serde(default)]
    pub interrupted: bool,
    pub stats: BatchStats,
    pub results: Vec<ItemOutcome>,
}

impl BatchResult {
    pub fn has_failures(&self) -> bool {
        self.stats.failed > 0
    }

    /// Number of outcomes with the given action.
    pub fn count(&self, action: Action) -> usize {
        self.results.iter().filter(|r| r.action == action).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
