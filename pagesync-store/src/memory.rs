//! In-memory [`ContentStore`] that records every call.
//!
//! Clones share state, so a test can hand one clone to the code under test
//! and inspect the other afterwards.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use pagesync_core::{PageId, PublishStatus, RemotePage};

use crate::error::StoreError;
use crate::{AssetMeta, ContentStore, NewPage, PageUpdate};

const MEDIA_BASE: &str = "https://store.test/media";

/// One call made against a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Lookup { slug: String },
    Create { slug: String, title: String },
    Get { id: PageId },
    Update { id: PageId, body: String },
    Upload { filename: String, alt_text: String },
    Connectivity,
}

impl StoreCall {
    /// Calls that change remote state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            StoreCall::Create { .. } | StoreCall::Update { .. } | StoreCall::Upload { .. }
        )
    }
}

/// Operation that should fail with an injected HTTP 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    Lookup,
    Create,
    Get,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPage {
    pub id: PageId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: PublishStatus,
}

impl StoredPage {
    fn to_remote(&self) -> RemotePage {
        RemotePage {
            id: self.id,
            slug: self.slug.clone(),
            rendered_content: self.content.clone(),
        }
    }
}

#[derive(Debug)]
struct State {
    next_id: PageId,
    pages: BTreeMap<PageId, StoredPage>,
    uploads: Vec<(String, usize, AssetMeta)>,
    calls: Vec<StoreCall>,
    failing: HashSet<FailOn>,
    failing_uploads: HashSet<String>,
    connected: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            next_id: 1,
            pages: BTreeMap::new(),
            uploads: Vec::new(),
            calls: Vec::new(),
            failing: HashSet::new(),
            failing_uploads: HashSet::new(),
            connected: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a page. Slugs are not unique, matching real stores that allow
    /// duplicates.
    pub fn seed_page(&self, slug: &str, title: &str, content: &str) -> PageId {
        let mut state = self.state();
        let id = state.next_id;
        state.next_id += 1;
        state.pages.insert(
            id,
            StoredPage {
                id,
                title: title.to_string(),
                slug: slug.to_string(),
                content: content.to_string(),
                status: PublishStatus::Publish,
            },
        );
        id
    }

    pub fn fail_on(&self, op: FailOn) {
        self.state().failing.insert(op);
    }

    /// Uploads of this file name fail with HTTP 500.
    pub fn fail_upload_of(&self, filename: &str) {
        self.state().failing_uploads.insert(filename.to_string());
    }

    pub fn set_connected(&self, connected: bool) {
        self.state().connected = connected;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    pub fn write_calls(&self) -> usize {
        self.state().calls.iter().filter(|c| c.is_write()).count()
    }

    pub fn page(&self, id: PageId) -> Option<StoredPage> {
        self.state().pages.get(&id).cloned()
    }

    pub fn pages(&self) -> Vec<StoredPage> {
        self.state().pages.values().cloned().collect()
    }

    /// `(filename, byte length, meta)` for each accepted upload.
    pub fn uploads(&self) -> Vec<(String, usize, AssetMeta)> {
        self.state().uploads.clone()
    }

    /// URL the store hands back for an uploaded file.
    pub fn media_url(filename: &str) -> String {
        format!("{MEDIA_BASE}/{filename}")
    }
}

fn injected(op: &str) -> StoreError {
    StoreError::Status {
        url: format!("memory://{op}"),
        code: 500,
        body: "injected failure".to_string(),
    }
}

impl ContentStore for MemoryStore {
    fn lookup_by_slug(&self, slug: &str) -> Result<Vec<RemotePage>, StoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::Lookup {
            slug: slug.to_string(),
        });
        if state.failing.contains(&FailOn::Lookup) {
            return Err(injected("lookup"));
        }
        Ok(state
            .pages
            .values()
            .filter(|p| p.slug == slug)
            .map(StoredPage::to_remote)
            .collect())
    }

    fn create_page(&self, page: &NewPage) -> Result<RemotePage, StoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::Create {
            slug: page.slug.clone(),
            title: page.title.clone(),
        });
        if state.failing.contains(&FailOn::Create) {
            return Err(injected("create"));
        }
        let id = state.next_id;
        state.next_id += 1;
        let stored = StoredPage {
            id,
            title: page.title.clone(),
            slug: page.slug.clone(),
            content: page.body.clone(),
            status: page.status,
        };
        let remote = stored.to_remote();
        state.pages.insert(id, stored);
        Ok(remote)
    }

    fn get_page(&self, id: PageId) -> Result<RemotePage, StoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::Get { id });
        if state.failing.contains(&FailOn::Get) {
            return Err(injected("get"));
        }
        state
            .pages
            .get(&id)
            .map(StoredPage::to_remote)
            .ok_or_else(|| StoreError::Status {
                url: format!("memory://pages/{id}"),
                code: 404,
                body: "no such page".to_string(),
            })
    }

    fn update_page(&self, id: PageId, update: &PageUpdate) -> Result<RemotePage, StoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::Update {
            id,
            body: update.body.clone(),
        });
        if state.failing.contains(&FailOn::Update) {
            return Err(injected("update"));
        }
        let page = state.pages.get_mut(&id).ok_or_else(|| StoreError::Status {
            url: format!("memory://pages/{id}"),
            code: 404,
            body: "no such page".to_string(),
        })?;
        page.title = update.title.clone();
        page.content = update.body.clone();
        Ok(page.to_remote())
    }

    fn upload_asset(
        &self,
        bytes: &[u8],
        filename: &str,
        meta: &AssetMeta,
    ) -> Result<String, StoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::Upload {
            filename: filename.to_string(),
            alt_text: meta.alt_text.clone(),
        });
        if state.failing_uploads.contains(filename) {
            return Err(injected("media"));
        }
        state
            .uploads
            .push((filename.to_string(), bytes.len(), meta.clone()));
        Ok(Self::media_url(filename))
    }

    fn test_connectivity(&self) -> bool {
        let mut state = self.state();
        state.calls.push(StoreCall::Connectivity);
        state.connected
    }
}
