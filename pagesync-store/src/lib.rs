//! # pagesync-store
//!
//! The remote side of a sync: a [`ContentStore`] trait with a blocking
//! WordPress REST implementation ([`WpClient`]) and an in-memory one
//! ([`MemoryStore`]) for tests and dry wiring.

pub mod error;
pub mod memory;
pub mod wp;

use pagesync_core::{PageId, PublishStatus, RemotePage};

pub use error::StoreError;
pub use memory::{FailOn, MemoryStore, StoreCall, StoredPage};
pub use wp::{content_type_for, WpClient};

/// Fields sent when creating a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPage {
    pub title: String,
    pub slug: String,
    pub body: String,
    pub status: PublishStatus,
}

/// Fields sent when updating an existing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUpdate {
    pub title: String,
    pub body: String,
}

/// Metadata attached to an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMeta {
    pub alt_text: String,
    pub caption: String,
    pub description: String,
    pub content_type: String,
}

/// Remote document store addressed by slug.
///
/// Every call blocks until the store answers or the client's timeout fires.
/// Implementations never retry.
pub trait ContentStore: Send {
    /// All pages whose slug matches, in the store's order.
    fn lookup_by_slug(&self, slug: &str) -> Result<Vec<RemotePage>, StoreError>;

    fn create_page(&self, page: &NewPage) -> Result<RemotePage, StoreError>;

    fn get_page(&self, id: PageId) -> Result<RemotePage, StoreError>;

    fn update_page(&self, id: PageId, update: &PageUpdate) -> Result<RemotePage, StoreError>;

    /// Upload raw bytes and return the location the store serves them from.
    fn upload_asset(
        &self,
        bytes: &[u8],
        filename: &str,
        meta: &AssetMeta,
    ) -> Result<String, StoreError>;

    /// `true` when the store is reachable and accepts the credentials.
    fn test_connectivity(&self) -> bool;
}

/// Startup gate: a run must not process any item unless the store is
/// reachable and accepts the credentials. `location` names the store in the
/// error.
pub fn ensure_connected<S: ContentStore + ?Sized>(
    store: &S,
    location: &str,
) -> Result<(), StoreError> {
    if store.test_connectivity() {
        Ok(())
    } else {
        Err(StoreError::Connectivity(location.to_string()))
    }
}

impl<S: ContentStore + Sync + ?Sized> ContentStore for &S {
    fn lookup_by_slug(&self, slug: &str) -> Result<Vec<RemotePage>, StoreError> {
        (**self).lookup_by_slug(slug)
    }

    fn create_page(&self, page: &NewPage) -> Result<RemotePage, StoreError> {
        (**self).create_page(page)
    }

    fn get_page(&self, id: PageId) -> Result<RemotePage, StoreError> {
        (**self).get_page(id)
    }

    fn update_page(&self, id: PageId, update: &PageUpdate) -> Result<RemotePage, StoreError> {
        (**self).update_page(id, update)
    }

    fn upload_asset(
        &self,
        bytes: &[u8],
        filename: &str,
        meta: &AssetMeta,
    ) -> Result<String, StoreError> {
        (**self).upload_asset(bytes, filename, meta)
    }

    fn test_connectivity(&self) -> bool {
        (**self).test_connectivity()
    }
}
