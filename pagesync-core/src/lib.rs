//! pagesync core library: content types, loading, validation, config.
//!
//! Public API surface:
//! - [`types`]: content items, remote pages, batch results
//! - [`content`]: loading and discovering content files on disk
//! - [`validate`]: the boundary check that turns raw items into [`ContentItem`]s
//! - [`config`]: YAML configuration with defaults
//! - [`error`]: [`ContentError`], [`ValidationError`], [`LoadError`], [`ConfigError`]

pub mod config;
pub mod content;
pub mod error;
pub mod types;
pub mod validate;

pub use config::Config;
pub use content::{discover, load_item, validate_files, Discovery};
pub use error::{ConfigError, ContentError, LoadError, ValidationError};
pub use types::{
    Action, AssetRef, BatchResult, BatchStats, ContentItem, ItemKey, ItemOutcome, PageId,
    PublishStatus, RawContentItem, RemotePage, Slug, UpdatePolicy,
};
pub use validate::{is_valid, validate};
