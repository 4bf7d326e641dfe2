//! Asset resolver: upload an item's local binaries and swap their
//! placeholders for the store's URLs.

use std::path::{Path, PathBuf};

use pagesync_core::{AssetRef, ContentItem};
use pagesync_store::{content_type_for, AssetMeta, ContentStore};

use crate::error::AssetError;

/// An asset the store accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub original: PathBuf,
    pub url: String,
}

/// The item with every successful placeholder rewritten, plus per-asset
/// results in declared order.
#[derive(Debug)]
pub struct AssetResolution {
    pub item: ContentItem,
    pub uploaded: Vec<UploadedAsset>,
    pub errors: Vec<AssetError>,
}

/// Upload each asset of `item` and rewrite its body.
///
/// Relative asset paths are resolved against `base_dir` (the content file's
/// directory). A failed asset keeps its placeholder in the body and never
/// fails the item.
pub fn resolve<S: ContentStore + ?Sized>(
    store: &S,
    mut item: ContentItem,
    base_dir: &Path,
) -> AssetResolution {
    let mut uploaded = Vec::new();
    let mut errors = Vec::new();

    for asset in &item.assets {
        match upload_one(store, asset, base_dir) {
            Ok(url) => {
                item.body = item.body.replace(&asset.placeholder, &url);
                uploaded.push(UploadedAsset {
                    original: asset.local_path.clone(),
                    url,
                });
            }
            Err(e) => {
                tracing::warn!("{}: {e}", item.slug);
                errors.push(e);
            }
        }
    }

    AssetResolution {
        item,
        uploaded,
        errors,
    }
}

fn upload_one<S: ContentStore + ?Sized>(
    store: &S,
    asset: &AssetRef,
    base_dir: &Path,
) -> Result<String, AssetError> {
    let path = base_dir.join(&asset.local_path);
    if asset.placeholder.is_empty() {
        return Err(AssetError::EmptyPlaceholder { path });
    }
    if !path.is_file() {
        return Err(AssetError::NotFound { path });
    }
    let bytes = std::fs::read(&path).map_err(|source| AssetError::Read {
        path: path.clone(),
        source,
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "asset".to_string());
    let meta = asset_meta(asset, &path);

    store
        .upload_asset(&bytes, &filename, &meta)
        .map_err(|source| AssetError::Upload { path, source })
}

/// Upload metadata; `alt_text` falls back to the file stem.
pub fn asset_meta(asset: &AssetRef, path: &Path) -> AssetMeta {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let alt_text = asset
        .alt_text
        .clone()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| stem.clone());
    AssetMeta {
        alt_text,
        caption: format!("NeuroSwarm - {stem}"),
        description: "Auto-uploaded asset for NeuroSwarm content".to_string(),
        content_type: content_type_for(path).to_string(),
    }
}
