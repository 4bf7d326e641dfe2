//! Blocking client for a WordPress-compatible REST API (`/wp-json/wp/v2`).
//!
//! Request bodies are built by free functions so they can be checked
//! without a server.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use pagesync_core::{PageId, RemotePage};

use crate::error::StoreError;
use crate::{AssetMeta, ContentStore, NewPage, PageUpdate};

const API_PATH: &str = "/wp-json/wp/v2";
const MAX_ERROR_BODY: usize = 500;

/// Authenticated REST client. Holds an application password; `Debug` never
/// prints it.
#[derive(Clone)]
pub struct WpClient {
    agent: ureq::Agent,
    api_base: String,
    username: String,
    auth_header: String,
}

impl fmt::Debug for WpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WpClient")
            .field("api_base", &self.api_base)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl WpClient {
    /// `site_url` is the site root, e.g. `https://example.org/blog`.
    pub fn new(site_url: &str, username: &str, password: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(&format!("pagesync/{}", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            api_base: api_base(site_url),
            username: username.to_string(),
            auth_header: basic_auth(username, password),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &self.auth_header)
    }
}

impl ContentStore for WpClient {
    fn lookup_by_slug(&self, slug: &str) -> Result<Vec<RemotePage>, StoreError> {
        let url = self.url("/pages");
        debug!(%slug, "looking up page by slug");
        let response = self
            .request("GET", &url)
            .query("slug", slug)
            .query("context", "edit")
            .query("status", "any")
            .call()
            .map_err(|e| from_ureq(&url, e))?;
        let pages: Vec<WirePage> = decode(&url, response)?;
        Ok(pages.into_iter().map(WirePage::into_remote).collect())
    }

    fn create_page(&self, page: &NewPage) -> Result<RemotePage, StoreError> {
        let url = self.url("/pages");
        let body = create_page_body(page, Local::now());
        let response = self
            .request("POST", &url)
            .send_json(body)
            .map_err(|e| from_ureq(&url, e))?;
        let response = expect_status(&url, response, 201)?;
        let created: WirePage = decode(&url, response)?;
        info!(id = created.id, slug = %page.slug, "created page");
        Ok(created.into_remote())
    }

    fn get_page(&self, id: PageId) -> Result<RemotePage, StoreError> {
        let url = self.url(&format!("/pages/{id}"));
        let response = self
            .request("GET", &url)
            .call()
            .map_err(|e| from_ureq(&url, e))?;
        let page: WirePage = decode(&url, response)?;
        Ok(page.into_remote())
    }

    fn update_page(&self, id: PageId, update: &PageUpdate) -> Result<RemotePage, StoreError> {
        let url = self.url(&format!("/pages/{id}"));
        let body = update_page_body(update, Local::now());
        let response = self
            .request("PUT", &url)
            .send_json(body)
            .map_err(|e| from_ureq(&url, e))?;
        let response = expect_status(&url, response, 200)?;
        let updated: WirePage = decode(&url, response)?;
        info!(id, "updated page");
        Ok(updated.into_remote())
    }

    fn upload_asset(
        &self,
        bytes: &[u8],
        filename: &str,
        meta: &AssetMeta,
    ) -> Result<String, StoreError> {
        let url = self.url("/media");
        debug!(%filename, size = bytes.len(), "uploading asset");
        let response = self
            .request("POST", &url)
            .set("Content-Type", &meta.content_type)
            .set("Content-Disposition", &content_disposition(filename))
            .query("alt_text", &meta.alt_text)
            .query("caption", &meta.caption)
            .query("description", &meta.description)
            .send_bytes(bytes)
            .map_err(|e| from_ureq(&url, e))?;
        let response = expect_status(&url, response, 201)?;
        let media: WireMedia = decode(&url, response)?;
        info!(%filename, source_url = %media.source_url, "uploaded asset");
        Ok(media.source_url)
    }

    fn test_connectivity(&self) -> bool {
        let url = self.url("/users/me");
        match self.request("GET", &url).call() {
            Ok(response) if response.status() == 200 => {
                info!(api = %self.api_base, "content store reachable");
                true
            }
            Ok(response) => {
                warn!(status = response.status(), "unexpected connectivity status");
                false
            }
            Err(e) => {
                warn!(error = %from_ureq(&url, e), "content store unreachable");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WirePage {
    id: PageId,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    content: WireContent,
}

#[derive(Debug, Default, Deserialize)]
struct WireContent {
    #[serde(default)]
    rendered: String,
}

#[derive(Debug, Deserialize)]
struct WireMedia {
    source_url: String,
}

impl WirePage {
    fn into_remote(self) -> RemotePage {
        RemotePage {
            id: self.id,
            slug: self.slug,
            rendered_content: self.content.rendered,
        }
    }
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

/// `<site>/wp-json/wp/v2`, tolerating a trailing slash on the site URL.
pub fn api_base(site_url: &str) -> String {
    format!("{}{}", site_url.trim_end_matches('/'), API_PATH)
}

/// `Authorization` header value for HTTP basic auth.
pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

pub fn create_page_body(page: &NewPage, now: DateTime<Local>) -> Value {
    json!({
        "title": page.title,
        "slug": page.slug,
        "content": page.body,
        "status": page.status.as_str(),
        "meta": page_meta(now),
    })
}

pub fn update_page_body(update: &PageUpdate, now: DateTime<Local>) -> Value {
    json!({
        "title": update.title,
        "content": update.body,
        "meta": page_meta(now),
    })
}

fn page_meta(now: DateTime<Local>) -> Value {
    json!({
        "pagesync_auto_generated": "true",
        "last_updated": now.format("%Y-%m-%dT%H:%M:%S").to_string(),
    })
}

pub fn content_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename.replace('"', ""))
}

/// MIME type guessed from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

fn from_ureq(url: &str, err: ureq::Error) -> StoreError {
    match err {
        ureq::Error::Status(code, response) => StoreError::Status {
            url: url.to_string(),
            code,
            body: truncate(response.into_string().unwrap_or_default()),
        },
        ureq::Error::Transport(transport) => StoreError::Transport {
            url: url.to_string(),
            message: transport.to_string(),
        },
    }
}

fn expect_status(
    url: &str,
    response: ureq::Response,
    expected: u16,
) -> Result<ureq::Response, StoreError> {
    if response.status() == expected {
        return Ok(response);
    }
    Err(StoreError::Status {
        url: url.to_string(),
        code: response.status(),
        body: truncate(response.into_string().unwrap_or_default()),
    })
}

fn decode<T: serde::de::DeserializeOwned>(
    url: &str,
    response: ureq::Response,
) -> Result<T, StoreError> {
    response.into_json().map_err(|e| StoreError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
