//! Config file + flag merging shared by every command.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pagesync_core::{Config, UpdatePolicy};
use pagesync_store::{ensure_connected, ContentStore, WpClient};
use pagesync_sync::{BatchOptions, ChangeDetection, FingerprintStore, Orchestrator};

/// Options accepted by every subcommand.
#[derive(Args, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: ./pagesync.yaml, then ~/.pagesync/config.yaml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Site URL, e.g. https://example.org/blog.
    #[arg(long, global = true)]
    pub url: Option<String>,

    #[arg(long, global = true, env = "PAGESYNC_USERNAME")]
    pub username: Option<String>,

    /// Application password.
    #[arg(long, global = true, env = "PAGESYNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("config", &self.config)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Load the config file and apply flag overrides.
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = Config::load(global.config.as_deref()).context("failed to load config")?;
    if let Some(url) = &global.url {
        config.store.url = url.clone();
    }
    if let Some(username) = &global.username {
        config.store.username = Some(username.clone());
    }
    if let Some(password) = &global.password {
        config.store.password = Some(password.clone());
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Build a client from the config. Credentials are required.
pub fn client(config: &Config) -> Result<WpClient> {
    let username = config
        .store
        .username
        .as_deref()
        .filter(|u| !u.is_empty())
        .context("no username: pass --username or set PAGESYNC_USERNAME")?;
    let password = config
        .store
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .context("no password: pass --password or set PAGESYNC_PASSWORD")?;
    Ok(WpClient::new(
        &config.store.url,
        username,
        password,
        config.timeout(),
    ))
}

/// Build a client and fail unless the store accepts it.
pub fn connect(config: &Config) -> Result<WpClient> {
    let client = client(config)?;
    gate(&client, &config.store.url)?;
    Ok(client)
}

/// Refuse to start a run against a store that is down or rejects us.
pub fn gate<S: ContentStore>(store: &S, url: &str) -> Result<()> {
    ensure_connected(store, url).context("check the credentials and URL")?;
    println!("✓ Connected to {url}");
    Ok(())
}

pub fn batch_options(
    config: &Config,
    change_detection: ChangeDetection,
    replace: bool,
) -> BatchOptions {
    BatchOptions {
        delay: config.delay(),
        change_detection,
        update_policy: if replace {
            UpdatePolicy::Replace
        } else {
            config.publish.update_policy
        },
    }
}

/// Orchestrator wired to the configured fingerprint file and publish log.
pub fn orchestrator<S: ContentStore>(
    store: S,
    config: &Config,
    options: BatchOptions,
) -> Orchestrator<S> {
    let fingerprints = FingerprintStore::load(&config.state.fingerprints);
    let orchestrator = Orchestrator::new(store, fingerprints, options);
    match &config.state.publish_log {
        Some(path) => orchestrator.with_publish_log(path),
        None => orchestrator,
    }
}
