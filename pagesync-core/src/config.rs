//! YAML configuration.
//!
//! # Lookup order
//!
//! 1. an explicit `--config <path>` (must exist)
//! 2. `./pagesync.yaml`
//! 3. `~/.pagesync/config.yaml`
//!
//! If none is found, every section falls back to its defaults. As with the
//! registry helpers this grew out of, `load_at` takes the working directory and
//! home explicitly so tests never touch the real ones.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::UpdatePolicy;

pub const DEFAULT_URL: &str = "https://getblockchain.tech/neuroswarm";
pub const LOCAL_CONFIG: &str = "pagesync.yaml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Remote store connection.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: None,
            password: None,
            timeout_secs: 30,
        }
    }
}

// Never print the application password.
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub dirs: Vec<PathBuf>,
    pub pattern: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dirs: vec![
                PathBuf::from("./docs"),
                PathBuf::from("./content"),
                PathBuf::from("./knowledge-base"),
            ],
            pattern: "*.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Pause between items that touched the store.
    pub delay_ms: u64,
    pub update_policy: UpdatePolicy,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            update_policy: UpdatePolicy::Append,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

/// Local files written by runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub fingerprints: PathBuf,
    pub report_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_log: Option<PathBuf>,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            fingerprints: PathBuf::from(".pagesync/fingerprints.json"),
            report_dir: PathBuf::from(".pagesync/reports"),
            publish_log: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub content: ContentConfig,
    pub publish: PublishConfig,
    pub watch: WatchConfig,
    pub state: StateConfig,
    /// File this config was read from; `None` when running on defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// Parse a config file. Absent sections take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = serde_yaml::from_str(&contents).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Resolve and load a config with explicit working directory and home.
    pub fn load_at(
        explicit: Option<&Path>,
        cwd: &Path,
        home: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let local = cwd.join(LOCAL_CONFIG);
        if local.is_file() {
            return Self::from_file(&local);
        }
        if let Some(home) = home {
            let global = user_config_path_at(home);
            if global.is_file() {
                return Self::from_file(&global);
            }
        }
        Ok(Self::default())
    }

    /// `load_at` convenience wrapper using the process working directory and
    /// `dirs::home_dir()`.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        Self::load_at(explicit, &cwd, dirs::home_dir().as_deref())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.url.trim().is_empty() {
            return Err(ConfigError::Invalid("store.url must not be empty"));
        }
        if self.store.timeout_secs == 0 {
            return Err(ConfigError::Invalid("store.timeout_secs must be greater than zero"));
        }
        if self.content.pattern.trim().is_empty() {
            return Err(ConfigError::Invalid("content.pattern must not be empty"));
        }
        if self.watch.interval_secs == 0 {
            return Err(ConfigError::Invalid("watch.interval_secs must be greater than zero"));
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.publish.delay_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.watch.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }

    /// A commented starting point for `pagesync.yaml`.
    pub fn example() -> &'static str {
        EXAMPLE_YAML
    }
}

/// `<home>/.pagesync/config.yaml`, pure, no I/O.
pub fn user_config_path_at(home: &Path) -> PathBuf {
    home.join(".pagesync").join("config.yaml")
}

const EXAMPLE_YAML: &str = r#"# pagesync configuration
store:
  url: https://getblockchain.tech/neuroswarm
  username: editor
  # password: prefer PAGESYNC_PASSWORD
  timeout_secs: 30
content:
  dirs: [./docs, ./content, ./knowledge-base]
  pattern: "*.json"
publish:
  delay_ms: 1000
  update_policy: append
watch:
  interval_secs: 300
state:
  fingerprints: .pagesync/fingerprints.json
  report_dir: .pagesync/reports
  # publish_log: .pagesync/publish_log.jsonl
"#;

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
