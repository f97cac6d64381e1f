use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

/// Config file looked up in the data root when `--config` is not given.
pub const CONFIG_FILE: &str = "plume.toml";

/// Remote read timeout when neither the flag nor the file sets one.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Contents of `plume.toml`. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Site to act as.
    pub site: Option<String>,
    /// Remote read timeout in milliseconds; `0` disables it.
    pub timeout_ms: Option<u64>,
    /// Default number of feed entries.
    pub feed_limit: Option<usize>,
}

/// Effective settings after combining flags, file and defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub site: String,
    pub timeout: Option<Duration>,
    pub feed_limit: Option<usize>,
}

impl CliConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load the config file.
    ///
    /// An explicit path must exist; the default `<root>/plume.toml` is
    /// optional.
    pub fn load(root: &Path, explicit: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (root.join(CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        read_config(&path)
    }

    /// Combine with command-line values, which take precedence.
    pub fn resolve(&self, site: Option<&str>, timeout_ms: Option<u64>) -> anyhow::Result<Settings> {
        let Some(site) = site.or(self.site.as_deref()).filter(|s| !s.trim().is_empty()) else {
            bail!("no site given: pass --site or set `site` in {CONFIG_FILE}");
        };
        let timeout_ms = timeout_ms.or(self.timeout_ms).unwrap_or(DEFAULT_TIMEOUT_MS);
        Ok(Settings {
            site: site.to_string(),
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            feed_limit: self.feed_limit,
        })
    }
}

fn read_config(path: &Path) -> anyhow::Result<CliConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    CliConfig::from_toml(&text).with_context(|| format!("invalid config {}", path.display()))
}
