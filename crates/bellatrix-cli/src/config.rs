use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use bellatrix_ngsi::{DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT, NgsiClientOptions};
use serde::{Deserialize, Serialize};

/// Optional settings file, `~/.bellatrix/config.toml` by default.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub instance_prefix: Option<String>,
    pub dry_run: Option<bool>,
    pub debug: Option<bool>,
    pub state_file: Option<PathBuf>,
    /// Broker request timeout in seconds.
    pub timeout_secs: Option<u64>,
    pub page_size: Option<usize>,
}

/// Values given on the command line or through the environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub debug: bool,
    pub dry_run: bool,
    pub instance_prefix: Option<String>,
    pub state_file: Option<PathBuf>,
}

/// Settings after applying flag, env, file and default in that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSettings {
    pub debug: bool,
    pub dry_run: bool,
    pub instance_prefix: String,
    pub state_file: Option<PathBuf>,
    pub timeout_secs: u64,
    pub page_size: usize,
    /// Settings file that was read, if any.
    pub source: Option<PathBuf>,
}

impl ResolvedSettings {
    pub fn client_options(&self) -> NgsiClientOptions {
        NgsiClientOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            page_size: self.page_size,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".bellatrix").join("config.toml"))
}

/// Read the settings file.
///
/// An explicitly given path must exist. The default location is optional.
pub fn load_settings(explicit: Option<&Path>) -> Result<(Settings, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok((Settings::default(), None)),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    let settings: Settings = toml::from_str(&content)
        .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
    Ok((settings, Some(path)))
}

pub fn resolve(
    overrides: Overrides,
    settings: Settings,
    source: Option<PathBuf>,
) -> ResolvedSettings {
    ResolvedSettings {
        debug: overrides.debug || settings.debug.unwrap_or(false),
        dry_run: overrides.dry_run || settings.dry_run.unwrap_or(false),
        instance_prefix: overrides
            .instance_prefix
            .or(settings.instance_prefix)
            .unwrap_or_default(),
        state_file: overrides.state_file.or(settings.state_file),
        timeout_secs: settings
            .timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT.as_secs()),
        page_size: settings.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        source,
    }
}
