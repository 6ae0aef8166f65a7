//! Runtime settings: where parameter files live and where they come from.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the data home
pub const DATA_HOME_ENV: &str = "DEEPNOG_DATA";

/// Environment variable overriding the remote parameter store
pub const REMOTE_ENV: &str = "DEEPNOG_REMOTE";

/// Environment variable overriding the download timeout (seconds)
pub const TIMEOUT_ENV: &str = "DEEPNOG_TIMEOUT";

/// Default remote store for trained parameters
pub const DEFAULT_REMOTE: &str = "https://fileshare.csb.univie.ac.at/deepnog/parameters";

const DEFAULT_DATA_DIR: &str = "deepnog_data";
const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Resolved settings for locating and fetching parameter files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Root of the local parameter cache
    pub data_home: PathBuf,

    /// Base URL of the remote parameter store
    pub remote_url: String,

    /// Timeout for a single download; `None` defers to `DEEPNOG_TIMEOUT`
    pub timeout_secs: Option<u64>,
}

/// On-disk form of [`Settings`]; every field may be omitted
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    data_home: Option<PathBuf>,
    #[serde(default)]
    remote_url: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

impl Settings {
    /// Build settings from `DEEPNOG_DATA` and `DEEPNOG_REMOTE`
    pub fn from_env() -> crate::Result<Self> {
        Self::from_env_with_data_home(None)
    }

    /// Like [`Settings::from_env`], but an explicit `data_home` wins over
    /// `DEEPNOG_DATA` and no home directory is needed
    pub fn from_env_with_data_home(data_home: Option<&Path>) -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), data_home)
    }

    /// Load settings from a JSON file, filling gaps from the environment
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        Self::from_file_with_data_home(path, None)
    }

    /// Load settings from a JSON file; an explicit `data_home` wins over both
    /// the file and the environment
    pub fn from_file_with_data_home(
        path: impl AsRef<Path>,
        data_home: Option<&Path>,
    ) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: SettingsFile = serde_json::from_str(&content)?;

        let data_home = data_home.map(Path::to_path_buf).or(file.data_home);
        let env = Self::from_env_with_data_home(data_home.as_deref())?;

        Ok(Self {
            data_home: env.data_home,
            remote_url: file.remote_url.unwrap_or(env.remote_url),
            timeout_secs: file.timeout_secs.or(env.timeout_secs),
        })
    }

    /// Replace the data home, e.g. from a command line flag
    pub fn with_data_home(mut self, data_home: impl AsRef<Path>) -> Self {
        self.data_home = expand_home(data_home.as_ref().to_path_buf());
        self
    }

    /// Download timeout. Only consulted when a download is about to start, so
    /// a malformed `DEEPNOG_TIMEOUT` does not affect cache hits.
    pub fn timeout(&self) -> crate::Result<std::time::Duration> {
        self.timeout_with(|key| std::env::var(key).ok())
    }

    fn timeout_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> crate::Result<std::time::Duration> {
        let secs = match (self.timeout_secs, lookup(TIMEOUT_ENV)) {
            (Some(secs), _) => secs,
            (None, Some(raw)) => raw.trim().parse().map_err(|_| {
                crate::DeepnogError::ConfigError(format!(
                    "{} must be a number of seconds, got {:?}",
                    TIMEOUT_ENV, raw
                ))
            })?,
            (None, None) => DEFAULT_TIMEOUT_SECS,
        };
        Ok(std::time::Duration::from_secs(secs))
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        data_home: Option<&Path>,
    ) -> crate::Result<Self> {
        let data_home = match data_home {
            Some(dir) => expand_home(dir.to_path_buf()),
            None => match lookup(DATA_HOME_ENV).filter(|v| !v.is_empty()) {
                Some(dir) => expand_home(PathBuf::from(dir)),
                None => home_dir(&lookup)?.join(DEFAULT_DATA_DIR),
            },
        };

        let remote_url = lookup(REMOTE_ENV)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string());

        Ok(Self {
            data_home,
            remote_url,
            timeout_secs: None,
        })
    }
}

fn home_dir(lookup: &impl Fn(&str) -> Option<String>) -> crate::Result<PathBuf> {
    lookup("HOME")
        .or_else(|| lookup("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| {
            crate::DeepnogError::ConfigError("Could not determine home directory".to_string())
        })
}

/// Expand a leading `~` to the user's home directory
fn expand_home(path: PathBuf) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path;
    };
    match home_dir(&|key: &str| std::env::var(key).ok()) {
        Ok(home) => home.join(rest),
        Err(_) => path,
    }
}
