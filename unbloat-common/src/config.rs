// unbloat-common/src/config.rs
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use tracing::debug;
use url::Url;

use super::error::{Result, UnbloatError};

pub const DEFAULT_CATALOG_URL: &str = "https://raw.githubusercontent.com/Universal-Debloater-Alliance/universal-android-debloater-next-generation/main/resources/assets/uad_lists.json";
pub const DEFAULT_REVISION_URL: &str = "https://api.github.com/repos/Universal-Debloater-Alliance/universal-android-debloater-next-generation/commits?path=resources%2Fassets%2Fuad_lists.json";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_ADB: &str = "adb";
const FALLBACK_ROOT: &str = ".unbloat";

#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub catalog_url: String,
    pub revision_url: String,
    /// Bound on each catalog/revision read.
    pub http_timeout: Duration,
    /// Bound on each privileged-channel invocation.
    pub op_timeout: Duration,
    pub adb_path: PathBuf,
    pub device_serial: Option<String>,
    pub android_user: u32,
    pub github_api_token: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading unbloat configuration");

        let root = match env::var("UNBLOAT_HOME").ok().filter(|s| !s.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => ProjectDirs::from("org", "unbloat", "unbloat")
                .map(|dirs| dirs.data_local_dir().to_path_buf())
                .unwrap_or_else(|| {
                    debug!("No project data directory available, falling back to {FALLBACK_ROOT}");
                    PathBuf::from(FALLBACK_ROOT)
                }),
        };
        debug!("Effective unbloat root set to: {}", root.display());

        let catalog_url = env_url("UNBLOAT_CATALOG_URL", DEFAULT_CATALOG_URL)?;
        let revision_url = env_url("UNBLOAT_REVISION_URL", DEFAULT_REVISION_URL)?;
        let http_timeout = env_duration("UNBLOAT_HTTP_TIMEOUT", DEFAULT_HTTP_TIMEOUT)?;
        let op_timeout = env_duration("UNBLOAT_OP_TIMEOUT", DEFAULT_OP_TIMEOUT)?;

        let adb_path = env::var("UNBLOAT_ADB")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ADB));
        let device_serial = env::var("ANDROID_SERIAL").ok().filter(|s| !s.is_empty());
        let android_user = match env::var("UNBLOAT_USER") {
            Ok(raw) => raw.trim().parse::<u32>().map_err(|e| {
                UnbloatError::Config(format!("UNBLOAT_USER must be a user id, got '{raw}': {e}"))
            })?,
            Err(_) => 0,
        };
        let github_api_token = env::var("GITHUB_TOKEN").ok().filter(|s| !s.is_empty());

        debug!("Configuration loaded successfully.");
        Ok(Self {
            root,
            catalog_url,
            revision_url,
            http_timeout,
            op_timeout,
            adb_path,
            device_serial,
            android_user,
            github_api_token,
        })
    }

    /// Configuration rooted at `root` with every other value at its default.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            revision_url: DEFAULT_REVISION_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            op_timeout: DEFAULT_OP_TIMEOUT,
            adb_path: PathBuf::from(DEFAULT_ADB),
            device_serial: None,
            android_user: 0,
            github_api_token: None,
        }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

fn env_url(key: &str, default: &str) -> Result<String> {
    let value = env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string());
    validate_url(&value)
        .map_err(|e| UnbloatError::Config(format!("{key} is not a usable URL: {e}")))?;
    Ok(value)
}

fn env_duration(key: &str, default: Duration) -> Result<Duration> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => humantime::parse_duration(raw.trim())
            .map_err(|e| UnbloatError::Config(format!("{key} must be a duration like '30s': {e}"))),
        _ => Ok(default),
    }
}

/// Only plain http(s) endpoints with a host are accepted.
pub fn validate_url(url_str: &str) -> Result<()> {
    let url = Url::parse(url_str)
        .map_err(|e| UnbloatError::Config(format!("Failed to parse URL '{url_str}': {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        other => Err(UnbloatError::Config(format!(
            "URL '{url_str}' has unsupported scheme '{other}' or no host"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_defaults() {
        assert!(validate_url(DEFAULT_CATALOG_URL).is_ok());
        assert!(validate_url(DEFAULT_REVISION_URL).is_ok());
    }

    #[test]
    fn test_validate_url_rejects_other_schemes() {
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn test_with_root_derives_paths() {
        let config = Config::with_root("/tmp/unbloat-test");
        assert_eq!(config.state_dir(), PathBuf::from("/tmp/unbloat-test/state"));
        assert_eq!(config.logs_dir(), PathBuf::from("/tmp/unbloat-test/logs"));
        assert_eq!(config.http_timeout, DEFAULT_HTTP_TIMEOUT);
    }
}
