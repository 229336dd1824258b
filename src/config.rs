//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the path given with `-f`), then applies `ARCYD_WORK_DIR`,
//! `ARCYD_LOG_LEVEL` and `ARCYD_SENDMAIL` env overrides.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Remote service client settings.
#[derive(Debug, Clone)]
pub struct ConduitConfig {
    /// Which backend answers `ping()` (`"http"` or `"dummy"`).
    pub backend: String,
    /// Per-request HTTP timeout. `None` blocks until the server answers.
    pub timeout_seconds: Option<u64>,
}

/// Outbound mail settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Sendmail-compatible executable, looked up on `PATH`.
    pub sendmail_binary: String,
}

/// Fully-resolved arcyd configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the `phabricator-*.config` artifacts (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub conduit: ConduitConfig,
    pub mail: MailConfig,
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    arcyd: RawArcyd,
    #[serde(default)]
    conduit: RawConduit,
    #[serde(default)]
    mail: RawMail,
}

#[derive(Deserialize)]
struct RawArcyd {
    #[serde(default = "default_work_dir")]
    work_dir: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawArcyd {
    fn default() -> Self {
        Self { work_dir: default_work_dir(), log_level: default_log_level() }
    }
}

#[derive(Deserialize)]
struct RawConduit {
    #[serde(default = "default_conduit_backend")]
    backend: String,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

impl Default for RawConduit {
    fn default() -> Self {
        Self { backend: default_conduit_backend(), timeout_seconds: None }
    }
}

impl From<RawConduit> for ConduitConfig {
    fn from(raw: RawConduit) -> Self {
        Self { backend: raw.backend, timeout_seconds: raw.timeout_seconds }
    }
}

#[derive(Deserialize)]
struct RawMail {
    #[serde(default = "default_sendmail_binary")]
    sendmail_binary: String,
}

impl Default for RawMail {
    fn default() -> Self {
        Self { sendmail_binary: default_sendmail_binary() }
    }
}

impl From<RawMail> for MailConfig {
    fn from(raw: RawMail) -> Self {
        Self { sendmail_binary: raw.sendmail_binary }
    }
}

fn default_work_dir() -> String { ".".to_string() }
fn default_log_level() -> String { "warn".to_string() }
fn default_conduit_backend() -> String { "http".to_string() }
fn default_sendmail_binary() -> String { "sendmail".to_string() }

/// Env-var overrides, applied on top of the file values.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub work_dir: Option<String>,
    pub log_level: Option<String>,
    pub sendmail_binary: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            work_dir: env::var("ARCYD_WORK_DIR").ok(),
            log_level: env::var("ARCYD_LOG_LEVEL").ok(),
            sendmail_binary: env::var("ARCYD_SENDMAIL").ok(),
        }
    }
}

/// Load config from `path`, or from `config/default.toml` when `path` is `None`.
///
/// A missing default file falls back to built-in defaults; a missing
/// explicit file is an error.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let overrides = Overrides::from_env();
    match path {
        Some(p) => load_from(Path::new(p), &overrides),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_from(default_path, &overrides)
            } else {
                Ok(resolve(RawConfig::default(), &overrides))
            }
        }
    }
}

/// Internal loader — accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    Ok(resolve(parsed, overrides))
}

fn resolve(parsed: RawConfig, overrides: &Overrides) -> Config {
    let work_dir = overrides.work_dir.as_deref().unwrap_or(&parsed.arcyd.work_dir);
    let log_level = overrides
        .log_level
        .clone()
        .unwrap_or(parsed.arcyd.log_level);
    let mut mail: MailConfig = parsed.mail.into();
    if let Some(binary) = &overrides.sendmail_binary {
        mail.sendmail_binary = binary.clone();
    }

    Config {
        work_dir: expand_home(work_dir),
        log_level,
        conduit: parsed.conduit.into(),
        mail,
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
