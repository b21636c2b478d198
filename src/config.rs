//! Client configuration.
//!
//! The base URL is resolved once, when a client is built, in this order:
//! explicit value, `HCAPI_URL`, an rc file (`HCAPI_RC`, `./.hcapirc`,
//! `~/.hcapirc`), then [`DEFAULT_BASE_URL`].

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://hcapi.harvestchoice.org";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const RC_FILE: &str = ".hcapirc";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Service root, without the `/ocpu/...` part.
    pub base_url: String,
    /// Total per-request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    url: Option<String>,
    timeout: Option<u64>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base(&base_url.into()),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Resolve from environment and rc files, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::resolve(None)
    }

    /// Like [`ClientConfig::from_env`], but an explicit URL wins.
    pub fn resolve(url: Option<String>) -> Result<Self> {
        let mut url = url.or_else(|| std::env::var("HCAPI_URL").ok());
        let mut timeout = None;

        for rc_path in rc_candidates() {
            if rc_path.exists() {
                let rc = read_rc(&rc_path)?;
                if url.is_none() {
                    url = rc.url;
                }
                timeout = rc.timeout;
                log::debug!("loaded configuration from {}", rc_path.display());
                break;
            }
        }

        let mut cfg = Self::new(url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()));
        if let Some(secs) = timeout {
            cfg.timeout = Duration::from_secs(secs);
        }
        Ok(cfg)
    }
}

fn normalize_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    parse_rc(&text).map_err(|msg| Error::config(format!("{}: {msg}", path.display())))
}

/// `key: value` lines; `#` starts a comment line. Unknown keys are ignored.
fn parse_rc(text: &str) -> std::result::Result<RcConfig, String> {
    let mut cfg = RcConfig::default();
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((k, v)) = line.split_once(':') else {
            continue;
        };
        let v = strip_quotes(v.trim());
        match k.trim() {
            "url" if !v.is_empty() => cfg.url = Some(v.to_string()),
            "timeout" if !v.is_empty() => {
                let secs = v
                    .parse::<u64>()
                    .map_err(|_| format!("timeout must be whole seconds, got {v:?}"))?;
                cfg.timeout = Some(secs);
            }
            _ => {}
        }
    }
    Ok(cfg)
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    if let Ok(p) = std::env::var("HCAPI_RC") {
        return vec![PathBuf::from(p)];
    }
    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(RC_FILE));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(RC_FILE));
    }
    v
}
