use crate::api::rest::normalize_base_url;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_FILE: &str = ".env";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const BASE_URL_ENV: &str = "CHIRP_API_BASE_URL";
pub const CONFIG_PATH_ENV: &str = "CHIRP_CONFIG";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub compose: ComposeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,
}

fn default_request_timeout_ms() -> u64 { 10_000 }
fn default_pool_max_idle() -> usize { 4 }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_ms: default_request_timeout_ms(),
            pool_max_idle_per_host: default_pool_max_idle(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// In the units of the feed pane's scroll metrics (terminal rows).
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold: u32,
    #[serde(default = "default_post_card_rows")]
    pub post_card_rows: u16,
}

/// Rows from the bottom of the feed pane at which the next chunk is revealed.
pub const DEFAULT_SCROLL_ROWS: u32 = 3;

fn default_chunk_size() -> usize { crate::feed::CHUNK_SIZE }
fn default_scroll_threshold() -> u32 { DEFAULT_SCROLL_ROWS }
fn default_post_card_rows() -> u16 { 6 }

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            scroll_threshold: default_scroll_threshold(),
            post_card_rows: default_post_card_rows(),
        }
    }
}

/// Optional fixed identity that skips the login screen.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    pub user_id: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ComposeConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_max_chars() -> usize { crate::compose::MAX_POST_CHARS }

impl Default for ComposeConfig {
    fn default() -> Self {
        Self { max_chars: default_max_chars() }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse config TOML")
    }

    /// `--config <path>` wins over `CHIRP_CONFIG`, which wins over `config.toml`.
    pub fn resolve_path(args: &[String]) -> PathBuf {
        let from_args = args
            .iter()
            .position(|a| a == "--config")
            .and_then(|i| args.get(i + 1));
        if let Some(path) = from_args {
            return PathBuf::from(path);
        }
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Load the file if present, else run on defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        Self::load_env_from(Path::new(ENV_FILE));
    }

    pub fn load_env_from(path: &Path) {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        for (key, value) in parse_env_lines(content) {
            if std::env::var(&key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }

    /// API base URL: environment first, then the config file. Always ends in one `/`.
    pub fn base_url(&self) -> Option<String> {
        let from_env = std::env::var(BASE_URL_ENV).ok().map(|v| sanitize_value(&v));
        from_env
            .filter(|v| !v.is_empty())
            .or_else(|| self.api.base_url.clone().filter(|v| !v.trim().is_empty()))
            .map(|v| normalize_base_url(&v))
    }

    /// Base URL, prompting once if it is configured nowhere. The answer is saved to .env.
    pub fn base_url_or_prompt(&self) -> Result<String> {
        match self.base_url() {
            Some(url) => Ok(url),
            None => {
                let url = prompt("API base URL")?;
                save_env_var(BASE_URL_ENV, &url);
                Ok(normalize_base_url(&url))
            }
        }
    }
}

fn parse_env_lines(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(|line| line.trim().trim_matches('\r'))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

fn prompt(label: &str) -> Result<String> {
    print!("  {} > ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let value = sanitize_value(&input);
    if value.is_empty() {
        anyhow::bail!("{} cannot be empty", label);
    }
    Ok(value)
}

/// Strip carriage returns, BOM, and other invisible chars from a value.
fn sanitize_value(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}

/// Append a KEY=VALUE line to .env and set it in the current process.
fn save_env_var(key: &str, value: &str) {
    std::env::set_var(key, value);
    let path = Path::new(ENV_FILE);
    let mut contents = std::fs::read_to_string(path).unwrap_or_default();
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(&format!("{}={}\n", key, value));
    if let Err(e) = std::fs::write(path, contents) {
        tracing::warn!(error = %e, "could not save {} to .env", key);
    }
}
