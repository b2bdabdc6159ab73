use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::QueryOptions;
use crate::pagination::PageSize;

/// Public placeholder API the app talks to unless configured otherwise
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub mode: Mode,
  /// Custom title for header (defaults to "todos")
  pub title: Option<String>,
  pub api: ApiConfig,
  pub query: QueryConfig,
  pub list: ListConfig,
}

/// Development mode shows error details and the cache inspector
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  Development,
  #[default]
  Production,
}

impl Mode {
  pub fn is_development(self) -> bool {
    self == Mode::Development
  }

  fn parse(value: &str) -> Option<Self> {
    match value.trim().to_lowercase().as_str() {
      "development" | "dev" => Some(Mode::Development),
      "production" | "prod" => Some(Mode::Production),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  /// Per-request transport timeout
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
  pub stale_after_secs: u64,
  pub retain_after_secs: u64,
  pub retry: u32,
  pub retry_delay_ms: u64,
  pub refetch_on_focus: bool,
}

impl Default for QueryConfig {
  fn default() -> Self {
    let defaults = QueryOptions::default();
    Self {
      stale_after_secs: defaults.stale_after.as_secs(),
      retain_after_secs: defaults.retain_after.as_secs(),
      retry: defaults.retry_on_failure,
      retry_delay_ms: defaults.retry_delay.as_millis() as u64,
      refetch_on_focus: defaults.refetch_on_focus,
    }
  }
}

impl QueryConfig {
  pub fn options(&self) -> QueryOptions {
    QueryOptions {
      stale_after: Duration::from_secs(self.stale_after_secs),
      retain_after: Duration::from_secs(self.retain_after_secs),
      retry_on_failure: self.retry,
      retry_delay: Duration::from_millis(self.retry_delay_ms),
      refetch_on_focus: self.refetch_on_focus,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListConfig {
  #[serde(deserialize_with = "deserialize_page_size")]
  pub page_size: PageSize,
}

fn deserialize_page_size<'de, D>(deserializer: D) -> Result<PageSize, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let rows = usize::deserialize(deserializer)?;
  PageSize::from_rows(rows).ok_or_else(|| {
    serde::de::Error::custom(format!("page_size must be 5, 10 or 25, got {}", rows))
  })
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./todos.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/todos/config.yaml
  ///
  /// Without any file the built-in defaults are used. `TODOS_MODE` overrides
  /// the mode from the file.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Some(mode) = Self::mode_from_env()? {
      config.mode = mode;
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("todos.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("todos").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file is valid and means "all defaults"
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Read the mode flag from `TODOS_MODE`.
  fn mode_from_env() -> Result<Option<Mode>> {
    match std::env::var("TODOS_MODE") {
      Ok(value) => Mode::parse(&value)
        .map(Some)
        .ok_or_else(|| eyre!("TODOS_MODE must be 'development' or 'production', got '{}'", value)),
      Err(_) => Ok(None),
    }
  }

  pub fn validate(&self) -> Result<()> {
    let url = url::Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url '{}': {}", self.api.base_url, e))?;
    if !matches!(url.scheme(), "http" | "https") {
      return Err(eyre!(
        "api.base_url must be an http(s) URL, got '{}'",
        self.api.base_url
      ));
    }
    if self.api.timeout_secs == 0 {
      return Err(eyre!("api.timeout_secs must be greater than zero"));
    }
    Ok(())
  }

  /// Header title, falling back to the app name
  pub fn title(&self) -> &str {
    self.title.as_deref().unwrap_or("todos")
  }
}
