//! Configuration for the Dataverse client with layered sources.
//!
//! Priority: environment variables > config file (./dataverse.toml, then
//! ~/.config/dataverse/config.toml) > built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hard upper bound the Web API accepts for `odata.maxpagesize`.
pub const MAX_PAGESIZE: u32 = 5000;

/// Environment variables consumed by [`Config::from_environment`].
pub const ENV_BASE_URL: &str = "DYNAMICS_BASE_URL";
pub const ENV_TOKEN_URL: &str = "DYNAMICS_TOKEN_URL";
pub const ENV_CLIENT_ID: &str = "DYNAMICS_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "DYNAMICS_CLIENT_SECRET";
pub const ENV_SCOPE: &str = "DYNAMICS_SCOPE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("environment variable '{0}' is not set")]
  MissingEnv(&'static str),
  #[error("failed to read config file: {0}")]
  Io(#[from] std::io::Error),
  #[error("failed to parse config file: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("api_url must not be empty")]
  MissingApiUrl,
  #[error("max pagesize is {MAX_PAGESIZE}, got {0}")]
  PagesizeTooLarge(u32),
  #[error("pagesize must be at least 1")]
  PagesizeZero,
}

/// API connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Url in form: 'https://[Organization URI]/api/data/v{api_version}'
  pub api_url: String,

  /// Url in form: 'https://[Dynamics Token URI]/path/to/token'
  pub token_url: String,

  /// OAuth client id (e.g. UUID).
  pub client_id: String,

  /// OAuth client secret.
  pub client_secret: String,

  /// Scope urls defining which records the connection has access to.
  pub scope: Vec<String>,
}

/// HTTP behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
  /// Request timeout in seconds (default: 30)
  pub timeout_secs: u64,

  /// Page size requested via `Prefer: odata.maxpagesize` (default: 5000)
  pub pagesize: u32,
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self {
      timeout_secs: 30,
      pagesize: MAX_PAGESIZE,
    }
  }
}

/// Token cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Seconds subtracted from the token's `expires_in` when computing the
  /// cache TTL, so tokens are refreshed before the server rejects them
  /// (default: 300)
  pub token_safety_margin_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      token_safety_margin_secs: 300,
    }
  }
}

/// Dataverse client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// API connection settings
  #[serde(default)]
  pub api: ApiConfig,

  /// HTTP behavior settings
  #[serde(default)]
  pub http: HttpConfig,

  /// Token cache settings
  #[serde(default)]
  pub cache: CacheConfig,
}

impl Config {
  /// Create a config from environment variables:
  ///
  /// * `DYNAMICS_BASE_URL`: api url string
  /// * `DYNAMICS_TOKEN_URL`: token url string
  /// * `DYNAMICS_CLIENT_ID`: client id string
  /// * `DYNAMICS_CLIENT_SECRET`: client secret key string
  /// * `DYNAMICS_SCOPE`: comma separated list of urls
  pub fn from_environment() -> Result<Self, ConfigError> {
    fn var(name: &'static str) -> Result<String, ConfigError> {
      std::env::var(name).map_err(|_| ConfigError::MissingEnv(name))
    }

    let mut config = Self::default();
    config.api.api_url = var(ENV_BASE_URL)?;
    config.api.token_url = var(ENV_TOKEN_URL)?;
    config.api.client_id = var(ENV_CLIENT_ID)?;
    config.api.client_secret = var(ENV_CLIENT_SECRET)?;
    config.api.scope = var(ENV_SCOPE)?.split(',').map(|s| s.trim().to_string()).collect();
    config.validate()?;
    Ok(config)
  }

  /// Load a config file from an explicit path.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
  }

  /// Load config from the default locations, falling back to defaults.
  ///
  /// Project-relative `dataverse.toml` wins over the user config file.
  /// Environment variables override either.
  pub fn load_default() -> Self {
    let project_config = PathBuf::from("dataverse.toml");
    if project_config.exists()
      && let Ok(content) = std::fs::read_to_string(&project_config)
      && let Ok(mut config) = toml::from_str::<Config>(&content)
    {
      config.apply_env_overrides();
      return config;
    }

    if let Some(user_config_path) = Self::user_config_path()
      && user_config_path.exists()
      && let Ok(content) = std::fs::read_to_string(&user_config_path)
      && let Ok(mut config) = toml::from_str::<Config>(&content)
    {
      config.apply_env_overrides();
      return config;
    }

    let mut config = Self::default();
    config.apply_env_overrides();
    config
  }

  /// Get the user-level config path.
  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("DATAVERSE_CONFIG_DIR") {
      return Some(PathBuf::from(path).join("config.toml"));
    }

    dirs::config_dir().map(|p: PathBuf| p.join("dataverse").join("config.toml"))
  }

  /// Overlay any `DYNAMICS_*` environment variables that are present.
  fn apply_env_overrides(&mut self) {
    if let Ok(v) = std::env::var(ENV_BASE_URL) {
      self.api.api_url = v;
    }
    if let Ok(v) = std::env::var(ENV_TOKEN_URL) {
      self.api.token_url = v;
    }
    if let Ok(v) = std::env::var(ENV_CLIENT_ID) {
      self.api.client_id = v;
    }
    if let Ok(v) = std::env::var(ENV_CLIENT_SECRET) {
      self.api.client_secret = v;
    }
    if let Ok(v) = std::env::var(ENV_SCOPE) {
      self.api.scope = v.split(',').map(|s| s.trim().to_string()).collect();
    }
  }

  /// Check invariants and normalize the api url to end in a single slash.
  pub fn validate(&mut self) -> Result<(), ConfigError> {
    if self.api.api_url.is_empty() {
      return Err(ConfigError::MissingApiUrl);
    }
    self.api.api_url = format!("{}/", self.api.api_url.trim_end_matches('/'));

    if self.http.pagesize == 0 {
      return Err(ConfigError::PagesizeZero);
    }
    if self.http.pagesize > MAX_PAGESIZE {
      return Err(ConfigError::PagesizeTooLarge(self.http.pagesize));
    }
    Ok(())
  }

  /// Generate a default config file as a string.
  pub fn generate_template() -> String {
    r#"# Dataverse client configuration
# Place in ./dataverse.toml (project) or ~/.config/dataverse/config.toml (user)
# Any DYNAMICS_* environment variable overrides the value here.

[api]
# Url in form: https://[Organization URI]/api/data/v9.1
api_url = ""

# Url in form: https://[Dynamics Token URI]/path/to/token
token_url = ""

# OAuth client credentials
client_id = ""
client_secret = ""

# Scope urls defining which records the connection has access to
scope = []

[http]
# Request timeout (seconds)
timeout_secs = 30

# Page size requested via Prefer: odata.maxpagesize (max 5000)
pagesize = 5000

[cache]
# Refresh tokens this many seconds before they expire
token_safety_margin_secs = 300
"#
    .to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn clear_env() {
    for name in [ENV_BASE_URL, ENV_TOKEN_URL, ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_SCOPE] {
      unsafe {
        std::env::remove_var(name);
      }
    }
  }

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.http.timeout_secs, 30);
    assert_eq!(config.http.pagesize, MAX_PAGESIZE);
    assert_eq!(config.cache.token_safety_margin_secs, 300);
  }

  #[test]
  fn test_validate_normalizes_trailing_slash() {
    let mut config = Config::default();
    config.api.api_url = "https://org.example/api/data/v9.1".to_string();
    config.validate().unwrap();
    assert_eq!(config.api.api_url, "https://org.example/api/data/v9.1/");

    // Already-slashed urls are not doubled
    config.api.api_url = "https://org.example/api/data/v9.1///".to_string();
    config.validate().unwrap();
    assert_eq!(config.api.api_url, "https://org.example/api/data/v9.1/");
  }

  #[test]
  fn test_validate_pagesize_bounds() {
    let mut config = Config::default();
    config.api.api_url = "https://org.example/api/data/v9.1".to_string();

    config.http.pagesize = 5001;
    assert!(matches!(config.validate(), Err(ConfigError::PagesizeTooLarge(5001))));

    config.http.pagesize = 0;
    assert!(matches!(config.validate(), Err(ConfigError::PagesizeZero)));

    config.http.pagesize = 2000;
    config.validate().unwrap();
  }

  #[test]
  fn test_missing_api_url() {
    let mut config = Config::default();
    assert!(matches!(config.validate(), Err(ConfigError::MissingApiUrl)));
  }

  #[test]
  fn test_toml_roundtrip() {
    let mut config = Config::default();
    config.api.api_url = "https://org.example/api/data/v9.1/".to_string();
    config.api.scope = vec!["https://org.example/.default".to_string()];
    config.http.pagesize = 1000;

    let toml_str = toml::to_string_pretty(&config).unwrap();
    let parsed: Config = toml::from_str(&toml_str).unwrap();

    assert_eq!(parsed.api.api_url, config.api.api_url);
    assert_eq!(parsed.api.scope, config.api.scope);
    assert_eq!(parsed.http.pagesize, 1000);
  }

  #[test]
  fn test_partial_file_uses_defaults() {
    let toml_content = r#"
[api]
api_url = "https://org.example/api/data/v9.1"
"#;
    let config: Config = toml::from_str(toml_content).unwrap();
    assert_eq!(config.http.timeout_secs, 30);
    assert_eq!(config.http.pagesize, MAX_PAGESIZE);
  }

  #[test]
  fn test_load_from_file() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("dataverse.toml");
    std::fs::write(
      &path,
      r#"
[api]
api_url = "https://org.example/api/data/v9.1"
token_url = "https://login.example/token"

[http]
pagesize = 1000
"#,
    )
    .unwrap();

    clear_env();
    let config = Config::load(&path).unwrap();
    assert_eq!(config.api.api_url, "https://org.example/api/data/v9.1/");
    assert_eq!(config.http.pagesize, 1000);
  }

  #[test]
  fn test_from_environment_missing_var() {
    clear_env();
    match Config::from_environment() {
      Err(ConfigError::MissingEnv(name)) => assert_eq!(name, ENV_BASE_URL),
      other => panic!("expected MissingEnv, got {other:?}"),
    }
  }

  #[test]
  fn test_generate_template_parses() {
    let template = Config::generate_template();
    let parsed: Result<Config, _> = toml::from_str(&template);
    assert!(parsed.is_ok());
    assert!(template.contains("[api]"));
    assert!(template.contains("[http]"));
    assert!(template.contains("[cache]"));
  }
}
