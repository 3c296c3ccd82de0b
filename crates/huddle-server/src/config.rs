// Configuration loading and validation (config/huddle.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "huddle.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives. `RUST_LOG` takes precedence.
    pub filter: Option<String>,
    /// Log file path. Logs go to stderr when unset.
    pub file: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    5001
}

fn default_ws_port() -> u16 {
    5002
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            ws_port: default_ws_port(),
        }
    }
}

impl Config {
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }

    pub fn ws_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.ws_port)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/huddle.toml` relative to `base_dir`.
///
/// Does not copy defaults; prefer [`load_config`].
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
        path: path.clone(),
    })?;
    let config = parse_config(&text).map_err(|source| ConfigError::ParseError {
        path: path.clone(),
        source,
    })?;
    validate(&config)?;
    Ok(config)
}

pub fn parse_config(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}

/// Copy `defaults/huddle.toml` to `config/huddle.toml` if the latter is
/// missing. Returns the path written, if any. A missing defaults file is not
/// an error: there is nothing to copy.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let source = base_dir.join("defaults").join(CONFIG_FILE);
    let config_dir = base_dir.join("config");
    let target = config_dir.join(CONFIG_FILE);

    if target.exists() || !source.exists() {
        return Ok(None);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;
    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {}: {e}", source.display()),
    })?;
    Ok(Some(target))
}

/// Copy defaults if needed, then load `config/huddle.toml` under `base_dir`.
/// With neither file present, the built-in defaults apply.
pub fn load_or_default(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_file(base_dir)?;
    if !base_dir.join("config").join(CONFIG_FILE).exists() {
        return Ok(Config::default());
    }
    load_config_from(base_dir)
}

/// Loads config relative to the current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    load_or_default(&cwd)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.host.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "server.host".into(),
            message: "must not be empty".into(),
        });
    }

    let ports: &[(&str, u16)] = &[
        ("server.http_port", server.http_port),
        ("server.ws_port", server.ws_port),
    ];
    for (name, port) in ports {
        if *port == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    if server.http_port == server.ws_port {
        return Err(ConfigError::ValidationError {
            field: "server.ws_port".into(),
            message: format!("must differ from server.http_port ({})", server.http_port),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
