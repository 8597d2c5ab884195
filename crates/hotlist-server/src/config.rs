// Configuration loading and parsing (config/hotlist.toml).

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use hotlist_core::service::DEFAULT_VOTE_QUOTA;

/// Name of the single configuration file under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "hotlist.toml";

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
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub db_path: PathBuf,
    pub default_vote_quota: u32,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// hotlist.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire hotlist.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    server: ServerConfig,
    #[serde(default)]
    database: DatabaseSection,
    #[serde(default)]
    users: UsersSection,
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl ServerConfig {
    /// The socket address to listen on. Only valid after validation.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|e| ConfigError::ValidationError {
                field: "server.bind_address".into(),
                message: format!("{e}: {:?}", self.bind_address),
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct UsersSection {
    default_vote_quota: u32,
}

impl Default for UsersSection {
    fn default() -> Self {
        UsersSection {
            default_vote_quota: DEFAULT_VOTE_QUOTA,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` overrides it.
    pub filter: String,
    /// Write logs into this directory instead of stderr.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/hotlist.toml` relative to
/// `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let db_path = match file.database.path {
        Some(path) => {
            if path.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    field: "database.path".into(),
                    message: "must not be empty (omit it to use the data directory)".into(),
                });
            }
            PathBuf::from(path)
        }
        None => default_db_path()?,
    };

    let config = Config {
        server: file.server,
        db_path,
        default_vote_quota: file.users.default_vote_quota,
        logging: file.logging,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the crate root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        if target.exists() {
            continue;
        }
        std::fs::copy(&path, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", path.display(), target.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// `hotlist.db` inside the platform data directory.
fn default_db_path() -> Result<PathBuf, ConfigError> {
    directories::ProjectDirs::from("", "", "hotlist")
        .map(|dirs| dirs.data_dir().join("hotlist.db"))
        .ok_or_else(|| ConfigError::ValidationError {
            field: "database.path".into(),
            message: "no platform data directory available; set it explicitly".into(),
        })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    config.server.socket_addr()?;

    if config.logging.filter.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.filter".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
