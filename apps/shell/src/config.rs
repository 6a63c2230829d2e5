//! # Shell Configuration
//!
//! Configuration loaded once at startup.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SHOWROOM_ASSETS_DIR=./assets                                       │
//! │     SHOWROOM_STORAGE_BACKEND=memory                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/showroom/shell.toml (Linux)                              │
//! │     ~/Library/Application Support/com.showroom.shell/shell.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [assets]
//! root = "./assets"
//! seed_users = "data/users.json"
//!
//! [storage]
//! backend = "file"        # file | memory
//! dir = "./showroom_dev"  # default: platform data dir
//! prefix = "showroom"
//! quota_bytes = 5242880   # memory backend only
//!
//! [routing]
//! login_module = "login"
//! admin_module = "dashboard"
//! default_module = "catalog"
//! admin_roles = ["administrador"]
//!
//! [logging]
//! filter = "info,showroom=debug"
//! ```
//!
//! ## Thread Safety
//! Configuration is read-only after startup, so no lock is needed.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use showroom_core::validation::validate_module_name;
use showroom_core::STORAGE_PREFIX;

use crate::error::{ShellError, ShellResult};

// =============================================================================
// Assets
// =============================================================================

/// Where module resources and the seed document live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory that module resource paths are relative to.
    #[serde(default = "default_assets_root")]
    pub root: PathBuf,

    /// Seed document (JSON array of user records), relative to `root`.
    #[serde(default = "default_seed_users")]
    pub seed_users: String,
}

fn default_assets_root() -> PathBuf {
    PathBuf::from("./assets")
}

fn default_seed_users() -> String {
    "data/users.json".to_string()
}

impl Default for AssetsConfig {
    fn default() -> Self {
        AssetsConfig {
            root: default_assets_root(),
            seed_users: default_seed_users(),
        }
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Durable storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// One JSON file per entry.
    #[default]
    File,

    /// Nothing survives the process.
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::File => write!(f, "file"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = ShellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" | "disk" => Ok(StorageBackend::File),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(ShellError::Config(format!(
                "Unknown storage backend: '{}'. Valid options: file, memory",
                other
            ))),
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory of the file backend. Default: platform data dir.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Entry name prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Byte quota of the memory backend.
    #[serde(default)]
    pub quota_bytes: Option<usize>,
}

fn default_prefix() -> String {
    STORAGE_PREFIX.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StorageBackend::default(),
            dir: None,
            prefix: default_prefix(),
            quota_bytes: None,
        }
    }
}

// =============================================================================
// Routing
// =============================================================================

/// Which module each session state lands on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Loaded when there is no session and after logout.
    #[serde(default = "default_login_module")]
    pub login_module: String,

    /// Landing module for administrative roles.
    #[serde(default = "default_admin_module")]
    pub admin_module: String,

    /// Landing module for every other role.
    #[serde(default = "default_default_module")]
    pub default_module: String,

    /// Roles routed to `admin_module`.
    #[serde(default = "default_admin_roles")]
    pub admin_roles: Vec<String>,
}

fn default_login_module() -> String {
    "login".to_string()
}

fn default_admin_module() -> String {
    "dashboard".to_string()
}

fn default_default_module() -> String {
    "catalog".to_string()
}

fn default_admin_roles() -> Vec<String> {
    vec!["administrador".to_string()]
}

impl Default for RoutingConfig {
    fn default() -> Self {
        RoutingConfig {
            login_module: default_login_module(),
            admin_module: default_admin_module(),
            default_module: default_default_module(),
            admin_roles: default_admin_roles(),
        }
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging settings. `RUST_LOG` still wins over `filter`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info,showroom=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// ShellConfig
// =============================================================================

/// Complete shell configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub assets: AssetsConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ShellConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (shell.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ShellResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading shell config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load shell config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ShellResult<()> {
        let modules = [
            ("routing.login_module", &self.routing.login_module),
            ("routing.admin_module", &self.routing.admin_module),
            ("routing.default_module", &self.routing.default_module),
        ];

        for (field, name) in modules {
            validate_module_name(name).map_err(|e| ShellError::Config(format!("{field}: {e}")))?;
        }

        if self.storage.prefix.trim().is_empty() {
            return Err(ShellError::Config("storage.prefix must not be empty".into()));
        }

        if self.assets.seed_users.trim().is_empty() {
            return Err(ShellError::Config("assets.seed_users must not be empty".into()));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("SHOWROOM_ASSETS_DIR") {
            debug!(dir = %dir, "Overriding assets root from environment");
            self.assets.root = PathBuf::from(dir);
        }

        if let Some(dir) = lookup("SHOWROOM_STORAGE_DIR") {
            debug!(dir = %dir, "Overriding storage dir from environment");
            self.storage.dir = Some(PathBuf::from(dir));
        }

        if let Some(backend) = lookup("SHOWROOM_STORAGE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => self.storage.backend = parsed,
                Err(_) => warn!(backend = %backend, "Unknown storage backend in environment"),
            }
        }

        if let Some(prefix) = lookup("SHOWROOM_STORAGE_PREFIX") {
            self.storage.prefix = prefix;
        }

        if let Some(filter) = lookup("SHOWROOM_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "showroom", "shell")
            .map(|dirs| dirs.config_dir().join("shell.toml"))
    }

    /// Directory of the file backend: configured, else the platform data dir.
    pub fn storage_dir(&self) -> ShellResult<PathBuf> {
        if let Some(dir) = &self.storage.dir {
            return Ok(dir.clone());
        }

        directories::ProjectDirs::from("com", "showroom", "shell")
            .map(|dirs| dirs.data_dir().join("storage"))
            .ok_or_else(|| ShellError::Config("Could not determine app data directory".into()))
    }
}
