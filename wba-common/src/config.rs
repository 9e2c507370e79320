//! Configuration loading and root folder resolution
//!
//! A missing TOML file is never fatal: the service starts with compiled
//! defaults and logs a warning once tracing is initialized. A TOML file that exists but does not parse is a
//! configuration error.

use crate::{Emotion, Error, ModalityWeights, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform config and data directories
pub const APP_DIR_NAME: &str = "wellbeing-assistant";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "WBA_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "WBA_CONFIG";

/// SQLite database file name inside the root folder
pub const DATABASE_FILE: &str = "wellbeing.db";

/// Default per-request classifier timeout
pub const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 30_000;

/// Where a loaded [`TomlConfig`] came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// This file was expected but does not exist; compiled defaults in use
    Missing(PathBuf),
    /// No config location could be determined; compiled defaults in use
    Unresolved,
}

impl ConfigSource {
    /// Emit the startup log line for this source
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Configuration: {}", path.display()),
            ConfigSource::Missing(path) => warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            ),
            ConfigSource::Unresolved => {
                warn!("No config file location available, using compiled defaults")
            }
        }
    }

    pub fn is_default(&self) -> bool {
        !matches!(self, ConfigSource::File(_))
    }
}

/// Values compiled into the binary, used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        // ~/.local/share, ~/Library/Application Support, %LOCALAPPDATA%
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("./wba_data"));

        Self {
            root_folder,
            log_level: "info".to_string(),
        }
    }
}

/// Top-level TOML configuration
///
/// Every section is optional; absent sections take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub fusion: FusionConfig,
    pub classifiers: ClassifiersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset (e.g. "info", "wba_analyzer=debug")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// CORS origins; a single "*" allows any origin
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub weights: ModalityWeights,
    /// Extra label synonyms merged over the built-in table (alias -> canonical label)
    pub synonyms: BTreeMap<String, Emotion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifiersConfig {
    pub text: Option<ClassifierEndpoint>,
    pub audio: Option<ClassifierEndpoint>,
    pub face: Option<ClassifierEndpoint>,
}

/// Remote inference endpoint for one modality
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierEndpoint {
    pub url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_classifier_timeout_ms() -> u64 {
    DEFAULT_CLASSIFIER_TIMEOUT_MS
}

impl TomlConfig {
    /// Parse a config file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        Self::load_with_source(path).map(|(config, _)| config)
    }

    /// Like [`TomlConfig::load_or_default`], also reporting where the values came from
    ///
    /// Does not log: this runs before the tracing subscriber exists, so the
    /// caller logs the returned [`ConfigSource`] once logging is up.
    pub fn load_with_source(path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match path {
            Some(path) if path.exists() => {
                let config = Self::load(path)?;
                Ok((config, ConfigSource::File(path.to_path_buf())))
            }
            Some(path) => Ok((Self::default(), ConfigSource::Missing(path.to_path_buf()))),
            None => Ok((Self::default(), ConfigSource::Unresolved)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.fusion
            .weights
            .validate()
            .map_err(|e| Error::Config(format!("fusion.weights: {}", e)))?;

        for (name, endpoint) in [
            ("text", &self.classifiers.text),
            ("audio", &self.classifiers.audio),
            ("face", &self.classifiers.face),
        ] {
            if let Some(endpoint) = endpoint {
                if endpoint.url.trim().is_empty() {
                    return Err(Error::Config(format!("classifiers.{}.url is empty", name)));
                }
                if endpoint.timeout_ms == 0 {
                    return Err(Error::Config(format!(
                        "classifiers.{}.timeout_ms must be greater than zero",
                        name
                    )));
                }
            }
        }

        if self.server.allowed_origins.is_empty() {
            return Err(Error::Config(
                "server.allowed_origins must list at least one origin (use \"*\" for any)"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Config file location: CLI argument, then `WBA_CONFIG`, then the platform config dir
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `WBA_ROOT_FOLDER` environment variable
/// 3. TOML `root_folder`
/// 4. OS-dependent compiled default
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder on first start and locates files inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            info!("Creating root folder {}", self.root_folder.display());
            std::fs::create_dir_all(&self.root_folder)?;
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}
