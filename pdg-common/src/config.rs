//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "PDG_ROOT_FOLDER";

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; logs go to stderr when unset
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Ingestion overrides from the `[ingest]` TOML section
///
/// Every field is optional; unset fields keep the compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestSettings {
    pub sparql_endpoint: Option<String>,
    pub user_agent: Option<String>,
    pub current_year: Option<i32>,
    pub public_domain_term_years: Option<i32>,
    pub creation_era_cutoff: Option<i32>,
    pub conservative_cutoff: Option<i32>,
    pub horizon_year: Option<i32>,
    pub min_size_cm: Option<f64>,
    pub aspect_ratio_min: Option<f64>,
    pub aspect_ratio_max: Option<f64>,
    pub query_timeout_secs: Option<u64>,
    pub batch_delay_ms: Option<u64>,
    pub max_split_depth: Option<u32>,
    pub min_split_span_years: Option<i32>,
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Museum→city reference table
    pub city_mapping: Option<PathBuf>,
    #[serde(default)]
    pub ingest: IngestSettings,
}

/// Where the effective config came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Path given on the command line
    Explicit(PathBuf),
    /// Platform config location
    Discovered(PathBuf),
    /// No file found; compiled defaults
    Defaults,
}

impl ConfigSource {
    /// Report the source; call once logging is initialized
    pub fn log(&self) {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::Discovered(path) => {
                info!("Loaded config from {}", path.display())
            }
            ConfigSource::Defaults => warn!("No config file found, using compiled defaults"),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load the explicit config file, or the platform default if present
    ///
    /// An explicit path that cannot be read is an error. A missing default
    /// file is not: defaults apply. Loading runs before the subscriber is
    /// installed, so the source is returned for the caller to log.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            let config = Self::load(path)?;
            return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
        }

        match default_config_file() {
            Some(path) => {
                let config = Self::load(&path)?;
                Ok((config, ConfigSource::Discovered(path)))
            }
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }
}

/// Locate the platform config file, if one exists
///
/// Checks `<config_dir>/pdg/config.toml`, then `/etc/pdg/config.toml` on Linux.
pub fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("pdg").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/pdg/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pdg"))
        .unwrap_or_else(|| PathBuf::from("./pdg_data"))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `PDG_ROOT_FOLDER` environment variable
/// 3. TOML config `root_folder`
/// 4. OS-dependent compiled default
pub struct RootFolderResolver<'a> {
    cli_arg: Option<PathBuf>,
    toml_config: Option<&'a TomlConfig>,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new() -> Self {
        Self {
            cli_arg: None,
            toml_config: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &'a TomlConfig) -> Self {
        self.toml_config = Some(config);
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

        if let Some(path) = self.toml_config.and_then(|c| c.root_folder.clone()) {
            return path;
        }

        default_root_folder()
    }
}

impl Default for RootFolderResolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates the data layout under a root folder
///
/// ```text
/// <root>/data/                      run log, prior and final corpus
/// <root>/data/wikidata-raw/         one file per top-level window
/// ```
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

    pub fn data_dir(&self) -> PathBuf {
        self.root_folder.join("data")
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir().join("wikidata-raw")
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.data_dir().join("fetch-log.json")
    }

    pub fn prior_corpus_path(&self) -> PathBuf {
        self.data_dir().join("existing-artworks.json")
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.data_dir().join("all-artworks.json")
    }

    /// Create the data and raw directories if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(self.raw_dir())?;
        Ok(())
    }
}
