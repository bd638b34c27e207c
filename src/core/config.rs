//! Configuration module for the texture tile deduplicator
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in a standard location:
//! - Windows: %APPDATA%\texture_dedup\config.toml
//! - Linux: ~/.config/texture_dedup/config.toml
//! - macOS: ~/Library/Application Support/texture_dedup/config.toml

use crate::tiles::{DedupOptions, DEFAULT_TILE_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application name used for config directory
const APP_NAME: &str = "texture_dedup";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config file looked for in the working directory
const LOCAL_CONFIG_FILE: &str = "./texture_dedup.toml";

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = get_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| ConfigError::WriteError(config_dir.clone(), e.to_string()))?;
    }

    Ok(config_dir)
}

/// Initialize the configuration file if it doesn't exist.
///
/// With `reset`, an existing file is overwritten with the default template.
/// Returns the path to the config file.
pub fn init_config(reset: bool) -> Result<PathBuf, ConfigError> {
    let config_dir = ensure_config_dir()?;
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    if reset || !config_path.exists() {
        fs::write(&config_path, Config::generate_default_config())
            .map_err(|e| ConfigError::WriteError(config_path.clone(), e.to_string()))?;
    }

    Ok(config_path)
}

/// Open the configuration file in the default application.
pub fn open_config_in_editor() -> Result<PathBuf, ConfigError> {
    let config_path = init_config(false)?;

    open::that(&config_path)
        .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;

    Ok(config_path)
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tile grid settings
    pub tiles: TilesConfig,

    /// Dedup engine settings
    pub dedup: DedupConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Tile grid settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilesConfig {
    /// Tile edge length in pixels
    pub size: u32,
}

/// Dedup engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Fingerprint cells in parallel
    pub parallel: bool,

    /// Compare pixels of fingerprint matches and log suspected collisions
    pub verify_matches: bool,
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives the report and the tile directory
    pub directory: PathBuf,

    /// Tile directory name, relative to `directory`
    pub images_dir: String,

    /// HTML report file name, relative to `directory`
    pub report_file: String,

    /// Also write a JSON report next to the HTML one
    pub json_report: bool,

    /// Embed thumbnails in the HTML report as data URLs
    pub embed_thumbnails: bool,

    /// Open the HTML report when done
    pub open_report: bool,

    /// Edge length of report thumbnails in pixels
    pub thumbnail_size: u32,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Also write logs to a file
    pub log_to_file: bool,

    /// Log file path
    pub log_file: PathBuf,
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_TILE_SIZE,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            images_dir: "images".to_string(),
            report_file: "report.html".to_string(),
            json_report: false,
            embed_thumbnails: false,
            open_report: false,
            thumbnail_size: 32,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("texture_dedup.log"),
        }
    }
}

impl OutputConfig {
    /// Directory tiles are exported to
    pub fn images_path(&self) -> PathBuf {
        self.directory.join(&self.images_dir)
    }

    /// Path of the HTML report
    pub fn report_path(&self) -> PathBuf {
        self.directory.join(&self.report_file)
    }

    /// Path of the JSON report: the HTML report path with a `.json` extension
    pub fn json_report_path(&self) -> PathBuf {
        self.report_path().with_extension("json")
    }
}

impl Config {
    /// Dedup options described by this configuration
    pub fn to_dedup_options(&self) -> DedupOptions {
        DedupOptions::new()
            .with_tile_size(self.tiles.size)
            .with_parallel(self.dedup.parallel)
            .with_verify_matches(self.dedup.verify_matches)
    }

    /// Check values that would make a run meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiles.size == 0 {
            return Err(ConfigError::InvalidValue(
                "tiles.size".to_string(),
                "tile size must be at least 1 pixel".to_string(),
            ));
        }

        if self.output.thumbnail_size == 0 {
            return Err(ConfigError::InvalidValue(
                "output.thumbnail_size".to_string(),
                "thumbnail size must be at least 1 pixel".to_string(),
            ));
        }

        if self.output.report_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "output.report_file".to_string(),
                "report file name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./texture_dedup.toml (current directory, for per-project overrides)
    /// 2. Standard config location
    ///
    /// If no config file is found, returns default configuration.
    pub fn load_default() -> Result<Self, ConfigError> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Self::load(&local);
        }

        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                return Self::load(&config_path);
            }
        }

        Ok(Self::default())
    }

    /// Get the path where the config file is (or would be) located.
    pub fn get_active_config_path() -> PathBuf {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return local;
        }

        get_config_path().unwrap_or(local)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::WriteError(path.as_ref().to_path_buf(), e.to_string()))?;

        Ok(())
    }

    /// Generate a default config file with comments
    pub fn generate_default_config() -> String {
        let defaults = Self::default();

        format!(
            r#"# Texture Tile Deduplicator configuration
#
# Every key is optional; missing keys use the values shown here.

[tiles]
# Tile edge length in pixels. Pixels past the last full tile are ignored.
size = {tile_size}

[dedup]
# Fingerprint tiles on all CPU cores. Results are identical either way.
parallel = {parallel}

# Compare pixels whenever two tiles share a fingerprint and log mismatches
# as suspected hash collisions. Matches are still accepted.
verify_matches = {verify}

[output]
# Directory that receives the report and the tile images
directory = "{directory}"

# Tile images go to <directory>/<images_dir>/<fingerprint>.png
images_dir = "{images_dir}"

# HTML report file name
report_file = "{report_file}"

# Also write the report as JSON (same name, .json extension)
json_report = {json_report}

# Embed thumbnails in the HTML report instead of linking tile files
embed_thumbnails = {embed}

# Open the report in the default browser when done
open_report = {open_report}

# Thumbnail edge length in the report, in pixels
thumbnail_size = {thumb}

[logging]
# Log level: error, warn, info, debug, trace
level = "{level}"

# Also write logs to a file
log_to_file = {log_to_file}
log_file = "{log_file}"
"#,
            tile_size = defaults.tiles.size,
            parallel = defaults.dedup.parallel,
            verify = defaults.dedup.verify_matches,
            directory = defaults.output.directory.display(),
            images_dir = defaults.output.images_dir,
            report_file = defaults.output.report_file,
            json_report = defaults.output.json_report,
            embed = defaults.output.embed_thumbnails,
            open_report = defaults.output.open_report,
            thumb = defaults.output.thumbnail_size,
            level = defaults.logging.level,
            log_to_file = defaults.logging.log_to_file,
            log_file = defaults.logging.log_file.display(),
        )
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file was not found at the specified path
    FileNotFound(PathBuf),
    /// Failed to read the configuration file
    ReadError(PathBuf, String),
    /// Failed to parse the configuration file (invalid TOML)
    ParseError(PathBuf, String),
    /// Failed to serialize configuration to TOML
    SerializeError(String),
    /// Failed to write configuration file
    WriteError(PathBuf, String),
    /// Could not determine config directory
    ConfigDirNotFound,
    /// Failed to open config file in editor
    OpenError(PathBuf, String),
    /// A setting has an unusable value
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ReadError(path, err) => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::ParseError(path, err) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::SerializeError(err) => {
                write!(f, "Failed to serialize configuration: {}", err)
            }
            ConfigError::WriteError(path, err) => {
                write!(
                    f,
                    "Failed to write config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::ConfigDirNotFound => {
                write!(f, "Could not determine configuration directory")
            }
            ConfigError::OpenError(path, err) => {
                write!(
                    f,
                    "Failed to open config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::InvalidValue(key, err) => {
                write!(f, "Invalid value for '{}': {}", key, err)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tiles.size, 128);
        assert!(!config.dedup.parallel);
        assert!(!config.dedup.verify_matches);
        assert_eq!(config.output.directory, PathBuf::from("."));
        assert_eq!(config.output.images_dir, "images");
        assert_eq!(config.output.report_file, "report.html");
        assert_eq!(config.output.thumbnail_size, 32);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_template_parses_to_defaults() {
        let parsed: Config = toml::from_str(&Config::generate_default_config()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str("[tiles]\nsize = 64\n").unwrap();
        assert_eq!(parsed.tiles.size, 64);
        assert_eq!(parsed.output, OutputConfig::default());
        assert_eq!(parsed.to_dedup_options().tile_size, 64);
    }

    #[test]
    fn test_zero_tile_size_rejected() {
        let mut config = Config::default();
        config.tiles.size = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "tiles.size"));
        assert!(err.to_string().contains("tiles.size"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[tiles\nsize = ").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::ParseError(..))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.tiles.size = 32;
        config.dedup.parallel = true;
        config.output.json_report = true;
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_output_paths() {
        let output = OutputConfig {
            directory: PathBuf::from("out"),
            ..Default::default()
        };

        assert_eq!(output.images_path(), Path::new("out").join("images"));
        assert_eq!(output.report_path(), Path::new("out").join("report.html"));
        assert_eq!(output.json_report_path(), Path::new("out").join("report.json"));
    }

    #[test]
    fn test_to_dedup_options() {
        let mut config = Config::default();
        config.dedup.parallel = true;
        config.dedup.verify_matches = true;

        let options = config.to_dedup_options();
        assert_eq!(options.tile_size, 128);
        assert!(options.parallel);
        assert!(options.verify_matches);
    }
}
