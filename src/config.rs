use crate::error::{Result, RunlensError};
use crate::table::{SortConfig, SortDirection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The base config directory name under ~/.config/
const CONFIG_DIR_NAME: &str = "runlens";

// ============================================================================
// Configuration
// ============================================================================

/// User configuration for the run browser.
///
/// Every key is optional in the file; missing keys take their default.
///
/// # Example
///
/// ```toml
/// [panel]
/// default_collapsed = false
/// default_width = 280
/// min_width = 200
/// max_width = 600
/// persist = true
/// namespace = "sidebar"
///
/// [table]
/// default_sort_key = "avgScore"
/// default_sort_direction = "descending"
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub panel: PanelSettings,

    #[serde(default)]
    pub table: TableSettings,
}

/// Settings for the collapsible side panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    /// Whether the panel starts collapsed when nothing is persisted.
    pub default_collapsed: bool,

    /// Width the panel starts with when nothing is persisted.
    pub default_width: f64,

    pub min_width: f64,

    pub max_width: f64,

    /// Whether collapsed state and width survive restarts.
    pub persist: bool,

    /// Prefix of the persisted keys (`<namespace>_collapsed`, `<namespace>_width`).
    pub namespace: String,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            default_collapsed: false,
            default_width: 280.0,
            min_width: 200.0,
            max_width: 600.0,
            persist: false,
            namespace: "panel".to_string(),
        }
    }
}

/// Settings for listing tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub default_sort_key: String,
    pub default_sort_direction: SortDirection,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            default_sort_key: "id".to_string(),
            default_sort_direction: SortDirection::Ascending,
        }
    }
}

impl TableSettings {
    pub fn sort_config(&self) -> SortConfig {
        SortConfig::new(self.default_sort_key.clone(), self.default_sort_direction)
    }
}

// ============================================================================
// Config Validation
// ============================================================================

use std::error::Error;
use std::fmt;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The panel's minimum width is larger than its maximum.
    WidthRangeInverted { min: f64, max: f64 },

    /// The panel's default width lies outside `[min_width, max_width]`.
    DefaultWidthOutOfRange { width: f64, min: f64, max: f64 },

    /// Persistence is enabled without a key namespace.
    EmptyNamespace,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::WidthRangeInverted { min, max } => {
                write!(
                    f,
                    "Panel min_width ({}) is larger than max_width ({}). \
                    Lower `min_width` or raise `max_width`",
                    min, max
                )
            }
            ConfigError::DefaultWidthOutOfRange { width, min, max } => {
                write!(
                    f,
                    "Panel default_width ({}) must lie between min_width ({}) and max_width ({})",
                    width, min, max
                )
            }
            ConfigError::EmptyNamespace => {
                write!(f, "Panel persistence needs a non-empty `namespace`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Validate a configuration for logical consistency.
///
/// # Validation Rules
///
/// - `min_width <= max_width`
/// - `min_width <= default_width <= max_width`
/// - `persist = true` requires a non-empty `namespace`
///
/// # Example
///
/// ```
/// use runlens::config::{Config, validate_config};
///
/// let mut config = Config::default();
/// assert!(validate_config(&config).is_ok());
///
/// config.panel.min_width = 700.0;
/// assert!(validate_config(&config).is_err());
/// ```
pub fn validate_config(config: &Config) -> std::result::Result<(), ConfigError> {
    let panel = &config.panel;
    if panel.min_width > panel.max_width {
        return Err(ConfigError::WidthRangeInverted {
            min: panel.min_width,
            max: panel.max_width,
        });
    }
    if !(panel.min_width..=panel.max_width).contains(&panel.default_width) {
        return Err(ConfigError::DefaultWidthOutOfRange {
            width: panel.default_width,
            min: panel.min_width,
            max: panel.max_width,
        });
    }
    if panel.persist && panel.namespace.trim().is_empty() {
        return Err(ConfigError::EmptyNamespace);
    }
    Ok(())
}

// ============================================================================
// Config File Management
// ============================================================================

/// The filename for the global configuration file.
const GLOBAL_CONFIG_FILENAME: &str = "config.toml";

/// Get the runlens config directory path (~/.config/runlens/).
///
/// Returns the path to the config directory. Does not create the directory.
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RunlensError::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR_NAME))
}

/// Ensure the runlens config directory exists.
///
/// Returns whether the directory was newly created.
pub fn ensure_config_dir() -> Result<(PathBuf, bool)> {
    let dir = config_dir()?;
    let created = !dir.exists();
    fs::create_dir_all(&dir)?;
    Ok((dir, created))
}

/// Get the path to the global config file (`~/.config/runlens/config.toml`).
pub fn global_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(GLOBAL_CONFIG_FILENAME))
}

/// Load the global configuration.
///
/// A missing file yields the defaults; nothing is written.
pub fn load_global_config() -> Result<Config> {
    load_config_from(&global_config_path()?)
}

/// Save the global configuration, with explanatory comments.
pub fn save_global_config(config: &Config) -> Result<()> {
    ensure_config_dir()?;
    save_config_to(&global_config_path()?, config)
}

/// Load and validate a configuration file. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content).map_err(|e| {
        RunlensError::Config(format!("Failed to parse config file at {:?}: {}", path, e))
    })?;
    validate_config(&config).map_err(|e| RunlensError::Config(e.to_string()))?;

    Ok(config)
}

/// Write a configuration file with explanatory comments.
pub fn save_config_to(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, generate_config_with_comments(config))?;
    Ok(())
}

/// Generate config file content with explanatory comments.
pub fn generate_config_with_comments(config: &Config) -> String {
    let panel = &config.panel;
    let table = &config.table;
    format!(
        r#"# Runlens Configuration

[panel]
# Whether the side panel starts collapsed when no state is persisted
default_collapsed = {}

# Panel width bounds; every resize is clamped to [min_width, max_width]
default_width = {:?}
min_width = {:?}
max_width = {:?}

# Persist collapsed state and width between sessions
# Keys are stored as "<namespace>_collapsed" and "<namespace>_width"
persist = {}
namespace = {:?}

[table]
# Initial sort of every listing
# default_sort_direction: "ascending" or "descending"
default_sort_key = {:?}
default_sort_direction = "{}"
"#,
        panel.default_collapsed,
        panel.default_width,
        panel.min_width,
        panel.max_width,
        panel.persist,
        panel.namespace,
        table.default_sort_key,
        table.default_sort_direction,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ========================================================================
    // Defaults and validation
    // ========================================================================

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.panel.default_width, 280.0);
        assert_eq!(config.table.sort_config(), SortConfig::ascending("id"));
    }

    #[test]
    fn test_validate_inverted_range() {
        let mut config = Config::default();
        config.panel.min_width = 700.0;
        assert_eq!(
            validate_config(&config),
            Err(ConfigError::WidthRangeInverted { min: 700.0, max: 600.0 })
        );
    }

    #[test]
    fn test_validate_default_out_of_range() {
        let mut config = Config::default();
        config.panel.default_width = 100.0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("default_width (100)"));
    }

    #[test]
    fn test_validate_empty_namespace_with_persist() {
        let mut config = Config::default();
        config.panel.namespace = " ".to_string();
        assert!(validate_config(&config).is_ok());
        config.panel.persist = true;
        assert_eq!(validate_config(&config), Err(ConfigError::EmptyNamespace));
    }

    #[test]
    fn test_config_dir_ends_with_runlens() {
        let dir = config_dir().unwrap();
        assert!(dir.ends_with(".config/runlens"));
    }

    // ========================================================================
    // File round trip
    // ========================================================================

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config_from(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[table]\ndefault_sort_direction = \"descending\"\n").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.table.default_sort_direction, SortDirection::Descending);
        assert_eq!(config.table.default_sort_key, "id");
        assert_eq!(config.panel, PanelSettings::default());
    }

    #[test]
    fn test_saved_file_loads_back_with_comments() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.panel.persist = true;
        config.panel.namespace = "sidebar".to_string();
        config.table.default_sort_key = "avgScore".to_string();

        save_config_to(&path, &config).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Runlens Configuration"));
        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[panel]\nmin_width = 900\n").unwrap();
        assert!(matches!(load_config_from(&path), Err(RunlensError::Config(_))));

        fs::write(&path, "not toml at all [").unwrap();
        assert!(matches!(load_config_from(&path), Err(RunlensError::Config(_))));
    }
}
