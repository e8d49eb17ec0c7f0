//! Config command handler.
//!
//! Displays and resets the runlens configuration.

use crate::config::{
    generate_config_with_comments, global_config_path, load_config_from, save_config_to, Config,
};
use crate::error::Result;
use crate::output::{print_info, BOLD, GRAY, RESET, YELLOW};
use std::path::Path;
use tracing::info;

/// Display the effective configuration.
///
/// A missing config file shows the defaults with a note.
pub fn config_display_command() -> Result<()> {
    display_config_at(&global_config_path()?)
}

fn display_config_at(path: &Path) -> Result<()> {
    println!("{BOLD}# Runlens config{RESET}");
    println!("{GRAY}# {}{RESET}", path.display());
    println!();

    if !path.exists() {
        println!("{YELLOW}# (file does not exist, using defaults){RESET}");
        println!();
    }
    let config = load_config_from(path)?;
    print!("{}", generate_config_with_comments(&config));
    Ok(())
}

/// Overwrite the config file with the defaults.
pub fn config_reset_command() -> Result<()> {
    let path = global_config_path()?;
    reset_config_at(&path)?;
    print_info(&format!("Reset configuration at {}", path.display()));
    Ok(())
}

fn reset_config_at(path: &Path) -> Result<()> {
    save_config_to(path, &Config::default())?;
    info!(path = %path.display(), "configuration reset to defaults");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_display_missing_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        display_config_at(&temp.path().join("config.toml")).unwrap();
    }

    #[test]
    fn test_display_rejects_invalid_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[panel]\ndefault_width = 5\n").unwrap();
        assert!(display_config_at(&path).is_err());
    }

    #[test]
    fn test_reset_writes_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("runlens").join("config.toml");
        reset_config_at(&path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), Config::default());
    }
}
