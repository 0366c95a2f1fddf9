//! Application configuration stored in config.toml.

use crate::errors::CliError;
use camino::{Utf8Path, Utf8PathBuf};
use cm_install::InstallSettings;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Game installation directory (the one holding `content/`).
    pub game_root: Option<Utf8PathBuf>,
    /// Where generic mods live.
    pub mods_dir: Option<Utf8PathBuf>,
    /// Where content manager themes live.
    pub themes_dir: Option<Utf8PathBuf>,
    pub install: InstallSettings,
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// The explicit path if given, config.toml next to the executable otherwise.
pub fn config_path(explicit: Option<&Utf8Path>) -> Result<Utf8PathBuf, CliError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => install_dir()
            .map(|dir| dir.join("config.toml"))
            .ok_or(CliError::ConfigLocationUnknown),
    }
}

/// Reads the configuration strictly. `None` when the file does not exist.
pub fn read_config(path: &Utf8Path) -> Result<Option<AppConfig>, CliError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    toml::from_str(&content)
        .map(Some)
        .map_err(|e| CliError::config_parse_error(path.to_path_buf(), e))
}

/// Loads the configuration, falling back to defaults when the file is
/// missing or unreadable.
pub fn load_config(path: &Utf8Path) -> AppConfig {
    match read_config(path) {
        Ok(Some(cfg)) => cfg,
        Ok(None) => {
            tracing::debug!("No config at {}, using defaults", path);
            AppConfig::default()
        }
        Err(e) => {
            let detail = std::error::Error::source(&e)
                .map(|source| source.to_string())
                .unwrap_or_default();
            tracing::warn!("{} ({}), using defaults", e, detail);
            AppConfig::default()
        }
    }
}

pub fn save_config(cfg: &AppConfig, path: &Utf8Path) -> Result<(), CliError> {
    let content = toml::to_string_pretty(cfg)
        .map_err(|e| CliError::config_write_failed(path.to_path_buf(), std::io::Error::other(e)))?;
    fs::write(path, content).map_err(|e| CliError::config_write_failed(path.to_path_buf(), e))
}

/// Loads existing configuration or writes one with defaults.
/// The flag tells whether the file was created.
pub fn load_or_create_config(path: &Utf8Path) -> Result<(AppConfig, bool), CliError> {
    if let Some(cfg) = read_config(path)? {
        return Ok((cfg, false));
    }
    let cfg = AppConfig::default();
    save_config(&cfg, path)?;
    Ok((cfg, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn temp_path(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("config.toml")).unwrap()
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let cfg = load_config(&temp_path(&dir));
        assert_eq!(cfg, AppConfig::default());
        assert!(cfg.install.keep_existing_shared_models);
    }

    #[test]
    fn partial_install_section_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = temp_path(&dir);
        fs::write(
            &path,
            "game_root = \"/games/ac\"\n\n[install]\nprefer_clean_install = true\n",
        )
        .unwrap();

        let cfg = load_config(&path);
        assert_eq!(cfg.game_root, Some(Utf8PathBuf::from("/games/ac")));
        assert!(cfg.install.prefer_clean_install);
        assert!(cfg.install.move_empty_directories_for_apps);
    }

    #[test]
    fn create_then_load() {
        let dir = tempdir().unwrap();
        let path = temp_path(&dir);
        let (_, created) = load_or_create_config(&path).unwrap();
        assert!(created);
        let (_, created) = load_or_create_config(&path).unwrap();
        assert!(!created);
    }

    #[test]
    fn invalid_toml_is_reported() {
        let dir = tempdir().unwrap();
        let path = temp_path(&dir);
        fs::write(&path, "game_root = [").unwrap();
        assert!(matches!(
            read_config(&path),
            Err(CliError::ConfigParseError { .. })
        ));
        assert_eq!(load_config(&path), AppConfig::default());
        assert!(load_or_create_config(&path).is_err());
    }
}
