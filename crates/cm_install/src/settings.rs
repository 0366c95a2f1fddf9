//! Installation preferences.
//!
//! These used to be ambient global flags in desktop content managers. Here they
//! are a plain value handed to [`InstallationPlanner`](crate::InstallationPlanner),
//! which applies them to every entry it initializes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSettings {
    /// Select a "remove existing first" option by default when one exists.
    pub prefer_clean_install: bool,
    /// Initial value of the track toggle that keeps shared models already on disk.
    pub keep_existing_shared_models: bool,
    /// Let app-installer style entries also plan directories without files.
    pub move_empty_directories_for_apps: bool,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            prefer_clean_install: false,
            keep_existing_shared_models: true,
            move_empty_directories_for_apps: true,
        }
    }
}
