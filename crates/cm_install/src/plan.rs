//! Copy plans.
//!
//! A [`CopyPlan`] maps a payload key to the destination it should be copied
//! to, or to `None` to skip it. Plans are pure: building one touches neither
//! the payload nor the filesystem, and the copy executor that applies them
//! lives outside this crate.

use crate::option::FileFilter;
use camino::{Utf8Path, Utf8PathBuf};
use cm_core::paths;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Maps a normalized payload key to a destination path.
pub type CopyCallback = Arc<dyn Fn(&str) -> Option<Utf8PathBuf> + Send + Sync>;

/// One file (or directory) the executor should copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedFile {
    pub key: String,
    pub destination: Utf8PathBuf,
}

#[derive(Clone)]
pub struct CopyPlan {
    files: CopyCallback,
    directories: Option<CopyCallback>,
    skips_everything: bool,
}

impl CopyPlan {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&str) -> Option<Utf8PathBuf> + Send + Sync + 'static,
    {
        Self {
            files: Arc::new(callback),
            directories: None,
            skips_everything: false,
        }
    }

    /// A plan that maps every key to `None`.
    pub fn skip_all() -> Self {
        Self {
            files: Arc::new(|_| None),
            directories: None,
            skips_everything: true,
        }
    }

    /// Also plan directories, so that ones without direct file members are created.
    pub fn with_directories<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) -> Option<Utf8PathBuf> + Send + Sync + 'static,
    {
        self.directories = Some(Arc::new(callback));
        self
    }

    pub fn skips_everything(&self) -> bool {
        self.skips_everything
    }

    pub fn moves_empty_directories(&self) -> bool {
        self.directories.is_some()
    }

    pub fn destination(&self, key: &str) -> Option<Utf8PathBuf> {
        (self.files)(&paths::normalize(key))
    }

    pub fn directory_destination(&self, key: &str) -> Option<Utf8PathBuf> {
        self.directories
            .as_ref()
            .and_then(|f| f(&paths::normalize(key)))
    }

    /// Expand the plan over a list of payload files, dropping skipped ones.
    pub fn resolve<'a, I>(&self, files: I) -> Vec<PlannedFile>
    where
        I: IntoIterator<Item = &'a str>,
    {
        files
            .into_iter()
            .filter_map(|key| {
                self.destination(key).map(|destination| PlannedFile {
                    key: paths::normalize(key),
                    destination,
                })
            })
            .collect()
    }

    /// Expand the directory part of the plan; empty unless the plan opted in.
    pub fn resolve_directories<'a, I>(&self, directories: I) -> Vec<PlannedFile>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.directories.is_none() {
            return Vec::new();
        }
        directories
            .into_iter()
            .filter_map(|key| {
                self.directory_destination(key).map(|destination| PlannedFile {
                    key: paths::normalize(key),
                    destination,
                })
            })
            .collect()
    }
}

impl fmt::Debug for CopyPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyPlan")
            .field("directories", &self.directories.is_some())
            .field("skips_everything", &self.skips_everything)
            .finish()
    }
}

/// Entry-relative path of `key`, or `None` when it is outside the entry or is the entry itself.
pub(crate) fn entry_relative(key: &str, entry_path: &str) -> Option<String> {
    paths::relative_path(key, entry_path).filter(|rel| !rel.is_empty())
}

/// The plan shared by every non-track entry.
///
/// A key maps to `destination/relative` when it lives under `entry_path` (the
/// payload root accepts everything) and `filter` does not reject the relative
/// path. With `move_empty_directories`, directories are planned the same way.
pub fn entry_copy_plan(
    entry_path: &str,
    destination: &Utf8Path,
    filter: Option<FileFilter>,
    move_empty_directories: bool,
) -> CopyPlan {
    let entry_path = paths::normalize(entry_path);
    let destination = destination.to_path_buf();

    let make = {
        let entry_path = entry_path.clone();
        let destination = destination.clone();
        let filter = filter.clone();
        move |key: &str| -> Option<Utf8PathBuf> {
            let relative = entry_relative(key, &entry_path)?;
            if let Some(filter) = &filter {
                if !filter(&relative) {
                    return None;
                }
            }
            Some(paths::join_relative(&destination, &relative))
        }
    };

    let plan = CopyPlan::new(make.clone());
    if move_empty_directories {
        plan.with_directories(make)
    } else {
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dest() -> Utf8PathBuf {
        Utf8PathBuf::from("/game/content/cars/abarth500")
    }

    #[test]
    fn test_files_outside_entry_path_are_skipped() {
        let plan = entry_copy_plan("pack/abarth500", &dest(), None, false);
        assert_eq!(
            plan.destination("pack/abarth500/data.acd"),
            Some(dest().join("data.acd"))
        );
        assert_eq!(plan.destination("pack/readme.txt"), None);
        assert_eq!(plan.destination("pack/abarth500_s1/data.acd"), None);
        assert_eq!(plan.destination("pack/abarth500"), None);
    }

    #[test]
    fn test_root_entry_accepts_everything() {
        let plan = entry_copy_plan("", &dest(), None, false);
        assert_eq!(
            plan.destination("ui\\ui_car.json"),
            Some(dest().join("ui").join("ui_car.json"))
        );
    }

    #[test]
    fn test_filter_applies_to_relative_path() {
        let filter: FileFilter = Arc::new(|p: &str| p != "ui/ui_car.json");
        let plan = entry_copy_plan("abarth500", &dest(), Some(filter), false);
        assert_eq!(plan.destination("abarth500/ui/ui_car.json"), None);
        assert!(plan.destination("abarth500/ui/badge.png").is_some());
    }

    #[test]
    fn test_directories_only_when_opted_in() {
        let plain = entry_copy_plan("app", &dest(), None, false);
        assert!(!plain.moves_empty_directories());
        assert_eq!(plain.directory_destination("app/icons"), None);
        assert!(plain.resolve_directories(["app/icons"]).is_empty());

        let with_dirs = entry_copy_plan("app", &dest(), None, true);
        assert_eq!(
            with_dirs.directory_destination("app/icons"),
            Some(dest().join("icons"))
        );
    }

    #[test]
    fn test_skip_all() {
        let plan = CopyPlan::skip_all();
        assert!(plan.skips_everything());
        assert!(plan.resolve(["a.kn5", "ui/ui_track.json"]).is_empty());
    }
}
