//! Update policies.
//!
//! An [`UpdateOption`] describes one way of laying new content over an object
//! that is already installed: overwrite everything, delete the directory first,
//! or overwrite while keeping some existing files. Options optionally carry a
//! file filter, a clean-up list and a pair of hooks run around the copy.

use crate::cancel::Cancellation;
use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Predicate over an entry-relative payload path; `false` excludes the file.
pub type FileFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Produces paths to delete from the destination before copying.
pub type CleanUpFn = Arc<dyn Fn(&Utf8Path) -> Vec<Utf8PathBuf> + Send + Sync>;

/// Asynchronous task run before or after the copy.
pub type InstallHook = Arc<dyn Fn(Cancellation) -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Clone)]
pub struct UpdateOption {
    display_name: String,
    remove_existing: bool,
    clean_install: bool,
    filter: Option<FileFilter>,
    clean_up: Option<CleanUpFn>,
    before_task: Option<InstallHook>,
    after_task: Option<InstallHook>,
}

impl UpdateOption {
    pub fn new(display_name: impl Into<String>, remove_existing: bool) -> Self {
        Self {
            display_name: display_name.into(),
            remove_existing,
            clean_install: remove_existing,
            filter: None,
            clean_up: None,
            before_task: None,
            after_task: None,
        }
    }

    /// Overwrite over the existing files.
    pub fn update_everything() -> Self {
        Self::new("Update everything", false)
    }

    /// Delete the destination directory, then copy.
    pub fn remove_existing_first() -> Self {
        Self::new("Remove existing first", true)
    }

    /// Mark the option as the clean install one even though it keeps the
    /// destination directory, e.g. when it only clears the object's own files.
    pub fn as_clean_install(mut self) -> Self {
        self.clean_install = true;
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_clean_up<F>(mut self, clean_up: F) -> Self
    where
        F: Fn(&Utf8Path) -> Vec<Utf8PathBuf> + Send + Sync + 'static,
    {
        self.clean_up = Some(Arc::new(clean_up));
        self
    }

    pub fn with_hooks(mut self, before: InstallHook, after: InstallHook) -> Self {
        self.before_task = Some(before);
        self.after_task = Some(after);
        self
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn remove_existing(&self) -> bool {
        self.remove_existing
    }

    pub fn is_clean_install(&self) -> bool {
        self.clean_install
    }

    pub fn filter(&self) -> Option<&FileFilter> {
        self.filter.as_ref()
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    /// Whether `relative` passes this option's filter.
    pub fn accepts(&self, relative: &str) -> bool {
        self.filter.as_ref().map_or(true, |f| f(relative))
    }

    pub fn clean_up_paths(&self, destination: &Utf8Path) -> Vec<Utf8PathBuf> {
        self.clean_up
            .as_ref()
            .map(|f| f(destination))
            .unwrap_or_default()
    }

    pub fn before_task(&self) -> Option<&InstallHook> {
        self.before_task.as_ref()
    }

    pub fn after_task(&self) -> Option<&InstallHook> {
        self.after_task.as_ref()
    }
}

impl fmt::Debug for UpdateOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateOption")
            .field("display_name", &self.display_name)
            .field("remove_existing", &self.remove_existing)
            .field("clean_install", &self.clean_install)
            .field("filter", &self.filter.is_some())
            .field("clean_up", &self.clean_up.is_some())
            .field("hooks", &self.before_task.is_some())
            .finish()
    }
}

/// The two options every kind supports; the first one is filter-free.
pub fn default_update_options() -> Vec<UpdateOption> {
    vec![
        UpdateOption::update_everything(),
        UpdateOption::remove_existing_first(),
    ]
}

/// Index of the option to preselect.
pub fn default_option_index(options: &[UpdateOption], prefer_clean_install: bool) -> usize {
    if prefer_clean_install {
        if let Some(idx) = options.iter().position(UpdateOption::is_clean_install) {
            return idx;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_without_filter() {
        let option = UpdateOption::update_everything();
        assert!(option.accepts("anything.kn5"));
        assert!(option.clean_up_paths(Utf8Path::new("/x")).is_empty());
    }

    #[test]
    fn test_filter_excludes() {
        let option = UpdateOption::new("Keep UI", false).with_filter(|p| p != "ui/ui_car.json");
        assert!(!option.accepts("ui/ui_car.json"));
        assert!(option.accepts("data.acd"));
    }

    #[test]
    fn test_clean_up_paths() {
        let option = UpdateOption::update_everything().with_clean_up(|dir| vec![dir.join("clouds")]);
        assert_eq!(
            option.clean_up_paths(Utf8Path::new("/w/rain")),
            vec![Utf8PathBuf::from("/w/rain/clouds")]
        );
    }

    #[test]
    fn test_default_index_prefers_clean_install() {
        let options = default_update_options();
        assert_eq!(default_option_index(&options, false), 0);
        assert_eq!(default_option_index(&options, true), 1);

        let no_clean = vec![UpdateOption::update_everything()];
        assert_eq!(default_option_index(&no_clean, true), 0);
    }

    #[test]
    fn test_default_index_honours_marked_clean_install() {
        let options = vec![
            UpdateOption::update_everything(),
            UpdateOption::new("Remove existing first", false).as_clean_install(),
        ];
        assert!(!options[1].remove_existing());
        assert_eq!(default_option_index(&options, true), 1);
        assert_eq!(default_option_index(&options, false), 0);
    }
}
