//! Installable entries.
//!
//! A [`ContentEntry`] is one unit found in a payload: a car, a track, a skin
//! and so on. Its lifecycle is short:
//!
//! 1. built by the [factory](crate::factory) or an explicit constructor,
//! 2. [`initialize`](ContentEntry::initialize)d against the library, which
//!    probes for an existing object and, for tracks, resolves the layout merge,
//! 3. adjusted through its toggles (selected option, active layouts, shared
//!    models),
//! 4. turned into [`InstallationDetails`] once.
//!
//! Every toggle that affects the shared-model overlap of a track triggers an
//! explicit recompute.

mod options;
pub mod track;

use crate::cancel::Cancellation;
use crate::details::InstallationDetails;
use crate::error::{Error, Result};
use crate::kind::{skin_object_id, ContentKind};
use crate::library::{ContentLibrary, LibraryObject};
use crate::mods::GenericModsEnabler;
use crate::option::{default_option_index, FileFilter, UpdateOption};
use crate::plan::{entry_copy_plan, entry_relative, CopyPlan};
use crate::settings::InstallSettings;
use camino::{Utf8Path, Utf8PathBuf};
use cm_core::{is_version_newer_than, is_version_older_than, paths};
use std::fmt;
use std::sync::{Arc, OnceLock};
use track::TrackEntry;

/// Kind-specific state of an entry.
#[derive(Clone)]
pub enum EntryKind {
    Car,
    CarSkin { car_id: String },
    Track(TrackEntry),
    TrackSkin { track_id: String },
    Showroom,
    Font,
    Weather,
    PythonApp,
    GenericMod { enabler: Arc<dyn GenericModsEnabler> },
    Theme,
    /// A single file copied to `target`, relative to the game root.
    ConfigFile { target: String },
}

impl EntryKind {
    pub fn content_kind(&self) -> ContentKind {
        match self {
            EntryKind::Car => ContentKind::Car,
            EntryKind::CarSkin { .. } => ContentKind::CarSkin,
            EntryKind::Track(_) => ContentKind::Track,
            EntryKind::TrackSkin { .. } => ContentKind::TrackSkin,
            EntryKind::Showroom => ContentKind::Showroom,
            EntryKind::Font => ContentKind::Font,
            EntryKind::Weather => ContentKind::Weather,
            EntryKind::PythonApp => ContentKind::PythonApp,
            EntryKind::GenericMod { .. } => ContentKind::GenericMod,
            EntryKind::Theme => ContentKind::Theme,
            EntryKind::ConfigFile { .. } => ContentKind::ConfigFile,
        }
    }
}

impl fmt::Debug for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::CarSkin { car_id } => write!(f, "CarSkin({car_id})"),
            EntryKind::TrackSkin { track_id } => write!(f, "TrackSkin({track_id})"),
            EntryKind::Track(track) => f.debug_tuple("Track").field(track).finish(),
            EntryKind::ConfigFile { target } => write!(f, "ConfigFile({target})"),
            other => write!(f, "{:?}", other.content_kind()),
        }
    }
}

#[derive(Clone)]
pub struct ContentEntry {
    id: String,
    entry_path: String,
    name: String,
    version: Option<String>,
    version_overridden: bool,
    kind: EntryKind,
    existing: Option<LibraryObject>,
    initialized: bool,
    is_newer: bool,
    is_older: bool,
    update_options: OnceLock<Vec<UpdateOption>>,
    selected: Option<usize>,
    prefer_clean_install: bool,
    move_empty_directories: bool,
}

impl ContentEntry {
    pub fn new(kind: EntryKind, id: impl Into<String>, entry_path: impl Into<String>) -> Self {
        let id = id.into();
        let move_empty_directories = matches!(kind, EntryKind::PythonApp);
        Self {
            name: id.clone(),
            id,
            entry_path: paths::normalize(&entry_path.into()),
            version: None,
            version_overridden: false,
            kind,
            existing: None,
            initialized: false,
            is_newer: false,
            is_older: false,
            update_options: OnceLock::new(),
            selected: None,
            prefer_clean_install: false,
            move_empty_directories,
        }
    }

    pub fn track(id: impl Into<String>, entry_path: impl Into<String>, track: TrackEntry) -> Self {
        Self::new(EntryKind::Track(track), id, entry_path)
    }

    pub fn generic_mod(
        name: impl Into<String>,
        entry_path: impl Into<String>,
        enabler: Arc<dyn GenericModsEnabler>,
    ) -> Self {
        Self::new(EntryKind::GenericMod { enabler }, name, entry_path)
    }

    /// A theme made of `<id>.xaml` and an optional `<id>/` directory under `entry_path`.
    pub fn theme(id: impl Into<String>, entry_path: impl Into<String>) -> Self {
        Self::new(EntryKind::Theme, id, entry_path)
    }

    /// The payload file `key`, copied to `target` inside the game root.
    pub fn config_file(key: impl Into<String>, target: impl Into<String>) -> Self {
        let key = paths::normalize(&key.into());
        let target = paths::normalize(&target.into());
        Self::new(EntryKind::ConfigFile { target: target.clone() }, target, key)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entry_path(&self) -> &str {
        &self.entry_path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    pub fn content_kind(&self) -> ContentKind {
        self.kind.content_kind()
    }

    /// Id of the object in the library; skins are namespaced by their parent.
    pub fn object_id(&self) -> String {
        match &self.kind {
            EntryKind::CarSkin { car_id } => skin_object_id(car_id, &self.id),
            EntryKind::TrackSkin { track_id } => skin_object_id(track_id, &self.id),
            _ => self.id.clone(),
        }
    }

    /// Replace the version with one supplied by installation parameters.
    /// Only the first override sticks.
    pub fn override_version(&mut self, version: impl Into<String>) -> bool {
        if self.version_overridden {
            return false;
        }
        self.version = Some(version.into());
        self.version_overridden = true;
        if let Some(existing) = &self.existing {
            let existing_version = existing.version.clone();
            self.update_version_flags(existing_version.as_deref());
        }
        true
    }

    pub fn apply_settings(&mut self, settings: &InstallSettings) {
        self.prefer_clean_install = settings.prefer_clean_install;
        self.move_empty_directories =
            matches!(self.kind, EntryKind::PythonApp) && settings.move_empty_directories_for_apps;
        if let EntryKind::Track(track) = &mut self.kind {
            track.set_keep_existing_shared_models(settings.keep_existing_shared_models);
        }
        self.refresh_overlap();
    }

    /// Probe the library for an existing object and resolve track merges.
    ///
    /// A failing probe is logged and treated as "nothing installed".
    pub async fn initialize(&mut self, library: &dyn ContentLibrary) {
        let kind = self.content_kind();
        let object_id = self.object_id();

        let probe = async {
            library.ensure_loaded(kind).await?;
            library.get_by_id(kind, &object_id).await
        };
        let existing = match probe.await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!("Failed to look up {} '{}': {}", kind, object_id, e);
                None
            }
        };

        self.set_existing(existing);
    }

    fn set_existing(&mut self, existing: Option<LibraryObject>) {
        let existing_version = existing.as_ref().and_then(|e| e.version.clone());
        self.update_version_flags(existing_version.as_deref());

        if let EntryKind::Track(track) = &mut self.kind {
            let installed = existing
                .as_ref()
                .and_then(|e| e.track().map(|t| (e.id.as_str(), t)));
            track.resolve_merge(installed);
        }

        self.existing = existing;
        self.initialized = true;
        self.update_options = OnceLock::new();
        if self
            .selected
            .is_some_and(|idx| idx >= self.update_options().len())
        {
            self.selected = None;
        }
        self.refresh_overlap();

        tracing::debug!(
            "{} '{}': {}",
            self.content_kind(),
            self.id,
            if self.is_new() { "new" } else { "update" }
        );
    }

    fn update_version_flags(&mut self, existing_version: Option<&str>) {
        let version = self.version.as_deref();
        self.is_newer = is_version_newer_than(version, existing_version);
        self.is_older = is_version_older_than(version, existing_version);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_new(&self) -> bool {
        self.existing.is_none()
    }

    pub fn existing(&self) -> Option<&LibraryObject> {
        self.existing.as_ref()
    }

    pub fn existing_name(&self) -> Option<&str> {
        self.existing.as_ref().and_then(|e| e.name.as_deref())
    }

    pub fn existing_version(&self) -> Option<&str> {
        self.existing.as_ref().and_then(|e| e.version.as_deref())
    }

    pub fn is_newer(&self) -> bool {
        self.is_newer
    }

    pub fn is_older(&self) -> bool {
        self.is_older
    }

    /// Options valid for this entry. Computed on first access and memoized
    /// until the existence probe changes what is installed.
    pub fn update_options(&self) -> &[UpdateOption] {
        self.update_options
            .get_or_init(|| options::options_for(&self.kind, &self.id, self.existing.is_some()))
    }

    pub fn selected_option_index(&self) -> usize {
        let options = self.update_options();
        self.selected
            .filter(|idx| *idx < options.len())
            .unwrap_or_else(|| default_option_index(options, self.prefer_clean_install))
    }

    pub fn selected_option(&self) -> &UpdateOption {
        let idx = self.selected_option_index();
        &self.update_options()[idx]
    }

    pub fn set_selected_option(&mut self, index: usize) -> Result<()> {
        if index >= self.update_options().len() {
            return Err(Error::Other(format!(
                "'{}' has no update option #{}",
                self.id, index
            )));
        }
        let old = self.selected_option_index();
        self.selected = Some(index);
        if old != index {
            self.on_selected_option_changed();
        }
        Ok(())
    }

    fn on_selected_option_changed(&mut self) {
        self.refresh_overlap();
    }

    pub fn track_entry(&self) -> Option<&TrackEntry> {
        match &self.kind {
            EntryKind::Track(track) => Some(track),
            _ => None,
        }
    }

    /// Toggle a track layout. Returns `false` when the entry has no such layout.
    pub fn set_layout_active(&mut self, layout_id: &str, active: bool) -> bool {
        let EntryKind::Track(track) = &mut self.kind else {
            return false;
        };
        if !track.set_layout_active(layout_id, active) {
            return false;
        }
        self.refresh_overlap();
        true
    }

    pub fn set_keep_existing_shared_models(&mut self, keep: bool) {
        if let EntryKind::Track(track) = &mut self.kind {
            track.set_keep_existing_shared_models(keep);
        }
    }

    /// Recompute the shared-model overlap of a track; no-op for other kinds.
    pub fn update_shared_models_overlap(&mut self) {
        self.refresh_overlap();
    }

    fn refresh_overlap(&mut self) {
        if !matches!(self.kind, EntryKind::Track(_)) {
            return;
        }
        let remove_existing = self.selected_option().remove_existing();
        if let EntryKind::Track(track) = &mut self.kind {
            track.update_shared_models_overlap(remove_existing);
        }
    }

    fn destination(&self, library: &dyn ContentLibrary) -> Result<Utf8PathBuf> {
        let kind = self.content_kind();
        let unavailable = |e: Error| Error::DestinationUnavailable {
            kind,
            id: self.object_id(),
            reason: e.to_string(),
        };

        match &self.kind {
            EntryKind::Font | EntryKind::Theme => library.content_directory(kind).map_err(unavailable),
            EntryKind::ConfigFile { target } => {
                let root = library.content_directory(kind).map_err(unavailable)?;
                Ok(paths::join_relative(&root, paths::parent_dir(target)))
            }
            _ => {
                if let Some(existing) = &self.existing {
                    return Ok(existing.location.clone());
                }
                let dir = library.content_directory(kind).map_err(unavailable)?;
                Ok(match &self.kind {
                    EntryKind::CarSkin { car_id } => dir.join(car_id).join("skins").join(&self.id),
                    EntryKind::TrackSkin { track_id } => {
                        dir.join(track_id).join("skins").join(&self.id)
                    }
                    _ => dir.join(&self.id),
                })
            }
        }
    }

    fn copy_plan(&self, destination: &Utf8Path, option: &UpdateOption) -> CopyPlan {
        let filter = option.filter().cloned();
        match &self.kind {
            EntryKind::Track(track) => track.copy_plan(&self.entry_path, destination, filter),
            EntryKind::Font => self.members_plan(destination, "txt", filter),
            EntryKind::Theme => self.members_plan(destination, "xaml", filter),
            EntryKind::ConfigFile { target } => {
                let file_name = paths::file_name(target).to_string();
                if !option.accepts(&file_name) {
                    return CopyPlan::skip_all();
                }
                let key = self.entry_path.clone();
                let destination = destination.join(file_name);
                CopyPlan::new(move |k| paths::are_same(k, &key).then(|| destination.clone()))
            }
            _ => entry_copy_plan(
                &self.entry_path,
                destination,
                filter,
                self.move_empty_directories,
            ),
        }
    }

    /// Plan for objects made of `<id>.<extension>` plus an `<id>/` directory.
    fn members_plan(
        &self,
        destination: &Utf8Path,
        extension: &str,
        filter: Option<FileFilter>,
    ) -> CopyPlan {
        let file = format!("{}.{}", self.id, extension);
        let dir = self.id.clone();
        let entry_path = self.entry_path.clone();
        let destination = destination.to_path_buf();
        CopyPlan::new(move |key| {
            let relative = entry_relative(key, &entry_path)?;
            if !paths::eq_ignore_case(&relative, &file) && !paths::is_affected_by(&relative, &dir) {
                return None;
            }
            if let Some(filter) = &filter {
                if !filter(&relative) {
                    return None;
                }
            }
            Some(paths::join_relative(&destination, &relative))
        })
    }

    /// Resolve where the entry goes and what to copy.
    ///
    /// Returns `Ok(None)` when cancellation was requested; the caller skips
    /// the entry. Destination failures come back as
    /// [`Error::DestinationUnavailable`].
    pub fn installation_details(
        &self,
        library: &dyn ContentLibrary,
        cancel: &Cancellation,
    ) -> Result<Option<InstallationDetails>> {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let destination = self.destination(library)?;
        let option = self.selected_option();
        let updating = self.existing.is_some();
        let additive = self.track_entry().is_some_and(TrackEntry::no_conflict_mode);
        let copy_plan = self.copy_plan(&destination, option);

        Ok(Some(InstallationDetails {
            entry_id: self.object_id(),
            kind: self.content_kind(),
            display_name: self.name.clone(),
            clean_up_paths: if updating && !additive {
                option.clean_up_paths(&destination)
            } else {
                Vec::new()
            },
            remove_existing: updating && !additive && option.remove_existing(),
            before_task: option.before_task().cloned(),
            after_task: option.after_task().cloned(),
            destination,
            copy_plan,
        }))
    }
}

impl fmt::Debug for ContentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentEntry")
            .field("id", &self.id)
            .field("entry_path", &self.entry_path)
            .field("kind", &self.kind)
            .field("version", &self.version)
            .field("is_new", &self.is_new())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::MemoryLibrary;

    #[tokio::test]
    async fn test_new_car_destination() {
        let library = MemoryLibrary::new("/ac");
        let mut entry = ContentEntry::new(EntryKind::Car, "abarth500", "pack/abarth500");
        entry.initialize(&library).await;
        assert!(entry.is_new());

        let details = entry
            .installation_details(&library, &Cancellation::new())
            .unwrap()
            .unwrap();
        assert_eq!(details.destination, Utf8PathBuf::from("/ac/content/cars/abarth500"));
        assert_eq!(
            details.copy_plan.destination("pack/abarth500/data.acd"),
            Some(Utf8PathBuf::from("/ac/content/cars/abarth500/data.acd"))
        );
        assert!(!details.remove_existing);
    }

    #[tokio::test]
    async fn test_existing_car_versions() {
        let library = MemoryLibrary::new("/ac").with_object(
            ContentKind::Car,
            LibraryObject::new("abarth500", "/ac/content/cars/Abarth500").with_version("1.0"),
        );
        let mut entry = ContentEntry::new(EntryKind::Car, "abarth500", "")
            .with_version(Some("1.1".into()));
        entry.initialize(&library).await;
        assert!(!entry.is_new());
        assert!(entry.is_newer());
        assert!(!entry.is_older());
        assert_eq!(entry.existing_version(), Some("1.0"));

        assert!(entry.override_version("0.9"));
        assert!(entry.is_older());
        assert!(!entry.override_version("2.0"));
        assert_eq!(entry.version(), Some("0.9"));

        let details = entry
            .installation_details(&library, &Cancellation::new())
            .unwrap()
            .unwrap();
        assert_eq!(details.destination, Utf8PathBuf::from("/ac/content/cars/Abarth500"));
    }

    #[tokio::test]
    async fn test_probe_failure_means_new() {
        let library = MemoryLibrary::new("/ac").failing_lookups();
        let mut entry = ContentEntry::new(EntryKind::Car, "abarth500", "");
        entry.initialize(&library).await;
        assert!(entry.is_initialized());
        assert!(entry.is_new());
    }

    #[tokio::test]
    async fn test_prefer_clean_install_selects_remove_existing() {
        let mut entry = ContentEntry::new(EntryKind::Car, "abarth500", "");
        assert_eq!(entry.selected_option().display_name(), "Update everything");
        entry.apply_settings(&InstallSettings {
            prefer_clean_install: true,
            ..InstallSettings::default()
        });
        assert!(entry.selected_option().remove_existing());

        entry.set_selected_option(2).unwrap();
        assert_eq!(entry.selected_option().display_name(), "Keep UI information");
        assert!(entry.set_selected_option(99).is_err());
    }

    #[tokio::test]
    async fn test_skin_destination_uses_parent() {
        let library = MemoryLibrary::new("/ac");
        let mut entry = ContentEntry::new(
            EntryKind::CarSkin {
                car_id: "abarth500".into(),
            },
            "red",
            "abarth500/skins/red",
        );
        entry.initialize(&library).await;
        assert_eq!(entry.object_id(), "abarth500/red");
        let details = entry
            .installation_details(&library, &Cancellation::new())
            .unwrap()
            .unwrap();
        assert_eq!(
            details.destination,
            Utf8PathBuf::from("/ac/content/cars/abarth500/skins/red")
        );
    }

    #[tokio::test]
    async fn test_weather_clean_up_only_when_updating() {
        let library = MemoryLibrary::new("/ac");
        let mut entry = ContentEntry::new(EntryKind::Weather, "rain", "rain");
        entry.initialize(&library).await;
        let details = entry
            .installation_details(&library, &Cancellation::new())
            .unwrap()
            .unwrap();
        assert!(details.clean_up_paths.is_empty());

        let library = library.with_object(
            ContentKind::Weather,
            LibraryObject::new("rain", "/ac/content/weather/rain"),
        );
        entry.initialize(&library).await;
        let details = entry
            .installation_details(&library, &Cancellation::new())
            .unwrap()
            .unwrap();
        assert_eq!(
            details.clean_up_paths,
            vec![Utf8PathBuf::from("/ac/content/weather/rain/clouds")]
        );
    }

    #[tokio::test]
    async fn test_font_plans_only_its_members() {
        let library = MemoryLibrary::new("/ac");
        let mut entry = ContentEntry::new(EntryKind::Font, "digital", "fonts");
        entry.initialize(&library).await;
        let plan = entry
            .installation_details(&library, &Cancellation::new())
            .unwrap()
            .unwrap()
            .copy_plan;
        assert_eq!(
            plan.destination("fonts/digital.txt"),
            Some(Utf8PathBuf::from("/ac/content/fonts/digital.txt"))
        );
        assert!(plan.destination("fonts/digital/0.png").is_some());
        assert!(plan.destination("fonts/other.txt").is_none());
    }

    #[tokio::test]
    async fn test_config_file_keep_existing_skips() {
        let library = MemoryLibrary::new("/ac").with_object(
            ContentKind::ConfigFile,
            LibraryObject::new("cfg/race.ini", "/ac/cfg/race.ini"),
        );
        let mut entry = ContentEntry::config_file("presets/race.ini", "cfg/race.ini");
        entry.initialize(&library).await;

        let details = entry
            .installation_details(&library, &Cancellation::new())
            .unwrap()
            .unwrap();
        assert_eq!(
            details.copy_plan.destination("presets/race.ini"),
            Some(Utf8PathBuf::from("/ac/cfg/race.ini"))
        );

        entry.set_selected_option(1).unwrap();
        let details = entry
            .installation_details(&library, &Cancellation::new())
            .unwrap()
            .unwrap();
        assert!(details.copy_plan.skips_everything());
    }

    #[tokio::test]
    async fn test_cancelled_resolution_returns_none() {
        let library = MemoryLibrary::new("/ac");
        let entry = ContentEntry::new(EntryKind::Car, "abarth500", "");
        let cancel = Cancellation::new();
        cancel.cancel();
        assert!(entry.installation_details(&library, &cancel).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_destination_failure() {
        let library = MemoryLibrary::new("/ac");
        let entry = ContentEntry::theme("dark", "themes");
        let err = entry
            .installation_details(&library, &Cancellation::new())
            .unwrap_err();
        assert!(matches!(err, Error::DestinationUnavailable { .. }));
    }
}
