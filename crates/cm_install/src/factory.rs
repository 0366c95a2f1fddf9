//! Entry detection.
//!
//! Walks the directories of a payload, shallowest first, and recognizes the
//! content that lives in them by its marker files. Once a directory is taken
//! by an entry nothing nested inside it is looked at again, so the skins of a
//! car in the same payload ship with the car rather than on their own.
//!
//! Generic mods, themes and config files are never detected; the caller
//! builds them with the explicit constructors on [`ContentEntry`].

use crate::entry::track::{TrackEntry, TrackLayoutEntry};
use crate::entry::{ContentEntry, EntryKind};
use crate::error::Result;
use crate::fs_library::parse_ui_json;
use crate::ini;
use crate::payload::Payload;
use crate::plan::entry_relative;
use crate::settings::InstallSettings;
use cm_core::paths;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Detect installable entries in `payload`, with `settings` applied.
pub fn detect_entries(payload: &dyn Payload, settings: &InstallSettings) -> Result<Vec<ContentEntry>> {
    let index = PayloadIndex::new(payload);

    let mut candidates = vec![String::new()];
    candidates.extend(payload.directories());
    candidates.sort_by(|a, b| depth(a).cmp(&depth(b)).then_with(|| a.cmp(b)));

    let mut claimed: Vec<String> = Vec::new();
    let mut entries = Vec::new();
    for dir in &candidates {
        if claimed.iter().any(|c| paths::is_affected_by(dir, c)) {
            continue;
        }
        let found = index.detect(dir);
        if found.is_empty() {
            continue;
        }
        for entry in &found {
            tracing::debug!("Found {} '{}' at '{}'", entry.content_kind(), entry.id(), dir);
        }
        claimed.push(dir.clone());
        entries.extend(found);
    }

    for entry in &mut entries {
        entry.apply_settings(settings);
    }
    tracing::info!("Detected {} entries", entries.len());
    Ok(entries)
}

fn depth(dir: &str) -> usize {
    if dir.is_empty() {
        0
    } else {
        dir.matches('/').count() + 1
    }
}

fn join(dir: &str, relative: &str) -> String {
    if dir.is_empty() {
        relative.to_string()
    } else {
        format!("{dir}/{relative}")
    }
}

struct PayloadIndex<'a> {
    payload: &'a dyn Payload,
    /// Folded key to original key.
    files: HashMap<String, &'a str>,
    /// Folded directory keys.
    dirs: HashSet<String>,
}

impl<'a> PayloadIndex<'a> {
    fn new(payload: &'a dyn Payload) -> Self {
        let files = payload
            .files()
            .iter()
            .map(|key| (paths::fold_case(key), key.as_str()))
            .collect();
        let dirs = payload
            .directories()
            .iter()
            .map(|dir| paths::fold_case(dir))
            .collect();
        Self {
            payload,
            files,
            dirs,
        }
    }

    fn file(&self, dir: &str, relative: &str) -> Option<&'a str> {
        self.files.get(&paths::fold_case(&join(dir, relative))).copied()
    }

    fn has_dir(&self, dir: &str, relative: &str) -> bool {
        self.dirs.contains(&paths::fold_case(&join(dir, relative)))
    }

    /// Files directly inside `dir`, by name.
    fn root_files(&self, dir: &str) -> Vec<&'a str> {
        let mut names: Vec<&'a str> = self
            .payload
            .files()
            .iter()
            .filter(|key| paths::eq_ignore_case(paths::parent_dir(key), dir))
            .map(|key| paths::file_name(key))
            .collect();
        names.sort();
        names
    }

    /// Name of the last segment of `dir`, or of the payload for its root.
    fn dir_name(&self, dir: &str) -> Option<String> {
        if dir.is_empty() {
            self.payload.root_name()
        } else {
            Some(paths::file_name(dir).to_string())
        }
    }

    fn read_json(&self, key: &str) -> Option<Value> {
        let text = self
            .payload
            .read_text(key)
            .map_err(|e| tracing::warn!("Failed to read {}: {}", key, e))
            .ok()?;
        serde_json::from_str(text.trim_start_matches('\u{feff}'))
            .map_err(|e| tracing::warn!("Failed to parse {}: {}", key, e))
            .ok()
    }

    fn read_ui(&self, key: &str) -> (Option<String>, Option<String>) {
        let parsed = self
            .payload
            .read_text(key)
            .and_then(|text| parse_ui_json(&text));
        match parsed {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", key, e);
                (None, None)
            }
        }
    }

    fn detect(&self, dir: &str) -> Vec<ContentEntry> {
        let single = self
            .car(dir)
            .or_else(|| self.track(dir))
            .or_else(|| self.showroom(dir))
            .or_else(|| self.car_skin(dir))
            .or_else(|| self.track_skin(dir))
            .or_else(|| self.weather(dir))
            .or_else(|| self.python_app(dir));
        match single {
            Some(entry) => vec![entry],
            None => self.fonts(dir),
        }
    }

    fn named(&self, kind: EntryKind, dir: &str, ui: Option<&str>) -> Option<ContentEntry> {
        let Some(id) = self.dir_name(dir) else {
            tracing::warn!("Skipping {} at the payload root: it has no name", kind.content_kind());
            return None;
        };
        let mut entry = ContentEntry::new(kind, id, dir);
        if let Some(key) = ui {
            let (name, version) = self.read_ui(key);
            if let Some(name) = name {
                entry = entry.with_name(name);
            }
            entry = entry.with_version(version);
        }
        Some(entry)
    }

    fn car(&self, dir: &str) -> Option<ContentEntry> {
        let ui = self.file(dir, "ui/ui_car.json");
        if ui.is_none() && self.file(dir, "data.acd").is_none() {
            return None;
        }
        self.named(EntryKind::Car, dir, ui)
    }

    fn showroom(&self, dir: &str) -> Option<ContentEntry> {
        let ui = self.file(dir, "ui/ui_showroom.json")?;
        self.named(EntryKind::Showroom, dir, Some(ui))
    }

    fn weather(&self, dir: &str) -> Option<ContentEntry> {
        self.file(dir, "weather.ini")?;
        self.named(EntryKind::Weather, dir, None)
    }

    fn python_app(&self, dir: &str) -> Option<ContentEntry> {
        let id = self.dir_name(dir)?;
        self.file(dir, &format!("{id}.py"))?;
        self.named(EntryKind::PythonApp, dir, None)
    }

    /// `<car>/skins/<skin>/ui_skin.json`
    fn car_skin(&self, dir: &str) -> Option<ContentEntry> {
        let ui = self.file(dir, "ui_skin.json")?;
        let car_id = self.skin_parent(dir)?;
        self.named(EntryKind::CarSkin { car_id }, dir, Some(ui))
    }

    fn track_skin(&self, dir: &str) -> Option<ContentEntry> {
        let ui = self.file(dir, "ui_track_skin.json")?;
        let declared = self
            .read_json(ui)
            .and_then(|v| v.get("track").and_then(Value::as_str).map(str::to_string));
        let track_id = declared.or_else(|| self.skin_parent(dir))?;
        self.named(EntryKind::TrackSkin { track_id }, dir, Some(ui))
    }

    fn skin_parent(&self, dir: &str) -> Option<String> {
        let skins = paths::parent_dir(dir);
        if dir.is_empty() || !paths::eq_ignore_case(paths::file_name(skins), "skins") {
            return None;
        }
        self.dir_name(paths::parent_dir(skins))
    }

    fn fonts(&self, dir: &str) -> Vec<ContentEntry> {
        if dir.is_empty() || !paths::eq_ignore_case(paths::file_name(dir), "fonts") {
            return Vec::new();
        }
        self.root_files(dir)
            .into_iter()
            .filter(|name| paths::has_extension(name, "txt"))
            .map(|name| &name[..name.len() - ".txt".len()])
            .filter(|id| self.has_dir(dir, id))
            .map(|id| ContentEntry::new(EntryKind::Font, id, dir))
            .collect()
    }

    fn track(&self, dir: &str) -> Option<ContentEntry> {
        let root_files = self.root_files(dir);
        let has_models = root_files
            .iter()
            .any(|name| ini::is_models_ini(name) || paths::has_extension(name, "kn5"));
        if !has_models {
            return None;
        }

        let base_ui = self.file(dir, "ui/ui_track.json");
        let layout_uis = self.layout_uis(dir);
        if base_ui.is_none() && layout_uis.is_empty() {
            return None;
        }
        let root_kn5: Vec<String> = root_files
            .iter()
            .filter(|name| paths::has_extension(name, "kn5"))
            .map(|name| name.to_string())
            .collect();

        let id = self.dir_name(dir)?;
        let (name, version) = match base_ui.or_else(|| layout_uis.values().next().copied()) {
            Some(key) => self.read_ui(key),
            None => (None, None),
        };

        let track = if layout_uis.is_empty() {
            let (kn5, required) = self.layout_models(dir, "", &root_kn5);
            TrackEntry::flat(kn5, required)
        } else {
            let mut layouts = Vec::new();
            if base_ui.is_some() {
                let (kn5, required) = self.layout_models(dir, "", &root_kn5);
                layouts.push(
                    TrackLayoutEntry::new("", kn5, required)
                        .with_name(name.clone())
                        .with_version(version.clone()),
                );
            }
            for (layout_id, ui) in &layout_uis {
                let (kn5, required) = self.layout_models(dir, layout_id, &root_kn5);
                let (layout_name, layout_version) = self.read_ui(ui);
                layouts.push(
                    TrackLayoutEntry::new(layout_id.as_str(), kn5, required)
                        .with_name(layout_name)
                        .with_version(layout_version),
                );
            }
            TrackEntry::with_layouts(layouts)
        };

        let mut entry = ContentEntry::track(id, dir, track).with_version(version);
        if let Some(name) = name {
            entry = entry.with_name(name);
        }
        Some(entry)
    }

    /// `ui/<layout>/ui_track.json` keys by layout id.
    fn layout_uis(&self, dir: &str) -> BTreeMap<String, &'a str> {
        let ui_dir = join(dir, "ui");
        self.payload
            .files()
            .iter()
            .filter_map(|key| {
                let relative = entry_relative(key, &ui_dir)?;
                let (layout, file) = relative.split_once('/')?;
                (paths::eq_ignore_case(file, "ui_track.json")).then(|| (layout.to_string(), key.as_str()))
            })
            .collect()
    }

    /// Models of a layout as `(present, required but absent)`.
    ///
    /// Without a models ini the layout is made of the kn5 files at the root.
    fn layout_models(&self, dir: &str, layout_id: &str, root_kn5: &[String]) -> (Vec<String>, Vec<String>) {
        let Some(key) = self.file(dir, &ini::models_ini_name(layout_id)) else {
            return (root_kn5.to_vec(), Vec::new());
        };
        let referenced = match self
            .payload
            .read_text(key)
            .and_then(|text| ini::parse_models_ini(key, &text))
        {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("Ignoring models of layout '{}': {}", layout_id, e);
                Vec::new()
            }
        };

        referenced
            .into_iter()
            .partition(|model| self.file(dir, &paths::normalize(model)).is_some())
    }
}
