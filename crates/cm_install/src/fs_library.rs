//! Filesystem-backed object library.
//!
//! Reads installed content straight from a game directory:
//!
//! ```text
//! game_root/
//!   content/
//!     cars/<car>/ui/ui_car.json
//!     cars/<car>/skins/<skin>/ui_skin.json
//!     tracks/<track>/models.ini | models_<layout>.ini
//!     tracks/<track>/ui/ui_track.json | ui/<layout>/ui_track.json
//!     tracks/<track>/skins/<skin>/ui_track_skin.json
//!     showroom/<id>/ui/ui_showroom.json
//!     fonts/<id>.txt + fonts/<id>/
//!     weather/<id>/
//!   apps/python/<id>/
//! ```
//!
//! Generic mods and themes live in directories chosen by the user, so they
//! are only available when configured.

use crate::error::{Error, Result};
use crate::ini;
use crate::kind::ContentKind;
use crate::library::{
    ContentLibrary, InstalledLayout, InstalledTrack, LibraryObject, ObjectDetails,
};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cm_core::paths;
use serde_json::Value;

pub struct FsContentLibrary {
    game_root: Utf8PathBuf,
    mods_dir: Option<Utf8PathBuf>,
    themes_dir: Option<Utf8PathBuf>,
}

/// Display metadata read from a `ui_*.json` file.
#[derive(Debug, Default, Clone, PartialEq)]
struct UiInfo {
    name: Option<String>,
    version: Option<String>,
}

impl FsContentLibrary {
    pub fn new(game_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            game_root: game_root.into(),
            mods_dir: None,
            themes_dir: None,
        }
    }

    pub fn with_mods_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.mods_dir = Some(dir.into());
        self
    }

    pub fn with_themes_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.themes_dir = Some(dir.into());
        self
    }

    pub fn game_root(&self) -> &Utf8Path {
        &self.game_root
    }

    fn kind_dir(&self, kind: ContentKind) -> Result<Utf8PathBuf> {
        let content = self.game_root.join("content");
        Ok(match kind {
            ContentKind::Car | ContentKind::CarSkin => content.join("cars"),
            ContentKind::Track | ContentKind::TrackSkin => content.join("tracks"),
            ContentKind::Showroom => content.join("showroom"),
            ContentKind::Font => content.join("fonts"),
            ContentKind::Weather => content.join("weather"),
            ContentKind::PythonApp => self.game_root.join("apps").join("python"),
            ContentKind::GenericMod => self
                .mods_dir
                .clone()
                .ok_or_else(|| Error::Library("mods directory is not configured".to_string()))?,
            ContentKind::Theme => self
                .themes_dir
                .clone()
                .ok_or_else(|| Error::Library("themes directory is not configured".to_string()))?,
            ContentKind::ConfigFile => self.game_root.clone(),
        })
    }

    fn find_object(&self, kind: ContentKind, id: &str) -> Result<Option<LibraryObject>> {
        let base = self.kind_dir(kind)?;
        if !base.as_std_path().is_dir() {
            return Ok(None);
        }

        match kind {
            ContentKind::Car => Ok(find_child(&base, id)?
                .filter(|dir| dir.as_std_path().is_dir())
                .map(|dir| plain_object(dir.clone(), read_ui(&dir.join("ui").join("ui_car.json"))))),
            ContentKind::Showroom => Ok(find_child(&base, id)?
                .filter(|dir| dir.as_std_path().is_dir())
                .map(|dir| {
                    plain_object(dir.clone(), read_ui(&dir.join("ui").join("ui_showroom.json")))
                })),
            ContentKind::Weather | ContentKind::PythonApp | ContentKind::GenericMod => {
                Ok(find_child(&base, id)?
                    .filter(|dir| dir.as_std_path().is_dir())
                    .map(|dir| plain_object(dir, UiInfo::default())))
            }
            ContentKind::CarSkin | ContentKind::TrackSkin => {
                let Some((parent, skin)) = id.split_once('/') else {
                    return Ok(None);
                };
                let Some(parent_dir) = find_child(&base, parent)? else {
                    return Ok(None);
                };
                let Some(skin_dir) = find_child(&parent_dir.join("skins"), skin)? else {
                    return Ok(None);
                };
                let ui_name = if kind == ContentKind::CarSkin {
                    "ui_skin.json"
                } else {
                    "ui_track_skin.json"
                };
                let ui = read_ui(&skin_dir.join(ui_name));
                Ok(Some(plain_object(skin_dir, ui)))
            }
            ContentKind::Track => {
                let Some(dir) = find_child(&base, id)? else {
                    return Ok(None);
                };
                if !dir.as_std_path().is_dir() {
                    return Ok(None);
                }
                let (track, ui) = read_track(&dir)?;
                let mut object = plain_object(dir, ui).with_track(track);
                if object.name.is_none() {
                    object.name = object.track().and_then(|t| t.name.clone());
                }
                Ok(Some(object))
            }
            ContentKind::Font => Ok(find_child(&base, &format!("{id}.txt"))?
                .map(|file| plain_object(file, UiInfo::default()))),
            ContentKind::Theme => Ok(find_child(&base, &format!("{id}.xaml"))?
                .map(|file| plain_object(file, UiInfo::default()))),
            ContentKind::ConfigFile => {
                let path = paths::join_relative(&base, id);
                Ok(path
                    .as_std_path()
                    .is_file()
                    .then(|| plain_object(path, UiInfo::default())))
            }
        }
    }
}

#[async_trait]
impl ContentLibrary for FsContentLibrary {
    async fn ensure_loaded(&self, kind: ContentKind) -> Result<()> {
        if !self.game_root.as_std_path().is_dir() {
            return Err(Error::DirectoryNotFound(self.game_root.clone()));
        }
        let dir = self.kind_dir(kind)?;
        tracing::debug!("{} objects are read from {}", kind, dir);
        Ok(())
    }

    async fn get_by_id(&self, kind: ContentKind, id: &str) -> Result<Option<LibraryObject>> {
        let mut object = self.find_object(kind, id)?;
        if let Some(object) = object.as_mut() {
            object.id = id.to_string();
        }
        Ok(object)
    }

    fn content_directory(&self, kind: ContentKind) -> Result<Utf8PathBuf> {
        self.kind_dir(kind)
    }
}

fn plain_object(location: Utf8PathBuf, ui: UiInfo) -> LibraryObject {
    let id = location.file_name().unwrap_or_default().to_string();
    LibraryObject {
        id,
        name: ui.name,
        version: ui.version,
        location,
        details: ObjectDetails::Plain,
    }
}

/// Case-insensitive lookup of a direct child of `dir`.
fn find_child(dir: &Utf8Path, name: &str) -> Result<Option<Utf8PathBuf>> {
    let exact = dir.join(name);
    if exact.as_std_path().exists() {
        return Ok(Some(exact));
    }
    if !dir.as_std_path().is_dir() {
        return Ok(None);
    }
    for entry in std::fs::read_dir(dir.as_std_path())? {
        let entry = entry?;
        let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if paths::eq_ignore_case(&file_name, name) {
            return Ok(Some(dir.join(file_name)));
        }
    }
    Ok(None)
}

fn read_ui(path: &Utf8Path) -> UiInfo {
    let Ok(text) = std::fs::read_to_string(path.as_std_path()) else {
        return UiInfo::default();
    };
    match parse_ui(&text) {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!("Failed to parse {}: {}", path, e);
            UiInfo::default()
        }
    }
}

pub(crate) fn parse_ui_json(text: &str) -> Result<(Option<String>, Option<String>)> {
    let info = parse_ui(text)?;
    Ok((info.name, info.version))
}

fn parse_ui(text: &str) -> Result<UiInfo> {
    let value: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
    let name = ["name", "skinname"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string);
    let version = match value.get("version") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    Ok(UiInfo { name, version })
}

fn read_models(dir: &Utf8Path, layout_id: &str) -> Vec<String> {
    let ini_name = ini::models_ini_name(layout_id);
    let Ok(Some(path)) = find_child(dir, &ini_name) else {
        return Vec::new();
    };
    let Ok(text) = std::fs::read_to_string(path.as_std_path()) else {
        return Vec::new();
    };
    ini::parse_models_ini(path.as_str(), &text).unwrap_or_else(|e| {
        tracing::warn!("{}", e);
        Vec::new()
    })
}

/// Root-level `.kn5` files, for tracks without a models ini.
fn root_models(dir: &Utf8Path) -> Result<Vec<String>> {
    let mut models = Vec::new();
    for entry in std::fs::read_dir(dir.as_std_path())? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if paths::has_extension(name, "kn5") {
                models.push(name.to_string());
            }
        }
    }
    models.sort();
    Ok(models)
}

fn read_track(dir: &Utf8Path) -> Result<(InstalledTrack, UiInfo)> {
    let ui_dir = dir.join("ui");
    let base_ui = ui_dir.join("ui_track.json");
    let has_base = base_ui.as_std_path().is_file();

    let mut named = Vec::new();
    if ui_dir.as_std_path().is_dir() {
        for entry in std::fs::read_dir(ui_dir.as_std_path())? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(layout_id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let layout_ui = ui_dir.join(&layout_id).join("ui_track.json");
            if layout_ui.as_std_path().is_file() {
                named.push((layout_id, read_ui(&layout_ui)));
            }
        }
    }
    named.sort_by(|a, b| a.0.cmp(&b.0));

    let base_models = || -> Result<Vec<String>> {
        let models = read_models(dir, "");
        if models.is_empty() {
            root_models(dir)
        } else {
            Ok(models)
        }
    };

    if named.is_empty() {
        let ui = read_ui(&base_ui);
        let track = InstalledTrack {
            layout_id: None,
            name: ui.name.clone(),
            model_files: base_models()?,
            multi_layouts: None,
        };
        return Ok((track, ui));
    }

    let mut layouts = Vec::new();
    let mut main_ui = UiInfo::default();
    if has_base {
        main_ui = read_ui(&base_ui);
        layouts.push(InstalledLayout {
            layout_id: None,
            name: main_ui.name.clone(),
            model_files: base_models()?,
        });
    }
    for (idx, (layout_id, ui)) in named.into_iter().enumerate() {
        if !has_base && idx == 0 {
            main_ui = ui.clone();
        }
        layouts.push(InstalledLayout {
            model_files: read_models(dir, &layout_id),
            layout_id: Some(layout_id),
            name: ui.name,
        });
    }

    tracing::debug!(
        "Track {} has {} installed layouts (base: {})",
        dir,
        layouts.len(),
        has_base
    );
    Ok((InstalledTrack::multi(layouts), main_ui))
}
