//! Installed content lookup.
//!
//! The planner never scans the game directory itself. It asks a
//! [`ContentLibrary`] whether an object with a given id already exists and
//! where new objects of a kind should go. The crate ships
//! [`FsContentLibrary`](crate::FsContentLibrary) for a plain game directory;
//! a desktop shell would implement the trait over its own object managers.

use crate::error::Result;
use crate::kind::ContentKind;
use async_trait::async_trait;
use camino::Utf8PathBuf;
use cm_core::paths;
use std::collections::BTreeMap;

#[async_trait]
pub trait ContentLibrary: Send + Sync {
    /// Make sure objects of `kind` are loaded before lookups.
    async fn ensure_loaded(&self, kind: ContentKind) -> Result<()>;

    /// Find an installed object. Ids compare case-insensitively.
    ///
    /// Skins use `<parent>/<skin>` ids, see [`skin_object_id`](crate::skin_object_id).
    async fn get_by_id(&self, kind: ContentKind, id: &str) -> Result<Option<LibraryObject>>;

    /// Directory where new objects of `kind` are allocated.
    fn content_directory(&self, kind: ContentKind) -> Result<Utf8PathBuf>;
}

/// An already installed object, as far as installation cares.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryObject {
    pub id: String,
    pub name: Option<String>,
    pub version: Option<String>,
    /// Directory (or file, for single-file kinds) the object lives at.
    pub location: Utf8PathBuf,
    pub details: ObjectDetails,
}

impl LibraryObject {
    pub fn new(id: impl Into<String>, location: impl Into<Utf8PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: None,
            version: None,
            location: location.into(),
            details: ObjectDetails::Plain,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_track(mut self, track: InstalledTrack) -> Self {
        self.details = ObjectDetails::Track(track);
        self
    }

    pub fn track(&self) -> Option<&InstalledTrack> {
        match &self.details {
            ObjectDetails::Track(track) => Some(track),
            ObjectDetails::Plain => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectDetails {
    Plain,
    Track(InstalledTrack),
}

/// Layout structure of an installed track.
///
/// `layout_id` is the layout of the main object: `None` means the main object
/// is the base track (no layout id at all), which is different from a layout
/// whose id happens to be empty. `multi_layouts` is `None` for single-layout
/// tracks and otherwise lists every layout, the main one included.
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledTrack {
    pub layout_id: Option<String>,
    pub name: Option<String>,
    pub model_files: Vec<String>,
    pub multi_layouts: Option<Vec<InstalledLayout>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstalledLayout {
    pub layout_id: Option<String>,
    pub name: Option<String>,
    pub model_files: Vec<String>,
}

impl InstalledLayout {
    pub fn new(layout_id: Option<&str>, model_files: &[&str]) -> Self {
        Self {
            layout_id: layout_id.map(str::to_string),
            name: None,
            model_files: model_files.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl InstalledTrack {
    /// A track without layouts.
    pub fn single(model_files: &[&str]) -> Self {
        Self {
            layout_id: None,
            name: None,
            model_files: model_files.iter().map(|s| s.to_string()).collect(),
            multi_layouts: None,
        }
    }

    /// A multi-layout track. The base layout (if any) becomes the main
    /// object, otherwise the first layout does.
    pub fn multi(layouts: Vec<InstalledLayout>) -> Self {
        let main = layouts
            .iter()
            .find(|l| l.layout_id.is_none())
            .or_else(|| layouts.first());
        let (layout_id, name, model_files) = match main {
            Some(main) => (
                main.layout_id.clone(),
                main.name.clone(),
                main.model_files.clone(),
            ),
            None => (None, None, Vec::new()),
        };
        Self {
            layout_id,
            name,
            model_files,
            multi_layouts: Some(layouts),
        }
    }

    pub fn is_multi_layout(&self) -> bool {
        self.multi_layouts.is_some()
    }

    /// The main object is the base track rather than a named layout.
    pub fn has_base_layout(&self) -> bool {
        self.layout_id.is_none()
    }

    /// Every installed layout, the main one included.
    pub fn layouts(&self) -> Vec<InstalledLayout> {
        match &self.multi_layouts {
            Some(layouts) => layouts.clone(),
            None => vec![InstalledLayout {
                layout_id: self.layout_id.clone(),
                name: self.name.clone(),
                model_files: self.model_files.clone(),
            }],
        }
    }

    /// Installed counterpart of a new layout id; the empty id maps to the base layout.
    pub fn find_layout(&self, new_layout_id: &str) -> Option<InstalledLayout> {
        self.layouts().into_iter().find(|l| match &l.layout_id {
            None => new_layout_id.is_empty(),
            Some(id) => !new_layout_id.is_empty() && paths::eq_ignore_case(id, new_layout_id),
        })
    }

    /// Models referenced by any installed layout, keyed case-insensitively.
    pub fn all_model_files(&self) -> BTreeMap<String, String> {
        model_index(self.layouts().iter())
    }
}

/// Model path key -> original spelling, for a set of layouts.
pub(crate) fn model_index<'a, I>(layouts: I) -> BTreeMap<String, String>
where
    I: Iterator<Item = &'a InstalledLayout>,
{
    let mut result = BTreeMap::new();
    for layout in layouts {
        for model in &layout.model_files {
            result
                .entry(paths::path_key(model))
                .or_insert_with(|| model.clone());
        }
    }
    result
}
