//! Track entries and the layout merge resolver.
//!
//! A track payload either carries a flat list of models (a classic track
//! without layouts) or a list of layouts, each with its own `models_<id>.ini`
//! and `ui/<id>/` directory. The empty layout id stands for the base track
//! shipped alongside named layouts.
//!
//! Installing over an existing track is resolved in three steps:
//!
//! 1. [`merge`] binds new layouts to installed ones and decides whether the
//!    install is purely additive (`no_conflict_mode`).
//! 2. [`overlap`] finds models shared between what is about to be copied and
//!    installed layouts that stay in place. It reruns on every toggle.
//! 3. [`plan`] builds the copy plan from active layouts, the selected update
//!    option and the shared-model exclusion.

mod merge;
mod overlap;
mod plan;

use cm_core::paths;
use serde::Serialize;
use std::fmt;

/// Reference to an installed layout a new layout will replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingLayoutRef {
    pub track_id: String,
    /// `None` is the base track.
    pub layout_id: Option<String>,
    pub name: Option<String>,
}

/// One layout of a multi-layout track payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackLayoutEntry {
    id: String,
    name: Option<String>,
    version: Option<String>,
    kn5_files: Vec<String>,
    required_kn5_files: Vec<String>,
    missing_kn5_files: Vec<String>,
    active: bool,
    existing_layout: Option<ExistingLayoutRef>,
}

impl TrackLayoutEntry {
    /// `kn5_files` are models present in the payload, `required_kn5_files`
    /// are models the layout references but the payload lacks.
    pub fn new(id: impl Into<String>, kn5_files: Vec<String>, required_kn5_files: Vec<String>) -> Self {
        let missing_kn5_files = required_kn5_files.clone();
        Self {
            id: id.into(),
            name: None,
            version: None,
            kn5_files,
            required_kn5_files,
            missing_kn5_files,
            active: true,
            existing_layout: None,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_base(&self) -> bool {
        self.id.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn kn5_files(&self) -> &[String] {
        &self.kn5_files
    }

    pub fn required_kn5_files(&self) -> &[String] {
        &self.required_kn5_files
    }

    pub fn missing_kn5_files(&self) -> &[String] {
        &self.missing_kn5_files
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn existing_layout(&self) -> Option<&ExistingLayoutRef> {
        self.existing_layout.as_ref()
    }
}

/// Models of the payload: flat, or split by layout. Never both.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackModels {
    Flat {
        kn5_files: Vec<String>,
        required_kn5_files: Vec<String>,
        missing_kn5_files: Vec<String>,
    },
    Layouts(Vec<TrackLayoutEntry>),
}

/// Short description of what installing the track will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "count", rename_all = "kebab-case")]
pub enum TrackLabel {
    NewTrack,
    NewLayout,
    NewLayouts(usize),
    Update,
    UpdateWithNewLayouts(usize),
}

impl fmt::Display for TrackLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackLabel::NewTrack => f.write_str("New track"),
            TrackLabel::NewLayout | TrackLabel::NewLayouts(1) => f.write_str("New layout"),
            TrackLabel::NewLayouts(n) => write!(f, "{n} new layouts"),
            TrackLabel::Update => f.write_str("Update"),
            TrackLabel::UpdateWithNewLayouts(1) => f.write_str("Update, 1 new layout"),
            TrackLabel::UpdateWithNewLayouts(n) => write!(f, "Update, {n} new layouts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackEntry {
    models: TrackModels,
    existing: Option<(String, crate::library::InstalledTrack)>,
    no_layouts_existing_layout: Option<ExistingLayoutRef>,
    no_conflict_mode: bool,
    has_new_extra_layouts: bool,
    label: TrackLabel,
    shared_models_overlap: bool,
    overlapped_models: Vec<String>,
    keep_existing_shared_models: bool,
}

impl TrackEntry {
    fn with_models(models: TrackModels) -> Self {
        let label = match &models {
            TrackModels::Flat { .. } => TrackLabel::NewTrack,
            TrackModels::Layouts(layouts) => TrackLabel::NewLayouts(layouts.len()),
        };
        Self {
            models,
            existing: None,
            no_layouts_existing_layout: None,
            no_conflict_mode: true,
            has_new_extra_layouts: false,
            label,
            shared_models_overlap: false,
            overlapped_models: Vec::new(),
            keep_existing_shared_models: true,
        }
    }

    /// A track without layouts.
    pub fn flat(kn5_files: Vec<String>, required_kn5_files: Vec<String>) -> Self {
        let missing_kn5_files = required_kn5_files.clone();
        Self::with_models(TrackModels::Flat {
            kn5_files,
            required_kn5_files,
            missing_kn5_files,
        })
    }

    pub fn with_layouts(layouts: Vec<TrackLayoutEntry>) -> Self {
        Self::with_models(TrackModels::Layouts(layouts))
    }

    pub fn models(&self) -> &TrackModels {
        &self.models
    }

    pub fn layouts(&self) -> Option<&[TrackLayoutEntry]> {
        match &self.models {
            TrackModels::Layouts(layouts) => Some(layouts),
            TrackModels::Flat { .. } => None,
        }
    }

    pub fn is_multi_layout(&self) -> bool {
        matches!(self.models, TrackModels::Layouts(_))
    }

    /// Flat models present in the payload; empty for multi-layout payloads.
    pub fn kn5_files(&self) -> &[String] {
        match &self.models {
            TrackModels::Flat { kn5_files, .. } => kn5_files,
            TrackModels::Layouts(_) => &[],
        }
    }

    /// Flat models missing from both the payload and the installed track.
    pub fn missing_kn5_files(&self) -> &[String] {
        match &self.models {
            TrackModels::Flat {
                missing_kn5_files, ..
            } => missing_kn5_files,
            TrackModels::Layouts(_) => &[],
        }
    }

    pub fn layout(&self, id: &str) -> Option<&TrackLayoutEntry> {
        self.layouts()?
            .iter()
            .find(|l| paths::eq_ignore_case(&l.id, id))
    }

    pub fn no_layouts_existing_layout(&self) -> Option<&ExistingLayoutRef> {
        self.no_layouts_existing_layout.as_ref()
    }

    pub fn no_conflict_mode(&self) -> bool {
        self.no_conflict_mode
    }

    pub fn has_new_extra_layouts(&self) -> bool {
        self.has_new_extra_layouts
    }

    pub fn label(&self) -> TrackLabel {
        self.label
    }

    pub fn shared_models_overlap(&self) -> bool {
        self.shared_models_overlap
    }

    pub fn overlapped_models(&self) -> &[String] {
        &self.overlapped_models
    }

    /// Overlapping model names for display, comma separated.
    pub fn display_overlapped_models(&self) -> String {
        self.overlapped_models.join(", ")
    }

    pub fn keep_existing_shared_models(&self) -> bool {
        self.keep_existing_shared_models
    }

    pub(crate) fn set_keep_existing_shared_models(&mut self, keep: bool) {
        self.keep_existing_shared_models = keep;
    }

    /// Returns `false` when no layout has this id.
    pub(crate) fn set_layout_active(&mut self, id: &str, active: bool) -> bool {
        let TrackModels::Layouts(layouts) = &mut self.models else {
            return false;
        };
        match layouts.iter_mut().find(|l| paths::eq_ignore_case(&l.id, id)) {
            Some(layout) => {
                layout.active = active;
                true
            }
            None => false,
        }
    }

    /// Whether at least one layout (or the flat track) will be copied.
    pub fn has_anything_to_copy(&self) -> bool {
        match &self.models {
            TrackModels::Flat { .. } => true,
            TrackModels::Layouts(layouts) => layouts.iter().any(|l| l.active),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(TrackLabel::NewLayouts(1).to_string(), "New layout");
        assert_eq!(TrackLabel::NewLayouts(3).to_string(), "3 new layouts");
        assert_eq!(
            TrackLabel::UpdateWithNewLayouts(2).to_string(),
            "Update, 2 new layouts"
        );
    }

    #[test]
    fn test_new_entry_defaults() {
        let track = TrackEntry::with_layouts(vec![
            TrackLayoutEntry::new("gp", vec!["spa.kn5".into()], vec![]),
            TrackLayoutEntry::new("short", vec![], vec!["spa.kn5".into()]),
        ]);
        assert!(track.is_multi_layout());
        assert!(track.no_conflict_mode());
        assert_eq!(track.label(), TrackLabel::NewLayouts(2));
        assert_eq!(track.layout("SHORT").map(|l| l.missing_kn5_files().len()), Some(1));
        assert!(track.kn5_files().is_empty());
    }

    #[test]
    fn test_toggle_layouts() {
        let mut track = TrackEntry::with_layouts(vec![TrackLayoutEntry::new(
            "gp",
            vec!["spa.kn5".into()],
            vec![],
        )]);
        assert!(track.has_anything_to_copy());
        assert!(track.set_layout_active("gp", false));
        assert!(!track.set_layout_active("missing", false));
        assert!(!track.has_anything_to_copy());
    }
}
