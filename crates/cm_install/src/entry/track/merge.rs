use super::{ExistingLayoutRef, TrackEntry, TrackLabel, TrackModels};
use crate::library::{model_index, InstalledLayout, InstalledTrack};
use cm_core::paths;

fn layout_ref(track_id: &str, layout: &InstalledLayout) -> ExistingLayoutRef {
    ExistingLayoutRef {
        track_id: track_id.to_string(),
        layout_id: layout.layout_id.clone(),
        name: layout.name.clone(),
    }
}

fn main_ref(track_id: &str, track: &InstalledTrack) -> ExistingLayoutRef {
    ExistingLayoutRef {
        track_id: track_id.to_string(),
        layout_id: track.layout_id.clone(),
        name: track.name.clone(),
    }
}

impl TrackEntry {
    /// Bind the payload to an installed track and decide whether the install
    /// is purely additive. Also recomputes missing models.
    pub(crate) fn resolve_merge(&mut self, existing: Option<(&str, &InstalledTrack)>) {
        self.existing = existing.map(|(id, track)| (id.to_string(), track.clone()));
        self.no_layouts_existing_layout = None;
        self.has_new_extra_layouts = false;
        if let TrackModels::Layouts(layouts) = &mut self.models {
            for layout in layouts.iter_mut() {
                layout.existing_layout = None;
            }
        }

        match existing {
            None => self.resolve_new(),
            Some((track_id, track)) => match (self.is_multi_layout(), track.is_multi_layout()) {
                (false, false) => self.resolve_single_over_single(track_id, track),
                (false, true) => self.resolve_single_over_multi(track_id, track),
                (true, false) => self.resolve_multi_over_single(track_id, track),
                (true, true) => self.resolve_multi_over_multi(track_id, track),
            },
        }

        self.update_missing_models();

        tracing::debug!(
            "Track merge resolved: {} (no conflicts: {}, extra layouts: {})",
            self.label,
            self.no_conflict_mode,
            self.has_new_extra_layouts
        );
    }

    fn resolve_new(&mut self) {
        self.no_conflict_mode = true;
        self.label = match &self.models {
            TrackModels::Flat { .. } => TrackLabel::NewTrack,
            TrackModels::Layouts(layouts) => TrackLabel::NewLayouts(layouts.len()),
        };
    }

    fn resolve_single_over_single(&mut self, track_id: &str, track: &InstalledTrack) {
        self.no_layouts_existing_layout = Some(main_ref(track_id, track));
        self.no_conflict_mode = false;
        self.label = TrackLabel::Update;
    }

    fn resolve_single_over_multi(&mut self, track_id: &str, track: &InstalledTrack) {
        if track.has_base_layout() {
            self.no_layouts_existing_layout = Some(main_ref(track_id, track));
            self.no_conflict_mode = false;
            self.label = TrackLabel::Update;
        } else {
            self.no_conflict_mode = true;
            self.label = TrackLabel::NewLayout;
        }
    }

    fn resolve_multi_over_single(&mut self, track_id: &str, track: &InstalledTrack) {
        let TrackModels::Layouts(layouts) = &mut self.models else {
            return;
        };
        let total = layouts.len();
        match layouts.iter_mut().find(|l| l.is_base()) {
            None => {
                self.no_conflict_mode = true;
                self.label = TrackLabel::NewLayouts(total);
            }
            Some(base) => {
                base.existing_layout = Some(main_ref(track_id, track));
                self.has_new_extra_layouts = true;
                self.no_conflict_mode = false;
                self.label = TrackLabel::UpdateWithNewLayouts(total - 1);
            }
        }
    }

    fn resolve_multi_over_multi(&mut self, track_id: &str, track: &InstalledTrack) {
        let TrackModels::Layouts(layouts) = &mut self.models else {
            return;
        };
        let total = layouts.len();
        let counterparts: Vec<Option<InstalledLayout>> =
            layouts.iter().map(|l| track.find_layout(&l.id)).collect();
        let new_layouts = counterparts.iter().filter(|c| c.is_none()).count();

        let existing_basic = track.has_base_layout();
        let new_basic = layouts.iter().any(|l| l.is_base());

        if !(existing_basic && new_basic) && new_layouts == total {
            self.no_conflict_mode = true;
            self.label = TrackLabel::NewLayouts(total);
            return;
        }

        for (layout, counterpart) in layouts.iter_mut().zip(counterparts) {
            layout.existing_layout = counterpart.map(|c| layout_ref(track_id, &c));
        }
        self.has_new_extra_layouts = new_layouts > 0;
        self.no_conflict_mode = false;
        self.label = if new_layouts > 0 {
            TrackLabel::UpdateWithNewLayouts(new_layouts)
        } else {
            TrackLabel::Update
        };
    }

    /// Required models that no installed layout of the same track provides.
    fn update_missing_models(&mut self) {
        let installed = match &self.existing {
            Some((_, track)) => track.all_model_files(),
            None => Default::default(),
        };
        let missing = |required: &[String]| -> Vec<String> {
            required
                .iter()
                .filter(|m| !installed.contains_key(&paths::path_key(m)))
                .cloned()
                .collect()
        };

        match &mut self.models {
            TrackModels::Flat {
                required_kn5_files,
                missing_kn5_files,
                ..
            } => *missing_kn5_files = missing(required_kn5_files),
            TrackModels::Layouts(layouts) => {
                for layout in layouts.iter_mut() {
                    layout.missing_kn5_files = missing(&layout.required_kn5_files);
                }
            }
        }
    }

    pub(crate) fn installed_model_index(
        &self,
        keep: impl Fn(&InstalledLayout) -> bool,
    ) -> std::collections::BTreeMap<String, String> {
        match &self.existing {
            Some((_, track)) => model_index(track.layouts().iter().filter(|l| keep(l))),
            None => Default::default(),
        }
    }
}
