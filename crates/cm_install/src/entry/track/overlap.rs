use super::{TrackEntry, TrackModels};
use cm_core::paths;
use std::collections::BTreeMap;

impl TrackEntry {
    /// Recompute which models would be copied over installed layouts that stay
    /// in place. Pure over the current toggles, so calling it repeatedly
    /// without changes yields the same result.
    pub(crate) fn update_shared_models_overlap(&mut self, remove_existing: bool) {
        if self.existing.is_none() || remove_existing {
            self.set_overlap(Vec::new());
            return;
        }

        let replaced: Vec<Option<String>> = match &self.models {
            TrackModels::Layouts(layouts) => layouts
                .iter()
                .filter(|l| l.active)
                .filter_map(|l| l.existing_layout.as_ref().map(|r| r.layout_id.clone()))
                .collect(),
            TrackModels::Flat { .. } => self
                .no_layouts_existing_layout
                .iter()
                .map(|r| r.layout_id.clone())
                .collect(),
        };

        let kept = self.installed_model_index(|layout| {
            !replaced.iter().any(|r| same_layout(r, &layout.layout_id))
        });

        let copied: Vec<&String> = match &self.models {
            TrackModels::Layouts(layouts) => layouts
                .iter()
                .filter(|l| l.active)
                .flat_map(|l| l.kn5_files.iter())
                .collect(),
            TrackModels::Flat { kn5_files, .. } => kn5_files.iter().collect(),
        };

        let mut overlapped: BTreeMap<String, String> = BTreeMap::new();
        for model in copied {
            let key = paths::path_key(model);
            if kept.contains_key(&key) {
                overlapped.entry(key).or_insert_with(|| model.clone());
            }
        }

        self.set_overlap(overlapped.into_values().collect());
    }

    fn set_overlap(&mut self, models: Vec<String>) {
        self.shared_models_overlap = !models.is_empty();
        if self.shared_models_overlap {
            tracing::debug!("Shared models overlap: {}", models.join(", "));
        }
        self.overlapped_models = models;
    }

    /// Keys of the models the copy plan must leave alone.
    pub(crate) fn shared_model_exclusions(&self) -> Vec<String> {
        if self.keep_existing_shared_models && self.shared_models_overlap {
            self.overlapped_models.iter().map(|m| paths::path_key(m)).collect()
        } else {
            Vec::new()
        }
    }
}

fn same_layout(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => paths::eq_ignore_case(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::super::TrackLayoutEntry;
    use super::*;
    use crate::library::{InstalledLayout, InstalledTrack};

    fn layout(id: &str, models: &[&str]) -> TrackLayoutEntry {
        TrackLayoutEntry::new(id, models.iter().map(|s| s.to_string()).collect(), vec![])
    }

    fn spa() -> InstalledTrack {
        InstalledTrack::multi(vec![
            InstalledLayout::new(Some("gp"), &["spa.kn5", "spa_gp.kn5"]),
            InstalledLayout::new(Some("short"), &["spa.kn5", "spa_short.kn5"]),
        ])
    }

    #[test]
    fn test_new_layout_sharing_a_model() {
        let mut track = TrackEntry::with_layouts(vec![layout("endurance", &["Spa.kn5", "spa_end.kn5"])]);
        track.resolve_merge(Some(("spa", &spa())));
        track.update_shared_models_overlap(false);
        assert!(track.shared_models_overlap());
        assert_eq!(track.overlapped_models(), &["Spa.kn5".to_string()]);
        assert_eq!(track.shared_model_exclusions(), vec!["spa.kn5".to_string()]);
    }

    #[test]
    fn test_replaced_layouts_do_not_count() {
        let mut track = TrackEntry::with_layouts(vec![
            layout("gp", &["spa_gp.kn5"]),
            layout("endurance", &["spa_end.kn5"]),
        ]);
        track.resolve_merge(Some(("spa", &spa())));
        track.update_shared_models_overlap(false);
        assert!(!track.shared_models_overlap());
    }

    #[test]
    fn test_inactive_layouts_neither_copy_nor_replace() {
        let mut track = TrackEntry::with_layouts(vec![
            layout("gp", &["spa_gp.kn5"]),
            layout("endurance", &["spa.kn5"]),
        ]);
        track.resolve_merge(Some(("spa", &spa())));

        track.set_layout_active("endurance", false);
        track.update_shared_models_overlap(false);
        assert!(!track.shared_models_overlap());

        track.set_layout_active("endurance", true);
        track.set_layout_active("gp", false);
        track.update_shared_models_overlap(false);
        assert_eq!(track.display_overlapped_models(), "spa.kn5");
    }

    #[test]
    fn test_clean_install_clears_overlap() {
        let mut track = TrackEntry::with_layouts(vec![layout("endurance", &["spa.kn5"])]);
        track.resolve_merge(Some(("spa", &spa())));
        track.update_shared_models_overlap(false);
        assert!(track.shared_models_overlap());
        track.update_shared_models_overlap(true);
        assert!(!track.shared_models_overlap());
        assert!(track.overlapped_models().is_empty());
    }

    #[test]
    fn test_exclusions_follow_keep_toggle() {
        let mut track = TrackEntry::with_layouts(vec![layout("endurance", &["spa.kn5"])]);
        track.resolve_merge(Some(("spa", &spa())));
        track.update_shared_models_overlap(false);
        track.set_keep_existing_shared_models(false);
        assert!(track.shared_model_exclusions().is_empty());
    }
}
