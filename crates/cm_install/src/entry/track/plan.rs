use super::{TrackEntry, TrackModels};
use crate::ini;
use crate::option::FileFilter;
use crate::plan::{entry_relative, CopyPlan};
use camino::{Utf8Path, Utf8PathBuf};
use cm_core::paths;
use std::collections::HashSet;

/// Which payload files of a multi-layout track get copied.
struct LayoutRules {
    inis: HashSet<String>,
    models: HashSet<String>,
    disabled_ids: HashSet<String>,
    base_inactive: bool,
}

impl LayoutRules {
    fn includes(&self, relative: &str) -> bool {
        let Some((first, rest)) = relative.split_once('/') else {
            if ini::is_models_ini(relative) {
                return self.inis.contains(&paths::fold_case(relative));
            }
            if paths::has_extension(relative, "kn5") {
                return self.models.contains(&paths::fold_case(relative));
            }
            return true;
        };

        if paths::eq_ignore_case(first, "ui") {
            return match rest.split_once('/') {
                None => !self.base_inactive,
                Some((layout_dir, _)) => !self.disabled_ids.contains(&paths::fold_case(layout_dir)),
            };
        }

        !self.disabled_ids.contains(&paths::fold_case(first))
    }
}

impl TrackEntry {
    pub(crate) fn copy_plan(
        &self,
        entry_path: &str,
        destination: &Utf8Path,
        filter: Option<FileFilter>,
    ) -> CopyPlan {
        if !self.has_anything_to_copy() {
            tracing::debug!("Every layout is disabled, nothing to copy");
            return CopyPlan::skip_all();
        }
        let rules = match &self.models {
            TrackModels::Flat { .. } => None,
            TrackModels::Layouts(layouts) => {
                let active: Vec<_> = layouts.iter().filter(|l| l.active).collect();
                Some(LayoutRules {
                    inis: active
                        .iter()
                        .map(|l| paths::fold_case(&ini::models_ini_name(&l.id)))
                        .collect(),
                    models: active
                        .iter()
                        .flat_map(|l| l.kn5_files.iter())
                        .map(|m| paths::path_key(m))
                        .collect(),
                    disabled_ids: layouts
                        .iter()
                        .filter(|l| !l.active && !l.is_base())
                        .map(|l| paths::fold_case(&l.id))
                        .collect(),
                    base_inactive: layouts.iter().any(|l| l.is_base() && !l.active),
                })
            }
        };

        let shared: HashSet<String> = self.shared_model_exclusions().into_iter().collect();
        let entry_path = paths::normalize(entry_path);
        let destination: Utf8PathBuf = destination.to_path_buf();

        CopyPlan::new(move |key| {
            let relative = entry_relative(key, &entry_path)?;
            if let Some(rules) = &rules {
                if !rules.includes(&relative) {
                    return None;
                }
            }
            if let Some(filter) = &filter {
                if !filter(&relative) {
                    return None;
                }
            }
            if shared.contains(&paths::path_key(&relative)) {
                return None;
            }
            Some(paths::join_relative(&destination, &relative))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::TrackLayoutEntry;
    use super::*;
    use crate::library::{InstalledLayout, InstalledTrack};
    use std::sync::Arc;

    fn dest() -> Utf8PathBuf {
        Utf8PathBuf::from("/ac/content/tracks/spa")
    }

    fn layout(id: &str, models: &[&str]) -> TrackLayoutEntry {
        TrackLayoutEntry::new(id, models.iter().map(|s| s.to_string()).collect(), vec![])
    }

    fn spa_payload() -> TrackEntry {
        TrackEntry::with_layouts(vec![
            layout("", &["spa.kn5"]),
            layout("gp", &["spa.kn5", "spa_gp.kn5"]),
            layout("short", &["spa.kn5", "spa_short.kn5"]),
        ])
    }

    #[test]
    fn test_disabled_layout_files_are_skipped() {
        let mut track = spa_payload();
        track.set_layout_active("short", false);
        let plan = track.copy_plan("spa", &dest(), None);

        assert!(plan.destination("spa/models_gp.ini").is_some());
        assert!(plan.destination("spa/models_short.ini").is_none());
        assert!(plan.destination("spa/spa_gp.kn5").is_some());
        assert!(plan.destination("spa/spa_short.kn5").is_none());
        assert!(plan.destination("spa/ui/short/ui_track.json").is_none());
        assert!(plan.destination("spa/short/data/surfaces.ini").is_none());
        assert!(plan.destination("spa/ui/gp/ui_track.json").is_some());
        assert!(plan.destination("spa/ui/ui_track.json").is_some());
        assert!(plan.destination("spa/data/surfaces.ini").is_some());
    }

    #[test]
    fn test_inactive_base_drops_root_ui() {
        let mut track = spa_payload();
        track.set_layout_active("", false);
        let plan = track.copy_plan("spa", &dest(), None);

        assert!(plan.destination("spa/models.ini").is_none());
        assert!(plan.destination("spa/ui/ui_track.json").is_none());
        assert!(plan.destination("spa/ui/gp/preview.png").is_some());
        assert!(plan.destination("spa/spa.kn5").is_some());
    }

    #[test]
    fn test_unreferenced_root_model_is_skipped() {
        let plan = spa_payload().copy_plan("", &dest(), None);
        assert!(plan.destination("spa_old.kn5").is_none());
        assert_eq!(plan.destination("SPA.kn5"), Some(dest().join("SPA.kn5")));
    }

    #[test]
    fn test_option_filter_applies_after_layout_rules() {
        let filter: FileFilter = Arc::new(|p: &str| !p.ends_with("ui_track.json"));
        let plan = spa_payload().copy_plan("spa", &dest(), Some(filter));
        assert!(plan.destination("spa/ui/gp/ui_track.json").is_none());
        assert!(plan.destination("spa/ui/gp/outline.png").is_some());
    }

    #[test]
    fn test_flat_track_shared_model_exclusion() {
        let existing = InstalledTrack::multi(vec![InstalledLayout::new(Some("gp"), &["track.kn5"])]);
        let mut track = TrackEntry::flat(vec!["track.kn5".into(), "extra.kn5".into()], vec![]);
        track.resolve_merge(Some(("spa", &existing)));
        track.update_shared_models_overlap(false);

        let plan = track.copy_plan("", &dest(), None);
        assert!(plan.destination("track.kn5").is_none());
        assert!(plan.destination("extra.kn5").is_some());

        track.set_keep_existing_shared_models(false);
        let plan = track.copy_plan("", &dest(), None);
        assert!(plan.destination("track.kn5").is_some());
    }

    #[test]
    fn test_shared_model_matches_any_separator() {
        let existing = InstalledTrack::multi(vec![InstalledLayout::new(
            Some("gp"),
            &["models/trees.kn5", "spa.kn5"],
        )]);
        let mut track = TrackEntry::with_layouts(vec![layout("endurance", &["models\\Trees.kn5", "spa_end.kn5"])]);
        track.resolve_merge(Some(("spa", &existing)));
        track.update_shared_models_overlap(false);
        assert_eq!(track.overlapped_models(), &["models\\Trees.kn5".to_string()]);

        let plan = track.copy_plan("spa", &dest(), None);
        assert!(plan.destination("spa/models/trees.kn5").is_none());
        assert!(plan.destination("spa/spa_end.kn5").is_some());
    }
}
