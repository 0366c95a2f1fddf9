//! Batch orchestration.
//!
//! The [`InstallationPlanner`] initializes a batch of entries against the
//! library (probes run concurrently) and resolves each of them into
//! [`InstallationDetails`]. A failing entry is reported as skipped and never
//! stops its siblings from being planned.

use crate::cancel::Cancellation;
use crate::details::InstallationDetails;
use crate::entry::ContentEntry;
use crate::kind::ContentKind;
use crate::library::ContentLibrary;
use crate::settings::InstallSettings;
use futures::future::join_all;
use serde::Serialize;

/// Why an entry produced nothing to install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "message", rename_all = "kebab-case")]
pub enum SkipReason {
    Cancelled,
    NothingToInstall,
    DestinationUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedEntry {
    pub id: String,
    pub kind: ContentKind,
    pub reason: SkipReason,
}

/// Result of planning a batch.
#[derive(Debug, Default)]
pub struct PlanReport {
    /// In install order: parents before children, generic mods last.
    pub installs: Vec<InstallationDetails>,
    pub skipped: Vec<SkippedEntry>,
}

impl PlanReport {
    pub fn is_empty(&self) -> bool {
        self.installs.is_empty()
    }
}

pub struct InstallationPlanner {
    settings: InstallSettings,
}

impl InstallationPlanner {
    pub fn new(settings: InstallSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &InstallSettings {
        &self.settings
    }

    /// Apply settings and probe every entry. Probes run concurrently.
    pub async fn initialize(&self, entries: &mut [ContentEntry], library: &dyn ContentLibrary) {
        for entry in entries.iter_mut() {
            entry.apply_settings(&self.settings);
        }
        join_all(entries.iter_mut().map(|entry| entry.initialize(library))).await;
        tracing::debug!("Initialized {} entries", entries.len());
    }

    /// Resolve every entry into installation details.
    pub fn plan(
        &self,
        entries: &[ContentEntry],
        library: &dyn ContentLibrary,
        cancel: &Cancellation,
    ) -> PlanReport {
        let mut ordered: Vec<&ContentEntry> = entries.iter().collect();
        ordered.sort_by_key(|entry| entry.content_kind().install_priority());

        let mut report = PlanReport::default();
        for entry in ordered {
            let skip = |reason: SkipReason| SkippedEntry {
                id: entry.object_id(),
                kind: entry.content_kind(),
                reason,
            };

            if cancel.is_cancelled() {
                report.skipped.push(skip(SkipReason::Cancelled));
                continue;
            }

            match entry.installation_details(library, cancel) {
                Ok(Some(details)) if details.copy_plan.skips_everything() => {
                    tracing::info!("Nothing to install for {} '{}'", entry.content_kind(), entry.id());
                    report.skipped.push(skip(SkipReason::NothingToInstall));
                }
                Ok(Some(details)) => report.installs.push(details),
                Ok(None) => report.skipped.push(skip(SkipReason::Cancelled)),
                Err(e) => {
                    tracing::warn!("Skipping {} '{}': {}", entry.content_kind(), entry.id(), e);
                    report
                        .skipped
                        .push(skip(SkipReason::DestinationUnavailable(e.to_string())));
                }
            }
        }

        tracing::info!(
            "Planned {} installs, skipped {}",
            report.installs.len(),
            report.skipped.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::track::{TrackEntry, TrackLayoutEntry};
    use crate::entry::EntryKind;
    use crate::tests::MemoryLibrary;

    fn batch() -> Vec<ContentEntry> {
        vec![
            ContentEntry::new(EntryKind::CarSkin { car_id: "abarth500".into() }, "red", "abarth500/skins/red"),
            ContentEntry::theme("dark", "themes"),
            ContentEntry::new(EntryKind::Weather, "rain", "rain"),
            ContentEntry::new(EntryKind::Car, "abarth500", "abarth500"),
        ]
    }

    #[tokio::test]
    async fn test_plan_orders_by_priority_and_isolates_failures() {
        let library = MemoryLibrary::new("/ac");
        let planner = InstallationPlanner::new(InstallSettings::default());
        let mut entries = batch();
        planner.initialize(&mut entries, &library).await;

        let report = planner.plan(&entries, &library, &Cancellation::new());
        let ids: Vec<_> = report.installs.iter().map(|d| d.entry_id.as_str()).collect();
        assert_eq!(ids, vec!["abarth500", "rain", "abarth500/red"]);

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].id, "dark");
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::DestinationUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_cancelled_batch_skips_everything() {
        let library = MemoryLibrary::new("/ac");
        let planner = InstallationPlanner::new(InstallSettings::default());
        let mut entries = batch();
        planner.initialize(&mut entries, &library).await;

        let cancel = Cancellation::new();
        cancel.cancel();
        let report = planner.plan(&entries, &library, &cancel);
        assert!(report.is_empty());
        assert!(report
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::Cancelled));
    }

    #[tokio::test]
    async fn test_track_without_active_layouts_is_skipped() {
        let library = MemoryLibrary::new("/ac");
        let planner = InstallationPlanner::new(InstallSettings::default());
        let track = TrackEntry::with_layouts(vec![TrackLayoutEntry::new(
            "gp",
            vec!["spa.kn5".into()],
            vec![],
        )]);
        let mut entries = vec![ContentEntry::track("spa", "spa", track)];
        planner.initialize(&mut entries, &library).await;
        entries[0].set_layout_active("gp", false);

        let report = planner.plan(&entries, &library, &Cancellation::new());
        assert!(report.is_empty());
        assert_eq!(report.skipped[0].reason, SkipReason::NothingToInstall);
    }

    #[tokio::test]
    async fn test_settings_reach_entries() {
        let library = MemoryLibrary::new("/ac");
        let planner = InstallationPlanner::new(InstallSettings {
            prefer_clean_install: true,
            ..InstallSettings::default()
        });
        let mut entries = vec![ContentEntry::new(EntryKind::Car, "abarth500", "")];
        planner.initialize(&mut entries, &library).await;
        assert!(entries[0].selected_option().remove_existing());
    }
}
