//! Installation resolution for racing-sim content.
//!
//! Given a payload (an unpacked archive or a folder) this crate works out
//! what it contains and, for every entry, where its files should go:
//!
//! - **Detection**: cars, skins, tracks, showrooms, fonts, weather and
//!   python apps are recognized by their marker files
//! - **Library probing**: entries are matched against already installed
//!   objects to decide between a fresh install and an update
//! - **Track layout merging**: new layouts are bound to installed ones and
//!   models shared with untouched layouts can be kept
//! - **Update options**: per-kind filters such as "Keep UI information"
//! - **Generic mods**: dependants are disabled around the copy and
//!   re-enabled afterwards
//!
//! Copying itself is left to the caller. The result of planning is a list of
//! [`InstallationDetails`], each holding a [`CopyPlan`] that maps payload keys
//! to destinations.
//!
//! # Example
//!
//! ```no_run
//! use cm_install::{
//!     detect_entries, Cancellation, FsContentLibrary, FsPayload, InstallSettings,
//!     InstallationPlanner,
//! };
//!
//! # async fn run() -> cm_install::Result<()> {
//! let payload = FsPayload::open("/downloads/abarth500")?;
//! let library = FsContentLibrary::new("/games/assettocorsa");
//! let settings = InstallSettings::default();
//!
//! let mut entries = detect_entries(&payload, &settings)?;
//! let planner = InstallationPlanner::new(settings);
//! planner.initialize(&mut entries, &library).await;
//!
//! let report = planner.plan(&entries, &library, &Cancellation::new());
//! for details in &report.installs {
//!     for file in details.resolve(&payload).files {
//!         println!("{} -> {}", file.key, file.destination);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod details;
pub mod entry;
pub mod error;
pub mod factory;
pub mod fs_library;
pub mod ini;
pub mod kind;
pub mod library;
pub mod mods;
pub mod option;
pub mod payload;
pub mod plan;
pub mod planner;
pub mod settings;


pub use cancel::Cancellation;
pub use details::{HookedRun, InstallationDetails, ResolvedFiles};
pub use entry::track::{
    ExistingLayoutRef, TrackEntry, TrackLabel, TrackLayoutEntry, TrackModels,
};
pub use entry::{ContentEntry, EntryKind};
pub use error::{Error, Result};
pub use factory::detect_entries;
pub use fs_library::FsContentLibrary;
pub use kind::{skin_object_id, ContentKind};
pub use library::{ContentLibrary, InstalledLayout, InstalledTrack, LibraryObject, ObjectDetails};
pub use mods::{GenericModState, GenericModsEnabler};
pub use option::{FileFilter, InstallHook, UpdateOption};
pub use payload::{FsPayload, MemoryPayload, Payload};
pub use plan::{entry_copy_plan, CopyPlan, PlannedFile};
pub use planner::{InstallationPlanner, PlanReport, SkipReason, SkippedEntry};
pub use settings::InstallSettings;
