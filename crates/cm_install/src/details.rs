//! What the copy executor receives for one entry.

use crate::cancel::Cancellation;
use crate::error::{Error, Result};
use crate::kind::ContentKind;
use crate::option::InstallHook;
use crate::payload::Payload;
use crate::plan::{CopyPlan, PlannedFile};
use camino::Utf8PathBuf;
use serde::Serialize;
use std::fmt;
use std::future::Future;

/// A resolved installation: where the entry goes, which files to copy and
/// the hooks to run around the copy.
#[derive(Clone)]
pub struct InstallationDetails {
    pub entry_id: String,
    pub kind: ContentKind,
    pub display_name: String,
    pub destination: Utf8PathBuf,
    pub copy_plan: CopyPlan,
    /// Delete `destination` before copying.
    pub remove_existing: bool,
    /// Paths to delete before copying; only set when updating.
    pub clean_up_paths: Vec<Utf8PathBuf>,
    pub before_task: Option<InstallHook>,
    pub after_task: Option<InstallHook>,
}

/// A copy plan expanded over a concrete payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFiles {
    pub files: Vec<PlannedFile>,
    /// Directories to create even when they hold no planned file.
    pub directories: Vec<PlannedFile>,
}

/// Outcome of [`InstallationDetails::run`].
#[derive(Debug)]
pub struct HookedRun<T> {
    pub result: Result<T>,
    /// Failures of the after hook. They do not change `result`.
    pub notifications: Vec<Error>,
}

impl InstallationDetails {
    pub fn resolve(&self, payload: &dyn Payload) -> ResolvedFiles {
        let files = self
            .copy_plan
            .resolve(payload.files().iter().map(String::as_str));
        let directories = if self.copy_plan.moves_empty_directories() {
            let dirs = payload.directories();
            self.copy_plan
                .resolve_directories(dirs.iter().map(String::as_str))
        } else {
            Vec::new()
        };
        ResolvedFiles { files, directories }
    }

    /// Run `copy` between the before and after hooks.
    ///
    /// The copy is skipped when the before hook fails or cancellation was
    /// requested while it ran. Once the before hook has started, the after hook
    /// runs no matter what happened since.
    pub async fn run<T, F, Fut>(&self, cancel: &Cancellation, copy: F) -> HookedRun<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let before = match &self.before_task {
            Some(task) => task(cancel.clone()).await,
            None => Ok(()),
        };

        let result = match before {
            Err(e) => {
                tracing::warn!("Before-install task of '{}' failed: {}", self.entry_id, e);
                Err(e)
            }
            Ok(()) if cancel.is_cancelled() => Err(Error::Cancelled),
            Ok(()) => copy().await,
        };

        let mut notifications = Vec::new();
        if let Some(task) = &self.after_task {
            if let Err(e) = task(cancel.clone()).await {
                tracing::error!("After-install task of '{}' failed: {}", self.entry_id, e);
                notifications.push(e);
            }
        }

        HookedRun {
            result,
            notifications,
        }
    }
}

impl fmt::Debug for InstallationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallationDetails")
            .field("entry_id", &self.entry_id)
            .field("kind", &self.kind)
            .field("destination", &self.destination)
            .field("remove_existing", &self.remove_existing)
            .field("clean_up_paths", &self.clean_up_paths)
            .field("hooks", &self.before_task.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::MemoryPayload;
    use crate::plan::entry_copy_plan;
    use futures::FutureExt;
    use std::sync::{Arc, Mutex};

    fn details(log: Arc<Mutex<Vec<&'static str>>>, before_fails: bool) -> InstallationDetails {
        let before_log = log.clone();
        let before: InstallHook = Arc::new(move |_: Cancellation| {
            let log = before_log.clone();
            async move {
                log.lock().unwrap().push("before");
                if before_fails {
                    Err(Error::Other("boom".into()))
                } else {
                    Ok(())
                }
            }
            .boxed()
        });
        let after: InstallHook = Arc::new(move |_: Cancellation| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push("after");
                Ok::<(), Error>(())
            }
            .boxed()
        });
        InstallationDetails {
            entry_id: "mod".into(),
            kind: ContentKind::GenericMod,
            display_name: "Mod".into(),
            destination: Utf8PathBuf::from("/mods/mod"),
            copy_plan: CopyPlan::skip_all(),
            remove_existing: false,
            clean_up_paths: Vec::new(),
            before_task: Some(before),
            after_task: Some(after),
        }
    }

    #[tokio::test]
    async fn test_hooks_wrap_copy() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let details = details(log.clone(), false);
        let copy_log = log.clone();
        let run = details
            .run(&Cancellation::new(), || async move {
                copy_log.lock().unwrap().push("copy");
                Ok(3)
            })
            .await;
        assert_eq!(run.result.unwrap(), 3);
        assert_eq!(*log.lock().unwrap(), vec!["before", "copy", "after"]);
    }

    #[tokio::test]
    async fn test_after_runs_when_before_fails() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let details = details(log.clone(), true);
        let run = details
            .run(&Cancellation::new(), || async { Ok(()) })
            .await;
        assert!(run.result.is_err());
        assert_eq!(*log.lock().unwrap(), vec!["before", "after"]);
    }

    #[tokio::test]
    async fn test_after_runs_when_cancelled() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let details = details(log.clone(), false);
        let cancel = Cancellation::new();
        cancel.cancel();
        let run = details.run(&cancel, || async { Ok(()) }).await;
        assert!(matches!(run.result, Err(Error::Cancelled)));
        assert_eq!(*log.lock().unwrap(), vec!["before", "after"]);
    }

    #[test]
    fn test_resolve_over_payload() {
        let payload = MemoryPayload::new().with_files(["app/app.py", "app/icons/a.png", "readme.txt"]);
        let mut details = details(Arc::new(Mutex::new(Vec::new())), false);
        details.copy_plan = entry_copy_plan("app", &details.destination, None, true);

        let resolved = details.resolve(&payload);
        assert_eq!(resolved.files.len(), 2);
        assert_eq!(resolved.directories.len(), 1);
        assert_eq!(resolved.directories[0].destination, Utf8PathBuf::from("/mods/mod/icons"));
    }
}
