//! Generic mod dependency chains.
//!
//! Updating the files of an enabled generic mod means first disabling it and
//! every mod that depends on it, then restoring them once the copy is done.
//! The disable pass walks the `depends_on` chain depth-first and records the
//! order it disabled things in; the restore pass re-enables in the reverse of
//! that order.

use crate::cancel::Cancellation;
use crate::error::{Error, MutexResultExt, Result};
use crate::option::InstallHook;
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Enabled state of one generic mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericModState {
    pub name: String,
    pub enabled: bool,
    pub depends_on: Vec<String>,
}

/// Toggles generic mods on and off.
#[async_trait]
pub trait GenericModsEnabler: Send + Sync {
    async fn find(&self, name: &str) -> Result<Option<GenericModState>>;
    async fn disable(&self, name: &str) -> Result<()>;
    async fn enable(&self, name: &str) -> Result<()>;
}

/// Mods disabled by a before hook, in disable order.
pub type DisabledMods = Arc<Mutex<Vec<String>>>;

/// Disable `name` and, transitively, every enabled mod on its `depends_on`
/// chain. Each disabled mod is appended to `disabled` as soon as it is off,
/// so a failure halfway still leaves an accurate record to restore from.
pub async fn disable_chain(
    enabler: &dyn GenericModsEnabler,
    name: &str,
    cancel: &Cancellation,
    disabled: &Mutex<Vec<String>>,
) -> Result<()> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut stack = vec![name.to_string()];

    while let Some(current) = stack.pop() {
        if !visited.insert(current.to_lowercase()) {
            continue;
        }

        let Some(state) = enabler.find(&current).await? else {
            tracing::warn!("Generic mod '{}' not found, skipping", current);
            continue;
        };

        if state.enabled {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            enabler
                .disable(&state.name)
                .await
                .map_err(|e| Error::ModToggle {
                    name: state.name.clone(),
                    message: e.to_string(),
                })?;
            tracing::debug!("Disabled generic mod '{}'", state.name);
            disabled.lock().mutex_err()?.push(state.name.clone());
        }

        for dependency in state.depends_on.iter().rev() {
            stack.push(dependency.clone());
        }
    }

    Ok(())
}

/// Re-enable mods in the reverse of `disabled`. Every mod is attempted even
/// after a failure; the first failure is returned.
pub async fn enable_in_reverse(enabler: &dyn GenericModsEnabler, disabled: &[String]) -> Result<()> {
    let mut first_error = None;
    for name in disabled.iter().rev() {
        match enabler.enable(name).await {
            Ok(()) => tracing::debug!("Re-enabled generic mod '{}'", name),
            Err(e) => {
                tracing::error!("Failed to re-enable generic mod '{}': {}", name, e);
                first_error.get_or_insert(Error::ModToggle {
                    name: name.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Before/after hooks that disable the chain of `name` and restore it.
///
/// The after hook ignores cancellation: whatever the before hook disabled is
/// always re-enabled.
pub fn chain_hooks(enabler: Arc<dyn GenericModsEnabler>, name: &str) -> (InstallHook, InstallHook) {
    let disabled: DisabledMods = Arc::new(Mutex::new(Vec::new()));

    let before: InstallHook = {
        let enabler = enabler.clone();
        let disabled = disabled.clone();
        let name = name.to_string();
        Arc::new(move |cancel: Cancellation| {
            let enabler = enabler.clone();
            let disabled = disabled.clone();
            let name = name.clone();
            async move {
                disabled.lock().mutex_err()?.clear();
                disable_chain(enabler.as_ref(), &name, &cancel, &disabled).await
            }
            .boxed()
        })
    };

    let after: InstallHook = Arc::new(move |_cancel: Cancellation| {
        let enabler = enabler.clone();
        let disabled = disabled.clone();
        async move {
            let names = std::mem::take(&mut *disabled.lock().mutex_err()?);
            enable_in_reverse(enabler.as_ref(), &names).await
        }
        .boxed()
    });

    (before, after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::MemoryModsEnabler;

    fn abc_chain() -> MemoryModsEnabler {
        MemoryModsEnabler::new()
            .with_mod("A", true, &["B"])
            .with_mod("B", true, &["C"])
            .with_mod("C", true, &[])
    }

    #[tokio::test]
    async fn test_disable_then_enable_in_reverse() {
        let enabler = abc_chain();
        let disabled = Mutex::new(Vec::new());
        disable_chain(&enabler, "A", &Cancellation::new(), &disabled)
            .await
            .unwrap();
        let disabled = disabled.into_inner().unwrap();
        assert_eq!(disabled, vec!["A", "B", "C"]);

        enable_in_reverse(&enabler, &disabled).await.unwrap();
        assert_eq!(enabler.enabled_log(), vec!["C", "B", "A"]);
        assert!(enabler.is_enabled("A"));
    }

    #[tokio::test]
    async fn test_already_disabled_mods_are_not_recorded() {
        let enabler = MemoryModsEnabler::new()
            .with_mod("A", true, &["B"])
            .with_mod("B", false, &["C"])
            .with_mod("C", true, &[]);
        let disabled = Mutex::new(Vec::new());
        disable_chain(&enabler, "A", &Cancellation::new(), &disabled)
            .await
            .unwrap();
        assert_eq!(disabled.into_inner().unwrap(), vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_cycles_terminate() {
        let enabler = MemoryModsEnabler::new()
            .with_mod("A", true, &["B"])
            .with_mod("B", true, &["A"]);
        let disabled = Mutex::new(Vec::new());
        disable_chain(&enabler, "A", &Cancellation::new(), &disabled)
            .await
            .unwrap();
        assert_eq!(disabled.into_inner().unwrap(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_restore_after_partial_failure() {
        let enabler = abc_chain().failing_disable("C");
        let (before, after) = chain_hooks(Arc::new(enabler.clone()), "A");

        let err = before(Cancellation::new()).await.unwrap_err();
        assert!(matches!(err, Error::ModToggle { ref name, .. } if name == "C"));

        after(Cancellation::new()).await.unwrap();
        assert_eq!(enabler.enabled_log(), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_after_hook_runs_when_cancelled() {
        let enabler = abc_chain();
        let (before, after) = chain_hooks(Arc::new(enabler.clone()), "A");
        let cancel = Cancellation::new();

        before(cancel.clone()).await.unwrap();
        cancel.cancel();
        after(cancel).await.unwrap();
        assert_eq!(enabler.enabled_log(), vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_disable() {
        let enabler = abc_chain();
        let cancel = Cancellation::new();
        cancel.cancel();
        let disabled = Mutex::new(Vec::new());
        let result = disable_chain(&enabler, "A", &cancel, &disabled).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(disabled.into_inner().unwrap().is_empty());
    }
}
