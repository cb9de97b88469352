//! Priority-ordered pre/post install/uninstall hook dispatch.
//!
//! A priority value per registered handler (lower runs first), handlers sorted lazily on
//! dispatch. Composer's 20-plus named command-lifecycle events are narrowed to the four this
//! engine's lifecycle driver actually fires. This engine's driver is single-threaded, so the
//! registry uses a plain `parking_lot::Mutex<HashMap<_>>` rather than a concurrent map.
//!
//! `pre_*` hooks guard the lifecycle step that follows them: the first handler failure aborts
//! dispatch and propagates. `post_*` hooks never undo a successful step: every
//! handler runs regardless of earlier failures, each failure is logged as a warning, and
//! dispatch itself always returns `Ok`.

use std::collections::HashMap;
use std::sync::Arc;

use crucible_core::{Result, Spec};
use parking_lot::Mutex;

/// The four lifecycle hook points this engine fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    PreInstall,
    PostInstall,
    PreUninstall,
    PostUninstall,
}

impl Hook {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreInstall => "pre-install",
            Self::PostInstall => "post-install",
            Self::PreUninstall => "pre-uninstall",
            Self::PostUninstall => "post-uninstall",
        }
    }

    /// `pre_*` hook failures abort the lifecycle step they guard.
    #[must_use]
    pub const fn is_pre(self) -> bool {
        matches!(self, Self::PreInstall | Self::PreUninstall)
    }
}

impl std::fmt::Display for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handler registered for a [`Hook`]: a named callback plus the priority that orders it
/// relative to other handlers on the same hook (lower value runs first, matching the
/// teacher's `HookPriority` convention).
type HandlerFn = dyn Fn(&Spec) -> Result<()> + Send + Sync;

struct Registered {
    id: String,
    priority: i32,
    handler: Arc<HandlerFn>,
}

/// Registry of hook handlers, dispatched in priority order.
#[derive(Default)]
pub struct HookRegistry {
    handlers: Mutex<HashMap<Hook, Vec<Registered>>>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .lock()
            .iter()
            .map(|(hook, v)| (hook.as_str(), v.len()))
            .collect();
        f.debug_struct("HookRegistry").field("handler_counts", &counts).finish()
    }
}

impl HookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `hook` under `id`, at `priority` (lower runs first).
    pub fn register(
        &self,
        hook: Hook,
        id: impl Into<String>,
        priority: i32,
        handler: impl Fn(&Spec) -> Result<()> + Send + Sync + 'static,
    ) {
        self.handlers.lock().entry(hook).or_default().push(Registered {
            id: id.into(),
            priority,
            handler: Arc::new(handler),
        });
    }

    /// Removes every handler registered under `id` for `hook`.
    pub fn unregister(&self, hook: Hook, id: &str) {
        if let Some(list) = self.handlers.lock().get_mut(&hook) {
            list.retain(|r| r.id != id);
        }
    }

    /// Removes every handler registered under `id`, across all hooks.
    pub fn unregister_all(&self, id: &str) {
        for list in self.handlers.lock().values_mut() {
            list.retain(|r| r.id != id);
        }
    }

    fn ordered_handlers(&self, hook: Hook) -> Vec<(String, Arc<HandlerFn>)> {
        let guard = self.handlers.lock();
        let mut entries: Vec<&Registered> = guard.get(&hook).map_or_else(Vec::new, |v| v.iter().collect());
        entries.sort_by_key(|r| r.priority);
        entries.into_iter().map(|r| (r.id.clone(), Arc::clone(&r.handler))).collect()
    }

    /// Dispatches `hook` against `spec`: `pre_*` hooks abort on the first handler error,
    /// `post_*` hooks run every handler regardless, logging (never propagating) failures.
    ///
    /// # Errors
    /// Propagates the first handler's error for a `pre_*` hook; never errors for a `post_*`
    /// hook.
    pub fn dispatch(&self, hook: Hook, spec: &Spec) -> Result<()> {
        let handlers = self.ordered_handlers(hook);

        if hook.is_pre() {
            for (id, handler) in handlers {
                tracing::debug!(hook = %hook, handler = %id, spec = %spec.name, "running pre hook");
                handler(spec)?;
            }
            return Ok(());
        }

        for (id, handler) in handlers {
            tracing::debug!(hook = %hook, handler = %id, spec = %spec.name, "running post hook");
            if let Err(e) = handler(spec) {
                tracing::warn!(hook = %hook, handler = %id, spec = %spec.name, error = %e, "post hook failed, continuing");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    fn spec() -> Spec {
        Spec::new("zlib", "1.2.13", "hash-zlib")
    }

    #[test]
    fn handlers_run_in_priority_order() {
        let registry = HookRegistry::new();
        let order = Arc::new(StdMutex::new(Vec::new()));

        let o1 = Arc::clone(&order);
        registry.register(Hook::PreInstall, "second", 10, move |_| {
            o1.lock().unwrap().push("second");
            Ok(())
        });
        let o2 = Arc::clone(&order);
        registry.register(Hook::PreInstall, "first", -5, move |_| {
            o2.lock().unwrap().push("first");
            Ok(())
        });

        registry.dispatch(Hook::PreInstall, &spec()).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn pre_hook_failure_aborts_dispatch() {
        let registry = HookRegistry::new();
        let ran = Arc::new(AtomicUsize::new(0));

        registry.register(Hook::PreInstall, "failing", 0, |_| Err(crucible_core::Error::install("nope")));
        let ran2 = Arc::clone(&ran);
        registry.register(Hook::PreInstall, "never-runs", 10, move |_| {
            ran2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = registry.dispatch(Hook::PreInstall, &spec()).unwrap_err();
        assert_eq!(err.code(), crucible_core::ErrorCode::Install);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn post_hook_failure_is_logged_but_does_not_abort() {
        let registry = HookRegistry::new();
        let ran = Arc::new(AtomicUsize::new(0));

        registry.register(Hook::PostInstall, "failing", 0, |_| Err(crucible_core::Error::install("cosmetic")));
        let ran2 = Arc::clone(&ran);
        registry.register(Hook::PostInstall, "still-runs", 10, move |_| {
            ran2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        registry.dispatch(Hook::PostInstall, &spec()).unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_removes_only_the_named_handler() {
        let registry = HookRegistry::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = Arc::clone(&ran);

        registry.register(Hook::PostInstall, "keep", 0, move |_| {
            ran2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        registry.register(Hook::PostInstall, "drop", 0, |_| Ok(()));

        registry.unregister(Hook::PostInstall, "drop");
        registry.dispatch(Hook::PostInstall, &spec()).unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
