//! Registry of loads currently running, keyed by locale.
//!
//! A second caller for a locale that is already loading joins the running
//! future instead of starting another request. The load itself runs on a
//! spawned task that unregisters itself through `FinishGuard`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::time::Instant;

use super::state::LoadOutcome;
use crate::cache::Priority;

/// Cloneable handle to a running load.
pub type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

/// One running load.
struct LoadingTask {
    /// Distinguishes successive loads of the same locale.
    id: u64,
    /// Future every waiter polls.
    shared: SharedLoad,
    /// Priority of the request that started it.
    priority: Priority,
    /// Start time.
    started_at: Instant,
    /// Callers currently awaiting the result.
    waiters: usize,
}

/// Snapshot of a running load.
#[derive(Debug, Clone, PartialEq)]
pub struct InFlightLoad {
    /// Locale being loaded.
    pub locale: String,
    /// Priority of the initiating request.
    pub priority: Priority,
    /// Callers awaiting the result.
    pub waiters: usize,
    /// Time since the load started.
    pub elapsed: Duration,
}

/// Registry state.
#[derive(Default)]
struct Registry {
    /// Running loads by locale.
    tasks: HashMap<String, LoadingTask>,
    /// Next task id.
    next_id: u64,
}

/// Locale -> running load map.
#[derive(Default)]
pub struct InFlightLoads {
    /// Guarded registry.
    inner: Mutex<Registry>,
}

impl fmt::Debug for InFlightLoads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locales: Vec<String> = self.lock().tasks.keys().cloned().collect();
        f.debug_struct("InFlightLoads")
            .field("locales", &locales)
            .finish()
    }
}

impl InFlightLoads {
    /// Lock the registry, recovering from a poisoned mutex.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// What: Join the running load for `locale` or register a new one.
    ///
    /// Inputs:
    /// - `locale`: Locale key
    /// - `priority`: Priority recorded when a new load is registered
    /// - `start`: Builds the load future from its task id; only called when nothing is running
    ///
    /// Output:
    /// - Handle to await and whether this call started the load
    ///
    /// Details:
    /// - Registration and the lookup happen under one lock, so two racing callers
    ///   can never both start a load.
    /// - Each call counts as one waiter until `release` is called.
    pub fn join_or_start<F>(&self, locale: &str, priority: Priority, start: F) -> (SharedLoad, bool)
    where
        F: FnOnce(u64) -> BoxFuture<'static, LoadOutcome>,
    {
        let mut registry = self.lock();
        if let Some(task) = registry.tasks.get_mut(locale) {
            task.waiters += 1;
            return (task.shared.clone(), false);
        }

        let id = registry.next_id;
        registry.next_id += 1;
        let shared = start(id).shared();
        registry.tasks.insert(
            locale.to_string(),
            LoadingTask {
                id,
                shared: shared.clone(),
                priority,
                started_at: Instant::now(),
                waiters: 1,
            },
        );
        drop(registry);
        (shared, true)
    }

    /// Drop one waiter from the load for `locale`, if it is still registered.
    pub fn release(&self, locale: &str) {
        if let Some(task) = self.lock().tasks.get_mut(locale) {
            task.waiters = task.waiters.saturating_sub(1);
        }
    }

    /// Unregister load `id` for `locale`; a newer load of the same locale is left alone.
    pub fn finish(&self, locale: &str, id: u64) {
        let mut registry = self.lock();
        if registry.tasks.get(locale).is_some_and(|task| task.id == id) {
            registry.tasks.remove(locale);
        }
    }

    /// Snapshot of running loads, sorted by locale.
    #[must_use]
    pub fn snapshot(&self) -> Vec<InFlightLoad> {
        let now = Instant::now();
        let mut loads: Vec<InFlightLoad> = self
            .lock()
            .tasks
            .iter()
            .map(|(locale, task)| InFlightLoad {
                locale: locale.clone(),
                priority: task.priority,
                waiters: task.waiters,
                elapsed: now.saturating_duration_since(task.started_at),
            })
            .collect();
        loads.sort_by(|a, b| a.locale.cmp(&b.locale));
        loads
    }

    /// Number of running loads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    /// True when nothing is loading.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases one waiter slot when dropped, including when the awaiting caller is cancelled.
pub struct WaiterGuard<'a> {
    /// Registry to release from.
    loads: &'a InFlightLoads,
    /// Locale awaited.
    locale: &'a str,
}

impl<'a> WaiterGuard<'a> {
    /// Guard for a waiter on `locale`.
    pub const fn new(loads: &'a InFlightLoads, locale: &'a str) -> Self {
        Self { loads, locale }
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.loads.release(self.locale);
    }
}

/// Unregisters a load when its task ends, including by panic.
pub struct FinishGuard<'a> {
    /// Registry to remove from.
    loads: &'a InFlightLoads,
    /// Locale loaded.
    locale: &'a str,
    /// Task id registered for `locale`.
    id: u64,
}

impl<'a> FinishGuard<'a> {
    /// Guard for load `id` of `locale`.
    pub const fn new(loads: &'a InFlightLoads, locale: &'a str, id: u64) -> Self {
        Self { loads, locale, id }
    }
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.loads.finish(self.locale, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::builtin::builtin_bundle;

    fn ready_outcome() -> BoxFuture<'static, LoadOutcome> {
        let outcome = LoadOutcome {
            bundle: builtin_bundle("en"),
            used_fallback: true,
            from_cache: false,
            stages: Vec::new(),
        };
        async move { outcome }.boxed()
    }

    #[test]
    fn second_caller_joins_instead_of_starting() {
        let loads = InFlightLoads::default();
        let (_first, started) = loads.join_or_start("fr", Priority::High, |_| ready_outcome());
        assert!(started);
        let (_second, started) = loads.join_or_start("fr", Priority::Low, |_| {
            panic!("must not start a second load")
        });
        assert!(!started);

        let snapshot = loads.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].waiters, 2);
        assert_eq!(snapshot[0].priority, Priority::High);

        loads.release("fr");
        assert_eq!(loads.snapshot()[0].waiters, 1);
    }

    #[test]
    fn finish_ignores_stale_ids() {
        let loads = InFlightLoads::default();
        let (_, _) = loads.join_or_start("fr", Priority::High, |_| ready_outcome());
        loads.finish("fr", 0);
        assert!(loads.is_empty());

        let mut seen_id = None;
        let (_, _) = loads.join_or_start("fr", Priority::High, |id| {
            seen_id = Some(id);
            ready_outcome()
        });
        assert_eq!(seen_id, Some(1));
        loads.finish("fr", 0);
        assert_eq!(loads.len(), 1);
        loads.finish("fr", 1);
        assert!(loads.is_empty());
    }

    #[tokio::test]
    async fn joined_handles_share_one_result() {
        let loads = InFlightLoads::default();
        let (a, _) = loads.join_or_start("en", Priority::High, |_| ready_outcome());
        let (b, _) = loads.join_or_start("en", Priority::High, |_| ready_outcome());
        let (a, b) = futures::join!(a, b);
        assert!(std::sync::Arc::ptr_eq(&a.bundle, &b.bundle));
    }

    #[test]
    fn finish_guard_unregisters_its_own_load() {
        let loads = InFlightLoads::default();
        let (_, _) = loads.join_or_start("it", Priority::High, |_| ready_outcome());
        {
            let _finish = FinishGuard::new(&loads, "it", 0);
        }
        assert!(loads.is_empty());
    }

    #[test]
    fn guard_releases_on_drop() {
        let loads = InFlightLoads::default();
        let (_, _) = loads.join_or_start("de", Priority::Normal, |_| ready_outcome());
        {
            let _guard = WaiterGuard::new(&loads, "de");
        }
        assert_eq!(loads.snapshot()[0].waiters, 0);
    }
}
