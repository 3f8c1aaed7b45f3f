use super::context::SyncContext;
use super::coordinator::Coordinator;
use super::key::ResourceKey;
use super::scope::SyncScope;
use super::table::{ContextId, ContextTable};
use super::timeout::Timeout;
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

struct Shared {
    /// Weak so that a coordinator lives only while some context holds it.
    registry: Mutex<HashMap<ResourceKey, Weak<Coordinator>>>,
    contexts: Arc<ContextTable>,
}

/// Registry of per-resource coordinators and factory for contexts.
///
/// Clones share the same registry. Each manager is an independent lock
/// domain: keys locked through one manager are invisible to another.
#[derive(Clone)]
pub struct SyncManager {
    shared: Arc<Shared>,
}

impl Default for SyncManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncManager {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(HashMap::new()),
                contexts: Arc::new(ContextTable::new()),
            }),
        }
    }

    pub fn create_context(&self) -> SyncContext {
        SyncContext::new(self.clone())
    }

    /// Block until `key` is held by a fresh single-use context.
    ///
    /// The context lives inside the returned scope and goes away with it.
    pub fn acquire(&self, key: &ResourceKey) -> Result<SyncScope> {
        self.create_context().acquire(key)
    }

    pub fn try_acquire(&self, key: &ResourceKey, timeout: Timeout) -> Option<SyncScope> {
        self.create_context().try_acquire(key, timeout)
    }

    pub fn try_acquire_millis(&self, key: &ResourceKey, millis: i64) -> Result<Option<SyncScope>> {
        let timeout = Timeout::from_millis(millis)?;
        Ok(self.try_acquire(key, timeout))
    }

    /// The live coordinator for `key`, created if missing or dead.
    pub fn coordinator(&self, key: &ResourceKey) -> Arc<Coordinator> {
        let mut registry = self.shared.registry.lock();

        if let Some(coordinator) = registry.get(key).and_then(Weak::upgrade) {
            return coordinator;
        }

        let coordinator = Arc::new(Coordinator::new(
            key.clone(),
            Arc::clone(&self.shared.contexts),
        ));
        registry.insert(key.clone(), Arc::downgrade(&coordinator));
        prune(&mut registry);
        debug!("Coordinator created for {}", key);

        coordinator
    }

    /// The live coordinator for `key`, without creating one.
    pub fn find_coordinator(&self, key: &ResourceKey) -> Option<Arc<Coordinator>> {
        let mut registry = self.shared.registry.lock();

        let found = registry.get(key).map(Weak::upgrade);
        match found {
            Some(Some(coordinator)) => Some(coordinator),
            Some(None) => {
                registry.remove(key);
                prune(&mut registry);
                None
            }
            None => None,
        }
    }

    pub fn holder_of(&self, key: &ResourceKey) -> Option<ContextId> {
        self.find_coordinator(key).and_then(|c| c.holder())
    }

    pub fn acquire_count(&self, key: &ResourceKey) -> usize {
        self.find_coordinator(key).map_or(0, |c| c.acquire_count())
    }

    pub fn waiting_len(&self, key: &ResourceKey) -> usize {
        self.find_coordinator(key).map_or(0, |c| c.waiting_len())
    }

    /// Live registry entries, after sweeping dead ones.
    pub fn coordinator_count(&self) -> usize {
        let mut registry = self.shared.registry.lock();
        prune(&mut registry);
        registry.len()
    }

    /// Contexts created by this manager that are still alive.
    pub fn context_count(&self) -> usize {
        self.shared.contexts.len()
    }

    pub(crate) fn contexts(&self) -> &ContextTable {
        &self.shared.contexts
    }
}

impl fmt::Debug for SyncManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncManager")
            .field("coordinators", &self.shared.registry.lock().len())
            .field("contexts", &self.shared.contexts.len())
            .finish()
    }
}

fn prune(registry: &mut HashMap<ResourceKey, Weak<Coordinator>>) {
    let before = registry.len();
    registry.retain(|_, coordinator| coordinator.strong_count() > 0);
    if registry.len() != before {
        trace!("Pruned {} dead coordinator(s)", before - registry.len());
    }
}
