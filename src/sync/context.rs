use super::coordinator::{Coordinator, Session, Wait};
use super::key::ResourceKey;
use super::manager::SyncManager;
use super::scope::SyncScope;
use super::table::ContextId;
use super::timeout::Timeout;
use crate::error::{Result, SyncError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct Holdings {
    /// One entry per successful acquisition, so reentrant holds appear repeatedly.
    held: Vec<Arc<Coordinator>>,
    /// Coordinators a thread of this context is currently blocked on.
    waiting: Vec<Arc<Coordinator>>,
}

pub(crate) struct ContextInner {
    id: ContextId,
    manager: SyncManager,
    disposed: AtomicBool,
    holdings: Mutex<Holdings>,
}

impl Session for ContextInner {
    fn id(&self) -> ContextId {
        self.id
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl ContextInner {
    fn begin_wait(&self, coordinator: &Arc<Coordinator>) -> Result<()> {
        let mut holdings = self.holdings.lock();
        if self.is_disposed() {
            return Err(SyncError::disposed(self.id));
        }
        holdings.waiting.push(Arc::clone(coordinator));
        Ok(())
    }

    fn end_wait(&self, coordinator: &Arc<Coordinator>) {
        let mut holdings = self.holdings.lock();
        remove_one(&mut holdings.waiting, coordinator);
    }

    /// Record a just-acquired coordinator, or unwind it if disposal won the race.
    fn register(&self, coordinator: Arc<Coordinator>) -> Result<()> {
        {
            let mut holdings = self.holdings.lock();
            if !self.is_disposed() {
                holdings.held.push(coordinator);
                return Ok(());
            }
        }

        debug!(
            "Context {} disposed while acquiring {}; releasing",
            self.id,
            coordinator.key()
        );
        coordinator.release_for_disposed(self.id);
        Err(SyncError::disposed(self.id))
    }
}

/// Frees the context's table slot.
///
/// Every held coordinator belongs to a live [`SyncScope`], and each scope keeps
/// a handle to its context, so nothing can still be held here.
impl Drop for ContextInner {
    fn drop(&mut self) {
        debug_assert!(self.holdings.get_mut().held.is_empty());
        self.manager.contexts().remove(self.id);
    }
}

/// A session that owns locks across any number of threads.
///
/// Clones are handles to the same session. Locks taken through one thread
/// can be released from another, and [`dispose`](SyncContext::dispose)
/// releases everything the session holds and fails its pending waits.
#[derive(Clone)]
pub struct SyncContext {
    inner: Arc<ContextInner>,
}

impl SyncContext {
    pub(crate) fn new(manager: SyncManager) -> Self {
        let id = manager.contexts().insert();
        debug!("Context created: {}", id);
        Self {
            inner: Arc::new(ContextInner {
                id,
                manager,
                disposed: AtomicBool::new(false),
                holdings: Mutex::new(Holdings::default()),
            }),
        }
    }

    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    pub fn manager(&self) -> &SyncManager {
        &self.inner.manager
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Number of acquisitions currently recorded, counting reentrant ones.
    pub fn held_count(&self) -> usize {
        self.inner.holdings.lock().held.len()
    }

    /// Block until this session holds `key`.
    ///
    /// Fails with [`SyncError::ContextDisposed`] if the session is disposed
    /// before or while waiting.
    pub fn acquire(&self, key: &ResourceKey) -> Result<SyncScope> {
        if self.is_disposed() {
            return Err(SyncError::disposed(self.id()));
        }

        let coordinator = self.inner.manager.coordinator(key);

        self.inner.begin_wait(&coordinator)?;
        let acquired = coordinator.acquire(&*self.inner);
        self.inner.end_wait(&coordinator);
        acquired?;

        self.inner.register(coordinator)?;
        Ok(SyncScope::new(self.clone(), key.clone()))
    }

    /// Wait at most `timeout` for `key`.
    ///
    /// Returns `None` on timeout or if the session is (or becomes) disposed.
    pub fn try_acquire(&self, key: &ResourceKey, timeout: Timeout) -> Option<SyncScope> {
        if self.is_disposed() {
            return None;
        }

        let coordinator = self.inner.manager.coordinator(key);

        self.inner.begin_wait(&coordinator).ok()?;
        let wait = coordinator.try_acquire(&*self.inner, timeout);
        self.inner.end_wait(&coordinator);
        if wait != Wait::Acquired {
            return None;
        }

        self.inner.register(coordinator).ok()?;
        Some(SyncScope::new(self.clone(), key.clone()))
    }

    /// [`try_acquire`](Self::try_acquire) with the integer timeout encoding.
    pub fn try_acquire_millis(&self, key: &ResourceKey, millis: i64) -> Result<Option<SyncScope>> {
        let timeout = Timeout::from_millis(millis)?;
        Ok(self.try_acquire(key, timeout))
    }

    pub(crate) fn release(&self, key: &ResourceKey) {
        let Some(coordinator) = self.inner.manager.find_coordinator(key) else {
            return;
        };

        coordinator.release(self.id());
        let mut holdings = self.inner.holdings.lock();
        remove_one(&mut holdings.held, &coordinator);
    }

    /// Release every lock this session holds and fail its pending waits.
    pub fn dispose(&self) {
        let (held, waiting) = {
            let mut holdings = self.inner.holdings.lock();
            if self.inner.disposed.swap(true, Ordering::SeqCst) {
                return;
            }
            (
                std::mem::take(&mut holdings.held),
                holdings.waiting.clone(),
            )
        };

        debug!(
            "Disposing {}: {} held, {} pending",
            self.id(),
            held.len(),
            waiting.len()
        );

        for coordinator in distinct(held.into_iter().chain(waiting)) {
            coordinator.release_for_disposed(self.id());
        }
    }
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("id", &self.inner.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn remove_one(list: &mut Vec<Arc<Coordinator>>, coordinator: &Arc<Coordinator>) {
    if let Some(pos) = list.iter().position(|c| Arc::ptr_eq(c, coordinator)) {
        list.swap_remove(pos);
    }
}

fn distinct(coordinators: impl IntoIterator<Item = Arc<Coordinator>>) -> Vec<Arc<Coordinator>> {
    let mut unique: Vec<Arc<Coordinator>> = Vec::new();
    for coordinator in coordinators {
        if !unique.iter().any(|c| Arc::ptr_eq(c, &coordinator)) {
            unique.push(coordinator);
        }
    }
    unique
}
