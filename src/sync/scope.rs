use super::context::SyncContext;
use super::key::ResourceKey;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// One acquired (context, resource) pair.
///
/// Disposing the scope, explicitly or by dropping it, gives back exactly the
/// acquisition it represents. Further disposals are no-ops.
pub struct SyncScope {
    context: SyncContext,
    key: ResourceKey,
    disposed: AtomicBool,
}

impl SyncScope {
    pub(crate) fn new(context: SyncContext, key: ResourceKey) -> Self {
        Self {
            context,
            key,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// True once this scope or its owning context has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst) || self.context.is_disposed()
    }

    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.context.release(&self.key);
        }
    }
}

impl Drop for SyncScope {
    fn drop(&mut self) {
        if !*self.disposed.get_mut() {
            debug!("Scope for {} dropped without dispose; releasing", self.key);
            self.dispose();
        }
    }
}

impl fmt::Debug for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncScope")
            .field("context", &self.context.id())
            .field("key", &self.key)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
