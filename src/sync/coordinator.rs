//! Per-resource fair, reentrant blocking lock.
//!
//! Ownership belongs to a session ([`ContextId`]), not a thread. Waiters are
//! served strictly first-in-first-out: a waiter only claims the lock when it
//! is free *and* its context heads the queue. Releases wake every blocked
//! thread and the head check in the wait loop restores the order.

use super::key::ResourceKey;
use super::table::{ContextId, ContextTable};
use super::timeout::Timeout;
use crate::error::{Result, SyncError};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// What a coordinator needs to know about the session asking for it.
pub(crate) trait Session {
    fn id(&self) -> ContextId;
    fn is_disposed(&self) -> bool;
}

/// Outcome of a wait on a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wait {
    Acquired,
    TimedOut,
    Disposed,
}

#[derive(Debug)]
struct Waiter {
    context: ContextId,
    /// Threads of `context` currently blocked here.
    threads: usize,
}

#[derive(Debug, Default)]
struct State {
    holder: Option<ContextId>,
    count: usize,
    waiting: VecDeque<Waiter>,
}

impl State {
    fn head(&self) -> Option<ContextId> {
        self.waiting.front().map(|w| w.context)
    }

    fn position(&self, context: ContextId) -> Option<usize> {
        self.waiting.iter().position(|w| w.context == context)
    }

    fn try_reenter(&mut self, context: ContextId) -> bool {
        if self.holder == Some(context) {
            self.count += 1;
            return true;
        }
        false
    }

    fn try_claim_if_free(&mut self, context: ContextId) -> bool {
        if self.holder.is_none() && self.waiting.is_empty() {
            self.holder = Some(context);
            self.count = 1;
            return true;
        }
        false
    }

    fn try_claim_as_head(&mut self, context: ContextId) -> bool {
        if self.holder.is_none() && self.head() == Some(context) {
            self.holder = Some(context);
            self.count = 1;
            return true;
        }
        false
    }

    fn enqueue(&mut self, context: ContextId) {
        match self.waiting.iter_mut().find(|w| w.context == context) {
            Some(waiter) => waiter.threads += 1,
            None => self.waiting.push_back(Waiter {
                context,
                threads: 1,
            }),
        }
    }

    /// Drop one blocked thread's share of `context`'s queue entry.
    fn leave(&mut self, context: ContextId) {
        if let Some(pos) = self.position(context) {
            let waiter = &mut self.waiting[pos];
            waiter.threads -= 1;
            if waiter.threads == 0 {
                self.waiting.remove(pos);
            }
        }
    }

    /// Remove `context`'s queue entry wherever it is, whatever its share count.
    fn remove(&mut self, context: ContextId) -> bool {
        match self.position(context) {
            Some(pos) => {
                self.waiting.remove(pos);
                true
            }
            None => false,
        }
    }

    fn free_with_waiters(&self) -> bool {
        self.holder.is_none() && !self.waiting.is_empty()
    }
}

/// Lock state machine for a single resource key.
#[derive(Debug)]
pub struct Coordinator {
    key: ResourceKey,
    contexts: Arc<ContextTable>,
    state: Mutex<State>,
    changed: Condvar,
}

impl Coordinator {
    pub(crate) fn new(key: ResourceKey, contexts: Arc<ContextTable>) -> Self {
        Self {
            key,
            contexts,
            state: Mutex::new(State::default()),
            changed: Condvar::new(),
        }
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Current holder, if it is still a live context.
    pub fn holder(&self) -> Option<ContextId> {
        let mut state = self.state.lock();
        self.prune(&mut state);
        state.holder
    }

    pub fn acquire_count(&self) -> usize {
        let mut state = self.state.lock();
        self.prune(&mut state);
        state.count
    }

    /// Number of distinct contexts queued.
    pub fn waiting_len(&self) -> usize {
        let mut state = self.state.lock();
        self.prune(&mut state);
        state.waiting.len()
    }

    /// Block until `session` holds the lock.
    pub(crate) fn acquire(&self, session: &impl Session) -> Result<()> {
        match self.wait_for(session, None) {
            Wait::Acquired => Ok(()),
            // Without a deadline only disposal ends the wait.
            Wait::TimedOut | Wait::Disposed => Err(SyncError::disposed(session.id())),
        }
    }

    /// Block until `session` holds the lock or `timeout` elapses.
    ///
    /// A timed-out or disposed caller is no longer queued when this returns.
    pub(crate) fn try_acquire(&self, session: &impl Session, timeout: Timeout) -> Wait {
        let deadline = timeout.deadline_from(Instant::now());
        self.wait_for(session, deadline)
    }

    fn wait_for(&self, session: &impl Session, deadline: Option<Instant>) -> Wait {
        let id = session.id();
        let mut state = self.state.lock();

        if session.is_disposed() {
            return Wait::Disposed;
        }

        self.prune(&mut state);

        if state.try_reenter(id) {
            trace!("Reentered lock on {} ({}, depth {})", self.key, id, state.count);
            return Wait::Acquired;
        }
        if state.try_claim_if_free(id) {
            debug!("Lock acquired: {} ({})", self.key, id);
            return Wait::Acquired;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Wait::TimedOut;
        }

        state.enqueue(id);
        trace!(
            "Waiting for lock on {} ({}, {} queued)",
            self.key,
            id,
            state.waiting.len()
        );

        loop {
            let timed_out = match deadline {
                Some(deadline) => self.changed.wait_until(&mut state, deadline).timed_out(),
                None => {
                    self.changed.wait(&mut state);
                    false
                }
            };

            if session.is_disposed() {
                state.leave(id);
                self.changed.notify_all();
                debug!("Wait on {} abandoned: {} was disposed", self.key, id);
                return Wait::Disposed;
            }

            self.prune(&mut state);

            // Another thread of this session got there first.
            if state.try_reenter(id) {
                state.leave(id);
                trace!("Joined held lock on {} ({}, depth {})", self.key, id, state.count);
                return Wait::Acquired;
            }

            if state.try_claim_as_head(id) {
                state.leave(id);
                if !state.waiting.is_empty() {
                    self.changed.notify_all();
                }
                debug!("Lock acquired after wait: {} ({})", self.key, id);
                return Wait::Acquired;
            }

            if timed_out || deadline.is_some_and(|d| Instant::now() >= d) {
                state.leave(id);
                // Our removal may have exposed a new head.
                if state.free_with_waiters() {
                    self.changed.notify_all();
                }
                debug!("Timed out waiting for lock on {} ({})", self.key, id);
                return Wait::TimedOut;
            }

            if state.position(id).is_none() {
                state.enqueue(id);
            }
        }
    }

    /// Drop one level of `context`'s hold. Returns false if it was not the holder.
    pub(crate) fn release(&self, context: ContextId) -> bool {
        let mut state = self.state.lock();
        if state.holder != Some(context) {
            return false;
        }

        state.count -= 1;
        if state.count == 0 {
            state.holder = None;
            debug!("Lock released: {} ({})", self.key, context);
            if !state.waiting.is_empty() {
                self.changed.notify_all();
            }
        }
        true
    }

    /// Forget `context` entirely: drop its hold at any depth and its queue entry.
    pub(crate) fn release_for_disposed(&self, context: ContextId) {
        let mut state = self.state.lock();
        let mut changed = false;

        if state.holder == Some(context) {
            state.holder = None;
            state.count = 0;
            changed = true;
            debug!("Lock force-released: {} ({})", self.key, context);
        }
        if state.remove(context) {
            changed = true;
            trace!("Dequeued disposed {} from {}", context, self.key);
        }

        if changed {
            self.changed.notify_all();
        }
    }

    fn prune(&self, state: &mut State) {
        let mut changed = false;

        if let Some(holder) = state.holder {
            if !self.contexts.is_live(holder) {
                trace!("Pruned dead holder {} from {}", holder, self.key);
                state.holder = None;
                state.count = 0;
                changed = true;
            }
        }

        let before = state.waiting.len();
        state.waiting.retain(|w| self.contexts.is_live(w.context));
        if state.waiting.len() != before {
            trace!(
                "Pruned {} dead waiter(s) from {}",
                before - state.waiting.len(),
                self.key
            );
            changed = true;
        }

        if changed && state.free_with_waiters() {
            self.changed.notify_all();
        }
    }
}
