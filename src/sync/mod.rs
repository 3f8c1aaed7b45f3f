//! Session-owned, fair, reentrant locks keyed by resource identity.
//!
//! A [`SyncManager`] maps each [`ResourceKey`] to a [`Coordinator`] and hands
//! out [`SyncContext`] sessions. Acquiring through a context returns a
//! [`SyncScope`]; disposing the scope (or the whole context) releases it.

mod context;
mod coordinator;
mod key;
mod manager;
mod scope;
mod table;
mod timeout;

pub use context::SyncContext;
pub use coordinator::Coordinator;
pub use key::ResourceKey;
pub use manager::SyncManager;
pub use scope::SyncScope;
pub use table::ContextId;
pub use timeout::{Timeout, INFINITE_MILLIS};
