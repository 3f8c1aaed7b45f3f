//! In-process locks owned by sessions rather than threads

pub mod error;
pub mod sync;
pub mod utils;

pub use error::{Result, SyncError};
pub use sync::{
    ContextId, Coordinator, ResourceKey, SyncContext, SyncManager, SyncScope, Timeout,
    INFINITE_MILLIS,
};
