mod types;

pub use types::{Result, SyncError};

// Re-export for convenience
pub use SyncError as Error;
