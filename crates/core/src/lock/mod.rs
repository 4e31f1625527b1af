//! The update lock: a single JSON file that records an update in progress.

mod store;
mod types;

pub use store::{Lock, LockError, LOCK_FILE_NAME};
pub use types::{JobMessage, LockRecord, LockState, MessageKind};
