#![forbid(unsafe_code)]

//! Embedded single-file store for work items shared by cooperating processes.
//!
//! Every mutation runs under a cross-process write permit (see [`WriteLock`]),
//! inside one SQLite transaction, and leaves an action-log entry that undo and
//! sync consumers read back. Status changes propagate to parent epics and to
//! blocked dependents; board positions use sparse integer keys.

mod store;

pub use store::*;
