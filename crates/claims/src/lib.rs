//! # OU Modules Claims
//!
//! Several bot instances may receive the same chat message. Before replying,
//! a worker claims the message id; only one claim succeeds. A worker that
//! fails after claiming marks the claim retryable so a redelivery can finish
//! the job.
//!
//! Stores:
//! - [`MemoryClaimStore`]: one process
//! - [`FileClaimStore`]: processes sharing a directory, serialized by an
//!   advisory file lock
//! - [`NoopClaimStore`]: claiming disabled

mod coordinator;
mod error;
mod file;
mod record;
mod store;

pub use coordinator::ClaimCoordinator;
pub use error::{ClaimError, Result};
pub use file::FileClaimStore;
pub use record::{ClaimRecord, ClaimState};
pub use store::{ClaimStore, MemoryClaimStore, NoopClaimStore};
