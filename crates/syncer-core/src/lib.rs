//! # Syncer Core
//!
//! Domain types shared by the git-syncer crates.
//!
//! - [`SyncRepoTask`]: one source/target pair plus its reference rules
//! - [`is_ref_included`]: the pure decision of which references survive a mirror
//! - [`JitteredDelay`]: randomized waits between scheduling cycles

pub mod delay;
pub mod error;
pub mod filter;
pub mod task;

pub use delay::JitteredDelay;
pub use error::{Result, TaskError};
pub use filter::is_ref_included;
pub use task::{RefPattern, SyncRepoTask, SyncRepoTaskBuilder};
