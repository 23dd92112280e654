//! # coflock core
//!
//! Advisory file locks for tasks on a cooperative (tokio) scheduler.
//!
//! Two modes are supported: exclusive, over any resource, and shared, over
//! read-only resources only. The OS advisory lock arbitrates across
//! processes; waiting for it never blocks the scheduler thread.
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` - returns `Result` instead
//! - No `expect()` - returns `Result` instead
//! - No `panic!()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, Error>`. Lock contention is not
//! an error: it is absorbed by the retry loop in [`LockHandle::acquire`].

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod config;
mod error;
pub mod filelock;
pub mod mode;
pub mod resource;
pub mod shared;

pub use backend::{Flock, LockBackend};
pub use config::{load_options, LockOptions};
pub use error::{Error, LockOperation, Result};
pub use filelock::{LockGuard, LockHandle};
pub use mode::{AccessMode, LockMode};
pub use resource::Resource;
pub use shared::SharedLock;
