//! Error taxonomy for the priority-aware callback executor.
//!
//! The dispatcher distinguishes four classes of failure, and every error type
//! in this crate knows which class it belongs to:
//!
//! - [`protocol`]: caller or bookkeeping bugs (re-entrant `spin()`, a gate that
//!   is already closed at selection time, a timer that was never deregistered).
//!   Fatal, never retried.
//! - [`wait`]: the wait set could not be cleared, resized, populated or waited
//!   on. Fatal to the run loop, propagated to the caller of `spin()`.
//! - [`source`]: a ready source failed to yield data ([`TakeError`], logged and
//!   skipped) or a user callback failed ([`CallbackError`], surfaced after
//!   bookkeeping completes).
//! - [`config`]: rejected executor options.
//!
//! [`ExecutorError`] wraps all of them and is what the run loops return.
//!
//! # Example
//!
//! ```
//! use prioexec_errors::prelude::*;
//!
//! fn check_timeout(timeout_ns: u64) -> Result<u64> {
//!     if timeout_ns == 0 {
//!         return Err(ConfigError::ZeroPollTimeout.into());
//!     }
//!     Ok(timeout_ns)
//! }
//!
//! let err = check_timeout(0).unwrap_err();
//! assert_eq!(err.category(), ErrorCategory::Config);
//! assert!(!err.is_recoverable());
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod common;
pub mod config;
pub mod prelude;
pub mod protocol;
pub mod source;
pub mod wait;

pub use common::{ErrorCategory, ErrorSeverity, ExecutorError};
pub use config::ConfigError;
pub use protocol::ProtocolError;
pub use source::{CallbackError, TakeError};
pub use wait::WaitSetError;

/// A specialized `Result` type for executor operations.
pub type Result<T> = std::result::Result<T, ExecutorError>;
