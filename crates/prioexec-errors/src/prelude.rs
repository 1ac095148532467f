//! Prelude module for convenient error handling imports.
//!
//! # Example
//!
//! ```
//! use prioexec_errors::prelude::*;
//!
//! fn reject() -> Result<()> {
//!     Err(ProtocolError::AlreadySpinning.into())
//! }
//!
//! assert!(reject().is_err());
//! ```

pub use crate::{
    Result,
    common::{ErrorCategory, ErrorSeverity, ExecutorError},
    config::ConfigError,
    protocol::ProtocolError,
    source::{CallbackError, TakeError},
    wait::WaitSetError,
};
