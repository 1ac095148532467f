//! Prelude module for common executor types.

pub use crate::entities::{
    CallbackGroup, Exclusivity, Node, Payload, SourceHandle, SourceId, SourceKind,
};
pub use crate::multi_thread::MultiThreadExecutor;
pub use crate::options::ExecutorOptions;
pub use crate::selection::SelectionMode;
pub use crate::single_thread::SingleThreadExecutor;
pub use crate::wait_set::{WaitPrimitive, WaitStatus};
