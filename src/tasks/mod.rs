//! Hierarchical task execution.
//!
//! - [`TaskRuntime`] - Runs a root task and every task it spawns
//! - [`TaskContext`] - The running task's handle for spawning children,
//!   setting its summary and recording sensitive values
//! - [`TaskHandle`] - A finished child's outcome and value
//! - [`RootOutcome`] - The finished tree, with masked reporting
//! - [`CancelToken`] - Cooperative cancellation (SIGINT)
//!
//! Tasks run synchronously in spawn order. A parent finalizes only after its
//! body returns, and by then every child it spawned has finalized.

pub mod cancel;
pub mod report;
pub mod runtime;
pub mod task;
pub mod tree;

pub use cancel::{install_interrupt_handler, CancelToken};
pub use runtime::{RootOutcome, TaskContext, TaskHandle, TaskRuntime};
pub use task::{Failure, Outcome, TaskFailure, TaskId, TaskNode, TaskResult};
pub use tree::TaskTree;
