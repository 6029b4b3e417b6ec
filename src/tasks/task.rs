//! Task nodes, outcomes and failure signals.

use std::fmt;

use crate::error::ForgeError;
use crate::secrets::SensitiveRef;

/// Index of a task in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) usize);

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Created but not started.
    Pending,
    /// Body is executing.
    Running,
    /// Body returned normally and no child errored.
    Ok,
    /// Excluded by the include predicate, not run, or skipped by its body.
    Skipped,
    /// Failed; see [`Failure`] for the cause.
    Error,
}

impl Outcome {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::Ok | Outcome::Skipped | Outcome::Error)
    }

    /// Get a display character for this outcome.
    pub fn display_char(&self) -> char {
        match self {
            Outcome::Pending => '○',
            Outcome::Running => '◉',
            Outcome::Ok => '✓',
            Outcome::Skipped => '⊘',
            Outcome::Error => '✗',
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Pending => "PENDING",
            Outcome::Running => "RUNNING",
            Outcome::Ok => "OK",
            Outcome::Skipped => "SKIPPED",
            Outcome::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Why a task finished with [`Outcome::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Recoverable failure with a readable message.
    Reported(String),
    /// Unrecoverable fault; the run stops spawning new tasks.
    Unexpected(String),
    /// The body succeeded (or bailed on a child) but children errored.
    Children(usize),
    /// The run was cancelled while this task was running.
    Interrupted,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Reported(msg) => f.write_str(msg),
            Failure::Unexpected(msg) => write!(f, "unexpected error: {}", msg),
            Failure::Children(n) => write!(f, "{} child task(s) errored", n),
            Failure::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// Signal returned by a task body that did not complete normally.
#[derive(Debug)]
pub enum TaskFailure {
    /// Record an error on this task; siblings and parent keep running.
    Reported(String),
    /// Record an error and stop the run.
    Fault(ForgeError),
    /// A child task this body depended on did not succeed.
    Child(TaskId),
    /// Finish as skipped with the given summary.
    Skipped(String),
    /// The run was cancelled.
    Interrupted,
}

impl TaskFailure {
    /// A recoverable failure with a message.
    pub fn reported(message: impl Into<String>) -> Self {
        Self::Reported(message.into())
    }

    /// An unrecoverable fault.
    pub fn fault(error: impl Into<ForgeError>) -> Self {
        Self::Fault(error.into())
    }
}

impl From<ForgeError> for TaskFailure {
    fn from(error: ForgeError) -> Self {
        match error {
            ForgeError::Interrupted => Self::Interrupted,
            other => Self::Reported(other.diagnostic()),
        }
    }
}

/// Result type for task bodies.
pub type TaskResult<T> = std::result::Result<T, TaskFailure>;

/// One node of the execution tree.
#[derive(Debug)]
pub struct TaskNode {
    pub(crate) name: String,
    pub(crate) path: String,
    pub(crate) depth: usize,
    pub(crate) parent: Option<TaskId>,
    pub(crate) children: Vec<TaskId>,
    pub(crate) outcome: Outcome,
    pub(crate) summary: Option<String>,
    pub(crate) failure: Option<Failure>,
    pub(crate) detail: bool,
    pub(crate) sensitive: Vec<SensitiveRef>,
}

impl TaskNode {
    pub(crate) fn new(name: String, parent: Option<&TaskNode>, parent_id: Option<TaskId>) -> Self {
        let (path, depth) = match parent {
            Some(p) => (format!("{}.{}", p.path, name), p.depth + 1),
            None => (name.clone(), 0),
        };
        Self {
            name,
            path,
            depth,
            parent: parent_id,
            children: Vec::new(),
            outcome: Outcome::Pending,
            summary: None,
            failure: None,
            detail: false,
            sensitive: Vec::new(),
        }
    }

    /// Task name, unique among its siblings.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted path from the root, e.g. `forge.api.build.bake`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Distance from the root (the root is 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    pub fn children(&self) -> &[TaskId] {
        &self.children
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Unmasked summary. Use the tree's rendering for user-facing output.
    pub(crate) fn raw_summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Detail tasks are hidden from the report unless verbose.
    pub fn is_detail(&self) -> bool {
        self.detail
    }

    /// Number of sensitive values recorded on this task.
    pub fn sensitive_count(&self) -> usize {
        self.sensitive.len()
    }
}
