//! Task execution.

use tracing::{debug, info, warn};

use crate::error::ForgeError;
use crate::secrets::{OutputMasker, Sensitive};

use super::cancel::CancelToken;
use super::report;
use super::task::{Failure, Outcome, TaskFailure, TaskId, TaskNode, TaskResult};
use super::tree::TaskTree;

type IncludeFn = Box<dyn Fn(&TaskNode) -> bool>;

/// Executes a tree of named tasks depth-first.
///
/// # Example
///
/// ```
/// use stackforge::tasks::{Outcome, TaskFailure, TaskRuntime};
///
/// let outcome = TaskRuntime::new().run("root", |ctx| {
///     ctx.spawn("ok", |ctx| {
///         ctx.summarize("fine");
///         Ok(())
///     });
///     ctx.spawn("broken", |_| -> Result<(), _> { Err(TaskFailure::reported("no luck")) });
///     Ok(())
/// });
///
/// assert_eq!(outcome.outcome(), Outcome::Error);
/// assert_eq!(outcome.errors().len(), 1);
/// assert!(outcome.report(false).contains("root.broken: no luck"));
/// ```
pub struct TaskRuntime {
    tree: TaskTree,
    include: IncludeFn,
    cancel: CancelToken,
    fault: Option<ForgeError>,
}

impl Default for TaskRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRuntime {
    /// A runtime that runs every task.
    pub fn new() -> Self {
        Self {
            tree: TaskTree::default(),
            include: Box::new(|_| true),
            cancel: CancelToken::new(),
            fault: None,
        }
    }

    /// Only run tasks for which `include` returns true; others are SKIPPED
    /// without invoking their body.
    pub fn with_include(mut self, include: impl Fn(&TaskNode) -> bool + 'static) -> Self {
        self.include = Box::new(include);
        self
    }

    /// Observe `token` for cancellation.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run `body` as the root task and return the finished tree.
    pub fn run<T>(
        mut self,
        name: impl Into<String>,
        body: impl FnOnce(&mut TaskContext<'_>) -> TaskResult<T>,
    ) -> RootOutcome<T> {
        let handle = self.spawn_node(None, name.into(), false, body);
        RootOutcome {
            tree: self.tree,
            root: handle.id,
            value: handle.value,
            fault: self.fault,
        }
    }

    fn spawn_node<T>(
        &mut self,
        parent: Option<TaskId>,
        name: String,
        detail: bool,
        body: impl FnOnce(&mut TaskContext<'_>) -> TaskResult<T>,
    ) -> TaskHandle<T> {
        let duplicate = parent.is_some_and(|p| self.tree.has_child(p, &name));
        let id = self.tree.push(name, parent);
        self.tree.get_mut(id).detail = detail;

        if duplicate {
            let path = self.tree.get(id).path.clone();
            let err = ForgeError::Other(anyhow::anyhow!("duplicate task name: {}", path));
            return self.finish(id, Err(TaskFailure::Fault(err)), false);
        }
        if self.cancel.is_cancelled() {
            return self.finish(id, Err(TaskFailure::Skipped("interrupted".into())), false);
        }
        if self.fault.is_some() {
            return self.finish(id, Err(TaskFailure::Skipped("not run".into())), false);
        }
        if !(self.include)(self.tree.get(id)) {
            return self.finish(id, Err(TaskFailure::Skipped(String::new())), false);
        }

        self.tree.get_mut(id).outcome = Outcome::Running;
        debug!("task {} started", self.tree.get(id).path);

        let result = {
            let mut ctx = TaskContext { rt: self, id };
            body(&mut ctx)
        };
        self.finish(id, result.map(Some), true)
    }

    fn finish<T>(
        &mut self,
        id: TaskId,
        result: TaskResult<Option<T>>,
        ran: bool,
    ) -> TaskHandle<T> {
        let errored_children = self
            .tree
            .get(id)
            .children
            .iter()
            .filter(|c| self.tree.get(**c).outcome == Outcome::Error)
            .count();
        let interrupted = ran && self.cancel.is_cancelled();

        let (outcome, failure, value, skip_summary) = match result {
            Err(TaskFailure::Fault(err)) => {
                let message = err.diagnostic();
                if self.fault.is_none() {
                    self.fault = Some(err);
                }
                (Outcome::Error, Some(Failure::Unexpected(message)), None, None)
            }
            _ if interrupted => (Outcome::Error, Some(Failure::Interrupted), None, None),
            Ok(value) if errored_children > 0 => (
                Outcome::Error,
                Some(Failure::Children(errored_children)),
                value,
                None,
            ),
            Ok(value) => (Outcome::Ok, None, value, None),
            Err(TaskFailure::Reported(message)) => {
                (Outcome::Error, Some(Failure::Reported(message)), None, None)
            }
            Err(TaskFailure::Child(_)) => (
                Outcome::Error,
                Some(Failure::Children(errored_children.max(1))),
                None,
                None,
            ),
            // An errored child outranks a later skip.
            Err(TaskFailure::Skipped(_)) if errored_children > 0 => (
                Outcome::Error,
                Some(Failure::Children(errored_children)),
                None,
                None,
            ),
            Err(TaskFailure::Skipped(reason)) => (Outcome::Skipped, None, None, Some(reason)),
            Err(TaskFailure::Interrupted) => {
                (Outcome::Error, Some(Failure::Interrupted), None, None)
            }
        };

        let node = self.tree.get_mut(id);
        node.outcome = outcome;
        node.failure = failure;
        if let Some(reason) = skip_summary.filter(|r| !r.is_empty()) {
            node.summary.get_or_insert(reason);
        }

        match outcome {
            Outcome::Error => {
                let message = self.tree.failure_message(id).unwrap_or_default();
                warn!("task {} errored: {}", self.tree.get(id).path, message);
            }
            _ => debug!("task {} finished: {}", self.tree.get(id).path, outcome),
        }

        TaskHandle { id, outcome, value }
    }
}

/// The running task's view of the runtime.
pub struct TaskContext<'rt> {
    rt: &'rt mut TaskRuntime,
    id: TaskId,
}

impl TaskContext<'_> {
    /// Id of the running task.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Dotted path of the running task.
    pub fn path(&self) -> &str {
        self.rt.tree.get(self.id).path()
    }

    /// Run `body` as a child of the running task.
    pub fn spawn<T>(
        &mut self,
        name: impl Into<String>,
        body: impl FnOnce(&mut TaskContext<'_>) -> TaskResult<T>,
    ) -> TaskHandle<T> {
        self.rt.spawn_node(Some(self.id), name.into(), false, body)
    }

    /// Like [`spawn`](Self::spawn), but the task is hidden from the report
    /// unless it is rendered verbosely.
    pub fn spawn_detail<T>(
        &mut self,
        name: impl Into<String>,
        body: impl FnOnce(&mut TaskContext<'_>) -> TaskResult<T>,
    ) -> TaskHandle<T> {
        self.rt.spawn_node(Some(self.id), name.into(), true, body)
    }

    /// Set the running task's summary. Only the first call takes effect.
    pub fn summarize(&mut self, text: impl Into<String>) {
        let node = self.rt.tree.get_mut(self.id);
        if node.summary.is_some() {
            warn!("task {} summarized more than once", node.path);
            return;
        }
        node.summary = Some(text.into());
    }

    /// Emit a progress line for the running task.
    pub fn status(&self, text: &str) {
        let masked = self.rt.tree.masker().mask(text);
        info!("[{}] {}", self.path(), masked);
    }

    /// Record that the running task handles `value`, so every rendering of
    /// the tree masks it.
    pub fn touch<T: AsRef<str> + Send + Sync + 'static>(&mut self, value: &Sensitive<T>) {
        let handle = value.as_ref_handle();
        let node = self.rt.tree.get_mut(self.id);
        if !node.sensitive.iter().any(|s| s.same_value(&handle)) {
            node.sensitive.push(handle);
        }
    }

    /// Masker covering every sensitive value touched so far.
    pub fn masker(&self) -> OutputMasker {
        self.rt.tree.masker()
    }

    /// Whether the run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.rt.cancel.is_cancelled()
    }
}

/// The finished state of a spawned task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    outcome: Outcome,
    value: Option<T>,
}

impl<T> TaskHandle<T> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// The body's return value, if the task finished OK.
    pub fn value(&self) -> Option<&T> {
        match self.outcome {
            Outcome::Ok => self.value.as_ref(),
            _ => None,
        }
    }

    /// Continue with the child's value, or bail out with a failure that
    /// makes the caller's task mirror the child's outcome.
    pub fn get(self) -> TaskResult<T> {
        match (self.outcome, self.value) {
            (Outcome::Ok, Some(value)) => Ok(value),
            (Outcome::Skipped, _) => Err(TaskFailure::Skipped(String::new())),
            _ => Err(TaskFailure::Child(self.id)),
        }
    }
}

/// The finished task tree of one run.
#[derive(Debug)]
pub struct RootOutcome<T> {
    tree: TaskTree,
    root: TaskId,
    value: Option<T>,
    fault: Option<ForgeError>,
}

impl<T> RootOutcome<T> {
    /// The root task's outcome.
    pub fn outcome(&self) -> Outcome {
        self.tree.get(self.root).outcome
    }

    /// Whether the run finished without any task error.
    pub fn is_success(&self) -> bool {
        self.outcome() != Outcome::Error
    }

    /// The root body's return value, if it returned normally.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The first unrecoverable fault, if one stopped the run.
    pub fn fault(&self) -> Option<&ForgeError> {
        self.fault.as_ref()
    }

    pub fn tree(&self) -> &TaskTree {
        &self.tree
    }

    pub fn root(&self) -> &TaskNode {
        self.tree.get(self.root)
    }

    /// Find a task by dotted path.
    pub fn find(&self, path: &str) -> Option<&TaskNode> {
        self.tree.find(path)
    }

    /// Masked summary of the task at `path`.
    pub fn summary_of(&self, path: &str) -> Option<String> {
        self.tree.find_id(path).and_then(|id| self.tree.summary(id))
    }

    /// Tasks where errors originated.
    pub fn errors(&self) -> Vec<&TaskNode> {
        self.tree
            .leaf_errors(self.root)
            .into_iter()
            .map(|id| self.tree.get(id))
            .collect()
    }

    /// Whether any task still has a non-terminal outcome.
    pub fn has_unfinished(&self) -> bool {
        self.tree
            .traversal(self.root)
            .into_iter()
            .any(|id| !self.tree.get(id).outcome.is_terminal())
    }

    /// Render the tree, totals and error list with sensitive values masked.
    pub fn report(&self, verbose: bool) -> String {
        report::render(&self.tree, self.root, verbose)
    }
}
