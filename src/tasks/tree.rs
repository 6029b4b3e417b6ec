//! Arena storage for the task tree.

use crate::secrets::OutputMasker;

use super::task::{Failure, Outcome, TaskId, TaskNode};

/// All tasks of one invocation, indexed by [`TaskId`].
#[derive(Debug, Default)]
pub struct TaskTree {
    nodes: Vec<TaskNode>,
}

impl TaskTree {
    pub(crate) fn push(&mut self, name: String, parent: Option<TaskId>) -> TaskId {
        let id = TaskId(self.nodes.len());
        let node = TaskNode::new(name, parent.map(|p| self.get(p)), parent);
        self.nodes.push(node);
        if let Some(p) = parent {
            self.get_mut(p).children.push(id);
        }
        id
    }

    /// Get a task by id.
    pub fn get(&self, id: TaskId) -> &TaskNode {
        &self.nodes[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> &mut TaskNode {
        &mut self.nodes[id.0]
    }

    /// Number of tasks in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a task by its dotted path.
    pub fn find(&self, path: &str) -> Option<&TaskNode> {
        self.find_id(path).map(|id| self.get(id))
    }

    pub fn find_id(&self, path: &str) -> Option<TaskId> {
        self.nodes.iter().position(|n| n.path == path).map(TaskId)
    }

    /// Whether `parent` already has a child called `name`.
    pub(crate) fn has_child(&self, parent: TaskId, name: &str) -> bool {
        self.get(parent)
            .children
            .iter()
            .any(|c| self.get(*c).name == name)
    }

    /// Depth-first, pre-order traversal starting at `from`.
    pub fn traversal(&self, from: TaskId) -> Vec<TaskId> {
        let mut order = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.get(id).children.iter().rev());
        }
        order
    }

    /// Whether a task is the origin of an error rather than a parent of one.
    pub fn is_leaf_error(&self, id: TaskId) -> bool {
        let node = self.get(id);
        if node.outcome != Outcome::Error {
            return false;
        }
        match &node.failure {
            Some(Failure::Children(_)) | None => false,
            Some(Failure::Interrupted) => !node
                .children
                .iter()
                .any(|c| self.get(*c).failure == Some(Failure::Interrupted)),
            Some(_) => true,
        }
    }

    /// Leaf errors below (and including) `from`, in traversal order.
    pub fn leaf_errors(&self, from: TaskId) -> Vec<TaskId> {
        self.traversal(from)
            .into_iter()
            .filter(|id| self.is_leaf_error(*id))
            .collect()
    }

    /// A masker covering every sensitive value touched anywhere in the tree.
    pub fn masker(&self) -> OutputMasker {
        let mut masker = OutputMasker::new();
        for node in &self.nodes {
            for value in &node.sensitive {
                masker.add_ref(value.clone());
            }
        }
        masker
    }

    /// A task's summary with sensitive values masked.
    pub fn summary(&self, id: TaskId) -> Option<String> {
        let masker = self.masker();
        self.get(id).raw_summary().map(|s| masker.mask(s))
    }

    /// A task's failure message with sensitive values masked.
    pub fn failure_message(&self, id: TaskId) -> Option<String> {
        let masker = self.masker();
        self.get(id)
            .failure
            .as_ref()
            .map(|f| masker.mask(&f.to_string()))
    }
}
