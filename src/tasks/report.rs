//! Plain-text rendering of a finished task tree.

use super::task::{Outcome, TaskId};
use super::tree::TaskTree;

/// Render the tree below `root`.
///
/// One line per shown task (`<glyph> <name>: <summary>`), multi-line
/// summaries indented below it, then `"<n> tasks run, <m> errors"` and one
/// line per leaf error. Detail tasks and their descendants are only shown
/// when `verbose` is set. All text passes through the tree's masker.
pub fn render(tree: &TaskTree, root: TaskId, verbose: bool) -> String {
    let masker = tree.masker();
    let mut lines = Vec::new();
    render_node(tree, root, 0, verbose, &mut lines);

    let total = tree.traversal(root).len();
    let errors = tree.leaf_errors(root);
    lines.push(format!("{} tasks run, {} errors", total, errors.len()));
    for id in errors {
        let node = tree.get(id);
        let message = node.failure().map(|f| f.to_string()).unwrap_or_default();
        let message = message.replace('\n', "\n    ");
        lines.push(format!("  {}: {}", node.path(), message));
    }

    masker.mask(&lines.join("\n"))
}

fn render_node(tree: &TaskTree, id: TaskId, indent: usize, verbose: bool, lines: &mut Vec<String>) {
    let node = tree.get(id);
    if node.is_detail() && !verbose {
        return;
    }

    let pad = "  ".repeat(indent);
    let mut head = format!("{}{} {}", pad, node.outcome().display_char(), node.name());
    let summary = node.raw_summary().unwrap_or("").trim_end();
    let mut rest = summary.lines();
    if let Some(first) = rest.next() {
        head.push_str(": ");
        head.push_str(first);
    } else if node.outcome() == Outcome::Skipped {
        head.push_str(": skipped");
    }
    lines.push(head);
    for line in rest {
        lines.push(format!("{}    {}", pad, line));
    }

    for child in node.children() {
        render_node(tree, *child, indent + 1, verbose, lines);
    }
}
