//! Shared display helpers for finished runs.

use console::style;

use crate::tasks::{Outcome, RootOutcome};
use crate::ui::UserInterface;

/// Style a report tree line by the outcome glyph it starts with.
pub fn style_line(line: &str) -> String {
    let glyph = line.trim_start().chars().next();
    if glyph == Some(Outcome::Ok.display_char()) {
        style(line).green().to_string()
    } else if glyph == Some(Outcome::Error.display_char()) {
        style(line).red().to_string()
    } else if glyph == Some(Outcome::Skipped.display_char()) {
        style(line).dim().to_string()
    } else {
        line.to_string()
    }
}

/// Print the report of `outcome`.
///
/// The tree goes to the normal output, the error list to the error output.
pub fn show_report<T>(ui: &mut dyn UserInterface, outcome: &RootOutcome<T>, verbose: bool) {
    let report = outcome.report(verbose);
    let mut lines = report.lines();

    for line in lines.by_ref() {
        if line.ends_with(" errors") && line.contains(" tasks run, ") {
            if outcome.is_success() {
                ui.success(line);
            } else {
                ui.warning(line);
            }
            break;
        }
        ui.message(&style_line(line));
    }

    let errors: Vec<&str> = lines.collect();
    if !errors.is_empty() {
        ui.error(&errors.join("\n"));
    }
}
