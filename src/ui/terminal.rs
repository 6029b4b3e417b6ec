//! Interactive terminal UI.

use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};
use std::io::Write;

use crate::error::{ForgeError, Result};

use super::{Prompt, UserInterface};

fn map_dialoguer_err(e: dialoguer::Error) -> ForgeError {
    ForgeError::Io(e.into())
}

/// Dialoguer theme without the default yellow `?` prefix.
fn prompt_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("".to_string()),
        ..ColorfulTheme::default()
    }
}

/// UI writing to the process terminal.
pub struct TerminalUI {
    out: Term,
    err: Term,
}

impl Default for TerminalUI {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalUI {
    pub fn new() -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
        }
    }
}

impl UserInterface for TerminalUI {
    fn message(&mut self, msg: &str) {
        writeln!(self.out, "{}", msg).ok();
    }

    fn success(&mut self, msg: &str) {
        writeln!(self.out, "{}", style(msg).green()).ok();
    }

    fn warning(&mut self, msg: &str) {
        writeln!(self.out, "{}", style(msg).yellow()).ok();
    }

    fn error(&mut self, msg: &str) {
        writeln!(self.err, "{}", style(msg).red()).ok();
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<String> {
        let theme = prompt_theme();
        if prompt.hidden {
            return Password::with_theme(&theme)
                .with_prompt(&prompt.question)
                .interact_on(&self.err)
                .map_err(map_dialoguer_err);
        }

        let input = Input::<String>::with_theme(&theme).with_prompt(&prompt.question);
        match &prompt.default {
            Some(default) => input
                .default(default.clone())
                .interact_on(&self.err)
                .map_err(map_dialoguer_err),
            None => input.interact_on(&self.err).map_err(map_dialoguer_err),
        }
    }
}
