//! Terminal interaction.
//!
//! - [`UserInterface`] trait so commands can be driven by tests
//! - [`TerminalUI`] for the real terminal (console + dialoguer)
//! - [`MockUI`] capturing output and answering prompts from a script
//!
//! # Example
//!
//! ```
//! use stackforge::ui::{MockUI, Prompt, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.set_prompt_response("user", "deployer");
//!
//! let answer = ui.prompt(&Prompt::input("user", "Docker user")).unwrap();
//! assert_eq!(answer, "deployer");
//! ```

pub mod mock;
pub mod terminal;

pub use mock::MockUI;
pub use terminal::TerminalUI;

use crate::error::Result;

/// Trait for user interface interactions.
pub trait UserInterface {
    /// Plain informational line.
    fn message(&mut self, msg: &str);

    fn success(&mut self, msg: &str);

    fn warning(&mut self, msg: &str);

    /// Error line. Always written to stderr.
    fn error(&mut self, msg: &str);

    /// Ask a question and return the answer.
    fn prompt(&mut self, prompt: &Prompt) -> Result<String>;
}

/// A question for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Stable identifier, used by [`MockUI`] to pick a response.
    pub key: String,
    pub question: String,
    pub default: Option<String>,
    /// Do not echo the answer.
    pub hidden: bool,
}

impl Prompt {
    pub fn input(key: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            question: question.into(),
            default: None,
            hidden: false,
        }
    }

    pub fn password(key: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            hidden: true,
            ..Self::input(key, question)
        }
    }

    /// Answer used when the user just presses enter. Empty defaults are
    /// ignored.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        let default = default.into();
        if !default.is_empty() {
            self.default = Some(default);
        }
        self
    }
}
