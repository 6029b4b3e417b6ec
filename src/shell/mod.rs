//! External command execution.

pub mod command;

pub use command::{argv, execute, CommandOptions, CommandResult};
