//! External command execution.

use crate::error::{ForgeError, Result};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::debug;

/// Result of executing an external command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// The argv that was run.
    pub command: Vec<String>,

    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output and standard error, interleaved as written.
    pub output: String,

    /// Execution duration.
    pub duration: Duration,
}

impl CommandResult {
    /// Whether the command exited 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// The command line as a single display string.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    /// Exit code for reporting; a signal death is reported as -1.
    pub fn code(&self) -> i32 {
        self.exit_code.unwrap_or(-1)
    }

    /// Convert a non-zero exit into an external tool error carrying the
    /// captured output.
    pub fn check(self, tool: &str) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(ForgeError::ExternalTool {
                tool: tool.to_string(),
                message: format!("`{}` exited with code {}", self.command_line(), self.code()),
                output: self.output,
            })
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Extra environment variables (merged with the process environment).
    pub env: Vec<(String, String)>,

    /// Bytes written to the child's stdin, which is then closed.
    pub stdin: Option<Vec<u8>>,

    /// Capture stdout only; stderr is discarded.
    pub stdout_only: bool,
}

/// Run `argv` to completion, capturing combined output.
///
/// Failing to start the program is an error; a non-zero exit is not (see
/// [`CommandResult::check`]).
pub fn execute(argv: &[String], options: &CommandOptions) -> Result<CommandResult> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ForgeError::tool("shell", "empty command"))?;
    let start = Instant::now();
    debug!("running {}", argv.join(" "));

    let (mut reader, writer) = std::io::pipe()?;
    let stderr = if options.stdout_only {
        Stdio::null()
    } else {
        Stdio::from(writer.try_clone()?)
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdout(writer)
        .stderr(stderr)
        .stdin(if options.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    let mut child = cmd.spawn().map_err(|e| ForgeError::ExternalTool {
        tool: program.clone(),
        message: format!("unable to start `{}`: {}", program, e),
        output: String::new(),
    })?;
    // The Command still holds the write ends; drop them so the reader sees EOF.
    drop(cmd);

    // The child is always reaped, even when feeding stdin fails.
    let written = match (&options.stdin, child.stdin.take()) {
        (Some(input), Some(mut stdin)) => stdin.write_all(input),
        _ => Ok(()),
    };

    let mut raw = Vec::new();
    let read = reader.read_to_end(&mut raw);
    let status = child.wait()?;
    written?;
    read?;

    Ok(CommandResult {
        command: argv.to_vec(),
        exit_code: status.code(),
        output: String::from_utf8_lossy(&raw).into_owned(),
        duration: start.elapsed(),
    })
}

/// Build an argv from string slices.
pub fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}
