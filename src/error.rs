//! Error values produced while parsing and evaluating a command line.
//!
//! Two things can stop an evaluation early: a [`ShellError`], which a
//! sequence may report and step over, and the termination request raised by
//! `exit`, which always unwinds to the top. Both travel inside [`Halt`] so a
//! plain `?` moves either one outwards.

use std::fmt;
use std::io;
use thiserror::Error;

pub const E_SYNTAX: &str = "Invalid syntax";
pub const E_INVALID_APP: &str = "Invalid app";
pub const E_INVALID_FILE: &str = "Invalid Filename";
pub const E_FILE_NOT_FOUND: &str = "No such file or directory";
pub const E_NO_PERM: &str = "Permission denied";
pub const E_SUBST_DEPTH: &str = "Command substitution nested too deeply";

/// Failure raised while parsing or running a command line.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The command line is malformed.
    #[error("shell: {0}")]
    Syntax(String),
    /// Something went wrong while running: unknown application, a file that
    /// cannot be opened, or an application reporting its own failure.
    ///
    /// The message already carries its prefix (`shell:` or the application name).
    #[error("{0}")]
    Processing(String),
    /// The output sink itself is broken.
    #[error("shell: {0}")]
    Io(#[from] io::Error),
}

impl ShellError {
    pub fn syntax() -> Self {
        ShellError::Syntax(E_SYNTAX.to_string())
    }

    pub fn invalid_app(name: &str) -> Self {
        ShellError::Processing(format!("shell: {name}: {E_INVALID_APP}"))
    }

    /// Maps a failed `open` to a processing error with a stable message.
    pub fn from_open(err: &io::Error) -> Self {
        let msg = match err.kind() {
            io::ErrorKind::NotFound => E_FILE_NOT_FOUND.to_string(),
            io::ErrorKind::PermissionDenied => E_NO_PERM.to_string(),
            _ => err.to_string(),
        };
        ShellError::Processing(format!("shell: {msg}"))
    }

    /// Whether a [`crate::command::SequenceCommand`] may print this error and
    /// move on to its next statement.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ShellError::Syntax(_) | ShellError::Processing(_))
    }
}

/// Why an evaluation stopped before finishing.
#[derive(Debug)]
pub enum Halt {
    /// `exit` was invoked; the whole shell should stop.
    Exit,
    Failed(ShellError),
}

impl Halt {
    pub fn is_exit(&self) -> bool {
        matches!(self, Halt::Exit)
    }

    /// The underlying error, if this is not a termination request.
    pub fn error(&self) -> Option<&ShellError> {
        match self {
            Halt::Exit => None,
            Halt::Failed(err) => Some(err),
        }
    }
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Halt::Exit => write!(f, "exit"),
            Halt::Failed(err) => write!(f, "{err}"),
        }
    }
}

impl From<ShellError> for Halt {
    fn from(err: ShellError) -> Self {
        Halt::Failed(err)
    }
}

impl From<io::Error> for Halt {
    fn from(err: io::Error) -> Self {
        Halt::Failed(ShellError::Io(err))
    }
}

/// Result of evaluating (part of) a command line.
pub type Eval<T = ()> = Result<T, Halt>;
