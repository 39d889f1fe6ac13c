//! Error types shared by the parser, the resolver and the evaluation engine.

use std::io;
use thiserror::Error;

/// Kinds of malformed input detected while building or resolving a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// A token the grammar cannot make sense of, e.g. a redirection without a file.
    #[error("Invalid syntax")]
    Invalid,
    /// A command substitution that was never closed.
    #[error("unmatched back-quote")]
    UnmatchedBackquote,
    /// A single or double quote that was never closed.
    #[error("unmatched quote")]
    UnmatchedQuote,
    /// A raw line break inside an open quote.
    #[error("line break inside quotes")]
    QuotedLineBreak,
    /// A call without any token, or an empty `;`/`|` segment.
    #[error("empty command")]
    EmptyCommand,
    /// A redirection target that resolved to zero or several names.
    #[error("ambiguous redirect")]
    AmbiguousRedirect,
}

/// Everything that can stop the evaluation of a command.
///
/// Three outcomes matter to the evaluation engine: success (`Ok`), a
/// recoverable error (every variant but [`ShellError::Exit`]) and an exit
/// request, which is not a failure but asks the interpreter to terminate.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("shell: {0}")]
    Syntax(#[from] SyntaxError),

    /// A redirection file could not be opened.
    #[error("shell: {path}: {reason}")]
    Redirect { path: String, reason: String },

    #[error("shell: {0}: invalid application")]
    UnknownApplication(String),

    /// An error raised by a dispatched application.
    #[error("{app}: {message}")]
    Application { app: String, message: String },

    /// Reading or writing one of the evaluation streams failed.
    #[error("shell: {0}")]
    Io(#[from] io::Error),

    /// An application asked the interpreter to terminate with the given code.
    #[error("exit")]
    Exit(i32),
}

impl ShellError {
    pub fn is_exit(&self) -> bool {
        matches!(self, ShellError::Exit(_))
    }

    pub fn application(app: impl Into<String>, message: impl Into<String>) -> Self {
        ShellError::Application {
            app: app.into(),
            message: message.into(),
        }
    }

    pub(crate) fn redirect(path: &str, err: &io::Error) -> Self {
        ShellError::Redirect {
            path: path.to_string(),
            reason: describe_io_error(err),
        }
    }
}

/// Short, OS-independent wording for the file errors users commonly hit.
pub fn describe_io_error(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "No such file or directory".to_string(),
        io::ErrorKind::PermissionDenied => "Permission denied".to_string(),
        io::ErrorKind::IsADirectory => "Is a directory".to_string(),
        io::ErrorKind::NotADirectory => "Not a directory".to_string(),
        _ => err.to_string(),
    }
}
