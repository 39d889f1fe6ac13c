//! A small line-oriented shell interpreter.
//!
//! A line is split into a [`Command`] tree (sequences of pipes of calls),
//! each call's arguments are resolved (quotes removed, `*` globbed, back-quoted
//! command lines substituted by their output) and `<file` / `>file` / `>>file`
//! redirections are applied before the named application runs.
//!
//! The main entry point is [`Interpreter`], which evaluates a line against an
//! [`Environment`] and a pair of byte streams. Applications are pluggable through
//! [`app::ApplicationFactory`]; the default interpreter knows a handful of builtins
//! (`pwd`, `cd`, `ls`, `echo`, `cat`, `head`, `tail`, `wc`, `grep`, `sort`, `exit`).

pub mod app;
mod builtin;
pub mod command;
pub mod env;
pub mod error;
pub mod glob;
mod interpreter;
pub mod parser;
pub mod redirect;
pub mod resolver;

/// Just a convenient re-export of the command line interpreter.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;

pub use command::Command;
pub use env::Environment;
pub use error::{ShellError, SyntaxError};
pub use parser::parse_command;
