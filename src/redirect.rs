//! Extraction of `<file`, `>file` and `>>file` from a call's raw tokens.

use crate::env::Environment;
use crate::error::{ShellError, SyntaxError};
use crate::resolver::ArgumentResolver;
use log::debug;
use std::fs::{File, OpenOptions};

/// What is left of a call once its redirections have been taken out.
#[derive(Debug, Default)]
pub struct Redirection {
    /// Raw tokens that are not part of a redirection, in their original order.
    pub args: Vec<String>,
    /// Replacement input, if the call redirects it.
    pub input: Option<File>,
    /// Replacement output, if the call redirects it.
    pub output: Option<File>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Truncate,
    Append,
}

/// Recognise a raw token that is a redirection operator.
///
/// The tokenizer emits unquoted operators as tokens of their own, so a quoted
/// `'>'` never matches here.
fn operator(token: &str) -> Option<Direction> {
    match token {
        "<" => Some(Direction::Input),
        ">" => Some(Direction::Truncate),
        ">>" => Some(Direction::Append),
        _ => None,
    }
}

/// Take every redirection out of `tokens` and open the files they name.
///
/// Each operator must be followed by a file token, which goes through the
/// resolver and must come out as exactly one name. Every operator is checked
/// before any file is opened. A later redirection of the same direction
/// replaces (and closes) the earlier one.
pub fn extract(
    tokens: &[String],
    resolver: &ArgumentResolver<'_>,
    env: &mut Environment,
) -> Result<Redirection, ShellError> {
    let mut redirection = Redirection::default();
    let mut targets = Vec::new();
    let mut tokens = tokens.iter();

    while let Some(token) = tokens.next() {
        let Some(direction) = operator(token) else {
            redirection.args.push(token.clone());
            continue;
        };
        match tokens.next() {
            Some(target) if operator(target).is_none() => targets.push((direction, target)),
            _ => return Err(SyntaxError::Invalid.into()),
        }
    }

    for (direction, target) in targets {
        let path = resolve_target(target, resolver, env)?;
        match direction {
            Direction::Input => redirection.input = Some(open_input(&path, env)?),
            Direction::Truncate | Direction::Append => {
                redirection.output = Some(open_output(&path, direction == Direction::Append, env)?)
            }
        }
    }
    Ok(redirection)
}

fn resolve_target(
    target: &str,
    resolver: &ArgumentResolver<'_>,
    env: &mut Environment,
) -> Result<String, ShellError> {
    let mut names = resolver.resolve_one(target, env)?;
    match names.pop() {
        Some(name) if names.is_empty() => Ok(name),
        _ => Err(SyntaxError::AmbiguousRedirect.into()),
    }
}

fn open_input(name: &str, env: &Environment) -> Result<File, ShellError> {
    let path = env.resolve(name);
    if path.is_dir() {
        return Err(ShellError::Redirect {
            path: name.to_string(),
            reason: "Is a directory".to_string(),
        });
    }
    debug!("redirecting input from {}", path.display());
    File::open(&path).map_err(|err| ShellError::redirect(name, &err))
}

fn open_output(name: &str, append: bool, env: &Environment) -> Result<File, ShellError> {
    let path = env.resolve(name);
    debug!("redirecting output to {} (append: {})", path.display(), append);
    OpenOptions::new()
        .create(true)
        .write(!append)
        .truncate(!append)
        .append(append)
        .open(&path)
        .map_err(|err| ShellError::redirect(name, &err))
}
