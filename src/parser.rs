//! Command builder: turns a raw line into a [`Command`] tree.
//!
//! The line is split on unquoted `;` into sequence parts, each part on
//! unquoted `|` into pipe stages and each stage on unquoted whitespace and
//! redirection operators into raw tokens. Tokens keep their quotes; removing
//! them is the resolver's job.

use crate::command::{Call, Command, Pipe, Sequence};
use crate::error::{ShellError, SyntaxError};
use log::debug;

/// Tracks open quotes the same way the argument resolver does.
///
/// - inside `'...'` nothing is special until the closing `'`;
/// - inside `"..."` only `` ` `` opens a substitution;
/// - inside `` `...` `` quotes nest, so `` `echo "a;b"` `` is one unit.
#[derive(Debug, Default)]
pub(crate) struct QuoteStack {
    open: Vec<char>,
}

impl QuoteStack {
    /// Feed one character; returns `true` when it stands outside every quote
    /// and is not itself a quote character.
    pub(crate) fn feed(&mut self, ch: char) -> bool {
        let top = self.open.last().copied();
        match (ch, top) {
            ('\'', Some('\'')) | ('"', Some('"')) | ('`', Some('`')) => {
                self.open.pop();
            }
            (_, Some('\'')) => {}
            ('`', _) | ('\'' | '"', None | Some('`')) => self.open.push(ch),
            _ => {}
        }
        top.is_none() && !matches!(ch, '\'' | '"' | '`')
    }

    pub(crate) fn is_open(&self) -> bool {
        !self.open.is_empty()
    }

    pub(crate) fn check_closed(&self) -> Result<(), SyntaxError> {
        if self.open.contains(&'`') {
            Err(SyntaxError::UnmatchedBackquote)
        } else if self.is_open() {
            Err(SyntaxError::UnmatchedQuote)
        } else {
            Ok(())
        }
    }
}

/// Split `text` at every unquoted character matching `is_separator`.
///
/// Separators are dropped; everything else, quotes included, is kept.
fn split_unquoted(
    text: &str,
    is_separator: impl Fn(char) -> bool,
) -> Result<Vec<String>, SyntaxError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quotes = QuoteStack::default();

    for ch in text.chars() {
        if quotes.is_open() && (ch == '\n' || ch == '\r') {
            return Err(SyntaxError::QuotedLineBreak);
        }
        if quotes.feed(ch) && is_separator(ch) {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    quotes.check_closed()?;
    parts.push(current);
    Ok(parts)
}

/// Split one pipe stage into raw tokens.
///
/// Unquoted whitespace separates tokens. Every unquoted `<`, `>` or `>>` is
/// a token of its own, wherever it appears: `a>b` gives `a`, `>`, `b`.
pub fn tokenize(stage: &str) -> Result<Vec<String>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quotes = QuoteStack::default();
    let mut chars = stage.chars().peekable();

    while let Some(ch) = chars.next() {
        if quotes.is_open() && (ch == '\n' || ch == '\r') {
            return Err(SyntaxError::QuotedLineBreak);
        }
        if !quotes.feed(ch) {
            current.push(ch);
            continue;
        }
        match ch {
            c if c.is_whitespace() => flush_token(&mut tokens, &mut current),
            '<' => {
                flush_token(&mut tokens, &mut current);
                tokens.push("<".to_string());
            }
            '>' => {
                flush_token(&mut tokens, &mut current);
                if chars.next_if_eq(&'>').is_some() {
                    tokens.push(">>".to_string());
                } else {
                    tokens.push(">".to_string());
                }
            }
            _ => current.push(ch),
        }
    }
    quotes.check_closed()?;
    flush_token(&mut tokens, &mut current);
    Ok(tokens)
}

fn flush_token(tokens: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

/// Parse a whole line into a command tree.
///
/// A part without `|` becomes a bare [`Command::Call`]; a line without `;`
/// is not wrapped into a [`Command::Sequence`].
pub fn parse_command(line: &str) -> Result<Command, ShellError> {
    let mut commands = split_unquoted(line, |c| c == ';')?
        .iter()
        .map(|part| parse_pipe(part))
        .collect::<Result<Vec<_>, _>>()?;

    let command = if commands.len() == 1 {
        commands.remove(0)
    } else {
        Command::Sequence(Sequence::new(commands))
    };
    debug!("parsed {:?} into {:?}", line, command);
    Ok(command)
}

fn parse_pipe(part: &str) -> Result<Command, SyntaxError> {
    let mut calls = Vec::new();
    for stage in split_unquoted(part, |c| c == '|')? {
        let tokens = tokenize(&stage)?;
        if tokens.is_empty() {
            return Err(SyntaxError::EmptyCommand);
        }
        calls.push(Call::new(tokens));
    }

    if calls.len() == 1 {
        Ok(Command::Call(calls.remove(0)))
    } else {
        Ok(Command::Pipe(Pipe::new(calls)))
    }
}
