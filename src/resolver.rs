//! Argument resolution: quote removal, command substitution and globbing.
//!
//! Every raw token of a call is scanned once, left to right. The scanner keeps
//! a stack of open quotes (`'`, `"` and `` ` ``) and splits the token into
//! segments; each finished segment is then expanded by the glob matcher.

use crate::env::Environment;
use crate::error::{ShellError, SyntaxError};
use crate::glob::GlobPattern;
use log::trace;

/// Capability to evaluate a full command line for command substitution.
///
/// The resolver does not own the evaluator; the [`Interpreter`](crate::Interpreter)
/// implements this trait and hands itself to the resolver.
pub trait Substitute {
    /// Evaluate `line` and return everything it wrote to its output.
    fn substitute(&self, line: &str, env: &mut Environment) -> Result<Vec<u8>, ShellError>;
}

/// Turns raw call tokens into the final argument list.
pub struct ArgumentResolver<'a> {
    substitute: &'a dyn Substitute,
}

impl<'a> ArgumentResolver<'a> {
    pub fn new(substitute: &'a dyn Substitute) -> Self {
        Self { substitute }
    }

    /// Resolve every raw token and concatenate the results in input order.
    pub fn parse_arguments(
        &self,
        raw_args: &[String],
        env: &mut Environment,
    ) -> Result<Vec<String>, ShellError> {
        let mut resolved = Vec::new();
        for raw in raw_args {
            resolved.extend(self.resolve_one(raw, env)?);
        }
        Ok(resolved)
    }

    /// Resolve a single raw token into zero or more arguments.
    pub fn resolve_one(&self, raw: &str, env: &mut Environment) -> Result<Vec<String>, ShellError> {
        let mut scan = Scan::default();
        for ch in raw.chars() {
            scan.feed(ch, self, env)?;
        }
        let segments = scan.finish()?;

        let resolved: Vec<String> = segments.iter().flat_map(|s| s.expand(env)).collect();
        trace!("resolved {:?} into {:?}", raw, resolved);
        Ok(resolved)
    }

    /// Run a substitution and normalise its output to a single line.
    fn run_substitution(&self, line: &str, env: &mut Environment) -> Result<String, ShellError> {
        let output = self.substitute.substitute(line, env)?;
        let text = String::from_utf8_lossy(&output);
        let text = text
            .trim_end_matches(['\n', '\r'])
            .replace("\r\n", " ")
            .replace(['\n', '\r'], " ");
        trace!("substitution {:?} produced {:?}", line, text);
        Ok(text)
    }
}

/// Scratch state for one token.
#[derive(Default)]
struct Scan {
    quotes: Vec<char>,
    current: GlobPattern,
    segments: Vec<GlobPattern>,
    /// One buffer per open back-quote, innermost last.
    substitutions: Vec<String>,
}

impl Scan {
    fn feed(
        &mut self,
        ch: char,
        resolver: &ArgumentResolver<'_>,
        env: &mut Environment,
    ) -> Result<(), ShellError> {
        let top = self.quotes.last().copied();
        match (ch, top) {
            ('`', Some('\'')) => self.push_char(ch),
            ('`', Some('`')) => self.close_substitution(resolver, env)?,
            ('`', _) => {
                self.quotes.push('`');
                self.substitutions.push(String::new());
            }
            ('\'' | '"', None) => {
                self.quotes.push(ch);
                self.current.mark_quoted();
            }
            ('\'' | '"', Some(open)) if open == ch => {
                self.quotes.pop();
                if self.substituting() {
                    self.push_char(ch);
                }
            }
            ('\'' | '"', Some('`')) => {
                self.quotes.push(ch);
                self.push_char(ch);
            }
            ('*', None) => self.current.push_wildcard(),
            _ => self.push_char(ch),
        }
        Ok(())
    }

    fn substituting(&self) -> bool {
        !self.substitutions.is_empty()
    }

    fn push_char(&mut self, ch: char) {
        match self.substitutions.last_mut() {
            Some(buffer) => buffer.push(ch),
            None => self.current.push_literal(ch),
        }
    }

    fn close_substitution(
        &mut self,
        resolver: &ArgumentResolver<'_>,
        env: &mut Environment,
    ) -> Result<(), ShellError> {
        self.quotes.pop();
        let line = self.substitutions.pop().unwrap_or_default();
        let output = resolver.run_substitution(&line, env)?;

        if let Some(outer) = self.substitutions.last_mut() {
            // Still inside an enclosing substitution: its text receives the output verbatim.
            outer.push_str(&output);
        } else if self.quotes.last() == Some(&'"') {
            self.current.push_str(&output);
        } else {
            for (i, word) in output.split_whitespace().enumerate() {
                if i > 0 {
                    self.finish_segment();
                }
                self.current.push_str(word);
            }
        }
        Ok(())
    }

    fn finish_segment(&mut self) {
        let segment = std::mem::take(&mut self.current);
        if segment.is_significant() {
            self.segments.push(segment);
        }
    }

    fn finish(mut self) -> Result<Vec<GlobPattern>, ShellError> {
        if self.quotes.contains(&'`') {
            return Err(SyntaxError::UnmatchedBackquote.into());
        }
        if !self.quotes.is_empty() {
            return Err(SyntaxError::UnmatchedQuote.into());
        }
        self.finish_segment();
        Ok(self.segments)
    }
}
