//! Filename expansion for unquoted `*`.

use crate::env::Environment;
use log::{trace, warn};
use regex::Regex;
use std::fs;

/// One argument segment as it is built by the resolver.
///
/// Holds the plain text, the equivalent regular expression (literal
/// characters escaped, every wildcard turned into `[^/]*`) and whether a
/// wildcard was seen at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobPattern {
    plain: String,
    regex: String,
    has_wildcard: bool,
    quoted: bool,
}

impl GlobPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_literal(&mut self, ch: char) {
        self.plain.push(ch);
        let mut buf = [0u8; 4];
        self.regex.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
    }

    pub fn push_str(&mut self, text: &str) {
        self.plain.push_str(text);
        self.regex.push_str(&regex::escape(text));
    }

    pub fn push_wildcard(&mut self) {
        self.plain.push('*');
        self.regex.push_str("[^/]*");
        self.has_wildcard = true;
    }

    /// Record that part of this segment came from a quoted region.
    ///
    /// A quoted segment is emitted even when it is empty.
    pub fn mark_quoted(&mut self) {
        self.quoted = true;
    }

    /// Whether the segment must produce an argument.
    pub fn is_significant(&self) -> bool {
        self.quoted || !self.plain.is_empty()
    }

    /// Expand the pattern against the entries of its parent directory.
    ///
    /// Without a wildcard, or when nothing matches, the plain text is
    /// returned unchanged as the only element.
    pub fn expand(&self, env: &Environment) -> Vec<String> {
        if !self.has_wildcard {
            return vec![self.plain.clone()];
        }
        let mut matches = self.matching_entries(env);
        if matches.is_empty() {
            trace!("glob {:?} matched nothing", self.plain);
            return vec![self.plain.clone()];
        }
        matches.sort();
        trace!("glob {:?} expanded to {:?}", self.plain, matches);
        matches
    }

    fn matching_entries(&self, env: &Environment) -> Vec<String> {
        let Ok(re) = Regex::new(&format!("^{}$", self.regex)) else {
            warn!("glob {:?} produced an invalid expression", self.plain);
            return Vec::new();
        };

        // Everything up to the last separator names the directory to list.
        let (prefix, dir) = match self.plain.rfind('/') {
            Some(0) => ("/", "/"),
            Some(idx) => (&self.plain[..=idx], &self.plain[..idx]),
            None => ("", "."),
        };

        let entries = match fs::read_dir(env.resolve(dir)) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                trace!("glob directory {:?} does not exist", dir);
                return Vec::new();
            }
            Err(err) => {
                warn!("glob cannot list {:?}: {}", dir, err);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| format!("{prefix}{}", entry.file_name().to_string_lossy()))
            .filter(|candidate| re.is_match(candidate))
            .collect()
    }
}
