use crate::app::ApplicationRunner;
use crate::env::Environment;
use crate::error::ShellError;
use crate::parser;
use crate::resolver::Substitute;
use log::{debug, warn};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Read, Write};

/// A minimal shell-like interpreter that parses and evaluates command lines.
///
/// The interpreter owns an [`ApplicationRunner`] that is queried to create
/// applications by name. See [`Default`] for the builtins included out of the box.
///
/// Example
/// ```
/// use jsh::{Environment, Interpreter};
/// let sh = Interpreter::default();
/// let mut env = Environment::new();
/// let mut out = Vec::new();
/// sh.eval("echo hello | cat", &mut env, &mut std::io::empty(), &mut out).unwrap();
/// assert_eq!(out, b"hello\n");
/// ```
pub struct Interpreter {
    runner: ApplicationRunner,
}

impl Interpreter {
    /// Create an interpreter dispatching to a custom set of applications.
    pub fn new(runner: ApplicationRunner) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &ApplicationRunner {
        &self.runner
    }

    /// Parse `line` and evaluate it against the given streams.
    pub fn eval(
        &self,
        line: &str,
        env: &mut Environment,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<(), ShellError> {
        let command = parser::parse_command(line)?;
        command.evaluate(self, env, input, output)
    }

    /// Interactive Read-Eval-Print Loop.
    ///
    /// Returns the status requested by `exit`, or 0 on end of input.
    pub fn repl(&self, env: &mut Environment) -> anyhow::Result<i32> {
        let mut rl = DefaultEditor::new()?;

        loop {
            let prompt = format!("{}> ", env.current_dir.display());
            match rl.readline(&prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line.as_str())?;

                    let mut stdout = io::stdout();
                    let result = self.eval(&line, env, &mut io::stdin().lock(), &mut stdout);
                    stdout.flush()?;
                    match result {
                        Ok(()) => {}
                        Err(ShellError::Exit(code)) => return Ok(code),
                        Err(err) => eprintln!("{}", err),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    debug!("interrupted, dropping the line");
                    continue;
                }
                Err(ReadlineError::Eof) => return Ok(0),
                Err(err) => {
                    warn!("readline failed: {}", err);
                    return Err(err.into());
                }
            }
        }
    }
}

impl Substitute for Interpreter {
    /// Evaluate `line` in a nested run with empty input and capture its output.
    fn substitute(&self, line: &str, env: &mut Environment) -> Result<Vec<u8>, ShellError> {
        debug!("substituting {:?}", line);
        let mut captured = Vec::new();
        self.eval(line, env, &mut io::empty(), &mut captured)?;
        Ok(captured)
    }
}

impl Default for Interpreter {
    /// An interpreter with every builtin registered.
    fn default() -> Self {
        Self::new(ApplicationRunner::default())
    }
}
