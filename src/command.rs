use crate::env::Environment;
use crate::error::{ShellError, SyntaxError};
use crate::interpreter::Interpreter;
use crate::redirect;
use crate::resolver::ArgumentResolver;
use log::debug;
use std::io::{Cursor, Read, Write};

/// A parsed command line, ready to be evaluated.
///
/// The tree is built once by [`parse_command`](crate::parser::parse_command)
/// and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Call(Call),
    Pipe(Pipe),
    Sequence(Sequence),
}

impl Command {
    /// Evaluates the command, reading from `input` and writing to `output`.
    ///
    /// The caller keeps ownership of both streams; only streams opened while
    /// evaluating (redirections, pipe buffers) are closed here.
    pub fn evaluate(
        &self,
        interpreter: &Interpreter,
        env: &mut Environment,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<(), ShellError> {
        match self {
            Command::Call(call) => call.evaluate(interpreter, env, input, output),
            Command::Pipe(pipe) => pipe.evaluate(interpreter, env, input, output),
            Command::Sequence(sequence) => sequence.evaluate(interpreter, env, input, output),
        }
    }
}

/// One application invocation: raw tokens, still quoted and unexpanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    args: Vec<String>,
}

impl Call {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    pub fn evaluate(
        &self,
        interpreter: &Interpreter,
        env: &mut Environment,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<(), ShellError> {
        if self.args.is_empty() {
            return Err(SyntaxError::EmptyCommand.into());
        }

        let resolver = ArgumentResolver::new(interpreter);
        let mut redirection = redirect::extract(&self.args, &resolver, env)?;
        let args = resolver.parse_arguments(&redirection.args, env)?;
        let Some((app, app_args)) = args.split_first() else {
            return Ok(());
        };

        let input: &mut dyn Read = match redirection.input.as_mut() {
            Some(file) => file,
            None => input,
        };
        let output: &mut dyn Write = match redirection.output.as_mut() {
            Some(file) => file,
            None => output,
        };
        interpreter
            .runner()
            .run_app(app, app_args, input, output, env)
        // Files opened by the redirection are closed when `redirection` drops.
    }
}

/// Calls chained by `|`; each stage reads what the previous one wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipe {
    calls: Vec<Call>,
}

impl Pipe {
    pub fn new(calls: Vec<Call>) -> Self {
        debug_assert!(!calls.is_empty());
        Self { calls }
    }

    /// Runs the stages one after another through in-memory buffers.
    ///
    /// The first failing stage stops the pipe; later stages never run.
    pub fn evaluate(
        &self,
        interpreter: &Interpreter,
        env: &mut Environment,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<(), ShellError> {
        let Some((last, stages)) = self.calls.split_last() else {
            return Err(SyntaxError::EmptyCommand.into());
        };

        let mut carried: Option<Vec<u8>> = None;
        for (i, call) in stages.iter().enumerate() {
            let mut buffer = Vec::new();
            let result = match carried.take() {
                Some(bytes) => call.evaluate(interpreter, env, &mut Cursor::new(bytes), &mut buffer),
                None => call.evaluate(interpreter, env, &mut *input, &mut buffer),
            };
            if let Err(err) = result {
                debug!("pipe stage {} failed, skipping the remaining stages", i);
                return Err(err);
            }
            carried = Some(buffer);
        }

        match carried {
            Some(bytes) => last.evaluate(interpreter, env, &mut Cursor::new(bytes), output),
            None => last.evaluate(interpreter, env, input, output),
        }
    }
}

/// Commands separated by `;`, run in order whatever their outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    commands: Vec<Command>,
}

impl Sequence {
    pub fn new(commands: Vec<Command>) -> Self {
        debug_assert!(!commands.is_empty());
        Self { commands }
    }

    /// Runs every child into its own buffer and appends the result to `output`.
    ///
    /// Only a child that completes contributes its output. A failing child
    /// contributes its error message instead, then the next child runs. An
    /// exit request is held back until every child has run.
    pub fn evaluate(
        &self,
        interpreter: &Interpreter,
        env: &mut Environment,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<(), ShellError> {
        let mut exit_request = None;

        for command in &self.commands {
            let mut buffer = Vec::new();
            match command.evaluate(interpreter, env, &mut *input, &mut buffer) {
                Ok(()) => output.write_all(&buffer)?,
                Err(err) if err.is_exit() => {
                    debug!("{:?} requested, finishing the sequence first", err);
                    if exit_request.is_none() {
                        exit_request = Some(err);
                    }
                }
                Err(err) => writeln!(output, "{}", err)?,
            }
        }

        match exit_request {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Application, ApplicationFactory, ApplicationRunner};
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::time::{SystemTime, UNIX_EPOCH};

    type Log = Rc<RefCell<Vec<String>>>;

    /// Test double standing in for real applications.
    ///
    /// - `say <words>` writes its words;
    /// - `upper` copies input to output in upper case;
    /// - `fail <msg>` raises an application error;
    /// - `spill <msg>` writes a line, then fails with `msg`;
    /// - `quit <code>` requests exit.
    ///
    /// Every dispatch is recorded in the shared log.
    struct Fake {
        name: String,
        args: Vec<String>,
        log: Log,
    }

    struct FakeFactory {
        log: Log,
    }

    impl ApplicationFactory for FakeFactory {
        fn try_create(
            &self,
            _env: &Environment,
            name: &str,
            args: &[&str],
        ) -> Option<Box<dyn Application>> {
            if !["say", "upper", "fail", "spill", "quit"].contains(&name) {
                return None;
            }
            Some(Box::new(Fake {
                name: name.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                log: self.log.clone(),
            }))
        }
    }

    impl Application for Fake {
        fn run(
            self: Box<Self>,
            input: &mut dyn Read,
            output: &mut dyn Write,
            _env: &mut Environment,
        ) -> Result<(), ShellError> {
            self.log.borrow_mut().push(self.name.clone());
            match self.name.as_str() {
                "say" => writeln!(output, "{}", self.args.join(" "))?,
                "upper" => {
                    let mut text = String::new();
                    input.read_to_string(&mut text)?;
                    output.write_all(text.to_uppercase().as_bytes())?;
                }
                "fail" => return Err(ShellError::application("fail", self.args.join(" "))),
                "spill" => {
                    writeln!(output, "partial")?;
                    return Err(ShellError::application("spill", self.args.join(" ")));
                }
                "quit" => return Err(ShellError::Exit(self.args[0].parse().unwrap())),
                _ => unreachable!(),
            }
            Ok(())
        }
    }

    fn interpreter() -> (Interpreter, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut runner = ApplicationRunner::new(Vec::new());
        runner.register(Box::new(FakeFactory { log: log.clone() }));
        (Interpreter::new(runner), log)
    }

    fn make_unique_temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "jsh_command_{}_{}_{}",
            tag,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn call(tokens: &[&str]) -> Call {
        Call::new(tokens.iter().map(|t| t.to_string()).collect())
    }

    fn run(command: &Command, interp: &Interpreter) -> (Result<(), ShellError>, String) {
        let mut env = Environment::with_dir("/nonexistent/for/sure");
        let mut out = Vec::new();
        let result = command.evaluate(interp, &mut env, &mut std::io::empty(), &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn empty_call_is_a_syntax_error() {
        let (interp, log) = interpreter();
        let (result, out) = run(&Command::Call(Call::new(Vec::new())), &interp);
        assert!(matches!(
            result,
            Err(ShellError::Syntax(SyntaxError::EmptyCommand))
        ));
        assert!(out.is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn call_dispatches_resolved_arguments() {
        let (interp, _) = interpreter();
        let (result, out) = run(&Command::Call(call(&["say", "'a  b'", "c"])), &interp);
        result.unwrap();
        assert_eq!(out, "a  b c\n");
    }

    #[test]
    fn unknown_application_is_a_shell_error() {
        let (interp, _) = interpreter();
        let (result, _) = run(&Command::Call(call(&["nope"])), &interp);
        assert_eq!(
            result.unwrap_err().to_string(),
            "shell: nope: invalid application"
        );
    }

    #[test]
    fn pipe_relays_output_to_next_stage() {
        let (interp, log) = interpreter();
        let pipe = Command::Pipe(Pipe::new(vec![call(&["say", "hello"]), call(&["upper"])]));
        let (result, out) = run(&pipe, &interp);
        result.unwrap();
        assert_eq!(out, "HELLO\n");
        assert_eq!(*log.borrow(), vec!["say", "upper"]);
    }

    #[test]
    fn pipe_stops_at_first_failure() {
        let (interp, log) = interpreter();
        let pipe = Command::Pipe(Pipe::new(vec![
            call(&["say", "x"]),
            call(&["fail", "first"]),
            call(&["fail", "second"]),
            call(&["upper"]),
        ]));
        let (result, out) = run(&pipe, &interp);
        assert_eq!(result.unwrap_err().to_string(), "fail: first");
        assert!(out.is_empty());
        assert_eq!(*log.borrow(), vec!["say", "fail"]);
    }

    #[test]
    fn sequence_reports_errors_and_continues() {
        let (interp, _) = interpreter();
        let sequence = Command::Sequence(Sequence::new(vec![
            Command::Call(call(&["fail", "oops"])),
            Command::Call(call(&["say", "hello"])),
        ]));
        let (result, out) = run(&sequence, &interp);
        result.unwrap();
        assert_eq!(out, "fail: oops\nhello\n");
    }

    #[test]
    fn sequence_defers_exit_until_all_children_ran() {
        let (interp, log) = interpreter();
        let sequence = Command::Sequence(Sequence::new(vec![
            Command::Call(call(&["quit", "7"])),
            Command::Call(call(&["say", "still", "here"])),
            Command::Call(call(&["quit", "9"])),
        ]));
        let (result, out) = run(&sequence, &interp);
        assert!(matches!(result, Err(ShellError::Exit(7))));
        assert_eq!(out, "still here\n");
        assert_eq!(*log.borrow(), vec!["quit", "say", "quit"]);
    }

    #[test]
    fn nested_pipe_inside_sequence() {
        let (interp, _) = interpreter();
        let sequence = Command::Sequence(Sequence::new(vec![
            Command::Pipe(Pipe::new(vec![call(&["say", "a"]), call(&["upper"])])),
            Command::Call(call(&["say", "b"])),
        ]));
        let (result, out) = run(&sequence, &interp);
        result.unwrap();
        assert_eq!(out, "A\nb\n");
    }

    #[test]
    fn sequence_drops_output_of_a_failed_child() {
        let (interp, _) = interpreter();
        let sequence = Command::Sequence(Sequence::new(vec![
            Command::Call(call(&["spill", "broken"])),
            Command::Call(call(&["say", "hello"])),
        ]));
        let (result, out) = run(&sequence, &interp);
        result.unwrap();
        assert_eq!(out, "spill: broken\nhello\n");
    }

    #[test]
    fn call_resolving_to_no_arguments_dispatches_nothing() {
        let (interp, log) = interpreter();
        let (result, out) = run(&Command::Call(call(&["`upper`"])), &interp);
        result.unwrap();
        assert!(out.is_empty());
        // Only the substitution itself ran.
        assert_eq!(*log.borrow(), vec!["upper"]);
    }

    #[test]
    fn redirection_alone_creates_the_file_and_dispatches_nothing() {
        let dir = make_unique_temp_dir("redirect_only");
        let (interp, log) = interpreter();
        let mut env = Environment::with_dir(&dir);
        let mut out = Vec::new();

        Command::Call(call(&[">", "f.txt", "`upper`"]))
            .evaluate(&interp, &mut env, &mut std::io::empty(), &mut out)
            .unwrap();

        assert!(out.is_empty());
        assert_eq!(fs::read_to_string(dir.join("f.txt")).unwrap(), "");
        assert_eq!(*log.borrow(), vec!["upper"]);
        let _ = fs::remove_dir_all(dir);
    }
}
