use crate::app::{Application, ApplicationFactory, Factory};
use crate::env::Environment;
use crate::error::{ShellError, describe_io_error};
use anyhow::{Context, Result, anyhow, bail};
use argh::{EarlyExit, FromArgs};
use regex::RegexBuilder;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;

/// Built-in applications known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process. Errors are plain `anyhow` errors without the application name;
/// the blanket [`Application`] impl adds it.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command using provided IO streams and environment.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<()>;
}

impl<T: BuiltinCommand> Application for T {
    fn run(
        self: Box<Self>,
        input: &mut dyn Read,
        output: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), ShellError> {
        T::execute(*self, input, output, env).map_err(|err| match err.downcast::<ShellError>() {
            Ok(shell_error) => shell_error,
            Err(other) => ShellError::application(T::name(), format!("{other:#}")),
        })
    }
}

/// Outcome of `--help` or of arguments argh refused.
struct InvalidArgs {
    name: &'static str,
    output: String,
    is_error: bool,
}

impl Application for InvalidArgs {
    fn run(
        self: Box<Self>,
        _input: &mut dyn Read,
        output: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<(), ShellError> {
        if self.is_error {
            return Err(ShellError::application(self.name, self.output.trim_end()));
        }
        output.write_all(self.output.as_bytes())?;
        Ok(())
    }
}

impl<T: BuiltinCommand + 'static> ApplicationFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn Application>> {
        if name != T::name() {
            return None;
        }
        Some(match T::from_args(&[name], args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                name: T::name(),
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

/// Open `name` relative to the shell's current directory.
fn open_file(env: &Environment, name: &str) -> Result<fs::File> {
    let path = env.resolve(name);
    if path.is_dir() {
        bail!("{}: Is a directory", name);
    }
    fs::File::open(&path).map_err(|e| anyhow!("{}: {}", name, describe_io_error(&e)))
}

/// Read the whole of `file`, or of stdin when no file is given.
fn read_source(env: &Environment, file: Option<&str>, stdin: &mut dyn Read) -> Result<String> {
    let mut text = String::new();
    match file {
        Some(name) => {
            open_file(env, name)?
                .read_to_string(&mut text)
                .with_context(|| format!("{}: cannot read", name))?;
        }
        None => {
            stdin
                .read_to_string(&mut text)
                .context("cannot read standard input")?;
        }
    }
    Ok(text)
}

#[derive(FromArgs)]
/// print the current working directory.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<()> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// change the current working directory.
/// if no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<()> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => match env.get_var("HOME") {
                Some(home) => PathBuf::from(home),
                None => bail!("no target and HOME not set"),
            },
        };

        let new_dir = env.resolve(&target);
        if !new_dir.is_dir() {
            bail!("{}: No such directory", target.display());
        }
        env.current_dir = fs::canonicalize(&new_dir)
            .with_context(|| format!("can't canonicalize {}", target.display()))?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// list the entries of a directory, one per line, sorted by name.
pub struct Ls {
    #[argh(switch, short = 'a')]
    /// include entries whose name starts with a dot.
    pub all: bool,

    #[argh(positional)]
    /// directory to list; defaults to the current directory.
    pub dir: Option<String>,
}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<()> {
        let shown = self.dir.as_deref().unwrap_or(".");
        let entries = fs::read_dir(env.resolve(shown))
            .map_err(|e| anyhow!("{}: {}", shown, describe_io_error(&e)))?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| self.all || !name.starts_with('.'))
            .collect();
        names.sort();
        for name in names {
            writeln!(stdout, "{}", name)?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// write the arguments to standard output, separated by spaces.
/// by default, a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<()> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// concatenate files (or standard input) to standard output.
pub struct Cat {
    #[argh(positional, greedy)]
    /// files to print; standard input when empty.
    pub files: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<()> {
        if self.files.is_empty() {
            std::io::copy(stdin, stdout)?;
            return Ok(());
        }
        for fname in &self.files {
            let mut f = open_file(env, fname)?;
            std::io::copy(&mut f, stdout)?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// print the first lines of a file (or standard input).
pub struct Head {
    #[argh(option, short = 'n', default = "10")]
    /// number of lines to print.
    pub lines: usize,

    #[argh(positional)]
    /// file to read; standard input when omitted.
    pub file: Option<String>,
}

impl BuiltinCommand for Head {
    fn name() -> &'static str {
        "head"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<()> {
        let text = read_source(env, self.file.as_deref(), stdin)?;
        for line in text.lines().take(self.lines) {
            writeln!(stdout, "{}", line)?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// print the last lines of a file (or standard input).
pub struct Tail {
    #[argh(option, short = 'n', default = "10")]
    /// number of lines to print.
    pub lines: usize,

    #[argh(positional)]
    /// file to read; standard input when omitted.
    pub file: Option<String>,
}

impl BuiltinCommand for Tail {
    fn name() -> &'static str {
        "tail"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<()> {
        let text = read_source(env, self.file.as_deref(), stdin)?;
        let lines: Vec<&str> = text.lines().collect();
        let skip = lines.len().saturating_sub(self.lines);
        for line in &lines[skip..] {
            writeln!(stdout, "{}", line)?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// count lines, words and bytes.
pub struct WC {
    #[argh(switch, short = 'l')]
    /// print only the line count.
    pub lines: bool,

    #[argh(switch, short = 'w')]
    /// print only the word count.
    pub words: bool,

    #[argh(switch, short = 'c')]
    /// print only the byte count.
    pub bytes: bool,

    #[argh(positional, greedy)]
    /// files to count; standard input when empty.
    pub files: Vec<String>,
}

impl WC {
    fn report(&self, text: &str, label: Option<&str>, stdout: &mut dyn Write) -> Result<()> {
        let counts = [
            (self.lines, text.lines().count()),
            (self.words, text.split_whitespace().count()),
            (self.bytes, text.len()),
        ];
        let any_selected = counts.iter().any(|(selected, _)| *selected);
        let mut fields: Vec<String> = counts
            .iter()
            .filter(|(selected, _)| *selected || !any_selected)
            .map(|(_, count)| count.to_string())
            .collect();
        if let Some(label) = label {
            fields.push(label.to_string());
        }
        writeln!(stdout, "{}", fields.join(" "))?;
        Ok(())
    }
}

impl BuiltinCommand for WC {
    fn name() -> &'static str {
        "wc"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<()> {
        if self.files.is_empty() {
            let text = read_source(env, None, stdin)?;
            return self.report(&text, None, stdout);
        }
        for fname in &self.files {
            let text = read_source(env, Some(fname), stdin)?;
            self.report(&text, Some(fname), stdout)?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// print lines matching a pattern.
pub struct Grep {
    #[argh(positional)]
    /// the pattern to search for (a regular expression).
    pub pattern: String,

    #[argh(positional, greedy)]
    /// files to search. If none provided, reads from stdin.
    pub files: Vec<String>,

    #[argh(switch, short = 'w')]
    /// match only whole words.
    pub word_regexp: bool,

    #[argh(switch, short = 'i')]
    /// ignore case distinctions.
    pub ignore_case: bool,

    #[argh(option, short = 'A', default = "0")]
    /// print NUM lines of trailing context after matching lines.
    pub after_context: usize,
}

impl Grep {
    fn process_source(
        &self,
        reader: &mut dyn Read,
        stdout: &mut dyn Write,
        file_name: Option<&str>,
        re: &regex::Regex,
    ) -> Result<()> {
        let lines = BufReader::new(reader)
            .lines()
            .collect::<std::io::Result<Vec<String>>>()
            .context("read error")?;

        let prefix = file_name
            .map(|name| format!("{}:", name))
            .unwrap_or_default();
        // Index one past the last line of the current context window.
        let mut shown_until = 0;
        let mut last_printed: Option<usize> = None;

        for (i, line) in lines.iter().enumerate() {
            if re.is_match(line) {
                shown_until = i + self.after_context + 1;
            }
            if i >= shown_until {
                continue;
            }
            if self.after_context > 0 && last_printed.is_some_and(|last| i > last + 1) {
                writeln!(stdout, "--")?;
            }
            writeln!(stdout, "{}{}", prefix, line)?;
            last_printed = Some(i);
        }
        Ok(())
    }
}

impl BuiltinCommand for Grep {
    fn name() -> &'static str {
        "grep"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<()> {
        let pattern = if self.word_regexp {
            format!(r"\b({})\b", self.pattern)
        } else {
            self.pattern.clone()
        };

        let re = RegexBuilder::new(&pattern)
            .case_insensitive(self.ignore_case)
            .build()
            .with_context(|| format!("invalid pattern: {}", self.pattern))?;

        if self.files.is_empty() {
            return self.process_source(stdin, stdout, None, &re);
        }
        let label = self.files.len() > 1;
        for file_name in &self.files {
            let mut f = open_file(env, file_name)?;
            self.process_source(&mut f, stdout, label.then_some(file_name.as_str()), &re)?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// sort lines of a file (or standard input).
pub struct Sort {
    #[argh(switch, short = 'r')]
    /// reverse the order.
    pub reverse: bool,

    #[argh(positional)]
    /// file to sort; standard input when omitted.
    pub file: Option<String>,
}

impl BuiltinCommand for Sort {
    fn name() -> &'static str {
        "sort"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<()> {
        let text = read_source(env, self.file.as_deref(), stdin)?;
        let mut lines: Vec<&str> = text.lines().collect();
        lines.sort_unstable();
        if self.reverse {
            lines.reverse();
        }
        for line in lines {
            writeln!(stdout, "{}", line)?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// ask the shell to terminate.
pub struct Exit {
    #[argh(positional, default = "0")]
    /// exit status, 0 when omitted.
    pub code: i32,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<()> {
        Err(ShellError::Exit(self.code).into())
    }
}
