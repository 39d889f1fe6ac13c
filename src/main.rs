use argh::FromArgs;
use jsh::{Environment, Interpreter, ShellError};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::io::{self, Write};

#[derive(FromArgs)]
/// a small line-oriented shell.
struct Args {
    #[argh(option, short = 'c')]
    /// evaluate this line and exit instead of starting the interactive loop.
    command: Option<String>,

    #[argh(option, default = "LevelFilter::Warn")]
    /// diagnostics verbosity on stderr: off, error, warn, info, debug or trace.
    log_level: LevelFilter,
}

fn run_once(sh: &Interpreter, line: &str, env: &mut Environment) -> anyhow::Result<i32> {
    let mut stdout = io::stdout();
    let result = sh.eval(line, env, &mut io::stdin().lock(), &mut stdout);
    stdout.flush()?;
    Ok(match result {
        Ok(()) => 0,
        Err(ShellError::Exit(code)) => code,
        Err(err) => {
            eprintln!("{}", err);
            1
        }
    })
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    TermLogger::init(
        args.log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let sh = Interpreter::default();
    let mut env = Environment::new();
    let code = match args.command {
        Some(line) => run_once(&sh, &line, &mut env)?,
        None => sh.repl(&mut env)?,
    };
    std::process::exit(code);
}
