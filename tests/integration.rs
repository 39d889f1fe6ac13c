use jsh::{Environment, Interpreter, ShellError, SyntaxError};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn make_unique_temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "jsh_it_{}_{}_{}",
        tag,
        std::process::id(),
        nanos
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run(env: &mut Environment, line: &str) -> (Result<(), ShellError>, String) {
    let mut out = Vec::new();
    let result = Interpreter::default().eval(line, env, &mut io::empty(), &mut out);
    (result, String::from_utf8(out).unwrap())
}

fn run_ok(env: &mut Environment, line: &str) -> String {
    let (result, out) = run(env, line);
    result.unwrap_or_else(|err| panic!("{:?} failed: {}", line, err));
    out
}

#[test]
fn echo_through_a_pipe() {
    let mut env = Environment::with_dir("/");
    assert_eq!(run_ok(&mut env, "echo hello | cat"), "hello\n");
    assert_eq!(run_ok(&mut env, "echo foo bar | grep foo | wc -w"), "2\n");
}

#[test]
fn quotes_are_removed_and_joined() {
    let mut env = Environment::with_dir("/");
    assert_eq!(
        run_ok(&mut env, r#"echo "a  b" 'c'd "x;y|z""#),
        "a  b cd x;y|z\n"
    );
    assert_eq!(run_ok(&mut env, r#"echo '"`not run`"'"#), "\"`not run`\"\n");
}

#[test]
fn back_quotes_are_substituted() {
    let mut env = Environment::with_dir("/");
    assert_eq!(run_ok(&mut env, "echo `echo a b`x"), "a bx\n");
    assert_eq!(run_ok(&mut env, r#"echo "`echo 'a   b'`""#), "a   b\n");
    assert_eq!(run_ok(&mut env, r#"echo `echo 'a   b'`"#), "a b\n");
    assert_eq!(run_ok(&mut env, "`echo echo` nested"), "nested\n");
}

#[test]
fn malformed_redirect_does_not_stop_the_sequence() {
    let mut env = Environment::with_dir("/");
    assert_eq!(
        run_ok(&mut env, "cat <missing>; echo hello"),
        "shell: Invalid syntax\nhello\n"
    );
}

#[test]
fn failing_application_in_sequence_is_reported_inline() {
    let dir = make_unique_temp_dir("seq_error");
    let mut env = Environment::with_dir(&dir);
    assert_eq!(
        run_ok(&mut env, "cat nothing.txt; echo after"),
        "cat: nothing.txt: No such file or directory\nafter\n"
    );
    assert_eq!(
        run_ok(&mut env, "nosuchapp; echo after"),
        "shell: nosuchapp: invalid application\nafter\n"
    );
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn globbing_in_the_current_directory() {
    let dir = make_unique_temp_dir("glob");
    for name in ["b.txt", "a.txt", "c.md"] {
        fs::write(dir.join(name), "").unwrap();
    }
    let mut env = Environment::with_dir(&dir);

    assert_eq!(run_ok(&mut env, "echo *.txt"), "a.txt b.txt\n");
    assert_eq!(run_ok(&mut env, "echo '*.txt'"), "*.txt\n");
    assert_eq!(run_ok(&mut env, "echo *.rs"), "*.rs\n");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn output_redirection_writes_and_appends() {
    let dir = make_unique_temp_dir("redirect");
    let mut env = Environment::with_dir(&dir);

    assert_eq!(run_ok(&mut env, "echo hi > out.txt"), "");
    assert_eq!(run_ok(&mut env, "echo more >>out.txt; cat <out.txt"), "hi\nmore\n");
    assert_eq!(
        fs::read_to_string(dir.join("out.txt")).unwrap(),
        "hi\nmore\n"
    );

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn ambiguous_redirect_is_rejected() {
    let dir = make_unique_temp_dir("ambiguous");
    fs::write(dir.join("p1"), "").unwrap();
    fs::write(dir.join("p2"), "").unwrap();
    let mut env = Environment::with_dir(&dir);

    let (result, out) = run(&mut env, "echo x > p*");
    let err = result.unwrap_err();
    assert!(matches!(
        err,
        ShellError::Syntax(SyntaxError::AmbiguousRedirect)
    ));
    assert_eq!(err.to_string(), "shell: ambiguous redirect");
    assert!(out.is_empty());

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn exit_finishes_the_sequence_first() {
    let mut env = Environment::with_dir("/");
    let (result, out) = run(&mut env, "echo a; exit 3; echo b");
    assert!(matches!(result, Err(ShellError::Exit(3))));
    assert_eq!(out, "a\nb\n");
}

#[test]
fn syntax_errors_are_reported_before_anything_runs() {
    let dir = make_unique_temp_dir("syntax");
    let mut env = Environment::with_dir(&dir);

    let (result, out) = run(&mut env, "echo a > made.txt; echo 'oops");
    assert!(matches!(
        result,
        Err(ShellError::Syntax(SyntaxError::UnmatchedQuote))
    ));
    assert!(out.is_empty());
    assert!(!dir.join("made.txt").exists());

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn redirection_operators_glued_to_words() {
    let dir = make_unique_temp_dir("glued");
    fs::write(dir.join("in.txt"), "b\na\nc\n").unwrap();
    let mut env = Environment::with_dir(&dir);

    assert_eq!(run_ok(&mut env, "sort <in.txt>out.txt"), "");
    assert_eq!(
        fs::read_to_string(dir.join("out.txt")).unwrap(),
        "a\nb\nc\n"
    );

    assert_eq!(run_ok(&mut env, "echo hi>hi.txt"), "");
    assert_eq!(fs::read_to_string(dir.join("hi.txt")).unwrap(), "hi\n");

    assert_eq!(run_ok(&mut env, "echo 'hi>there'"), "hi>there\n");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn failed_child_contributes_only_its_error() {
    let dir = make_unique_temp_dir("partial");
    fs::write(dir.join("a.txt"), "AAA\n").unwrap();
    let mut env = Environment::with_dir(&dir);

    assert_eq!(
        run_ok(&mut env, "cat a.txt missing; echo hello"),
        "cat: missing: No such file or directory\nhello\n"
    );

    let _ = fs::remove_dir_all(dir);
}
