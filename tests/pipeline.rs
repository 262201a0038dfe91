use proptest::prelude::*;
use shell_pipeline::{Command, Environment, Halt, Interpreter, ShellError, parse_command};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::tempdir;

fn shell_in(dir: &Path) -> Interpreter {
    Interpreter::default().with_env(Environment::with_current_dir(dir))
}

fn run(dir: &Path, line: &str) -> (Result<(), Halt>, String) {
    let mut sh = shell_in(dir);
    let mut out = Vec::new();
    let result = sh.evaluate(line, &mut io::empty(), &mut out);
    (result, String::from_utf8(out).unwrap())
}

fn output(dir: &Path, line: &str) -> String {
    let (result, out) = run(dir, line);
    assert!(result.is_ok(), "{line:?} failed: {:?}", result);
    out
}

#[test]
fn pipe_feeds_previous_output() {
    let dir = tempdir().unwrap();
    assert_eq!(output(dir.path(), "echo abc | cat"), "abc\n");
    assert_eq!(output(dir.path(), "echo b; echo a | sort"), "b\na\n");
    assert_eq!(
        output(dir.path(), "cat `echo missing` | wc ; echo after"),
        "cat: missing: No such file or directory (os error 2)\nafter\n"
    );
}

#[test]
fn output_and_input_redirection() {
    let dir = tempdir().unwrap();
    assert_eq!(output(dir.path(), "echo hello > out.txt"), "");
    assert_eq!(
        fs::read_to_string(dir.path().join("out.txt")).unwrap(),
        "hello\n"
    );
    assert_eq!(output(dir.path(), "wc -c < out.txt"), "6\n");
    assert_eq!(output(dir.path(), "<out.txt cat"), "hello\n");
}

#[test]
fn redirection_errors() {
    let dir = tempdir().unwrap();
    let (result, _) = run(dir.path(), "cat < nope.txt");
    assert_eq!(
        result.unwrap_err().to_string(),
        "shell: No such file or directory"
    );

    let (result, _) = run(dir.path(), "echo a > x > y");
    assert!(result.is_ok());

    let (result, _) = run(dir.path(), "echo a >");
    assert!(matches!(
        result,
        Err(Halt::Failed(ShellError::Syntax(_)))
    ));
}

#[test]
fn sequence_reports_errors_and_continues() {
    let dir = tempdir().unwrap();
    assert_eq!(
        output(dir.path(), "echo one; nosuch two; echo three"),
        "one\nshell: nosuch: Invalid app\nthree\n"
    );
}

#[test]
fn single_call_error_is_returned() {
    let dir = tempdir().unwrap();
    let (result, out) = run(dir.path(), "nosuch");
    assert_eq!(result.unwrap_err().to_string(), "shell: nosuch: Invalid app");
    assert!(out.is_empty());
}

#[test]
fn substitution_and_globbing_together() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "alpha\n").unwrap();
    fs::write(dir.path().join("b.txt"), "beta\n").unwrap();
    assert_eq!(output(dir.path(), "echo *.txt"), "a.txt b.txt\n");
    assert_eq!(output(dir.path(), "cat `echo *.txt`"), "alpha\nbeta\n");
    assert_eq!(output(dir.path(), "echo '*.txt'"), "*.txt\n");
    assert_eq!(output(dir.path(), "echo x*.txt"), "x*.txt\n");
}

#[test]
fn exit_stops_everything() {
    let dir = tempdir().unwrap();
    let (result, out) = run(dir.path(), "echo a | exit; echo b");
    assert!(result.unwrap_err().is_exit());
    assert!(out.is_empty());
}

#[test]
fn cd_then_relative_redirection() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("work")).unwrap();
    let mut sh = shell_in(dir.path());
    let mut out = Vec::new();
    sh.evaluate("cd work; echo saved > note", &mut io::empty(), &mut out)
        .unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("work").join("note")).unwrap(),
        "saved\n"
    );
    assert!(!dir.path().join("note").exists());
}

/// Output sink whose first write fails; later writes succeed.
#[derive(Default)]
struct FlakySink {
    failed_once: bool,
    written: Vec<u8>,
}

impl Write for FlakySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.failed_once {
            self.failed_once = true;
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn sequence_stops_when_output_sink_fails() {
    let dir = tempdir().unwrap();
    let mut sh = shell_in(dir.path());
    let mut sink = FlakySink::default();
    let result = sh.evaluate("echo a; echo b", &mut io::empty(), &mut sink);
    match result {
        Err(Halt::Failed(ShellError::Io(e))) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("expected transport failure, got {other:?}"),
    }
    assert!(sink.written.is_empty());
}

#[test]
fn cut_paste_cp_and_mv_are_registered() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("n.txt"), "one\ntwo\n").unwrap();
    assert_eq!(output(dir.path(), "cut -c 1-2 n.txt"), "on\ntw\n");
    assert_eq!(output(dir.path(), "paste -s n.txt"), "one\ttwo\n");
    assert_eq!(output(dir.path(), "cp n.txt m.txt; mv m.txt k.txt; cat k.txt"), "one\ntwo\n");
    assert!(!dir.path().join("m.txt").exists());
}

proptest! {
    #[test]
    fn operator_free_line_is_one_call(words in prop::collection::vec("[a-z0-9._-]{1,8}", 1..6)) {
        let line = words.join(" ");
        let command = parse_command(&line).unwrap();
        match command {
            Command::Call(call) => prop_assert_eq!(call.args(), words.as_slice()),
            other => prop_assert!(false, "expected a call, got {}", other.kind()),
        }
    }

    #[test]
    fn piping_into_cat_changes_nothing(words in prop::collection::vec("[a-z0-9]{1,8}", 1..6)) {
        let dir = tempdir().unwrap();
        let line = format!("echo {}", words.join(" "));
        let direct = output(dir.path(), &line);
        let piped = output(dir.path(), &format!("{line} | cat"));
        prop_assert_eq!(direct, piped);
    }

    #[test]
    fn sequence_output_is_concatenated(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
        let dir = tempdir().unwrap();
        let first = output(dir.path(), &format!("echo {a}"));
        let second = output(dir.path(), &format!("echo {b}"));
        let both = output(dir.path(), &format!("echo {a}; echo {b}"));
        prop_assert_eq!(both, first + &second);
    }
}
