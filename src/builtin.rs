use crate::application::{CommandFactory, ExecutableCommand, Factory};
use crate::env::Environment;
use crate::error::{Eval, Halt, ShellError};
use anyhow::{Context, Result, bail};
use argh::{EarlyExit, FromArgs};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

mod files;
mod text;

pub use files::{Cp, Mv};
pub use text::{Cat, Cut, Grep, Paste, Sort, Tee, Uniq, WC};

/// What the shell should do once a built-in returns successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    /// Stop the whole shell.
    Exit,
}

/// Built-in applications known to the shell at compile time.
///
/// Flags are parsed with [`argh`] (`FromArgs`); commands run in-process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command using provided IO streams and environment.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Flow>;
}

/// The caller's sink, remembering whether a write to it failed.
struct TrackedSink<'a> {
    inner: &'a mut dyn Write,
    failure: Option<io::ErrorKind>,
}

impl TrackedSink<'_> {
    fn record<T>(&mut self, result: io::Result<T>) -> io::Result<T> {
        if let Err(e) = &result {
            if e.kind() != io::ErrorKind::Interrupted {
                self.failure = Some(e.kind());
            }
        }
        result
    }
}

impl Write for TrackedSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.inner.write(buf);
        self.record(result)
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.inner.flush();
        self.record(result)
    }
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Eval {
        let mut sink = TrackedSink {
            inner: stdout,
            failure: None,
        };
        match T::execute(*self, stdin, &mut sink, env) {
            Ok(Flow::Continue) => Ok(()),
            Ok(Flow::Exit) => Err(Halt::Exit),
            Err(e) => {
                let message = format!("{}: {:#}", T::name(), e);
                Err(match sink.failure {
                    Some(kind) => ShellError::Io(io::Error::new(kind, message)),
                    None => ShellError::Processing(message),
                }
                .into())
            }
        }
    }
}

/// `--help` output, or the complaint about bad flags.
struct InvalidArgs {
    name: &'static str,
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Eval {
        if self.is_error {
            return Err(
                ShellError::Processing(format!("{}: {}", self.name, self.output.trim_end())).into(),
            );
        }
        stdout.write_all(self.output.as_bytes())?;
        Ok(())
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    name: T::name(),
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

/// Every built-in application, in lookup order.
pub fn default_factories() -> Vec<Box<dyn CommandFactory>> {
    vec![
        Box::new(Factory::<Echo>::default()),
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Ls>::default()),
        Box::new(Factory::<Rm>::default()),
        Box::new(Factory::<Cat>::default()),
        Box::new(Factory::<WC>::default()),
        Box::new(Factory::<Grep>::default()),
        Box::new(Factory::<Sort>::default()),
        Box::new(Factory::<Uniq>::default()),
        Box::new(Factory::<Tee>::default()),
        Box::new(Factory::<Cut>::default()),
        Box::new(Factory::<Paste>::default()),
        Box::new(Factory::<Cp>::default()),
        Box::new(Factory::<Mv>::default()),
    ]
}

/// Write the arguments to standard output, separated by spaces, followed by
/// a newline. No flags are interpreted.
pub struct Echo {
    pub args: Vec<String>,
}

impl FromArgs for Echo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Echo {
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }
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
    ) -> Result<Flow> {
        writeln!(stdout, "{}", self.args.join(" "))?;
        Ok(Flow::Continue)
    }
}

/// Terminate the shell. Arguments are ignored.
pub struct Exit;

impl FromArgs for Exit {
    fn from_args(_command_name: &[&str], _args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Exit)
    }
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
    ) -> Result<Flow> {
        Ok(Flow::Exit)
    }
}

#[derive(FromArgs)]
/// Set the shell's working directory. The process's own directory is left
/// alone; only later path lookups see the change.
pub struct Cd {
    #[argh(positional)]
    /// new working directory, resolved against the current one (default: $HOME).
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
    ) -> Result<Flow> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => match std::env::var("HOME") {
                Ok(home) => PathBuf::from(home),
                Err(_) => bail!("no target and HOME not set"),
            },
        };

        let new_dir = env.resolve_path(&target);
        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("{}", target.display()))?;
        if !canonical.is_dir() {
            bail!("{}: Not a directory", target.display());
        }
        env.current_dir = canonical;
        Ok(Flow::Continue)
    }
}

#[derive(FromArgs)]
/// List directory contents, one entry per line, sorted by name.
pub struct Ls {
    #[argh(switch, short = 'a')]
    /// include entries whose names begin with a dot.
    pub all: bool,

    #[argh(positional, greedy)]
    /// directories or files to list. Defaults to the current directory.
    pub paths: Vec<String>,
}

impl Ls {
    fn list(&self, path: &str, env: &Environment, stdout: &mut dyn Write) -> Result<()> {
        let resolved = env.resolve_path(path);
        let meta = fs::metadata(&resolved).with_context(|| format!("cannot access '{path}'"))?;
        if !meta.is_dir() {
            writeln!(stdout, "{path}")?;
            return Ok(());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&resolved).with_context(|| format!("cannot open '{path}'"))? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if self.all || !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        for name in names {
            writeln!(stdout, "{name}")?;
        }
        Ok(())
    }
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
    ) -> Result<Flow> {
        match self.paths.as_slice() {
            [] => self.list(".", env, stdout)?,
            [single] => self.list(single, env, stdout)?,
            many => {
                for (i, path) in many.iter().enumerate() {
                    if i > 0 {
                        writeln!(stdout)?;
                    }
                    writeln!(stdout, "{path}:")?;
                    self.list(path, env, stdout)?;
                }
            }
        }
        Ok(Flow::Continue)
    }
}

#[derive(FromArgs)]
/// Remove files or directories.
pub struct Rm {
    #[argh(switch, short = 'r')]
    /// remove directories and their contents recursively.
    pub recursive: bool,

    #[argh(switch, short = 'd')]
    /// remove empty directories.
    pub empty_dirs: bool,

    #[argh(positional, greedy)]
    /// files or directories to remove.
    pub files: Vec<String>,
}

impl BuiltinCommand for Rm {
    fn name() -> &'static str {
        "rm"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Flow> {
        if self.files.is_empty() {
            bail!("Insufficient arguments");
        }
        for name in &self.files {
            let path = env.resolve_path(name);
            let meta = fs::symlink_metadata(&path).with_context(|| name.clone())?;
            if !meta.is_dir() {
                fs::remove_file(&path).with_context(|| name.clone())?;
            } else if self.recursive {
                fs::remove_dir_all(&path).with_context(|| name.clone())?;
            } else if self.empty_dirs {
                fs::remove_dir(&path).with_context(|| name.clone())?;
            } else {
                bail!("{name}: This is a directory");
            }
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn run_builtin<T: BuiltinCommand + 'static>(
        args: &[&str],
        input: &str,
        env: &mut Environment,
    ) -> (Eval, String) {
        let factory = Factory::<T>::default();
        let cmd = factory
            .try_create(env, T::name(), args)
            .expect("factory must accept its own name");
        let mut out = Vec::new();
        let result = cmd.execute(&mut Cursor::new(input.as_bytes().to_vec()), &mut out, env);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_factory_ignores_other_names() {
        let env = Environment::new();
        assert!(Factory::<Echo>::default().try_create(&env, "cat", &[]).is_none());
    }

    #[test]
    fn test_echo_joins_arguments() {
        let mut env = Environment::new();
        let (result, out) = run_builtin::<Echo>(&["hello", "world"], "", &mut env);
        assert!(result.is_ok());
        assert_eq!(out, "hello world\n");

        let (_, out) = run_builtin::<Echo>(&["-n", "x"], "", &mut env);
        assert_eq!(out, "-n x\n");

        let (_, out) = run_builtin::<Echo>(&[], "", &mut env);
        assert_eq!(out, "\n");
    }

    #[test]
    fn test_exit_requests_termination() {
        let mut env = Environment::new();
        let (result, _) = run_builtin::<Exit>(&["3"], "", &mut env);
        assert!(matches!(result, Err(Halt::Exit)));
    }

    #[test]
    fn test_cd_relative_and_back() {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        let mut env = Environment::with_current_dir(&root);

        let (result, _) = run_builtin::<Cd>(&["sub"], "", &mut env);
        assert!(result.is_ok());
        assert_eq!(env.current_dir, root.join("sub"));

        let (result, _) = run_builtin::<Cd>(&[".."], "", &mut env);
        assert!(result.is_ok());
        assert_eq!(env.current_dir, root);
    }

    #[test]
    fn test_cd_nonexistent_path_errors() {
        let dir = tempdir().unwrap();
        let mut env = Environment::with_current_dir(dir.path());
        let (result, _) = run_builtin::<Cd>(&["missing"], "", &mut env);
        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("cd: missing"));
        assert_eq!(env.current_dir, dir.path());
    }

    #[test]
    fn test_cd_into_file_errors() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("f"), "").unwrap();
        let mut env = Environment::with_current_dir(dir.path());
        let (result, _) = run_builtin::<Cd>(&["f"], "", &mut env);
        assert_eq!(result.unwrap_err().to_string(), "cd: f: Not a directory");
    }

    #[test]
    fn test_ls_sorted_and_hides_dotfiles() {
        let dir = tempdir().unwrap();
        for name in ["b", "a", ".hidden"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let mut env = Environment::with_current_dir(dir.path());
        let (result, out) = run_builtin::<Ls>(&[], "", &mut env);
        assert!(result.is_ok());
        assert_eq!(out, "a\nb\n");

        let (_, out) = run_builtin::<Ls>(&["-a"], "", &mut env);
        assert_eq!(out, ".hidden\na\nb\n");
    }

    #[test]
    fn test_ls_several_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("x")).unwrap();
        fs::create_dir(dir.path().join("y")).unwrap();
        fs::write(dir.path().join("x").join("1"), "").unwrap();
        let mut env = Environment::with_current_dir(dir.path());
        let (result, out) = run_builtin::<Ls>(&["x", "y"], "", &mut env);
        assert!(result.is_ok());
        assert_eq!(out, "x:\n1\n\ny:\n");
    }

    #[test]
    fn test_rm_files_and_directories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("f"), "").unwrap();
        fs::create_dir(dir.path().join("d")).unwrap();
        fs::write(dir.path().join("d").join("inner"), "").unwrap();
        let mut env = Environment::with_current_dir(dir.path());

        let (result, _) = run_builtin::<Rm>(&["d"], "", &mut env);
        assert_eq!(result.unwrap_err().to_string(), "rm: d: This is a directory");

        let (result, _) = run_builtin::<Rm>(&["f"], "", &mut env);
        assert!(result.is_ok());
        assert!(!dir.path().join("f").exists());

        let (result, _) = run_builtin::<Rm>(&["-r", "d"], "", &mut env);
        assert!(result.is_ok());
        assert!(!dir.path().join("d").exists());
    }

    #[test]
    fn test_unknown_flag_is_processing_error() {
        let mut env = Environment::new();
        let (result, out) = run_builtin::<Ls>(&["--bogus"], "", &mut env);
        let err = result.unwrap_err();
        assert!(matches!(err.error(), Some(ShellError::Processing(_))));
        assert!(err.to_string().starts_with("ls: "));
        assert!(out.is_empty());
    }

    /// Sink that refuses every write.
    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure_is_transport_error() {
        let mut env = Environment::new();
        let cmd = Factory::<Echo>::default()
            .try_create(&env, "echo", &["hi"])
            .unwrap();
        let err = cmd
            .execute(&mut io::empty(), &mut BrokenSink, &mut env)
            .unwrap_err();
        match err.error() {
            Some(ShellError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected transport error, got {other:?}"),
        }
        assert!(!err.error().unwrap().is_recoverable());
    }

    #[test]
    fn test_own_failure_stays_processing_error() {
        let dir = tempdir().unwrap();
        let mut env = Environment::with_current_dir(dir.path());
        let (result, _) = run_builtin::<Cd>(&["missing"], "", &mut env);
        assert!(matches!(
            result.unwrap_err().error(),
            Some(ShellError::Processing(_))
        ));
    }

    #[test]
    fn test_help_is_printed() {
        let mut env = Environment::new();
        let (result, out) = run_builtin::<Rm>(&["--help"], "", &mut env);
        assert!(result.is_ok());
        assert!(out.contains("Usage: rm"));
    }

    #[test]
    fn test_cd_help_describes_shell_directory() {
        let mut env = Environment::new();
        let (result, out) = run_builtin::<Cd>(&["--help"], "", &mut env);
        assert!(result.is_ok());
        assert!(out.contains("Set the shell's working directory."));
    }
}
