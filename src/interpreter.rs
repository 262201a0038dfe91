use crate::application::{CommandFactory, Registry};
use crate::config::{Config, DEFAULT_MAX_SUBSTITUTION_DEPTH};
use crate::env::Environment;
use crate::error::{E_SUBST_DEPTH, Eval, Halt, ShellError};
use crate::parser;
use log::{debug, warn};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Read, Write};

/// What one evaluation needs from its surroundings: the applications it can
/// run and the working directory it resolves paths against.
///
/// Command substitution evaluates nested lines with a [`Context::nested`]
/// copy, which counts how deep the nesting goes.
pub struct Context<'a> {
    registry: &'a Registry,
    env: &'a mut Environment,
    depth: usize,
    max_depth: usize,
}

impl<'a> Context<'a> {
    pub fn new(registry: &'a Registry, env: &'a mut Environment) -> Self {
        Self {
            registry,
            env,
            depth: 0,
            max_depth: DEFAULT_MAX_SUBSTITUTION_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn env(&self) -> &Environment {
        &*self.env
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// A context for evaluating a substituted command line one level deeper.
    pub fn nested(&mut self) -> Result<Context<'_>, ShellError> {
        if self.depth >= self.max_depth {
            warn!("substitute event=too-deep depth={}", self.depth);
            return Err(ShellError::Processing(format!("shell: {E_SUBST_DEPTH}")));
        }
        Ok(Context {
            registry: self.registry,
            env: &mut *self.env,
            depth: self.depth + 1,
            max_depth: self.max_depth,
        })
    }

    pub(crate) fn run_app(
        &mut self,
        name: &str,
        args: &[String],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
    ) -> Eval {
        self.registry.run(name, args, stdin, stdout, &mut *self.env)
    }
}

/// A line-at-a-time shell: parses a command line, then evaluates it against
/// a registry of in-process applications.
///
/// The working directory lives in the interpreter, so a `cd` in one line is
/// seen by every later line.
///
/// Example
/// ```
/// use shell_pipeline::Interpreter;
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// sh.evaluate("echo hello world | wc -w", &mut std::io::empty(), &mut out).unwrap();
/// assert_eq!(String::from_utf8(out).unwrap(), "2\n");
/// ```
pub struct Interpreter {
    env: Environment,
    registry: Registry,
    config: Config,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of application factories.
    pub fn new(factories: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            registry: Registry::new(factories),
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse and run `line`, reading from the process's standard input.
    pub fn parse_and_evaluate(&mut self, line: &str, stdout: &mut dyn Write) -> Eval {
        let stdin = io::stdin();
        let mut stdin = stdin.lock();
        self.evaluate(line, &mut stdin, stdout)
    }

    /// Parse and run `line` against explicit streams.
    pub fn evaluate(&mut self, line: &str, stdin: &mut dyn Read, stdout: &mut dyn Write) -> Eval {
        let command = parser::parse_command(line)?;
        let mut ctx = Context::new(&self.registry, &mut self.env)
            .with_max_depth(self.config.max_substitution_depth);
        let result = command.evaluate(&mut ctx, stdin, stdout);
        stdout.flush()?;
        result
    }

    /// Interactive read-eval-print loop.
    ///
    /// Returns when input ends or `exit` runs. Errors are printed to standard
    /// error and the loop goes on.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            let readline = rl.readline(&self.config.prompt);
            match readline {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line.as_str())?;
                    match self.parse_and_evaluate(&line, &mut io::stdout()) {
                        Ok(()) => {}
                        Err(Halt::Exit) => {
                            debug!("repl event=exit");
                            break;
                        }
                        Err(Halt::Failed(err)) => eprintln!("{err}"),
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the built-in applications.
    fn default() -> Self {
        Self::new(crate::builtin::default_factories())
    }
}
