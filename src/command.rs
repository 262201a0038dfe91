//! The executable command tree built by [`crate::parser::parse_command`].

use crate::error::{Eval, Halt, ShellError};
use crate::interpreter::Context;
use crate::redirect::Redirection;
use crate::resolver;
use log::debug;
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// A node of the command tree.
///
/// Every variant reads from the given input stream and writes to the given
/// output stream; neither is closed by evaluation.
#[derive(Debug)]
pub enum Command {
    /// One application invocation.
    Call(CallCommand),
    /// Calls chained with `|`.
    Pipe(PipeCommand),
    /// Statements separated by `;`.
    Sequence(SequenceCommand),
}

impl Command {
    pub fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
    ) -> Eval {
        match self {
            Command::Call(call) => call.evaluate(ctx, stdin, stdout),
            Command::Pipe(pipe) => pipe.evaluate(ctx, stdin, stdout),
            Command::Sequence(seq) => seq.evaluate(ctx, stdin, stdout),
        }
    }

    /// Ask the node to stop at the next opportunity. Cooperative only: an
    /// application that is already running finishes.
    pub fn terminate(&self) {
        match self {
            Command::Call(call) => call.terminate(),
            Command::Pipe(pipe) => pipe.terminate(),
            Command::Sequence(seq) => seq.terminate(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Command::Call(_) => "call",
            Command::Pipe(_) => "pipe",
            Command::Sequence(_) => "sequence",
        }
    }
}

/// A single application invocation: raw words, redirections included.
#[derive(Debug)]
pub struct CallCommand {
    args: Vec<String>,
    terminated: AtomicBool,
}

impl CallCommand {
    pub fn new(args: Vec<String>) -> Self {
        Self {
            args,
            terminated: AtomicBool::new(false),
        }
    }

    /// The unresolved words of this call, as typed.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Relaxed);
    }

    /// Redirect, resolve arguments, then dispatch to the registry.
    ///
    /// Files opened for redirection are owned by this frame and closed when
    /// it returns, whether the application succeeded or not.
    pub fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
    ) -> Eval {
        if self.args.is_empty() {
            return Err(ShellError::syntax().into());
        }
        if self.terminated.load(Ordering::Relaxed) {
            return Ok(());
        }

        let mut redirection = Redirection::extract(&self.args, ctx)?;
        let mut argv = resolver::parse_arguments(&redirection.args, ctx)?;
        if argv.is_empty() {
            debug!("call event=skip reason=no-words");
            return Ok(());
        }
        let app = argv.remove(0);

        let input: &mut dyn Read = match redirection.input.as_mut() {
            Some(file) => file,
            None => stdin,
        };
        let output: &mut dyn Write = match redirection.output.as_mut() {
            Some(file) => file,
            None => stdout,
        };
        debug!("call event=dispatch app={} argc={}", app, argv.len());
        let result = ctx.run_app(&app, &argv, input, output);
        if let Some(file) = redirection.output.as_mut() {
            file.flush()?;
        }
        result
    }
}

/// Calls connected by `|`.
///
/// Stages run one after another. Each stage's complete output is buffered in
/// memory and becomes the next stage's input.
#[derive(Debug)]
pub struct PipeCommand {
    stages: Vec<CallCommand>,
    terminated: AtomicBool,
}

impl PipeCommand {
    pub fn new(stages: Vec<CallCommand>) -> Self {
        Self {
            stages,
            terminated: AtomicBool::new(false),
        }
    }

    pub fn stages(&self) -> &[CallCommand] {
        &self.stages
    }

    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Relaxed);
        for stage in &self.stages {
            stage.terminate();
        }
    }

    /// Any failing stage stops the pipeline; the stages after it never run.
    pub fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
    ) -> Eval {
        let last = self.stages.len().saturating_sub(1);
        let mut previous: Option<Vec<u8>> = None;

        for (i, stage) in self.stages.iter().enumerate() {
            if self.terminated.load(Ordering::Relaxed) {
                debug!("pipe event=terminated stage={}", i);
                return Ok(());
            }
            let mut input = previous.take().map(Cursor::new);
            let stage_in: &mut dyn Read = match input.as_mut() {
                Some(buf) => buf,
                None => &mut *stdin,
            };

            if i == last {
                stage.evaluate(ctx, stage_in, stdout)?;
            } else {
                let mut captured = Vec::new();
                stage.evaluate(ctx, stage_in, &mut captured)?;
                debug!("pipe event=stage-done stage={} bytes={}", i, captured.len());
                previous = Some(captured);
            }
        }
        Ok(())
    }
}

/// Statements separated by `;`, run in order.
#[derive(Debug)]
pub struct SequenceCommand {
    statements: Vec<Command>,
    terminated: AtomicBool,
}

impl SequenceCommand {
    pub fn new(statements: Vec<Command>) -> Self {
        Self {
            statements,
            terminated: AtomicBool::new(false),
        }
    }

    pub fn statements(&self) -> &[Command] {
        &self.statements
    }

    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Relaxed);
        for statement in &self.statements {
            statement.terminate();
        }
    }

    /// A statement that fails with a syntax or processing error has its
    /// message printed to `stdout` and the next statement runs. `exit` and
    /// failures of `stdout` itself stop the whole sequence.
    pub fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
    ) -> Eval {
        for statement in &self.statements {
            if self.terminated.load(Ordering::Relaxed) {
                return Ok(());
            }
            match statement.evaluate(ctx, &mut *stdin, &mut *stdout) {
                Ok(()) => {}
                Err(Halt::Failed(err)) if err.is_recoverable() => {
                    debug!("sequence event=recover error={}", err);
                    writeln!(stdout, "{err}")?;
                }
                Err(halt) => return Err(halt),
            }
        }
        Ok(())
    }
}
