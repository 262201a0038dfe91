use crate::env::Environment;
use crate::error::{Eval, ShellError};
use std::io::{Read, Write};

/// Object-safe trait for any application that can be invoked by a call.
///
/// Implemented by built-ins via a blanket impl; tests and embedders may
/// implement it directly.
pub trait ExecutableCommand {
    /// Runs the application against the given streams.
    ///
    /// Failures are reported as [`ShellError::Processing`]; `exit` reports
    /// [`crate::error::Halt::Exit`].
    fn execute(
        self: Box<Self>,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Eval;
}

/// Factory that tries to create an application from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}

/// Factory for one statically known application type.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Maps application names to applications by asking each factory in turn.
pub struct Registry {
    factories: Vec<Box<dyn CommandFactory>>,
}

impl Registry {
    pub fn new(factories: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { factories }
    }

    /// Look `name` up and run it.
    ///
    /// An unknown name is a processing error.
    pub fn run(
        &self,
        name: &str,
        args: &[String],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Eval {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        for factory in &self.factories {
            if let Some(cmd) = factory.try_create(env, name, &args) {
                return cmd.execute(stdin, stdout, env);
            }
        }
        Err(ShellError::invalid_app(name).into())
    }
}

impl Default for Registry {
    /// The built-in applications listed in [`crate::builtin::default_factories`].
    fn default() -> Self {
        Self::new(crate::builtin::default_factories())
    }
}
