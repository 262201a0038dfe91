//! A small line-oriented shell: quoting, command substitution, globbing,
//! pipes, sequences and file redirection, with every application running
//! in-process.
//!
//! A line goes through three stages. [`parse_command`] turns it into a
//! [`Command`] tree. Evaluating a call resolves its arguments (see
//! [`resolver`]), applies redirections and hands the result to an
//! application from the [`Registry`]. [`Interpreter`] ties the stages together
//! and keeps the working directory between lines.
//!
//! Applications are pluggable through [`CommandFactory`] and
//! [`ExecutableCommand`]; the built-ins cover `echo`, `exit`, `cd`, `ls`,
//! `rm`, `cp`, `mv`, `cat`, `wc`, `grep`, `sort`, `uniq`, `tee`, `cut` and
//! `paste`.

mod application;
mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
mod interpreter;
mod lexer;
mod parser;
mod redirect;
mod regex_argument;
pub mod resolver;

pub use application::{CommandFactory, ExecutableCommand, Registry};
pub use builtin::default_factories;
pub use command::Command;
pub use config::Config;
pub use env::Environment;
pub use error::{Eval, Halt, ShellError};
/// The interactive command runner and the per-evaluation context.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Context, Interpreter};
pub use parser::parse_command;
pub use regex_argument::RegexArgument;
