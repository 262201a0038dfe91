use crate::error::{E_INVALID_FILE, Eval, ShellError};
use crate::interpreter::Context;
use crate::resolver;
use log::debug;
use std::fs::File;

const REDIR_INPUT: &str = "<";
const REDIR_OUTPUT: &str = ">";

fn is_redir_operator(token: &str) -> bool {
    token == REDIR_INPUT || token == REDIR_OUTPUT
}

/// A call's arguments with its `<` and `>` redirections pulled out.
///
/// The opened files belong to this value and are closed when it is dropped.
#[derive(Debug, Default)]
pub struct Redirection {
    /// The remaining, still unresolved, arguments in their original order.
    pub args: Vec<String>,
    /// File replacing the call's input, if any.
    pub input: Option<File>,
    /// File replacing the call's output, if any.
    pub output: Option<File>,
}

impl Redirection {
    /// Scan `tokens`, opening every redirection target in turn.
    ///
    /// When a direction is redirected several times the last one wins; the
    /// earlier file is closed as soon as it is replaced. Output files are
    /// created or truncated.
    pub fn extract(tokens: &[String], ctx: &mut Context<'_>) -> Eval<Self> {
        let mut redirection = Redirection::default();
        let mut iter = tokens.iter();

        while let Some(token) = iter.next() {
            if !is_redir_operator(token) {
                redirection.args.push(token.clone());
                continue;
            }
            let target = iter.next().ok_or_else(ShellError::syntax)?;
            if is_redir_operator(target) {
                return Err(ShellError::Syntax(E_INVALID_FILE.to_string()).into());
            }

            let mut resolved = resolver::resolve_one_argument(target, ctx)?;
            if resolved.len() != 1 {
                debug!(
                    "redirect event=reject target={} matches={}",
                    target,
                    resolved.len()
                );
                return Err(ShellError::syntax().into());
            }
            let path = ctx.env().resolve_path(resolved.remove(0));

            if token == REDIR_INPUT {
                let file = File::open(&path).map_err(|e| ShellError::from_open(&e))?;
                debug!("redirect event=open dir=in path={}", path.display());
                redirection.input = Some(file);
            } else {
                let file = File::create(&path).map_err(|e| ShellError::from_open(&e))?;
                debug!("redirect event=open dir=out path={}", path.display());
                redirection.output = Some(file);
            }
        }
        Ok(redirection)
    }
}
