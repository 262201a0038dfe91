use crate::command::{CallCommand, Command, PipeCommand, SequenceCommand};
use crate::error::ShellError;
use crate::lexer::{self, LexingError, Token};
use log::debug;

/// Errors that can occur while assembling the command tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    /// The line is blank or spans several lines.
    EmptyLine,
    /// Encountered an operator with nothing before it in its statement,
    /// e.g. a leading `|` or `;`.
    UnexpectedToken(Token),
    /// An operator is not followed by any word.
    UnexpectedEnd,
    /// The lexer rejected the line.
    Lexing(LexingError),
}

impl From<LexingError> for ParsingError {
    fn from(err: LexingError) -> Self {
        ParsingError::Lexing(err)
    }
}

impl From<ParsingError> for ShellError {
    fn from(err: ParsingError) -> Self {
        debug!("parse event=reject reason={:?}", err);
        ShellError::syntax()
    }
}

struct CommandBuilder {
    tokens: Vec<Token>,
    pos: usize,
    /// Finished statements of the sequence being built.
    statements: Vec<Command>,
    /// Finished stages of the pipeline being built.
    stages: Vec<CallCommand>,
    /// Raw arguments of the call being built.
    args: Vec<String>,
}

impl CommandBuilder {
    fn from(tokens: Vec<Token>) -> Self {
        CommandBuilder {
            tokens,
            pos: 0,
            statements: Vec::new(),
            stages: Vec::new(),
            args: Vec::new(),
        }
    }

    fn build(mut self) -> Result<Command, ParsingError> {
        while let Some(token) = self.consume() {
            match token {
                Token::Word(word) => self.args.push(word),
                Token::RedirectLeft | Token::RedirectRight => {
                    self.expect_word_ahead()?;
                    // redirections stay in the argument list; the call
                    // extracts them when it is evaluated
                    let op = if token == Token::RedirectLeft { "<" } else { ">" };
                    self.args.push(op.to_string());
                }
                Token::Pipe => {
                    self.expect_word_ahead()?;
                    let call = self.take_call(token)?;
                    self.stages.push(call);
                }
                Token::Semicolon => {
                    self.expect_word_ahead()?;
                    let call = self.take_call(token)?;
                    self.close_statement(call);
                }
            }
        }

        let call = self.take_call(Token::Semicolon)?;
        self.close_statement(call);
        Ok(self.collapse())
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// An operator must be followed by at least one word somewhere in the
    /// rest of the line.
    fn expect_word_ahead(&self) -> Result<(), ParsingError> {
        if self.tokens[self.pos..]
            .iter()
            .any(|t| matches!(t, Token::Word(_)))
        {
            Ok(())
        } else {
            Err(ParsingError::UnexpectedEnd)
        }
    }

    /// Turn the accumulated arguments into a call, which must not be empty.
    fn take_call(&mut self, closing: Token) -> Result<CallCommand, ParsingError> {
        if self.args.is_empty() {
            return Err(ParsingError::UnexpectedToken(closing));
        }
        Ok(CallCommand::new(std::mem::take(&mut self.args)))
    }

    fn close_statement(&mut self, call: CallCommand) {
        if self.stages.is_empty() {
            self.statements.push(Command::Call(call));
        } else {
            let mut stages = std::mem::take(&mut self.stages);
            stages.push(call);
            self.statements.push(Command::Pipe(PipeCommand::new(stages)));
        }
    }

    fn collapse(mut self) -> Command {
        if self.statements.len() == 1 {
            self.statements.remove(0)
        } else {
            Command::Sequence(SequenceCommand::new(self.statements))
        }
    }
}

/// Parse one command line into an executable tree.
///
/// A line holding a single call yields [`Command::Call`], one pipeline yields
/// [`Command::Pipe`], and several `;`-separated statements yield
/// [`Command::Sequence`].
///
/// Fails with a syntax error when the line is blank or holds a newline, a
/// quote is left open, a `|` or `;` starts a statement, or an operator is
/// not followed by any word.
pub fn parse_command(line: &str) -> Result<Command, ShellError> {
    if line.trim().is_empty() || line.contains('\n') {
        return Err(ParsingError::EmptyLine.into());
    }
    let tokens = lexer::split_into_tokens(line).map_err(ParsingError::from)?;
    let command = CommandBuilder::from(tokens).build()?;
    debug!("parse event=done kind={}", command.kind());
    Ok(command)
}
