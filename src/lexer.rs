//! Lexical analysis of one command line.
//!
//! Words are kept as raw text, quotes included: quote removal, substitution
//! and globbing happen later, per argument, when a call is evaluated.

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word exactly as typed, quotes and backticks included.
    Word(String),
    /// The pipe operator, `|`.
    Pipe,
    /// The statement separator, `;`.
    Semicolon,
    /// Input redirection symbol, `<`.
    RedirectLeft,
    /// Output redirection symbol, `>`.
    RedirectRight,
}

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexingError {
    /// A closing single or double quote was not found.
    UnfinishedQuote,
    /// A closing backtick was not found.
    UnfinishedBackQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
    ReadingBackQuote,
    /// A backtick span inside a double-quoted span. Double quotes here do not
    /// close the outer span.
    ReadingNestedBackQuote,
}

pub(crate) const CHAR_PIPE: char = '|';
pub(crate) const CHAR_SEMICOLON: char = ';';
pub(crate) const CHAR_REDIR_INPUT: char = '<';
pub(crate) const CHAR_REDIR_OUTPUT: char = '>';
pub(crate) const CHAR_SINGLE_QUOTE: char = '\'';
pub(crate) const CHAR_DOUBLE_QUOTE: char = '"';
pub(crate) const CHAR_BACK_QUOTE: char = '`';

fn is_operator(ch: char) -> bool {
    matches!(
        ch,
        CHAR_PIPE | CHAR_SEMICOLON | CHAR_REDIR_INPUT | CHAR_REDIR_OUTPUT
    )
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    /// Runs the machine over the whole input.
    ///
    /// A word ends at whitespace or at an operator character outside of any
    /// quote. Quoted spans glue onto the surrounding word, so `a'b c'd` is a
    /// single word.
    fn make_tokens(&mut self) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch, &mut out),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingSingleQuote => self.handle_quoted(ch, CHAR_SINGLE_QUOTE),
                LexingState::ReadingBackQuote => self.handle_quoted(ch, CHAR_BACK_QUOTE),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch),
                LexingState::ReadingNestedBackQuote => self.handle_nested_back_quote(ch),
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote | LexingState::ReadingDoubleQuote => {
                return Err(LexingError::UnfinishedQuote);
            }
            LexingState::ReadingBackQuote | LexingState::ReadingNestedBackQuote => {
                return Err(LexingError::UnfinishedBackQuote);
            }
            LexingState::Start | LexingState::ReadingWord => {}
        }

        self.finish_word(&mut out);
        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_start(&mut self, ch: char, out: &mut Vec<Token>) {
        if ch.is_whitespace() {
            return;
        }
        if is_operator(ch) {
            out.push(operator_token(ch));
            return;
        }
        self.state = LexingState::ReadingWord;
        self.handle_word(ch, out);
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            c if c.is_whitespace() => {
                self.finish_word(out);
                self.state = LexingState::Start;
            }
            c if is_operator(c) => {
                self.finish_word(out);
                out.push(operator_token(c));
                self.state = LexingState::Start;
            }
            CHAR_SINGLE_QUOTE => self.open(ch, LexingState::ReadingSingleQuote),
            CHAR_DOUBLE_QUOTE => self.open(ch, LexingState::ReadingDoubleQuote),
            CHAR_BACK_QUOTE => self.open(ch, LexingState::ReadingBackQuote),
            c => self.buffer.push(c),
        }
    }

    fn open(&mut self, quote: char, state: LexingState) {
        self.buffer.push(quote);
        self.state = state;
    }

    /// Single quotes and top-level backticks: everything up to the matching
    /// character is taken as is.
    fn handle_quoted(&mut self, ch: char, closing: char) {
        self.buffer.push(ch);
        if ch == closing {
            self.state = LexingState::ReadingWord;
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        self.buffer.push(ch);
        match ch {
            CHAR_DOUBLE_QUOTE => self.state = LexingState::ReadingWord,
            CHAR_BACK_QUOTE => self.state = LexingState::ReadingNestedBackQuote,
            _ => {}
        }
    }

    fn handle_nested_back_quote(&mut self, ch: char) {
        self.buffer.push(ch);
        if ch == CHAR_BACK_QUOTE {
            self.state = LexingState::ReadingDoubleQuote;
        }
    }

    fn finish_word(&mut self, out: &mut Vec<Token>) {
        if !self.buffer.is_empty() {
            out.push(Token::Word(std::mem::take(&mut self.buffer)));
        }
    }
}

fn operator_token(ch: char) -> Token {
    match ch {
        CHAR_PIPE => Token::Pipe,
        CHAR_SEMICOLON => Token::Semicolon,
        CHAR_REDIR_INPUT => Token::RedirectLeft,
        CHAR_REDIR_OUTPUT => Token::RedirectRight,
        _ => unreachable!("not an operator: {ch}"),
    }
}

/// Split a command line into words and operators.
///
/// Fails when a quote or backtick is left open at the end of the line.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    let mut lexer = LexingFSM::new(line);
    lexer.make_tokens()
}
