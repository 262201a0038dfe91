//! Quote removal, command substitution and globbing for call arguments.
//!
//! Single quotes disable every special character. Double quotes disable every
//! special character except the backtick. An unquoted `*` globs.

use crate::error::{Eval, ShellError};
use crate::interpreter::Context;
use crate::lexer::{CHAR_BACK_QUOTE, CHAR_DOUBLE_QUOTE, CHAR_SINGLE_QUOTE};
use crate::parser::parse_command;
use crate::regex_argument::RegexArgument;
use log::debug;
use std::io;

const CHAR_ASTERISK: char = '*';

/// Resolve every raw argument in turn and concatenate the results.
pub fn parse_arguments(args: &[String], ctx: &mut Context<'_>) -> Eval<Vec<String>> {
    let mut parsed = Vec::new();
    for arg in args {
        parsed.extend(resolve_one_argument(arg, ctx)?);
    }
    Ok(parsed)
}

/// Resolve one raw word into zero or more final arguments.
///
/// Unquoted substitution output is split on whitespace, so `` a`echo 1 2`b ``
/// yields `a1` and `2b`; inside double quotes it is kept whole. A word made of
/// an empty substitution alone yields nothing, while `''` yields one empty
/// argument.
pub fn resolve_one_argument(arg: &str, ctx: &mut Context<'_>) -> Eval<Vec<String>> {
    let mut unmatched_quotes: Vec<char> = Vec::new();
    let mut segments: Vec<RegexArgument> = Vec::new();
    let mut parsed = RegexArgument::new();
    let mut sub_command = String::new();

    for ch in arg.chars() {
        let top = unmatched_quotes.last().copied();
        match ch {
            CHAR_BACK_QUOTE => match top {
                None | Some(CHAR_DOUBLE_QUOTE) => {
                    // start of substitution
                    if !parsed.is_empty() {
                        append_into_segment(&mut segments, std::mem::take(&mut parsed));
                    }
                    unmatched_quotes.push(ch);
                }
                Some(CHAR_BACK_QUOTE) => {
                    unmatched_quotes.pop();
                    let output = evaluate_sub_command(&sub_command, ctx)?;
                    sub_command.clear();

                    if unmatched_quotes.is_empty() {
                        let mut words = output.split_whitespace().map(RegexArgument::from);
                        if let Some(first) = words.next() {
                            append_into_segment(&mut segments, first);
                        }
                        segments.extend(words);
                    } else {
                        append_into_segment(&mut segments, RegexArgument::from(output.as_str()));
                    }
                }
                Some(_) => parsed.append(ch),
            },
            CHAR_SINGLE_QUOTE | CHAR_DOUBLE_QUOTE => match top {
                None => unmatched_quotes.push(ch),
                Some(open) if open == ch => {
                    unmatched_quotes.pop();
                    // guarantees "" still yields an argument
                    append_into_segment(&mut segments, RegexArgument::new());
                }
                Some(CHAR_BACK_QUOTE) => sub_command.push(ch),
                Some(_) => parsed.append(ch),
            },
            CHAR_ASTERISK => match top {
                None => parsed.append_asterisk(),
                Some(CHAR_BACK_QUOTE) => sub_command.push(ch),
                Some(_) => parsed.append(ch),
            },
            _ => match top {
                Some(CHAR_BACK_QUOTE) => sub_command.push(ch),
                _ => parsed.append(ch),
            },
        }
    }

    if !unmatched_quotes.is_empty() {
        return Err(ShellError::syntax().into());
    }
    if !parsed.is_empty() {
        append_into_segment(&mut segments, parsed);
    }

    let mut resolved = Vec::new();
    for segment in &segments {
        resolved.extend(segment.glob_files(&ctx.env().current_dir)?);
    }
    Ok(resolved)
}

/// Merge `arg` into the last segment, or start the first one.
fn append_into_segment(segments: &mut Vec<RegexArgument>, arg: RegexArgument) {
    match segments.last_mut() {
        Some(last) => last.merge(arg),
        None => segments.push(arg),
    }
}

/// Run `command_line` and return its output as a single line: one trailing
/// newline dropped, the remaining ones turned into spaces.
fn evaluate_sub_command(command_line: &str, ctx: &mut Context<'_>) -> Eval<String> {
    if command_line.trim().is_empty() {
        return Ok(String::new());
    }
    let mut nested = ctx.nested()?;
    debug!(
        "substitute event=start depth={} command={:?}",
        nested.depth(),
        command_line
    );

    let command = parse_command(command_line)?;
    let mut output = Vec::new();
    command.evaluate(&mut nested, &mut io::empty(), &mut output)?;

    let mut output = String::from_utf8_lossy(&output).into_owned();
    if output.ends_with('\n') {
        output.pop();
    }
    Ok(output.replace('\n', " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::Registry;
    use crate::builtin::default_factories;
    use crate::env::Environment;
    use crate::error::Halt;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn resolve_in(dir: &Path, arg: &str) -> Eval<Vec<String>> {
        let registry = Registry::new(default_factories());
        let mut env = Environment::with_current_dir(dir);
        let mut ctx = Context::new(&registry, &mut env);
        resolve_one_argument(arg, &mut ctx)
    }

    fn resolve(arg: &str) -> Vec<String> {
        let dir = tempdir().unwrap();
        resolve_in(dir.path(), arg).unwrap()
    }

    #[test]
    fn test_literal_argument_is_unchanged() {
        assert_eq!(resolve("hello.txt"), ["hello.txt"]);
        assert_eq!(resolve("-n"), ["-n"]);
    }

    #[test]
    fn test_single_quotes_disable_everything() {
        assert_eq!(resolve("'literal *text`here'"), ["literal *text`here"]);
        assert_eq!(resolve("'\"a\"'"), ["\"a\""]);
    }

    #[test]
    fn test_double_quotes_keep_single_quotes() {
        assert_eq!(resolve("\"it's *\""), ["it's *"]);
    }

    #[test]
    fn test_quotes_glue_together() {
        assert_eq!(resolve("a'b c'\"d\"e"), ["ab cde"]);
    }

    #[test]
    fn test_empty_quotes_yield_empty_argument() {
        assert_eq!(resolve("''"), [""]);
        assert_eq!(resolve("\"\""), [""]);
    }

    #[test]
    fn test_unquoted_substitution_splits_words() {
        assert_eq!(resolve("a`echo 1 2`b"), ["a1", "2b"]);
        assert_eq!(
            resolve("abc`echo 1 2 3`xyz`echo 4 5 6`"),
            ["abc1", "2", "3xyz4", "5", "6"]
        );
    }

    #[test]
    fn test_double_quoted_substitution_is_verbatim() {
        assert_eq!(resolve("\"a`echo 1 2`b\""), ["a1 2b"]);
        assert_eq!(
            resolve("\"This is space:`echo \" \"`.\""),
            ["This is space: ."]
        );
    }

    #[test]
    fn test_substitution_newlines_become_spaces() {
        assert_eq!(resolve("\"`echo a; echo b`\""), ["a b"]);
    }

    #[test]
    fn test_empty_substitution_yields_nothing() {
        assert!(resolve("`echo`").is_empty());
        assert!(resolve("``").is_empty());
    }

    #[test]
    fn test_substitution_failure_propagates() {
        let dir = tempdir().unwrap();
        let err = resolve_in(dir.path(), "`nosuchapp`").unwrap_err();
        assert_eq!(err.to_string(), "shell: nosuchapp: Invalid app");
    }

    #[test]
    fn test_exit_inside_substitution_propagates() {
        let dir = tempdir().unwrap();
        let err = resolve_in(dir.path(), "`exit`").unwrap_err();
        assert!(matches!(err, Halt::Exit));
    }

    #[test]
    fn test_unquoted_asterisk_globs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        assert_eq!(
            resolve_in(dir.path(), "*.txt").unwrap(),
            ["a.txt", "b.txt"]
        );
        assert_eq!(resolve_in(dir.path(), "'*.txt'").unwrap(), ["*.txt"]);
        assert_eq!(resolve_in(dir.path(), "\"*\".txt").unwrap(), ["*.txt"]);
    }

    #[test]
    fn test_open_quote_is_syntax_error() {
        let dir = tempdir().unwrap();
        let err = resolve_in(dir.path(), "'abc").unwrap_err();
        assert_eq!(err.to_string(), "shell: Invalid syntax");
    }

    #[test]
    fn test_parse_arguments_flattens_in_order() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(default_factories());
        let mut env = Environment::with_current_dir(dir.path());
        let mut ctx = Context::new(&registry, &mut env);
        let args: Vec<String> = ["x", "`echo 1 2`", "''", "y"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            parse_arguments(&args, &mut ctx).unwrap(),
            ["x", "1", "2", "", "y"]
        );
    }
}
