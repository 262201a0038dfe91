use crate::error::ShellError;
use regex::Regex;
use std::fs;
use std::path::{MAIN_SEPARATOR, Path};

const CHAR_ASTERISK: char = '*';

/// One resolved argument kept in two parallel forms: the literal text and an
/// equivalent regular expression in which every unquoted `*` is a wildcard.
///
/// Index `i` of `plaintext` and of `regex` always describe the same fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegexArgument {
    plaintext: Vec<String>,
    regex: Vec<String>,
    has_wildcard: bool,
}

/// Pattern for a `*`: any run of characters except the path separator.
fn wildcard_pattern() -> String {
    format!("[^{}]*", regex::escape(&MAIN_SEPARATOR.to_string()))
}

impl RegexArgument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append literal text, quoted or not; it is never treated as a pattern.
    pub fn append(&mut self, ch: char) {
        let s = ch.to_string();
        self.regex.push(regex::escape(&s));
        self.plaintext.push(s);
    }

    pub fn append_str(&mut self, s: &str) {
        self.plaintext.push(s.to_string());
        self.regex.push(regex::escape(s));
    }

    pub fn append_asterisk(&mut self) {
        self.plaintext.push(CHAR_ASTERISK.to_string());
        self.regex.push(wildcard_pattern());
        self.has_wildcard = true;
    }

    pub fn merge(&mut self, other: RegexArgument) {
        self.plaintext.extend(other.plaintext);
        self.regex.extend(other.regex);
        self.has_wildcard |= other.has_wildcard;
    }

    pub fn is_regex(&self) -> bool {
        self.has_wildcard
    }

    pub fn is_empty(&self) -> bool {
        self.plaintext.is_empty()
    }

    /// Directory part of the text before the first wildcard, including the
    /// trailing separator, e.g. `src/` for `src/*.rs`.
    fn dir_prefix(&self) -> String {
        let wildcard = wildcard_pattern();
        let literal: String = self
            .plaintext
            .iter()
            .zip(&self.regex)
            .take_while(|(_, re)| **re != wildcard)
            .map(|(text, _)| text.as_str())
            .collect();
        match literal.rfind(['/', MAIN_SEPARATOR]) {
            Some(idx) => literal[..=idx].to_string(),
            None => String::new(),
        }
    }

    /// Expand the wildcards against the entries of one directory.
    ///
    /// Matches are reported with the directory prefix as typed and sorted
    /// lexically. Without a wildcard, or with no match, the literal text is
    /// the only result.
    pub fn glob_files(&self, current_dir: &Path) -> Result<Vec<String>, ShellError> {
        let mut globbed = Vec::new();

        if self.is_regex() {
            let pattern = format!("^{}$", self.regex.concat());
            let re = Regex::new(&pattern)
                .map_err(|e| ShellError::Processing(format!("shell: {e}")))?;
            let dir = self.dir_prefix();
            let search_dir = current_dir.join(&dir);

            if search_dir.is_dir() {
                let entries =
                    fs::read_dir(&search_dir).map_err(|e| ShellError::from_open(&e))?;
                for entry in entries {
                    let entry = entry.map_err(|e| ShellError::from_open(&e))?;
                    let candidate = format!("{}{}", dir, entry.file_name().to_string_lossy());
                    if re.is_match(&candidate) {
                        globbed.push(candidate);
                    }
                }
            }
            globbed.sort();
        }

        if globbed.is_empty() {
            globbed.push(self.to_string());
        }
        Ok(globbed)
    }
}

impl From<&str> for RegexArgument {
    fn from(s: &str) -> Self {
        let mut arg = RegexArgument::new();
        arg.append_str(s);
        arg
    }
}

impl std::fmt::Display for RegexArgument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.plaintext.concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn arg_of(s: &str) -> RegexArgument {
        let mut arg = RegexArgument::new();
        for ch in s.chars() {
            if ch == '*' {
                arg.append_asterisk();
            } else {
                arg.append(ch);
            }
        }
        arg
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "").unwrap();
    }

    #[test]
    fn test_literal_has_no_wildcard() {
        let arg = RegexArgument::from("a*b");
        assert!(!arg.is_regex());
        assert_eq!(arg.to_string(), "a*b");
        assert_eq!(arg.glob_files(Path::new("/")).unwrap(), ["a*b"]);
    }

    #[test]
    fn test_merge_keeps_wildcard_flag() {
        let mut arg = RegexArgument::from("x");
        arg.merge(arg_of("*"));
        assert!(arg.is_regex());
        assert_eq!(arg.to_string(), "x*");
    }

    #[test]
    fn test_empty_argument_globs_to_empty_string() {
        let arg = RegexArgument::new();
        assert!(arg.is_empty());
        assert_eq!(arg.glob_files(Path::new("/")).unwrap(), [""]);
    }

    #[test]
    fn test_glob_sorted_matches_in_current_dir() {
        let dir = tempdir().unwrap();
        for name in ["b.txt", "a.txt", "c.md"] {
            touch(dir.path(), name);
        }
        let got = arg_of("*.txt").glob_files(dir.path()).unwrap();
        assert_eq!(got, ["a.txt", "b.txt"]);
    }

    #[test]
    fn test_glob_in_subdirectory_keeps_prefix() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub"), "x1");
        touch(&dir.path().join("sub"), "x2");
        touch(dir.path(), "x3");
        let got = arg_of("sub/x*").glob_files(dir.path()).unwrap();
        assert_eq!(got, ["sub/x1", "sub/x2"]);
    }

    #[test]
    fn test_glob_absolute_path() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "one.log");
        let pattern = format!("{}/*.log", dir.path().display());
        let got = arg_of(&pattern).glob_files(Path::new("/")).unwrap();
        assert_eq!(got, [format!("{}/one.log", dir.path().display())]);
    }

    #[test]
    fn test_quoted_asterisk_does_not_match() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.txt");
        let mut arg = RegexArgument::from("*");
        arg.merge(arg_of(".txt"));
        assert_eq!(arg.glob_files(dir.path()).unwrap(), ["*.txt"]);
    }

    #[test]
    fn test_no_match_returns_literal() {
        let dir = tempdir().unwrap();
        assert_eq!(arg_of("*.none").glob_files(dir.path()).unwrap(), ["*.none"]);
        assert_eq!(
            arg_of("missing/*").glob_files(dir.path()).unwrap(),
            ["missing/*"]
        );
    }
}
