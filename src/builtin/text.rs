//! Built-ins that read text from files or standard input and transform it.

use super::{BuiltinCommand, Flow};
use crate::env::Environment;
use anyhow::{Context, Result, bail};
use argh::FromArgs;
use regex::RegexBuilder;
use std::cmp::Ordering;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};

const STDIN_NAME: &str = "-";

/// Read all of `name` (or standard input for `-`) as text.
fn read_source(name: &str, stdin: &mut dyn Read, env: &Environment) -> Result<String> {
    let mut buf = Vec::new();
    if name == STDIN_NAME {
        stdin.read_to_end(&mut buf)?;
    } else {
        let mut f = fs::File::open(env.resolve_path(name)).with_context(|| name.to_string())?;
        f.read_to_end(&mut buf).with_context(|| name.to_string())?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// The named files in order, or standard input when there are none.
fn sources(files: &[String]) -> Vec<&str> {
    if files.is_empty() {
        vec![STDIN_NAME]
    } else {
        files.iter().map(String::as_str).collect()
    }
}

#[derive(FromArgs)]
/// Concatenate files to standard output. With no files, copy standard input.
pub struct Cat {
    #[argh(switch, short = 'n')]
    /// number every output line, starting at 1.
    pub number: bool,

    #[argh(positional, greedy)]
    /// files to print; `-` stands for standard input.
    pub files: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Flow> {
        let mut line_no = 0;
        for name in sources(&self.files) {
            let text = read_source(name, stdin, env)?;
            if !self.number {
                stdout.write_all(text.as_bytes())?;
                continue;
            }
            for line in text.split_inclusive('\n') {
                line_no += 1;
                write!(stdout, "{:>6}\t{}", line_no, line)?;
            }
        }
        Ok(Flow::Continue)
    }
}

#[derive(FromArgs)]
/// Count lines, words and bytes.
pub struct WC {
    #[argh(switch, short = 'l')]
    /// print the line count.
    pub lines: bool,

    #[argh(switch, short = 'w')]
    /// print the word count.
    pub words: bool,

    #[argh(switch, short = 'c')]
    /// print the byte count.
    pub bytes: bool,

    #[argh(positional, greedy)]
    /// files to count. If none provided, reads from stdin.
    pub files: Vec<String>,
}

#[derive(Default, Clone, Copy)]
struct Counts {
    lines: usize,
    words: usize,
    bytes: usize,
}

impl Counts {
    fn of(text: &str) -> Self {
        Counts {
            lines: text.lines().count(),
            words: text.split_whitespace().count(),
            bytes: text.len(),
        }
    }

    fn add(&mut self, other: Counts) {
        self.lines += other.lines;
        self.words += other.words;
        self.bytes += other.bytes;
    }
}

impl WC {
    fn render(&self, counts: Counts, label: Option<&str>) -> String {
        let all = !(self.lines || self.words || self.bytes);
        let mut fields = Vec::new();
        if all || self.lines {
            fields.push(counts.lines.to_string());
        }
        if all || self.words {
            fields.push(counts.words.to_string());
        }
        if all || self.bytes {
            fields.push(counts.bytes.to_string());
        }
        if let Some(label) = label {
            fields.push(label.to_string());
        }
        fields.join(" ")
    }
}

impl BuiltinCommand for WC {
    fn name() -> &'static str {
        "wc"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Flow> {
        if self.files.is_empty() {
            let counts = Counts::of(&read_source(STDIN_NAME, stdin, env)?);
            writeln!(stdout, "{}", self.render(counts, None))?;
            return Ok(Flow::Continue);
        }
        let mut total = Counts::default();
        for name in &self.files {
            let counts = Counts::of(&read_source(name, stdin, env)?);
            total.add(counts);
            writeln!(stdout, "{}", self.render(counts, Some(name.as_str())))?;
        }
        if self.files.len() > 1 {
            writeln!(stdout, "{}", self.render(total, Some("total")))?;
        }
        Ok(Flow::Continue)
    }
}

#[derive(FromArgs)]
/// Print lines matching a pattern.
pub struct Grep {
    #[argh(positional)]
    /// the pattern to search for (a regular expression)
    pub pattern: String,

    #[argh(positional, greedy)]
    /// files to search. If none provided, reads from stdin.
    pub files: Vec<String>,

    #[argh(switch, short = 'w')]
    /// match only whole words (using non-word characters as boundaries)
    pub word_regexp: bool,

    #[argh(switch, short = 'i')]
    /// ignore case distinctions
    pub ignore_case: bool,

    #[argh(switch, short = 'c')]
    /// print only the number of matching lines
    pub count: bool,

    #[argh(option, short = 'A', default = "0")]
    /// print NUM lines of trailing context after matching lines
    pub after_context: usize,
}

impl Grep {
    fn search(
        &self,
        text: &str,
        stdout: &mut dyn Write,
        label: Option<&str>,
        re: &regex::Regex,
    ) -> Result<()> {
        let prefix = label.map(|name| format!("{name}:")).unwrap_or_default();
        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let matches: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| re.is_match(line.trim_end_matches('\n')))
            .map(|(i, _)| i)
            .collect();

        if self.count {
            writeln!(stdout, "{}{}", prefix, matches.len())?;
            return Ok(());
        }

        let mut to_print = vec![false; lines.len()];
        for &m in &matches {
            let end = m
                .saturating_add(self.after_context)
                .saturating_add(1)
                .min(lines.len());
            to_print[m..end].iter_mut().for_each(|p| *p = true);
        }

        let mut last_printed: Option<usize> = None;
        for (i, line) in lines.iter().enumerate().filter(|(i, _)| to_print[*i]) {
            if let Some(last) = last_printed {
                if self.after_context > 0 && i > last + 1 {
                    writeln!(stdout, "--")?;
                }
            }
            write!(stdout, "{prefix}{line}")?;
            if !line.ends_with('\n') {
                writeln!(stdout)?;
            }
            last_printed = Some(i);
        }
        Ok(())
    }
}

impl BuiltinCommand for Grep {
    fn name() -> &'static str {
        "grep"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Flow> {
        let pattern = if self.word_regexp {
            format!(r"\b({})\b", self.pattern)
        } else {
            self.pattern.clone()
        };

        let re = RegexBuilder::new(&pattern)
            .case_insensitive(self.ignore_case)
            .build()
            .with_context(|| format!("Invalid regex pattern: {}", pattern))?;

        let labelled = self.files.len() > 1;
        for name in sources(&self.files) {
            let text = read_source(name, stdin, env)?;
            self.search(&text, stdout, labelled.then_some(name), &re)?;
        }
        Ok(Flow::Continue)
    }
}

#[derive(FromArgs)]
/// Sort lines of text.
pub struct Sort {
    #[argh(switch, short = 'n')]
    /// compare by the leading numeric value of each line.
    pub numeric: bool,

    #[argh(switch, short = 'r')]
    /// reverse the result of comparisons.
    pub reverse: bool,

    #[argh(switch, short = 'f')]
    /// fold lower case to upper case when comparing.
    pub ignore_case: bool,

    #[argh(positional, greedy)]
    /// files to sort. If none provided, reads from stdin.
    pub files: Vec<String>,
}

/// Leading number of `line`, or 0 when it does not start with one.
fn numeric_key(line: &str) -> f64 {
    let s = line.trim_start();
    let end = s
        .char_indices()
        .take_while(|&(i, c)| c.is_ascii_digit() || c == '.' || (i == 0 && c == '-'))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    s[..end].parse().unwrap_or(0.0)
}

impl Sort {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        let ord = if self.numeric {
            numeric_key(a).total_cmp(&numeric_key(b))
        } else if self.ignore_case {
            a.to_uppercase().cmp(&b.to_uppercase())
        } else {
            Ordering::Equal
        };
        ord.then_with(|| a.cmp(b))
    }
}

impl BuiltinCommand for Sort {
    fn name() -> &'static str {
        "sort"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Flow> {
        let mut text = String::new();
        for name in sources(&self.files) {
            text.push_str(&read_source(name, stdin, env)?);
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
        }
        let mut lines: Vec<&str> = text.lines().collect();
        lines.sort_by(|a, b| self.compare(a, b));
        if self.reverse {
            lines.reverse();
        }
        for line in lines {
            writeln!(stdout, "{line}")?;
        }
        Ok(Flow::Continue)
    }
}

#[derive(FromArgs)]
/// Collapse adjacent identical lines.
pub struct Uniq {
    #[argh(switch, short = 'c')]
    /// prefix lines by the number of occurrences.
    pub count: bool,

    #[argh(switch, short = 'd')]
    /// only print lines that are repeated.
    pub repeated: bool,

    #[argh(positional)]
    /// file to read. If none provided, reads from stdin.
    pub file: Option<String>,
}

impl BuiltinCommand for Uniq {
    fn name() -> &'static str {
        "uniq"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Flow> {
        let text = read_source(self.file.as_deref().unwrap_or(STDIN_NAME), stdin, env)?;

        let mut groups: Vec<(&str, usize)> = Vec::new();
        for line in text.lines() {
            match groups.last_mut() {
                Some((last, n)) if *last == line => *n += 1,
                _ => groups.push((line, 1)),
            }
        }

        for (line, n) in groups {
            if self.repeated && n < 2 {
                continue;
            }
            if self.count {
                writeln!(stdout, "{n:>7} {line}")?;
            } else {
                writeln!(stdout, "{line}")?;
            }
        }
        Ok(Flow::Continue)
    }
}

#[derive(FromArgs)]
/// Copy standard input to standard output and to every given file.
pub struct Tee {
    #[argh(switch, short = 'a')]
    /// append to the files instead of overwriting them.
    pub append: bool,

    #[argh(positional, greedy)]
    /// files to write.
    pub files: Vec<String>,
}

impl BuiltinCommand for Tee {
    fn name() -> &'static str {
        "tee"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Flow> {
        let mut input = Vec::new();
        stdin.read_to_end(&mut input)?;

        for name in &self.files {
            let mut f = OpenOptions::new()
                .write(true)
                .create(true)
                .append(self.append)
                .truncate(!self.append)
                .open(env.resolve_path(name))
                .with_context(|| name.clone())?;
            f.write_all(&input).with_context(|| name.clone())?;
        }
        stdout.write_all(&input)?;
        Ok(Flow::Continue)
    }
}

#[derive(FromArgs)]
/// Print selected characters or bytes of every line.
pub struct Cut {
    #[argh(option, short = 'c')]
    /// character positions to keep, e.g. `3`, `2-5` or `1,4-6`.
    pub chars: Option<String>,

    #[argh(option, short = 'b')]
    /// byte positions to keep, written like `-c`.
    pub bytes: Option<String>,

    #[argh(positional, greedy)]
    /// files to read; `-` stands for standard input.
    pub files: Vec<String>,
}

/// Parse a position list into 1-based inclusive ranges, in the order given.
fn parse_ranges(list: &str) -> Result<Vec<(usize, usize)>> {
    let position = |s: &str| -> Result<usize> {
        match s.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => bail!("invalid position list: {list}"),
        }
    };
    list.split(',')
        .map(|item| -> Result<(usize, usize)> {
            let (start, end) = match item.split_once('-') {
                Some((start, end)) => (position(start)?, position(end)?),
                None => {
                    let n = position(item)?;
                    (n, n)
                }
            };
            if start > end {
                bail!("invalid decreasing range: {item}");
            }
            Ok((start, end))
        })
        .collect()
}

/// The `[start, end]` slice of `units`, clipped to its length.
fn select<T: Clone>(units: &[T], (start, end): (usize, usize)) -> Vec<T> {
    if start > units.len() {
        return Vec::new();
    }
    units[start - 1..end.min(units.len())].to_vec()
}

impl BuiltinCommand for Cut {
    fn name() -> &'static str {
        "cut"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Flow> {
        let (list, by_char) = match (&self.chars, &self.bytes) {
            (Some(list), None) => (list, true),
            (None, Some(list)) => (list, false),
            _ => bail!("exactly one of -c or -b is required"),
        };
        let ranges = parse_ranges(list)?;

        for name in sources(&self.files) {
            let text = read_source(name, stdin, env)?;
            for line in text.lines() {
                let picked: String = if by_char {
                    let chars: Vec<char> = line.chars().collect();
                    ranges.iter().flat_map(|&r| select(&chars, r)).collect()
                } else {
                    let bytes: Vec<u8> =
                        ranges.iter().flat_map(|&r| select(line.as_bytes(), r)).collect();
                    String::from_utf8_lossy(&bytes).into_owned()
                };
                writeln!(stdout, "{picked}")?;
            }
        }
        Ok(Flow::Continue)
    }
}

#[derive(FromArgs)]
/// Merge lines of files side by side, separated by tabs.
pub struct Paste {
    #[argh(switch, short = 's')]
    /// paste each file onto a single line instead of in parallel.
    pub serial: bool,

    #[argh(positional, greedy)]
    /// files to merge; `-` stands for standard input, which is read once.
    pub files: Vec<String>,
}

impl BuiltinCommand for Paste {
    fn name() -> &'static str {
        "paste"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Flow> {
        let mut columns: Vec<Vec<String>> = Vec::new();
        let mut stdin_taken = false;
        for name in sources(&self.files) {
            if name == STDIN_NAME {
                if stdin_taken {
                    continue;
                }
                stdin_taken = true;
            }
            let text = read_source(name, stdin, env)?;
            if !text.trim().is_empty() {
                columns.push(text.lines().map(str::to_string).collect());
            }
        }

        if columns.is_empty() {
            writeln!(stdout)?;
        } else if self.serial {
            for column in &columns {
                writeln!(stdout, "{}", column.join("\t"))?;
            }
        } else {
            let rows = columns.iter().map(Vec::len).max().unwrap_or(0);
            for row in 0..rows {
                let cells: Vec<&str> = columns
                    .iter()
                    .map(|column| column.get(row).map(String::as_str).unwrap_or(""))
                    .collect();
                writeln!(stdout, "{}", cells.join("\t"))?;
            }
        }
        Ok(Flow::Continue)
    }
}
