//! Built-ins that copy and move filesystem entries.

use super::{BuiltinCommand, Flow};
use crate::env::Environment;
use anyhow::{Context, Result, bail};
use argh::FromArgs;
use log::debug;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Split `paths` into its sources and the trailing destination.
fn sources_and_dest(paths: &[String]) -> Result<(&[String], &str)> {
    match paths.split_last() {
        Some((dest, sources)) if !sources.is_empty() => Ok((sources, dest.as_str())),
        _ => bail!("missing destination operand"),
    }
}

/// `path` with symlinks and `..` resolved, even when its last components do
/// not exist yet.
fn normalized(path: &Path) -> PathBuf {
    if let Ok(p) = fs::canonicalize(path) {
        return p;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => normalized(parent).join(name),
        _ => path.to_path_buf(),
    }
}

/// Where each source lands: inside `dest` when it is a directory, otherwise
/// `dest` itself, which then admits a single source.
fn targets<'a>(
    sources: &'a [String],
    dest_name: &str,
    env: &Environment,
) -> Result<Vec<(&'a str, PathBuf, PathBuf)>> {
    let dest = env.resolve_path(dest_name);
    if !dest.is_dir() && sources.len() > 1 {
        bail!("{dest_name}: Not a directory");
    }
    sources
        .iter()
        .map(|name| -> Result<(&'a str, PathBuf, PathBuf)> {
            let src = env.resolve_path(name);
            let target = if dest.is_dir() {
                let file_name = normalized(&src)
                    .file_name()
                    .map(|n| n.to_os_string())
                    .with_context(|| format!("{name}: invalid source"))?;
                dest.join(file_name)
            } else {
                dest.clone()
            };
            Ok((name.as_str(), src, target))
        })
        .collect()
}

/// Reject a move or copy of `src` onto itself or into its own subtree.
fn check_distinct(name: &str, src: &Path, target: &Path) -> Result<()> {
    let (src, target) = (normalized(src), normalized(target));
    if src == target {
        bail!("'{name}' and its destination are the same file");
    }
    if target.starts_with(&src) {
        bail!("{name}: cannot place a directory inside itself");
    }
    Ok(())
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("{}", dst.display()))?;
    for entry in fs::read_dir(src).with_context(|| format!("{}", src.display()))? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("{}", entry.path().display()))?;
        }
    }
    Ok(())
}

#[derive(FromArgs)]
/// Copy files, or whole directories with -r, to a destination.
pub struct Cp {
    #[argh(switch, short = 'r')]
    /// copy directories and everything below them.
    pub recursive: bool,

    #[argh(positional, greedy)]
    /// one or more sources followed by the destination file or directory.
    pub paths: Vec<String>,
}

impl BuiltinCommand for Cp {
    fn name() -> &'static str {
        "cp"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Flow> {
        let (sources, dest) = sources_and_dest(&self.paths)?;
        for (name, src, target) in targets(sources, dest, env)? {
            let meta = fs::metadata(&src).with_context(|| name.to_string())?;
            check_distinct(name, &src, &target)?;
            if meta.is_dir() {
                if !self.recursive {
                    bail!("{name}: This is a directory");
                }
                if target.exists() && !target.is_dir() {
                    bail!("{}: Not a directory", target.display());
                }
                copy_tree(&src, &target)?;
            } else {
                fs::copy(&src, &target).with_context(|| name.to_string())?;
            }
            debug!("cp event=copied src={} dst={}", src.display(), target.display());
        }
        Ok(Flow::Continue)
    }
}

#[derive(FromArgs)]
/// Move or rename files and directories.
pub struct Mv {
    #[argh(switch, short = 'n')]
    /// leave an existing destination untouched.
    pub no_clobber: bool,

    #[argh(positional, greedy)]
    /// one or more sources followed by the destination file or directory.
    pub paths: Vec<String>,
}

impl BuiltinCommand for Mv {
    fn name() -> &'static str {
        "mv"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Flow> {
        let (sources, dest) = sources_and_dest(&self.paths)?;
        for (name, src, target) in targets(sources, dest, env)? {
            fs::symlink_metadata(&src).with_context(|| name.to_string())?;
            check_distinct(name, &src, &target)?;
            if self.no_clobber && target.exists() {
                debug!("mv event=skip reason=exists dst={}", target.display());
                continue;
            }
            fs::rename(&src, &target).with_context(|| name.to_string())?;
        }
        Ok(Flow::Continue)
    }
}
