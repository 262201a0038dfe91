use std::env as stdenv;
use std::path::{Path, PathBuf};

/// The working-directory view threaded through evaluation.
///
/// The interpreter never touches the process-wide current directory. Globbing
/// and redirection resolve relative names against `current_dir`, and only the
/// `cd` application writes it.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Absolute path that relative file names are resolved against.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the process's current directory.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        Self { current_dir }
    }

    pub fn with_current_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            current_dir: dir.into(),
        }
    }

    /// Resolve `name` against the working directory. Absolute names are
    /// returned unchanged.
    pub fn resolve_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.current_dir.join(name)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
