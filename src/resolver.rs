//! Filesystem import resolution.
//!
//! Imports are compiled depth-first; the only fatal conditions in the
//! whole language live here (missing files and circular imports).

use crate::error::LaconError;
use crate::parser::Parser;
use crate::preprocess::preprocess;
use crate::value::Value;
use std::env;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Chain of files currently being compiled, outermost first. Threaded
/// through the whole import graph so a file importing one of its own
/// ancestors reports the full path back to itself.
pub(crate) struct ImportStack {
    paths: Vec<PathBuf>,
}

impl ImportStack {
    pub(crate) fn new() -> Self {
        ImportStack { paths: Vec::new() }
    }

    fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    fn push(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    fn pop(&mut self) {
        self.paths.pop();
    }

    fn chain(&self) -> String {
        self.paths
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect::<Vec<String>>()
            .join(" -> ")
    }
}

/// Resolves an import path against the importing file's directory,
/// collapsing `.` and `..` lexically. No filesystem access; two imports
/// of the same file must normalize identically for cycle detection to
/// see them as one.
pub(crate) fn resolve_path(base: &Path, raw: &str) -> PathBuf {
    let candidate = Path::new(raw);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else if base.is_absolute() {
        base.join(candidate)
    } else {
        match env::current_dir() {
            Ok(cwd) => cwd.join(base).join(candidate),
            Err(_) => base.join(candidate),
        }
    };
    normalize(joined)
}

fn normalize(joined: PathBuf) -> PathBuf {
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Compiles a LACON file from disk. Each call starts a fresh import
/// chain rooted at that file.
pub fn compile_file(path: impl AsRef<Path>) -> Result<Value, LaconError> {
    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    let mut stack = ImportStack::new();
    compile_file_inner(&normalize(absolute), &mut stack)
}

/// Recursive worker behind [`compile_file`] and `@import` lines. The
/// compiled document's own variables stay private to it; only the value
/// crosses the file boundary.
pub(crate) fn compile_file_inner(
    path: &Path,
    stack: &mut ImportStack,
) -> Result<Value, LaconError> {
    if stack.contains(path) {
        return Err(LaconError::CircularImport {
            path: path.to_path_buf(),
            cycle: format!("{} -> {}", stack.chain(), path.to_string_lossy()),
        });
    }
    if !path.exists() {
        return Err(LaconError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            LaconError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            LaconError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    log::debug!("compiling {}", path.display());
    stack.push(path.to_path_buf());
    let base_dir = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let parsed = Parser::new(base_dir, stack).parse_document(&preprocess(&text));
    stack.pop();
    let (value, _) = parsed?;
    Ok(value)
}
