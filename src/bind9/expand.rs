//! Replacement of `include` statements by the statements of their targets.
//!
//! Only a file including itself is detected. A longer cycle (`a` includes
//! `b` which includes `a`) recurses without bound.

use super::ast::{Config, Statement};
use super::parser;
use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Lexically normalizes a path: drops `.` components and resolves `..`
/// against the preceding component. The file system is not consulted.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => cleaned.push(".."),
            },
            other => cleaned.push(other.as_os_str()),
        }
    }
    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}

/// Resolves an include path relative to `base_dir`.
pub fn resolve_include(path: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        clean_path(path)
    } else {
        clean_path(&base_dir.join(path))
    }
}

impl Config {
    /// Returns a copy of the configuration with every top-level include
    /// replaced by the expanded statements of the included file. The
    /// receiver is left untouched.
    pub fn expand(&self, base_dir: &Path) -> Result<Config> {
        let base_dir = std::path::absolute(base_dir).map_err(|source| Error::Io {
            path: base_dir.to_path_buf(),
            source,
        })?;
        let mut statements = Vec::with_capacity(self.statements.len());
        for statement in &self.statements {
            let Statement::Include(include) = statement else {
                statements.push(statement.clone());
                continue;
            };
            let path = resolve_include(&include.path, &base_dir);
            if self.source_path.as_deref() == Some(path.as_path()) {
                info!(path = %path.display(), "configuration includes itself, keeping include");
                statements.push(statement.clone());
                continue;
            }
            debug!(path = %path.display(), "expanding include");
            let child = parser::parse_file(&path)
                .and_then(|child| child.expand(&base_dir))
                .map_err(|source| Error::Expand {
                    path: path.clone(),
                    source: Box::new(source),
                })?;
            statements.extend(child.statements);
        }
        Ok(Config {
            source_path: self.source_path.clone(),
            statements,
        })
    }

    /// Whether any top-level include other than a self-include remains.
    pub fn has_pending_includes(&self, base_dir: &Path) -> bool {
        self.statements.iter().any(|s| match s {
            Statement::Include(include) => {
                self.source_path.as_deref()
                    != Some(resolve_include(&include.path, base_dir).as_path())
            }
            _ => false,
        })
    }
}
