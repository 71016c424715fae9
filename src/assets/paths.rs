use std::path::{Path, PathBuf};

use crate::foundation::error::{StageError, StageResult};

/// Directory that configured asset paths are resolved against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRoot {
    root: PathBuf,
}

impl AssetRoot {
    /// Create a root at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { root: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.root
    }

    /// Resolve a configured relative path to a file under the root.
    pub fn resolve(&self, rel: &str) -> StageResult<PathBuf> {
        let norm = normalize_rel_path(rel)?;
        Ok(self.root.join(norm))
    }
}

/// Normalize a relative asset path to forward slashes without `.` segments.
///
/// Absolute paths and `..` segments are rejected so every asset stays under the root.
pub fn normalize_rel_path(source: &str) -> StageResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(StageError::config(format!(
            "asset path '{source}' must be relative"
        )));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(StageError::config(format!(
                "asset path '{source}' must not contain '..'"
            )));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(StageError::config("asset path must contain a file name"));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/paths.rs"]
mod tests;
