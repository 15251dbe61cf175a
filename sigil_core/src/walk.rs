//! Recursive enumeration of regular files under a base directory.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// A regular file found under the base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirFile {
    /// POSIX-style path relative to the base directory.
    pub rel: String,
    /// Full path on disk.
    pub path: PathBuf,
}

impl DirFile {
    /// Last path component.
    pub fn name(&self) -> &str {
        self.rel.rsplit('/').next().unwrap_or(&self.rel)
    }
}

/// List every regular file under `base_dir`, sorted by relative path.
///
/// Hidden files are included and no ignore files are honored. Symlinks are
/// not followed and are not reported.
pub fn walk_files(base_dir: &Path) -> Result<Vec<DirFile>> {
    let walker = ignore::WalkBuilder::new(base_dir)
        .standard_filters(false)
        .follow_links(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.into_path();
        let rel = relative_key(base_dir, &path)?;
        files.push(DirFile { rel, path });
    }

    files.sort_by(|a, b| a.rel.cmp(&b.rel));
    Ok(files)
}

/// Convert a path under `base_dir` into a `/`-separated manifest key.
pub fn relative_key(base_dir: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(base_dir)
        .map_err(|_| Error::invalid_path(path, "not under the base directory"))?;

    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| Error::invalid_path(path, "file name is not valid UTF-8"))?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => return Err(Error::invalid_path(path, "unexpected path component")),
        }
    }

    if parts.is_empty() {
        return Err(Error::invalid_path(path, "path is the base directory itself"));
    }

    Ok(parts.join("/"))
}

/// Whether a manifest key stays inside the base directory.
///
/// Rejects absolute paths, `..`, empty segments and backslashes.
pub fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && !key.contains('\\')
        && key
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..")
}

/// Join a `/`-separated manifest key onto the base directory.
pub fn key_to_path(base_dir: &Path, key: &str) -> PathBuf {
    key.split('/')
        .fold(base_dir.to_path_buf(), |acc, part| acc.join(part))
}
