//! Reconciliation: deleting unreferenced files and resetting state.

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::naming::is_fingerprinted_name;
use crate::walk::{is_safe_key, walk_files};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Statistics from a clean run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanStats {
    /// Number of files deleted.
    pub files_deleted: usize,
    /// Bytes freed.
    pub bytes_freed: u64,
    /// Relative paths of the deleted files.
    pub deleted: Vec<String>,
}

/// Statistics from a nuke run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NukeStats {
    /// Number of fingerprinted files deleted.
    pub files_deleted: usize,
    /// Whether a manifest file was removed.
    pub manifest_removed: bool,
}

impl Manifest {
    /// Delete every file under the base directory that the manifest does not
    /// reference.
    ///
    /// The keep-set is the mapping's originals, its fingerprinted paths and
    /// the manifest file itself. The mapping is re-read from disk first, so
    /// a digest from another process is never undone. If `dry_run` is true,
    /// reports what would be deleted without deleting.
    pub fn clean(&mut self, dry_run: bool) -> Result<CleanStats> {
        let _lock = self.lock()?;
        let mapping = self.store().load()?;

        let mut stats = CleanStats {
            files_deleted: 0,
            bytes_freed: 0,
            deleted: Vec::new(),
        };

        {
            let mut keep: HashSet<&str> = mapping
                .originals()
                .chain(mapping.fingerprinted())
                .collect();
            keep.insert(self.store().file_name());

            for file in walk_files(self.base_dir())? {
                if keep.contains(file.rel.as_str()) {
                    continue;
                }

                let Some(size) = remove(&file.path, dry_run)? else {
                    continue;
                };

                tracing::debug!(file = %file.rel, dry_run, "removing unreferenced file");
                stats.files_deleted += 1;
                stats.bytes_freed += size;
                stats.deleted.push(file.rel);
            }
        }

        tracing::info!(
            files = stats.files_deleted,
            bytes = stats.bytes_freed,
            dry_run,
            "clean complete"
        );
        self.set_mapping(mapping);
        Ok(stats)
    }

    /// Delete all fingerprinted files and the manifest itself.
    ///
    /// Fingerprinted files are found by name pattern (a heuristic) and by the
    /// paths the manifest file lists as fingerprinted, if it can still be
    /// read. Originals are left alone. A manifest that is already gone is
    /// not an error, so nuking is idempotent.
    ///
    /// Consumes the instance: open the base directory again to get a fresh
    /// manifest.
    pub fn nuke(self) -> Result<NukeStats> {
        let _lock = self.lock()?;
        let store = self.store();

        let registry: HashSet<String> = match store.load() {
            Ok(mapping) => mapping
                .fingerprinted()
                .filter(|key| is_safe_key(key))
                .map(str::to_string)
                .collect(),
            Err(Error::ManifestMissing { .. }) => HashSet::new(),
            Err(Error::ManifestParse { reason, .. }) => {
                tracing::warn!(%reason, "unreadable manifest, nuking by name pattern only");
                HashSet::new()
            }
            Err(e) => return Err(e),
        };

        let mut files_deleted = 0;
        for file in walk_files(store.base_dir())? {
            if file.rel == store.file_name() {
                continue;
            }
            if !is_fingerprinted_name(file.name()) && !registry.contains(&file.rel) {
                continue;
            }

            if remove(&file.path, false)?.is_some() {
                tracing::debug!(file = %file.rel, "removed fingerprinted file");
                files_deleted += 1;
            }
        }

        let manifest_removed = store.remove()?;

        tracing::info!(files = files_deleted, manifest_removed, "nuke complete");
        Ok(NukeStats {
            files_deleted,
            manifest_removed,
        })
    }
}

/// Remove a file, returning its size. `None` if it vanished first.
fn remove(path: &Path, dry_run: bool) -> Result<Option<u64>> {
    let size = match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if dry_run {
        return Ok(Some(size));
    }

    match fs::remove_file(path) {
        Ok(()) => Ok(Some(size)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
