//! Manifest file discovery, loading and atomic persistence.

use crate::error::{Error, Result};
use crate::naming::{is_manifest_name, manifest_file_name, scratch_file_in};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Mapping from original asset path to fingerprinted asset path.
///
/// Both sides are POSIX-style paths relative to the base directory.
/// Keys are kept sorted so the persisted JSON is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest {
    entries: BTreeMap<String, String>,
}

impl AssetManifest {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprinted path for an original path, if present. Never fails.
    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries.get(original).map(String::as_str)
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, original: impl Into<String>, fingerprinted: impl Into<String>) {
        self.entries.insert(original.into(), fingerprinted.into());
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(original, fingerprinted)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Original asset paths.
    pub fn originals(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Fingerprinted asset paths produced by the last digest.
    pub fn fingerprinted(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }
}

impl FromIterator<(String, String)> for AssetManifest {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(unix)]
const MANIFEST_MODE: u32 = 0o644;

/// How to resolve a base directory holding more than one manifest file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ManifestSelection {
    /// Use the lexicographically first name and log a warning.
    #[default]
    First,
    /// Fail with [`Error::MultipleManifests`].
    Strict,
}

/// Owner of the single manifest file of a base directory.
///
/// None of these methods lock; callers hold the directory lock around any
/// read-modify-write sequence.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    base_dir: PathBuf,
    path: PathBuf,
}

impl ManifestStore {
    /// Find the manifest in `base_dir`, or create an empty one.
    ///
    /// Only immediate entries of `base_dir` are considered. The directory
    /// must already exist.
    pub fn locate_or_create(base_dir: &Path, selection: ManifestSelection) -> Result<Self> {
        let mut candidates = Vec::new();

        for entry in fs::read_dir(base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && is_manifest_name(name)
            {
                candidates.push(name.to_string());
            }
        }

        candidates.sort();

        let name = match candidates.len() {
            0 => return Self::create(base_dir),
            1 => candidates.swap_remove(0),
            _ => {
                if selection == ManifestSelection::Strict {
                    return Err(Error::multiple_manifests(base_dir, candidates));
                }
                tracing::warn!(
                    dir = %base_dir.display(),
                    candidates = ?candidates,
                    "multiple manifest files found, using the first"
                );
                candidates.swap_remove(0)
            }
        };

        tracing::debug!(manifest = %name, "found existing manifest");
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            path: base_dir.join(name),
        })
    }

    /// Create a new manifest with a random token and an empty mapping.
    fn create(base_dir: &Path) -> Result<Self> {
        let token: [u8; 16] = rand::random();
        let store = Self {
            base_dir: base_dir.to_path_buf(),
            path: base_dir.join(manifest_file_name(&token)),
        };
        store.persist(&AssetManifest::new())?;

        tracing::info!(manifest = %store.path.display(), "created manifest");
        Ok(store)
    }

    /// Path to the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base directory the manifest belongs to.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Manifest file name, relative to the base directory.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Whether the manifest file is currently on disk.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read and parse the manifest file.
    pub fn load(&self) -> Result<AssetManifest> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::manifest_missing(&self.path));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map_err(|e| Error::manifest_parse(&self.path, e.to_string()))
    }

    /// Replace the manifest content with `mapping`.
    ///
    /// Writes a temporary file in the base directory and renames it over the
    /// manifest, so readers see either the old or the new content.
    pub fn persist(&self, mapping: &AssetManifest) -> Result<()> {
        let json = serde_json::to_vec(mapping)
            .map_err(|e| Error::manifest_parse(&self.path, e.to_string()))?;

        let mut temp_file = scratch_file_in(&self.base_dir)?;
        match fs::metadata(&self.path) {
            Ok(metadata) => fs::set_permissions(temp_file.path(), metadata.permissions())?,
            Err(_) => set_new_manifest_permissions(temp_file.path())?,
        }

        temp_file.write_all(&json)?;
        temp_file.flush()?;
        temp_file.as_file().sync_all()?;

        temp_file.persist(&self.path)?;

        tracing::debug!(
            manifest = %self.path.display(),
            entries = mapping.len(),
            "persisted manifest"
        );
        Ok(())
    }

    /// Delete the manifest file.
    ///
    /// Returns false if it was already gone.
    pub fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// New manifests are readable by other users (the scratch file is 0600).
#[cfg(unix)]
fn set_new_manifest_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(MANIFEST_MODE))
}

#[cfg(not(unix))]
fn set_new_manifest_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
