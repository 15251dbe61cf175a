//! The manifest instance for one base directory.

use crate::error::Result;
use crate::lock::DirLock;
use crate::store::{AssetManifest, ManifestSelection, ManifestStore};
use std::fs;
use std::path::Path;

/// An open manifest: the base directory, its manifest file, and the mapping
/// loaded from it.
///
/// The mapping is an immutable snapshot between successful `digest`,
/// `clean` or `reload` calls, so [`Manifest::asset`] needs no locking.
/// Everything that touches the filesystem takes the directory lock.
#[derive(Debug)]
pub struct Manifest {
    store: ManifestStore,
    selection: ManifestSelection,
    mapping: AssetManifest,
}

impl Manifest {
    /// Open the manifest of `base_dir`, creating the directory and an empty
    /// manifest as needed.
    pub fn open<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        Self::open_with(base_dir, ManifestSelection::default())
    }

    /// Open with an explicit policy for directories holding several
    /// manifest files.
    pub fn open_with<P: AsRef<Path>>(base_dir: P, selection: ManifestSelection) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        fs::create_dir_all(base_dir)?;

        let _lock = DirLock::acquire(base_dir)?;
        let store = ManifestStore::locate_or_create(base_dir, selection)?;
        let mapping = store.load()?;

        tracing::debug!(
            manifest = %store.path().display(),
            entries = mapping.len(),
            "opened manifest"
        );
        Ok(Self {
            store,
            selection,
            mapping,
        })
    }

    /// Base directory holding assets and the manifest.
    pub fn base_dir(&self) -> &Path {
        self.store.base_dir()
    }

    /// Path to the manifest file.
    pub fn manifest_path(&self) -> &Path {
        self.store.path()
    }

    /// The currently loaded mapping.
    pub fn mapping(&self) -> &AssetManifest {
        &self.mapping
    }

    /// Fingerprinted path for an original asset path.
    ///
    /// Pure lookup against the loaded mapping; `None` when the asset is
    /// unknown.
    pub fn asset(&self, original: &str) -> Option<&str> {
        self.mapping.get(original)
    }

    /// Fingerprinted path, or `original` itself when the asset is unknown.
    pub fn asset_or_original<'a>(&'a self, original: &'a str) -> &'a str {
        self.asset(original).unwrap_or(original)
    }

    /// Re-read the mapping from the manifest file.
    pub fn reload(&mut self) -> Result<()> {
        let _lock = self.lock()?;
        self.mapping = self.store.load()?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<DirLock> {
        DirLock::acquire(self.store.base_dir())
    }

    pub(crate) fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Switch to whatever manifest the base directory holds now, creating
    /// one if there is none. Caller holds the directory lock.
    pub(crate) fn relocate_store(&mut self) -> Result<()> {
        let store = ManifestStore::locate_or_create(self.store.base_dir(), self.selection)?;
        tracing::info!(
            stale = %self.store.path().display(),
            manifest = %store.path().display(),
            "manifest file was removed, switched to current manifest"
        );
        self.store = store;
        Ok(())
    }

    pub(crate) fn set_mapping(&mut self, mapping: AssetManifest) {
        self.mapping = mapping;
    }
}
