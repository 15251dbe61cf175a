//! Fingerprinting of assets.

use crate::error::{Error, Result};
use crate::hash::Fingerprint;
use crate::manifest::Manifest;
use crate::naming::{fingerprinted_path, is_fingerprinted_name, is_scratch_name, scratch_file_in};
use crate::store::AssetManifest;
use crate::walk::{DirFile, key_to_path, walk_files};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Statistics from a digest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestStats {
    /// Number of assets fingerprinted.
    pub files_digested: usize,
    /// Bytes written to fingerprinted copies.
    pub bytes_written: u64,
}

impl Manifest {
    /// Fingerprint every asset under the base directory.
    ///
    /// Each original gets a byte-for-byte copy named after its content hash,
    /// and the manifest is replaced (not merged) with the new mapping.
    /// Previous fingerprinted copies stay on disk until [`Manifest::clean`].
    ///
    /// The manifest is only written after every copy succeeded; on error the
    /// instance keeps its previous mapping.
    pub fn digest(&mut self) -> Result<DigestStats> {
        let _lock = self.lock()?;

        // A manifest removed underneath this instance (for example by a nuke
        // through another handle) is never recreated under the old token.
        let on_disk = match self.store().load() {
            Ok(mapping) => mapping,
            Err(Error::ManifestMissing { .. }) => {
                self.relocate_store()?;
                self.store().load()?
            }
            Err(e) => return Err(e),
        };

        let store = self.store();
        let base_dir = store.base_dir();
        let registry: HashSet<&str> = on_disk
            .fingerprinted()
            .chain(self.mapping().fingerprinted())
            .collect();

        let mut stats = DigestStats {
            files_digested: 0,
            bytes_written: 0,
        };
        let mut mapping = AssetManifest::new();

        for file in walk_files(base_dir)? {
            if !is_asset(&file, store.file_name(), &registry) {
                continue;
            }

            let (target_rel, size) = write_copy(base_dir, &file)?;

            tracing::debug!(asset = %file.rel, fingerprinted = %target_rel, "digested");
            stats.files_digested += 1;
            stats.bytes_written += size;
            mapping.insert(file.rel, target_rel);
        }

        store.persist(&mapping)?;
        let reloaded = store.load()?;

        tracing::info!(
            files = stats.files_digested,
            bytes = stats.bytes_written,
            manifest = %store.path().display(),
            "digest complete"
        );
        self.set_mapping(reloaded);
        Ok(stats)
    }
}

/// Whether a scanned file is an original asset to fingerprint.
fn is_asset(file: &DirFile, manifest_name: &str, registry: &HashSet<&str>) -> bool {
    let name = file.name();
    file.rel != manifest_name
        && !is_scratch_name(name)
        && !is_fingerprinted_name(name)
        && !registry.contains(file.rel.as_str())
}

/// Stream an asset into a scratch sibling and rename it to its fingerprinted
/// name, keeping the source's permissions.
///
/// Returns the fingerprinted relative path and the bytes written.
fn write_copy(base_dir: &Path, file: &DirFile) -> Result<(String, u64)> {
    let dir = file
        .path
        .parent()
        .ok_or_else(|| Error::invalid_path(&file.path, "asset path has no parent"))?;

    let mut source = fs::File::open(&file.path)?;
    let mut temp_file = scratch_file_in(dir)?;
    let (fingerprint, size) = Fingerprint::copy_from(&mut source, &mut temp_file)?;
    temp_file.flush()?;
    fs::set_permissions(temp_file.path(), source.metadata()?.permissions())?;

    let target_rel = fingerprinted_path(&file.rel, &fingerprint);
    temp_file.persist(key_to_path(base_dir, &target_rel))?;
    Ok((target_rel, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::is_manifest_name;
    use tempfile::TempDir;

    fn hex(data: &[u8]) -> String {
        Fingerprint::of_bytes(data).to_hex()
    }

    fn count_files(dir: &Path) -> usize {
        walk_files(dir).unwrap().len()
    }

    fn manifest_names(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| is_manifest_name(n))
            .collect()
    }

    #[test]
    fn test_digest_example_layout() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("images")).unwrap();
        fs::write(root.join("app.js"), b"X").unwrap();
        fs::write(root.join("images/logo.png"), b"Y").unwrap();

        let mut manifest = Manifest::open(root).unwrap();
        let stats = manifest.digest().unwrap();

        let app = format!("app-{}.js", hex(b"X"));
        let logo = format!("images/logo-{}.png", hex(b"Y"));

        assert_eq!(stats.files_digested, 2);
        assert_eq!(stats.bytes_written, 2);
        assert!(root.join("app.js").exists());
        assert!(root.join(&app).exists());
        assert!(root.join("images/logo.png").exists());
        assert!(root.join(&logo).exists());
        assert_eq!(fs::read(root.join(&app)).unwrap(), b"X");

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(manifest.manifest_path()).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({ "app.js": app, "images/logo.png": logo })
        );

        assert_eq!(manifest.asset("app.js"), Some(app.as_str()));
        assert_eq!(manifest.asset("missing.js"), None);
    }

    #[test]
    fn test_digest_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("app.js"), b"same").unwrap();

        let mut manifest = Manifest::open(temp_dir.path()).unwrap();
        manifest.digest().unwrap();
        let first = manifest.mapping().clone();
        manifest.digest().unwrap();

        assert_eq!(&first, manifest.mapping());
        assert_eq!(count_files(temp_dir.path()), 3);
    }

    #[test]
    fn test_digest_detects_change_and_keeps_orphan() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("app.js"), b"X").unwrap();

        let mut manifest = Manifest::open(root).unwrap();
        manifest.digest().unwrap();
        let old = manifest.asset("app.js").unwrap().to_string();

        fs::write(root.join("app.js"), b"Z").unwrap();
        manifest.digest().unwrap();
        let new = manifest.asset("app.js").unwrap().to_string();

        assert_ne!(old, new);
        assert_eq!(new, format!("app-{}.js", hex(b"Z")));
        assert_eq!(fs::read(root.join(&old)).unwrap(), b"X");
        assert_eq!(fs::read(root.join(&new)).unwrap(), b"Z");
    }

    #[test]
    fn test_digest_skips_fingerprinted_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let existing = "app-523a40ea7f96cd5740980e61d62dbc77.js";
        fs::write(root.join(existing), b"old").unwrap();

        let mut manifest = Manifest::open(root).unwrap();
        let stats = manifest.digest().unwrap();

        assert_eq!(stats.files_digested, 0);
        assert!(manifest.mapping().is_empty());
        assert!(root.join(existing).exists());
        // The fingerprinted file plus the manifest
        assert_eq!(count_files(root), 2);
    }

    #[test]
    fn test_digest_skips_registered_names() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("app.js"), b"X").unwrap();
        fs::write(root.join("app.v2.js"), b"copy").unwrap();
        fs::write(
            root.join(".manifest-869269cdf1773ff0dec91bafb37310ea.json"),
            r#"{"app.js": "app.v2.js"}"#,
        )
        .unwrap();

        let mut manifest = Manifest::open(root).unwrap();
        manifest.digest().unwrap();

        assert!(manifest.asset("app.v2.js").is_none());
        assert_eq!(
            manifest.asset("app.js"),
            Some(format!("app-{}.js", hex(b"X")).as_str())
        );
    }

    #[test]
    fn test_digest_drops_deleted_assets() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.js"), b"A").unwrap();
        fs::write(root.join("b.js"), b"B").unwrap();

        let mut manifest = Manifest::open(root).unwrap();
        manifest.digest().unwrap();
        let b_copy = manifest.asset("b.js").unwrap().to_string();

        fs::remove_file(root.join("b.js")).unwrap();
        manifest.digest().unwrap();

        assert_eq!(manifest.mapping().len(), 1);
        assert!(manifest.asset("b.js").is_none());
        assert!(root.join(&b_copy).exists());
    }

    #[test]
    fn test_digest_extensionless_and_dotfiles() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("LICENSE"), b"L").unwrap();
        fs::write(root.join(".htaccess"), b"H").unwrap();
        fs::write(root.join("bundle.min.js"), b"M").unwrap();

        let mut manifest = Manifest::open(root).unwrap();
        manifest.digest().unwrap();

        assert_eq!(
            manifest.asset("LICENSE"),
            Some(format!("LICENSE-{}", hex(b"L")).as_str())
        );
        assert_eq!(
            manifest.asset(".htaccess"),
            Some(format!(".htaccess-{}", hex(b"H")).as_str())
        );
        assert_eq!(
            manifest.asset("bundle.min.js"),
            Some(format!("bundle.min-{}.js", hex(b"M")).as_str())
        );
    }

    #[test]
    fn test_digest_overwrites_existing_target() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("app.js"), b"X").unwrap();
        let target = root.join(format!("app-{}.js", hex(b"X")));
        fs::write(&target, b"tampered").unwrap();

        let mut manifest = Manifest::open(root).unwrap();
        manifest.digest().unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"X");
    }

    #[test]
    fn test_digest_after_nuke_by_other_handle_adopts_new_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("app.js"), b"X").unwrap();

        let mut stale = Manifest::open(root).unwrap();
        let other = Manifest::open(root).unwrap();
        other.nuke().unwrap();
        let fresh = Manifest::open(root).unwrap();
        assert_ne!(stale.manifest_path(), fresh.manifest_path());

        stale.digest().unwrap();

        assert_eq!(manifest_names(root).len(), 1);
        assert_eq!(stale.manifest_path(), fresh.manifest_path());
        assert!(fresh.manifest_path().is_file());
        assert_eq!(
            stale.asset("app.js"),
            Some(format!("app-{}.js", hex(b"X")).as_str())
        );
    }

    #[test]
    fn test_digest_recreates_removed_manifest_with_new_token() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("app.js"), b"X").unwrap();

        let mut manifest = Manifest::open(root).unwrap();
        let old_path = manifest.manifest_path().to_path_buf();
        fs::remove_file(&old_path).unwrap();
        manifest.digest().unwrap();

        assert!(!old_path.exists());
        assert!(manifest.manifest_path().is_file());
        assert_eq!(manifest_names(root).len(), 1);
        assert_eq!(manifest.mapping().len(), 1);
    }

    #[test]
    fn test_digest_failed_copy_keeps_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.js"), b"A").unwrap();
        fs::write(root.join("b.js"), b"B").unwrap();

        let mut manifest = Manifest::open(root).unwrap();
        manifest.digest().unwrap();
        let before = manifest.mapping().clone();
        let raw_before = fs::read(manifest.manifest_path()).unwrap();

        // A directory where the new copy of b.js has to go
        fs::write(root.join("b.js"), b"B2").unwrap();
        fs::create_dir(root.join(format!("b-{}.js", hex(b"B2")))).unwrap();

        assert!(manifest.digest().is_err());
        assert_eq!(fs::read(manifest.manifest_path()).unwrap(), raw_before);
        assert_eq!(manifest.mapping(), &before);
        assert!(
            fs::read_dir(root)
                .unwrap()
                .all(|e| !is_scratch_name(&e.unwrap().file_name().to_string_lossy()))
        );
    }

    #[test]
    fn test_digest_ignores_scratch_leftovers() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join(".sigil-abc123.tmp"), b"partial").unwrap();
        fs::write(root.join("app.js"), b"X").unwrap();

        let mut manifest = Manifest::open(root).unwrap();
        manifest.digest().unwrap();

        assert_eq!(manifest.mapping().len(), 1);
    }

    #[test]
    fn test_digest_corrupt_manifest_keeps_state() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("app.js"), b"X").unwrap();

        let mut manifest = Manifest::open(root).unwrap();
        manifest.digest().unwrap();
        let before = manifest.mapping().clone();

        fs::write(manifest.manifest_path(), "garbage").unwrap();
        assert!(matches!(manifest.digest(), Err(Error::ManifestParse { .. })));
        assert_eq!(manifest.mapping(), &before);
    }

    #[test]
    #[cfg(unix)]
    fn test_digest_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let source = root.join("app.js");
        fs::write(&source, b"X").unwrap();
        fs::set_permissions(&source, fs::Permissions::from_mode(0o644)).unwrap();

        let mut manifest = Manifest::open(root).unwrap();
        manifest.digest().unwrap();

        let copy = root.join(manifest.asset("app.js").unwrap());
        let mode = fs::metadata(copy).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
