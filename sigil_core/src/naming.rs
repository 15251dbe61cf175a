//! File naming rules for manifests and fingerprinted copies.
//!
//! ```text
//! .manifest-<32 hex>.json        manifest file, base directory root only
//! <stem>-<32 hex>.<ext>          fingerprinted copy
//! <stem>-<32 hex>                fingerprinted copy of an extensionless file
//! ```
//!
//! Scratch files written during atomic replaces are named `.sigil-*.tmp`.
//!
//! All hex is lowercase. Matching works on file names, never on full paths.

use crate::hash::{FINGERPRINT_SIZE, Fingerprint};
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

const MANIFEST_PREFIX: &str = ".manifest-";
const MANIFEST_SUFFIX: &str = ".json";
const SCRATCH_PREFIX: &str = ".sigil-";
const SCRATCH_SUFFIX: &str = ".tmp";
const HEX_LEN: usize = FINGERPRINT_SIZE * 2;

fn is_lower_hex(s: &str) -> bool {
    s.len() == HEX_LEN && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Build the manifest file name for a random token.
pub fn manifest_file_name(token: &[u8; FINGERPRINT_SIZE]) -> String {
    format!("{}{}{}", MANIFEST_PREFIX, hex::encode(token), MANIFEST_SUFFIX)
}

/// Anchored match of `.manifest-<32 hex>.json`.
pub fn is_manifest_name(name: &str) -> bool {
    name.strip_prefix(MANIFEST_PREFIX)
        .and_then(|rest| rest.strip_suffix(MANIFEST_SUFFIX))
        .is_some_and(is_lower_hex)
}

/// Scratch file builder placed in `dir`, renamed over its target on success.
pub(crate) fn scratch_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .suffix(SCRATCH_SUFFIX)
        .tempfile_in(dir)
}

/// Leftover scratch file from an interrupted write.
pub fn is_scratch_name(name: &str) -> bool {
    name.starts_with(SCRATCH_PREFIX) && name.ends_with(SCRATCH_SUFFIX)
}

/// Heuristic test for a fingerprinted file name.
///
/// True when the name contains `-` followed by exactly 32 lowercase hex
/// characters that are followed by a literal `.` or end the name.
pub fn is_fingerprinted_name(name: &str) -> bool {
    name.match_indices('-').any(|(idx, _)| {
        let rest = &name[idx + 1..];
        match rest.get(..HEX_LEN) {
            Some(candidate) if is_lower_hex(candidate) => {
                let tail = &rest[HEX_LEN..];
                tail.is_empty() || tail.starts_with('.')
            }
            _ => false,
        }
    })
}

/// Split a file name into stem and extension (extension includes its dot).
///
/// The extension is the last dot-delimited segment. A leading dot does not
/// start an extension, so `.htaccess` has none.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Fingerprinted file name: `-<hex>` inserted before the extension.
pub fn fingerprinted_file_name(name: &str, fingerprint: &Fingerprint) -> String {
    let (stem, ext) = split_extension(name);
    format!("{}-{}{}", stem, fingerprint.to_hex(), ext)
}

/// Fingerprinted relative path, keeping the directory part unchanged.
///
/// Paths are POSIX-style (`/` separated) manifest keys.
pub fn fingerprinted_path(rel_path: &str, fingerprint: &Fingerprint) -> String {
    match rel_path.rsplit_once('/') {
        Some((dir, name)) => format!("{}/{}", dir, fingerprinted_file_name(name, fingerprint)),
        None => fingerprinted_file_name(rel_path, fingerprint),
    }
}
