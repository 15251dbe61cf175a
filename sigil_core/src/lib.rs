//! # Sigil Core
//!
//! Content-hash fingerprinting of static assets with a durable manifest.
//!
//! Given a directory of compiled assets, sigil writes a copy of each file with
//! its content fingerprint embedded in the name (`app.js` becomes
//! `app-<32 hex>.js`) and records the mapping from original to fingerprinted
//! path in a hidden manifest file at the root of the directory. Fingerprinted
//! URLs can then be cached forever, while the originals stay in place.
//!
//! ## Features
//!
//! - Deterministic names: identical bytes always give the identical name
//! - Atomic manifest replacement (write to a scratch file, then rename)
//! - Directory-scoped locking for every mutating operation
//! - Cleanup of files no longer referenced by the manifest
//! - Full reset of all fingerprint-derived state
//!
//! ## Example
//!
//! ```no_run
//! use sigil_core::Manifest;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Find or create the manifest for an asset directory
//! let mut manifest = Manifest::open("./public/assets")?;
//!
//! // Fingerprint every asset and replace the manifest
//! manifest.digest()?;
//!
//! // Resolve an asset for rendering
//! if let Some(path) = manifest.asset("app.js") {
//!     println!("/assets/{}", path);
//! }
//!
//! // Delete fingerprinted copies from earlier runs
//! let stats = manifest.clean(false)?;
//! println!("Deleted {} files", stats.files_deleted);
//! # Ok(())
//! # }
//! ```

mod digest;
mod error;
mod hash;
mod lock;
mod manifest;
pub mod naming;
mod reconcile;
mod store;
mod walk;

pub use digest::DigestStats;
pub use error::{Error, Result};
pub use hash::{FINGERPRINT_SIZE, Fingerprint};
pub use lock::DirLock;
pub use manifest::Manifest;
pub use reconcile::{CleanStats, NukeStats};
pub use store::{AssetManifest, ManifestSelection, ManifestStore};
pub use walk::{DirFile, walk_files};
