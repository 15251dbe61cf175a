//! Content fingerprints using BLAKE3.

use crate::error::Result;
use std::fmt;
use std::io::{ErrorKind, Read, Write};

/// Fingerprint size in bytes (128 bits, rendered as 32 hex characters).
pub const FINGERPRINT_SIZE: usize = 16;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// A 128-bit content fingerprint.
///
/// Computed as the first 16 bytes of the BLAKE3 extended output over the raw
/// file bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_SIZE]);

impl Fingerprint {
    /// Convert to hex string (32 lowercase characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Fingerprint raw bytes.
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(data);
        Self::finish(&hasher)
    }

    /// Stream `reader` into `writer`, fingerprinting the bytes on the way.
    ///
    /// Returns the fingerprint and the number of bytes copied. The data is
    /// read once, so the fingerprint always describes exactly what was
    /// written.
    pub fn copy_from<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> Result<(Self, u64)> {
        let mut hasher = blake3::Hasher::new();
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut copied = 0u64;

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            hasher.update(&buf[..n]);
            writer.write_all(&buf[..n])?;
            copied += n as u64;
        }

        Ok((Self::finish(&hasher), copied))
    }

    fn finish(hasher: &blake3::Hasher) -> Self {
        let mut out = [0u8; FINGERPRINT_SIZE];
        hasher.finalize_xof().fill(&mut out);
        Fingerprint(out)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}
