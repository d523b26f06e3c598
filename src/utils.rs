//! Utility functions for snaptrack
//!
//! File hashing and atomic writes shared by the scanner and the snapshot
//! store.

use crate::error::Result;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Length of a content hash in hex characters (128-bit digest)
pub const HASH_HEX_LEN: usize = 32;

/// Hash a file's content with MD5
///
/// The file is streamed through an 8KB buffer so large files never sit in
/// memory whole. Returns 32 lowercase hex characters.
///
/// # Errors
///
/// - [`SnaptrackError::Io`](crate::SnaptrackError::Io) if the file cannot be opened or read
pub fn hash_file_content(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hash in-memory data with MD5
pub fn hash_data(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Check that a string looks like a content hash produced by this crate
pub fn is_content_hash(value: &str) -> bool {
    value.len() == HASH_HEX_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Atomic file write (write to temp file then rename)
///
/// The temporary file is created next to the target so the final rename
/// never crosses filesystems. Readers see either the old file or the
/// complete new one.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
