//! Content-addressed fingerprinting.
//!
//! A directory fingerprint is the SHA-256 of its sorted `relpath|size|mtime`
//! manifest, not of file contents — cheap enough to run on every scan pass.
//! A single-file fingerprint hashes the file's actual bytes, streamed in
//! fixed-size chunks so memory use does not scale with file size.
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::UNIX_EPOCH;
use thiserror::Error;

const CHUNK_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("io error fingerprinting {path}: {source}")]
    Io { path: String, #[source] source: io::Error },
}

impl FingerprintError {
    fn io(path: &Path, source: io::Error) -> Self {
        FingerprintError::Io { path: path.display().to_string(), source }
    }
}

/// Fingerprint a directory tree: walk it recursively, collect
/// `(relpath, size_bytes, mtime_epoch_s)` for every regular file and every
/// symlink (via its own `lstat` metadata, never the target it points at),
/// sort by relpath, and hash the newline-joined `relpath|size|mtime` records
/// in that order.
pub fn fingerprint_dir(root: &Path) -> Result<String, FingerprintError> {
    let mut entries = Vec::new();
    walk(root, root, &mut entries)?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (relpath, size, mtime) in &entries {
        hasher.update(format!("{}|{}|{}\n", relpath, size, mtime).as_bytes());
    }
    Ok(hex::encode(hasher.finalize()))
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<(String, u64, i64)>) -> Result<(), FingerprintError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| FingerprintError::io(dir, e))?;
    for entry in read_dir {
        let entry = entry.map_err(|e| FingerprintError::io(dir, e))?;
        let path = entry.path();
        let metadata = entry.metadata().map_err(|e| FingerprintError::io(&path, e))?;

        if metadata.is_dir() {
            walk(root, &path, out)?;
        } else if metadata.is_file() || metadata.is_symlink() {
            // A symlink's own lstat metadata is recorded, not the target it
            // points at — the link is never followed.
            let relpath = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");
            let size = metadata.len();
            let mtime = metadata
                .modified()
                .map_err(|e| FingerprintError::io(&path, e))?
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            out.push((relpath, size, mtime));
        }
    }
    Ok(())
}

/// Fingerprint a single file's contents, streamed in 4 KiB chunks.
pub fn fingerprint_file(path: &Path) -> Result<String, FingerprintError> {
    let mut file = File::open(path).map_err(|e| FingerprintError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(|e| FingerprintError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
