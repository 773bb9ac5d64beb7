//! Migration directory digest
//!
//! The digest is a SHA-256 over a version tag followed by, for every regular
//! non-hidden file under the directory (recursive, sorted by relative path):
//! the relative path, a NUL byte, the content length as little-endian `u64`,
//! and the content. Relative paths use `/` on every platform.
//!
//! Paths are part of the input, so renaming a migration changes the digest.
//! Modification times are not.

use crate::error::SchemaError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const DIGEST_TAG: &[u8] = b"lifeguard-schema/migrations/v1\n";

/// Digest of a missing or empty migration directory
pub fn empty_digest() -> String {
    let mut hasher = Sha256::new();
    hasher.update(DIGEST_TAG);
    format!("{:x}", hasher.finalize())
}

/// Compute the digest of `migrations_dir`
///
/// # Errors
///
/// Returns `SchemaError::Io` if the directory exists but a directory entry or
/// file cannot be read.
pub fn migrations_digest(migrations_dir: &Path) -> Result<String, SchemaError> {
    if !migrations_dir.is_dir() {
        return Ok(empty_digest());
    }

    let mut files = Vec::new();
    collect_files(migrations_dir, migrations_dir, &mut files)?;
    files.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut hasher = Sha256::new();
    hasher.update(DIGEST_TAG);
    for (relative, path) in &files {
        let content = fs::read(path).map_err(|e| SchemaError::io(path, e))?;
        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(&content);
    }

    log::debug!(
        "Digested {} migration files under {}",
        files.len(),
        migrations_dir.display()
    );
    Ok(format!("{:x}", hasher.finalize()))
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> Result<(), SchemaError> {
    let entries = fs::read_dir(dir).map_err(|e| SchemaError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| SchemaError::io(dir, e))?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| SchemaError::io(&path, e))?;
        if file_type.is_dir() {
            collect_files(root, &path, out)?;
        } else if file_type.is_file() {
            out.push((relative_path(root, &path), path));
        }
    }
    Ok(())
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
