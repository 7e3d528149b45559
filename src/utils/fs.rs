//! File system utilities for provisioning.
//!
//! Every file the installer makes visible in the staged tree or in a
//! repository goes through a scratch file in the same directory first and is
//! then renamed over the target, so a reader never sees half-written content.
//! This is per file only: an artifact and its POM are two independent
//! operations.
//!
//! # Examples
//!
//! ```rust
//! use fpkit::utils::fs::{ensure_dir, atomic_write, calculate_checksum};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! ensure_dir(Path::new("target/staging"))?;
//! atomic_write(Path::new("target/staging/module.xml"), b"<module/>")?;
//! let checksum = calculate_checksum(Path::new("target/staging/module.xml"))?;
//! println!("{checksum}");
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Ensures a directory exists, creating it and all parent directories if necessary.
///
/// Fails if the path exists but is not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            format!("Failed to create directory: {}\n\nCheck directory permissions and path validity", path.display())
        })?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Creates the parent directory of `path` if it has one.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }
    Ok(())
}

/// Scratch path next to `target`, so the final rename never crosses file systems.
fn scratch_path(target: &Path) -> PathBuf {
    let name = target.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    target.with_file_name(format!(".{name}.fpkit-tmp"))
}

/// Writes `content` to `path` through a scratch file and a rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;
    let temp_path = scratch_path(path);

    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        file.write_all(content).with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;
        file.sync_all().with_context(|| "Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path).with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;
    Ok(())
}

/// Copies `src` to `dst`, replacing any existing file, through a scratch file.
pub fn copy_replacing(src: &Path, dst: &Path) -> Result<()> {
    ensure_parent_dir(dst)?;
    let temp_path = scratch_path(dst);

    fs::copy(src, &temp_path)
        .with_context(|| format!("Failed to copy file from {} to {}", src.display(), temp_path.display()))?;
    fs::rename(&temp_path, dst).with_context(|| format!("Failed to rename temp file to: {}", dst.display()))?;
    Ok(())
}

/// Recursively removes a directory; a missing directory is not an error.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path).with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Deletes the file at `path` if there is one.
pub fn remove_file(path: &Path) -> Result<()> {
    if path.is_file() {
        fs::remove_file(path).with_context(|| format!("Failed to remove file: {}", path.display()))?;
    }
    Ok(())
}

/// Deletes `path` if it exists and recreates it empty.
pub fn recreate_dir(path: &Path) -> Result<()> {
    remove_dir_all(path)?;
    ensure_dir(path)
}

/// Calculates the SHA-256 checksum of a file as lowercase hex.
pub fn calculate_checksum(path: &Path) -> Result<String> {
    let content = fs::read(path).with_context(|| format!("Failed to read file for checksum: {}", path.display()))?;

    let mut hasher = Sha256::new();
    hasher.update(&content);
    let result = hasher.finalize();

    Ok(hex::encode(result))
}

/// Renders `path` relative to `base` with forward slashes.
///
/// Paths outside `base` are rendered in full.
pub fn relative_display(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    if relative.has_root() {
        return relative.display().to_string();
    }
    relative.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/")
}
