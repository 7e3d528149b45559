//! Shared utilities: scratch-then-replace file operations, checksums and
//! progress reporting.

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, calculate_checksum, copy_replacing, ensure_dir, ensure_parent_dir, recreate_dir, remove_file};
pub use progress::ProgressBar;

/// Expand a leading `~` in a configured path.
pub fn expand_path(path: &str) -> std::path::PathBuf {
    std::path::PathBuf::from(shellexpand::tilde(path).into_owned())
}
