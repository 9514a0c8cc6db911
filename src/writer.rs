//! Filesystem mutation capability.
//!
//! Every write the engine performs against a live target goes through the
//! `TargetWriter` trait. Privilege is a property of the caller: whoever
//! constructs the engine decides what may touch the filesystem, so the
//! requirement shows up in the interface instead of being buried in control
//! flow. Writing under `/etc` simply requires running the process with
//! sufficient privilege; the engine never escalates on its own.
//!
//! Atomic replacement is two capability calls: `write_temp` stages the new
//! content in the target's directory (same filesystem, so the rename cannot
//! degrade into a copy), then `rename` swaps it into place. Readers observe
//! either the old file or the complete new one, never a partial write.
//!
//! Two implementations:
//!
//! - `DirectWriter`: real filesystem access with the process's own privilege.
//! - `DryRunWriter`: logs each mutation and performs none of them. Reads are
//!   not routed through this trait, so dry-run previews still reflect the
//!   real current state of the host.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;

/// Mutation surface for target files and their backups.
pub trait TargetWriter {
    /// Create `dir` and any missing parents. Idempotent.
    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    /// Copy `from` to `to`, overwriting `to` if it exists.
    fn copy_snapshot(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Stage `contents` in a new uniquely-named file inside `dir` and return
    /// its path. The file is durable (synced) when this returns.
    fn write_temp(&self, dir: &Path, contents: &[u8]) -> io::Result<PathBuf>;

    /// Atomically rename `from` onto `to`, replacing any existing file.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Delete a single file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Whether this writer actually mutates the filesystem.
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Writes directly with the privilege of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectWriter;

impl TargetWriter for DirectWriter {
    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    fn copy_snapshot(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn write_temp(&self, dir: &Path, contents: &[u8]) -> io::Result<PathBuf> {
        // NamedTempFile::new_in gives a random name with O_EXCL, so
        // concurrent stages in the same directory cannot collide.
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(contents)?;
        temp.as_file_mut().sync_all()?;
        let (_, path) = temp.keep().map_err(|e| e.error)?;
        Ok(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Logs every mutation instead of performing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunWriter;

impl TargetWriter for DryRunWriter {
    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        info!("dry-run: would create directory {}", dir.display());
        Ok(())
    }

    fn copy_snapshot(&self, from: &Path, to: &Path) -> io::Result<()> {
        info!(
            "dry-run: would copy {} -> {}",
            from.display(),
            to.display()
        );
        Ok(())
    }

    fn write_temp(&self, dir: &Path, contents: &[u8]) -> io::Result<PathBuf> {
        let staged = dir.join(format!(".confdeploy-dryrun.{}", std::process::id()));
        info!(
            "dry-run: would stage {} bytes in {}",
            contents.len(),
            dir.display()
        );
        Ok(staged)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        info!(
            "dry-run: would rename {} -> {}",
            from.display(),
            to.display()
        );
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        info!("dry-run: would delete {}", path.display());
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}
