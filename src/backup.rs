//! Backup naming, enumeration, and retention.
//!
//! A backup is a sibling of its target named
//! `<target-filename>.backup.<YYYYMMDD-HHMMSS>`. The timestamp is fixed-width
//! and zero-padded, so lexicographic order over backup names equals
//! chronological order. That property is load-bearing: retention and rollback
//! both sort by the embedded timestamp string, nothing else.
//!
//! Retention keeps the `keep` most recent backups per target (default 5) and
//! deletes the rest, oldest first. A failed delete is logged and skipped;
//! pruning never aborts the render that triggered it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::warn;

use crate::error::Result;
use crate::writer::TargetWriter;

/// Infix between the target filename and the timestamp.
pub const BACKUP_INFIX: &str = ".backup.";

/// Timestamp layout embedded in backup names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Number of backups retained per target unless the caller overrides it.
pub const DEFAULT_KEEP: usize = 5;

/// A single backup file, identified by path and embedded timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub timestamp: String,
}

/// Outcome of a prune pass. `failed` lists backups that could not be deleted;
/// they stay on disk and will be retried by the next prune.
#[derive(Debug, Default)]
pub struct PruneReport {
    pub examined: usize,
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Current local time in backup-name form.
pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Backup path for `target` at `timestamp`.
pub fn backup_path(target: &Path, timestamp: &str) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(BACKUP_INFIX);
    name.push(timestamp);
    target.with_file_name(name)
}

/// Check that `s` is a well-formed `YYYYMMDD-HHMMSS` timestamp: exact width,
/// zero-padded digits, and an actual calendar date-time.
pub fn is_valid_timestamp(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 15 || bytes[8] != b'-' {
        return false;
    }
    if !bytes[..8].iter().all(u8::is_ascii_digit) || !bytes[9..].iter().all(u8::is_ascii_digit) {
        return false;
    }
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).is_ok()
}

/// Enumerate backups for `target`, sorted oldest first.
///
/// Only names matching the exact pattern count; anything else in the
/// directory is ignored. A missing directory means no backups.
pub fn list_backups(target: &Path) -> Result<Vec<BackupEntry>> {
    let Some(dir) = target.parent() else {
        return Ok(Vec::new());
    };
    let Some(file_name) = target.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let prefix = format!("{}{}", file_name, BACKUP_INFIX);
    let mut entries = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(timestamp) = name.strip_prefix(&prefix) else {
            continue;
        };
        if is_valid_timestamp(timestamp) {
            entries.push(BackupEntry {
                path: entry.path(),
                timestamp: timestamp.to_string(),
            });
        }
    }

    // Fixed-width timestamps: string order is chronological order.
    entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    Ok(entries)
}

/// Most recent backup for `target`, if any.
pub fn latest_backup(target: &Path) -> Result<Option<BackupEntry>> {
    Ok(list_backups(target)?.pop())
}

/// Delete the oldest backups of `target` until at most `keep` remain.
///
/// Idempotent: with no new backups, a second pass deletes nothing. Individual
/// delete failures are warnings, not errors.
pub fn prune(writer: &dyn TargetWriter, target: &Path, keep: usize) -> Result<PruneReport> {
    let backups = list_backups(target)?;
    let mut report = PruneReport {
        examined: backups.len(),
        ..Default::default()
    };

    let excess = backups.len().saturating_sub(keep);
    for entry in &backups[..excess] {
        match writer.remove_file(&entry.path) {
            Ok(()) => report.deleted.push(entry.path.clone()),
            Err(e) => {
                warn!("failed to prune backup {}: {}", entry.path.display(), e);
                report.failed.push(entry.path.clone());
            }
        }
    }

    Ok(report)
}
