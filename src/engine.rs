//! The deployment engine: render and rollback.
//!
//! `Engine` ties the pieces together: an immutable substitution environment,
//! a `TargetWriter` capability, and a backup retention limit. A render is a
//! fixed sequence (locate template, ensure the target directory, snapshot
//! the live target, prune old snapshots, substitute, stage, atomic rename)
//! and any fatal step leaves the target byte-for-byte at its pre-call state.
//!
//! Rollback restores the most recent backup with the same staged-rename
//! guarantee the render path uses, and never deletes the backup it restored
//! from, so it is repeatable.
//!
//! # Known limitation
//!
//! There is no cross-process locking. Two engine invocations racing on the
//! same target can interleave the snapshot-then-rename sequence; callers are
//! expected to serialize runs against a host (one deployment at a time).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::backup::{self, DEFAULT_KEEP};
use crate::environment::Environment;
use crate::error::{DeployError, Result};
use crate::template::Template;
use crate::writer::{DirectWriter, TargetWriter};

/// Result of a successful render.
#[derive(Debug)]
pub struct RenderOutcome {
    /// The target file that was (re)written.
    pub target: PathBuf,
    /// Backup taken of the previous target content, when one was made.
    pub backup: Option<PathBuf>,
    /// Old backups deleted by the retention pass.
    pub pruned: usize,
}

/// Which stage of the staged-rename replacement failed.
enum ReplaceError {
    Stage(io::Error),
    Rename(io::Error),
}

/// Configuration deployment engine.
pub struct Engine {
    env: Environment,
    writer: Box<dyn TargetWriter>,
    keep: usize,
}

impl Engine {
    /// Engine with direct filesystem access and the default retention limit.
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            writer: Box::new(DirectWriter),
            keep: DEFAULT_KEEP,
        }
    }

    /// Replace the writer capability (e.g. `DryRunWriter`).
    pub fn with_writer(mut self, writer: Box<dyn TargetWriter>) -> Self {
        self.writer = writer;
        self
    }

    /// Override how many backups to retain per target.
    pub fn with_keep(mut self, keep: usize) -> Self {
        self.keep = keep;
        self
    }

    /// The environment this engine substitutes from.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Render `template` over `target`.
    ///
    /// With `backup_enabled`, an existing target is first copied to a
    /// timestamped sibling and old backups are pruned down to the retention
    /// limit. A backup failure aborts the render before anything is written;
    /// a prune failure is logged and does not.
    pub fn render<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        template: P,
        target: Q,
        backup_enabled: bool,
    ) -> Result<RenderOutcome> {
        let target = target.as_ref();
        let template = Template::load(template)?;
        info!(
            "rendering {} -> {}",
            template.path().display(),
            target.display()
        );

        let dir = target.parent().ok_or_else(|| {
            DeployError::render(target, "target has no parent directory")
        })?;
        self.writer.create_dir_all(dir).map_err(|e| {
            DeployError::render(
                target,
                format!("cannot create directory {}: {}", dir.display(), e),
            )
        })?;

        let mut backup_taken = None;
        let mut pruned = 0;
        if backup_enabled && target.exists() {
            let bpath = backup::backup_path(target, &backup::timestamp_now());
            self.writer
                .copy_snapshot(target, &bpath)
                .map_err(|source| DeployError::BackupFailed {
                    path: target.to_path_buf(),
                    source,
                })?;
            debug!("backed up {} -> {}", target.display(), bpath.display());

            // Retention runs right after a successful backup. Its failures
            // never abort the render.
            match backup::prune(self.writer.as_ref(), target, self.keep) {
                Ok(report) => pruned = report.deleted.len(),
                Err(e) => warn!("backup pruning for {} failed: {}", target.display(), e),
            }
            backup_taken = Some(bpath);
        }

        let content = template.render(&self.env);
        match self.replace_atomic(dir, target, content.as_bytes()) {
            Ok(()) => {}
            Err(ReplaceError::Stage(e)) => {
                return Err(DeployError::render(
                    target,
                    format!("cannot stage new content: {}", e),
                ));
            }
            Err(ReplaceError::Rename(source)) => {
                return Err(DeployError::AtomicMoveFailed {
                    path: target.to_path_buf(),
                    source,
                });
            }
        }

        info!("rendered {} ({} bytes)", target.display(), content.len());
        Ok(RenderOutcome {
            target: target.to_path_buf(),
            backup: backup_taken,
            pruned,
        })
    }

    /// Restore the most recent backup over `target`.
    ///
    /// The backup is kept afterwards; rolling back twice in a row restores
    /// the same content twice.
    pub fn rollback<P: AsRef<Path>>(&self, target: P) -> Result<PathBuf> {
        let target = target.as_ref();
        let entry = backup::latest_backup(target)?.ok_or_else(|| DeployError::NoBackupFound {
            path: target.to_path_buf(),
        })?;
        info!(
            "rolling back {} from {}",
            target.display(),
            entry.path.display()
        );

        let content = fs::read(&entry.path).map_err(|e| {
            DeployError::rollback(target, format!("cannot read backup {}: {}", entry.path.display(), e))
        })?;
        let dir = target.parent().ok_or_else(|| {
            DeployError::rollback(target, "target has no parent directory")
        })?;

        self.replace_atomic(dir, target, &content)
            .map_err(|e| match e {
                ReplaceError::Stage(e) => {
                    DeployError::rollback(target, format!("cannot stage backup content: {}", e))
                }
                ReplaceError::Rename(e) => {
                    DeployError::rollback(target, format!("cannot replace target: {}", e))
                }
            })?;

        Ok(entry.path)
    }

    /// Prune old backups for `target`, keeping the `keep` most recent.
    pub fn prune<P: AsRef<Path>>(&self, target: P, keep: usize) -> Result<backup::PruneReport> {
        backup::prune(self.writer.as_ref(), target.as_ref(), keep)
    }

    /// Stage `contents` next to `target` and rename it into place. On rename
    /// failure the staged file is removed; the target is never left partial.
    fn replace_atomic(
        &self,
        dir: &Path,
        target: &Path,
        contents: &[u8],
    ) -> std::result::Result<(), ReplaceError> {
        let staged = self
            .writer
            .write_temp(dir, contents)
            .map_err(ReplaceError::Stage)?;

        if let Err(e) = self.writer.rename(&staged, target) {
            if let Err(rm) = self.writer.remove_file(&staged) {
                warn!(
                    "could not clean up staged file {}: {}",
                    staged.display(),
                    rm
                );
            }
            return Err(ReplaceError::Rename(e));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::list_backups;
    use crate::writer::DryRunWriter;
    use tempfile::tempdir;

    fn engine() -> Engine {
        Engine::new(Environment::from_pairs([
            ("PORT", "8443"),
            ("HOST", "vps01"),
        ]))
    }

    fn write_template(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_render_fresh_target_no_backup() {
        let dir = tempdir().unwrap();
        let template = write_template(dir.path(), "app.conf.tmpl", "port=${PORT}\n");
        let target = dir.path().join("app.conf");

        let outcome = engine().render(&template, &target, true).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "port=8443\n");
        // No prior target, so nothing to back up
        assert!(outcome.backup.is_none());
        assert!(list_backups(&target).unwrap().is_empty());
    }

    #[test]
    fn test_render_backs_up_existing_target() {
        let dir = tempdir().unwrap();
        let template = write_template(dir.path(), "app.conf.tmpl", "port=${PORT}\n");
        let target = dir.path().join("app.conf");
        fs::write(&target, "port=80\n").unwrap();

        let outcome = engine().render(&template, &target, true).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "port=8443\n");

        let backup = outcome.backup.expect("backup should be taken");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "port=80\n");
    }

    #[test]
    fn test_render_backup_disabled() {
        let dir = tempdir().unwrap();
        let template = write_template(dir.path(), "app.conf.tmpl", "port=${PORT}\n");
        let target = dir.path().join("app.conf");
        fs::write(&target, "port=80\n").unwrap();

        let outcome = engine().render(&template, &target, false).unwrap();
        assert!(outcome.backup.is_none());
        assert!(list_backups(&target).unwrap().is_empty());
        assert_eq!(fs::read_to_string(&target).unwrap(), "port=8443\n");
    }

    #[test]
    fn test_render_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let template = write_template(dir.path(), "app.conf.tmpl", "host=${HOST}\n");
        let target = dir.path().join("etc/deep/nested/app.conf");

        engine().render(&template, &target, true).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "host=vps01\n");
    }

    #[test]
    fn test_render_missing_template_no_effects() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("app.conf");
        fs::write(&target, "original").unwrap();

        let err = engine()
            .render(dir.path().join("missing.tmpl"), &target, true)
            .unwrap_err();
        assert!(matches!(err, DeployError::TemplateNotFound { .. }));
        // Target untouched, no backup created
        assert_eq!(fs::read_to_string(&target).unwrap(), "original");
        assert!(list_backups(&target).unwrap().is_empty());
    }

    #[test]
    fn test_rollback_restores_pre_render_content() {
        let dir = tempdir().unwrap();
        let template = write_template(dir.path(), "app.conf.tmpl", "port=${PORT}\n");
        let target = dir.path().join("app.conf");
        fs::write(&target, "port=80\n").unwrap();

        let eng = engine();
        eng.render(&template, &target, true).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "port=8443\n");

        let used = eng.rollback(&target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "port=80\n");
        // Rollback is non-destructive: the backup survives
        assert!(used.exists());
    }

    #[test]
    fn test_rollback_is_repeatable() {
        let dir = tempdir().unwrap();
        let template = write_template(dir.path(), "app.conf.tmpl", "port=${PORT}\n");
        let target = dir.path().join("app.conf");
        fs::write(&target, "port=80\n").unwrap();

        let eng = engine();
        eng.render(&template, &target, true).unwrap();
        eng.rollback(&target).unwrap();
        eng.rollback(&target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "port=80\n");
    }

    #[test]
    fn test_rollback_without_backups() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("app.conf");
        fs::write(&target, "untouched").unwrap();

        let err = engine().rollback(&target).unwrap_err();
        assert!(matches!(err, DeployError::NoBackupFound { .. }));
        assert_eq!(fs::read_to_string(&target).unwrap(), "untouched");
    }

    #[test]
    fn test_repeated_renders_respect_retention() {
        let dir = tempdir().unwrap();
        let template = write_template(dir.path(), "app.conf.tmpl", "port=${PORT}\n");
        let target = dir.path().join("app.conf");
        fs::write(&target, "port=80\n").unwrap();

        let eng = engine().with_keep(3);
        // Backup names carry second-resolution timestamps; pre-seed distinct
        // older backups instead of sleeping between renders.
        for day in 1..=6 {
            let ts = format!("2026010{}-000000", day);
            fs::write(
                backup::backup_path(&target, &ts),
                format!("gen{}", day),
            )
            .unwrap();
        }

        eng.render(&template, &target, true).unwrap();
        let remaining = list_backups(&target).unwrap();
        assert_eq!(remaining.len(), 3);
        // The freshly-taken backup is the newest of the survivors
        assert_eq!(
            fs::read_to_string(&remaining.last().unwrap().path).unwrap(),
            "port=80\n"
        );
    }

    #[test]
    fn test_dry_run_render_leaves_everything_untouched() {
        let dir = tempdir().unwrap();
        let template = write_template(dir.path(), "app.conf.tmpl", "port=${PORT}\n");
        let target = dir.path().join("app.conf");
        fs::write(&target, "port=80\n").unwrap();

        let eng = Engine::new(Environment::from_pairs([("PORT", "8443")]))
            .with_writer(Box::new(DryRunWriter));
        eng.render(&template, &target, true).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "port=80\n");
        assert!(list_backups(&target).unwrap().is_empty());
    }

    #[test]
    fn test_unset_variables_render_empty() {
        let dir = tempdir().unwrap();
        let template = write_template(dir.path(), "app.conf.tmpl", "token=${NOT_SET}\n");
        let target = dir.path().join("app.conf");

        engine().render(&template, &target, true).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "token=\n");
    }
}
