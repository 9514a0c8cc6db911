//! Error handling module for confdeploy
//!
//! Provides centralized error handling with proper error types using thiserror.
//! All errors in the engine should use these types for consistency.
//!
//! Render-path errors are fatal to the render call and guarantee the target
//! file is left in its pre-call state. Prune failures are deliberately NOT in
//! this taxonomy: retention keeps going past individual delete errors and
//! reports them in its summary instead.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the deployment engine
#[derive(Error, Debug)]
pub enum DeployError {
    /// Template path missing or unreadable; nothing was touched
    #[error("template not found: {path}")]
    TemplateNotFound { path: PathBuf },

    /// Snapshot of the live target could not be created; render aborted
    /// before any write to the target
    #[error("backup of {path} failed: {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Substitution or temp-file write failed; target untouched
    #[error("render of {path} failed: {reason}")]
    RenderFailed { path: PathBuf, reason: String },

    /// Final rename over the target failed; temp file cleaned up
    #[error("atomic replace of {path} failed: {source}")]
    AtomicMoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rollback requested for a target with no backups
    #[error("no backup found for {path}")]
    NoBackupFound { path: PathBuf },

    /// Restoring the most recent backup failed
    #[error("rollback of {path} failed: {reason}")]
    RollbackFailed { path: PathBuf, reason: String },

    /// Environment file errors (malformed line, unreadable file).
    /// Loading fails closed: no partial environment is ever returned.
    #[error("environment file {path}, line {line}: {reason}")]
    EnvFile {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Deployment plan errors (loading, parsing, validation)
    #[error("plan error: {0}")]
    Plan(String),

    /// IO errors (file operations outside the named cases above)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for deployment operations
pub type Result<T> = std::result::Result<T, DeployError>;

// Convenient error constructors
impl DeployError {
    /// Create a template-not-found error
    pub fn template_not_found(path: impl Into<PathBuf>) -> Self {
        Self::TemplateNotFound { path: path.into() }
    }

    /// Create a render error
    pub fn render(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::RenderFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a rollback error
    pub fn rollback(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::RollbackFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a plan error
    pub fn plan(msg: impl Into<String>) -> Self {
        Self::Plan(msg.into())
    }
}
