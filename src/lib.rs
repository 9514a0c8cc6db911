//! confdeploy Library
//!
//! This library provides the core functionality for templated configuration
//! deployment: rendering `${VAR}` templates over live config files with
//! timestamped backups, bounded retention, and rollback.

pub mod backup;
pub mod cli;
pub mod engine;
pub mod environment;
pub mod error;
pub mod plan;
pub mod template;
pub mod types;
pub mod writer;

// Re-export main types for convenience
pub use backup::{BackupEntry, PruneReport, BACKUP_INFIX, DEFAULT_KEEP, TIMESTAMP_FORMAT};
pub use engine::{Engine, RenderOutcome};
pub use environment::Environment;
pub use error::{DeployError, Result};
pub use plan::{Plan, PlanStep};
pub use template::{substitute, Template};
pub use types::Toggle;
pub use writer::{DirectWriter, DryRunWriter, TargetWriter};
