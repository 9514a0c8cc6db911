use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// confdeploy - templated configuration deployment with backups and rollback
#[derive(Parser)]
#[command(name = "confdeploy")]
#[command(about = "Render config templates over live files with timestamped backups and rollback")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: show what would be written without making changes.
    ///
    /// In this mode, filesystem mutations (backup, write, prune) are skipped
    /// and logged. Non-mutating checks (template lookup, backup enumeration)
    /// still execute so the preview is realistic.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// KEY=VALUE file supplying substitution variables.
    ///
    /// When omitted, the process environment is used instead.
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a template over a target file
    Render {
        /// Template file with ${VAR} placeholders
        #[arg(short, long)]
        template: PathBuf,

        /// Live config file to write
        #[arg(short = 'T', long)]
        target: PathBuf,

        /// Skip the pre-render backup of an existing target
        #[arg(long)]
        no_backup: bool,
    },
    /// Restore a target from its most recent backup
    Rollback {
        /// Target file to restore
        #[arg(short = 'T', long)]
        target: PathBuf,
    },
    /// Delete old backups of a target, keeping the most recent
    Prune {
        /// Target file whose backups to prune
        #[arg(short = 'T', long)]
        target: PathBuf,

        /// How many backups to keep
        #[arg(short, long, default_value_t = crate::backup::DEFAULT_KEEP)]
        keep: usize,
    },
    /// Run every step of a deployment plan file
    Apply {
        /// Path to the plan JSON file
        plan: PathBuf,
    },
    /// Validate a plan file (and the environment file, if given) without
    /// touching any target
    Validate {
        /// Path to the plan JSON file
        plan: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_requires_command() {
        let result = Cli::try_parse_from(["confdeploy"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_render_command() {
        let result = Cli::try_parse_from([
            "confdeploy",
            "render",
            "--template",
            "templates/app.conf.tmpl",
            "--target",
            "/etc/app/app.conf",
        ]);
        assert!(result.is_ok());
        let cli = result.unwrap();
        match cli.command {
            Commands::Render {
                template,
                target,
                no_backup,
            } => {
                assert_eq!(template.to_str().unwrap(), "templates/app.conf.tmpl");
                assert_eq!(target.to_str().unwrap(), "/etc/app/app.conf");
                assert!(!no_backup);
            }
            _ => panic!("Expected Render command"),
        }
    }

    #[test]
    fn test_cli_render_no_backup_flag() {
        let cli = Cli::try_parse_from([
            "confdeploy",
            "render",
            "-t",
            "a.tmpl",
            "-T",
            "/etc/a.conf",
            "--no-backup",
        ])
        .unwrap();
        match cli.command {
            Commands::Render { no_backup, .. } => assert!(no_backup),
            _ => panic!("Expected Render command"),
        }
    }

    #[test]
    fn test_cli_rollback_command() {
        let cli =
            Cli::try_parse_from(["confdeploy", "rollback", "--target", "/etc/app/app.conf"])
                .unwrap();
        match cli.command {
            Commands::Rollback { target } => {
                assert_eq!(target.to_str().unwrap(), "/etc/app/app.conf");
            }
            _ => panic!("Expected Rollback command"),
        }
    }

    #[test]
    fn test_cli_prune_default_keep() {
        let cli = Cli::try_parse_from(["confdeploy", "prune", "-T", "/etc/app.conf"]).unwrap();
        match cli.command {
            Commands::Prune { keep, .. } => assert_eq!(keep, 5),
            _ => panic!("Expected Prune command"),
        }
    }

    #[test]
    fn test_cli_prune_custom_keep() {
        let cli =
            Cli::try_parse_from(["confdeploy", "prune", "-T", "/etc/app.conf", "--keep", "2"])
                .unwrap();
        match cli.command {
            Commands::Prune { keep, .. } => assert_eq!(keep, 2),
            _ => panic!("Expected Prune command"),
        }
    }

    #[test]
    fn test_cli_apply_with_global_flags() {
        let cli = Cli::try_parse_from([
            "confdeploy",
            "--dry-run",
            "--env-file",
            "deploy.env",
            "apply",
            "plan.json",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.env_file.unwrap().to_str().unwrap(), "deploy.env");
        match cli.command {
            Commands::Apply { plan } => assert_eq!(plan.to_str().unwrap(), "plan.json"),
            _ => panic!("Expected Apply command"),
        }
    }

    #[test]
    fn test_cli_validate_command() {
        let cli = Cli::try_parse_from(["confdeploy", "validate", "plan.json"]).unwrap();
        match cli.command {
            Commands::Validate { plan } => assert_eq!(plan.to_str().unwrap(), "plan.json"),
            _ => panic!("Expected Validate command"),
        }
    }
}
