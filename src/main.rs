//! confdeploy - Main entry point
//!
//! Thin CLI over the deployment engine: resolve the substitution environment,
//! pick the writer capability, dispatch the subcommand, exit non-zero on any
//! failure so surrounding orchestration can halt.

use tracing::{debug, error, info};

use confdeploy::cli::{Cli, Commands};
use confdeploy::engine::Engine;
use confdeploy::environment::Environment;
use confdeploy::plan::Plan;
use confdeploy::writer::DryRunWriter;

/// Initialize the tracing subscriber with appropriate settings
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            // RUST_LOG overrides the default level
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

fn main() {
    init_logging();

    if let Err(e) = run() {
        error!("{:#}", e);
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    let env = match &cli.env_file {
        Some(path) => {
            info!("loading environment from {}", path.display());
            Environment::from_file(path)?
        }
        None => Environment::from_process(),
    };
    debug!("environment loaded ({} variables)", env.len());

    let mut engine = Engine::new(env);
    if cli.dry_run {
        info!("dry-run mode: no files will be modified");
        engine = engine.with_writer(Box::new(DryRunWriter));
    }

    match cli.command {
        Commands::Render {
            template,
            target,
            no_backup,
        } => {
            let outcome = engine.render(&template, &target, !no_backup)?;
            println!("✓ rendered {}", outcome.target.display());
            if let Some(backup) = outcome.backup {
                println!("  backup: {}", backup.display());
            }
            if outcome.pruned > 0 {
                println!("  pruned {} old backup(s)", outcome.pruned);
            }
        }
        Commands::Rollback { target } => {
            let used = engine.rollback(&target)?;
            println!("✓ restored {} from {}", target.display(), used.display());
        }
        Commands::Prune { target, keep } => {
            let report = engine.prune(&target, keep)?;
            println!(
                "✓ pruned {} of {} backup(s) for {}",
                report.deleted.len(),
                report.examined,
                target.display()
            );
            if !report.failed.is_empty() {
                println!("  {} backup(s) could not be deleted", report.failed.len());
            }
        }
        Commands::Apply { plan } => {
            let plan = Plan::load_from_file(&plan)?;
            let outcomes = plan.apply(&engine)?;
            println!("✓ applied {} step(s)", outcomes.len());
        }
        Commands::Validate { plan } => {
            let loaded = Plan::load_from_file(&plan)?;
            loaded.validate()?;
            println!("✓ plan is valid: {}", plan.display());
        }
    }

    Ok(())
}
