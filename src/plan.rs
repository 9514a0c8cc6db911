//! Deployment plan handling for saving and loading multi-step deployments.
//!
//! A plan is an ordered list of render steps (template in, target out) so a
//! whole stack's configuration (container runtime, cluster agent, ingress)
//! deploys in one sequential run. Steps execute in file order and the first
//! failure aborts the run; whatever was already rendered stays rendered, with
//! its backups in place for manual rollback.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine::{Engine, RenderOutcome};
use crate::types::Toggle;

/// One template-to-target render step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Human-readable step name, used in logs and error context.
    pub name: String,
    /// Template file to render.
    pub template: PathBuf,
    /// Live config file to write. Must be absolute.
    pub target: PathBuf,
    /// Whether to snapshot an existing target before overwriting it.
    #[serde(default)]
    pub backup: Toggle,
}

/// Deployment plan that can be saved/loaded as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Save plan to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize plan to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write plan to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load plan from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read plan from {:?}", path.as_ref()))?;

        let plan: Self = serde_json::from_str(&content).context("Failed to parse plan JSON")?;

        Ok(plan)
    }

    /// Validate the plan
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            anyhow::bail!("Plan must contain at least one step");
        }

        let mut seen_targets = HashSet::new();
        for (idx, step) in self.steps.iter().enumerate() {
            let label = if step.name.trim().is_empty() {
                format!("step {}", idx + 1)
            } else {
                format!("step {:?}", step.name)
            };

            if step.name.trim().is_empty() {
                anyhow::bail!("{} must have a name", label);
            }
            if step.template.as_os_str().is_empty() {
                anyhow::bail!("{} must specify a template path", label);
            }
            if !step.target.is_absolute() {
                anyhow::bail!(
                    "{} target must be an absolute path, got {:?}",
                    label,
                    step.target
                );
            }
            if !seen_targets.insert(step.target.clone()) {
                anyhow::bail!("{} repeats target {:?}", label, step.target);
            }
        }

        Ok(())
    }

    /// Run every step in order against `engine`, stopping at the first
    /// failure. Returns one outcome per completed step.
    pub fn apply(&self, engine: &Engine) -> Result<Vec<RenderOutcome>> {
        self.validate()?;

        let mut outcomes = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            info!("applying step {:?}", step.name);
            let outcome = engine
                .render(&step.template, &step.target, step.backup.as_bool())
                .with_context(|| format!("Step {:?} failed", step.name))?;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}
