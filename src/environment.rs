//! Substitution environment loading.
//!
//! The environment is the set of variables a template render draws from. It is
//! loaded once at process start (from a `KEY=VALUE` file or captured from the
//! process environment) and never mutated afterwards, so substitution behavior
//! is independent of any hidden global state and testable in isolation.
//!
//! # File format
//!
//! - one `KEY=VALUE` pair per line
//! - blank lines and `#` comment lines are ignored
//! - an optional `export ` prefix is accepted (the files these tools consume
//!   are often sourced by shells as well)
//! - values may be wrapped in single or double quotes; one matching pair is
//!   stripped
//!
//! Loading fails closed: any malformed line aborts the load with an error
//! naming the line number. No partial environment is ever returned.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{DeployError, Result};

/// Immutable name -> value mapping used for template substitution.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Load an environment from a `KEY=VALUE` file.
    ///
    /// Fails closed on the first malformed line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| DeployError::EnvFile {
            path: path.to_path_buf(),
            line: 0,
            reason: format!("cannot read file: {}", e),
        })?;

        let mut vars = HashMap::new();
        for (idx, raw_line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line).trim_start();

            let Some((key, value)) = line.split_once('=') else {
                return Err(DeployError::EnvFile {
                    path: path.to_path_buf(),
                    line: line_no,
                    reason: format!("missing '=' in line: {}", raw_line.trim()),
                });
            };

            let key = key.trim();
            if !is_valid_name(key) {
                return Err(DeployError::EnvFile {
                    path: path.to_path_buf(),
                    line: line_no,
                    reason: format!("invalid variable name: {:?}", key),
                });
            }

            vars.insert(key.to_string(), unquote(value.trim()).to_string());
        }

        Ok(Self { vars })
    }

    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build an environment from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a variable. Substitution treats `None` as the empty string.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Number of variables loaded.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// True when no variables are loaded.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Variable names follow the shell identifier rule: `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Strip one matching pair of single or double quotes, if present.
fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}
