//! Template loading and variable substitution.
//!
//! Templates are plain text files containing `${VAR_NAME}` placeholders.
//! Substitution is a literal, single-pass replacement: each placeholder is
//! replaced with the environment's value for that name (empty string when
//! unset) and the replacement text is never re-scanned, so values containing
//! `${...}` do not expand recursively. There is no conditional or loop
//! syntax, and no shell evaluation of any kind.
//!
//! Tokens that do not form a valid placeholder (a lone `$`, `$NAME` without
//! braces, an unterminated `${`) pass through unchanged.

use std::fs;
use std::path::{Path, PathBuf};

use crate::environment::{self, Environment};
use crate::error::{DeployError, Result};

/// A loaded template file. The source file is read once and never mutated.
#[derive(Debug, Clone)]
pub struct Template {
    path: PathBuf,
    content: String,
}

impl Template {
    /// Load a template from disk.
    ///
    /// A missing or unreadable file maps to `TemplateNotFound`; nothing else
    /// has happened at this point, so the failure has no partial effects.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|_| DeployError::template_not_found(path))?;
        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    /// Build a template from an in-memory string (used by tests and callers
    /// that already hold the text).
    pub fn from_string(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Source path the template was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw template text, placeholders intact.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Substitute placeholders against `env`. Infallible: unset variables
    /// become empty strings, malformed tokens stay literal.
    pub fn render(&self, env: &Environment) -> String {
        substitute(&self.content, env)
    }
}

/// Replace every `${NAME}` in `input` with the environment value of `NAME`.
///
/// Single pass over the input. Placeholder names follow the shell identifier
/// rule; anything else after `${` demotes the token back to literal text.
pub fn substitute(input: &str, env: &Environment) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match after.find('}') {
            Some(end) if environment::is_valid_name(&after[..end]) => {
                out.push_str(env.get(&after[..end]).unwrap_or(""));
                rest = &after[end + 1..];
            }
            _ => {
                // Not a placeholder: emit "${" literally and keep scanning
                // right after it.
                out.push_str("${");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
