//! Per-shape summary of a collection run.
//!
//! The parameter file only lists shapes with a usable winner; the report
//! also records why the remaining shapes were left out.

use anyhow::Result;
use serde::Serialize;
use smmtune_autotune::Diagnostic;
use smmtune_kernels::Shape;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedShape {
    pub shape: Shape,
    pub algorithm: String,
    pub perf: f64,
    pub source: String,
}

/// Shape whose runs all failed, were incomplete, or left no log.
#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedShape {
    pub shape: Shape,
    pub diagnostic: Diagnostic,
}

/// Shape whose winner could not be turned into kernel parameters.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedShape {
    pub shape: Shape,
    pub source: String,
    pub record: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectReport {
    pub generated_at_unix_ms: u128,
    pub resolved: Vec<ResolvedShape>,
    pub unresolved: Vec<UnresolvedShape>,
    pub rejected: Vec<RejectedShape>,
}

impl CollectReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.rejected.is_empty()
    }

    /// Human-readable lines for every shape left out of the parameter file.
    pub fn problems(&self) -> Vec<String> {
        let unresolved = self
            .unresolved
            .iter()
            .map(|entry| format!("{}: {}", entry.shape, entry.diagnostic));
        let rejected = self
            .rejected
            .iter()
            .map(|entry| format!("{}: {} ({})", entry.shape, entry.error, entry.source));
        unresolved.chain(rejected).collect()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
