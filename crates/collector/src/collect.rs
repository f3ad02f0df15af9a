//! Collection driver: logs in, parameter file out.

use crate::discovery::{discover_runs, TuningRun, RUN_PREFIX};
use crate::report::{CollectReport, RejectedShape, ResolvedShape, UnresolvedShape};
use anyhow::{Context, Result};
use smmtune_autotune::{
    parse, ParameterFile, PerformanceRecord, RunOutcome, UpdateEffect, WinnerEntry, WinnerTable,
};
use smmtune_kernels::{decode, DescriptorError, KernelParameterSet, KernelRegistry, Shape};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Directory holding the per-shape `tune_*` directories.
    pub root: PathBuf,
    pub output: PathBuf,
    /// Where to write the JSON report, if anywhere.
    pub report: Option<PathBuf>,
    pub dir_prefix: String,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            output: PathBuf::from("parameters.txt"),
            report: None,
            dir_prefix: RUN_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("winner describes shape {found} but was logged for {expected}")]
    ShapeMismatch { expected: Shape, found: Shape },
}

/// Decodes a shape's winning record, checking it describes that shape.
pub fn resolve_winner(
    shape: Shape,
    record: &PerformanceRecord,
    registry: &KernelRegistry,
) -> Result<KernelParameterSet, ResolveError> {
    let params = decode(&record.text, registry)?;
    match params.shape() {
        Some(found) if found != shape => Err(ResolveError::ShapeMismatch {
            expected: shape,
            found,
        }),
        _ => Ok(params),
    }
}

/// Accumulates run outcomes and resolves them into parameter sets.
pub struct Collector {
    registry: KernelRegistry,
    table: WinnerTable,
}

impl Collector {
    pub fn new(registry: KernelRegistry) -> Self {
        Self {
            registry,
            table: WinnerTable::new(),
        }
    }

    pub fn table(&self) -> &WinnerTable {
        &self.table
    }

    /// Folds one log into the table; `None` means the log was never written.
    pub fn ingest_log(&mut self, shape: Shape, log_text: Option<&str>, source: &str) -> UpdateEffect {
        let outcome = match log_text {
            Some(text) => parse(text),
            None => RunOutcome::Missing,
        };
        let effect = self.table.update(shape, outcome, source);
        debug!(shape = %shape, source, ?effect, "log ingested");
        effect
    }

    pub fn ingest_run(&mut self, run: &TuningRun) -> Result<UpdateEffect> {
        let source = run.log_id();
        match fs::read(&run.log) {
            Ok(bytes) => {
                info!(path = %run.log.display(), "reading log");
                let text = String::from_utf8_lossy(&bytes);
                Ok(self.ingest_log(run.shape, Some(&*text), &source))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(path = %run.log.display(), "log missing");
                Ok(self.ingest_log(run.shape, None, &source))
            }
            Err(err) => Err(err).with_context(|| format!("reading {}", run.log.display())),
        }
    }

    /// Decodes every winner. Failures exclude only the affected shape.
    pub fn resolve(&self) -> (ParameterFile, CollectReport) {
        let mut records = Vec::new();
        let mut report = CollectReport {
            generated_at_unix_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_else(|_| Duration::from_secs(0))
                .as_millis(),
            ..CollectReport::default()
        };

        for (shape, entry) in self.table.iter() {
            match entry {
                WinnerEntry::Diagnostic(diagnostic) => {
                    warn!(shape = %shape, "{}", diagnostic);
                    report.unresolved.push(UnresolvedShape {
                        shape,
                        diagnostic: diagnostic.clone(),
                    });
                }
                WinnerEntry::Winner { record, source } => {
                    match resolve_winner(shape, record, &self.registry) {
                        Ok(params) => {
                            report.resolved.push(ResolvedShape {
                                shape,
                                algorithm: params.algorithm().to_string(),
                                perf: record.throughput,
                                source: source.clone(),
                            });
                            records.push(params);
                        }
                        Err(err) => {
                            warn!(shape = %shape, source = %source, error = %err, "winner rejected");
                            report.rejected.push(RejectedShape {
                                shape,
                                source: source.clone(),
                                record: record.text.clone(),
                                error: err.to_string(),
                            });
                        }
                    }
                }
            }
        }

        (ParameterFile::new(records), report)
    }
}

/// Scans `options.root`, writes the parameter file and optional report.
pub fn run_collection(options: &CollectOptions, registry: KernelRegistry) -> Result<CollectReport> {
    let runs = discover_runs(&options.root, &options.dir_prefix)?;
    info!(root = %options.root.display(), runs = runs.len(), "discovered tuning runs");

    let mut collector = Collector::new(registry);
    for run in &runs {
        collector.ingest_run(run)?;
    }

    let (parameters, report) = collector.resolve();
    parameters.save_to_file(&options.output)?;
    info!(
        path = %options.output.display(),
        kernels = parameters.len(),
        "wrote parameter file"
    );

    if let Some(path) = &options.report {
        report
            .save(path)
            .with_context(|| format!("writing report {}", path.display()))?;
    }
    Ok(report)
}
