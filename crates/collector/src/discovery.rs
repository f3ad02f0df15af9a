//! Locating tuning runs on disk.
//!
//! A sweep leaves one directory per shape (`tune_4x4x4/`) holding one
//! `tune_<m>x<n>x<k>_<run>_main.cu` source per run; the run's benchmark log
//! sits next to it with the `_main.cu` suffix replaced by `.log`.

use anyhow::{Context, Result};
use smmtune_kernels::Shape;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const RUN_PREFIX: &str = "tune_";
pub const RUN_SOURCE_SUFFIX: &str = "_main.cu";
pub const LOG_SUFFIX: &str = ".log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningRun {
    pub shape: Shape,
    pub source: PathBuf,
    pub log: PathBuf,
}

impl TuningRun {
    /// Derives the run from its `tune_*main.cu` source path.
    pub fn from_source(source: &Path) -> Option<Self> {
        let name = source.file_name()?.to_str()?;
        let shape = shape_from_file_name(name)?;
        let stem = name.strip_suffix(RUN_SOURCE_SUFFIX)?;
        Some(Self {
            shape,
            source: source.to_path_buf(),
            log: source.with_file_name(format!("{}{}", stem, LOG_SUFFIX)),
        })
    }

    pub fn log_id(&self) -> String {
        self.log.display().to_string()
    }
}

/// Finds `tune_<m>x<n>x<k>_` in a file name.
pub fn shape_from_file_name(name: &str) -> Option<Shape> {
    name.match_indices(RUN_PREFIX).find_map(|(idx, prefix)| {
        let rest = &name[idx + prefix.len()..];
        let (dims, _) = rest.split_once('_')?;
        dims.parse::<Shape>().ok()
    })
}

/// All runs under `root`, in sorted path order.
pub fn discover_runs(root: &Path, dir_prefix: &str) -> Result<Vec<TuningRun>> {
    let mut runs = Vec::new();
    for dir in sorted_entries(root)? {
        let matches_prefix = dir
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(dir_prefix));
        if !matches_prefix || !dir.is_dir() {
            continue;
        }

        for path in sorted_entries(&dir)? {
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !name.starts_with(RUN_PREFIX) || !name.ends_with("main.cu") {
                continue;
            }
            match TuningRun::from_source(&path) {
                Some(run) => runs.push(run),
                None => warn!(path = %path.display(), "cannot derive shape from run source; skipping"),
            }
        }
    }
    Ok(runs)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("listing {}", dir.display()))?;
    paths.sort();
    Ok(paths)
}
