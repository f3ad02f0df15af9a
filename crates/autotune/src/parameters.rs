//! Parameter file read by the kernel generator.
//!
//! The file is a JSON array with one flat object per line:
//!
//! ```text
//! [
//! {"algorithm": "medium", "m": 4, "n": 4, "k": 4, ..., "perf": 50.0},
//! {"algorithm": "tiny", "m": 2, "n": 2, "k": 2, ..., "perf": 3.25}
//! ]
//! ```

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use smmtune_kernels::{KernelParameterSet, KernelRegistry, ParamMap, ALGORITHM_FIELD};
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterFile {
    records: Vec<KernelParameterSet>,
}

impl ParameterFile {
    pub fn new(records: Vec<KernelParameterSet>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[KernelParameterSet] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_text(&self) -> Result<String> {
        let lines = self
            .records
            .iter()
            .map(to_spaced_json)
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("[\n{}\n]", lines.join(",\n")))
    }

    /// Parses a parameter file, checking every record against `registry`.
    pub fn from_text(text: &str, registry: &KernelRegistry) -> Result<Self> {
        let raw: Vec<ParamMap> = serde_json::from_str(text)?;
        let records = raw
            .into_iter()
            .enumerate()
            .map(|(index, mut fields)| {
                let algorithm = match fields.remove(ALGORITHM_FIELD) {
                    Some(serde_json::Value::String(name)) => name,
                    _ => return Err(anyhow!("record {} has no algorithm name", index)),
                };
                registry
                    .construct(&algorithm, fields)
                    .with_context(|| format!("record {}", index))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { records })
    }

    pub fn load_from_file(path: &Path, registry: &KernelRegistry) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_text(&text, registry).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_text()?)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

fn to_spaced_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}

/// Compact output with `", "` and `": "` separators.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}
