//! Shape and per-algorithm kernel parameter structures.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dimensions of one small matrix-multiply kernel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Shape {
    pub m: usize,
    pub n: usize,
    pub k: usize,
}

impl Shape {
    pub fn new(m: usize, n: usize, k: usize) -> Self {
        Self { m, n, k }
    }

    pub fn is_valid(&self) -> bool {
        self.m > 0 && self.n > 0 && self.k > 0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.m, self.n, self.k)
    }
}

impl FromStr for Shape {
    type Err = String;

    /// Parses `MxNxK`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dims: Vec<&str> = s.split('x').collect();
        if dims.len() != 3 {
            return Err(format!("expected MxNxK, got '{}'", s));
        }
        let parse = |d: &str| {
            d.parse::<usize>()
                .map_err(|_| format!("invalid dimension '{}' in '{}'", d, s))
        };
        let shape = Shape::new(parse(dims[0])?, parse(dims[1])?, parse(dims[2])?);
        if !shape.is_valid() {
            return Err(format!("dimensions must be > 0: '{}'", s));
        }
        Ok(shape)
    }
}

/// Kernel implementation strategies emitted by the tuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmKind {
    Tiny,
    Small,
    Medium,
    LargeDb1,
    LargeDb2,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 5] = [
        AlgorithmKind::Tiny,
        AlgorithmKind::Small,
        AlgorithmKind::Medium,
        AlgorithmKind::LargeDb1,
        AlgorithmKind::LargeDb2,
    ];

    /// Name as it appears after `Kernel_dnt_` in tuner output.
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmKind::Tiny => "tiny",
            AlgorithmKind::Small => "small",
            AlgorithmKind::Medium => "medium",
            AlgorithmKind::LargeDb1 => "largeDB1",
            AlgorithmKind::LargeDb2 => "largeDB2",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed parameter struct that a [`crate::registry::TypedSchema`] can build.
///
/// Deserialization checks the field set and types; `validate` checks values.
pub trait ParameterSchema: Serialize + DeserializeOwned {
    fn validate(&self) -> Result<(), String>;
}

fn ensure_positive(fields: &[(&str, usize)]) -> Result<(), String> {
    for (name, value) in fields {
        if *value == 0 {
            return Err(format!("{} must be > 0", name));
        }
    }
    Ok(())
}

fn ensure_perf(perf: f64) -> Result<(), String> {
    if !perf.is_finite() || perf < 0.0 {
        return Err(format!("perf must be a finite, non-negative number, got {}", perf));
    }
    Ok(())
}

/// One thread block per product; no tiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TinyParams {
    pub m: usize,
    pub n: usize,
    pub k: usize,
    pub threads: usize,
    pub grouping: usize,
    pub minblocks: usize,
    pub perf: f64,
}

impl ParameterSchema for TinyParams {
    fn validate(&self) -> Result<(), String> {
        ensure_positive(&[
            ("m", self.m),
            ("n", self.n),
            ("k", self.k),
            ("threads", self.threads),
            ("grouping", self.grouping),
            ("minblocks", self.minblocks),
        ])?;
        ensure_perf(self.perf)
    }
}

/// Register-tiled kernels (`small`, `medium`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TiledParams {
    pub m: usize,
    pub n: usize,
    pub k: usize,
    pub tile_m: usize,
    pub tile_n: usize,
    pub threads: usize,
    pub grouping: usize,
    pub minblocks: usize,
    pub perf: f64,
}

impl ParameterSchema for TiledParams {
    fn validate(&self) -> Result<(), String> {
        ensure_positive(&[
            ("m", self.m),
            ("n", self.n),
            ("k", self.k),
            ("tile_m", self.tile_m),
            ("tile_n", self.tile_n),
            ("threads", self.threads),
            ("grouping", self.grouping),
            ("minblocks", self.minblocks),
        ])?;
        if self.tile_m > self.m || self.tile_n > self.n {
            return Err(format!(
                "tile {}x{} exceeds output {}x{}",
                self.tile_m, self.tile_n, self.m, self.n
            ));
        }
        ensure_perf(self.perf)
    }
}

/// Double-buffered kernels for larger shapes (`largeDB1`, `largeDB2`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LargeParams {
    pub m: usize,
    pub n: usize,
    pub k: usize,
    pub tile_m: usize,
    pub tile_n: usize,
    /// Width of the k-slab loaded per iteration.
    pub w: usize,
    /// Height of the slab written back per iteration.
    pub v: usize,
    pub threads: usize,
    pub grouping: usize,
    pub minblocks: usize,
    pub perf: f64,
}

impl ParameterSchema for LargeParams {
    fn validate(&self) -> Result<(), String> {
        ensure_positive(&[
            ("m", self.m),
            ("n", self.n),
            ("k", self.k),
            ("tile_m", self.tile_m),
            ("tile_n", self.tile_n),
            ("w", self.w),
            ("v", self.v),
            ("threads", self.threads),
            ("grouping", self.grouping),
            ("minblocks", self.minblocks),
        ])?;
        if self.tile_m > self.m || self.tile_n > self.n {
            return Err(format!(
                "tile {}x{} exceeds output {}x{}",
                self.tile_m, self.tile_n, self.m, self.n
            ));
        }
        ensure_perf(self.perf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_display_and_parse() {
        let shape = Shape::new(4, 5, 6);
        assert_eq!(shape.to_string(), "4x5x6");
        assert_eq!("4x5x6".parse::<Shape>().unwrap(), shape);
        assert!("4x5".parse::<Shape>().is_err());
        assert!("0x5x6".parse::<Shape>().is_err());
        assert!("ax5x6".parse::<Shape>().is_err());
    }

    #[test]
    fn test_algorithm_names() {
        let names: Vec<&str> = AlgorithmKind::ALL.iter().map(|kind| kind.name()).collect();
        assert_eq!(names, ["tiny", "small", "medium", "largeDB1", "largeDB2"]);
        assert_eq!(AlgorithmKind::LargeDb2.to_string(), "largeDB2");
    }

    #[test]
    fn test_tiled_params_validation() {
        let mut params = TiledParams {
            m: 4,
            n: 4,
            k: 4,
            tile_m: 2,
            tile_n: 1,
            threads: 32,
            grouping: 16,
            minblocks: 1,
            perf: 50.0,
        };
        assert!(params.validate().is_ok());

        params.tile_m = 8;
        assert!(params.validate().is_err());

        params.tile_m = 2;
        params.threads = 0;
        assert!(params.validate().is_err());

        params.threads = 32;
        params.perf = f64::NAN;
        assert!(params.validate().is_err());
    }
}
