//! SmmTune: winner collection for small-matmul GPU kernel tuning sweeps.
//!
//! - [`kernels`]: shapes, algorithm schemas, descriptor decoding
//! - [`autotune`]: log parsing and per-shape winner selection
//! - [`collector`]: directory scanning, parameter file and report output

pub use smmtune_autotune as autotune;
pub use smmtune_collector as collector;
pub use smmtune_kernels as kernels;
