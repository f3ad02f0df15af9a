//! Kernel parameter schemas and descriptor decoding for SmmTune.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod params;
pub mod registry;

pub use config::*;
pub use descriptor::*;
pub use error::*;
pub use params::*;
pub use registry::*;
