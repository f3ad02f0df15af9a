//! Winner selection over tuner benchmark logs.

pub mod logparse;
pub mod parameters;
pub mod tracker;

pub use logparse::{parse, IncompleteReason, PerformanceRecord, RunOutcome};
pub use parameters::ParameterFile;
pub use tracker::*;
