//! SmmTune collection driver.

#[cfg(feature = "cli")]
pub mod cli;
pub mod collect;
pub mod discovery;
pub mod report;
pub mod selftest;

#[cfg(feature = "cli")]
pub use cli::*;
pub use collect::*;
pub use discovery::*;
pub use report::*;
pub use selftest::*;
