//! The collection pipeline: fetch, clean, derive, merge.

pub mod clean;
pub mod derive;
pub mod merge;
pub mod runner;

pub use clean::clean;
pub use merge::{LongTable, WideTable};
pub use runner::{Pipeline, RunOutput, RunReport};
