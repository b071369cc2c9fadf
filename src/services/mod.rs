//! Duplicate identifier detection, replacement, and the run that ties them
//! to a store.

pub mod detector;
pub mod filter;
pub mod orchestrator;
pub mod replacer;

pub use detector::{DetectDuplicates, DuplicateDetector};
pub use filter::LibraryFilter;
pub use orchestrator::{
    Outcome, ReplacementOrchestrator, ReplacementReport, RunOptions, ScanReport,
};
pub use replacer::{IdReplacer, ReplaceIds, Replacement};
