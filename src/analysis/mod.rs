//! Analysis result aggregation
//!
//! Result types returned to callers and the metadata describing how they were obtained.

pub mod metadata;
pub mod result;

pub use metadata::{AnalysisMetadata, KeyMethod};
pub use result::{AnalysisFlag, BeatGrid, ChordAnalysis, ChordEvent, Key, KeyEstimate};
