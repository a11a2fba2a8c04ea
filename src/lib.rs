//! VSM Loop - hysteresis-loop analysis for vibrating-sample-magnetometer exports
//!
//! Reads instrument text files, removes the linear background and offset,
//! and derives Ms, Mr, Hc and squareness for one file or a batch.

pub mod analysis;
pub mod config;
pub mod data;
pub mod report;
pub mod stats;
pub mod warning;

pub use analysis::{
    AnalysisError, AnalysisOptions, AnalysisResult, FileAnalysis, FileJob, FileOutcome,
    LoopAnalyzer,
};
pub use config::AnalysisConfig;
pub use data::{LoopBranch, MeasurementMetadata, RawSample, SampleGeometry};
pub use report::{DisplaySeries, DisplayUnits, ResultRow, ResultTable};
pub use stats::{CorrectionParameters, FieldRange, MsRangePolicy, SlopeMode};
pub use warning::{AnalysisWarning, Warnings};
