//! Loop Analysis Pipeline
//! Segment → background slope → correction → properties, per file and in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::data::{
    read_bytes, DataLoader, HeaderLocator, LoaderError, LoopBranch, LoopSegmenter,
    MeasurementMetadata, MetadataExtractor, SampleGeometry, SegmentError,
};
use crate::stats::{
    Coercivity, CorrectionParameters, MagnetizationCorrector, MsRangePolicy, PropertyCalculator,
    SlopeEstimate, SlopeEstimator,
};
use crate::warning::{AnalysisWarning, Property, Warnings};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error(transparent)]
    Segment(#[from] SegmentError),
    #[error("invalid sample geometry: area {area_cm2} cm², thickness {thickness_nm} nm")]
    InvalidGeometry { area_cm2: f64, thickness_nm: f64 },
}

/// Everything derived from one loop. Properties that could not be
/// computed are `None`; the reason is in `warnings`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Background slope actually subtracted (0 when correction is off).
    pub slope: f64,
    pub slope_positive: f64,
    pub slope_negative: f64,
    pub r2_positive: f64,
    pub r2_negative: f64,
    pub offset: f64,
    pub ms: Option<f64>,
    pub ms_positive: f64,
    pub ms_negative: f64,
    pub ms_policy: MsRangePolicy,
    pub mr: Option<f64>,
    pub hc: Option<Coercivity>,
    pub squareness: Option<f64>,
    pub descending: LoopBranch,
    pub ascending: LoopBranch,
    pub warnings: Vec<AnalysisWarning>,
}

impl AnalysisResult {
    pub fn hc_tesla(&self) -> Option<f64> {
        self.hc.map(|hc| hc.tesla)
    }

    pub fn hc_oe(&self) -> Option<f64> {
        self.hc.map(|hc| hc.oersted)
    }

    /// True when every derived property is present.
    pub fn is_complete(&self) -> bool {
        self.ms.is_some() && self.mr.is_some() && self.hc.is_some() && self.squareness.is_some()
    }
}

/// Caller-owned settings for one file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub correction: CorrectionParameters,
    pub offset_enabled: bool,
    pub ms_policy: MsRangePolicy,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            correction: CorrectionParameters::default(),
            offset_enabled: true,
            ms_policy: MsRangePolicy::Automatic,
        }
    }
}

/// One file to analyse with its geometry and settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FileJob {
    pub path: PathBuf,
    pub geometry: SampleGeometry,
    pub options: AnalysisOptions,
}

impl FileJob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            geometry: SampleGeometry::default(),
            options: AnalysisOptions::default(),
        }
    }
}

/// Successful analysis of one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileAnalysis {
    pub path: PathBuf,
    /// File name without extension, used as the row label.
    pub stem: String,
    pub metadata: MeasurementMetadata,
    pub header_row: usize,
    pub header_detected: bool,
    pub point_count: usize,
    pub result: AnalysisResult,
}

/// Outcome of one file in a batch; `Err` means the file produced nothing.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<FileAnalysis, AnalysisError>,
}

/// Runs the correction and property pipeline.
pub struct LoopAnalyzer;

impl LoopAnalyzer {
    /// Background slope of a converted loop, for callers that only need the fit.
    pub fn estimate_diamag_slope(
        field: &[f64],
        moment: &[f64],
        correction: &CorrectionParameters,
        config: &AnalysisConfig,
        warnings: &mut Warnings,
    ) -> SlopeEstimate {
        SlopeEstimator::estimate(
            field,
            moment,
            correction.mode,
            correction.positive_range,
            correction.negative_range,
            config,
            warnings,
        )
    }

    /// Analyse one sweep given in tesla and kA/m.
    ///
    /// The sweep is truncated to one loop first. The slope fit always runs so
    /// R² is available; it is only subtracted when correction is enabled.
    /// Each derived property fails on its own without affecting the others.
    pub fn correct_and_analyze(
        field: &[f64],
        moment: &[f64],
        correction: &CorrectionParameters,
        offset_enabled: bool,
        ms_policy: MsRangePolicy,
        config: &AnalysisConfig,
    ) -> Result<AnalysisResult, AnalysisError> {
        if field.len() != moment.len() {
            return Err(SegmentError::LengthMismatch {
                field: field.len(),
                moment: moment.len(),
            }
            .into());
        }
        let segments = LoopSegmenter::segment(field)?;
        let field = segments.truncate(field);
        let moment = segments.truncate(moment);

        let mut warnings = Warnings::new();
        let mut fit_warnings = Warnings::new();
        let estimate =
            Self::estimate_diamag_slope(field, moment, correction, config, &mut fit_warnings);
        let slope = if correction.enabled {
            warnings.extend(fit_warnings);
            estimate.slope
        } else {
            0.0
        };

        let corrected =
            MagnetizationCorrector::correct(field, moment, slope, offset_enabled, config);
        let descending = segments.descending(field, &corrected.moment);
        let ascending = segments.ascending(field, &corrected.moment);

        let saturation = PropertyCalculator::saturation(
            field,
            &corrected.moment,
            ms_policy,
            config,
            &mut warnings,
        );
        let mr = match PropertyCalculator::remanence(&descending, &ascending) {
            Ok(mr) => Some(mr),
            Err(err) => {
                warnings.push(AnalysisWarning::InterpolationFailed {
                    property: Property::Remanence,
                    reason: err.to_string(),
                });
                None
            }
        };
        let hc = match PropertyCalculator::coercivity(&descending, &ascending) {
            Ok(hc) => Some(hc),
            Err(err) => {
                warnings.push(AnalysisWarning::InterpolationFailed {
                    property: Property::Coercivity,
                    reason: err.to_string(),
                });
                None
            }
        };
        let squareness = PropertyCalculator::squareness(mr, saturation.ms);

        tracing::info!(
            points = segments.point_count(),
            slope,
            offset = corrected.offset,
            ms = ?saturation.ms,
            mr = ?mr,
            hc_t = ?hc.map(|hc| hc.tesla),
            "loop analysed"
        );

        Ok(AnalysisResult {
            slope,
            slope_positive: estimate.slope_positive,
            slope_negative: estimate.slope_negative,
            r2_positive: estimate.r2_positive,
            r2_negative: estimate.r2_negative,
            offset: corrected.offset,
            ms: saturation.ms,
            ms_positive: saturation.ms_positive,
            ms_negative: saturation.ms_negative,
            ms_policy: saturation.policy,
            mr,
            hc,
            squareness,
            descending,
            ascending,
            warnings: warnings.into_vec(),
        })
    }

    /// Load, convert and analyse one instrument file.
    pub fn analyze_file(
        job: &FileJob,
        config: &AnalysisConfig,
    ) -> Result<FileAnalysis, AnalysisError> {
        let _span = tracing::info_span!("file", path = %job.path.display()).entered();
        if !job.geometry.is_valid() {
            return Err(AnalysisError::InvalidGeometry {
                area_cm2: job.geometry.area_cm2,
                thickness_nm: job.geometry.thickness_nm,
            });
        }

        let bytes = read_bytes(&job.path).map_err(|source| LoaderError::Io {
            path: job.path.clone(),
            source,
        })?;

        let mut warnings = Warnings::new();
        let header = HeaderLocator::locate_in_bytes(&bytes, config);
        if !header.detected {
            warnings.push(AnalysisWarning::HeaderNotFound {
                default_row: header.row,
            });
        }
        let metadata = MetadataExtractor::extract_from_bytes(&bytes, config);
        if metadata.is_empty() {
            warnings.push(AnalysisWarning::MetadataUnavailable);
        }

        let raw = DataLoader::load_from_bytes(&bytes, header.row, config)?;
        let (field, moment) = raw.to_si(&job.geometry);
        let options = &job.options;
        let mut result = Self::correct_and_analyze(
            &field,
            &moment,
            &options.correction,
            options.offset_enabled,
            options.ms_policy,
            config,
        )?;

        let mut all = warnings.into_vec();
        all.append(&mut result.warnings);
        result.warnings = all;

        Ok(FileAnalysis {
            path: job.path.clone(),
            stem: file_stem(&job.path),
            metadata,
            header_row: header.row,
            header_detected: header.detected,
            point_count: raw.len(),
            result,
        })
    }

    /// Analyse files in parallel; outcomes keep the input order and one
    /// failing file never affects the others.
    pub fn analyze_files(jobs: &[FileJob], config: &AnalysisConfig) -> Vec<FileOutcome> {
        jobs.par_iter()
            .map(|job| {
                let result = Self::analyze_file(job, config);
                if let Err(err) = &result {
                    tracing::error!(file = %job.path.display(), error = %err, "analysis failed");
                }
                FileOutcome {
                    path: job.path.clone(),
                    result,
                }
            })
            .collect()
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
