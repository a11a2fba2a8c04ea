//! Report Module
//! Display-unit projections of corrected loops and the per-file results table.

use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisResult, FileAnalysis, FileOutcome};
use crate::data::{LoopBranch, TESLA_TO_OE};

/// Unit system for plotted loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayUnits {
    /// T and kA/m.
    #[default]
    Si,
    /// Oe and emu/cm³ (numerically equal to kA/m).
    Cgs,
    /// T and M/Ms.
    Normalized,
}

impl DisplayUnits {
    pub fn axis_labels(&self) -> (&'static str, &'static str) {
        match self {
            DisplayUnits::Si => ("H (T)", "M (kA/m)"),
            DisplayUnits::Cgs => ("H (Oe)", "M (emu/cm³)"),
            DisplayUnits::Normalized => ("H (T)", "M/Ms"),
        }
    }
}

/// Both branches of a corrected loop in display units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySeries {
    pub units: DisplayUnits,
    pub descending: LoopBranch,
    pub ascending: LoopBranch,
}

impl DisplaySeries {
    /// Project a result's corrected branches. Normalized units fall back to
    /// raw moments when Ms is unknown or not positive.
    pub fn from_result(result: &AnalysisResult, units: DisplayUnits) -> Self {
        let (field_scale, moment_scale) = match units {
            DisplayUnits::Si => (1.0, 1.0),
            DisplayUnits::Cgs => (TESLA_TO_OE, 1.0),
            DisplayUnits::Normalized => match result.ms {
                Some(ms) if ms > 0.0 => (1.0, 1.0 / ms),
                _ => (1.0, 1.0),
            },
        };
        let project = |branch: &LoopBranch| LoopBranch {
            field: branch.field.iter().map(|h| h * field_scale).collect(),
            moment: branch.moment.iter().map(|m| m * moment_scale).collect(),
        };
        Self {
            units,
            descending: project(&result.descending),
            ascending: project(&result.ascending),
        }
    }
}

pub const TABLE_HEADERS: [&str; 5] = ["filename", "Ms (kA/m)", "Mr (kA/m)", "Hc (Oe)", "S=Mr/Ms"];

/// On-screen placeholder for a property that could not be computed.
pub const NOT_AVAILABLE: &str = "N/A";

/// One summary line per analysed file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub filename: String,
    pub ms: Option<f64>,
    pub mr: Option<f64>,
    pub hc_oe: Option<f64>,
    pub squareness: Option<f64>,
}

impl ResultRow {
    pub fn from_analysis(analysis: &FileAnalysis) -> Self {
        let result = &analysis.result;
        Self {
            filename: analysis.stem.clone(),
            ms: result.ms,
            mr: result.mr,
            hc_oe: result.hc_oe(),
            squareness: result.squareness,
        }
    }

    /// Cells at fixed precision, `missing` for absent values.
    pub fn cells(&self, missing: &str) -> [String; 5] {
        let fmt = |value: Option<f64>, precision: usize| {
            value
                .map(|v| format!("{:.*}", precision, v))
                .unwrap_or_else(|| missing.to_string())
        };
        [
            self.filename.clone(),
            fmt(self.ms, 3),
            fmt(self.mr, 3),
            fmt(self.hc_oe, 2),
            fmt(self.squareness, 3),
        ]
    }
}

/// Summary of a batch, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Rows for the files that were analysed; failed files are left out.
    pub fn from_outcomes(outcomes: &[FileOutcome]) -> Self {
        let rows = outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
            .map(ResultRow::from_analysis)
            .collect();
        Self { rows }
    }

    pub fn from_analyses<'a>(analyses: impl IntoIterator<Item = &'a FileAnalysis>) -> Self {
        Self {
            rows: analyses.into_iter().map(ResultRow::from_analysis).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text for on-screen display.
    pub fn display_rows(&self) -> Vec<[String; 5]> {
        self.rows.iter().map(|row| row.cells(NOT_AVAILABLE)).collect()
    }

    /// Tab-separated text with a header line; missing values are blank.
    pub fn to_tsv(&self) -> String {
        let mut lines = vec![TABLE_HEADERS.join("\t")];
        lines.extend(self.rows.iter().map(|row| row.cells("").join("\t")));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{Coercivity, MsRangePolicy};

    fn result(ms: Option<f64>) -> AnalysisResult {
        AnalysisResult {
            slope: 0.0,
            slope_positive: 0.0,
            slope_negative: 0.0,
            r2_positive: 0.0,
            r2_negative: 0.0,
            offset: 0.0,
            ms,
            ms_positive: 0.0,
            ms_negative: 0.0,
            ms_policy: MsRangePolicy::Automatic,
            mr: Some(5.0),
            hc: Some(Coercivity {
                tesla: 0.01,
                oersted: 100.0,
            }),
            squareness: ms.map(|ms| 5.0 / ms),
            descending: LoopBranch {
                field: vec![1.0, -1.0],
                moment: vec![8.0, -8.0],
            },
            ascending: LoopBranch {
                field: vec![-1.0, 1.0],
                moment: vec![-8.0, 8.0],
            },
            warnings: Vec::new(),
        }
    }

    #[test]
    fn cgs_scales_field_only() {
        let series = DisplaySeries::from_result(&result(Some(8.0)), DisplayUnits::Cgs);
        assert_eq!(series.descending.field, vec![10000.0, -10000.0]);
        assert_eq!(series.descending.moment, vec![8.0, -8.0]);
    }

    #[test]
    fn normalized_divides_by_ms() {
        let series = DisplaySeries::from_result(&result(Some(8.0)), DisplayUnits::Normalized);
        assert_eq!(series.ascending.moment, vec![-1.0, 1.0]);
        assert_eq!(series.ascending.field, vec![-1.0, 1.0]);
    }

    #[test]
    fn normalized_without_ms_keeps_raw_values() {
        let series = DisplaySeries::from_result(&result(None), DisplayUnits::Normalized);
        assert_eq!(series.ascending.moment, vec![-8.0, 8.0]);
    }

    #[test]
    fn row_formatting_uses_fixed_precision() {
        let row = ResultRow {
            filename: "film".into(),
            ms: Some(1234.56789),
            mr: None,
            hc_oe: Some(12.346),
            squareness: Some(0.5),
        };
        assert_eq!(
            row.cells(NOT_AVAILABLE),
            [
                "film".to_string(),
                "1234.568".to_string(),
                "N/A".to_string(),
                "12.35".to_string(),
                "0.500".to_string(),
            ]
        );
    }

    #[test]
    fn axis_labels_follow_units() {
        assert_eq!(DisplayUnits::Si.axis_labels(), ("H (T)", "M (kA/m)"));
        assert_eq!(DisplayUnits::Cgs.axis_labels(), ("H (Oe)", "M (emu/cm³)"));
        assert_eq!(DisplayUnits::Normalized.axis_labels().1, "M/Ms");
    }

    #[test]
    fn table_from_analyses_shows_missing_as_not_available() {
        let mut partial = result(None);
        partial.mr = None;
        let analyses = [
            FileAnalysis {
                path: "a.csv".into(),
                stem: "a".into(),
                metadata: Default::default(),
                header_row: 0,
                header_detected: true,
                point_count: 4,
                result: result(Some(8.0)),
            },
            FileAnalysis {
                path: "b.csv".into(),
                stem: "b".into(),
                metadata: Default::default(),
                header_row: 0,
                header_detected: true,
                point_count: 4,
                result: partial,
            },
        ];
        let table = ResultTable::from_analyses(&analyses);
        assert!(!table.is_empty());
        let rows = table.display_rows();
        assert_eq!(rows[0], ["a", "8.000", "5.000", "100.00", "0.625"].map(String::from));
        assert_eq!(rows[1], ["b", "N/A", "N/A", "100.00", "N/A"].map(String::from));
    }

    #[test]
    fn tsv_has_header_and_blank_missing_cells() {
        let table = ResultTable {
            rows: vec![ResultRow {
                filename: "a".into(),
                ms: Some(1.0),
                mr: None,
                hc_oe: Some(2.0),
                squareness: None,
            }],
        };
        assert_eq!(
            table.to_tsv(),
            "filename\tMs (kA/m)\tMr (kA/m)\tHc (Oe)\tS=Mr/Ms\na\t1.000\t\t2.00\t"
        );
    }
}
