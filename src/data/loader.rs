//! Raw Sample Loader Module
//! Reads the comma-delimited field/moment rows below the header using Polars.

use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::encoding::{decode_first, read_bytes};
use super::model::RawSample;
use crate::config::AnalysisConfig;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no encoding in {tried:?} could decode the file")]
    Decode { tried: Vec<String> },
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("required columns missing: {missing:?}")]
    MissingColumns { missing: Vec<String> },
    #[error("only {found} complete rows, at least 2 required")]
    TooFewSamples { found: usize },
}

/// Loads the tabular part of an instrument file.
pub struct DataLoader;

impl DataLoader {
    /// Load field/moment samples from the rows below `header_row`.
    pub fn load_samples(
        path: &Path,
        header_row: usize,
        config: &AnalysisConfig,
    ) -> Result<RawSample, LoaderError> {
        let bytes = read_bytes(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load_from_bytes(&bytes, header_row, config)
    }

    /// Decode with the first working encoding, then parse.
    pub fn load_from_bytes(
        bytes: &[u8],
        header_row: usize,
        config: &AnalysisConfig,
    ) -> Result<RawSample, LoaderError> {
        let decoded = decode_first(bytes, &config.encodings).ok_or_else(|| LoaderError::Decode {
            tried: config.encodings.clone(),
        })?;
        tracing::debug!(encoding = decoded.encoding, header_row, "loading samples");
        Self::parse_samples(&decoded.text, header_row, config)
    }

    /// Parse decoded text; rows with any missing value are dropped.
    pub fn parse_samples(
        text: &str,
        header_row: usize,
        config: &AnalysisConfig,
    ) -> Result<RawSample, LoaderError> {
        let table = match Self::table_text(text, header_row) {
            Some(table) if !table.trim().is_empty() => table,
            _ => {
                tracing::debug!(header_row, "header row beyond end of file");
                return Err(LoaderError::MissingColumns {
                    missing: vec![config.field_marker.clone(), config.moment_marker.clone()],
                });
            }
        };
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .with_parse_options(CsvParseOptions::default().with_truncate_ragged_lines(true))
            .into_reader_with_file_handle(Cursor::new(table.as_bytes().to_vec()))
            .finish()?;

        let field_col = Self::find_column(&df, &config.field_marker);
        let moment_col = Self::find_column(&df, &config.moment_marker);
        let (field_col, moment_col) = match (field_col, moment_col) {
            (Some(h), Some(m)) => (h, m),
            (h, m) => {
                let mut missing = Vec::new();
                if h.is_none() {
                    missing.push(config.field_marker.clone());
                }
                if m.is_none() {
                    missing.push(config.moment_marker.clone());
                }
                return Err(LoaderError::MissingColumns { missing });
            }
        };

        let complete = Self::complete_rows(&df);
        let field = Self::float_values(&df, &field_col)?;
        let moment = Self::float_values(&df, &moment_col)?;

        let mut sample = RawSample {
            field_oe: Vec::with_capacity(df.height()),
            moment_emu: Vec::with_capacity(df.height()),
        };
        for ((keep, h), m) in complete.iter().zip(field).zip(moment) {
            if let (true, Some(h), Some(m)) = (*keep, h, m) {
                if !h.is_nan() && !m.is_nan() {
                    sample.field_oe.push(h);
                    sample.moment_emu.push(m);
                }
            }
        }

        if sample.len() < 2 {
            return Err(LoaderError::TooFewSamples {
                found: sample.len(),
            });
        }
        tracing::debug!(rows = df.height(), kept = sample.len(), "samples loaded");
        Ok(sample)
    }

    /// Text from line `header_row` onwards. The preamble is cut by line, not
    /// handed to the CSV reader, so stray quotes in it cannot merge records.
    fn table_text(text: &str, header_row: usize) -> Option<&str> {
        if header_row == 0 {
            return Some(text);
        }
        text.match_indices('\n')
            .nth(header_row - 1)
            .map(|(index, _)| &text[index + 1..])
    }

    /// Column whose trimmed header equals `marker`.
    fn find_column(df: &DataFrame, marker: &str) -> Option<String> {
        df.get_column_names()
            .iter()
            .map(|s| s.to_string())
            .find(|name| name.trim() == marker)
    }

    fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, LoaderError> {
        let column = df.column(name)?.cast(&DataType::Float64)?;
        Ok(column.f64()?.into_iter().collect())
    }

    /// Row mask: true where no column holds a null. Columns that are null
    /// throughout (trailing delimiters) are ignored.
    fn complete_rows(df: &DataFrame) -> Vec<bool> {
        let mut keep = vec![true; df.height()];
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            if series.null_count() == series.len() {
                continue;
            }
            let nulls = series.is_null();
            for (slot, is_null) in keep.iter_mut().zip(&nulls) {
                if is_null.unwrap_or(true) {
                    *slot = false;
                }
            }
        }
        keep
    }
}
