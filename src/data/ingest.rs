//! CSV ingestion: column pruning, label mapping and categorical encoding.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Columns the HR attrition export carries that hold one constant or an id.
pub const DEFAULT_DROP_COLUMNS: [&str; 4] =
    ["EmployeeCount", "Over18", "StandardHours", "EmployeeNumber"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOptions {
    pub label_column: String,
    /// Label value mapped to class 1 (compared case-insensitively).
    pub positive_label: String,
    /// Label value mapped to class 0 (compared case-insensitively).
    pub negative_label: String,
    pub drop_columns: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            label_column: "Attrition".to_string(),
            positive_label: "Yes".to_string(),
            negative_label: "No".to_string(),
            drop_columns: DEFAULT_DROP_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("Malformed CSV record: {0}")]
    Record(#[from] csv::Error),
    #[error("Label column '{0}' not found")]
    MissingLabelColumn(String),
    #[error("No feature columns remain after pruning")]
    NoFeatures,
    #[error("Dataset has no rows")]
    NoRows,
    #[error("Row {row} has {found} fields, expected {expected}")]
    RowWidth { row: usize, found: usize, expected: usize },
    #[error("Row {row}: unrecognised label value '{value}'")]
    UnknownLabel { row: usize, value: String },
}

/// Integer-encoded table: every retained column as `f32`, labels as `{0,1}`.
#[derive(Debug, Clone)]
pub struct EncodedTable {
    pub feature_names: Vec<String>,
    pub features: Array2<f32>,
    pub labels: Vec<u8>,
    /// Sorted category list per label-encoded column; the code is the index.
    pub categories: BTreeMap<String, Vec<String>>,
}

/// Read and encode a CSV export with a header row.
pub fn read_csv(path: &Path, options: &IngestOptions) -> Result<EncodedTable, IngestError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(|v| v.trim().to_string()).collect());
    }
    encode_records(&headers, &records, options)
}

/// Encode already-split records; `headers` names each field.
pub fn encode_records(
    headers: &[String],
    records: &[Vec<String>],
    options: &IngestOptions,
) -> Result<EncodedTable, IngestError> {
    let label_idx = headers
        .iter()
        .position(|h| h == &options.label_column)
        .ok_or_else(|| IngestError::MissingLabelColumn(options.label_column.clone()))?;
    let kept: Vec<usize> = (0..headers.len())
        .filter(|&idx| idx != label_idx && !options.drop_columns.contains(&headers[idx]))
        .collect();
    if kept.is_empty() {
        return Err(IngestError::NoFeatures);
    }
    if records.is_empty() {
        return Err(IngestError::NoRows);
    }
    for (row, record) in records.iter().enumerate() {
        if record.len() != headers.len() {
            return Err(IngestError::RowWidth {
                row,
                found: record.len(),
                expected: headers.len(),
            });
        }
    }

    let labels = records
        .iter()
        .enumerate()
        .map(|(row, record)| parse_label(&record[label_idx], options).ok_or_else(|| {
            IngestError::UnknownLabel {
                row,
                value: record[label_idx].clone(),
            }
        }))
        .collect::<Result<Vec<u8>, _>>()?;

    let mut features = Array2::<f32>::zeros((records.len(), kept.len()));
    let mut categories = BTreeMap::new();
    for (out_col, &src_col) in kept.iter().enumerate() {
        let numeric: Option<Vec<f32>> = records
            .iter()
            .map(|record| record[src_col].parse::<f32>().ok())
            .collect();
        match numeric {
            Some(values) => {
                for (row, value) in values.into_iter().enumerate() {
                    features[[row, out_col]] = value;
                }
            }
            None => {
                let distinct: Vec<String> = records
                    .iter()
                    .map(|record| record[src_col].clone())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                for (row, record) in records.iter().enumerate() {
                    let code = distinct
                        .binary_search(&record[src_col])
                        .unwrap_or_default();
                    features[[row, out_col]] = code as f32;
                }
                categories.insert(headers[src_col].clone(), distinct);
            }
        }
    }

    Ok(EncodedTable {
        feature_names: kept.iter().map(|&idx| headers[idx].clone()).collect(),
        features,
        labels,
        categories,
    })
}

fn parse_label(value: &str, options: &IngestOptions) -> Option<u8> {
    let value = value.trim();
    if value.eq_ignore_ascii_case(&options.positive_label) || value == "1" {
        Some(1)
    } else if value.eq_ignore_ascii_case(&options.negative_label) || value == "0" {
        Some(0)
    } else {
        None
    }
}
