use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a balanced row came from; keeps row identity across shuffles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowOrigin {
    /// Index into the original normalized matrix.
    Original(usize),
    /// Index into the generated batch.
    Synthetic(usize),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: csv::Error },
    #[error("Failed to flush {path}: {source}")]
    Flush {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Original rows followed by synthetic minority rows.
#[derive(Debug, Clone)]
pub struct BalancedDataset {
    pub feature_names: Vec<String>,
    pub features: Array2<f32>,
    pub labels: Vec<u8>,
    pub origins: Vec<RowOrigin>,
}

impl BalancedDataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.features.ncols()
    }

    /// `(label 0 count, label 1 count)`.
    pub fn class_counts(&self) -> (usize, usize) {
        super::class_counts(&self.labels)
    }

    pub fn synthetic_count(&self) -> usize {
        self.origins
            .iter()
            .filter(|origin| matches!(origin, RowOrigin::Synthetic(_)))
            .count()
    }

    /// Persist as CSV: one column per feature, then `label_column`.
    pub fn write_csv(&self, path: &Path, label_column: &str) -> Result<(), PersistError> {
        let write_err = |source| PersistError::Write {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
        let mut header: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        header.push(label_column);
        writer.write_record(&header).map_err(write_err)?;
        for (row, label) in self.features.rows().into_iter().zip(&self.labels) {
            let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            record.push(label.to_string());
            writer.write_record(&record).map_err(write_err)?;
        }
        writer.flush().map_err(|source| PersistError::Flush {
            path: path.to_path_buf(),
            source,
        })
    }
}
