//! Per-column min-max scaling to [0,1].

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("Cannot fit a scaler on an empty matrix")]
    Empty,
    #[error("Scaler was fitted on {expected} columns, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// Column ranges learned from a fitting matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: Vec<f32>,
    pub max: Vec<f32>,
}

impl MinMaxScaler {
    pub fn fit(rows: ArrayView2<'_, f32>) -> Result<Self, ScaleError> {
        if rows.nrows() == 0 || rows.ncols() == 0 {
            return Err(ScaleError::Empty);
        }
        let min = rows
            .axis_iter(Axis(1))
            .map(|col| col.iter().copied().fold(f32::INFINITY, f32::min))
            .collect();
        let max = rows
            .axis_iter(Axis(1))
            .map(|col| col.iter().copied().fold(f32::NEG_INFINITY, f32::max))
            .collect();
        Ok(Self { min, max })
    }

    pub fn feature_count(&self) -> usize {
        self.min.len()
    }

    /// Scale rows with the fitted ranges. A constant column maps to 0.
    pub fn transform(&self, rows: ArrayView2<'_, f32>) -> Result<Array2<f32>, ScaleError> {
        self.check_width(rows.ncols())?;
        let mut out = rows.to_owned();
        for (col, mut values) in out.axis_iter_mut(Axis(1)).enumerate() {
            let range = self.max[col] - self.min[col];
            let scale = if range > 0.0 { range } else { 1.0 };
            let min = self.min[col];
            values.mapv_inplace(|v| (v - min) / scale);
        }
        Ok(out)
    }

    pub fn inverse_transform(&self, rows: ArrayView2<'_, f32>) -> Result<Array2<f32>, ScaleError> {
        self.check_width(rows.ncols())?;
        let mut out = rows.to_owned();
        for (col, mut values) in out.axis_iter_mut(Axis(1)).enumerate() {
            let range = self.max[col] - self.min[col];
            let scale = if range > 0.0 { range } else { 1.0 };
            let min = self.min[col];
            values.mapv_inplace(|v| v * scale + min);
        }
        Ok(out)
    }

    fn check_width(&self, found: usize) -> Result<(), ScaleError> {
        if found != self.feature_count() {
            return Err(ScaleError::DimensionMismatch {
                expected: self.feature_count(),
                found,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn scales_each_column_to_unit_range() {
        let rows = array![[18.0_f32, 1.0, 5.0], [60.0, 3.0, 5.0], [39.0, 2.0, 5.0]];
        let scaler = MinMaxScaler::fit(rows.view()).unwrap();
        let scaled = scaler.transform(rows.view()).unwrap();
        assert_eq!(scaled.column(0).to_vec(), vec![0.0, 1.0, 0.5]);
        assert_eq!(scaled.column(1).to_vec(), vec![0.0, 1.0, 0.5]);
        assert_eq!(scaled.column(2).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn inverse_recovers_original_values() {
        let rows = array![[10.0_f32, -2.0], [20.0, 2.0]];
        let scaler = MinMaxScaler::fit(rows.view()).unwrap();
        let scaled = scaler.transform(rows.view()).unwrap();
        let restored = scaler.inverse_transform(scaled.view()).unwrap();
        assert_eq!(restored, rows);
    }

    #[test]
    fn rejects_width_mismatch() {
        let scaler = MinMaxScaler::fit(array![[1.0_f32, 2.0]].view()).unwrap();
        let err = scaler.transform(array![[1.0_f32]].view()).unwrap_err();
        assert!(matches!(err, ScaleError::DimensionMismatch { expected: 2, found: 1 }));
    }
}
