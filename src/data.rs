//! Dataset container for binary tabular classification
//!
//! The core consumes a numeric feature matrix with named columns and a
//! binary label vector aligned by row. Ingestion from a Polars `DataFrame`
//! is provided for the pipeline boundary; everything downstream works on
//! `ndarray` arrays.

use crate::error::{Result, StackError};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Feature matrix, column names, and aligned binary labels
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f64>,
    feature_names: Vec<String>,
    labels: Array1<f64>,
}

impl Dataset {
    /// Build a dataset from parts, validating alignment and label validity.
    pub fn new(
        features: Array2<f64>,
        feature_names: Vec<String>,
        labels: Array1<f64>,
    ) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(StackError::Data(format!(
                "feature matrix has {} rows but label vector has {} entries",
                features.nrows(),
                labels.len()
            )));
        }
        if feature_names.len() != features.ncols() {
            return Err(StackError::Data(format!(
                "{} feature names given for {} columns",
                feature_names.len(),
                features.ncols()
            )));
        }
        for (i, &label) in labels.iter().enumerate() {
            if label.is_nan() {
                return Err(StackError::Data(format!("missing target value at row {}", i)));
            }
            if label != 0.0 && label != 1.0 {
                return Err(StackError::Data(format!(
                    "label at row {} is {}, expected binary 0/1",
                    i, label
                )));
            }
        }

        Ok(Self {
            features,
            feature_names,
            labels,
        })
    }

    /// Extract features and a binary target column from a DataFrame.
    ///
    /// Null feature values are imputed to 0.0; upstream imputation is
    /// expected to have run already. Null or non-binary targets are
    /// rejected.
    pub fn from_dataframe(df: &DataFrame, target_column: &str) -> Result<Self> {
        let feature_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|&name| name != target_column)
            .map(|s| s.to_string())
            .collect();

        let target_series = df
            .column(target_column)
            .map_err(|_| StackError::Data(format!("missing target column '{}'", target_column)))?;

        let target_f64 = target_series
            .cast(&DataType::Float64)
            .map_err(|e| StackError::Data(e.to_string()))?;

        let labels: Array1<f64> = target_f64
            .f64()
            .map_err(|e| StackError::Data(e.to_string()))?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();

        let features = Self::columns_to_array2(df, &feature_names)?;

        Self::new(features, feature_names, labels)
    }

    /// Extract named columns from a DataFrame into a row-major
    /// `Array2<f64>`, imputing nulls to 0.0.
    fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
        let n_rows = df.height();
        let n_cols = col_names.len();

        let col_data: Vec<Vec<f64>> = col_names
            .iter()
            .map(|col_name| {
                let series = df
                    .column(col_name)
                    .map_err(|_| StackError::Data(format!("missing feature column '{}'", col_name)))?;
                let series_f64 = series
                    .cast(&DataType::Float64)
                    .map_err(|e| StackError::Data(e.to_string()))?;
                let values: Vec<f64> = series_f64
                    .f64()
                    .map_err(|e| StackError::Data(e.to_string()))?
                    .into_iter()
                    .map(|v| v.unwrap_or(0.0))
                    .collect();
                Ok(values)
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;

        let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
        Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
            col_refs[c][r]
        }))
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn labels(&self) -> &Array1<f64> {
        &self.labels
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }
}
