//! Dense, row-major `f32` feature matrix assembled from columns.
//!
//! Feature columns are consumed side by side: row `r` of the matrix holds
//! row `r` of every column. Null rows and values equal to the configured
//! missing value are stored as NaN.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use gpu_column_core::{ColumnError, ColumnView, Violation};
use tracing::debug;

/// Per-row metadata attached next to the features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoField {
    Label,
    Weight,
    BaseMargin,
}

impl InfoField {
    pub fn name(self) -> &'static str {
        match self {
            InfoField::Label => "label",
            InfoField::Weight => "weight",
            InfoField::BaseMargin => "base_margin",
        }
    }
}

impl FromStr for InfoField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "label" => Ok(InfoField::Label),
            "weight" => Ok(InfoField::Weight),
            "base_margin" => Ok(InfoField::BaseMargin),
            other => bail!("Unknown info field '{}'", other),
        }
    }
}

impl fmt::Display for InfoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    num_cols: usize,
    num_rows: usize,
    missing: f32,
    values: Vec<f32>,
    info: HashMap<InfoField, Vec<f32>>,
}

impl FeatureMatrix {
    pub fn from_columns(columns: &[ColumnView<'_>], missing: f32) -> Result<Self> {
        if columns.is_empty() {
            bail!("Invalid number of feature columns: 0");
        }
        let mut matrix = Self {
            num_cols: columns.len(),
            num_rows: 0,
            missing,
            values: Vec::new(),
            info: HashMap::new(),
        };
        matrix.append_columns(columns)?;
        Ok(matrix)
    }

    /// Append the rows of another batch of feature columns.
    pub fn append_columns(&mut self, columns: &[ColumnView<'_>]) -> Result<()> {
        if columns.len() != self.num_cols {
            bail!(
                "Expected {} feature columns, got {}",
                self.num_cols,
                columns.len()
            );
        }
        let rows = common_row_count(columns)?;

        self.values.reserve(rows * self.num_cols);
        for row in 0..rows {
            for col in columns {
                let value = col.value_as_f64(row)?;
                self.values.push(self.to_feature(value));
            }
        }
        self.num_rows += rows;
        debug!(
            "Appended {} rows, matrix is now {} x {}",
            rows, self.num_rows, self.num_cols
        );
        Ok(())
    }

    fn to_feature(&self, value: Option<f64>) -> f32 {
        match value {
            Some(v) if v as f32 != self.missing => v as f32,
            _ => f32::NAN,
        }
    }

    pub fn set_info(&mut self, field: InfoField, column: &ColumnView<'_>) -> Result<()> {
        let values = info_values(column).with_context(|| format!("Setting {}", field))?;
        self.info.insert(field, values);
        Ok(())
    }

    pub fn append_info(&mut self, field: InfoField, column: &ColumnView<'_>) -> Result<()> {
        let values = info_values(column).with_context(|| format!("Appending {}", field))?;
        self.info.entry(field).or_default().extend(values);
        Ok(())
    }

    pub fn info(&self, field: InfoField) -> Option<&[f32]> {
        self.info.get(&field).map(Vec::as_slice)
    }

    pub fn label(&self) -> Option<&[f32]> {
        self.info(InfoField::Label)
    }

    pub fn weight(&self) -> Option<&[f32]> {
        self.info(InfoField::Weight)
    }

    /// Every info field must cover exactly the matrix's rows.
    pub fn check_info_lengths(&self) -> Result<()> {
        for (field, values) in &self.info {
            if values.len() != self.num_rows {
                return Err(ColumnError::from(Violation::RowCountMismatch {
                    expected: self.num_rows,
                    actual: values.len(),
                }))
                .with_context(|| format!("Info field '{}'", field));
            }
        }
        Ok(())
    }

    pub fn row_num(&self) -> usize {
        self.num_rows
    }

    pub fn col_num(&self) -> usize {
        self.num_cols
    }

    pub fn missing(&self) -> f32 {
        self.missing
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if col >= self.num_cols {
            return None;
        }
        let index = row.checked_mul(self.num_cols)?.checked_add(col)?;
        self.values.get(index).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.num_cols)?;
        self.values.get(start..start.checked_add(self.num_cols)?)
    }

    /// Row-major values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

fn common_row_count(columns: &[ColumnView<'_>]) -> Result<usize> {
    let rows = columns.first().map_or(0, ColumnView::row_count);
    for (i, col) in columns.iter().enumerate() {
        if col.row_count() != rows {
            return Err(ColumnError::from(Violation::RowCountMismatch {
                expected: rows,
                actual: col.row_count(),
            }))
            .with_context(|| format!("Feature column {}", i));
        }
    }
    Ok(rows)
}

fn info_values(column: &ColumnView<'_>) -> Result<Vec<f32>> {
    (0..column.row_count())
        .map(|row| Ok(column.value_as_f64(row)?.map_or(f32::NAN, |v| v as f32)))
        .collect()
}
