//! Spark `UnsafeRow` builder for fixed-width columns.
//!
//! Every row has the same size, since only fixed-length types are supported:
//!
//! ```text
//!   null bitset | 8-byte value | [8-byte value, ...]
//! ```
//!
//! The null bitset is a run of little-endian 64-bit words; bit `i` set means
//! field `i` is null. Each value occupies the low `element_size` bytes of its
//! slot, the remaining bytes are zero. Null slots are all zero.

use anyhow::{bail, Context, Result};
use gpu_column_core::{ColumnError, ColumnView, Violation};
use tracing::{debug, info};

/// Bytes reserved per field.
pub const FIELD_SLOT_BYTES: usize = 8;

/// Null bitset size, rounded up to a multiple of 8 bytes.
pub fn nullset_size(num_columns: usize) -> usize {
    ((num_columns + 63) / 64) * 8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsafeRowLayout {
    pub num_columns: usize,
    pub nullset_size: usize,
    pub row_size: usize,
}

impl UnsafeRowLayout {
    pub fn new(num_columns: usize) -> Self {
        let nullset_size = nullset_size(num_columns);
        Self {
            num_columns,
            nullset_size,
            row_size: nullset_size + num_columns * FIELD_SLOT_BYTES,
        }
    }

    /// Offset of field `column` from the start of a row.
    pub fn field_offset(&self, column: usize) -> usize {
        self.nullset_size + column * FIELD_SLOT_BYTES
    }
}

/// A contiguous array of equally sized `UnsafeRow`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsafeRows {
    layout: UnsafeRowLayout,
    num_rows: usize,
    bytes: Vec<u8>,
}

impl UnsafeRows {
    pub fn layout(&self) -> &UnsafeRowLayout {
        &self.layout
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn row(&self, row: usize) -> Option<&[u8]> {
        let start = row.checked_mul(self.layout.row_size)?;
        self.bytes.get(start..start.checked_add(self.layout.row_size)?)
    }

    pub fn is_null_at(&self, row: usize, column: usize) -> Option<bool> {
        if column >= self.layout.num_columns {
            return None;
        }
        let row = self.row(row)?;
        Some(row[column / 8] & (1 << (column % 8)) != 0)
    }

    /// Raw 8-byte slot of a field.
    pub fn slot(&self, row: usize, column: usize) -> Option<[u8; FIELD_SLOT_BYTES]> {
        if column >= self.layout.num_columns {
            return None;
        }
        let offset = self.layout.field_offset(column);
        let mut slot = [0u8; FIELD_SLOT_BYTES];
        slot.copy_from_slice(self.row(row)?.get(offset..offset + FIELD_SLOT_BYTES)?);
        Some(slot)
    }

    pub fn get_i64(&self, row: usize, column: usize) -> Option<i64> {
        self.slot(row, column).map(i64::from_le_bytes)
    }

    pub fn get_f64(&self, row: usize, column: usize) -> Option<f64> {
        self.slot(row, column).map(f64::from_le_bytes)
    }
}

/// Transform a set of equally long columns into `UnsafeRow`s.
pub fn build_unsafe_rows(columns: &[ColumnView<'_>]) -> Result<UnsafeRows> {
    let Some(first) = columns.first() else {
        bail!("Invalid number of columns: 0");
    };
    let num_rows = first.row_count();
    for (i, col) in columns.iter().enumerate() {
        if col.row_count() != num_rows {
            return Err(ColumnError::from(Violation::RowCountMismatch {
                expected: num_rows,
                actual: col.row_count(),
            }))
            .with_context(|| format!("Column {} of UnsafeRow input", i));
        }
    }

    let layout = UnsafeRowLayout::new(columns.len());
    let total = num_rows
        .checked_mul(layout.row_size)
        .context("UnsafeRow buffer size overflows")?;
    info!(
        "Building {} UnsafeRows of {} bytes ({} columns)",
        num_rows, layout.row_size, layout.num_columns
    );

    let mut bytes = vec![0u8; total];
    for (col_idx, col) in columns.iter().enumerate() {
        let width = col.element_size();
        let field_offset = layout.field_offset(col_idx);
        debug!("Storing column {} ({:?}, {} bytes wide)", col_idx, col.type_id(), width);

        for row in 0..num_rows {
            let row_start = row * layout.row_size;
            match col.value_bytes(row)? {
                Some(value) => {
                    let dst = row_start + field_offset;
                    bytes[dst..dst + width].copy_from_slice(value);
                }
                None => bytes[row_start + col_idx / 8] |= 1 << (col_idx % 8),
            }
        }
    }

    Ok(UnsafeRows {
        layout,
        num_rows,
        bytes,
    })
}
