//! Error taxonomy for consuming column descriptors.

use thiserror::Error;

use crate::type_id::TypeId;

pub type Result<T, E = ColumnError> = std::result::Result<T, E>;

/// Coarse classification of a [`ColumnError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ContractViolation,
    DanglingReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColumnError {
    /// The producer handed over a descriptor that breaks one of its invariants.
    #[error("contract violation: {0}")]
    ContractViolation(#[from] Violation),

    /// The buffers behind a descriptor were released by their owner.
    #[error("dangling reference: buffers of column '{column}' were released by their owner")]
    DanglingReference { column: String },
}

impl ColumnError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ColumnError::ContractViolation(_) => ErrorKind::ContractViolation,
            ColumnError::DanglingReference { .. } => ErrorKind::DanglingReference,
        }
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            ColumnError::ContractViolation(v) => Some(v),
            ColumnError::DanglingReference { .. } => None,
        }
    }
}

/// The specific invariant a producer broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("negative row count {0}")]
    NegativeRowCount(i64),

    #[error("negative null count {0}")]
    NegativeNullCount(i64),

    #[error("null count {null_count} exceeds row count {num_row}")]
    NullCountExceedsRows { null_count: i64, num_row: i64 },

    #[error("null count {null_count} but no validity mask")]
    MissingValidityMask { null_count: i64 },

    #[error("{num_row} rows but no data buffer")]
    MissingData { num_row: i64 },

    #[error("unknown type id {0}")]
    UnknownTypeId(i32),

    #[error("element size {actual} does not match {type_id:?} width {expected}")]
    ElementSizeMismatch {
        type_id: TypeId,
        expected: usize,
        actual: i32,
    },

    #[error("{num_row} rows of {element_size} bytes overflow the address space")]
    LengthOverflow { num_row: i64, element_size: usize },

    #[error("{buffer} buffer holds {actual} bytes, {required} required")]
    BufferTooShort {
        buffer: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("cached null count {cached} but validity mask has {counted} unset bits")]
    NullCountMismatch { cached: usize, counted: usize },

    #[error("row {row} out of bounds for {num_row} rows")]
    RowIndexOutOfBounds { row: usize, num_row: usize },

    #[error("expected {expected} rows, got {actual}")]
    RowCountMismatch { expected: usize, actual: usize },

    #[error("column holds {actual:?}, read as {requested:?}")]
    TypeMismatch { actual: TypeId, requested: TypeId },
}
