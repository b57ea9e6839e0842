//! The cross-boundary column descriptor.
//!
//! `GpuColumnData` mirrors the C layout both sides of an interop boundary
//! compile against:
//!
//! ```text
//! struct gpu_column_data {
//!   long* data_ptr;
//!   long* valid_ptr;
//!   int   dtype_size_in_bytes;
//!   long  num_row;
//!   int   type_id;
//!   long  null_count;
//! };
//! ```
//!
//! The descriptor never owns the memory it points at and never dereferences
//! it. [`GpuColumnData::validate`] is the consumer's fail-fast check before
//! any buffer is touched.

use std::ffi::c_void;
use std::ptr;

use tracing::{debug, warn};

use crate::error::{ColumnError, Violation};
use crate::type_id::TypeId;
use crate::validity;

/// Non-owning description of one column of externally allocated memory.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuColumnData {
    data_ptr: *const c_void,
    valid_ptr: *const c_void,
    dtype_size_in_bytes: i32,
    num_row: i64,
    type_id: i32,
    null_count: i64,
}

/// Typed layout of a descriptor that passed [`GpuColumnData::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub type_id: TypeId,
    pub element_size: usize,
    pub row_count: usize,
    pub null_count: usize,
    /// `row_count * element_size`.
    pub data_len: usize,
    /// Bytes of validity mask, if the descriptor carries one.
    pub validity_len: Option<usize>,
}

impl GpuColumnData {
    /// Populate every field. The type id is taken as-is; nothing is checked.
    pub const fn new(
        data_ptr: *const c_void,
        valid_ptr: *const c_void,
        dtype_size_in_bytes: i32,
        num_row: i64,
        type_id: i32,
        null_count: i64,
    ) -> Self {
        Self {
            data_ptr,
            valid_ptr,
            dtype_size_in_bytes,
            num_row,
            type_id,
            null_count,
        }
    }

    /// A column with no validity mask and no nulls.
    pub const fn without_nulls(data_ptr: *const c_void, type_id: TypeId, num_row: i64) -> Self {
        Self::new(
            data_ptr,
            ptr::null(),
            type_id.byte_width() as i32,
            num_row,
            type_id.as_raw(),
            0,
        )
    }

    pub const fn with_validity(
        data_ptr: *const c_void,
        valid_ptr: *const c_void,
        type_id: TypeId,
        num_row: i64,
        null_count: i64,
    ) -> Self {
        Self::new(
            data_ptr,
            valid_ptr,
            type_id.byte_width() as i32,
            num_row,
            type_id.as_raw(),
            null_count,
        )
    }

    /// Zero rows; both pointers null.
    pub const fn empty(type_id: TypeId) -> Self {
        Self::without_nulls(ptr::null(), type_id, 0)
    }

    pub fn data_ptr(&self) -> *const c_void {
        self.data_ptr
    }

    pub fn valid_ptr(&self) -> *const c_void {
        self.valid_ptr
    }

    pub fn has_validity(&self) -> bool {
        !self.valid_ptr.is_null()
    }

    pub fn dtype_size_in_bytes(&self) -> i32 {
        self.dtype_size_in_bytes
    }

    pub fn num_row(&self) -> i64 {
        self.num_row
    }

    /// Raw, unchecked type identifier.
    pub fn type_id(&self) -> i32 {
        self.type_id
    }

    pub fn null_count(&self) -> i64 {
        self.null_count
    }

    /// Check every invariant that can be checked without touching memory.
    pub fn validate(&self) -> Result<ColumnLayout, ColumnError> {
        self.check().map_err(|violation| {
            warn!(%violation, "rejecting column descriptor");
            ColumnError::from(violation)
        })
    }

    fn check(&self) -> Result<ColumnLayout, Violation> {
        if self.num_row < 0 {
            return Err(Violation::NegativeRowCount(self.num_row));
        }
        if self.null_count < 0 {
            return Err(Violation::NegativeNullCount(self.null_count));
        }
        if self.null_count > self.num_row {
            return Err(Violation::NullCountExceedsRows {
                null_count: self.null_count,
                num_row: self.num_row,
            });
        }
        if self.null_count > 0 && self.valid_ptr.is_null() {
            return Err(Violation::MissingValidityMask {
                null_count: self.null_count,
            });
        }

        let type_id = match TypeId::from_raw(self.type_id) {
            Ok(t) => t,
            Err(_) => return Err(Violation::UnknownTypeId(self.type_id)),
        };
        let element_size = type_id.byte_width();
        if self.dtype_size_in_bytes != element_size as i32 {
            return Err(Violation::ElementSizeMismatch {
                type_id,
                expected: element_size,
                actual: self.dtype_size_in_bytes,
            });
        }

        if self.num_row > 0 && self.data_ptr.is_null() {
            return Err(Violation::MissingData {
                num_row: self.num_row,
            });
        }

        let overflow = Violation::LengthOverflow {
            num_row: self.num_row,
            element_size,
        };
        let row_count = usize::try_from(self.num_row).map_err(|_| overflow.clone())?;
        let data_len = row_count
            .checked_mul(element_size)
            .filter(|len| *len <= isize::MAX as usize)
            .ok_or(overflow)?;

        let layout = ColumnLayout {
            type_id,
            element_size,
            row_count,
            null_count: self.null_count as usize,
            data_len,
            validity_len: self.has_validity().then(|| validity::mask_len(row_count)),
        };
        debug!(?layout, "column descriptor validated");
        Ok(layout)
    }
}
