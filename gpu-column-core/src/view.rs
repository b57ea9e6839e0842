//! Borrowed, validated view over host-accessible column memory.
//!
//! A [`ColumnView`] is what a consumer works with after a descriptor passed
//! validation: the data buffer as a byte slice of exactly
//! `row_count * element_size` bytes and the validity mask as a
//! [`ValidityMask`]. Reads never go past those slices.

use std::ffi::c_void;
use std::slice;

use tracing::{debug, warn};

use crate::descriptor::{ColumnLayout, GpuColumnData};
use crate::error::{ColumnError, Result, Violation};
use crate::type_id::{NativeValue, TypeId};
use crate::validity::{self, ValidityMask};
use crate::ColumnConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnView<'a> {
    data: &'a [u8],
    validity: ValidityMask<'a>,
    layout: ColumnLayout,
}

impl<'a> ColumnView<'a> {
    /// Build a view over slices the caller already holds.
    ///
    /// Buffers longer than needed are truncated to the column's length.
    pub fn new(
        data: &'a [u8],
        validity: Option<&'a [u8]>,
        type_id: TypeId,
        row_count: usize,
        null_count: usize,
    ) -> Result<Self> {
        if null_count > row_count {
            return Err(Violation::NullCountExceedsRows {
                null_count: null_count as i64,
                num_row: row_count as i64,
            }
            .into());
        }
        if null_count > 0 && validity.is_none() {
            return Err(Violation::MissingValidityMask {
                null_count: null_count as i64,
            }
            .into());
        }

        let element_size = type_id.byte_width();
        let data_len = row_count
            .checked_mul(element_size)
            .ok_or(Violation::LengthOverflow {
                num_row: row_count as i64,
                element_size,
            })?;
        if data.len() < data_len {
            return Err(Violation::BufferTooShort {
                buffer: "data",
                required: data_len,
                actual: data.len(),
            }
            .into());
        }

        let mask_len = validity::mask_len(row_count);
        let validity = match validity {
            Some(mask) if mask.len() < mask_len => {
                return Err(Violation::BufferTooShort {
                    buffer: "validity",
                    required: mask_len,
                    actual: mask.len(),
                }
                .into());
            }
            Some(mask) => ValidityMask::Bitmap(&mask[..mask_len]),
            None => ValidityMask::AllValid,
        };

        Ok(Self {
            data: &data[..data_len],
            validity,
            layout: ColumnLayout {
                type_id,
                element_size,
                row_count,
                null_count,
                data_len,
                validity_len: validity.bytes().map(<[u8]>::len),
            },
        })
    }

    /// Validate `desc` and map its buffers into slices.
    ///
    /// Nothing is dereferenced unless validation passes, and neither pointer
    /// is touched for a zero-row column.
    ///
    /// # Safety
    ///
    /// If `desc` validates, its data pointer must reference at least
    /// `num_row * dtype_size_in_bytes` host-readable bytes and its validity
    /// pointer (when non-null) at least `ceil(num_row / 8)` bytes. Both must
    /// stay alive and unmodified for `'a`.
    pub unsafe fn from_descriptor(desc: &GpuColumnData) -> Result<Self> {
        let layout = desc.validate()?;

        let data: &'a [u8] = if layout.data_len == 0 {
            &[]
        } else {
            slice::from_raw_parts(desc.data_ptr().cast::<u8>(), layout.data_len)
        };
        let validity = match layout.validity_len {
            Some(len) if len > 0 => {
                ValidityMask::Bitmap(slice::from_raw_parts(desc.valid_ptr().cast::<u8>(), len))
            }
            _ => ValidityMask::AllValid,
        };

        debug!(
            rows = layout.row_count,
            nulls = layout.null_count,
            type_id = ?layout.type_id,
            "mapped column descriptor"
        );
        Ok(Self {
            data,
            validity,
            layout,
        })
    }

    /// [`ColumnView::from_descriptor`] plus the checks `config` asks for.
    ///
    /// # Safety
    ///
    /// Same contract as [`ColumnView::from_descriptor`].
    pub unsafe fn from_descriptor_with(desc: &GpuColumnData, config: &ColumnConfig) -> Result<Self> {
        let view = Self::from_descriptor(desc)?;
        if config.verify_null_count {
            view.verify_null_count()?;
        }
        Ok(view)
    }

    /// A descriptor pointing at this view's buffers.
    pub fn descriptor(&self) -> GpuColumnData {
        let data_ptr = if self.data.is_empty() {
            std::ptr::null()
        } else {
            self.data.as_ptr().cast::<c_void>()
        };
        let valid_ptr = match self.validity.bytes() {
            Some(mask) if !mask.is_empty() => mask.as_ptr().cast::<c_void>(),
            _ => std::ptr::null(),
        };
        GpuColumnData::with_validity(
            data_ptr,
            valid_ptr,
            self.layout.type_id,
            self.layout.row_count as i64,
            self.layout.null_count as i64,
        )
    }

    pub fn type_id(&self) -> TypeId {
        self.layout.type_id
    }

    pub fn element_size(&self) -> usize {
        self.layout.element_size
    }

    pub fn row_count(&self) -> usize {
        self.layout.row_count
    }

    pub fn null_count(&self) -> usize {
        self.layout.null_count
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn validity(&self) -> ValidityMask<'a> {
        self.validity
    }

    /// Byte offset of `row` within the data buffer.
    pub fn row_offset(&self, row: usize) -> Result<usize> {
        self.check_row(row)?;
        Ok(row * self.layout.element_size)
    }

    pub fn is_valid(&self, row: usize) -> Result<bool> {
        self.check_row(row)?;
        Ok(self.validity.is_valid(row))
    }

    /// Raw bytes of `row`, or `None` when the row is null.
    pub fn value_bytes(&self, row: usize) -> Result<Option<&'a [u8]>> {
        self.check_row(row)?;
        Ok(self.validity.is_valid(row).then(|| self.slot(row)))
    }

    pub fn value<T: NativeValue>(&self, row: usize) -> Result<Option<T>> {
        self.check_type::<T>()?;
        Ok(self.value_bytes(row)?.map(T::from_le_slice))
    }

    /// Every row in order, nulls as `None`.
    pub fn iter<T: NativeValue + 'a>(&self) -> Result<impl Iterator<Item = Option<T>> + 'a> {
        self.check_type::<T>()?;
        let view = *self;
        Ok((0..view.row_count())
            .map(move |row| view.validity.is_valid(row).then(|| T::from_le_slice(view.slot(row)))))
    }

    /// Numeric value of `row` widened to `f64`. Booleans read as 0 or 1.
    pub fn value_as_f64(&self, row: usize) -> Result<Option<f64>> {
        let Some(bytes) = self.value_bytes(row)? else {
            return Ok(None);
        };
        let value = match self.layout.type_id {
            TypeId::Int8 => i8::from_le_slice(bytes) as f64,
            TypeId::Int16 => i16::from_le_slice(bytes) as f64,
            TypeId::Int32 | TypeId::Date32 => i32::from_le_slice(bytes) as f64,
            TypeId::Int64 | TypeId::Date64 | TypeId::Timestamp => i64::from_le_slice(bytes) as f64,
            TypeId::Float32 => f32::from_le_slice(bytes) as f64,
            TypeId::Float64 => f64::from_le_slice(bytes),
            TypeId::Bool8 => u8::from(bool::from_le_slice(bytes)) as f64,
        };
        Ok(Some(value))
    }

    /// Nulls according to the validity mask rather than the cached count.
    pub fn counted_null_count(&self) -> usize {
        self.validity.null_count(self.layout.row_count)
    }

    pub fn verify_null_count(&self) -> Result<()> {
        let counted = self.counted_null_count();
        if counted != self.layout.null_count {
            warn!(
                cached = self.layout.null_count,
                counted, "validity mask disagrees with cached null count"
            );
            return Err(Violation::NullCountMismatch {
                cached: self.layout.null_count,
                counted,
            }
            .into());
        }
        Ok(())
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.layout.row_count {
            return Err(Violation::RowIndexOutOfBounds {
                row,
                num_row: self.layout.row_count,
            }
            .into());
        }
        Ok(())
    }

    fn check_type<T: NativeValue>(&self) -> Result<()> {
        if !T::accepts(self.layout.type_id) {
            return Err(ColumnError::from(Violation::TypeMismatch {
                actual: self.layout.type_id,
                requested: T::TYPE_ID,
            }));
        }
        Ok(())
    }

    /// Caller guarantees `row < row_count`.
    fn slot(&self, row: usize) -> &'a [u8] {
        let start = row * self.layout.element_size;
        &self.data[start..start + self.layout.element_size]
    }
}
