//! Host-resident column buffers on the producer side of a hand-off.

use std::ffi::c_void;
use std::sync::{Arc, Weak};

use anyhow::{bail, Result};
use gpu_column_core::validity::{self, ValidityMask};
use gpu_column_core::{ColumnError, ColumnView, GpuColumnData, NativeValue, TypeId};
use tracing::debug;

/// An owned column: packed little-endian values plus an optional bitmask.
#[derive(Debug, Clone)]
pub struct HostColumn {
    pub name: String,
    pub type_id: TypeId,
    /// `n_rows * type_id.byte_width()` bytes.
    data: Vec<u8>,
    n_rows: usize,
    /// Bit per row, set = valid. `None` when every row is valid.
    validity: Option<Vec<u8>>,
    null_count: usize,
}

impl HostColumn {
    pub fn new_empty(name: impl Into<String>, type_id: TypeId) -> Self {
        Self {
            name: name.into(),
            type_id,
            data: Vec::new(),
            n_rows: 0,
            validity: None,
            null_count: 0,
        }
    }

    /// Create from pre-filled buffers. The null count is taken from the mask.
    pub fn from_bytes(
        name: impl Into<String>,
        type_id: TypeId,
        data: Vec<u8>,
        n_rows: usize,
        validity: Option<Vec<u8>>,
    ) -> Result<Self> {
        let Some(expected) = n_rows.checked_mul(type_id.byte_width()) else {
            bail!(
                "HostColumn of {} rows at {} bytes per value overflows",
                n_rows,
                type_id.byte_width()
            );
        };
        if data.len() != expected {
            bail!(
                "HostColumn size mismatch: expected {} bytes for {} rows, got {}",
                expected,
                n_rows,
                data.len()
            );
        }
        if let Some(mask) = &validity {
            if mask.len() != validity::mask_len(n_rows) {
                bail!(
                    "HostColumn mask size mismatch: expected {} bytes for {} rows, got {}",
                    validity::mask_len(n_rows),
                    n_rows,
                    mask.len()
                );
            }
        }
        let null_count = ValidityMask::from_option(validity.as_deref()).null_count(n_rows);
        Ok(Self {
            name: name.into(),
            type_id,
            data,
            n_rows,
            validity,
            null_count,
        })
    }

    /// Build from nullable values. A mask is only attached when a value is null.
    pub fn from_values<T: NativeValue>(name: impl Into<String>, values: &[Option<T>]) -> Self {
        let mut data = Vec::with_capacity(values.len() * T::TYPE_ID.byte_width());
        for v in values {
            match v {
                Some(v) => v.extend_le(&mut data),
                None => data.resize(data.len() + T::TYPE_ID.byte_width(), 0),
            }
        }
        let null_count = values.iter().filter(|v| v.is_none()).count();
        let validity =
            (null_count > 0).then(|| validity::build_mask(values.iter().map(Option::is_some)));
        Self {
            name: name.into(),
            type_id: T::TYPE_ID,
            data,
            n_rows: values.len(),
            validity,
            null_count,
        }
    }

    pub fn from_slice<T: NativeValue>(name: impl Into<String>, values: &[T]) -> Self {
        let mut data = Vec::with_capacity(values.len() * T::TYPE_ID.byte_width());
        for v in values {
            v.extend_le(&mut data);
        }
        Self {
            name: name.into(),
            type_id: T::TYPE_ID,
            data,
            n_rows: values.len(),
            validity: None,
            null_count: 0,
        }
    }

    /// Fill a descriptor pointing at this column's buffers. It stays valid
    /// only while `self` is alive and unmodified.
    pub fn descriptor(&self) -> GpuColumnData {
        let data_ptr = if self.data.is_empty() {
            std::ptr::null()
        } else {
            self.data.as_ptr().cast::<c_void>()
        };
        let valid_ptr = match &self.validity {
            Some(mask) if !mask.is_empty() => mask.as_ptr().cast::<c_void>(),
            _ => std::ptr::null(),
        };
        GpuColumnData::with_validity(
            data_ptr,
            valid_ptr,
            self.type_id,
            self.n_rows as i64,
            self.null_count as i64,
        )
    }

    pub fn view(&self) -> Result<ColumnView<'_>> {
        Ok(ColumnView::new(
            &self.data,
            self.validity.as_deref(),
            self.type_id,
            self.n_rows,
            self.null_count,
        )?)
    }

    /// Hand the column to a consumer without giving up ownership.
    pub fn lease(self: &Arc<Self>) -> ColumnLease {
        debug!("Leasing column '{}' ({} rows)", self.name, self.n_rows);
        ColumnLease {
            name: self.name.clone(),
            descriptor: self.descriptor(),
            owner: Arc::downgrade(self),
        }
    }

    /// Start of the packed values; what [`HostColumn::descriptor`] hands out
    /// as `data_ptr` for a non-empty column.
    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    /// `n_rows * type_id.byte_width()`; the mask is not included.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn validity(&self) -> Option<&[u8]> {
        self.validity.as_deref()
    }
}

/// A descriptor handed out by a [`HostColumn`] together with a weak link to
/// its owner.
///
/// The lease never keeps the buffers alive on its own. Once the owning
/// `Arc<HostColumn>` is dropped, reads fail with
/// [`ColumnError::DanglingReference`] instead of touching freed memory.
#[derive(Debug, Clone)]
pub struct ColumnLease {
    name: String,
    descriptor: GpuColumnData,
    owner: Weak<HostColumn>,
}

impl ColumnLease {
    pub fn descriptor(&self) -> GpuColumnData {
        self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_released(&self) -> bool {
        self.owner.strong_count() == 0
    }

    /// Run `f` against the leased memory while the owner is pinned.
    pub fn with_view<R>(&self, f: impl FnOnce(ColumnView<'_>) -> R) -> Result<R, ColumnError> {
        let owner = self
            .owner
            .upgrade()
            .ok_or_else(|| ColumnError::DanglingReference {
                column: self.name.clone(),
            })?;
        // SAFETY: `owner` holds the buffers the descriptor was built from and
        // is not dropped until `f` returns; `HostColumn` exposes no mutation.
        let view = unsafe { ColumnView::from_descriptor(&self.descriptor) }?;
        let out = f(view);
        drop(owner);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpu_column_core::ErrorKind;

    #[test]
    fn data_length_must_match_rows() {
        let err = HostColumn::from_bytes("col", TypeId::Int64, vec![0u8; 7], 1, None).unwrap_err();
        assert!(err.to_string().contains("expected 8 bytes"));
        assert!(HostColumn::from_bytes("col", TypeId::Int64, vec![0u8; 16], 1, None).is_err());
    }

    #[test]
    fn mask_length_must_cover_rows() {
        // 9 rows need 2 mask bytes
        let err = HostColumn::from_bytes("col", TypeId::Int8, vec![0u8; 9], 9, Some(vec![0xff]))
            .unwrap_err();
        assert!(err.to_string().contains("mask size mismatch"));
        assert!(
            HostColumn::from_bytes("col", TypeId::Int8, vec![0u8; 9], 9, Some(vec![0xff; 3]))
                .is_err()
        );
        let ok = HostColumn::from_bytes("col", TypeId::Int8, vec![0u8; 9], 9, Some(vec![0xff, 0x01]))
            .unwrap();
        assert_eq!(ok.null_count(), 0);
    }

    #[test]
    fn overflowing_row_count_rejected() {
        let err = HostColumn::from_bytes("a", TypeId::Int64, vec![0u8; 8], usize::MAX, None)
            .unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn null_count_from_mask() {
        let col = HostColumn::from_bytes("col", TypeId::Int8, vec![0u8; 5], 5, Some(vec![0b10101]))
            .unwrap();
        assert_eq!(col.null_count(), 2);
    }

    #[test]
    fn from_values_attaches_mask_only_for_nulls() {
        let dense = HostColumn::from_values("a", &[Some(1.0f32), Some(2.0)]);
        assert!(dense.validity().is_none());
        assert!(!dense.descriptor().has_validity());

        let sparse = HostColumn::from_values("b", &[Some(1.0f32), None, Some(3.0)]);
        assert_eq!(sparse.null_count(), 1);
        assert_eq!(sparse.byte_len(), 12);
        let view = sparse.view().unwrap();
        assert_eq!(view.value::<f32>(1).unwrap(), None);
        assert_eq!(view.value::<f32>(2).unwrap(), Some(3.0));
    }

    #[test]
    fn descriptor_points_at_buffers() {
        let col = HostColumn::from_slice("a", &[1i32, 2, 3, 4, 5]);
        let desc = col.descriptor();
        assert_eq!(desc.data_ptr(), col.as_ptr().cast());
        assert_eq!(desc.num_row(), 5);
        assert_eq!(desc.dtype_size_in_bytes(), 4);
        assert_eq!(desc.type_id(), TypeId::Int32.as_raw());

        let empty = HostColumn::new_empty("e", TypeId::Float64).descriptor();
        assert!(empty.data_ptr().is_null());
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn lease_reads_while_owner_alive() {
        let col = Arc::new(HostColumn::from_values("a", &[Some(7i64), None]));
        let lease = col.lease();
        let values = lease
            .with_view(|view| view.iter::<i64>().unwrap().collect::<Vec<_>>())
            .unwrap();
        assert_eq!(values, vec![Some(7), None]);
        assert!(!lease.is_released());
    }

    #[test]
    fn lease_after_release_is_dangling() {
        let col = Arc::new(HostColumn::from_slice("a", &[1i32, 2, 3]));
        let lease = col.lease();
        drop(col);
        assert!(lease.is_released());
        let err = lease.with_view(|view| view.row_count()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DanglingReference);
        assert_eq!(
            err,
            ColumnError::DanglingReference {
                column: "a".into()
            }
        );
    }
}
