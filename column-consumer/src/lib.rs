//! Downstream consumers of column descriptors.

pub mod feature_matrix;
pub mod unsafe_row;

pub use feature_matrix::{FeatureMatrix, InfoField};
pub use unsafe_row::{build_unsafe_rows, UnsafeRowLayout, UnsafeRows};

use anyhow::{Context, Result};
use gpu_column_core::{ColumnConfig, ColumnView, GpuColumnData};
use tracing::debug;

/// Validate every descriptor of a hand-off before any of them is read.
///
/// # Safety
///
/// Each descriptor must satisfy the contract of
/// [`ColumnView::from_descriptor`] for `'a`.
pub unsafe fn views_from_descriptors<'a>(
    columns: &[GpuColumnData],
    config: &ColumnConfig,
) -> Result<Vec<ColumnView<'a>>> {
    for (i, desc) in columns.iter().enumerate() {
        desc.validate()
            .with_context(|| format!("Validating column {}", i))?;
    }
    debug!("Received {} valid column descriptors", columns.len());
    columns
        .iter()
        .enumerate()
        .map(|(i, desc)| {
            ColumnView::from_descriptor_with(desc, config)
                .with_context(|| format!("Reading column {}", i))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_interop::HostColumn;
    use gpu_column_core::{ColumnError, TypeId};

    #[test]
    fn one_bad_descriptor_rejects_the_set() {
        let good = HostColumn::from_slice("a", &[1i32, 2]);
        // would be a wild read if anything were mapped before validation
        let bad = GpuColumnData::with_validity(
            0x10 as *const std::ffi::c_void,
            0x20 as *const std::ffi::c_void,
            TypeId::Int32,
            5,
            6,
        );
        let err = unsafe { views_from_descriptors(&[good.descriptor(), bad], &ColumnConfig::default()) }
            .unwrap_err();
        assert!(err.downcast_ref::<ColumnError>().is_some());
        assert!(format!("{:#}", err).contains("column 1"));
    }

    #[test]
    fn valid_set_maps_every_column() {
        let a = HostColumn::from_slice("a", &[1i32, 2]);
        let b = HostColumn::from_values("b", &[Some(1.0f64), None]);
        let views = unsafe {
            views_from_descriptors(&[a.descriptor(), b.descriptor()], &ColumnConfig::default())
        }
        .unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[1].value::<f64>(1).unwrap(), None);
    }
}
